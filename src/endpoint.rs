//! Endpoint descriptors and request resolution.
//!
//! Every ExaVault operation is one [`Endpoint`] constant. The client core
//! resolves an endpoint against a [`RequestContext`] into a
//! [`PreparedRequest`] before anything touches the network, so every
//! input error is reported without a request being sent.

use std::collections::BTreeMap;
use std::fmt;
use std::marker::PhantomData;

use bytes::Bytes;
use percent_encoding::{utf8_percent_encode, AsciiSet, CONTROLS};
use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::context::{Payload, RequestContext};
use crate::error::{ClientError, Result};
use crate::models::{
    Account, Collection, Notification, Resource, SessionActivity, Share, Single, User,
};

/// Characters escaped when substituting a path placeholder.
const PATH_SEGMENT: &AsciiSet = &CONTROLS
    .add(b' ')
    .add(b'"')
    .add(b'#')
    .add(b'%')
    .add(b'/')
    .add(b'<')
    .add(b'>')
    .add(b'?')
    .add(b'`')
    .add(b'{')
    .add(b'}');

/// The kind of body an endpoint accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BodyKind {
    None,
    Json,
    Binary,
}

impl fmt::Display for BodyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BodyKind::None => write!(f, "no body"),
            BodyKind::Json => write!(f, "a JSON body"),
            BodyKind::Binary => write!(f, "a binary payload"),
        }
    }
}

/// How a successful response body is turned into a value.
pub trait ResponseShape: Sized {
    fn decode(body: Bytes) -> Result<Self>;
}

impl<T: DeserializeOwned> ResponseShape for Single<T> {
    fn decode(body: Bytes) -> Result<Self> {
        Ok(serde_json::from_slice(&body)?)
    }
}

impl<T: DeserializeOwned> ResponseShape for Collection<T> {
    fn decode(body: Bytes) -> Result<Self> {
        Ok(serde_json::from_slice(&body)?)
    }
}

/// Raw bytes, for downloads.
impl ResponseShape for Bytes {
    fn decode(body: Bytes) -> Result<Self> {
        Ok(body)
    }
}

/// Static description of one API operation.
pub struct Endpoint<R> {
    method: Method,
    path: &'static str,
    body: BodyKind,
    shape: PhantomData<fn() -> R>,
}

impl<R> Endpoint<R> {
    pub const fn new(method: Method, path: &'static str, body: BodyKind) -> Self {
        Self {
            method,
            path,
            body,
            shape: PhantomData,
        }
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path_template(&self) -> &'static str {
        self.path
    }

    pub fn body_kind(&self) -> BodyKind {
        self.body
    }

    /// Resolve this endpoint against a context. Pure: the same inputs always
    /// produce the same request.
    pub fn prepare(&self, context: &RequestContext) -> Result<PreparedRequest> {
        let path = resolve_path(self.path, context.path_params())?;

        let body = match (self.body, context.payload()) {
            (BodyKind::None, Payload::Empty) => None,
            (BodyKind::Json, Payload::Json(value)) => {
                let encoded = serde_json::to_vec(value).map_err(|e| {
                    ClientError::malformed(format!("request body is not serializable: {}", e))
                })?;
                Some(PreparedBody::Json(encoded))
            }
            (BodyKind::Binary, Payload::Binary {
                bytes,
                declared_size,
            }) => {
                let actual = bytes.len() as u64;
                if actual != *declared_size {
                    return Err(ClientError::SizeMismatch {
                        declared: *declared_size,
                        actual,
                    });
                }
                Some(PreparedBody::Binary(bytes.clone()))
            }
            (expected, carried) => {
                return Err(ClientError::malformed(format!(
                    "{} {} takes {} but the request carries {}",
                    self.method, self.path, expected, carried
                )))
            }
        };

        Ok(PreparedRequest {
            method: self.method.clone(),
            path,
            query: context.query_pairs(),
            body,
        })
    }
}

impl<R> Clone for Endpoint<R> {
    fn clone(&self) -> Self {
        Self::new(self.method.clone(), self.path, self.body)
    }
}

impl<R> fmt::Debug for Endpoint<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("body", &self.body)
            .finish()
    }
}

/// An endpoint resolved against a context, ready to send.
#[derive(Debug, Clone, PartialEq)]
pub struct PreparedRequest {
    pub method: Method,
    /// Path relative to the account base URL.
    pub path: String,
    pub query: Vec<(String, String)>,
    pub body: Option<PreparedBody>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreparedBody {
    Json(Vec<u8>),
    Binary(Bytes),
}

/// Substitute `{name}` placeholders from `params`.
pub fn resolve_path(template: &str, params: &BTreeMap<String, String>) -> Result<String> {
    let mut resolved = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find('{') {
        resolved.push_str(&rest[..start]);
        let after = &rest[start + 1..];
        let end = after.find('}').ok_or_else(|| {
            ClientError::malformed(format!("unterminated placeholder in '{}'", template))
        })?;
        let name = &after[..end];
        let value = params
            .get(name)
            .filter(|v| !v.is_empty())
            .ok_or_else(|| {
                ClientError::malformed(format!(
                    "missing path parameter '{}' for '{}'",
                    name, template
                ))
            })?;
        resolved.extend(utf8_percent_encode(value, PATH_SEGMENT));
        rest = &after[end + 1..];
    }

    resolved.push_str(rest);
    Ok(resolved)
}

pub const ADD_FOLDER: Endpoint<Single<Resource>> =
    Endpoint::new(Method::POST, "/resources", BodyKind::Json);

pub const LIST_RESOURCES: Endpoint<Collection<Resource>> =
    Endpoint::new(Method::GET, "/resources/list", BodyKind::None);

pub const GET_RESOURCE: Endpoint<Single<Resource>> =
    Endpoint::new(Method::GET, "/resources/{id}", BodyKind::None);

pub const UPLOAD_FILE: Endpoint<Single<Resource>> =
    Endpoint::new(Method::POST, "/resources/upload", BodyKind::Binary);

pub const DOWNLOAD: Endpoint<Bytes> =
    Endpoint::new(Method::GET, "/resources/download", BodyKind::None);

pub const COMPRESS_FILES: Endpoint<Single<Resource>> =
    Endpoint::new(Method::POST, "/resources/compress", BodyKind::Json);

pub const ADD_USER: Endpoint<Single<User>> = Endpoint::new(Method::POST, "/users", BodyKind::Json);

pub const LIST_USERS: Endpoint<Collection<User>> =
    Endpoint::new(Method::GET, "/users", BodyKind::None);

pub const GET_USER: Endpoint<Single<User>> =
    Endpoint::new(Method::GET, "/users/{id}", BodyKind::None);

pub const ADD_SHARE: Endpoint<Single<Share>> =
    Endpoint::new(Method::POST, "/shares", BodyKind::Json);

pub const GET_SHARE: Endpoint<Single<Share>> =
    Endpoint::new(Method::GET, "/shares/{id}", BodyKind::None);

pub const ADD_NOTIFICATION: Endpoint<Single<Notification>> =
    Endpoint::new(Method::POST, "/notifications", BodyKind::Json);

pub const GET_ACCOUNT: Endpoint<Single<Account>> =
    Endpoint::new(Method::GET, "/account", BodyKind::None);

pub const GET_SESSION_LOGS: Endpoint<Collection<SessionActivity>> =
    Endpoint::new(Method::GET, "/activity/session", BodyKind::None);
