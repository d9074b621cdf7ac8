//! Per-call request data: path parameters, query parameters and payload.

use std::collections::BTreeMap;
use std::fmt;

use bytes::Bytes;
use serde::Serialize;
use serde_json::Value;

use crate::error::{ClientError, Result};

/// A query parameter value.
#[derive(Debug, Clone, PartialEq)]
pub enum QueryValue {
    Text(String),
    Number(i64),
    /// Sent as repeated `name[]=value` pairs, in order.
    List(Vec<String>),
}

impl From<&str> for QueryValue {
    fn from(value: &str) -> Self {
        QueryValue::Text(value.to_string())
    }
}

impl From<String> for QueryValue {
    fn from(value: String) -> Self {
        QueryValue::Text(value)
    }
}

impl From<i64> for QueryValue {
    fn from(value: i64) -> Self {
        QueryValue::Number(value)
    }
}

impl From<u32> for QueryValue {
    fn from(value: u32) -> Self {
        QueryValue::Number(i64::from(value))
    }
}

impl From<Vec<String>> for QueryValue {
    fn from(values: Vec<String>) -> Self {
        QueryValue::List(values)
    }
}

/// What the request carries as its body.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Payload {
    #[default]
    Empty,
    Json(Value),
    Binary { bytes: Bytes, declared_size: u64 },
}

impl fmt::Display for Payload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Payload::Empty => write!(f, "no body"),
            Payload::Json(_) => write!(f, "a JSON body"),
            Payload::Binary { .. } => write!(f, "a binary payload"),
        }
    }
}

/// Data for one call. Built fresh per call and never shared.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    path_params: BTreeMap<String, String>,
    query: Vec<(String, QueryValue)>,
    payload: Payload,
}

impl RequestContext {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn path_param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.path_params.insert(name.into(), value.into());
        self
    }

    /// Append a query parameter. Parameters keep insertion order.
    pub fn query(mut self, name: impl Into<String>, value: impl Into<QueryValue>) -> Self {
        self.query.push((name.into(), value.into()));
        self
    }

    pub fn query_opt<V: Into<QueryValue>>(self, name: impl Into<String>, value: Option<V>) -> Self {
        match value {
            Some(value) => self.query(name, value),
            None => self,
        }
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        let value = serde_json::to_value(body).map_err(|e| {
            ClientError::malformed(format!("request body is not serializable: {}", e))
        })?;
        self.payload = Payload::Json(value);
        Ok(self)
    }

    /// Attach a raw payload with the size the caller expects it to have.
    pub fn binary(mut self, bytes: impl Into<Bytes>, declared_size: u64) -> Self {
        self.payload = Payload::Binary {
            bytes: bytes.into(),
            declared_size,
        };
        self
    }

    pub fn path_params(&self) -> &BTreeMap<String, String> {
        &self.path_params
    }

    pub fn payload(&self) -> &Payload {
        &self.payload
    }

    /// Query parameters as wire pairs, lists expanded to `name[]` entries.
    pub fn query_pairs(&self) -> Vec<(String, String)> {
        let mut pairs = Vec::with_capacity(self.query.len());
        for (name, value) in &self.query {
            match value {
                QueryValue::Text(text) => pairs.push((name.clone(), text.clone())),
                QueryValue::Number(n) => pairs.push((name.clone(), n.to_string())),
                QueryValue::List(items) => {
                    let key = format!("{}[]", name);
                    pairs.extend(items.iter().map(|item| (key.clone(), item.clone())));
                }
            }
        }
        pairs
    }
}
