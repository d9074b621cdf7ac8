//! API key and access token authentication.

use std::fmt;

use reqwest::header::HeaderValue;
use reqwest::RequestBuilder;

use crate::error::{ClientError, Result};

/// Header carrying the API key.
pub const API_KEY_HEADER: &str = "ev-api-key";

/// Header carrying the access token.
pub const ACCESS_TOKEN_HEADER: &str = "ev-access-token";

/// Static credentials sent with every request.
///
/// Access tokens do not expire, so there is nothing to refresh or cache.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
    access_token: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, access_token: impl Into<String>) -> Result<Self> {
        let api_key = api_key.into();
        let access_token = access_token.into();
        validate("API key", &api_key)?;
        validate("access token", &access_token)?;
        Ok(Self {
            api_key,
            access_token,
        })
    }

    /// Attach both credential headers to a request.
    pub(crate) fn apply(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header(API_KEY_HEADER, &self.api_key)
            .header(ACCESS_TOKEN_HEADER, &self.access_token)
    }
}

fn validate(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClientError::Config(format!("{} must not be empty", what)));
    }
    HeaderValue::from_str(value)
        .map_err(|_| ClientError::Config(format!("{} contains invalid characters", what)))?;
    Ok(())
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.api_key)
            .field("access_token", &"<redacted>")
            .finish()
    }
}
