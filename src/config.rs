//! Client configuration

use std::time::Duration;

use url::Url;

use crate::account_url::normalize_account_url;
use crate::error::{ClientError, Result};

/// Applied to every request unless overridden.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Client configuration
#[derive(Clone, Debug)]
pub struct ClientConfig {
    base_url: String,
    timeout: Duration,
    user_agent: String,
}

impl ClientConfig {
    /// Create a config for an API base URL, e.g. `https://acme.exavault.com/api/v2`.
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let base_url = base_url.into();
        let trimmed = base_url.trim().trim_end_matches('/');
        let parsed = Url::parse(trimmed)
            .map_err(|e| ClientError::Config(format!("invalid base URL '{}': {}", base_url, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ClientError::Config(format!(
                "base URL must be http or https: '{}'",
                base_url
            )));
        }

        Ok(Self {
            base_url: trimmed.to_string(),
            timeout: DEFAULT_TIMEOUT,
            user_agent: format!("exavault/{}", env!("CARGO_PKG_VERSION")),
        })
    }

    /// Create a config from an account name or URL.
    pub fn for_account(account: &str) -> Result<Self> {
        Self::new(normalize_account_url(account)?)
    }

    /// Set timeout
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Base URL shared by every operation, without trailing slash.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub fn user_agent(&self) -> &str {
        &self.user_agent
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_trims_trailing_slash() {
        let config = ClientConfig::new("https://acme.exavault.com/api/v2/").unwrap();
        assert_eq!(config.base_url(), "https://acme.exavault.com/api/v2");
        assert_eq!(config.timeout(), DEFAULT_TIMEOUT);
        assert!(config.user_agent().starts_with("exavault/"));
    }

    #[test]
    fn test_new_rejects_bad_urls() {
        assert!(ClientConfig::new("not a url").is_err());
        assert!(ClientConfig::new("ftp://acme.exavault.com").is_err());
    }

    #[test]
    fn test_for_account() {
        let config = ClientConfig::for_account("acme")
            .unwrap()
            .with_timeout(Duration::from_secs(5));
        assert_eq!(config.base_url(), "https://acme.exavault.com/api/v2");
        assert_eq!(config.timeout(), Duration::from_secs(5));
    }
}
