//! Normalization of ExaVault account names and URLs into API base URLs.

use regex::Regex;
use std::sync::LazyLock;

use crate::error::{ClientError, Result};

/// Path of the v2 API on an account host.
pub const API_PATH: &str = "/api/v2";

/// Full API URL on an ExaVault host, trailing slash optional.
static API_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://[a-zA-Z0-9-]+\.exavault\.com/api/v2)/?$")
        .expect("Invalid API URL regex")
});

/// Bare ExaVault account host.
static HOST_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(https?://[a-zA-Z0-9-]+\.exavault\.com)/?$").expect("Invalid host URL regex")
});

/// Any other http(s) URL, e.g. a proxy or a local test server.
static OTHER_URL_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^https?://[^\s/?#]+(?:/[^\s?#]*)?$").expect("Invalid URL regex")
});

static ACCOUNT_NAME_REGEX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[a-zA-Z0-9](?:[a-zA-Z0-9-]*[a-zA-Z0-9])?$").expect("Invalid account name regex")
});

/// Turn an account name or URL into the API base URL, without trailing slash.
///
/// Accepted forms:
/// - `acme` (account name)
/// - `https://acme.exavault.com`
/// - `https://acme.exavault.com/api/v2/`
/// - any other `http(s)` URL, used as is
///
/// # Examples
///
/// ```
/// use exavault::account_url::normalize_account_url;
///
/// let url = normalize_account_url("acme").unwrap();
/// assert_eq!(url, "https://acme.exavault.com/api/v2");
/// ```
pub fn normalize_account_url(account: &str) -> Result<String> {
    let trimmed = account.trim();

    if let Some(captures) = API_URL_REGEX.captures(trimmed) {
        if let Some(url) = captures.get(1) {
            return Ok(url.as_str().to_string());
        }
    }

    if let Some(captures) = HOST_URL_REGEX.captures(trimmed) {
        if let Some(host) = captures.get(1) {
            return Ok(format!("{}{}", host.as_str(), API_PATH));
        }
    }

    if OTHER_URL_REGEX.is_match(trimmed) {
        return Ok(trimmed.trim_end_matches('/').to_string());
    }

    if ACCOUNT_NAME_REGEX.is_match(trimmed) {
        return Ok(format!(
            "https://{}.exavault.com{}",
            trimmed.to_ascii_lowercase(),
            API_PATH
        ));
    }

    Err(ClientError::InvalidAccountUrl(account.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_account_name() {
        assert_eq!(
            normalize_account_url("Acme").unwrap(),
            "https://acme.exavault.com/api/v2"
        );
    }

    #[test]
    fn test_host_url() {
        assert_eq!(
            normalize_account_url("https://acme.exavault.com/").unwrap(),
            "https://acme.exavault.com/api/v2"
        );
    }

    #[test]
    fn test_api_url() {
        assert_eq!(
            normalize_account_url("https://acme.exavault.com/api/v2/").unwrap(),
            "https://acme.exavault.com/api/v2"
        );
    }

    #[test]
    fn test_other_url() {
        assert_eq!(
            normalize_account_url("http://127.0.0.1:8080/").unwrap(),
            "http://127.0.0.1:8080"
        );
    }

    #[test]
    fn test_invalid() {
        assert!(normalize_account_url("").is_err());
        assert!(normalize_account_url("   ").is_err());
        assert!(normalize_account_url("ftp://acme.exavault.com").is_err());
        assert!(normalize_account_url("-acme").is_err());
    }
}
