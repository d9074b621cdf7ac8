//! Tests for account URL normalization and client configuration.

use exavault::account_url::normalize_account_url;

mod account_names {
    use super::*;

    #[test]
    fn plain_name() {
        assert_eq!(
            normalize_account_url("acme").unwrap(),
            "https://acme.exavault.com/api/v2"
        );
    }

    #[test]
    fn name_with_hyphen() {
        assert_eq!(
            normalize_account_url("acme-corp").unwrap(),
            "https://acme-corp.exavault.com/api/v2"
        );
    }

    #[test]
    fn name_with_whitespace() {
        assert_eq!(
            normalize_account_url("  acme  ").unwrap(),
            "https://acme.exavault.com/api/v2"
        );
    }
}

mod account_urls {
    use super::*;

    #[test]
    fn host_without_api_path() {
        assert_eq!(
            normalize_account_url("https://acme.exavault.com").unwrap(),
            "https://acme.exavault.com/api/v2"
        );
    }

    #[test]
    fn full_api_url() {
        assert_eq!(
            normalize_account_url("https://acme.exavault.com/api/v2").unwrap(),
            "https://acme.exavault.com/api/v2"
        );
    }

    #[test]
    fn custom_host_is_kept() {
        assert_eq!(
            normalize_account_url("https://files.example.org/api/v2/").unwrap(),
            "https://files.example.org/api/v2"
        );
    }
}

mod invalid {
    use super::*;
    use exavault::ClientError;

    #[test]
    fn rejects_garbage() {
        for input in ["", "acme corp", "acme.exavault", "ftp://acme.exavault.com", "acme-"] {
            let err = normalize_account_url(input).unwrap_err();
            assert!(
                matches!(err, ClientError::InvalidAccountUrl(_)),
                "accepted {:?}",
                input
            );
        }
    }
}

mod config {
    use exavault::{ClientConfig, ClientError};
    use std::time::Duration;

    #[test]
    fn for_account_builds_base_url() {
        let config = ClientConfig::for_account("acme").unwrap();
        assert_eq!(config.base_url(), "https://acme.exavault.com/api/v2");
        assert_eq!(config.timeout(), Duration::from_secs(30));
    }

    #[test]
    fn for_account_propagates_invalid_url() {
        let err = ClientConfig::for_account("not a name").unwrap_err();
        assert!(matches!(err, ClientError::InvalidAccountUrl(_)));
    }
}
