//! Error types for the exavault crate.

use thiserror::Error;

use crate::models::Resource;

/// Errors that can occur when talking to the ExaVault API.
#[derive(Error, Debug)]
pub enum ClientError {
    /// The request could not be built from the endpoint and context given.
    #[error("Malformed request: {0}")]
    MalformedRequest(String),

    /// A binary payload's declared length disagrees with its actual length.
    #[error("Payload size mismatch: declared {declared} bytes, actual {actual} bytes")]
    SizeMismatch { declared: u64, actual: u64 },

    /// The upload went through but the service stored a different size.
    #[error("Uploaded file stored as {reported} bytes, expected {declared} bytes")]
    UploadSizeMismatch {
        declared: u64,
        reported: u64,
        resource: Box<Resource>,
    },

    /// DNS, TLS, connection or timeout failure.
    #[error("HTTP request failed: {0}")]
    Transport(#[from] reqwest::Error),

    /// The service answered with a non-2xx status.
    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    /// A 2xx body did not match the expected response shape.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Invalid account URL: {0}")]
    InvalidAccountUrl(String),

    #[error("Invalid client configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// HTTP status of an API error, if this is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    pub(crate) fn malformed(message: impl Into<String>) -> Self {
        ClientError::MalformedRequest(message.into())
    }
}

/// Result type alias for ClientError.
pub type Result<T> = std::result::Result<T, ClientError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_only_for_api_errors() {
        let err = ClientError::Api {
            status: 404,
            message: "Not found".to_string(),
        };
        assert_eq!(err.status(), Some(404));
        assert!(err.is_not_found());

        let err = ClientError::malformed("missing path parameter");
        assert_eq!(err.status(), None);
        assert!(!err.is_not_found());
    }

    #[test]
    fn test_upload_size_mismatch_keeps_resource() {
        let resource: Resource = serde_json::from_value(serde_json::json!({
            "id": 9,
            "type": "resource",
            "attributes": {"type": "file", "path": "/dog.jpg", "name": "dog.jpg", "size": 3}
        }))
        .unwrap();
        let err = ClientError::UploadSizeMismatch {
            declared: 4,
            reported: 3,
            resource: Box::new(resource),
        };
        assert_eq!(
            err.to_string(),
            "Uploaded file stored as 3 bytes, expected 4 bytes"
        );
        assert_eq!(err.status(), None);
    }

    #[test]
    fn test_size_mismatch_display() {
        let err = ClientError::SizeMismatch {
            declared: 10,
            actual: 12,
        };
        let display = err.to_string();
        assert!(display.contains("10"));
        assert!(display.contains("12"));
    }
}
