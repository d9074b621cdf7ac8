//! exavault - A typed client for the ExaVault file-storage API.
//!
//! This library provides:
//! - One generic `execute` call driven by static endpoint descriptors
//! - Typed request bodies with validated construction
//! - Typed response envelopes for resources, users, shares, notifications,
//!   the account and session activity
//! - Distinct errors for malformed requests, size mismatches, transport
//!   failures, API rejections and undecodable responses
//!
//! # Example
//!
//! ```no_run
//! use exavault::{ClientConfig, Credentials, ListResourcesQuery, VaultClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ClientConfig::for_account("acme")?;
//!     let credentials = Credentials::new("api-key", "access-token")?;
//!     let client = VaultClient::new(config, credentials)?;
//!
//!     let query = ListResourcesQuery::new("/").files().named("*.csv");
//!     let listing = client.list_resources(&query).await?;
//!     for resource in &listing.data {
//!         println!("{}", resource);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod account_url;
pub mod auth;
pub mod client;
pub mod config;
pub mod context;
pub mod endpoint;
pub mod error;
pub mod models;
pub mod requests;

// Re-exports for convenience
pub use auth::Credentials;
pub use client::{MatchedDownload, VaultClient};
pub use config::ClientConfig;
pub use context::{Payload, QueryValue, RequestContext};
pub use endpoint::{BodyKind, Endpoint, PreparedRequest, ResponseShape};
pub use error::{ClientError, Result};
pub use models::{Collection, Record, Resource, Single};
pub use requests::{
    AccessMode, AddFolderRequest, AddNotificationRequest, AddShareRequest, AddUserRequest,
    CompressRequest, ListResourcesQuery, ListUsersQuery, ResourceRef, SessionLogsQuery,
};
