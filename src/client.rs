//! ExaVault API client built on one generic `execute` call.

use std::fmt;

use bytes::Bytes;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use reqwest::{header, Client};
use tracing::{debug, instrument, warn};

use crate::auth::Credentials;
use crate::config::ClientConfig;
use crate::context::RequestContext;
use crate::endpoint::{
    self, Endpoint, PreparedBody, PreparedRequest, ResponseShape,
};
use crate::error::{ClientError, Result};
use crate::models::{
    Account, ApiErrorResponse, Collection, Notification, Resource, SessionActivity, Share, User,
};
use crate::requests::{
    AddFolderRequest, AddNotificationRequest, AddShareRequest, AddUserRequest, CompressRequest,
    ListResourcesQuery, ListUsersQuery, ResourceRef, SessionLogsQuery,
};

/// Outcome of [`VaultClient::download_matching`].
#[derive(Debug, Clone)]
pub struct MatchedDownload {
    /// Resources the listing returned, in service order.
    pub matched: Vec<Resource>,
    /// Downloaded content; `None` when nothing matched.
    pub content: Option<Bytes>,
}

/// Client for one ExaVault account.
///
/// Holds no per-call state, so one client can serve concurrent calls.
pub struct VaultClient {
    config: ClientConfig,
    credentials: Credentials,
    http: Client,
}

impl VaultClient {
    /// Create a new VaultClient.
    ///
    /// # Arguments
    /// * `config` - Base URL and transport settings
    /// * `credentials` - API key and access token sent with every request
    pub fn new(config: ClientConfig, credentials: Credentials) -> Result<Self> {
        let mut headers = header::HeaderMap::new();
        headers.insert(
            USER_AGENT,
            config
                .user_agent()
                .parse()
                .map_err(|_| ClientError::Config("invalid user agent".to_string()))?,
        );

        let http = Client::builder()
            .timeout(config.timeout())
            .default_headers(headers)
            .build()
            .map_err(|e| ClientError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            config,
            credentials,
            http,
        })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Execute one operation: resolve, send exactly once, classify, decode.
    #[instrument(skip_all, fields(method = %endpoint.method(), path = endpoint.path_template()))]
    pub async fn execute<R: ResponseShape>(
        &self,
        endpoint: &Endpoint<R>,
        context: &RequestContext,
    ) -> Result<R> {
        let prepared = endpoint.prepare(context)?;
        let body = self.send(prepared).await?;
        R::decode(body)
    }

    async fn send(&self, prepared: PreparedRequest) -> Result<Bytes> {
        let url = format!("{}{}", self.config.base_url(), prepared.path);
        debug!(url = %url, query_len = prepared.query.len(), "sending request");

        let mut request = self.credentials.apply(
            self.http
                .request(prepared.method, &url)
                .query(&prepared.query),
        );

        request = match prepared.body {
            Some(PreparedBody::Json(body)) => request
                .header(CONTENT_TYPE, "application/json")
                .body(body),
            Some(PreparedBody::Binary(bytes)) => request
                .header(CONTENT_TYPE, "application/octet-stream")
                .body(bytes),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status();
        debug!(status = status.as_u16(), "received response");

        if !status.is_success() {
            let message = api_error_message(response.text().await);
            warn!(status = status.as_u16(), %message, "API request failed");
            return Err(ClientError::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response.bytes().await?)
    }

    /// Create a folder, including any missing parents.
    pub async fn add_folder(&self, request: &AddFolderRequest) -> Result<Resource> {
        let context = RequestContext::new().json(request)?;
        Ok(self.execute(&endpoint::ADD_FOLDER, &context).await?.data)
    }

    /// List the contents of a folder. Filters are passed through unchanged.
    pub async fn list_resources(&self, query: &ListResourcesQuery) -> Result<Collection<Resource>> {
        self.execute(&endpoint::LIST_RESOURCES, &query.to_context())
            .await
    }

    pub async fn get_resource(&self, id: u64) -> Result<Resource> {
        let context = RequestContext::new().path_param("id", id.to_string());
        Ok(self.execute(&endpoint::GET_RESOURCE, &context).await?.data)
    }

    /// Upload `content` to `path`.
    ///
    /// `declared_size` must match the content length; a mismatch fails
    /// before anything is sent. The size the service reports back is
    /// checked against it as well, and a disagreement returns
    /// [`ClientError::UploadSizeMismatch`] carrying the stored resource.
    pub async fn upload_file(
        &self,
        path: &str,
        content: impl Into<Bytes>,
        declared_size: u64,
    ) -> Result<Resource> {
        let context = RequestContext::new()
            .query("path", path)
            .query("fileSize", declared_size.to_string())
            .binary(content, declared_size);

        let resource = self.execute(&endpoint::UPLOAD_FILE, &context).await?.data;

        if let Some(reported) = resource.attributes.size {
            if reported != declared_size {
                warn!(
                    path = %resource.attributes.path,
                    declared_size,
                    reported,
                    "uploaded file size does not match"
                );
                return Err(ClientError::UploadSizeMismatch {
                    declared: declared_size,
                    reported,
                    resource: Box::new(resource),
                });
            }
        }

        Ok(resource)
    }

    /// Download one or more resources. Several resources arrive as one zip archive.
    pub async fn download(&self, resources: &[ResourceRef]) -> Result<Bytes> {
        if resources.is_empty() {
            return Err(ClientError::malformed("nothing to download"));
        }
        let refs: Vec<String> = resources.iter().map(ToString::to_string).collect();
        let context = RequestContext::new().query("resources", refs);
        self.execute(&endpoint::DOWNLOAD, &context).await
    }

    /// List with filters, then download every match in one call.
    ///
    /// Nothing is downloaded when the listing returns no results.
    pub async fn download_matching(&self, query: &ListResourcesQuery) -> Result<MatchedDownload> {
        let listing = self.list_resources(query).await?;
        if listing.is_empty() {
            debug!(resource = %query.resource, "no resources matched");
            return Ok(MatchedDownload {
                matched: Vec::new(),
                content: None,
            });
        }

        let refs: Vec<ResourceRef> = listing.data.iter().map(ResourceRef::from).collect();
        let content = self.download(&refs).await?;
        Ok(MatchedDownload {
            matched: listing.data,
            content: Some(content),
        })
    }

    /// Compress resources into an archive; returns the archive resource.
    pub async fn compress_files(&self, request: &CompressRequest) -> Result<Resource> {
        let context = RequestContext::new().json(request)?;
        Ok(self.execute(&endpoint::COMPRESS_FILES, &context).await?.data)
    }

    pub async fn add_user(&self, request: &AddUserRequest) -> Result<User> {
        let context = RequestContext::new().json(request)?;
        Ok(self.execute(&endpoint::ADD_USER, &context).await?.data)
    }

    pub async fn list_users(&self, query: &ListUsersQuery) -> Result<Collection<User>> {
        self.execute(&endpoint::LIST_USERS, &query.to_context()).await
    }

    pub async fn get_user(&self, id: u64) -> Result<User> {
        let context = RequestContext::new().path_param("id", id.to_string());
        Ok(self.execute(&endpoint::GET_USER, &context).await?.data)
    }

    pub async fn add_share(&self, request: &AddShareRequest) -> Result<Share> {
        let context = RequestContext::new().json(request)?;
        Ok(self.execute(&endpoint::ADD_SHARE, &context).await?.data)
    }

    pub async fn get_share(&self, id: u64) -> Result<Share> {
        let context = RequestContext::new().path_param("id", id.to_string());
        Ok(self.execute(&endpoint::GET_SHARE, &context).await?.data)
    }

    pub async fn add_notification(&self, request: &AddNotificationRequest) -> Result<Notification> {
        let context = RequestContext::new().json(request)?;
        Ok(self.execute(&endpoint::ADD_NOTIFICATION, &context).await?.data)
    }

    /// Account settings and disk quota.
    pub async fn get_account(&self) -> Result<Account> {
        Ok(self
            .execute(&endpoint::GET_ACCOUNT, &RequestContext::new())
            .await?
            .data)
    }

    pub async fn get_session_logs(
        &self,
        query: &SessionLogsQuery,
    ) -> Result<Collection<SessionActivity>> {
        self.execute(&endpoint::GET_SESSION_LOGS, &query.to_context())
            .await
    }
}

/// Message for a non-2xx response: the structured error if the body has
/// one, else the raw body text.
fn api_error_message<E: fmt::Display>(body: std::result::Result<String, E>) -> String {
    match body {
        Ok(text) => serde_json::from_str::<ApiErrorResponse>(&text)
            .ok()
            .and_then(|e| e.message())
            .unwrap_or(text),
        Err(e) => format!("<unreadable body: {}>", e),
    }
}
