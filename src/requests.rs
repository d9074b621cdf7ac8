//! Request bodies and query filters for ExaVault operations.
//!
//! Bodies are validated when constructed; an invalid body never reaches the
//! client core.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

use crate::context::RequestContext;
use crate::error::{ClientError, Result};
use crate::models::{
    NotificationAction, NotificationType, Permissions, Resource, ResourceType, ShareType, UserRole,
};

/// A reference to a resource: either its path or `id:<n>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceRef {
    Path(String),
    Id(u64),
}

impl FromStr for ResourceRef {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        let trimmed = s.trim();
        if let Some(id) = trimmed.strip_prefix("id:") {
            return id
                .parse::<u64>()
                .map(ResourceRef::Id)
                .map_err(|_| ClientError::malformed(format!("invalid resource id '{}'", s)));
        }
        if trimmed.is_empty() {
            return Err(ClientError::malformed("empty resource reference"));
        }
        Ok(ResourceRef::Path(trimmed.to_string()))
    }
}

impl fmt::Display for ResourceRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceRef::Path(path) => write!(f, "{}", path),
            ResourceRef::Id(id) => write!(f, "id:{}", id),
        }
    }
}

impl From<&Resource> for ResourceRef {
    fn from(resource: &Resource) -> Self {
        ResourceRef::Id(resource.id)
    }
}

fn require(value: &str, what: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(ClientError::malformed(format!("{} must not be empty", what)));
    }
    Ok(())
}

fn require_email(value: &str) -> Result<()> {
    let valid = value
        .split_once('@')
        .is_some_and(|(local, domain)| !local.is_empty() && !domain.is_empty());
    if !valid {
        return Err(ClientError::malformed(format!(
            "invalid email address '{}'",
            value
        )));
    }
    Ok(())
}

fn refs_to_strings(resources: &[ResourceRef]) -> Vec<String> {
    resources.iter().map(ToString::to_string).collect()
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AddFolderRequest {
    path: String,
}

impl AddFolderRequest {
    /// Create a folder at an absolute path. Missing parents are created by the service.
    pub fn new(path: impl Into<String>) -> Result<Self> {
        let path = path.into();
        if !path.starts_with('/') {
            return Err(ClientError::malformed(format!(
                "folder path must be absolute: '{}'",
                path
            )));
        }
        Ok(Self { path })
    }

    pub fn path(&self) -> &str {
        &self.path
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompressRequest {
    resources: Vec<String>,
    parent_resource: String,
    archive_name: String,
}

impl CompressRequest {
    pub fn new(
        resources: &[ResourceRef],
        parent_resource: impl Into<String>,
        archive_name: impl Into<String>,
    ) -> Result<Self> {
        if resources.is_empty() {
            return Err(ClientError::malformed("nothing to compress"));
        }
        let parent_resource = parent_resource.into();
        let archive_name = archive_name.into();
        require(&parent_resource, "parent resource")?;
        require(&archive_name, "archive name")?;
        Ok(Self {
            resources: refs_to_strings(resources),
            parent_resource,
            archive_name,
        })
    }
}

fn permission_list<S>(permissions: &Permissions, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_str(permissions)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddUserRequest {
    username: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    nickname: Option<String>,
    home_resource: String,
    email: String,
    password: String,
    role: UserRole,
    #[serde(serialize_with = "permission_list")]
    permissions: Permissions,
    time_zone: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiration: Option<String>,
    locked: bool,
    welcome_email: bool,
}

impl AddUserRequest {
    pub fn new(
        username: impl Into<String>,
        home_resource: impl Into<String>,
        email: impl Into<String>,
        password: impl Into<String>,
        role: UserRole,
        permissions: Permissions,
    ) -> Result<Self> {
        let username = username.into();
        let home_resource = home_resource.into();
        let email = email.into();
        let password = password.into();
        require(&username, "username")?;
        require(&home_resource, "home resource")?;
        require(&password, "password")?;
        require_email(&email)?;
        Ok(Self {
            username,
            nickname: None,
            home_resource,
            email,
            password,
            role,
            permissions,
            time_zone: "UTC".to_string(),
            expiration: None,
            locked: false,
            welcome_email: false,
        })
    }

    pub fn with_nickname(mut self, nickname: impl Into<String>) -> Self {
        self.nickname = Some(nickname.into());
        self
    }

    pub fn with_time_zone(mut self, time_zone: impl Into<String>) -> Self {
        self.time_zone = time_zone.into();
        self
    }

    pub fn with_expiration(mut self, expiration: impl Into<String>) -> Self {
        self.expiration = Some(expiration.into());
        self
    }

    pub fn with_welcome_email(mut self, send: bool) -> Self {
        self.welcome_email = send;
        self
    }

    pub fn locked(mut self, locked: bool) -> Self {
        self.locked = locked;
        self
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AccessMode {
    Download,
    Upload,
    Modify,
    Delete,
}

impl FromStr for AccessMode {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "download" => Ok(AccessMode::Download),
            "upload" => Ok(AccessMode::Upload),
            "modify" => Ok(AccessMode::Modify),
            "delete" => Ok(AccessMode::Delete),
            other => Err(ClientError::malformed(format!(
                "unknown access mode '{}'",
                other
            ))),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddShareRequest {
    #[serde(rename = "type")]
    share_type: ShareType,
    name: String,
    resources: Vec<String>,
    access_mode: Vec<AccessMode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    expiration: Option<String>,
}

impl AddShareRequest {
    pub fn shared_folder(
        name: impl Into<String>,
        resources: &[ResourceRef],
        access_mode: &[AccessMode],
    ) -> Result<Self> {
        let name = name.into();
        require(&name, "share name")?;
        if resources.is_empty() {
            return Err(ClientError::malformed("a share needs at least one resource"));
        }
        if access_mode.is_empty() {
            return Err(ClientError::malformed("a share needs at least one access mode"));
        }
        let mut modes: Vec<AccessMode> = Vec::with_capacity(access_mode.len());
        for mode in access_mode {
            if !modes.contains(mode) {
                modes.push(*mode);
            }
        }
        Ok(Self {
            share_type: ShareType::SharedFolder,
            name,
            resources: refs_to_strings(resources),
            access_mode: modes,
            password: None,
            expiration: None,
        })
    }

    pub fn with_password(mut self, password: impl Into<String>) -> Result<Self> {
        let password = password.into();
        require(&password, "share password")?;
        self.password = Some(password);
        Ok(self)
    }

    pub fn with_expiration(mut self, expiration: impl Into<String>) -> Self {
        self.expiration = Some(expiration.into());
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AddNotificationRequest {
    #[serde(rename = "type")]
    notification_type: NotificationType,
    resource: String,
    action: NotificationAction,
    usernames: Vec<String>,
    send_email: bool,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    recipients: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl AddNotificationRequest {
    pub fn new(
        notification_type: NotificationType,
        resource: ResourceRef,
        action: NotificationAction,
    ) -> Self {
        Self {
            notification_type,
            resource: resource.to_string(),
            action,
            usernames: Vec::new(),
            send_email: false,
            recipients: Vec::new(),
            message: None,
        }
    }

    pub fn with_usernames(mut self, usernames: Vec<String>) -> Self {
        self.usernames = usernames;
        self
    }

    /// Email recipients outside the account. Each must be an email address.
    pub fn with_recipients(mut self, recipients: Vec<String>) -> Result<Self> {
        for recipient in &recipients {
            require_email(recipient)?;
        }
        self.recipients = recipients;
        Ok(self)
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn send_email(mut self, send: bool) -> Self {
        self.send_email = send;
        self
    }
}

/// Filters for listing the contents of a folder.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListResourcesQuery {
    pub resource: String,
    pub resource_type: Option<ResourceType>,
    /// Name glob, e.g. `*.csv`.
    pub name: Option<String>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
    pub include: Option<String>,
}

impl ListResourcesQuery {
    pub fn new(resource: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            ..Default::default()
        }
    }

    pub fn files(mut self) -> Self {
        self.resource_type = Some(ResourceType::File);
        self
    }

    pub fn folders(mut self) -> Self {
        self.resource_type = Some(ResourceType::Dir);
        self
    }

    pub fn named(mut self, glob: impl Into<String>) -> Self {
        self.name = Some(glob.into());
        self
    }

    pub fn page(mut self, offset: u32, limit: u32) -> Self {
        self.offset = Some(offset);
        self.limit = Some(limit);
        self
    }

    pub fn sorted_by(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    pub fn to_context(&self) -> RequestContext {
        RequestContext::new()
            .query("resource", self.resource.as_str())
            .query_opt("sort", self.sort.as_deref())
            .query_opt("offset", self.offset)
            .query_opt("limit", self.limit)
            .query_opt("type", self.resource_type.map(|t| t.as_str()))
            .query_opt("name", self.name.as_deref())
            .query_opt("include", self.include.as_deref())
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct ListUsersQuery {
    pub username: Option<String>,
    pub home_dir: Option<String>,
    pub search: Option<String>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
}

impl ListUsersQuery {
    pub fn to_context(&self) -> RequestContext {
        RequestContext::new()
            .query_opt("username", self.username.as_deref())
            .query_opt("homeDir", self.home_dir.as_deref())
            .query_opt("search", self.search.as_deref())
            .query_opt("offset", self.offset)
            .query_opt("limit", self.limit)
            .query_opt("sort", self.sort.as_deref())
    }
}

/// Filters for the session activity log.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct SessionLogsQuery {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub ip_address: Option<String>,
    pub username: Option<String>,
    pub session_id: Option<String>,
    /// Session type, e.g. `PASS` for password logins.
    pub session_type: Option<String>,
    pub offset: Option<u32>,
    pub limit: Option<u32>,
    pub sort: Option<String>,
}

impl SessionLogsQuery {
    pub fn between(start: NaiveDate, end: NaiveDate) -> Result<Self> {
        if start > end {
            return Err(ClientError::malformed(format!(
                "start date {} is after end date {}",
                start, end
            )));
        }
        Ok(Self {
            start_date: Some(start),
            end_date: Some(end),
            ..Default::default()
        })
    }

    pub fn to_context(&self) -> RequestContext {
        let date = |d: Option<NaiveDate>| d.map(|d| d.format("%Y-%m-%d").to_string());
        RequestContext::new()
            .query_opt("startDate", date(self.start_date))
            .query_opt("endDate", date(self.end_date))
            .query_opt("ipAddress", self.ip_address.as_deref())
            .query_opt("username", self.username.as_deref())
            .query_opt("sessionId", self.session_id.as_deref())
            .query_opt("type", self.session_type.as_deref())
            .query_opt("offset", self.offset)
            .query_opt("limit", self.limit)
            .query_opt("sort", self.sort.as_deref())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_resource_ref_parse() {
        assert_eq!("id:42".parse::<ResourceRef>().unwrap(), ResourceRef::Id(42));
        assert_eq!(
            " /docs/a.csv ".parse::<ResourceRef>().unwrap(),
            ResourceRef::Path("/docs/a.csv".to_string())
        );
        assert!("id:abc".parse::<ResourceRef>().is_err());
        assert!("   ".parse::<ResourceRef>().is_err());
    }

    #[test]
    fn test_resource_ref_display() {
        assert_eq!(ResourceRef::Id(7).to_string(), "id:7");
        assert_eq!(ResourceRef::Path("/x".to_string()).to_string(), "/x");
    }

    #[test]
    fn test_add_folder_requires_absolute_path() {
        assert!(AddFolderRequest::new("/a/b/c").is_ok());
        assert!(AddFolderRequest::new("a/b").is_err());
    }

    #[test]
    fn test_add_user_serialization() {
        let request = AddUserRequest::new(
            "jdoe",
            "/Home directory for API Users",
            "test@example.com",
            "99drowssaP",
            UserRole::User,
            Permissions::parse("download,upload").unwrap(),
        )
        .unwrap()
        .with_nickname("Created via the API")
        .with_welcome_email(true);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["username"], "jdoe");
        assert_eq!(value["homeResource"], "/Home directory for API Users");
        assert_eq!(value["role"], "user");
        assert_eq!(value["timeZone"], "UTC");
        assert_eq!(value["welcomeEmail"], true);
        assert_eq!(value["permissions"], "download,upload");
        assert!(value.get("expiration").is_none());
    }

    #[test]
    fn test_add_user_rejects_bad_email() {
        let result = AddUserRequest::new(
            "jdoe",
            "/home",
            "not-an-email",
            "pw",
            UserRole::User,
            Permissions::default(),
        );
        assert!(matches!(result, Err(ClientError::MalformedRequest(_))));
    }

    #[test]
    fn test_shared_folder_request() {
        let request = AddShareRequest::shared_folder(
            "Sample Shared Folder",
            &[ResourceRef::Path("/Shared".to_string())],
            &[AccessMode::Download, AccessMode::Upload],
        )
        .unwrap()
        .with_password("s3cret")
        .unwrap();

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(
            value,
            json!({
                "type": "shared_folder",
                "name": "Sample Shared Folder",
                "resources": ["/Shared"],
                "accessMode": ["download", "upload"],
                "password": "s3cret"
            })
        );
    }

    #[test]
    fn test_add_user_sends_permission_list() {
        let request = AddUserRequest::new(
            "api-user",
            "/home",
            "test@example.com",
            "99drowssaP",
            UserRole::User,
            Permissions::parse("download,upload,modify,list,changePassword,share,notification,delete")
                .unwrap(),
        )
        .unwrap();

        let value = serde_json::to_value(&request).unwrap();
        let sent = value["permissions"].as_str().unwrap();
        assert_eq!(
            Permissions::parse(sent).unwrap(),
            Permissions::parse("download,upload,modify,list,changePassword,share,notification,delete")
                .unwrap()
        );
        assert!(!sent.contains("viewFormData"));
    }

    #[test]
    fn test_shared_folder_drops_repeated_modes() {
        let request = AddShareRequest::shared_folder(
            "Team",
            &[ResourceRef::Path("/Shared".to_string())],
            &[AccessMode::Download, AccessMode::Upload, AccessMode::Download],
        )
        .unwrap();

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["accessMode"], json!(["download", "upload"]));
    }

    #[test]
    fn test_shared_folder_requires_resources() {
        assert!(AddShareRequest::shared_folder("s", &[], &[AccessMode::Download]).is_err());
        assert!(
            AddShareRequest::shared_folder("s", &[ResourceRef::Id(1)], &[]).is_err()
        );
    }

    #[test]
    fn test_notification_request() {
        let request = AddNotificationRequest::new(
            NotificationType::Folder,
            ResourceRef::Path("/uploads".to_string()),
            NotificationAction::Upload,
        )
        .with_recipients(vec!["sally@example.com".to_string()])
        .unwrap()
        .with_message("Files have been uploaded")
        .send_email(true);

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["type"], "folder");
        assert_eq!(value["action"], "upload");
        assert_eq!(value["resource"], "/uploads");
        assert_eq!(value["sendEmail"], true);
        assert_eq!(value["recipients"], json!(["sally@example.com"]));
    }

    #[test]
    fn test_notification_rejects_bad_recipient() {
        let result = AddNotificationRequest::new(
            NotificationType::File,
            ResourceRef::Id(3),
            NotificationAction::Download,
        )
        .with_recipients(vec!["nobody".to_string()]);
        assert!(result.is_err());
    }

    #[test]
    fn test_compress_request() {
        let request = CompressRequest::new(
            &[ResourceRef::Id(1), ResourceRef::Id(2), ResourceRef::Id(1)],
            "/",
            "zipped_files.zip",
        )
        .unwrap();
        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["resources"], json!(["id:1", "id:2", "id:1"]));
        assert_eq!(value["parentResource"], "/");
        assert_eq!(value["archiveName"], "zipped_files.zip");

        assert!(CompressRequest::new(&[], "/", "a.zip").is_err());
    }

    #[test]
    fn test_session_logs_between() {
        let start = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let end = NaiveDate::from_ymd_opt(2024, 3, 2).unwrap();
        assert!(SessionLogsQuery::between(start, end).is_ok());
        assert!(SessionLogsQuery::between(end, start).is_err());
    }

    #[test]
    fn test_access_mode_parse() {
        assert_eq!("Download".parse::<AccessMode>().unwrap(), AccessMode::Download);
        assert!("fly".parse::<AccessMode>().is_err());
    }
}
