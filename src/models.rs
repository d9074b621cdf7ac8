//! Data models for ExaVault API responses.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{ClientError, Result};

/// Envelope for endpoints that return one record.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Single<T> {
    #[serde(default)]
    pub response_status: Option<u16>,
    pub data: T,
    /// Side-loaded related records.
    #[serde(default)]
    pub included: Vec<Value>,
}

/// Envelope for endpoints that return a page of records.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Collection<T> {
    #[serde(default)]
    pub response_status: Option<u16>,
    pub total_results: u64,
    pub returned_results: u64,
    pub data: Vec<T>,
    #[serde(default)]
    pub included: Vec<Value>,
}

impl<T> Collection<T> {
    pub fn is_empty(&self) -> bool {
        self.returned_results == 0 || self.data.is_empty()
    }
}

/// A typed record: numeric id, record type and attributes.
#[derive(Debug, Clone, Deserialize)]
pub struct Record<A> {
    #[serde(deserialize_with = "deserialize_id")]
    pub id: u64,
    #[serde(rename = "type", default)]
    pub kind: String,
    pub attributes: A,
}

pub type Resource = Record<ResourceAttributes>;
pub type User = Record<UserAttributes>;
pub type Share = Record<ShareAttributes>;
pub type Notification = Record<NotificationAttributes>;
pub type Account = Record<AccountAttributes>;
pub type SessionActivity = Record<SessionActivityAttributes>;

/// Ids arrive as JSON numbers on most endpoints and as strings on some.
fn deserialize_id<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match NumberOrString::deserialize(deserializer)? {
        NumberOrString::Number(n) => Ok(n),
        NumberOrString::String(s) => s.parse::<u64>().map_err(serde::de::Error::custom),
    }
}

fn deserialize_size<'de, D>(deserializer: D) -> std::result::Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<NumberOrString> = Option::deserialize(deserializer)?;
    match opt {
        Some(NumberOrString::Number(n)) => Ok(Some(n)),
        Some(NumberOrString::String(s)) => {
            s.parse::<u64>().map(Some).map_err(serde::de::Error::custom)
        }
        None => Ok(None),
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum NumberOrString {
    Number(u64),
    String(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    File,
    Dir,
}

impl ResourceType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceType::File => "file",
            ResourceType::Dir => "dir",
        }
    }
}

/// Attributes of a file or folder.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAttributes {
    pub name: String,
    pub path: String,
    #[serde(rename = "type")]
    pub resource_type: ResourceType,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default, deserialize_with = "deserialize_size")]
    pub size: Option<u64>,
    #[serde(default)]
    pub extension: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
    #[serde(default)]
    pub file_count: Option<u64>,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let size_str = self
            .attributes
            .size
            .map(format_size)
            .unwrap_or_else(|| "-".to_string());
        write!(
            f,
            "{}\t{}\t{}\t{}",
            self.id,
            size_str,
            self.attributes.resource_type.as_str(),
            self.attributes.path
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    User,
    Admin,
    Master,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::User => "user",
            UserRole::Admin => "admin",
            UserRole::Master => "master",
        }
    }
}

impl fmt::Display for UserRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Per-user permission flags.
///
/// Responses carry these as an object of booleans; requests send the
/// comma-separated `Display` form.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Permissions {
    pub list: bool,
    pub download: bool,
    pub upload: bool,
    pub modify: bool,
    pub delete: bool,
    pub change_password: bool,
    pub share: bool,
    pub notification: bool,
    pub view_form_data: bool,
    pub delete_form_data: bool,
}

impl Permissions {
    /// Parse the comma-separated form, e.g. `download,upload,changePassword`.
    pub fn parse(list: &str) -> Result<Self> {
        let mut permissions = Permissions::default();
        for name in list.split(',').map(str::trim).filter(|n| !n.is_empty()) {
            let flag = match name {
                "list" => &mut permissions.list,
                "download" => &mut permissions.download,
                "upload" => &mut permissions.upload,
                "modify" => &mut permissions.modify,
                "delete" => &mut permissions.delete,
                "changePassword" => &mut permissions.change_password,
                "share" => &mut permissions.share,
                "notification" => &mut permissions.notification,
                "viewFormData" => &mut permissions.view_form_data,
                "deleteFormData" => &mut permissions.delete_form_data,
                other => {
                    return Err(ClientError::malformed(format!(
                        "unknown permission '{}'",
                        other
                    )))
                }
            };
            *flag = true;
        }
        Ok(permissions)
    }

    fn names(&self) -> Vec<&'static str> {
        [
            (self.list, "list"),
            (self.download, "download"),
            (self.upload, "upload"),
            (self.modify, "modify"),
            (self.delete, "delete"),
            (self.change_password, "changePassword"),
            (self.share, "share"),
            (self.notification, "notification"),
            (self.view_form_data, "viewFormData"),
            (self.delete_form_data, "deleteFormData"),
        ]
        .into_iter()
        .filter_map(|(set, name)| set.then_some(name))
        .collect()
    }
}

impl fmt::Display for Permissions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.names().join(","))
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAttributes {
    pub username: String,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub home_dir: Option<String>,
    pub role: UserRole,
    #[serde(default)]
    pub permissions: Permissions,
    #[serde(default)]
    pub time_zone: Option<String>,
    /// 0 when active, 1 when locked.
    #[serde(default)]
    pub status: Option<u8>,
    #[serde(default)]
    pub expiration: Option<String>,
    #[serde(default)]
    pub access_timestamp: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub modified: Option<String>,
}

impl UserAttributes {
    pub fn is_locked(&self) -> bool {
        self.status.unwrap_or(0) != 0
    }

    /// Last login time, or `None` if the user never logged in.
    ///
    /// The service reports "never" as a zero timestamp (`0000-00-00 ...`).
    pub fn last_login(&self) -> Option<&str> {
        self.access_timestamp
            .as_deref()
            .filter(|ts| !ts.is_empty() && !ts.starts_with("0000"))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShareType {
    SharedFolder,
    Receive,
    Send,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShareAttributes {
    pub name: String,
    #[serde(rename = "type")]
    pub share_type: ShareType,
    #[serde(default)]
    pub hash: Option<String>,
    #[serde(default)]
    pub has_password: Option<bool>,
    #[serde(default)]
    pub expiration: Option<String>,
    #[serde(default)]
    pub created: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationType {
    File,
    Folder,
    SharedFolder,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotificationAction {
    Upload,
    Download,
    Delete,
    All,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationAttributes {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub action: NotificationAction,
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub usernames: Vec<String>,
    #[serde(default)]
    pub send_email: Option<bool>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Storage quota, in bytes.
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quota {
    pub disk_limit: u64,
    pub disk_used: u64,
    #[serde(default)]
    pub notice_enabled: Option<bool>,
    #[serde(default)]
    pub notice_threshold: Option<u32>,
}

impl Quota {
    /// Used share of the limit, rounded to one decimal. Zero when there is no limit.
    pub fn percent_used(&self) -> f64 {
        if self.disk_limit == 0 {
            return 0.0;
        }
        let percent = self.disk_used as f64 / self.disk_limit as f64 * 100.0;
        (percent * 10.0).round() / 10.0
    }
}

impl fmt::Display for Quota {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} of {} ({}%)",
            format_size(self.disk_used),
            format_size(self.disk_limit),
            self.percent_used()
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountAttributes {
    #[serde(default)]
    pub account_name: Option<String>,
    pub quota: Quota,
    #[serde(default)]
    pub max_users: Option<u64>,
    #[serde(default)]
    pub user_count: Option<u64>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionActivityAttributes {
    pub username: String,
    pub status: String,
    #[serde(default)]
    pub date: Option<String>,
    #[serde(default)]
    pub ip_address: Option<String>,
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub session_id: Option<String>,
    #[serde(rename = "type", default)]
    pub activity_type: Option<String>,
}

impl SessionActivityAttributes {
    pub fn is_failed(&self) -> bool {
        self.status.eq_ignore_ascii_case("failed")
    }
}

/// Count failed session entries per username.
pub fn failed_logins_by_user(entries: &[SessionActivity]) -> BTreeMap<String, usize> {
    let mut counts = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.attributes.is_failed()) {
        *counts.entry(entry.attributes.username.clone()).or_insert(0) += 1;
    }
    counts
}

/// Error body returned with non-2xx responses.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApiErrorResponse {
    #[serde(default)]
    pub response_status: Option<u16>,
    #[serde(default)]
    pub errors: Vec<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub detail: Option<String>,
}

impl ApiErrorResponse {
    /// Message of the first error, if there is one.
    pub fn message(&self) -> Option<String> {
        let first = self.errors.first()?;
        match (&first.code, &first.detail) {
            (Some(code), Some(detail)) => Some(format!("{}: {}", code, detail)),
            (Some(only), None) | (None, Some(only)) => Some(only.clone()),
            (None, None) => None,
        }
    }
}

/// Format bytes into human-readable size.
pub fn format_size(bytes: u64) -> String {
    const KB: u64 = 1024;
    const MB: u64 = KB * 1024;
    const GB: u64 = MB * 1024;

    if bytes >= GB {
        format!("{:.2} GB", bytes as f64 / GB as f64)
    } else if bytes >= MB {
        format!("{:.2} MB", bytes as f64 / MB as f64)
    } else if bytes >= KB {
        format!("{:.2} KB", bytes as f64 / KB as f64)
    } else {
        format!("{} B", bytes)
    }
}
