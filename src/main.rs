//! exavault CLI - Work with an ExaVault account from the command line.

use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use chrono::{Days, Utc};
use clap::{Parser, Subcommand, ValueEnum};
use glob::glob;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use exavault::models::{
    failed_logins_by_user, format_size, NotificationAction, NotificationType, Permissions, User,
    UserRole,
};
use exavault::{
    AccessMode, AddFolderRequest, AddNotificationRequest, AddShareRequest, AddUserRequest,
    ClientConfig, CompressRequest, Credentials, ListResourcesQuery, ListUsersQuery, ResourceRef,
    SessionLogsQuery, VaultClient,
};

/// CLI tool for working with an ExaVault account.
#[derive(Parser)]
#[command(name = "exavault")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// API key from the Developer page of the web file manager.
    #[arg(long, env = "EV_KEY", hide_env_values = true)]
    api_key: String,

    /// Access token for the API key.
    #[arg(long, env = "EV_TOKEN", hide_env_values = true)]
    access_token: String,

    /// Account name or API URL (e.g. acme or https://acme.exavault.com/api/v2).
    #[arg(long, env = "ACCOUNT_URL")]
    account_url: String,

    /// Request timeout in seconds.
    #[arg(long, env = "EV_TIMEOUT", default_value_t = 30)]
    timeout: u64,

    /// Enable debug logging.
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Show disk usage for the account.
    Account,

    /// List the contents of a folder.
    List {
        /// Folder path or id:<n>.
        folder: String,

        /// Only list files or folders.
        #[arg(long = "type", value_enum)]
        resource_type: Option<TypeArg>,

        /// Name glob, e.g. "*.csv".
        #[arg(long)]
        name: Option<String>,

        #[arg(long)]
        offset: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,

        /// Sort key, e.g. "sort_files_name" or "-sort_files_date".
        #[arg(long)]
        sort: Option<String>,
    },

    /// Create a folder (parents are created as needed).
    Mkdir {
        /// Absolute folder path.
        path: String,
    },

    /// Upload files to a folder.
    Upload {
        /// File patterns to upload (supports glob patterns like *.csv, file_{1,2,3}.txt).
        #[arg(required = true)]
        patterns: Vec<String>,

        /// Destination folder.
        #[arg(long, short = 't', default_value = "/")]
        to: String,
    },

    /// Download resources. Several resources arrive as one zip archive.
    Download {
        /// Resource paths or id:<n> references.
        #[arg(required = true)]
        resources: Vec<String>,

        /// Local file to write.
        #[arg(long, short = 't')]
        to: PathBuf,
    },

    /// Download every file in a folder matching a name glob.
    Fetch {
        /// Folder path.
        folder: String,

        /// Name glob, e.g. "*.csv".
        #[arg(long, default_value = "*")]
        name: String,

        /// Local file or directory to write to.
        #[arg(long, short = 't', default_value = ".")]
        to: PathBuf,
    },

    /// Compress resources into a zip archive on the account.
    Compress {
        /// Resource paths or id:<n> references.
        #[arg(required = true)]
        resources: Vec<String>,

        /// Folder the archive is created in.
        #[arg(long, default_value = "/")]
        parent: String,

        /// Archive file name.
        #[arg(long)]
        name: String,
    },

    /// List users.
    Users {
        #[arg(long)]
        offset: Option<u32>,

        #[arg(long)]
        limit: Option<u32>,

        /// Write a CSV report to this file instead of printing.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Create a user.
    AddUser {
        username: String,

        /// Home folder of the user.
        #[arg(long)]
        home: String,

        #[arg(long)]
        email: String,

        #[arg(long, env = "EV_NEW_USER_PASSWORD", hide_env_values = true)]
        password: String,

        #[arg(long, value_enum, default_value = "user")]
        role: RoleArg,

        /// Comma-separated permissions, e.g. download,upload,list,changePassword.
        #[arg(long, default_value = "download,upload,list")]
        permissions: String,

        #[arg(long)]
        nickname: Option<String>,

        #[arg(long, default_value = "UTC")]
        time_zone: String,

        /// Send the welcome email.
        #[arg(long)]
        welcome_email: bool,
    },

    /// Share a folder.
    Share {
        /// Folder path or id:<n>.
        folder: String,

        /// Share name; defaults to the folder reference.
        #[arg(long)]
        name: Option<String>,

        #[arg(long, env = "EV_SHARE_PASSWORD", hide_env_values = true)]
        password: Option<String>,

        /// Access modes, comma separated: download,upload,modify,delete.
        #[arg(long, value_delimiter = ',', default_value = "download")]
        mode: Vec<String>,
    },

    /// Add a notification on a file or folder.
    Notify {
        /// Resource path or id:<n>.
        resource: String,

        #[arg(long = "type", value_enum, default_value = "folder")]
        notification_type: NotifyTypeArg,

        #[arg(long, value_enum, default_value = "upload")]
        action: ActionArg,

        /// Account user to notify (repeatable).
        #[arg(long = "user")]
        usernames: Vec<String>,

        /// Email address to notify (repeatable).
        #[arg(long = "recipient")]
        recipients: Vec<String>,

        #[arg(long)]
        message: Option<String>,

        /// Send notification emails.
        #[arg(long)]
        send_email: bool,
    },

    /// Count failed logins per user over the last days.
    FailedLogins {
        #[arg(long, default_value_t = 1)]
        days: u64,

        /// Session type to inspect.
        #[arg(long = "type", default_value = "PASS")]
        session_type: String,

        #[arg(long, default_value_t = 200)]
        limit: u32,
    },
}

#[derive(Clone, Copy, ValueEnum)]
enum TypeArg {
    File,
    Dir,
}

#[derive(Clone, Copy, ValueEnum)]
enum RoleArg {
    User,
    Admin,
}

impl From<RoleArg> for UserRole {
    fn from(role: RoleArg) -> Self {
        match role {
            RoleArg::User => UserRole::User,
            RoleArg::Admin => UserRole::Admin,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum NotifyTypeArg {
    File,
    Folder,
}

impl From<NotifyTypeArg> for NotificationType {
    fn from(kind: NotifyTypeArg) -> Self {
        match kind {
            NotifyTypeArg::File => NotificationType::File,
            NotifyTypeArg::Folder => NotificationType::Folder,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum ActionArg {
    Upload,
    Download,
    Delete,
    All,
}

impl From<ActionArg> for NotificationAction {
    fn from(action: ActionArg) -> Self {
        match action {
            ActionArg::Upload => NotificationAction::Upload,
            ActionArg::Download => NotificationAction::Download,
            ActionArg::Delete => NotificationAction::Delete,
            ActionArg::All => NotificationAction::All,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose);

    let config = ClientConfig::for_account(&cli.account_url)
        .with_context(|| format!("Invalid account URL: {}", cli.account_url))?
        .with_timeout(Duration::from_secs(cli.timeout));
    let credentials = Credentials::new(cli.api_key, cli.access_token)
        .context("Invalid API credentials")?;

    let client = VaultClient::new(config, credentials).context("Failed to create client")?;

    match cli.command {
        Commands::Account => {
            let account = client
                .get_account()
                .await
                .context("Failed to get account info")?;
            let quota = account.attributes.quota;
            println!("Account used : {}", format_size(quota.disk_used));
            println!("Total size   : {}", format_size(quota.disk_limit));
            println!("Usage        : {}%", quota.percent_used());
        }

        Commands::List {
            folder,
            resource_type,
            name,
            offset,
            limit,
            sort,
        } => {
            let mut query = ListResourcesQuery::new(folder.clone());
            query.resource_type = resource_type.map(|t| match t {
                TypeArg::File => exavault::models::ResourceType::File,
                TypeArg::Dir => exavault::models::ResourceType::Dir,
            });
            query.name = name;
            query.offset = offset;
            query.limit = limit;
            query.sort = sort;

            let listing = client
                .list_resources(&query)
                .await
                .with_context(|| format!("Failed to list resources in: {}", folder))?;

            if listing.is_empty() {
                println!("No resources found.");
            } else {
                println!("{:<12} {:>10} {:<5} {}", "ID", "SIZE", "TYPE", "PATH");
                println!("{}", "-".repeat(80));
                for resource in &listing.data {
                    println!("{}", resource);
                }
                println!(
                    "{} of {} result(s)",
                    listing.returned_results, listing.total_results
                );
            }
        }

        Commands::Mkdir { path } => {
            let request = AddFolderRequest::new(path.clone())?;
            let folder = client
                .add_folder(&request)
                .await
                .with_context(|| format!("Failed to create folder: {}", path))?;
            println!("Created new folder {} (ID #{})", folder.attributes.path, folder.id);
        }

        Commands::Upload { patterns, to } => {
            let files_to_upload = collect_files(&patterns)?;

            if files_to_upload.is_empty() {
                anyhow::bail!("No files to upload");
            }

            println!("Uploading {} file(s) to {}...", files_to_upload.len(), to);

            for (idx, file_path) in files_to_upload.iter().enumerate() {
                let filename = file_path.file_name().unwrap_or_default().to_string_lossy();
                print!("[{}/{}] Uploading {}... ", idx + 1, files_to_upload.len(), filename);

                let content = tokio::fs::read(file_path)
                    .await
                    .with_context(|| format!("Failed to read {:?}", file_path))?;
                let size = content.len() as u64;
                let target = format!("{}/{}", to.trim_end_matches('/'), filename);

                match client.upload_file(&target, content, size).await {
                    Ok(resource) => {
                        println!("OK ({})", resource.attributes.path);
                    }
                    Err(e) => {
                        println!("FAILED");
                        eprintln!("  Error: {}", e);
                    }
                }
            }

            println!("Done.");
        }

        Commands::Download { resources, to } => {
            let refs = parse_refs(&resources)?;
            let content = client
                .download(&refs)
                .await
                .context("Failed to download resources")?;
            write_output(&to, &content).await?;
            println!("Downloaded {} to {:?}", format_size(content.len() as u64), to);
        }

        Commands::Fetch { folder, name, to } => {
            let query = ListResourcesQuery::new(folder.clone()).files().named(name);
            let result = client
                .download_matching(&query)
                .await
                .with_context(|| format!("Failed to fetch files from: {}", folder))?;

            let Some(content) = result.content else {
                println!("Found no files to download");
                return Ok(());
            };

            println!("Found {} file(s) to download", result.matched.len());
            for resource in &result.matched {
                println!("{}", resource.attributes.path);
            }

            let final_path = if to.is_dir() {
                match result.matched.as_slice() {
                    [single] => to.join(&single.attributes.name),
                    _ => to.join("download.zip"),
                }
            } else {
                to
            };
            write_output(&final_path, &content).await?;
            println!("File(s) downloaded to {:?}", final_path);
        }

        Commands::Compress {
            resources,
            parent,
            name,
        } => {
            let refs = parse_refs(&resources)?;
            let request = CompressRequest::new(&refs, parent, name)?;
            let archive = client
                .compress_files(&request)
                .await
                .context("Failed to compress resources")?;
            println!("Created archive at {}", archive.attributes.path);
        }

        Commands::Users {
            offset,
            limit,
            output,
        } => {
            let query = ListUsersQuery {
                offset,
                limit,
                ..Default::default()
            };
            let users = client.list_users(&query).await.context("Failed to list users")?;

            if let Some(path) = output {
                write_users_csv(&path, &users.data)?;
                println!(
                    "Listed {} of {} user(s) to {}",
                    users.returned_results,
                    users.total_results,
                    path.display()
                );
                return Ok(());
            }

            println!(
                "Listing {} of {} user(s)",
                users.returned_results, users.total_results
            );
            for user in &users.data {
                let attributes = &user.attributes;
                println!(
                    "{}\t{}\t{}\t{}\t{}\t{}",
                    user.id,
                    attributes.username,
                    attributes.role,
                    attributes.email.as_deref().unwrap_or("-"),
                    attributes.permissions,
                    if attributes.is_locked() { "locked" } else { "" }
                );
            }
        }

        Commands::AddUser {
            username,
            home,
            email,
            password,
            role,
            permissions,
            nickname,
            time_zone,
            welcome_email,
        } => {
            let permissions = Permissions::parse(&permissions)?;
            let mut request =
                AddUserRequest::new(username, home, email, password, role.into(), permissions)?
                    .with_time_zone(time_zone)
                    .with_welcome_email(welcome_email);
            if let Some(nickname) = nickname {
                request = request.with_nickname(nickname);
            }

            let user = client
                .add_user(&request)
                .await
                .with_context(|| format!("Failed to add user: {}", request.username()))?;
            println!("Created new user {} as ID #{}", user.attributes.username, user.id);
        }

        Commands::Share {
            folder,
            name,
            password,
            mode,
        } => {
            let folder_ref: ResourceRef = folder.parse()?;
            let modes = mode
                .iter()
                .map(|m| m.parse::<AccessMode>())
                .collect::<exavault::Result<Vec<_>>>()?;
            let name = name.unwrap_or_else(|| folder_ref.to_string());

            let mut request = AddShareRequest::shared_folder(name, &[folder_ref], &modes)?;
            if let Some(password) = password {
                request = request.with_password(password)?;
            }

            let share = client
                .add_share(&request)
                .await
                .with_context(|| format!("Failed to share folder: {}", folder))?;
            println!(
                "Created shared folder {} ({})",
                share.attributes.name,
                share.attributes.hash.as_deref().unwrap_or("-")
            );
        }

        Commands::Notify {
            resource,
            notification_type,
            action,
            usernames,
            recipients,
            message,
            send_email,
        } => {
            let mut request = AddNotificationRequest::new(
                notification_type.into(),
                resource.parse()?,
                action.into(),
            )
            .with_usernames(usernames)
            .with_recipients(recipients)?
            .send_email(send_email);
            if let Some(message) = message {
                request = request.with_message(message);
            }

            let notification = client
                .add_notification(&request)
                .await
                .with_context(|| format!("Failed to add notification on: {}", resource))?;
            println!("Created notification #{} on {}", notification.id, resource);
        }

        Commands::FailedLogins {
            days,
            session_type,
            limit,
        } => {
            let end = Utc::now().date_naive();
            let start = end
                .checked_sub_days(Days::new(days))
                .context("Date range out of bounds")?;

            let mut query = SessionLogsQuery::between(start, end)?;
            query.session_type = Some(session_type);
            query.offset = Some(0);
            query.limit = Some(limit);
            query.sort = Some("-date".to_string());

            let logs = client
                .get_session_logs(&query)
                .await
                .context("Failed to get session logs")?;
            let failed = failed_logins_by_user(&logs.data);

            println!("{} user(s) with failed logins", failed.len());
            println!("{:<24} {}", "USERNAME", "COUNT");
            println!("{}", "-".repeat(32));
            for (username, count) in &failed {
                println!("{:<24} {}", username, count);
            }
        }
    }

    Ok(())
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("exavault={}", level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

fn parse_refs(values: &[String]) -> Result<Vec<ResourceRef>> {
    values
        .iter()
        .map(|value| {
            value
                .parse::<ResourceRef>()
                .with_context(|| format!("Invalid resource reference: {}", value))
        })
        .collect()
}

async fn write_output(path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory: {:?}", parent))?;
        }
    }
    tokio::fs::write(path, content)
        .await
        .with_context(|| format!("Failed to write {:?}", path))
}

const USER_REPORT_HEADERS: [&str; 22] = [
    "Id",
    "Username",
    "Nickname",
    "Email Address",
    "Home Folder",
    "Role",
    "Time Zone",
    "Download",
    "Upload",
    "Modify",
    "Delete",
    "List",
    "Change Password",
    "Share",
    "Notification",
    "View Form Data",
    "Delete Form Data",
    "Expiration",
    "Last Logged In",
    "Locked",
    "Created",
    "Modified",
];

/// Write one CSV row per user, header first.
fn write_users_csv(path: &Path, users: &[User]) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create {:?}", path))?;
    writer.write_record(USER_REPORT_HEADERS)?;

    let flag = |set: bool| if set { "yes" } else { "" };
    for user in users {
        let attributes = &user.attributes;
        let permissions = &attributes.permissions;
        writer.write_record([
            user.id.to_string().as_str(),
            attributes.username.as_str(),
            attributes.nickname.as_deref().unwrap_or(""),
            attributes.email.as_deref().unwrap_or(""),
            attributes.home_dir.as_deref().unwrap_or(""),
            attributes.role.as_str(),
            attributes.time_zone.as_deref().unwrap_or(""),
            flag(permissions.download),
            flag(permissions.upload),
            flag(permissions.modify),
            flag(permissions.delete),
            flag(permissions.list),
            flag(permissions.change_password),
            flag(permissions.share),
            flag(permissions.notification),
            flag(permissions.view_form_data),
            flag(permissions.delete_form_data),
            attributes.expiration.as_deref().unwrap_or(""),
            attributes.last_login().unwrap_or("never"),
            if attributes.is_locked() { "locked" } else { "" },
            attributes.created.as_deref().unwrap_or(""),
            attributes.modified.as_deref().unwrap_or(""),
        ])?;
    }

    writer
        .flush()
        .with_context(|| format!("Failed to write {:?}", path))
}

/// Expand glob and brace patterns into a sorted, deduplicated file list.
fn collect_files(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files: Vec<PathBuf> = Vec::new();

    for pattern in patterns {
        for expanded_pattern in expand_braces(pattern) {
            let matches: Vec<PathBuf> = glob(&expanded_pattern)
                .with_context(|| format!("Invalid glob pattern: {}", expanded_pattern))?
                .filter_map(|r| r.ok())
                .filter(|p| p.is_file())
                .collect();

            if matches.is_empty() {
                // If no glob matches, treat as literal path
                let path = PathBuf::from(&expanded_pattern);
                if path.is_file() {
                    files.push(path);
                } else {
                    eprintln!("Warning: No files matched pattern: {}", expanded_pattern);
                }
            } else {
                files.extend(matches);
            }
        }
    }

    files.sort();
    files.dedup();
    Ok(files)
}

/// Expand brace patterns like file_{1,2,3}.txt into multiple patterns.
fn expand_braces(pattern: &str) -> Vec<String> {
    if let Some(start) = pattern.find('{') {
        if let Some(end) = pattern[start..].find('}') {
            let end = start + end;
            let prefix = &pattern[..start];
            let suffix = &pattern[end + 1..];
            let alternatives = &pattern[start + 1..end];

            return alternatives
                .split(',')
                .flat_map(|alt| {
                    let expanded = format!("{}{}{}", prefix, alt.trim(), suffix);
                    expand_braces(&expanded)
                })
                .collect();
        }
    }

    vec![pattern.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn test_expand_braces_simple() {
        let result = expand_braces("file_{1,2,3}.txt");
        assert_eq!(result, vec!["file_1.txt", "file_2.txt", "file_3.txt"]);
    }

    #[test]
    fn test_expand_braces_no_braces() {
        assert_eq!(expand_braces("*.csv"), vec!["*.csv"]);
    }

    #[test]
    fn test_expand_braces_nested() {
        let result = expand_braces("{a,b}_{1,2}.txt");
        assert_eq!(result, vec!["a_1.txt", "a_2.txt", "b_1.txt", "b_2.txt"]);
    }

    #[test]
    fn test_collect_files_dedups_overlapping_patterns() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("a.csv"), "x").unwrap();
        fs::write(dir.path().join("b.csv"), "y").unwrap();
        fs::write(dir.path().join("c.txt"), "z").unwrap();

        let base = dir.path().display().to_string();
        let patterns = vec![format!("{}/*.csv", base), format!("{}/a.csv", base)];

        let files = collect_files(&patterns).unwrap();
        assert_eq!(files.len(), 2);
        assert!(files[0].ends_with("a.csv"));
        assert!(files[1].ends_with("b.csv"));
    }

    #[test]
    fn test_parse_refs() {
        let refs = parse_refs(&["id:5".to_string(), "/docs".to_string()]).unwrap();
        assert_eq!(
            refs,
            vec![ResourceRef::Id(5), ResourceRef::Path("/docs".to_string())]
        );
        assert!(parse_refs(&["id:x".to_string()]).is_err());
    }

    #[test]
    fn test_write_users_csv() {
        let users: Vec<User> = serde_json::from_value(serde_json::json!([
            {
                "id": 12,
                "type": "user",
                "attributes": {
                    "username": "sally",
                    "nickname": "Sally, from sales",
                    "email": "sally@example.com",
                    "homeDir": "/sally",
                    "role": "admin",
                    "timeZone": "UTC",
                    "permissions": {"download": true, "list": true, "changePassword": true},
                    "status": 1,
                    "accessTimestamp": "0000-00-00 00:00:00",
                    "created": "2024-01-02T03:04:05Z"
                }
            },
            {
                "id": 13,
                "type": "user",
                "attributes": {
                    "username": "bob",
                    "role": "user",
                    "accessTimestamp": "2024-03-01 10:15:00"
                }
            }
        ]))
        .unwrap();

        let dir = tempdir().unwrap();
        let path = dir.path().join("users.csv");
        write_users_csv(&path, &users).unwrap();

        let mut reader = csv::Reader::from_path(&path).unwrap();
        let headers = reader.headers().unwrap().clone();
        assert_eq!(headers.len(), USER_REPORT_HEADERS.len());
        assert_eq!(&headers[18], "Last Logged In");

        let rows: Vec<csv::StringRecord> = reader.records().map(|r| r.unwrap()).collect();
        assert_eq!(rows.len(), 2);

        let sally = &rows[0];
        assert_eq!(&sally[0], "12");
        assert_eq!(&sally[2], "Sally, from sales");
        assert_eq!(&sally[5], "admin");
        assert_eq!(&sally[7], "yes");
        assert_eq!(&sally[8], "");
        assert_eq!(&sally[12], "yes");
        assert_eq!(&sally[18], "never");
        assert_eq!(&sally[19], "locked");
        assert_eq!(&sally[20], "2024-01-02T03:04:05Z");

        let bob = &rows[1];
        assert_eq!(&bob[1], "bob");
        assert_eq!(&bob[5], "user");
        assert_eq!(&bob[18], "2024-03-01 10:15:00");
        assert_eq!(&bob[19], "");
    }

    #[test]
    fn test_write_users_csv_empty_listing_keeps_header() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("users.csv");
        write_users_csv(&path, &[]).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert!(content.starts_with("Id,Username,Nickname,Email Address"));
        assert_eq!(content.lines().count(), 1);
    }
}
