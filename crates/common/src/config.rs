use std::path::PathBuf;
use std::time::Duration;

use crate::types::{BuildStatus, NotificationRequest};

/// Default location of the mounted credentials file.
pub const DEFAULT_CREDENTIALS_PATH: &str = "/credentials/slack_webhook.json";

/// Display name the messages are posted under.
pub const DEFAULT_USERNAME: &str = "CI Notifier";

/// CI server kind that has no logs viewer to link to.
const CI_KIND_WITHOUT_LOGS: &str = "gocd";

/// Invocation configuration, assembled once from the CI runner's environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppConfig {
    /// Webhook URL supplied directly (bypasses credential lookup)
    pub webhook_url: Option<String>,

    /// Workspace to resolve a credential for
    pub workspace: Option<String>,

    /// Inline credentials JSON; takes precedence over the credentials file
    pub credentials_json: Option<String>,

    /// Mounted credentials file (default: /credentials/slack_webhook.json)
    pub credentials_path: PathBuf,

    /// Comma-separated channel list
    pub channels: String,

    /// Comma-separated user list
    pub users: String,

    pub username: String,
    pub title: Option<String>,
    pub status: BuildStatus,
    pub app_name: String,
    pub build_version: String,
    pub build_id: Option<String>,
    pub release_id: Option<String>,
    pub release_name: Option<String>,
    pub release_action: Option<String>,
    pub git_source: Option<String>,
    pub git_full_name: Option<String>,
    pub ci_base_url: Option<String>,
    pub ci_server_kind: String,

    /// Per-request HTTP timeout (default: 10s)
    pub http_timeout: Duration,

    /// Attempts per target, including the first (default: 3)
    pub retry_max_attempts: u32,

    /// Base of the exponential backoff (default: 500ms)
    pub retry_base_delay: Duration,
}

impl AppConfig {
    /// Load configuration from environment variables, reading `.env` first if present.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());
        let require = |key: &str| {
            get(key).ok_or_else(|| anyhow::anyhow!("{} environment variable is required", key))
        };

        Ok(Self {
            webhook_url: get("SLACK_WEBHOOK_URL"),
            workspace: get("SLACK_WORKSPACE"),
            credentials_json: get("SLACK_CREDENTIALS_JSON"),
            credentials_path: get("SLACK_CREDENTIALS_PATH")
                .unwrap_or_else(|| DEFAULT_CREDENTIALS_PATH.to_string())
                .into(),
            channels: get("SLACK_CHANNELS").unwrap_or_default(),
            users: get("SLACK_USERS").unwrap_or_default(),
            username: get("SLACK_USERNAME").unwrap_or_else(|| DEFAULT_USERNAME.to_string()),
            title: get("NOTIFY_TITLE"),
            status: BuildStatus::parse(&require("BUILD_STATUS")?),
            app_name: require("APP_NAME")?,
            build_version: get("BUILD_VERSION").unwrap_or_default(),
            build_id: get("BUILD_ID"),
            release_id: get("RELEASE_ID"),
            release_name: get("RELEASE_NAME"),
            release_action: get("RELEASE_ACTION"),
            git_source: get("GIT_SOURCE"),
            git_full_name: get("GIT_FULLNAME"),
            ci_base_url: get("CI_SERVER_BASE_URL"),
            ci_server_kind: get("CI_SERVER_KIND").unwrap_or_default(),
            http_timeout: Duration::from_secs(
                get("HTTP_TIMEOUT_SECS")
                    .unwrap_or_else(|| "10".to_string())
                    .parse()
                    .map_err(|_| anyhow::anyhow!("HTTP_TIMEOUT_SECS must be a valid u64"))?,
            ),
            retry_max_attempts: get("RETRY_MAX_ATTEMPTS")
                .unwrap_or_else(|| "3".to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("RETRY_MAX_ATTEMPTS must be a valid u32"))?,
            retry_base_delay: Duration::from_millis(
                get("RETRY_BASE_DELAY_MS")
                    .unwrap_or_else(|| "500".to_string())
                    .parse()
                    .map_err(|_| anyhow::anyhow!("RETRY_BASE_DELAY_MS must be a valid u64"))?,
            ),
        })
    }

    /// Whether the hosting CI server has a logs viewer worth linking to.
    pub fn logs_viewer_available(&self) -> bool {
        self.ci_server_kind != CI_KIND_WITHOUT_LOGS
    }

    /// Link to the build or release logs, if enough coordinates are configured.
    ///
    /// Releases link to `.../releases/{release_id}/logs`, builds to
    /// `.../builds/{build_id}/logs`.
    pub fn logs_url(&self) -> Option<String> {
        let base = self.ci_base_url.as_deref()?.trim_end_matches('/');
        let source = self.git_source.as_deref()?;
        let full_name = self.git_full_name.as_deref()?;

        let (kind, id) = if self.release_name.is_some() {
            ("releases", self.release_id.as_deref()?)
        } else {
            ("builds", self.build_id.as_deref()?)
        };

        Some(format!(
            "{}/pipelines/{}/{}/{}/{}/logs",
            base, source, full_name, kind, id
        ))
    }

    /// The request handed to the message composer.
    pub fn notification_request(&self) -> NotificationRequest {
        NotificationRequest {
            status: self.status.clone(),
            app_name: self.app_name.clone(),
            build_version: self.build_version.clone(),
            release_name: self.release_name.clone(),
            release_action: self.release_action.clone(),
            custom_title: self.title.clone(),
            logs_url: self.logs_url(),
            logs_viewer_available: self.logs_viewer_available(),
        }
    }
}
