use serde::{Deserialize, Serialize};

/// Outcome of the pipeline step being reported on.
///
/// Only the literal strings `succeeded` and `failed` are recognised; anything
/// else is carried through verbatim and rendered as neutral text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum BuildStatus {
    Succeeded,
    Failed,
    Other(String),
}

impl BuildStatus {
    /// Case-sensitive parse. Never fails.
    pub fn parse(raw: &str) -> Self {
        match raw {
            "succeeded" => BuildStatus::Succeeded,
            "failed" => BuildStatus::Failed,
            other => BuildStatus::Other(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            BuildStatus::Succeeded => "succeeded",
            BuildStatus::Failed => "failed",
            BuildStatus::Other(s) => s,
        }
    }

    /// Color marker that agrees with this status.
    pub fn color(&self) -> ColorMarker {
        match self {
            BuildStatus::Succeeded => ColorMarker::Success,
            BuildStatus::Failed => ColorMarker::Failure,
            BuildStatus::Other(_) => ColorMarker::None,
        }
    }
}

impl From<String> for BuildStatus {
    fn from(value: String) -> Self {
        BuildStatus::parse(&value)
    }
}

impl From<BuildStatus> for String {
    fn from(value: BuildStatus) -> Self {
        value.as_str().to_string()
    }
}

impl std::fmt::Display for BuildStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Color/urgency marker of a composed message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ColorMarker {
    None,
    Success,
    Failure,
}

impl ColorMarker {
    /// Slack attachment color, if any.
    pub fn slack_color(&self) -> Option<&'static str> {
        match self {
            ColorMarker::None => None,
            ColorMarker::Success => Some("good"),
            ColorMarker::Failure => Some("danger"),
        }
    }
}

/// Visual style of an attached action button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStyle {
    Default,
    Primary,
    Danger,
}

impl From<ColorMarker> for ActionStyle {
    fn from(color: ColorMarker) -> Self {
        match color {
            ColorMarker::None => ActionStyle::Default,
            ColorMarker::Success => ActionStyle::Primary,
            ColorMarker::Failure => ActionStyle::Danger,
        }
    }
}

impl std::fmt::Display for ActionStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionStyle::Default => write!(f, "default"),
            ActionStyle::Primary => write!(f, "primary"),
            ActionStyle::Danger => write!(f, "danger"),
        }
    }
}

/// Everything the composer needs to know about one pipeline event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotificationRequest {
    pub status: BuildStatus,
    /// Application / pipeline name (e.g. "myapp")
    pub app_name: String,
    pub build_version: String,
    pub release_name: Option<String>,
    pub release_action: Option<String>,
    /// Overrides the computed title when set
    pub custom_title: Option<String>,
    pub logs_url: Option<String>,
    /// False for CI servers without a logs viewer
    pub logs_viewer_available: bool,
}

impl NotificationRequest {
    /// A build event with no release, title override or logs link.
    pub fn build(app_name: impl Into<String>, status: BuildStatus) -> Self {
        Self {
            status,
            app_name: app_name.into(),
            build_version: String::new(),
            release_name: None,
            release_action: None,
            custom_title: None,
            logs_url: None,
            logs_viewer_available: true,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.build_version = version.into();
        self
    }

    pub fn with_release(mut self, release: impl Into<String>) -> Self {
        self.release_name = Some(release.into());
        self
    }

    pub fn with_action(mut self, action: impl Into<String>) -> Self {
        self.release_action = Some(action.into());
        self
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.custom_title = Some(title.into());
        self
    }

    pub fn with_logs(mut self, logs_url: impl Into<String>, viewer_available: bool) -> Self {
        self.logs_url = Some(logs_url.into());
        self.logs_viewer_available = viewer_available;
        self
    }
}

/// Button attached to a message, linking to the pipeline logs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageAction {
    pub label: String,
    pub url: String,
    pub style: ActionStyle,
}

/// Status-derived notification content, prior to wire serialization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ComposedMessage {
    pub title: String,
    pub body: String,
    pub color: ColorMarker,
    pub title_link: Option<String>,
    pub action: Option<MessageAction>,
}

/// Result of delivering one composed message to one target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeliveryOutcome {
    pub target: String,
    pub success: bool,
    /// Number of HTTP attempts made (0 when the payload never left the process)
    pub attempts: u32,
    pub error: Option<String>,
}

impl DeliveryOutcome {
    pub fn delivered(target: impl Into<String>, attempts: u32) -> Self {
        Self {
            target: target.into(),
            success: true,
            attempts,
            error: None,
        }
    }

    pub fn failed(target: impl Into<String>, attempts: u32, error: impl ToString) -> Self {
        Self {
            target: target.into(),
            success: false,
            attempts,
            error: Some(error.to_string()),
        }
    }
}
