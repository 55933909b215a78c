//! Message composer — turns a pipeline event into notification content.
//!
//! Composition is a pure function of the request: the same request always
//! yields the same title, body, color and action.

use herald_common::types::{
    ActionStyle, ComposedMessage, MessageAction, NotificationRequest,
};

/// Label of the logs button and link.
pub const LOGS_LABEL: &str = "View logs";

/// Compose the message for a notification request.
pub fn compose(request: &NotificationRequest) -> ComposedMessage {
    let status = request.status.as_str();
    let name = &request.app_name;
    let version = &request.build_version;
    let release = request.release_name.as_deref();
    let action = request.release_action.as_deref();

    let computed_title = match (release, action) {
        (None, _) => format!("Building {} {}!", name, status),
        (Some(release), None) => format!("Releasing {} to {} {}!", name, release, status),
        (Some(release), Some(action)) => format!(
            "Releasing {} to {} with {} {}!",
            name, release, action, status
        ),
    };

    let title = match request.custom_title.as_deref() {
        Some(custom) if !custom.is_empty() => custom.to_string(),
        _ => computed_title,
    };

    let mut body = match (release, action) {
        (None, _) => format!("Build version *{}* {}.", version, status),
        (Some(release), None) => format!("Release *{}* to *{}* {}.", version, release, status),
        (Some(release), Some(action)) => format!(
            "Release *{}* to *{}* with *{}* {}.",
            version, release, action, status
        ),
    };

    let color = request.status.color();

    let logs_url = request
        .logs_url
        .as_deref()
        .filter(|url| !url.is_empty() && request.logs_viewer_available);

    let action = logs_url.map(|url| {
        body.push_str(&format!(" <{}|{}>", url, LOGS_LABEL));
        MessageAction {
            label: LOGS_LABEL.to_string(),
            url: url.to_string(),
            style: ActionStyle::from(color),
        }
    });

    ComposedMessage {
        title,
        body,
        color,
        title_link: logs_url.map(str::to_string),
        action,
    }
}
