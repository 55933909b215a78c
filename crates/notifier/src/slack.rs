//! Slack incoming-webhook payload (legacy attachments format).

use serde::Serialize;

use herald_common::types::ComposedMessage;

/// Body POSTed to the webhook, one per target.
#[derive(Debug, Clone, Serialize)]
pub struct SlackMessageBody<'a> {
    pub channel: &'a str,
    pub username: &'a str,
    pub attachments: Vec<SlackAttachment<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlackAttachment<'a> {
    pub fallback: &'a str,
    pub title: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title_link: Option<&'a str>,
    pub text: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<&'static str>,
    pub mrkdwn_in: Vec<&'static str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<SlackAction<'a>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SlackAction<'a> {
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub text: &'a str,
    pub url: &'a str,
    pub style: String,
}

impl<'a> SlackMessageBody<'a> {
    /// Wrap a composed message for delivery to `channel`.
    pub fn new(channel: &'a str, username: &'a str, message: &'a ComposedMessage) -> Self {
        let actions = message
            .action
            .iter()
            .map(|action| SlackAction {
                kind: "button",
                text: &action.label,
                url: &action.url,
                style: action.style.to_string(),
            })
            .collect();

        Self {
            channel,
            username,
            attachments: vec![SlackAttachment {
                fallback: &message.body,
                title: &message.title,
                title_link: message.title_link.as_deref(),
                text: &message.body,
                color: message.color.slack_color(),
                mrkdwn_in: vec!["text"],
                actions,
            }],
        }
    }

    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec(self)
    }
}
