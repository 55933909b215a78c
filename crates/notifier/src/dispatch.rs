//! Invocation pipeline: resolve endpoint, compose once, notify every target.
//!
//! Targets are notified one after another. A failed target is logged and the
//! remaining targets are still attempted; the summary reports the aggregate.

use herald_common::config::AppConfig;
use herald_common::error::{NotifyError, Result};
use herald_common::types::{ComposedMessage, DeliveryOutcome};

use crate::client::{SlackWebhookClient, WebhookTransport};
use crate::composer::compose;
use crate::credentials::{load_credentials, resolve_webhook_url};

/// Split a comma-separated target list.
///
/// Tokens are taken verbatim (surrounding whitespace is kept); empty tokens
/// are dropped, so an empty list yields no targets.
pub fn split_targets(list: &str) -> Vec<String> {
    list.split(',')
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

/// Channels first, then users, in configured order.
pub fn targets(config: &AppConfig) -> Vec<String> {
    let mut targets = split_targets(&config.channels);
    targets.extend(split_targets(&config.users));
    targets
}

/// Per-target results of one invocation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DispatchSummary {
    pub outcomes: Vec<DeliveryOutcome>,
}

impl DispatchSummary {
    /// True when every target was delivered, including when there were none.
    pub fn all_succeeded(&self) -> bool {
        self.outcomes.iter().all(|o| o.success)
    }

    pub fn failed(&self) -> impl Iterator<Item = &DeliveryOutcome> {
        self.outcomes.iter().filter(|o| !o.success)
    }

    pub fn into_result(self) -> Result<Self> {
        let failed = self.failed().count();
        if failed > 0 {
            return Err(NotifyError::DeliveryFailed {
                failed,
                total: self.outcomes.len(),
            });
        }
        Ok(self)
    }
}

/// Send `message` to each target in order.
pub async fn dispatch<T: WebhookTransport>(
    client: &SlackWebhookClient<T>,
    targets: &[String],
    message: &ComposedMessage,
) -> DispatchSummary {
    let mut outcomes = Vec::with_capacity(targets.len());

    for target in targets {
        let outcome = client.send(target, message).await;
        if let Some(error) = &outcome.error {
            tracing::error!(recipient = %target, error = %error, "Failed to notify target");
        }
        outcomes.push(outcome);
    }

    DispatchSummary { outcomes }
}

/// Load credentials and determine the webhook URL.
///
/// Every error returned here is a configuration error; nothing has been sent.
pub fn resolve_endpoint(config: &AppConfig) -> Result<String> {
    // Credentials only matter for workspace lookup.
    let credentials = match config.workspace {
        Some(_) => load_credentials(
            config.credentials_json.as_deref(),
            &config.credentials_path,
        )?,
        None => Vec::new(),
    };

    resolve_webhook_url(
        config.webhook_url.as_deref(),
        config.workspace.as_deref(),
        &credentials,
    )
}

/// Compose the message for this invocation and deliver it to every target.
pub async fn deliver<T: WebhookTransport>(
    config: &AppConfig,
    client: &SlackWebhookClient<T>,
) -> DispatchSummary {
    let targets = targets(config);
    if targets.is_empty() {
        tracing::info!("No channels or users configured, nothing to send");
        return DispatchSummary::default();
    }

    let message = compose(&config.notification_request());
    tracing::info!(
        title = %message.title,
        targets = targets.len(),
        "Composed build status message"
    );

    dispatch(client, &targets, &message).await
}

/// Full invocation with the real HTTP transport.
pub async fn run(config: &AppConfig) -> Result<DispatchSummary> {
    let webhook_url = resolve_endpoint(config)?;
    let client = SlackWebhookClient::from_config(webhook_url, config)?;
    Ok(deliver(config, &client).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::RetryPolicy;
    use async_trait::async_trait;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Fails every request addressed to one channel; records the rest.
    struct FlakyChannelTransport {
        failing_channel: &'static str,
        channels: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl WebhookTransport for FlakyChannelTransport {
        async fn post_json(&self, _url: &str, body: Vec<u8>) -> Result<u16> {
            let value: serde_json::Value = serde_json::from_slice(&body).unwrap();
            let channel = value["channel"].as_str().unwrap().to_string();
            self.channels.lock().unwrap().push(channel.clone());
            if channel == self.failing_channel {
                Err(NotifyError::Transport("connection reset".to_string()))
            } else {
                Ok(200)
            }
        }
    }

    fn client(failing_channel: &'static str) -> SlackWebhookClient<FlakyChannelTransport> {
        SlackWebhookClient::with_transport(
            "https://hooks.slack.com/services/T/B/x".to_string(),
            "CI Notifier".to_string(),
            RetryPolicy::new(3, Duration::ZERO),
            FlakyChannelTransport {
                failing_channel,
                channels: Mutex::new(Vec::new()),
            },
        )
    }

    fn config(channels: &str, users: &str) -> AppConfig {
        let channels = channels.to_string();
        let users = users.to_string();
        AppConfig::from_lookup(|key| match key {
            "BUILD_STATUS" => Some("failed".to_string()),
            "APP_NAME" => Some("myapp".to_string()),
            "SLACK_CHANNELS" => Some(channels.clone()),
            "SLACK_USERS" => Some(users.clone()),
            _ => None,
        })
        .unwrap()
    }

    #[test]
    fn test_split_keeps_whitespace() {
        assert_eq!(split_targets("#a, #b"), vec!["#a", " #b"]);
    }

    #[test]
    fn test_split_drops_empty_tokens() {
        assert!(split_targets("").is_empty());
        assert_eq!(split_targets("#a,,#b,"), vec!["#a", "#b"]);
    }

    #[test]
    fn test_targets_channels_then_users() {
        let cfg = config("#builds,#alerts", "@jane");
        assert_eq!(targets(&cfg), vec!["#builds", "#alerts", "@jane"]);
    }

    #[tokio::test]
    async fn test_no_targets_makes_no_calls() {
        let client = client("");
        let summary = deliver(&config("", ""), &client).await;

        assert!(summary.outcomes.is_empty());
        assert!(summary.all_succeeded());
        assert!(summary.into_result().is_ok());
        assert!(client.transport().channels.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_failed_target_does_not_stop_others() {
        let client = client("#a");
        let summary = deliver(&config("#a,#b", ""), &client).await;

        // 3 attempts for #a, then #b once
        assert_eq!(
            *client.transport().channels.lock().unwrap(),
            vec!["#a", "#a", "#a", "#b"]
        );
        assert!(!summary.all_succeeded());
        assert_eq!(summary.failed().count(), 1);
        assert_eq!(summary.outcomes[1].target, "#b");
        assert!(summary.outcomes[1].success);

        let err = summary.into_result().unwrap_err();
        assert!(matches!(err, NotifyError::DeliveryFailed { failed: 1, total: 2 }));
    }

    #[tokio::test]
    async fn test_all_targets_delivered() {
        let client = client("#nowhere");
        let summary = deliver(&config("#a", "@b"), &client).await;
        assert!(summary.all_succeeded());
        assert_eq!(summary.outcomes.len(), 2);
    }

    #[test]
    fn test_resolve_endpoint_direct() {
        let mut cfg = config("#a", "");
        cfg.webhook_url = Some("https://hooks.slack.com/direct".to_string());
        assert_eq!(
            resolve_endpoint(&cfg).unwrap(),
            "https://hooks.slack.com/direct"
        );
    }

    #[test]
    fn test_resolve_endpoint_by_workspace() {
        let mut cfg = config("#a", "");
        cfg.workspace = Some("y".to_string());
        cfg.credentials_json = Some(
            r#"[
                {"name":"x","additionalProperties":{"workspace":"x","webhook":"https://x"}},
                {"name":"y","additionalProperties":{"workspace":"y","webhook":"https://y"}}
            ]"#
            .to_string(),
        );
        assert_eq!(resolve_endpoint(&cfg).unwrap(), "https://y");

        cfg.workspace = Some("z".to_string());
        let err = resolve_endpoint(&cfg).unwrap_err();
        assert!(err.is_config());
    }

    #[test]
    fn test_resolve_endpoint_missing() {
        let err = resolve_endpoint(&config("#a", "")).unwrap_err();
        assert!(err.is_config());
    }
}
