//! Webhook delivery client.
//!
//! Serializes a composed message per target and POSTs it to the Slack webhook.
//! Transport errors are retried with exponential backoff plus random jitter;
//! HTTP status codes are logged but never trigger a retry.

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use herald_common::config::AppConfig;
use herald_common::error::{NotifyError, Result};
use herald_common::types::{ComposedMessage, DeliveryOutcome};

use crate::slack::SlackMessageBody;

/// Default number of attempts per target, including the first.
pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;

/// Default base delay of the exponential backoff.
const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(500);

/// Moves a serialized payload to the webhook.
///
/// Returns the HTTP status code on completion. Only failures to complete the
/// exchange are errors.
#[async_trait]
pub trait WebhookTransport: Send + Sync {
    async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<u16>;
}

/// `reqwest`-backed transport.
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| NotifyError::Config(format!("failed to build http client: {}", e)))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl WebhookTransport for ReqwestTransport {
    async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<u16> {
        let response = self
            .client
            .post(url)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send()
            .await
            .map_err(|e| NotifyError::Transport(e.without_url().to_string()))?;

        let status = response.status().as_u16();

        // Drain so the connection is released; the content is not used.
        if let Err(e) = response.bytes().await {
            tracing::debug!(error = %e.without_url(), "Failed to drain webhook response body");
        }

        Ok(status)
    }
}

/// Bounded exponential backoff with jitter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Delay before the attempt following `attempt` (1-based):
    /// `base * 2^(attempt-1)` plus up to `base` of random jitter.
    pub fn delay_after(&self, attempt: u32) -> Duration {
        let base_ms = self.base_delay.as_millis() as u64;
        if base_ms == 0 {
            return Duration::ZERO;
        }
        let exp = base_ms.saturating_mul(1u64 << attempt.saturating_sub(1).min(16));
        let jitter = rand::thread_rng().gen_range(0..=base_ms);
        Duration::from_millis(exp.saturating_add(jitter))
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_ATTEMPTS, DEFAULT_BASE_DELAY)
    }
}

/// Posts composed messages to one Slack webhook.
pub struct SlackWebhookClient<T = ReqwestTransport> {
    webhook_url: String,
    username: String,
    retry: RetryPolicy,
    transport: T,
}

impl SlackWebhookClient<ReqwestTransport> {
    /// Build a client with the real HTTP transport from invocation config.
    pub fn from_config(webhook_url: String, config: &AppConfig) -> Result<Self> {
        Ok(Self::with_transport(
            webhook_url,
            config.username.clone(),
            RetryPolicy::new(config.retry_max_attempts, config.retry_base_delay),
            ReqwestTransport::new(config.http_timeout)?,
        ))
    }
}

impl<T: WebhookTransport> SlackWebhookClient<T> {
    pub fn with_transport(
        webhook_url: String,
        username: String,
        retry: RetryPolicy,
        transport: T,
    ) -> Self {
        Self {
            webhook_url,
            username,
            retry,
            transport,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Deliver `message` to a single channel or user.
    pub async fn send(&self, target: &str, message: &ComposedMessage) -> DeliveryOutcome {
        let body = match SlackMessageBody::new(target, &self.username, message).to_json() {
            Ok(body) => body,
            Err(e) => {
                let err = NotifyError::from(e);
                tracing::error!(recipient = target, error = %err, "Failed to serialize Slack message");
                return DeliveryOutcome::failed(target, 0, err);
            }
        };

        let host = webhook_host(&self.webhook_url);
        let mut last_error = None;

        for attempt in 1..=self.retry.max_attempts {
            tracing::info!(recipient = target, host = %host, attempt, "Sending Slack message");

            match self.transport.post_json(&self.webhook_url, body.clone()).await {
                Ok(status) => {
                    if !(200..300).contains(&status) {
                        tracing::warn!(recipient = target, status, "Slack webhook returned non-success status");
                    }
                    tracing::info!(recipient = target, status, attempt, "Slack message delivered");
                    return DeliveryOutcome::delivered(target, attempt);
                }
                Err(e) => {
                    tracing::warn!(
                        recipient = target,
                        attempt,
                        max_attempts = self.retry.max_attempts,
                        error = %e,
                        "Slack webhook request failed"
                    );
                    last_error = Some(e);
                }
            }

            if attempt < self.retry.max_attempts {
                tokio::time::sleep(self.retry.delay_after(attempt)).await;
            }
        }

        let err = last_error
            .unwrap_or_else(|| NotifyError::Transport("no attempt was made".to_string()));
        tracing::error!(
            recipient = target,
            attempts = self.retry.max_attempts,
            error = %err,
            "Giving up on Slack message"
        );
        DeliveryOutcome::failed(target, self.retry.max_attempts, err)
    }
}

/// Host part of the webhook URL; the path carries the secret.
fn webhook_host(url: &str) -> String {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_else(|| "<invalid url>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use herald_common::types::ColorMarker;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Replays scripted results and records every request it sees.
    struct ScriptedTransport {
        results: Mutex<VecDeque<Result<u16>>>,
        requests: Mutex<Vec<(String, serde_json::Value)>>,
    }

    impl ScriptedTransport {
        fn new(results: Vec<Result<u16>>) -> Self {
            Self {
                results: Mutex::new(results.into()),
                requests: Mutex::new(Vec::new()),
            }
        }

        fn request_count(&self) -> usize {
            self.requests.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl WebhookTransport for ScriptedTransport {
        async fn post_json(&self, url: &str, body: Vec<u8>) -> Result<u16> {
            let value = serde_json::from_slice(&body).unwrap();
            self.requests.lock().unwrap().push((url.to_string(), value));
            self.results
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or(Ok(200))
        }
    }

    fn message() -> ComposedMessage {
        ComposedMessage {
            title: "Building myapp succeeded!".to_string(),
            body: "Build version *1.0.0* succeeded.".to_string(),
            color: ColorMarker::Success,
            title_link: None,
            action: None,
        }
    }

    fn client(results: Vec<Result<u16>>) -> SlackWebhookClient<ScriptedTransport> {
        SlackWebhookClient::with_transport(
            "https://hooks.slack.com/services/T/B/secret".to_string(),
            "CI Notifier".to_string(),
            RetryPolicy::new(3, Duration::ZERO),
            ScriptedTransport::new(results),
        )
    }

    fn refused() -> Result<u16> {
        Err(NotifyError::Transport("connection refused".to_string()))
    }

    #[tokio::test]
    async fn test_first_attempt_succeeds() {
        let client = client(vec![Ok(200)]);
        let outcome = client.send("#builds", &message()).await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 1);
        assert_eq!(outcome.target, "#builds");

        let requests = client.transport().requests.lock().unwrap();
        assert_eq!(requests[0].0, "https://hooks.slack.com/services/T/B/secret");
        assert_eq!(requests[0].1["channel"], "#builds");
        assert_eq!(requests[0].1["username"], "CI Notifier");
        assert_eq!(requests[0].1["attachments"][0]["color"], "good");
    }

    #[tokio::test]
    async fn test_retries_transport_errors() {
        let client = client(vec![refused(), refused(), Ok(200)]);
        let outcome = client.send("#builds", &message()).await;

        assert!(outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert_eq!(client.transport().request_count(), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let client = client(vec![refused(), refused(), refused(), Ok(200)]);
        let outcome = client.send("#builds", &message()).await;

        assert!(!outcome.success);
        assert_eq!(outcome.attempts, 3);
        assert!(outcome.error.unwrap().contains("connection refused"));
        assert_eq!(client.transport().request_count(), 3);
    }

    #[tokio::test]
    async fn test_error_status_is_not_retried() {
        let client = client(vec![Ok(500)]);
        let outcome = client.send("#builds", &message()).await;

        assert!(outcome.success);
        assert_eq!(client.transport().request_count(), 1);
    }

    #[test]
    fn test_policy_clamps_attempts() {
        assert_eq!(RetryPolicy::new(0, Duration::ZERO).max_attempts, 1);
        assert_eq!(RetryPolicy::default().max_attempts, DEFAULT_MAX_ATTEMPTS);
    }

    #[test]
    fn test_backoff_grows_with_bounded_jitter() {
        let policy = RetryPolicy::new(3, Duration::from_millis(100));
        for _ in 0..20 {
            let first = policy.delay_after(1);
            let second = policy.delay_after(2);
            assert!(first >= Duration::from_millis(100) && first <= Duration::from_millis(200));
            assert!(second >= Duration::from_millis(200) && second <= Duration::from_millis(300));
        }
        assert_eq!(
            RetryPolicy::new(3, Duration::ZERO).delay_after(2),
            Duration::ZERO
        );
    }

    #[test]
    fn test_webhook_host() {
        assert_eq!(
            webhook_host("https://hooks.slack.com/services/T/B/secret"),
            "hooks.slack.com"
        );
        assert_eq!(webhook_host("not a url"), "<invalid url>");
    }
}
