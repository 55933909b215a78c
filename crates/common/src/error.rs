use thiserror::Error;

/// Error types shared by the notifier and the extension binary.
#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No credential found for workspace '{workspace}'")]
    CredentialNotFound { workspace: String },

    #[error("Credential source error: {0}")]
    CredentialSource(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Delivery failed for {failed} of {total} target(s)")]
    DeliveryFailed { failed: usize, total: usize },
}

impl NotifyError {
    /// Configuration errors abort the invocation before any network activity.
    pub fn is_config(&self) -> bool {
        matches!(
            self,
            NotifyError::Config(_)
                | NotifyError::CredentialNotFound { .. }
                | NotifyError::CredentialSource(_)
        )
    }
}

pub type Result<T> = std::result::Result<T, NotifyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_classification() {
        assert!(NotifyError::Config("x".into()).is_config());
        assert!(
            NotifyError::CredentialNotFound {
                workspace: "z".into()
            }
            .is_config()
        );
        assert!(NotifyError::CredentialSource("bad json".into()).is_config());
        assert!(!NotifyError::Transport("refused".into()).is_config());
        assert!(!NotifyError::DeliveryFailed { failed: 1, total: 2 }.is_config());
    }

    #[test]
    fn test_messages() {
        let err = NotifyError::CredentialNotFound {
            workspace: "acme".into(),
        };
        assert_eq!(err.to_string(), "No credential found for workspace 'acme'");
        let err = NotifyError::DeliveryFailed { failed: 1, total: 2 };
        assert_eq!(err.to_string(), "Delivery failed for 1 of 2 target(s)");
    }
}
