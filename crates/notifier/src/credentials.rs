//! Webhook credentials injected by the CI server.
//!
//! Credentials arrive either as an inline JSON blob or as a mounted file, each
//! holding a JSON array. The workspace field is the lookup key; when several
//! credentials share a workspace the first one wins.

use std::path::Path;

use serde::{Deserialize, Serialize};

use herald_common::error::{NotifyError, Result};

/// A named Slack webhook credential.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackCredential {
    #[serde(default)]
    pub name: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(rename = "additionalProperties", default)]
    pub properties: SlackCredentialProperties,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlackCredentialProperties {
    #[serde(default)]
    pub workspace: String,
    #[serde(default)]
    pub webhook: String,
}

impl SlackCredential {
    pub fn new(
        name: impl Into<String>,
        workspace: impl Into<String>,
        webhook: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            kind: "slack-webhook".to_string(),
            properties: SlackCredentialProperties {
                workspace: workspace.into(),
                webhook: webhook.into(),
            },
        }
    }

    pub fn workspace(&self) -> &str {
        &self.properties.workspace
    }

    pub fn webhook(&self) -> &str {
        &self.properties.webhook
    }
}

/// Find the first credential whose workspace equals `workspace` exactly.
pub fn find_by_workspace<'a>(
    credentials: &'a [SlackCredential],
    workspace: &str,
) -> Option<&'a SlackCredential> {
    credentials.iter().find(|cred| {
        tracing::trace!(
            credential = %cred.name,
            candidate = %cred.workspace(),
            workspace,
            "Comparing credential workspace"
        );
        cred.workspace() == workspace
    })
}

/// Parse a JSON array of credentials.
pub fn parse_credentials(json: &str) -> Result<Vec<SlackCredential>> {
    serde_json::from_str(json)
        .map_err(|e| NotifyError::CredentialSource(format!("invalid credentials JSON: {}", e)))
}

/// Load credentials from the inline blob if given, else from `path` if it
/// exists. Neither present yields an empty list.
pub fn load_credentials(inline: Option<&str>, path: &Path) -> Result<Vec<SlackCredential>> {
    if let Some(json) = inline {
        let credentials = parse_credentials(json)?;
        tracing::info!(
            count = credentials.len(),
            "Loaded credentials from environment"
        );
        return Ok(credentials);
    }

    if !path.exists() {
        tracing::debug!(path = %path.display(), "No credentials file mounted");
        return Ok(Vec::new());
    }

    let json = std::fs::read_to_string(path).map_err(|e| {
        NotifyError::CredentialSource(format!(
            "failed to read credentials file '{}': {}",
            path.display(),
            e
        ))
    })?;
    let credentials = parse_credentials(&json)?;
    tracing::info!(
        path = %path.display(),
        count = credentials.len(),
        "Loaded credentials from file"
    );
    Ok(credentials)
}

/// Determine the webhook endpoint for this invocation.
///
/// A configured workspace always goes through credential lookup; otherwise the
/// directly supplied URL is used. Ending up without a non-empty endpoint is a
/// configuration error.
pub fn resolve_webhook_url(
    direct: Option<&str>,
    workspace: Option<&str>,
    credentials: &[SlackCredential],
) -> Result<String> {
    let url = match workspace {
        Some(workspace) => {
            tracing::info!(workspace, "Looking up credential for workspace");
            let cred = find_by_workspace(credentials, workspace).ok_or_else(|| {
                NotifyError::CredentialNotFound {
                    workspace: workspace.to_string(),
                }
            })?;
            tracing::info!(credential = %cred.name, "Using credential");
            cred.webhook().to_string()
        }
        None => direct.unwrap_or_default().to_string(),
    };

    if url.is_empty() {
        return Err(NotifyError::Config(
            "no webhook url configured; set SLACK_WEBHOOK_URL or SLACK_WORKSPACE".to_string(),
        ));
    }

    Ok(url)
}
