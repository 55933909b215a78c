//! Herald CI extension binary entrypoint.
//!
//! Runs once per pipeline step: reads the runner's environment, posts the build
//! status to every configured Slack channel and user, and exits.
//!
//! Exit codes: 0 all targets notified (or none configured), 1 configuration
//! error, 2 at least one target could not be notified.

use std::process::ExitCode;

use tracing_subscriber::EnvFilter;

use herald_common::config::AppConfig;
use herald_notifier::dispatch::{self, DispatchSummary};

const EXIT_CONFIG: u8 = 1;
const EXIT_DELIVERY: u8 = 2;

async fn notify() -> anyhow::Result<DispatchSummary> {
    let config = AppConfig::from_env()?;

    tracing::info!(
        app = %config.app_name,
        status = %config.status,
        release = config.release_name.as_deref().unwrap_or(""),
        "Notifying build status"
    );

    Ok(dispatch::run(&config).await?)
}

#[tokio::main]
async fn main() -> ExitCode {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::new("herald_extension=info,herald_notifier=info")
        }))
        .with_writer(std::io::stderr)
        .init();

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting herald build status extension..."
    );

    let summary = match notify().await {
        Ok(summary) => summary,
        Err(e) => {
            // No summary means no message was sent.
            tracing::error!(error = %e, "Configuration error, aborting");
            return ExitCode::from(EXIT_CONFIG);
        }
    };

    let total = summary.outcomes.len();
    match summary.into_result() {
        Ok(_) => {
            tracing::info!(targets = total, "Finished herald build status extension");
            ExitCode::SUCCESS
        }
        Err(e) => {
            tracing::error!(error = %e, "Finished with delivery failures");
            ExitCode::from(EXIT_DELIVERY)
        }
    }
}
