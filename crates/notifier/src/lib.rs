//! Slack build-status notifications.
//!
//! Resolves the webhook to use, composes a status-dependent message and
//! delivers it to every configured channel and user:
//! - `credentials` — workspace-keyed webhook credentials
//! - `composer` — status → title, body, color and logs action
//! - `slack` — incoming-webhook wire payload
//! - `client` — HTTP delivery with bounded retry
//! - `dispatch` — sequential fan-out over targets

pub mod client;
pub mod composer;
pub mod credentials;
pub mod dispatch;
pub mod slack;
