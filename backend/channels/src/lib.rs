//! The Slack edge of SlackBud.
//!
//! Verifies and decodes Slack requests, mounts the axum routes, and
//! provides the transport-side implementations of the dispatcher's
//! `DeferredLauncher` and `ResponseSink` seams.

pub mod launcher;
pub mod payload;
pub mod signature;
pub mod sink;
pub mod slack;

pub use launcher::{spawn_worker, HttpLauncher, QueueLauncher, TASK_SIGNATURE_HEADER};
pub use payload::{decode_interaction, PayloadError, SlashCommandForm};
pub use signature::{sign_slack_request, verify_slack_signature};
pub use sink::HttpResponseSink;
pub use slack::{build_router, SlackState};
