//! Request Audit Logger
//!
//! One structured entry per inbound request, redacted and written through
//! `tracing` under the `slackbud_audit` target.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::info;

use crate::redact::redact_sensitive_data;

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type")]
pub enum AuditEvent {
    SlashCommand {
        slash_command: String,
        text: String,
    },
    Interaction {
        action: String,
    },
    DeferredTask {
        task: String,
    },
}

#[derive(Debug, Serialize)]
pub struct AuditLogEntry {
    pub user_id: String,
    pub timestamp: DateTime<Utc>,
    pub event: AuditEvent,
}

pub struct AuditLogger;

impl AuditLogger {
    /// Redact the free-text parts of `event`, then log it.
    pub fn record(user_id: &str, event: AuditEvent) -> AuditLogEntry {
        let event = match event {
            AuditEvent::SlashCommand { slash_command, text } => AuditEvent::SlashCommand {
                slash_command,
                text: redact_sensitive_data(&text),
            },
            other => other,
        };
        let entry = AuditLogEntry {
            user_id: user_id.to_string(),
            timestamp: Utc::now(),
            event,
        };
        match serde_json::to_string(&entry) {
            Ok(json) => info!(target: "slackbud_audit", entry = %json, "Request received"),
            Err(_) => info!(target: "slackbud_audit", entry = ?entry, "Request received"),
        }
        entry
    }
}
