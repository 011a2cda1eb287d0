//! Telemetry and structured logging for SlackBud.
//!
//! Handles log redaction, console and rolling NDJSON file output, and the
//! audit trail of inbound requests.

pub mod audit;
pub mod logger;
pub mod redact;

pub use audit::{AuditEvent, AuditLogEntry, AuditLogger};
pub use logger::init_logger;
pub use redact::redact_sensitive_data;
