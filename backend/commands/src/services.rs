//! External collaborators the dispatcher and built-in commands consume.
//!
//! Real implementations live in `slackbud-store`; nothing here keeps
//! process-wide mutable state.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use slackbud_core::PermissionLevel;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleEntry {
    pub user_id: String,
    pub user_name: String,
    pub level: PermissionLevel,
}

/// Where a caller's permission level comes from.
#[async_trait]
pub trait RoleDirectory: Send + Sync {
    /// Unknown users are `Public`.
    async fn level_of(&self, user_id: &str) -> Result<PermissionLevel>;
    async fn set_level(&self, user_id: &str, user_name: &str, level: PermissionLevel) -> Result<()>;
    /// Returns whether a row was removed.
    async fn remove(&self, user_id: &str) -> Result<bool>;
    async fn list(&self) -> Result<Vec<RoleEntry>>;
}

/// Durable, atomically incremented usage counters.
#[async_trait]
pub trait UsageCounter: Send + Sync {
    /// Increment `key` and return the new count.
    async fn increment(&self, key: &str) -> Result<u64>;
    /// Highest counts first.
    async fn top(&self, limit: usize) -> Result<Vec<(String, u64)>>;
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub user_id: String,
    pub command_line: String,
    pub at: DateTime<Utc>,
}

#[async_trait]
pub trait HistoryStore: Send + Sync {
    async fn record(&self, user_id: &str, command_line: &str, at: DateTime<Utc>) -> Result<()>;
    /// Newest first, at most `limit` entries.
    async fn recent(&self, user_id: &str, limit: usize) -> Result<Vec<HistoryEntry>>;
}

/// Pre-computed per-account reports.
#[async_trait]
pub trait ReportSource: Send + Sync {
    /// `None` when no report exists for the account.
    async fn summary(&self, account: &str) -> Result<Option<String>>;
    fn details_link(&self, account: &str) -> String;
}

/// The collaborators the dispatcher itself needs.
#[derive(Clone)]
pub struct Services {
    pub roles: Arc<dyn RoleDirectory>,
    pub usage: Arc<dyn UsageCounter>,
    pub history: Arc<dyn HistoryStore>,
}
