//! SlackBud runtime configuration schema.
//!
//! Every section is optional in YAML; missing leaves take the values in
//! [`crate::defaults`].

use std::collections::BTreeMap;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use slackbud_core::PermissionLevel;

use crate::defaults;

// ---------------------------------------------------------------------------
// Top-level config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackBudConfig {
    pub server: ServerConfig,
    pub slack: SlackConfig,
    pub store: StoreConfig,
    pub confirmation: ConfirmationConfig,
    pub deferred: DeferredConfig,
    pub parser: ParserConfig,
    /// Seed roles, user id -> level. Applied only to users without a stored role.
    pub roles: BTreeMap<String, PermissionLevel>,
    pub logging: LoggingConfig,
}

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub bind: String,
    pub port: u16,
    pub commands_path: String,
    pub interactive_path: String,
    pub tasks_path: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: defaults::DEFAULT_BIND.to_string(),
            port: defaults::DEFAULT_PORT,
            commands_path: defaults::DEFAULT_COMMANDS_PATH.to_string(),
            interactive_path: defaults::DEFAULT_INTERACTIVE_PATH.to_string(),
            tasks_path: defaults::DEFAULT_TASKS_PATH.to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SlackConfig {
    pub signing_secret: Option<String>,
    /// Turn off only for local testing.
    pub verify_signatures: bool,
    /// Slash command (e.g. `/run`, `/rundev`) -> environment name.
    pub environments: BTreeMap<String, String>,
    /// Used when the slash command is not in `environments`.
    pub default_environment: String,
}

impl Default for SlackConfig {
    fn default() -> Self {
        Self {
            signing_secret: None,
            verify_signatures: true,
            environments: BTreeMap::new(),
            default_environment: defaults::DEFAULT_ENVIRONMENT.to_string(),
        }
    }
}

impl SlackConfig {
    pub fn environment_for(&self, slash_command: &str) -> &str {
        self.environments
            .get(slash_command)
            .map(String::as_str)
            .unwrap_or(&self.default_environment)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub sqlite_path: Option<PathBuf>,
    pub reports_dir: Option<PathBuf>,
    /// Prefix for report links handed to users.
    pub reports_base_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConfirmationConfig {
    /// Signs confirmation tokens and deferred task envelopes.
    pub secret: Option<String>,
    /// `0` disables expiry.
    pub ttl_secs: i64,
}

impl Default for ConfirmationConfig {
    fn default() -> Self {
        Self {
            secret: None,
            ttl_secs: defaults::DEFAULT_CONFIRMATION_TTL_SECS,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeferredMode {
    /// In-process worker fed by a bounded channel.
    #[default]
    Queue,
    /// POST the signed task envelope to `worker_url`.
    Http,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DeferredConfig {
    pub mode: DeferredMode,
    pub worker_url: Option<String>,
    pub queue_capacity: usize,
}

impl Default for DeferredConfig {
    fn default() -> Self {
        Self {
            mode: DeferredMode::Queue,
            worker_url: None,
            queue_capacity: defaults::DEFAULT_QUEUE_CAPACITY,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    pub case_sensitive: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub dir: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: defaults::DEFAULT_LOG_LEVEL.to_string(),
            dir: None,
        }
    }
}
