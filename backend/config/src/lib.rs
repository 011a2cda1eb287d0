//! SlackBud runtime configuration.
//!
//! Provides:
//! - Typed config schema (server, slack, store, confirmation, deferred, parser, roles, logging)
//! - YAML loading from `$SLACKBUD_CONFIG_DIR` or `~/.slackbud`
//! - `${ENV_VAR}` substitution
//! - Derived defaults and validation
//! - Redacted snapshots for display

pub mod defaults;
pub mod env;
pub mod io;
pub mod redact;
pub mod schema;
pub mod validation;

pub use defaults::apply_all_defaults;
pub use env::{collect_referenced_vars, resolve_env_vars, resolve_env_vars_with, MissingEnvVarError};
pub use io::{config_dir, config_file_path, load_raw};
pub use redact::{redact, redacted_snapshot};
pub use schema::{DeferredMode, SlackBudConfig};
pub use validation::{validate, ConfigValidationError, ValidationReport};

use std::path::Path;

use anyhow::{Context, Result};

/// Load, substitute env vars, apply defaults and validate a config file.
///
/// Validation findings are logged; callers that must refuse to start on
/// errors run [`validate`] themselves.
pub async fn load_and_prepare(path: &Path) -> Result<SlackBudConfig> {
    let raw = load_raw(path).await?;
    let value = resolve_env_vars(&raw).context("Failed to resolve env vars in config")?;
    let config: SlackBudConfig =
        serde_json::from_value(value).context("Failed to deserialize config after processing")?;

    let base = path.parent().unwrap_or_else(|| Path::new("."));
    let config = apply_all_defaults(config, base);

    let report = validate(&config);
    for warning in &report.warnings {
        tracing::warn!(path = %warning.path, message = %warning.message, "Config warning");
    }
    for error in &report.errors {
        tracing::error!(path = %error.path, message = %error.message, "Config error");
    }

    Ok(config)
}
