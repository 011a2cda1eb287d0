//! Config validation: errors are fatal for `serve`, warnings are logged.

use std::collections::HashSet;

use thiserror::Error;

use crate::schema::{DeferredMode, SlackBudConfig};

/// A config validation error with field path and message.
#[derive(Debug, Error)]
#[error("Config validation error at '{path}': {message}")]
pub struct ConfigValidationError {
    pub path: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationReport {
    pub errors: Vec<ConfigValidationError>,
    pub warnings: Vec<ConfigValidationError>,
}

impl ValidationReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    fn error(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.errors.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }

    fn warn(&mut self, path: impl Into<String>, message: impl Into<String>) {
        self.warnings.push(ConfigValidationError {
            path: path.into(),
            message: message.into(),
        });
    }
}

/// Validate a config that already has defaults applied.
pub fn validate(config: &SlackBudConfig) -> ValidationReport {
    let mut report = ValidationReport::default();
    validate_server(config, &mut report);
    validate_slack(config, &mut report);
    validate_confirmation(config, &mut report);
    validate_deferred(config, &mut report);
    validate_store(config, &mut report);
    validate_logging(config, &mut report);
    report
}

fn validate_server(config: &SlackBudConfig, report: &mut ValidationReport) {
    let server = &config.server;
    if server.port == 0 {
        report.error("server.port", "port must be > 0");
    }
    let mut seen = HashSet::new();
    for (field, path) in [
        ("server.commands_path", &server.commands_path),
        ("server.interactive_path", &server.interactive_path),
        ("server.tasks_path", &server.tasks_path),
    ] {
        if !path.starts_with('/') {
            report.error(field, format!("'{path}' must start with '/'"));
        }
        if !seen.insert(path.as_str()) {
            report.error(field, format!("'{path}' is used by another endpoint"));
        }
    }
}

fn validate_slack(config: &SlackBudConfig, report: &mut ValidationReport) {
    let slack = &config.slack;
    let has_secret = slack.signing_secret.as_deref().is_some_and(|s| !s.is_empty());
    if slack.verify_signatures && !has_secret {
        report.error("slack.signing_secret", "Signing secret is required while verify_signatures is on");
    }
    if !slack.verify_signatures {
        report.warn("slack.verify_signatures", "Request signatures are not verified");
    }
    for (command, env) in &slack.environments {
        if !command.starts_with('/') {
            report.warn(format!("slack.environments.{command}"), "Slash commands start with '/'");
        }
        if env.trim().is_empty() {
            report.error(format!("slack.environments.{command}"), "Environment name cannot be empty");
        }
    }
}

fn validate_confirmation(config: &SlackBudConfig, report: &mut ValidationReport) {
    let confirmation = &config.confirmation;
    if confirmation.secret.as_deref().map(str::is_empty).unwrap_or(true) {
        report.error("confirmation.secret", "A secret is required to sign confirmation tokens");
    }
    if confirmation.ttl_secs < 0 {
        report.error("confirmation.ttl_secs", "ttl_secs must be >= 0");
    } else if confirmation.ttl_secs == 0 {
        report.warn("confirmation.ttl_secs", "Confirmation tokens never expire");
    }
}

fn validate_deferred(config: &SlackBudConfig, report: &mut ValidationReport) {
    let deferred = &config.deferred;
    match deferred.mode {
        DeferredMode::Queue => {
            if deferred.queue_capacity == 0 {
                report.error("deferred.queue_capacity", "queue_capacity must be >= 1");
            }
        }
        DeferredMode::Http => match deferred.worker_url.as_deref() {
            Some(url) if url.starts_with("http://") || url.starts_with("https://") => {}
            Some(url) => report.error("deferred.worker_url", format!("'{url}' is not an http(s) URL")),
            None => report.error("deferred.worker_url", "worker_url is required in http mode"),
        },
    }
}

fn validate_store(config: &SlackBudConfig, report: &mut ValidationReport) {
    if config.store.reports_base_url.is_none() {
        report.warn("store.reports_base_url", "Report links will be relative paths");
    }
}

fn validate_logging(config: &SlackBudConfig, report: &mut ValidationReport) {
    let level = config.logging.level.to_ascii_lowercase();
    if !matches!(level.as_str(), "trace" | "debug" | "info" | "warn" | "error") {
        report.warn("logging.level", format!("Unknown level '{}'; 'info' will be used", config.logging.level));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::defaults::apply_all_defaults;
    use std::path::Path;

    fn configured() -> SlackBudConfig {
        let mut cfg = SlackBudConfig::default();
        cfg.slack.signing_secret = Some("signing".into());
        cfg.store.reports_base_url = Some("https://reports.example".into());
        apply_all_defaults(cfg, Path::new("/tmp/bud"))
    }

    #[test]
    fn configured_default_is_valid() {
        let report = validate(&configured());
        assert!(report.is_valid(), "errors: {:?}", report.errors);
        assert!(report.warnings.is_empty(), "warnings: {:?}", report.warnings);
    }

    #[test]
    fn missing_secrets_are_errors() {
        let report = validate(&apply_all_defaults(SlackBudConfig::default(), Path::new(".")));
        let paths: Vec<_> = report.errors.iter().map(|e| e.path.as_str()).collect();
        assert!(paths.contains(&"slack.signing_secret"));
        assert!(paths.contains(&"confirmation.secret"));
    }

    #[test]
    fn clashing_paths_are_errors() {
        let mut cfg = configured();
        cfg.server.tasks_path = cfg.server.commands_path.clone();
        let report = validate(&cfg);
        assert!(!report.is_valid());
        assert_eq!(report.errors[0].path, "server.tasks_path");
    }

    #[test]
    fn http_mode_needs_http_url() {
        let mut cfg = configured();
        cfg.deferred.mode = DeferredMode::Http;
        cfg.deferred.worker_url = Some("worker.internal".into());
        assert!(!validate(&cfg).is_valid());
    }
}
