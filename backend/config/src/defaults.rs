//! Config defaults: constants for leaf values plus the derived defaults
//! that depend on other sections or on the config directory.

use std::path::Path;

use crate::schema::SlackBudConfig;

pub const DEFAULT_BIND: &str = "0.0.0.0";
pub const DEFAULT_PORT: u16 = 8080;
pub const DEFAULT_COMMANDS_PATH: &str = "/slack/commands";
pub const DEFAULT_INTERACTIVE_PATH: &str = "/slack/interactive";
pub const DEFAULT_TASKS_PATH: &str = "/tasks";
pub const DEFAULT_ENVIRONMENT: &str = "dev";
pub const DEFAULT_CONFIRMATION_TTL_SECS: i64 = 900;
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;
pub const DEFAULT_LOG_LEVEL: &str = "info";

const DB_FILE_NAME: &str = "slackbud.db";

/// Apply all derived defaults to a freshly loaded config.
pub fn apply_all_defaults(config: SlackBudConfig, config_dir: &Path) -> SlackBudConfig {
    let config = apply_store_defaults(config, config_dir);
    let config = apply_secret_defaults(config);
    let config = apply_deferred_defaults(config);
    apply_logging_defaults(config, config_dir)
}

fn apply_store_defaults(mut config: SlackBudConfig, config_dir: &Path) -> SlackBudConfig {
    if config.store.sqlite_path.is_none() {
        config.store.sqlite_path = Some(config_dir.join(DB_FILE_NAME));
    }
    if config.store.reports_dir.is_none() {
        config.store.reports_dir = Some(config_dir.join("reports"));
    }
    config
}

/// Fall back to the Slack signing secret for token signing.
fn apply_secret_defaults(mut config: SlackBudConfig) -> SlackBudConfig {
    if config.confirmation.secret.is_none() {
        config.confirmation.secret = config.slack.signing_secret.clone();
    }
    config
}

/// Point the http launcher at this server's own task endpoint.
fn apply_deferred_defaults(mut config: SlackBudConfig) -> SlackBudConfig {
    if config.deferred.worker_url.is_none() {
        config.deferred.worker_url = Some(format!(
            "http://127.0.0.1:{}{}",
            config.server.port, config.server.tasks_path
        ));
    }
    config
}

fn apply_logging_defaults(mut config: SlackBudConfig, config_dir: &Path) -> SlackBudConfig {
    if config.logging.dir.is_none() {
        config.logging.dir = Some(config_dir.join("logs"));
    }
    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fills_paths_under_config_dir() {
        let cfg = apply_all_defaults(SlackBudConfig::default(), Path::new("/etc/bud"));
        assert_eq!(cfg.store.sqlite_path.unwrap(), Path::new("/etc/bud/slackbud.db"));
        assert_eq!(cfg.logging.dir.unwrap(), Path::new("/etc/bud/logs"));
        assert_eq!(cfg.deferred.worker_url.unwrap(), "http://127.0.0.1:8080/tasks");
    }

    #[test]
    fn confirmation_secret_falls_back_to_signing_secret() {
        let mut cfg = SlackBudConfig::default();
        cfg.slack.signing_secret = Some("signing".into());
        let cfg = apply_all_defaults(cfg, Path::new("."));
        assert_eq!(cfg.confirmation.secret.as_deref(), Some("signing"));
    }

    #[test]
    fn does_not_override_user_values() {
        let mut cfg = SlackBudConfig::default();
        cfg.confirmation.secret = Some("own".into());
        cfg.slack.signing_secret = Some("signing".into());
        cfg.store.sqlite_path = Some("/data/bud.db".into());
        let cfg = apply_all_defaults(cfg, Path::new("."));
        assert_eq!(cfg.confirmation.secret.as_deref(), Some("own"));
        assert_eq!(cfg.store.sqlite_path.unwrap(), Path::new("/data/bud.db"));
    }
}
