//! Builds the dispatcher and its collaborators from config.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tokio::sync::mpsc;
use tracing::{info, warn};

use slackbud_channels::{HttpLauncher, HttpResponseSink, QueueLauncher};
use slackbud_commands::{
    build_default_registry, DeferredLauncher, DeferredTask, Dispatcher, InputParser, Services, TokenCodec,
};
use slackbud_config::{DeferredMode, SlackBudConfig};
use slackbud_store::{FsReportSource, SqliteStore};

pub struct Wiring {
    pub dispatcher: Arc<Dispatcher>,
    pub codec: TokenCodec,
    /// Present in queue mode; feed it to a worker or drain it.
    pub queue: Option<mpsc::Receiver<DeferredTask>>,
}

pub async fn build(config: &SlackBudConfig, mode: DeferredMode, in_memory: bool) -> Result<Wiring> {
    let store = if in_memory {
        SqliteStore::in_memory()?
    } else {
        let path = config
            .store
            .sqlite_path
            .clone()
            .unwrap_or_else(|| PathBuf::from("slackbud.db"));
        SqliteStore::open(&path)?
    };
    let store = Arc::new(store);

    let mut seeded = 0;
    for (user_id, level) in &config.roles {
        if store.seed_role(user_id, "", *level).await? {
            seeded += 1;
        }
    }
    if seeded > 0 {
        info!(seeded, "Seeded roles from config");
    }

    let services = Services {
        roles: store.clone(),
        usage: store.clone(),
        history: store,
    };

    let reports = Arc::new(FsReportSource::new(
        config.store.reports_dir.clone().unwrap_or_else(|| PathBuf::from("reports")),
        config.store.reports_base_url.clone().unwrap_or_default(),
    ));
    let registry = build_default_registry(&services, reports, env!("CARGO_PKG_VERSION"))
        .context("Built-in command schema is invalid")?;
    info!(commands = registry.len(), "Command registry ready");

    let codec = TokenCodec::new(confirmation_secret(config), config.confirmation.ttl_secs);

    let (launcher, queue) = match mode {
        DeferredMode::Queue => {
            let (launcher, rx) = QueueLauncher::new(config.deferred.queue_capacity);
            let launcher: Arc<dyn DeferredLauncher> = Arc::new(launcher);
            (launcher, Some(rx))
        }
        DeferredMode::Http => {
            let url = config
                .deferred
                .worker_url
                .clone()
                .context("deferred.worker_url is required in http mode")?;
            let launcher: Arc<dyn DeferredLauncher> = Arc::new(HttpLauncher::new(url, codec.clone()));
            (launcher, None)
        }
    };

    let dispatcher = Dispatcher::new(
        Arc::new(registry),
        codec.clone(),
        services,
        launcher,
        Arc::new(HttpResponseSink::new()),
    )
    .with_parser(InputParser::new(config.parser.case_sensitive));

    Ok(Wiring {
        dispatcher: Arc::new(dispatcher),
        codec,
        queue,
    })
}

/// Tokens signed with a random secret only survive this process.
fn confirmation_secret(config: &SlackBudConfig) -> String {
    match config.confirmation.secret.as_deref() {
        Some(secret) if !secret.is_empty() => secret.to_string(),
        _ => {
            warn!("No confirmation secret configured; using a per-process random secret");
            uuid::Uuid::new_v4().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use slackbud_commands::RawInvocation;
    use slackbud_core::{Identity, PermissionLevel};

    #[tokio::test]
    async fn seeded_admin_can_list_users() {
        let mut config = SlackBudConfig::default();
        config.roles.insert("U1".into(), PermissionLevel::Admin);
        let wiring = build(&config, DeferredMode::Queue, true).await.unwrap();

        let response = wiring
            .dispatcher
            .handle_command(RawInvocation {
                text: "user list".into(),
                identity: Identity::new("U1", "ana"),
                environment: "dev".into(),
                response_url: None,
                channel_id: None,
            })
            .await;
        assert!(!response.is_error(), "{response:?}");
        assert!(response.body().contains("U1"));
    }

    #[tokio::test]
    async fn http_mode_needs_worker_url() {
        let config = SlackBudConfig::default();
        assert!(build(&config, DeferredMode::Http, true).await.is_err());
    }
}
