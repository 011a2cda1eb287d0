//! `slackbud serve`

use std::sync::Arc;

use anyhow::Result;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use tokio::net::TcpListener;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use slackbud_channels::{build_router, spawn_worker, SlackState};
use slackbud_config::{validate, DeferredMode, SlackBudConfig};

use crate::wiring;

pub async fn run(mut config: SlackBudConfig, port: Option<u16>) -> Result<()> {
    if let Some(port) = port {
        retarget_local_worker(&mut config, port);
        config.server.port = port;
    }

    let report = validate(&config);
    for warning in &report.warnings {
        warn!(path = %warning.path, "{}", warning.message);
    }
    if !report.is_valid() {
        for err in &report.errors {
            error!(path = %err.path, "{}", err.message);
        }
        anyhow::bail!(
            "Config has {} error(s); run `slackbud check-config` for details",
            report.errors.len()
        );
    }

    info!(
        port = config.server.port,
        bind = %config.server.bind,
        mode = ?config.deferred.mode,
        "Starting SlackBud"
    );

    let wiring = wiring::build(&config, config.deferred.mode, false).await?;
    if let Some(rx) = wiring.queue {
        spawn_worker(Arc::clone(&wiring.dispatcher), rx);
    }

    let state = SlackState {
        dispatcher: wiring.dispatcher,
        codec: wiring.codec,
        slack: Arc::new(config.slack.clone()),
    };
    let app: Router = build_router(state, &config.server)
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http());

    let addr = format!("{}:{}", config.server.bind, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    info!(addr = %addr, "HTTP listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("Shutting down");
        })
        .await?;
    Ok(())
}

/// The default worker URL points at this server; follow a `--port` override.
fn retarget_local_worker(config: &mut SlackBudConfig, port: u16) {
    if config.deferred.mode != DeferredMode::Http {
        return;
    }
    let derived = format!("http://127.0.0.1:{}{}", config.server.port, config.server.tasks_path);
    if config.deferred.worker_url.as_deref() == Some(derived.as_str()) {
        config.deferred.worker_url = Some(format!("http://127.0.0.1:{}{}", port, config.server.tasks_path));
    }
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok", "version": env!("CARGO_PKG_VERSION") }))
}
