//! Slack webhook routes for SlackBud.
//!
//! Three POST endpoints, paths from `server` config:
//!   commands     slash-command form bodies, answered inline
//!   interactive  button clicks on confirmation prompts
//!   tasks        signed deferred-task envelopes from an `http` launcher

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Json, Response},
    routing::post,
    Router,
};
use serde_json::Value;
use slackbud_commands::{DeferredTask, Dispatcher, TokenCodec};
use slackbud_config::schema::{ServerConfig, SlackConfig};
use slackbud_logging::{AuditEvent, AuditLogger};
use tracing::{error, info, warn};

use crate::launcher::TASK_SIGNATURE_HEADER;
use crate::payload::{decode_interaction, SlashCommandForm};
use crate::signature::verify_slack_signature;

// ---------------------------------------------------------------------------
// Axum state
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct SlackState {
    pub dispatcher: Arc<Dispatcher>,
    /// Verifies task envelopes; same secret as confirmation tokens.
    pub codec: TokenCodec,
    pub slack: Arc<SlackConfig>,
}

pub fn build_router(state: SlackState, server: &ServerConfig) -> Router {
    Router::new()
        .route(&server.commands_path, post(handle_slash_command))
        .route(&server.interactive_path, post(handle_interaction))
        .route(&server.tasks_path, post(handle_task))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn handle_slash_command(State(state): State<SlackState>, headers: HeaderMap, body: Bytes) -> Response {
    if !signature_ok(&state.slack, &headers, &body) {
        warn!("[Slack] Invalid signature, rejecting slash command");
        return (StatusCode::UNAUTHORIZED, "invalid_signature").into_response();
    }

    let form = match SlashCommandForm::decode(&body) {
        Ok(f) => f,
        Err(err) => {
            error!("[Slack] Failed to decode slash command: {}", err);
            return (StatusCode::BAD_REQUEST, "bad_form").into_response();
        }
    };

    AuditLogger::record(
        &form.user_id,
        AuditEvent::SlashCommand {
            slash_command: form.command.clone(),
            text: form.text.clone(),
        },
    );
    let raw = form.into_raw(&state.slack);
    Json(state.dispatcher.handle_command(raw).await).into_response()
}

async fn handle_interaction(State(state): State<SlackState>, headers: HeaderMap, body: Bytes) -> Response {
    if !signature_ok(&state.slack, &headers, &body) {
        warn!("[Slack] Invalid signature, rejecting interaction");
        return (StatusCode::UNAUTHORIZED, "invalid_signature").into_response();
    }

    let payload = match decode_interaction(&body, &state.slack) {
        Ok(p) => p,
        Err(err) => {
            error!("[Slack] Failed to decode interaction: {}", err);
            return (StatusCode::BAD_REQUEST, "bad_payload").into_response();
        }
    };

    AuditLogger::record(
        &payload.identity.user_id,
        AuditEvent::Interaction {
            action: payload.action_name.clone(),
        },
    );
    Json(state.dispatcher.handle_confirmation(payload).await).into_response()
}

async fn handle_task(State(state): State<SlackState>, headers: HeaderMap, body: Bytes) -> Response {
    // Keep-warm pings from a scheduler carry no task and are not signed.
    if is_keep_warm(&body) {
        return (StatusCode::OK, "done").into_response();
    }

    let signature = headers.get(TASK_SIGNATURE_HEADER).and_then(|v| v.to_str().ok());
    if !signature.is_some_and(|sig| state.codec.verify(&body, sig)) {
        warn!("Invalid task envelope signature");
        return (StatusCode::UNAUTHORIZED, "invalid_signature").into_response();
    }

    let task: DeferredTask = match serde_json::from_slice(&body) {
        Ok(t) => t,
        Err(err) => {
            error!("Failed to parse task envelope: {}", err);
            return (StatusCode::BAD_REQUEST, "bad_json").into_response();
        }
    };

    let user_id = task.params.get("user_id").cloned().unwrap_or_default();
    AuditLogger::record(&user_id, AuditEvent::DeferredTask { task: task.task.clone() });
    info!(task = %task.task, "Accepted deferred task");

    // Answer the launcher now; the result goes to the task's response_url.
    let dispatcher = Arc::clone(&state.dispatcher);
    tokio::spawn(async move {
        dispatcher.run_deferred(task).await;
    });
    (StatusCode::ACCEPTED, "accepted").into_response()
}

fn signature_ok(slack: &SlackConfig, headers: &HeaderMap, body: &[u8]) -> bool {
    if !slack.verify_signatures {
        return true;
    }
    match slack.signing_secret.as_deref() {
        Some(secret) if !secret.is_empty() => verify_slack_signature(headers, body, secret),
        _ => false,
    }
}

fn is_keep_warm(body: &[u8]) -> bool {
    serde_json::from_slice::<Value>(body)
        .ok()
        .and_then(|v| v.get("detail-type").and_then(Value::as_str).map(|s| s == "Scheduled Event"))
        .unwrap_or(false)
}
