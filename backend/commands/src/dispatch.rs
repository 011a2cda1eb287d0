//! Request dispatch: resolve, parse, gate, then run inline or hand off.
//!
//! Every entry point returns a [`SlackResponse`]; errors are classified and
//! rendered here so nothing escapes to the transport.

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use slackbud_core::{BudError, Disposition, ExecutionContext, PermissionLevel, RunType, SlackResponse};
use tracing::{debug, error, info, warn};

use crate::command::{Command, CommandContext};
use crate::confirm::{ConfirmationCorrelator, ConfirmationIssuer, ConfirmationPayload, TokenCodec};
use crate::help;
use crate::invocation::{FlatMap, Invocation};
use crate::parser::{CommandLine, InputParser, RawInvocation};
use crate::registry::CommandRegistry;
use crate::services::Services;

// ---------------------------------------------------------------------------
// Deferred boundary
// ---------------------------------------------------------------------------

/// The unit handed to the deferred worker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeferredTask {
    /// `command.sub_command`.
    pub task: String,
    pub params: FlatMap,
}

/// Starts deferred work without waiting for it.
#[async_trait]
pub trait DeferredLauncher: Send + Sync {
    async fn launch(&self, task: DeferredTask) -> anyhow::Result<()>;
}

/// Delivers an out-of-band response to the platform.
#[async_trait]
pub trait ResponseSink: Send + Sync {
    async fn post(&self, response_url: &str, response: &SlackResponse) -> anyhow::Result<()>;
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

pub struct Dispatcher {
    registry: Arc<CommandRegistry>,
    parser: InputParser,
    issuer: ConfirmationIssuer,
    correlator: ConfirmationCorrelator,
    services: Services,
    launcher: Arc<dyn DeferredLauncher>,
    sink: Arc<dyn ResponseSink>,
}

impl Dispatcher {
    pub fn new(
        registry: Arc<CommandRegistry>,
        codec: TokenCodec,
        services: Services,
        launcher: Arc<dyn DeferredLauncher>,
        sink: Arc<dyn ResponseSink>,
    ) -> Self {
        Self {
            registry,
            parser: InputParser::default(),
            issuer: ConfirmationIssuer::new(codec.clone()),
            correlator: ConfirmationCorrelator::new(codec),
            services,
            launcher,
            sink,
        }
    }

    pub fn with_parser(mut self, parser: InputParser) -> Self {
        self.parser = parser;
        self
    }

    /// Entry point for a slash command.
    pub async fn handle_command(&self, raw: RawInvocation) -> SlackResponse {
        let user_id = raw.identity.user_id.clone();
        let text = raw.text.trim().to_string();
        match self.try_command(raw).await {
            Ok(response) => response,
            Err(err) => report(&err, &text, &user_id, ExecutionContext::Immediate),
        }
    }

    async fn try_command(&self, raw: RawInvocation) -> Result<SlackResponse, BudError> {
        let line = CommandLine::split(&raw.text)?;
        let command = self.registry.resolve(&line.command)?;
        let descriptor = command.descriptor();

        // Parse before the gate, but a denied caller always hears "denied",
        // never a description of what they typed wrong.
        let parsed = self.parser.parse(descriptor, &line, &raw);
        let caller = self.caller_level(&raw.identity.user_id).await?;
        CommandRegistry::check_permission(descriptor, caller)?;
        let inv = parsed?;

        let Some(sub_name) = inv.sub_command.as_deref() else {
            return Ok(help::command_help(descriptor));
        };
        let sub = descriptor
            .find_sub_command(sub_name)
            .ok_or_else(|| BudError::unrecoverable(format!("parser produced undeclared sub-command '{sub_name}'")))?;

        info!(
            command = %inv.command,
            sub_command = %sub_name,
            user = %inv.identity.user_id,
            run_type = ?sub.run_type,
            "Dispatching"
        );
        self.record_usage(&inv).await;

        match sub.run_type {
            RunType::Immediate => {
                self.record_history(&inv).await;
                self.execute(command.as_ref(), &inv, caller).await
            }
            RunType::Deferred => self.hand_off(&inv).await,
        }
    }

    async fn hand_off(&self, inv: &Invocation) -> Result<SlackResponse, BudError> {
        let mut deferred = inv.clone();
        deferred.context = ExecutionContext::Deferred;
        let task = DeferredTask {
            task: inv.task_name(),
            params: deferred.to_flat(),
        };
        self.launcher
            .launch(task)
            .await
            .map_err(|e| BudError::unrecoverable(format!("deferred launch failed: {e:#}")))?;
        debug!(task = %inv.task_name(), "Handed off to deferred worker");
        Ok(SlackResponse::acknowledgement(format!(
            "Working on `{}`. Results will be posted here when ready.",
            inv.command_line()
        )))
    }

    /// Run a task previously handed off, posting the result to its
    /// `response_url`. The posted response is also returned.
    pub async fn run_deferred(&self, task: DeferredTask) -> SlackResponse {
        let user_id = task.params.get("user_id").cloned().unwrap_or_default();
        let response_url = task.params.get("response_url").cloned();
        let response = match self.try_deferred(&task).await {
            Ok(response) => response,
            Err(err) => report(&err, &task.task, &user_id, ExecutionContext::Deferred),
        };
        match response_url {
            Some(url) => {
                if let Err(e) = self.sink.post(&url, &response).await {
                    error!(task = %task.task, error = %e, "Failed to post deferred response");
                }
            }
            None => warn!(task = %task.task, "Deferred task has no response_url; result dropped"),
        }
        response
    }

    async fn try_deferred(&self, task: &DeferredTask) -> Result<SlackResponse, BudError> {
        let mut inv = Invocation::from_flat(&task.params).map_err(BudError::unrecoverable)?;
        if inv.task_name() != task.task {
            return Err(BudError::unrecoverable(format!(
                "task '{}' carries invocation for '{}'",
                task.task,
                inv.task_name()
            )));
        }
        inv.context = ExecutionContext::Deferred;

        let command = self.registry.resolve(&inv.command)?;
        let descriptor = command.descriptor();
        match descriptor.find_sub_command(inv.sub_command()) {
            Some(sub) if sub.run_type == RunType::Deferred => {}
            _ => return Err(BudError::unrecoverable(format!("'{}' is not a deferred sub-command", task.task))),
        }
        let caller = self.caller_level(&inv.identity.user_id).await?;
        CommandRegistry::check_permission(descriptor, caller)?;

        info!(task = %task.task, user = %inv.identity.user_id, "Running deferred task");
        self.execute(command.as_ref(), &inv, caller).await
    }

    /// Entry point for a button click on a confirmation prompt.
    pub async fn handle_confirmation(&self, payload: ConfirmationPayload) -> SlackResponse {
        let user_id = payload.identity.user_id.clone();
        match self.try_confirmation(&payload).await {
            Ok(response) => response.replacing_original(),
            Err(err) => report(&err, "confirmation", &user_id, ExecutionContext::Immediate).replacing_original(),
        }
    }

    async fn try_confirmation(&self, payload: &ConfirmationPayload) -> Result<SlackResponse, BudError> {
        let (command, inv) = self.correlator.correlate(&self.registry, payload)?;
        let caller = self.caller_level(&inv.identity.user_id).await?;
        CommandRegistry::check_permission(command.descriptor(), caller)?;

        info!(
            command = %inv.command,
            sub_command = %inv.sub_command(),
            user = %inv.identity.user_id,
            action = %payload.action_name,
            "Routing confirmation"
        );
        let ctx = self.context(ExecutionContext::Immediate, caller);
        AssertUnwindSafe(command.confirm(&ctx, &inv))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(BudError::unrecoverable(panic_message(panic.as_ref()))))
    }

    async fn execute(
        &self,
        command: &dyn Command,
        inv: &Invocation,
        caller: PermissionLevel,
    ) -> Result<SlackResponse, BudError> {
        let ctx = self.context(inv.context, caller);
        AssertUnwindSafe(command.handle(&ctx, inv))
            .catch_unwind()
            .await
            .unwrap_or_else(|panic| Err(BudError::unrecoverable(panic_message(panic.as_ref()))))
    }

    fn context(&self, execution: ExecutionContext, caller: PermissionLevel) -> CommandContext<'_> {
        CommandContext {
            execution,
            caller,
            registry: &self.registry,
            confirmations: &self.issuer,
        }
    }

    async fn caller_level(&self, user_id: &str) -> Result<PermissionLevel, BudError> {
        self.services
            .roles
            .level_of(user_id)
            .await
            .map_err(|e| BudError::unrecoverable(format!("role lookup failed: {e:#}")))
    }

    async fn record_usage(&self, inv: &Invocation) {
        if let Err(e) = self.services.usage.increment(&inv.task_name()).await {
            warn!(task = %inv.task_name(), error = %e, "Failed to count usage");
        }
    }

    async fn record_history(&self, inv: &Invocation) {
        if let Err(e) = self
            .services
            .history
            .record(&inv.identity.user_id, inv.command_line(), Utc::now())
            .await
        {
            warn!(user = %inv.identity.user_id, error = %e, "Failed to record history");
        }
    }
}

fn report(err: &BudError, what: &str, user_id: &str, context: ExecutionContext) -> SlackResponse {
    match err.disposition() {
        Disposition::UserFacing => {
            info!(kind = err.kind(), user = %user_id, context = %context, input = %what, detail = %err, "Rejected")
        }
        Disposition::Internal => {
            error!(kind = err.kind(), user = %user_id, context = %context, input = %what, error = %err, "Command failed")
        }
    }
    SlackResponse::error(err.user_message())
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        format!("handler panicked: {s}")
    } else if let Some(s) = panic.downcast_ref::<String>() {
        format!("handler panicked: {s}")
    } else {
        "handler panicked".to_string()
    }
}
