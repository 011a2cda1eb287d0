//! `slackbud run`: one command line through the full dispatch path.
//!
//! Deferred work is drained from the queue and run inline, so the output is
//! the immediate reply followed by each deferred result.

use anyhow::Result;
use serde_json::Value;

use slackbud_commands::RawInvocation;
use slackbud_config::{DeferredMode, SlackBudConfig};
use slackbud_core::{Identity, SlackResponse};

use crate::wiring;

pub struct RunArgs {
    pub user: String,
    pub name: String,
    pub env: Option<String>,
    pub in_memory: bool,
    pub line: String,
}

pub async fn run(config: &SlackBudConfig, args: RunArgs) -> Result<()> {
    for output in execute(config, args).await? {
        println!("{}", serde_json::to_string_pretty(&output)?);
    }
    Ok(())
}

async fn execute(config: &SlackBudConfig, args: RunArgs) -> Result<Vec<Value>> {
    let mut wiring = wiring::build(config, DeferredMode::Queue, args.in_memory).await?;
    let raw = RawInvocation {
        text: args.line,
        identity: Identity::new(args.user, args.name),
        environment: args
            .env
            .unwrap_or_else(|| config.slack.default_environment.clone()),
        response_url: None,
        channel_id: None,
    };

    let mut outputs = vec![to_json(&wiring.dispatcher.handle_command(raw).await)?];
    if let Some(rx) = wiring.queue.as_mut() {
        while let Ok(task) = rx.try_recv() {
            outputs.push(to_json(&wiring.dispatcher.run_deferred(task).await)?);
        }
    }
    Ok(outputs)
}

fn to_json(response: &SlackResponse) -> Result<Value> {
    Ok(serde_json::to_value(response)?)
}
