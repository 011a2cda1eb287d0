use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use slackbud_core::{BudError, PermissionLevel, SlackResponse};

use crate::command::{Command, CommandContext};
use crate::invocation::Invocation;
use crate::services::{HistoryStore, UsageCounter};
use crate::types::{CommandDescriptor, SubCommandDescriptor, SwitchDescriptor};

const DEFAULT_HISTORY: i64 = 10;
const MAX_HISTORY: i64 = 500;

/// `cmd`: framework introspection (history and usage counters).
pub struct CmdCommand {
    descriptor: CommandDescriptor,
    history: Arc<dyn HistoryStore>,
    usage: Arc<dyn UsageCounter>,
}

impl CmdCommand {
    pub fn new(history: Arc<dyn HistoryStore>, usage: Arc<dyn UsageCounter>) -> Self {
        let num = || SwitchDescriptor::int("num", &["n", "num"]).help("Number of entries");
        let descriptor = CommandDescriptor::new("cmd", "all", "Framework command history and usage", PermissionLevel::Dev)
            .sub_command(
                SubCommandDescriptor::immediate("history", "Get the last commands typed")
                    .switch(num())
                    .switch(SwitchDescriptor::string("grep", &["g", "grep"]).help("Only lines containing this text"))
                    .example("/run cmd history")
                    .example("/run cmd history -n 30")
                    .example("/run cmd history -n 100 -g deploy"),
            )
            .sub_command(
                SubCommandDescriptor::immediate("usage", "Most used sub-commands")
                    .switch(num())
                    .example("/run cmd usage -n 5"),
            );
        Self {
            descriptor,
            history,
            usage,
        }
    }

    fn limit(inv: &Invocation) -> Result<usize, BudError> {
        let n = inv.get_int("num").unwrap_or(DEFAULT_HISTORY);
        if !(1..=MAX_HISTORY).contains(&n) {
            return Err(BudError::user(format!("`-n` must be between 1 and {MAX_HISTORY}.")));
        }
        Ok(n as usize)
    }

    async fn show_history(&self, inv: &Invocation) -> Result<SlackResponse, BudError> {
        let limit = Self::limit(inv)?;
        let grep = inv.get_str("grep").unwrap_or("");
        let entries = self.history.recent(&inv.identity.user_id, limit).await?;

        let mut seen = HashSet::new();
        let mut duplicates = 0;
        let mut filtered = 0;
        let mut text = String::new();
        for entry in &entries {
            if !grep.is_empty() && !entry.command_line.contains(grep) {
                filtered += 1;
                continue;
            }
            if seen.insert(entry.command_line.as_str()) {
                text.push_str(&format!("/run {}\n", entry.command_line));
            } else {
                duplicates += 1;
            }
        }
        if duplicates > 0 {
            text.push_str(&format!("Removed {duplicates} duplicate commands\n"));
        }
        if filtered > 0 {
            text.push_str(&format!("Removed {filtered} items not containing \"{grep}\"\n"));
        }
        Ok(SlackResponse::standard(format!("Command History ({limit})"), text))
    }

    async fn show_usage(&self, inv: &Invocation) -> Result<SlackResponse, BudError> {
        let limit = Self::limit(inv)?;
        let top = self.usage.top(limit).await?;
        let text = if top.is_empty() {
            "No usage recorded yet.".to_string()
        } else {
            top.iter()
                .map(|(key, count)| format!("`{key}`: {count}"))
                .collect::<Vec<_>>()
                .join("\n")
        };
        Ok(SlackResponse::standard(format!("Command Usage (top {limit})"), text))
    }
}

#[async_trait]
impl Command for CmdCommand {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    async fn handle(&self, _ctx: &CommandContext<'_>, inv: &Invocation) -> Result<SlackResponse, BudError> {
        match inv.sub_command() {
            "history" => self.show_history(inv).await,
            "usage" => self.show_usage(inv).await,
            other => Err(BudError::unrecoverable(format!("cmd has no handler for '{other}'"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::{ConfirmationIssuer, TokenCodec};
    use crate::invocation::SwitchValue;
    use crate::registry::CommandRegistry;
    use crate::testing::{MemoryHistory, MemoryUsage};
    use chrono::Utc;
    use slackbud_core::{ExecutionContext, Identity};

    async fn run(cmd: &CmdCommand, inv: &Invocation) -> Result<SlackResponse, BudError> {
        let registry = CommandRegistry::new();
        let issuer = ConfirmationIssuer::new(TokenCodec::new("s", 0));
        let ctx = CommandContext {
            execution: ExecutionContext::Immediate,
            caller: PermissionLevel::Dev,
            registry: &registry,
            confirmations: &issuer,
        };
        cmd.handle(&ctx, inv).await
    }

    fn inv(sub: &str) -> Invocation {
        Invocation {
            command: "cmd".into(),
            sub_command: Some(sub.into()),
            identity: Identity::new("U1", "dev"),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_history_dedupes_and_filters() {
        let history = Arc::new(MemoryHistory::default());
        for line in ["farm list", "s3stats details -a dea", "farm list", "s3stats summary -a dea"] {
            history.record("U1", line, Utc::now()).await.unwrap();
        }
        history.record("U2", "someone else", Utc::now()).await.unwrap();
        let cmd = CmdCommand::new(history, Arc::new(MemoryUsage::default()));

        let resp = run(&cmd, &inv("history")).await.unwrap();
        assert_eq!(resp.title(), Some("Command History (10)"));
        assert_eq!(
            resp.body(),
            "/run s3stats summary -a dea\n/run farm list\n/run s3stats details -a dea\nRemoved 1 duplicate commands\n"
        );

        let mut grep = inv("history");
        grep.switches.insert("grep".into(), SwitchValue::Str("s3stats".into()));
        let resp = run(&cmd, &grep).await.unwrap();
        assert!(resp.body().contains("Removed 2 items not containing \"s3stats\""));
        assert!(!resp.body().contains("farm"));
    }

    #[tokio::test]
    async fn test_history_limit_bounds() {
        let cmd = CmdCommand::new(Arc::new(MemoryHistory::default()), Arc::new(MemoryUsage::default()));
        let mut bad = inv("history");
        bad.switches.insert("num".into(), SwitchValue::Int(0));
        assert!(matches!(run(&cmd, &bad).await, Err(BudError::User(_))));
    }

    #[tokio::test]
    async fn test_usage_lists_top_counts() {
        let usage = Arc::new(MemoryUsage::default());
        for key in ["cmd.history", "s3stats.summary", "s3stats.summary"] {
            usage.increment(key).await.unwrap();
        }
        let cmd = CmdCommand::new(Arc::new(MemoryHistory::default()), usage);
        let resp = run(&cmd, &inv("usage")).await.unwrap();
        assert_eq!(resp.body(), "`s3stats.summary`: 2\n`cmd.history`: 1");
    }
}
