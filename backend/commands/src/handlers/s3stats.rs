use std::sync::Arc;

use async_trait::async_trait;
use slackbud_core::{BudError, PermissionLevel, SlackResponse};

use crate::command::{Command, CommandContext};
use crate::invocation::Invocation;
use crate::services::ReportSource;
use crate::types::{CommandDescriptor, SubCommandDescriptor, SwitchDescriptor};

/// `s3stats`: per-account S3 bucket reports.
pub struct S3StatsCommand {
    descriptor: CommandDescriptor,
    reports: Arc<dyn ReportSource>,
}

impl S3StatsCommand {
    pub fn new(reports: Arc<dyn ReportSource>) -> Self {
        let account = || {
            SwitchDescriptor::string("account", &["a", "account"])
                .required()
                .help("Account name like net-eng, or dea")
        };
        let public = || {
            SwitchDescriptor::flag("public", &["p", "public"]).help("Post the reply to the whole channel")
        };
        let descriptor = CommandDescriptor::new("s3stats", "all", "Get AWS S3 bucket stats per account", PermissionLevel::Dev)
            .sub_command(
                SubCommandDescriptor::deferred("summary", "Get summary of S3 usage for account")
                    .switch(account())
                    .switch(public())
                    .example("/run s3stats summary -a dea"),
            )
            .sub_command(
                SubCommandDescriptor::immediate("details", "Get details of S3 usage for account")
                    .switch(account())
                    .switch(public())
                    .example("/run s3stats details -a net-eng"),
            );
        Self { descriptor, reports }
    }

    fn account(inv: &Invocation) -> Result<&str, BudError> {
        let account = inv
            .get_str("account")
            .ok_or_else(|| BudError::MissingRequiredSwitch(vec!["account".into()]))?;
        // Account names end up in file names.
        if account.is_empty() || !account.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
            return Err(BudError::user(format!("`{account}` is not a valid account name.")));
        }
        Ok(account)
    }
}

#[async_trait]
impl Command for S3StatsCommand {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    async fn handle(&self, _ctx: &CommandContext<'_>, inv: &Invocation) -> Result<SlackResponse, BudError> {
        let account = Self::account(inv)?;
        let resp = match inv.sub_command() {
            "summary" => {
                let text = match self.reports.summary(account).await? {
                    Some(contents) => contents,
                    None => format!("Failed to find file. {account}_s3_bucket_summary.txt"),
                };
                SlackResponse::standard(format!("S3 summary stats: {account}"), text)
            }
            "details" => SlackResponse::standard(
                format!("S3 bucket usage details: {account}"),
                format!("S3 Bucket details link:\n ```{}```\n", self.reports.details_link(account)),
            ),
            other => return Err(BudError::unrecoverable(format!("s3stats has no handler for '{other}'"))),
        };
        Ok(if inv.flag("public") { resp.in_channel() } else { resp })
    }
}
