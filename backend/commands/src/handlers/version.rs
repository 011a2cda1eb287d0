use async_trait::async_trait;
use slackbud_core::{BudError, PermissionLevel, SlackResponse};

use crate::command::{Command, CommandContext};
use crate::invocation::Invocation;
use crate::types::{CommandDescriptor, SubCommandDescriptor};

pub struct VersionCommand {
    descriptor: CommandDescriptor,
    version: String,
}

impl VersionCommand {
    pub fn new(version: impl Into<String>) -> Self {
        Self {
            descriptor: CommandDescriptor::new("version", "all", "Bot version", PermissionLevel::Public)
                .sub_command(SubCommandDescriptor::immediate("show", "Show the running version"))
                .default_to("show"),
            version: version.into(),
        }
    }
}

#[async_trait]
impl Command for VersionCommand {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    async fn handle(&self, _ctx: &CommandContext<'_>, inv: &Invocation) -> Result<SlackResponse, BudError> {
        Ok(SlackResponse::standard(
            "SlackBud version",
            format!("`{}` ({})", self.version, inv.environment),
        ))
    }
}
