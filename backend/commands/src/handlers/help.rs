use async_trait::async_trait;
use slackbud_core::{BudError, PermissionLevel, SlackResponse};

use crate::command::{Command, CommandContext};
use crate::help;
use crate::invocation::Invocation;
use crate::types::{CommandDescriptor, SubCommandDescriptor};

/// `help`: list the commands the caller may run.
pub struct HelpCommand {
    descriptor: CommandDescriptor,
}

impl HelpCommand {
    pub fn new() -> Self {
        Self {
            descriptor: CommandDescriptor::new("help", "all", "List commands", PermissionLevel::Public)
                .sub_command(SubCommandDescriptor::immediate("list", "Show the commands you can run").example("/run help"))
                .default_to("list"),
        }
    }
}

impl Default for HelpCommand {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Command for HelpCommand {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    async fn handle(&self, ctx: &CommandContext<'_>, _inv: &Invocation) -> Result<SlackResponse, BudError> {
        Ok(help::overview(ctx.registry, ctx.caller))
    }
}
