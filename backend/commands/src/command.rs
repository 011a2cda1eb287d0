//! The contract every top-level command implements.

use async_trait::async_trait;
use slackbud_core::{BudError, ExecutionContext, PermissionLevel, SlackResponse};

use crate::confirm::ConfirmationIssuer;
use crate::invocation::Invocation;
use crate::registry::CommandRegistry;
use crate::types::CommandDescriptor;

/// What a handler can see besides its invocation.
pub struct CommandContext<'a> {
    pub execution: ExecutionContext,
    /// Level the caller was admitted with.
    pub caller: PermissionLevel,
    pub registry: &'a CommandRegistry,
    pub confirmations: &'a ConfirmationIssuer,
}

#[async_trait]
pub trait Command: Send + Sync {
    fn descriptor(&self) -> &CommandDescriptor;

    /// Run `inv.sub_command`; the dispatcher guarantees it is declared.
    async fn handle(&self, ctx: &CommandContext<'_>, inv: &Invocation) -> Result<SlackResponse, BudError>;

    /// Handle the follow-up to a prompt this command issued.
    ///
    /// `inv` carries the state stored in the token plus the user's choice in
    /// `confirmation_params`.
    async fn confirm(&self, _ctx: &CommandContext<'_>, inv: &Invocation) -> Result<SlackResponse, BudError> {
        Err(BudError::InvalidConfirmationToken(format!(
            "command '{}' does not take confirmations",
            inv.command
        )))
    }
}
