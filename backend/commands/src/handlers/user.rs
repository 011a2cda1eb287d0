use std::sync::Arc;

use async_trait::async_trait;
use slackbud_core::{Action, ActionStyle, BudError, PermissionLevel, SlackResponse};
use tracing::info;

use crate::command::{Command, CommandContext};
use crate::confirm::{ConfirmationPrompt, CHOICE_CANCEL, CHOICE_CONFIRM, PARAM_ACTION};
use crate::invocation::Invocation;
use crate::services::RoleDirectory;
use crate::types::{CommandDescriptor, SubCommandDescriptor};

/// `user`: manage who may run what.
pub struct UserCommand {
    descriptor: CommandDescriptor,
    roles: Arc<dyn RoleDirectory>,
}

impl UserCommand {
    pub fn new(roles: Arc<dyn RoleDirectory>) -> Self {
        let descriptor = CommandDescriptor::new("user", "admin", "Manage user roles", PermissionLevel::Admin)
            .sub_command(SubCommandDescriptor::immediate("list", "List users with a role"))
            .sub_command(
                SubCommandDescriptor::immediate("add", "Grant a role: `<user_id> <public|dev|admin> [name]`")
                    .with_args()
                    .example("/run user add U024BE7LH dev"),
            )
            .sub_command(
                SubCommandDescriptor::immediate("remove", "Revoke a user's role: `<user_id>`")
                    .with_args()
                    .example("/run user remove U024BE7LH"),
            );
        Self { descriptor, roles }
    }

    async fn list(&self) -> Result<SlackResponse, BudError> {
        let entries = self.roles.list().await?;
        let text = if entries.is_empty() {
            "No users have a role yet.".to_string()
        } else {
            entries
                .iter()
                .map(|e| format!("`{}` {} _{}_", e.user_id, e.user_name, e.level))
                .collect::<Vec<_>>()
                .join("\n")
        };
        Ok(SlackResponse::standard("Users", text))
    }

    fn parse_add(inv: &Invocation) -> Result<(&str, PermissionLevel), BudError> {
        let (Some(user_id), Some(level)) = (inv.arg(0), inv.arg(1)) else {
            return Err(BudError::user("Usage: `user add <user_id> <public|dev|admin> [name]`"));
        };
        let level = level.parse::<PermissionLevel>().map_err(BudError::user)?;
        Ok((user_id, level))
    }

    fn parse_remove(inv: &Invocation) -> Result<&str, BudError> {
        inv.arg(0)
            .ok_or_else(|| BudError::user("Usage: `user remove <user_id>`"))
    }

    fn prompt(&self, ctx: &CommandContext<'_>, inv: &Invocation) -> Result<SlackResponse, BudError> {
        let prompt = match inv.sub_command() {
            "add" => {
                let (user_id, level) = Self::parse_add(inv)?;
                let question = format!("Grant `{level}` to `{user_id}`?");
                ConfirmationPrompt::new("Please confirm", question).with_actions(vec![
                    Action::button(CHOICE_CONFIRM, "Grant", "yes").with_style(ActionStyle::Primary),
                    Action::button(CHOICE_CANCEL, "Cancel", "no"),
                ])
            }
            _ => {
                let question = format!("Remove all roles from `{}`?", Self::parse_remove(inv)?);
                ConfirmationPrompt::new("Please confirm", question)
            }
        };
        ctx.confirmations.issue(inv, prompt.keep_args())
    }
}

#[async_trait]
impl Command for UserCommand {
    fn descriptor(&self) -> &CommandDescriptor {
        &self.descriptor
    }

    async fn handle(&self, ctx: &CommandContext<'_>, inv: &Invocation) -> Result<SlackResponse, BudError> {
        match inv.sub_command() {
            "list" => self.list().await,
            "add" | "remove" => self.prompt(ctx, inv),
            other => Err(BudError::unrecoverable(format!("user has no handler for '{other}'"))),
        }
    }

    async fn confirm(&self, _ctx: &CommandContext<'_>, inv: &Invocation) -> Result<SlackResponse, BudError> {
        if inv.confirmation_param(PARAM_ACTION) != Some(CHOICE_CONFIRM) {
            return Ok(SlackResponse::standard("Cancelled", "No changes were made."));
        }
        match inv.sub_command() {
            "add" => {
                let (user_id, level) = Self::parse_add(inv)?;
                let name = inv.arg(2).unwrap_or(user_id);
                self.roles.set_level(user_id, name, level).await?;
                info!(by = %inv.identity.user_id, user = %user_id, level = %level, "Role granted");
                Ok(SlackResponse::standard("User updated", format!("`{user_id}` is now `{level}`.")))
            }
            "remove" => {
                let user_id = Self::parse_remove(inv)?;
                let removed = self.roles.remove(user_id).await?;
                info!(by = %inv.identity.user_id, user = %user_id, removed, "Role revoked");
                let text = if removed {
                    format!("`{user_id}` no longer has a role.")
                } else {
                    format!("`{user_id}` had no role.")
                };
                Ok(SlackResponse::standard("User updated", text))
            }
            other => Err(BudError::InvalidConfirmationToken(format!("user {other} takes no confirmation"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::{ConfirmationIssuer, TokenCodec};
    use crate::registry::CommandRegistry;
    use crate::testing::MemoryRoles;
    use slackbud_core::ExecutionContext;

    fn inv(sub: &str, args: &[&str]) -> Invocation {
        Invocation {
            command: "user".into(),
            sub_command: Some(sub.into()),
            args: args.iter().map(|a| a.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_add_prompts_then_applies_on_confirm() {
        let roles = Arc::new(MemoryRoles::default());
        let cmd = UserCommand::new(roles.clone());
        let registry = CommandRegistry::new();
        let issuer = ConfirmationIssuer::new(TokenCodec::new("s", 0));
        let ctx = CommandContext {
            execution: ExecutionContext::Immediate,
            caller: PermissionLevel::Admin,
            registry: &registry,
            confirmations: &issuer,
        };

        let add = inv("add", &["U42", "dev"]);
        let prompt = cmd.handle(&ctx, &add).await.unwrap();
        assert!(prompt.attachments[0].callback_id.is_some());
        let actions = &prompt.attachments[0].actions;
        assert_eq!(actions[0].name, CHOICE_CONFIRM);
        assert_eq!(actions[0].style, Some(ActionStyle::Primary));
        assert_eq!(actions[1].style, None);
        assert_eq!(roles.level_of("U42").await.unwrap(), PermissionLevel::Public);

        let mut cancel = add.clone();
        cancel.confirmation_params.insert(PARAM_ACTION.into(), CHOICE_CANCEL.into());
        assert_eq!(cmd.confirm(&ctx, &cancel).await.unwrap().title(), Some("Cancelled"));
        assert_eq!(roles.level_of("U42").await.unwrap(), PermissionLevel::Public);

        let mut confirm = add.clone();
        confirm.confirmation_params.insert(PARAM_ACTION.into(), CHOICE_CONFIRM.into());
        cmd.confirm(&ctx, &confirm).await.unwrap();
        assert_eq!(roles.level_of("U42").await.unwrap(), PermissionLevel::Dev);

        let mut remove = inv("remove", &["U42"]);
        remove.confirmation_params.insert(PARAM_ACTION.into(), CHOICE_CONFIRM.into());
        cmd.confirm(&ctx, &remove).await.unwrap();
        assert!(roles.list().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_add_rejects_bad_role() {
        let cmd = UserCommand::new(Arc::new(MemoryRoles::default()));
        let registry = CommandRegistry::new();
        let issuer = ConfirmationIssuer::new(TokenCodec::new("s", 0));
        let ctx = CommandContext {
            execution: ExecutionContext::Immediate,
            caller: PermissionLevel::Admin,
            registry: &registry,
            confirmations: &issuer,
        };
        assert!(matches!(cmd.handle(&ctx, &inv("add", &["U42", "root"])).await, Err(BudError::User(_))));
        assert!(matches!(cmd.handle(&ctx, &inv("remove", &[])).await, Err(BudError::User(_))));
    }
}
