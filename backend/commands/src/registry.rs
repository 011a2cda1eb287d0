//! Command registry and permission gate.
//!
//! Commands are registered once at startup; the dispatcher only looks them
//! up, so adding a command never touches routing code.

use std::collections::BTreeMap;
use std::sync::Arc;

use slackbud_core::{BudError, PermissionLevel};
use tracing::debug;

use crate::command::Command;
use crate::types::{CommandDescriptor, SchemaError};

#[derive(Default)]
pub struct CommandRegistry {
    commands: BTreeMap<String, Arc<dyn Command>>,
}

impl CommandRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a command under its descriptor's name.
    pub fn register(&mut self, command: Arc<dyn Command>) -> Result<(), SchemaError> {
        let descriptor = command.descriptor();
        descriptor.validate()?;
        let name = descriptor.name.clone();
        if self.commands.contains_key(&name) {
            return Err(SchemaError::DuplicateCommand(name));
        }
        debug!(command = %name, sub_commands = descriptor.sub_commands.len(), "Registered command");
        self.commands.insert(name, command);
        Ok(())
    }

    /// Exact, case-sensitive lookup on the canonical name.
    pub fn resolve(&self, token: &str) -> Result<Arc<dyn Command>, BudError> {
        self.commands
            .get(token)
            .cloned()
            .ok_or_else(|| BudError::UnknownCommand(token.to_string()))
    }

    pub fn check_permission(descriptor: &CommandDescriptor, caller: PermissionLevel) -> Result<(), BudError> {
        if caller.satisfies(descriptor.permission_level) {
            Ok(())
        } else {
            Err(BudError::PermissionDenied)
        }
    }

    /// All descriptors in name order.
    pub fn descriptors(&self) -> impl Iterator<Item = &CommandDescriptor> {
        self.commands.values().map(|c| c.descriptor())
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::command::CommandContext;
    use crate::invocation::Invocation;
    use crate::types::SubCommandDescriptor;
    use async_trait::async_trait;
    use slackbud_core::SlackResponse;

    struct Fixed(CommandDescriptor);

    #[async_trait]
    impl Command for Fixed {
        fn descriptor(&self) -> &CommandDescriptor {
            &self.0
        }

        async fn handle(&self, _ctx: &CommandContext<'_>, _inv: &Invocation) -> Result<SlackResponse, BudError> {
            Ok(SlackResponse::standard("fixed", ""))
        }
    }

    fn fixed(name: &str, level: PermissionLevel) -> Arc<dyn Command> {
        Arc::new(Fixed(
            CommandDescriptor::new(name, "all", "t", level)
                .sub_command(SubCommandDescriptor::immediate("run", "run it")),
        ))
    }

    #[test]
    fn test_resolve_exact_match() {
        let mut registry = CommandRegistry::new();
        registry.register(fixed("cmd", PermissionLevel::Dev)).unwrap();
        assert!(registry.resolve("cmd").is_ok());
        assert!(matches!(registry.resolve("CMD"), Err(BudError::UnknownCommand(_))));
        assert!(matches!(registry.resolve("frobnicate"), Err(BudError::UnknownCommand(n)) if n == "frobnicate"));
    }

    #[test]
    fn test_duplicate_registration_rejected() {
        let mut registry = CommandRegistry::new();
        registry.register(fixed("cmd", PermissionLevel::Dev)).unwrap();
        assert_eq!(
            registry.register(fixed("cmd", PermissionLevel::Admin)).err(),
            Some(SchemaError::DuplicateCommand("cmd".into()))
        );
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_permission_gate_is_monotonic() {
        let levels = [PermissionLevel::Public, PermissionLevel::Dev, PermissionLevel::Admin];
        for required in levels {
            let desc = CommandDescriptor::new("x", "all", "t", required);
            for caller in levels {
                let allowed = CommandRegistry::check_permission(&desc, caller).is_ok();
                assert_eq!(allowed, caller >= required, "caller {caller} required {required}");
            }
        }
    }

    #[test]
    fn test_descriptors_in_name_order() {
        let mut registry = CommandRegistry::new();
        registry.register(fixed("s3stats", PermissionLevel::Dev)).unwrap();
        registry.register(fixed("cmd", PermissionLevel::Dev)).unwrap();
        let names: Vec<_> = registry.descriptors().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["cmd", "s3stats"]);
    }
}
