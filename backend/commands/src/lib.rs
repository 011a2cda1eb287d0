pub mod command;
pub mod confirm;
pub mod dispatch;
pub mod handlers;
pub mod help;
pub mod invocation;
pub mod parser;
pub mod registry;
pub mod services;
pub mod types;

#[cfg(test)]
mod testing;

use std::sync::Arc;

pub use command::{Command, CommandContext};
pub use confirm::{
    ConfirmationCorrelator, ConfirmationIssuer, ConfirmationPayload, ConfirmationPrompt, TokenCodec,
};
pub use dispatch::{DeferredLauncher, DeferredTask, Dispatcher, ResponseSink};
pub use invocation::{FlatMap, Invocation, SwitchValue};
pub use parser::{InputParser, RawInvocation};
pub use registry::CommandRegistry;
pub use services::{
    HistoryEntry, HistoryStore, ReportSource, RoleDirectory, RoleEntry, Services, UsageCounter,
};
pub use types::{CommandDescriptor, SchemaError, SubCommandDescriptor, SwitchDescriptor, SwitchType};

use handlers::{CmdCommand, HelpCommand, S3StatsCommand, UserCommand, VersionCommand};

/// Build a registry pre-loaded with every built-in command.
pub fn build_default_registry(
    services: &Services,
    reports: Arc<dyn ReportSource>,
    version: &str,
) -> Result<CommandRegistry, SchemaError> {
    let mut registry = CommandRegistry::new();
    registry.register(Arc::new(HelpCommand::new()))?;
    registry.register(Arc::new(VersionCommand::new(version)))?;
    registry.register(Arc::new(CmdCommand::new(services.history.clone(), services.usage.clone())))?;
    registry.register(Arc::new(S3StatsCommand::new(reports)))?;
    registry.register(Arc::new(UserCommand::new(services.roles.clone())))?;
    Ok(registry)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MemoryHistory, MemoryReports, MemoryRoles, MemoryUsage};

    #[test]
    fn test_default_registry_validates() {
        let services = Services {
            roles: Arc::new(MemoryRoles::default()),
            usage: Arc::new(MemoryUsage::default()),
            history: Arc::new(MemoryHistory::default()),
        };
        let registry = build_default_registry(&services, Arc::new(MemoryReports::default()), "0.1.0").unwrap();
        let names: Vec<_> = registry.descriptors().map(|d| d.name.as_str()).collect();
        assert_eq!(names, vec!["cmd", "help", "s3stats", "user", "version"]);
    }
}
