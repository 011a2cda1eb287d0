//! Declarative argument schema.
//!
//! Descriptors are built once at startup and shared read-only afterwards.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use slackbud_core::{PermissionLevel, RunType};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Switch
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwitchType {
    String,
    Int,
    /// Presence-only boolean; takes no value.
    Flag,
}

impl SwitchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwitchType::String => "string",
            SwitchType::Int => "int",
            SwitchType::Flag => "flag",
        }
    }
}

impl fmt::Display for SwitchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SwitchDescriptor {
    /// Canonical key the parsed value is stored under.
    pub key: String,
    pub aliases: Vec<String>,
    #[serde(rename = "type")]
    pub switch_type: SwitchType,
    pub required: bool,
    /// Match aliases case-insensitively and lower-case string values.
    pub lower_case: bool,
    pub help_text: String,
}

impl SwitchDescriptor {
    fn new(key: &str, aliases: &[&str], switch_type: SwitchType) -> Self {
        Self {
            key: key.to_string(),
            aliases: aliases.iter().map(|a| a.to_string()).collect(),
            switch_type,
            required: false,
            lower_case: true,
            help_text: String::new(),
        }
    }

    pub fn string(key: &str, aliases: &[&str]) -> Self {
        Self::new(key, aliases, SwitchType::String)
    }

    pub fn int(key: &str, aliases: &[&str]) -> Self {
        Self::new(key, aliases, SwitchType::Int)
    }

    pub fn flag(key: &str, aliases: &[&str]) -> Self {
        Self::new(key, aliases, SwitchType::Flag)
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn case_sensitive(mut self) -> Self {
        self.lower_case = false;
        self
    }

    pub fn help(mut self, text: &str) -> Self {
        self.help_text = text.to_string();
        self
    }

    /// Does `name` (without leading dashes) select this switch?
    pub fn matches(&self, name: &str, fold_case: bool) -> bool {
        self.aliases.iter().any(|a| {
            if fold_case && self.lower_case {
                a.eq_ignore_ascii_case(name)
            } else {
                a == name
            }
        })
    }
}

// ---------------------------------------------------------------------------
// Sub-command
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubCommandDescriptor {
    pub name: String,
    pub run_type: RunType,
    pub help_text: String,
    pub help_examples: Vec<String>,
    pub switches: Vec<SwitchDescriptor>,
    /// Bare tokens are kept as positional args instead of being rejected.
    pub accepts_args: bool,
}

impl SubCommandDescriptor {
    pub fn immediate(name: &str, help_text: &str) -> Self {
        Self::new(name, RunType::Immediate, help_text)
    }

    pub fn deferred(name: &str, help_text: &str) -> Self {
        Self::new(name, RunType::Deferred, help_text)
    }

    fn new(name: &str, run_type: RunType, help_text: &str) -> Self {
        Self {
            name: name.to_string(),
            run_type,
            help_text: help_text.to_string(),
            help_examples: Vec::new(),
            switches: Vec::new(),
            accepts_args: false,
        }
    }

    pub fn switch(mut self, switch: SwitchDescriptor) -> Self {
        self.switches.push(switch);
        self
    }

    pub fn example(mut self, example: &str) -> Self {
        self.help_examples.push(example.to_string());
        self
    }

    pub fn with_args(mut self) -> Self {
        self.accepts_args = true;
        self
    }

    pub fn find_switch(&self, name: &str, fold_case: bool) -> Option<&SwitchDescriptor> {
        self.switches.iter().find(|s| s.matches(name, fold_case))
    }

    pub fn required_keys(&self) -> impl Iterator<Item = &str> {
        self.switches
            .iter()
            .filter(|s| s.required)
            .map(|s| s.key.as_str())
    }
}

// ---------------------------------------------------------------------------
// Command
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CommandDescriptor {
    /// Canonical token, matched exactly.
    pub name: String,
    /// Visibility bucket used by help listings.
    pub group: String,
    pub help_title: String,
    pub permission_level: PermissionLevel,
    /// Ordered as help lists them.
    pub sub_commands: Vec<SubCommandDescriptor>,
    /// Used when the invocation names no sub-command.
    pub default_sub_command: Option<String>,
}

impl CommandDescriptor {
    pub fn new(name: &str, group: &str, help_title: &str, permission_level: PermissionLevel) -> Self {
        Self {
            name: name.to_string(),
            group: group.to_string(),
            help_title: help_title.to_string(),
            permission_level,
            sub_commands: Vec::new(),
            default_sub_command: None,
        }
    }

    pub fn sub_command(mut self, sub: SubCommandDescriptor) -> Self {
        self.sub_commands.push(sub);
        self
    }

    pub fn default_to(mut self, sub: &str) -> Self {
        self.default_sub_command = Some(sub.to_string());
        self
    }

    pub fn find_sub_command(&self, name: &str) -> Option<&SubCommandDescriptor> {
        self.sub_commands.iter().find(|s| s.name == name)
    }

    pub fn sub_command_names(&self) -> Vec<String> {
        self.sub_commands.iter().map(|s| s.name.clone()).collect()
    }

    /// Check the registration-time invariants.
    pub fn validate(&self) -> Result<(), SchemaError> {
        if self.name.trim().is_empty() || self.name.contains(char::is_whitespace) {
            return Err(SchemaError::InvalidName(self.name.clone()));
        }
        let mut subs = HashSet::new();
        for sub in &self.sub_commands {
            if !subs.insert(sub.name.as_str()) {
                return Err(SchemaError::DuplicateSubCommand {
                    command: self.name.clone(),
                    sub_command: sub.name.clone(),
                });
            }
            if sub.name == "help" {
                return Err(SchemaError::ReservedSubCommand(self.name.clone()));
            }
            let mut keys = HashSet::new();
            let mut aliases = HashSet::new();
            for switch in &sub.switches {
                if switch.aliases.is_empty() {
                    return Err(SchemaError::NoAliases {
                        command: self.name.clone(),
                        key: switch.key.clone(),
                    });
                }
                if !keys.insert(switch.key.as_str()) {
                    return Err(SchemaError::DuplicateKey {
                        command: self.name.clone(),
                        key: switch.key.clone(),
                    });
                }
                for alias in &switch.aliases {
                    // Aliases must stay unique even when folded.
                    if !aliases.insert(alias.to_ascii_lowercase()) {
                        return Err(SchemaError::DuplicateAlias {
                            command: self.name.clone(),
                            sub_command: sub.name.clone(),
                            alias: alias.clone(),
                        });
                    }
                }
            }
        }
        if let Some(default) = &self.default_sub_command {
            if !subs.contains(default.as_str()) {
                return Err(SchemaError::UnknownDefault {
                    command: self.name.clone(),
                    sub_command: default.clone(),
                });
            }
        }
        Ok(())
    }
}

/// Registration-time schema mistakes. These abort startup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SchemaError {
    #[error("invalid command name '{0}'")]
    InvalidName(String),
    #[error("command '{0}' is already registered")]
    DuplicateCommand(String),
    #[error("command '{command}' declares sub-command '{sub_command}' twice")]
    DuplicateSubCommand { command: String, sub_command: String },
    #[error("command '{0}' may not declare a 'help' sub-command")]
    ReservedSubCommand(String),
    #[error("switch '{key}' of '{command}' has no aliases")]
    NoAliases { command: String, key: String },
    #[error("switch key '{key}' of '{command}' is declared twice")]
    DuplicateKey { command: String, key: String },
    #[error("alias '{alias}' is used twice in '{command} {sub_command}'")]
    DuplicateAlias {
        command: String,
        sub_command: String,
        alias: String,
    },
    #[error("default sub-command '{sub_command}' of '{command}' is not declared")]
    UnknownDefault { command: String, sub_command: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    fn history() -> SubCommandDescriptor {
        SubCommandDescriptor::immediate("history", "Get the last commands typed")
            .switch(SwitchDescriptor::int("n", &["n", "num"]))
            .switch(SwitchDescriptor::string("g", &["g", "grep"]))
    }

    #[test]
    fn test_alias_matching_respects_lower_case_flag() {
        let folded = SwitchDescriptor::string("a", &["a", "account"]);
        assert!(folded.matches("ACCOUNT", true));
        assert!(!folded.matches("ACCOUNT", false));

        let exact = SwitchDescriptor::string("r", &["r", "role"]).case_sensitive();
        assert!(!exact.matches("ROLE", true));
        assert!(exact.matches("role", true));
    }

    #[test]
    fn test_valid_descriptor() {
        let desc = CommandDescriptor::new("cmd", "all", "Framework command", PermissionLevel::Dev)
            .sub_command(history());
        assert!(desc.validate().is_ok());
    }

    #[test]
    fn test_duplicate_alias_rejected() {
        let desc = CommandDescriptor::new("cmd", "all", "t", PermissionLevel::Dev).sub_command(
            history().switch(SwitchDescriptor::flag("x", &["x", "NUM"])),
        );
        assert!(matches!(desc.validate(), Err(SchemaError::DuplicateAlias { .. })));
    }

    #[test]
    fn test_unknown_default_rejected() {
        let desc = CommandDescriptor::new("cmd", "all", "t", PermissionLevel::Dev)
            .sub_command(history())
            .default_to("usage");
        assert!(matches!(desc.validate(), Err(SchemaError::UnknownDefault { .. })));
    }

    #[test]
    fn test_help_sub_command_reserved() {
        let desc = CommandDescriptor::new("cmd", "all", "t", PermissionLevel::Dev)
            .sub_command(SubCommandDescriptor::immediate("help", "nope"));
        assert_eq!(desc.validate(), Err(SchemaError::ReservedSubCommand("cmd".into())));
    }
}
