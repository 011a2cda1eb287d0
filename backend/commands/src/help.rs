//! Help text rendered from descriptors.

use std::collections::BTreeMap;

use slackbud_core::{PermissionLevel, SlackResponse};

use crate::registry::CommandRegistry;
use crate::types::{CommandDescriptor, SubCommandDescriptor, SwitchType};

/// Full help for one command: every sub-command, its switches and examples.
pub fn command_help(descriptor: &CommandDescriptor) -> SlackResponse {
    let mut lines = Vec::new();
    for sub in &descriptor.sub_commands {
        lines.push(sub_command_line(descriptor, sub));
        for switch in &sub.switches {
            let aliases = switch
                .aliases
                .iter()
                .map(|a| if a.len() == 1 { format!("-{a}") } else { format!("--{a}") })
                .collect::<Vec<_>>()
                .join(", ");
            let value = match switch.switch_type {
                SwitchType::Flag => String::new(),
                other => format!(" <{other}>"),
            };
            let required = if switch.required { " (required)" } else { "" };
            lines.push(
                format!("    `{aliases}{value}`{required} {}", switch.help_text)
                    .trim_end()
                    .to_string(),
            );
        }
        for example in &sub.help_examples {
            lines.push(format!("    _e.g._ `{example}`"));
        }
    }
    if let Some(default) = &descriptor.default_sub_command {
        lines.push(format!("_Default sub-command:_ `{default}`"));
    }
    SlackResponse::standard(format!("{} help", descriptor.help_title), lines.join("\n"))
}

fn sub_command_line(descriptor: &CommandDescriptor, sub: &SubCommandDescriptor) -> String {
    let args = if sub.accepts_args { " [args...]" } else { "" };
    format!("*{} {}*{args}: {}", descriptor.name, sub.name, sub.help_text)
}

/// Commands the caller may run, grouped by `group`, in name order.
pub fn overview(registry: &CommandRegistry, caller: PermissionLevel) -> SlackResponse {
    let mut groups: BTreeMap<&str, Vec<String>> = BTreeMap::new();
    for d in registry.descriptors().filter(|d| caller.satisfies(d.permission_level)) {
        groups
            .entry(d.group.as_str())
            .or_default()
            .push(format!("*{}*: {} (`{} help`)", d.name, d.help_title, d.name));
    }
    let text = groups
        .into_iter()
        .map(|(group, lines)| format!("_{group}_\n{}", lines.join("\n")))
        .collect::<Vec<_>>()
        .join("\n\n");
    SlackResponse::standard("Available commands", text)
}
