//! Command input parsing: raw command line -> validated [`Invocation`].
//!
//! The parser does no I/O. It tokenizes, resolves switches against the
//! sub-command's descriptors, coerces values and checks required switches.

use slackbud_core::{BudError, ExecutionContext, Identity};
use tracing::debug;

use crate::invocation::{Invocation, SwitchValue};
use crate::types::{CommandDescriptor, SwitchDescriptor, SwitchType};

/// Reserved sub-command token that renders help instead of running.
pub const HELP_TOKEN: &str = "help";

/// The inbound request before parsing.
#[derive(Debug, Clone, Default)]
pub struct RawInvocation {
    /// Free-form command line, e.g. `cmd history -n 5`.
    pub text: String,
    pub identity: Identity,
    pub environment: String,
    pub response_url: Option<String>,
    pub channel_id: Option<String>,
}

/// A command line split into its command token and the remaining tokens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandLine {
    pub command: String,
    pub rest: Vec<String>,
}

impl CommandLine {
    pub fn split(text: &str) -> Result<Self, BudError> {
        let mut tokens = tokenize(text).into_iter();
        let command = tokens
            .next()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| BudError::UnknownCommand(String::new()))?;
        Ok(Self {
            command,
            rest: tokens.collect(),
        })
    }
}

/// Split on whitespace, keeping quoted runs together.
///
/// Handles ASCII quotes and the typographic quotes chat clients substitute.
/// A quote only opens a group at the start of a token, so `don't` stays one
/// word.
pub fn tokenize(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut in_token = false;
    let mut closing: Option<&'static [char]> = None;

    for c in text.chars() {
        if let Some(close) = closing {
            if close.contains(&c) {
                closing = None;
            } else {
                current.push(c);
            }
            continue;
        }
        if c.is_whitespace() {
            if in_token {
                tokens.push(std::mem::take(&mut current));
                in_token = false;
            }
            continue;
        }
        if !in_token {
            in_token = true;
            if let Some(close) = closing_quote(c) {
                closing = Some(close);
                continue;
            }
        }
        current.push(c);
    }
    if in_token {
        tokens.push(current);
    }
    tokens
}

fn closing_quote(open: char) -> Option<&'static [char]> {
    match open {
        '"' => Some(&['"']),
        '\'' => Some(&['\'']),
        '\u{201C}' => Some(&['\u{201D}', '"']),
        '\u{2018}' => Some(&['\u{2019}', '\'']),
        _ => None,
    }
}

/// `-5` and `-1.5` are values, not switches.
fn is_switch_token(token: &str) -> bool {
    let Some(rest) = token.strip_prefix('-') else {
        return false;
    };
    !rest.is_empty() && !rest.starts_with(|c: char| c.is_ascii_digit() || c == '.')
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InputParser {
    /// Disable alias case-folding and value lower-casing.
    pub case_sensitive: bool,
}

impl InputParser {
    pub fn new(case_sensitive: bool) -> Self {
        Self { case_sensitive }
    }

    /// Build the invocation for an already-resolved command.
    ///
    /// A later occurrence of the same switch replaces the earlier value.
    pub fn parse(
        &self,
        descriptor: &CommandDescriptor,
        line: &CommandLine,
        raw: &RawInvocation,
    ) -> Result<Invocation, BudError> {
        let mut inv = Invocation {
            raw_text: raw.text.trim().to_string(),
            command: descriptor.name.clone(),
            identity: raw.identity.clone(),
            environment: raw.environment.clone(),
            context: ExecutionContext::Immediate,
            response_url: raw.response_url.clone(),
            channel_id: raw.channel_id.clone(),
            ..Default::default()
        };

        let mut tokens = line.rest.as_slice();
        let sub = match tokens.first() {
            Some(first) if first == HELP_TOKEN => return Ok(inv),
            Some(first) if !is_switch_token(first) => {
                tokens = &tokens[1..];
                descriptor.find_sub_command(first).ok_or_else(|| BudError::UnknownSubCommand {
                    command: descriptor.name.clone(),
                    sub_command: first.clone(),
                    available: descriptor.sub_command_names(),
                })?
            }
            _ => match descriptor
                .default_sub_command
                .as_deref()
                .and_then(|d| descriptor.find_sub_command(d))
            {
                Some(default) => default,
                // Nothing to run: render help.
                None => return Ok(inv),
            },
        };
        inv.sub_command = Some(sub.name.clone());

        let fold = !self.case_sensitive;
        let mut i = 0;
        while i < tokens.len() {
            let token = &tokens[i];
            i += 1;

            if !is_switch_token(token) {
                if sub.accepts_args {
                    inv.args.push(token.clone());
                    continue;
                }
                return Err(BudError::UnknownSwitch(token.clone()));
            }

            let body = token.strip_prefix("--").unwrap_or_else(|| &token[1..]);
            let (name, inline) = match body.split_once('=') {
                Some((n, v)) => (n, Some(v.to_string())),
                None => (body, None),
            };
            let switch = sub
                .find_switch(name, fold)
                .ok_or_else(|| BudError::UnknownSwitch(token.clone()))?;

            let value = match switch.switch_type {
                SwitchType::Flag => match inline {
                    None => SwitchValue::Flag(true),
                    Some(v) => coerce(switch, &v, fold)?,
                },
                _ => {
                    let raw_value = match inline {
                        Some(v) => v,
                        None => match tokens.get(i) {
                            Some(next) if !is_switch_token(next) => {
                                i += 1;
                                next.clone()
                            }
                            _ => {
                                return Err(BudError::TypeMismatch {
                                    switch: switch.key.clone(),
                                    expected: switch.switch_type.to_string(),
                                    value: String::new(),
                                })
                            }
                        },
                    };
                    coerce(switch, &raw_value, fold)?
                }
            };

            if let Some(previous) = inv.switches.insert(switch.key.clone(), value) {
                debug!(switch = %switch.key, previous = %previous, "Switch repeated; later value wins");
            }
        }

        let missing: Vec<String> = sub
            .required_keys()
            .filter(|k| !inv.switches.contains_key(*k))
            .map(str::to_string)
            .collect();
        if !missing.is_empty() {
            return Err(BudError::MissingRequiredSwitch(missing));
        }

        Ok(inv)
    }
}

fn coerce(switch: &SwitchDescriptor, raw: &str, fold: bool) -> Result<SwitchValue, BudError> {
    let mismatch = || BudError::TypeMismatch {
        switch: switch.key.clone(),
        expected: switch.switch_type.to_string(),
        value: raw.to_string(),
    };
    match switch.switch_type {
        SwitchType::String if fold && switch.lower_case => Ok(SwitchValue::Str(raw.to_lowercase())),
        SwitchType::String => Ok(SwitchValue::Str(raw.to_string())),
        SwitchType::Int => raw.parse::<i64>().map(SwitchValue::Int).map_err(|_| mismatch()),
        SwitchType::Flag => match raw.to_ascii_lowercase().as_str() {
            "true" | "yes" | "1" => Ok(SwitchValue::Flag(true)),
            "false" | "no" | "0" => Ok(SwitchValue::Flag(false)),
            _ => Err(mismatch()),
        },
    }
}
