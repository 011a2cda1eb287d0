//! A parsed request and its flat `key -> string` form.
//!
//! The flat form is what crosses the deferred boundary, so every field must
//! survive `to_flat` / `from_flat` unchanged.

use std::collections::BTreeMap;
use std::fmt;

use slackbud_core::{ExecutionContext, Identity};
use thiserror::Error;

pub type FlatMap = BTreeMap<String, String>;

const FLAT_VERSION: &str = "1";

const K_VERSION: &str = "v";
const K_RAW: &str = "raw_text";
const K_COMMAND: &str = "command";
const K_SUB: &str = "sub_command";
const K_USER_ID: &str = "user_id";
const K_USER_NAME: &str = "user_name";
const K_ENV: &str = "environment";
const K_CONTEXT: &str = "context";
const K_RESPONSE_URL: &str = "response_url";
const K_CHANNEL: &str = "channel_id";
const K_CALLBACK: &str = "callback_id";
const P_SWITCH: &str = "switch.";
const P_ARG: &str = "arg.";
const P_CONFIRM: &str = "confirm.";

// ---------------------------------------------------------------------------
// Values
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SwitchValue {
    Str(String),
    Int(i64),
    Flag(bool),
}

impl SwitchValue {
    pub(crate) fn encode(&self) -> String {
        match self {
            SwitchValue::Str(s) => format!("str:{s}"),
            SwitchValue::Int(i) => format!("int:{i}"),
            SwitchValue::Flag(b) => format!("flag:{b}"),
        }
    }

    pub(crate) fn decode(raw: &str) -> Option<Self> {
        let (tag, body) = raw.split_once(':')?;
        match tag {
            "str" => Some(SwitchValue::Str(body.to_string())),
            "int" => body.parse().ok().map(SwitchValue::Int),
            "flag" => body.parse().ok().map(SwitchValue::Flag),
            _ => None,
        }
    }
}

impl fmt::Display for SwitchValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SwitchValue::Str(s) => f.write_str(s),
            SwitchValue::Int(i) => write!(f, "{i}"),
            SwitchValue::Flag(b) => write!(f, "{b}"),
        }
    }
}

// ---------------------------------------------------------------------------
// Invocation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Invocation {
    pub raw_text: String,
    pub command: String,
    /// `None` only for help requests.
    pub sub_command: Option<String>,
    pub switches: BTreeMap<String, SwitchValue>,
    pub args: Vec<String>,
    pub identity: Identity,
    pub environment: String,
    pub context: ExecutionContext,
    pub response_url: Option<String>,
    pub channel_id: Option<String>,
    /// Set on confirmation follow-ups.
    pub callback_id: Option<String>,
    pub confirmation_params: BTreeMap<String, String>,
}

impl Invocation {
    pub fn sub_command(&self) -> &str {
        self.sub_command.as_deref().unwrap_or("")
    }

    pub fn get(&self, key: &str) -> Option<&SwitchValue> {
        self.switches.get(key)
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        match self.switches.get(key) {
            Some(SwitchValue::Str(s)) => Some(s),
            _ => None,
        }
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        match self.switches.get(key) {
            Some(SwitchValue::Int(i)) => Some(*i),
            _ => None,
        }
    }

    pub fn flag(&self, key: &str) -> bool {
        matches!(self.switches.get(key), Some(SwitchValue::Flag(true)))
    }

    pub fn arg(&self, index: usize) -> Option<&str> {
        self.args.get(index).map(String::as_str)
    }

    pub fn confirmation_param(&self, key: &str) -> Option<&str> {
        self.confirmation_params.get(key).map(String::as_str)
    }

    /// `command.sub_command`, the identity used for deferred tasks and counters.
    pub fn task_name(&self) -> String {
        format!("{}.{}", self.command, self.sub_command())
    }

    /// Command line without the platform's slash prefix.
    pub fn command_line(&self) -> &str {
        self.raw_text.trim()
    }

    pub fn to_flat(&self) -> FlatMap {
        let mut flat = FlatMap::new();
        flat.insert(K_VERSION.into(), FLAT_VERSION.into());
        flat.insert(K_RAW.into(), self.raw_text.clone());
        flat.insert(K_COMMAND.into(), self.command.clone());
        if let Some(sub) = &self.sub_command {
            flat.insert(K_SUB.into(), sub.clone());
        }
        flat.insert(K_USER_ID.into(), self.identity.user_id.clone());
        flat.insert(K_USER_NAME.into(), self.identity.user_name.clone());
        flat.insert(K_ENV.into(), self.environment.clone());
        flat.insert(K_CONTEXT.into(), self.context.as_str().into());
        if let Some(url) = &self.response_url {
            flat.insert(K_RESPONSE_URL.into(), url.clone());
        }
        if let Some(channel) = &self.channel_id {
            flat.insert(K_CHANNEL.into(), channel.clone());
        }
        if let Some(callback) = &self.callback_id {
            flat.insert(K_CALLBACK.into(), callback.clone());
        }
        for (key, value) in &self.switches {
            flat.insert(format!("{P_SWITCH}{key}"), value.encode());
        }
        for (i, arg) in self.args.iter().enumerate() {
            flat.insert(format!("{P_ARG}{i}"), arg.clone());
        }
        for (key, value) in &self.confirmation_params {
            flat.insert(format!("{P_CONFIRM}{key}"), value.clone());
        }
        flat
    }

    pub fn from_flat(flat: &FlatMap) -> Result<Self, FlatError> {
        match flat.get(K_VERSION).map(String::as_str) {
            Some(FLAT_VERSION) => {}
            Some(other) => return Err(FlatError::Version(other.to_string())),
            None => return Err(FlatError::Missing(K_VERSION)),
        }
        let required = |key: &'static str| -> Result<String, FlatError> {
            flat.get(key).cloned().ok_or(FlatError::Missing(key))
        };

        let context = required(K_CONTEXT)?
            .parse::<ExecutionContext>()
            .map_err(|e| FlatError::Malformed(K_CONTEXT.to_string(), e))?;

        let mut inv = Invocation {
            raw_text: required(K_RAW)?,
            command: required(K_COMMAND)?,
            sub_command: flat.get(K_SUB).cloned(),
            identity: Identity::new(required(K_USER_ID)?, required(K_USER_NAME)?),
            environment: required(K_ENV)?,
            context,
            response_url: flat.get(K_RESPONSE_URL).cloned(),
            channel_id: flat.get(K_CHANNEL).cloned(),
            callback_id: flat.get(K_CALLBACK).cloned(),
            ..Default::default()
        };

        let mut args: Vec<(usize, String)> = Vec::new();
        for (key, value) in flat {
            if let Some(name) = key.strip_prefix(P_SWITCH) {
                let decoded = SwitchValue::decode(value)
                    .ok_or_else(|| FlatError::Malformed(key.clone(), value.clone()))?;
                inv.switches.insert(name.to_string(), decoded);
            } else if let Some(index) = key.strip_prefix(P_ARG) {
                let index = index
                    .parse::<usize>()
                    .map_err(|_| FlatError::Malformed(key.clone(), value.clone()))?;
                args.push((index, value.clone()));
            } else if let Some(name) = key.strip_prefix(P_CONFIRM) {
                inv.confirmation_params.insert(name.to_string(), value.clone());
            }
        }
        args.sort_by_key(|(i, _)| *i);
        for (expected, (index, _)) in args.iter().enumerate() {
            if *index != expected {
                return Err(FlatError::Malformed(format!("{P_ARG}{index}"), "gap in positional args".into()));
            }
        }
        inv.args = args.into_iter().map(|(_, v)| v).collect();
        Ok(inv)
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FlatError {
    #[error("flat invocation is missing '{0}'")]
    Missing(&'static str),
    #[error("unsupported flat invocation version '{0}'")]
    Version(String),
    #[error("malformed flat entry '{0}': {1}")]
    Malformed(String, String),
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Invocation {
        let mut inv = Invocation {
            raw_text: "cmd history -n 5 -g deploy".into(),
            command: "cmd".into(),
            sub_command: Some("history".into()),
            identity: Identity::new("U123", "asnyder"),
            environment: "prod".into(),
            context: ExecutionContext::Immediate,
            response_url: Some("https://hooks.slack.com/commands/T1/2/abc".into()),
            channel_id: Some("D5FKEN3HD".into()),
            ..Default::default()
        };
        inv.switches.insert("n".into(), SwitchValue::Int(-5));
        inv.switches.insert("g".into(), SwitchValue::Str("str:with: colons".into()));
        inv.switches.insert("v".into(), SwitchValue::Flag(true));
        inv.switches.insert("e".into(), SwitchValue::Str(String::new()));
        inv.args = vec!["first".into(), "second".into()];
        inv
    }

    #[test]
    fn test_flat_roundtrip_all_switch_types() {
        let inv = sample();
        let back = Invocation::from_flat(&inv.to_flat()).unwrap();
        assert_eq!(back, inv);
    }

    #[test]
    fn test_flat_roundtrip_confirmation_fields() {
        let mut inv = sample();
        inv.context = ExecutionContext::Deferred;
        inv.callback_id = Some("tok.sig".into());
        inv.confirmation_params.insert("choice".into(), "yes".into());
        let back = Invocation::from_flat(&inv.to_flat()).unwrap();
        assert_eq!(back, inv);
    }

    #[test]
    fn test_flat_values_are_strings() {
        let flat = sample().to_flat();
        assert_eq!(flat["switch.n"], "int:-5");
        assert_eq!(flat["switch.v"], "flag:true");
        assert_eq!(flat["arg.1"], "second");
    }

    #[test]
    fn test_flat_rejects_bad_input() {
        let mut flat = sample().to_flat();
        flat.insert("switch.n".into(), "int:five".into());
        assert!(matches!(Invocation::from_flat(&flat), Err(FlatError::Malformed(..))));

        let mut flat = sample().to_flat();
        flat.remove("command");
        assert_eq!(Invocation::from_flat(&flat), Err(FlatError::Missing("command")));

        let mut flat = sample().to_flat();
        flat.insert("v".into(), "9".into());
        assert_eq!(Invocation::from_flat(&flat), Err(FlatError::Version("9".into())));

        let mut flat = sample().to_flat();
        flat.remove("arg.0");
        assert!(Invocation::from_flat(&flat).is_err());
    }

    #[test]
    fn test_typed_accessors() {
        let inv = sample();
        assert_eq!(inv.get_int("n"), Some(-5));
        assert_eq!(inv.get_str("n"), None);
        assert!(inv.flag("v"));
        assert!(!inv.flag("missing"));
        assert_eq!(inv.task_name(), "cmd.history");
    }
}
