use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Ordered permission levels. The gate check is `caller >= required`.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(rename_all = "lowercase")]
pub enum PermissionLevel {
    #[default]
    Public,
    Dev,
    Admin,
}

impl PermissionLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            PermissionLevel::Public => "public",
            PermissionLevel::Dev => "dev",
            PermissionLevel::Admin => "admin",
        }
    }

    /// True when a caller at `self` may run something requiring `required`.
    pub fn satisfies(self, required: PermissionLevel) -> bool {
        self >= required
    }
}

impl fmt::Display for PermissionLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PermissionLevel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "public" => Ok(PermissionLevel::Public),
            "dev" => Ok(PermissionLevel::Dev),
            "admin" => Ok(PermissionLevel::Admin),
            other => Err(format!("unknown permission level '{other}'")),
        }
    }
}

/// Registration-time classification of a sub-command.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunType {
    /// Runs inside the request that received it.
    Immediate,
    /// Handed to the deferred worker; the caller gets an acknowledgement.
    Deferred,
}

/// Which entry point is executing an invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ExecutionContext {
    #[default]
    #[serde(rename = "immediate-context")]
    Immediate,
    #[serde(rename = "deferred-context")]
    Deferred,
}

impl ExecutionContext {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionContext::Immediate => "immediate-context",
            ExecutionContext::Deferred => "deferred-context",
        }
    }
}

impl fmt::Display for ExecutionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExecutionContext {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "immediate-context" => Ok(ExecutionContext::Immediate),
            "deferred-context" => Ok(ExecutionContext::Deferred),
            other => Err(format!("unknown execution context '{other}'")),
        }
    }
}

/// The chat user behind an invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Identity {
    pub user_id: String,
    pub user_name: String,
}

impl Identity {
    pub fn new(user_id: impl Into<String>, user_name: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            user_name: user_name.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_permission_ordering() {
        assert!(PermissionLevel::Public < PermissionLevel::Dev);
        assert!(PermissionLevel::Dev < PermissionLevel::Admin);
        assert!(PermissionLevel::Admin.satisfies(PermissionLevel::Dev));
        assert!(PermissionLevel::Dev.satisfies(PermissionLevel::Dev));
        assert!(!PermissionLevel::Public.satisfies(PermissionLevel::Dev));
    }

    #[test]
    fn test_permission_parse() {
        assert_eq!("Admin".parse::<PermissionLevel>().unwrap(), PermissionLevel::Admin);
        assert!("root".parse::<PermissionLevel>().is_err());
    }

    #[test]
    fn test_context_tag_roundtrip() {
        for ctx in [ExecutionContext::Immediate, ExecutionContext::Deferred] {
            assert_eq!(ctx.as_str().parse::<ExecutionContext>().unwrap(), ctx);
        }
        let json = serde_json::to_string(&ExecutionContext::Deferred).unwrap();
        assert_eq!(json, "\"deferred-context\"");
    }
}
