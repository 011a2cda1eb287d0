//! Config redaction for `check-config` output and startup logs.

use serde_json::Value;

use crate::schema::SlackBudConfig;

const SENSITIVE_KEYS: &[&str] = &["signing_secret", "secret", "token", "password", "bot_token"];

fn is_sensitive_key(key: &str) -> bool {
    SENSITIVE_KEYS.iter().any(|k| k.eq_ignore_ascii_case(key))
}

/// Replace every sensitive string leaf with `"***"`.
pub fn redact(value: &Value) -> Value {
    redact_under(value, "")
}

fn redact_under(value: &Value, key: &str) -> Value {
    match value {
        Value::String(s) if is_sensitive_key(key) && !s.is_empty() => Value::String("***".to_string()),
        Value::Array(items) => Value::Array(items.iter().map(|v| redact_under(v, key)).collect()),
        Value::Object(map) => Value::Object(map.iter().map(|(k, v)| (k.clone(), redact_under(v, k))).collect()),
        other => other.clone(),
    }
}

/// The effective config as JSON, safe to print.
pub fn redacted_snapshot(config: &SlackBudConfig) -> Value {
    serde_json::to_value(config).map(|v| redact(&v)).unwrap_or(Value::Null)
}
