//! Log Redaction Layer
//!
//! Scrubs Slack tokens, Slack webhook and response URLs, and bearer tokens
//! from strings prior to logging.

use std::sync::LazyLock;

use regex::Regex;

static SLACK_TOKEN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"xox[abprs]-[A-Za-z0-9-]+").expect("slack token pattern"));
static SLACK_HOOK_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"https://hooks\.slack\.com/[A-Za-z0-9/_\-%.]+").expect("slack hook pattern")
});
static BEARER_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Bearer\s+[a-zA-Z0-9\-\._~+/]+=*").expect("bearer pattern"));

/// Redacts sensitive patterns in a string.
pub fn redact_sensitive_data(input: &str) -> String {
    let redacted = SLACK_TOKEN_RE.replace_all(input, "[REDACTED_TOKEN]");
    let redacted = SLACK_HOOK_RE.replace_all(&redacted, "https://hooks.slack.com/[REDACTED]");
    BEARER_RE.replace_all(&redacted, "Bearer [REDACTED_TOKEN]").into_owned()
}
