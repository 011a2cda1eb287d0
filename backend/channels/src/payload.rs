//! Slack wire types and their mapping onto dispatcher inputs.

use std::collections::HashMap;

use serde::Deserialize;
use slackbud_commands::{ConfirmationPayload, RawInvocation};
use slackbud_config::schema::SlackConfig;
use slackbud_core::Identity;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum PayloadError {
    #[error("missing form field '{0}'")]
    MissingField(&'static str),
    #[error("interactive payload is not valid JSON: {0}")]
    BadJson(String),
    #[error("interactive payload carries no action")]
    NoAction,
}

// ---------------------------------------------------------------------------
// Slash commands
// ---------------------------------------------------------------------------

/// The fields of a slash-command POST that SlackBud reads.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SlashCommandForm {
    pub command: String,
    pub text: String,
    pub user_id: String,
    pub user_name: String,
    pub channel_id: Option<String>,
    pub response_url: Option<String>,
}

impl SlashCommandForm {
    pub fn decode(body: &[u8]) -> Result<Self, PayloadError> {
        let mut fields = form_fields(body);
        let user_id = fields.remove("user_id").ok_or(PayloadError::MissingField("user_id"))?;
        Ok(Self {
            command: fields.remove("command").unwrap_or_default(),
            text: fields.remove("text").unwrap_or_default(),
            user_name: fields.remove("user_name").unwrap_or_default(),
            user_id,
            channel_id: fields.remove("channel_id").filter(|s| !s.is_empty()),
            response_url: fields.remove("response_url").filter(|s| !s.is_empty()),
        })
    }

    /// The environment is chosen by which slash command was typed.
    pub fn into_raw(self, slack: &SlackConfig) -> RawInvocation {
        let environment = slack.environment_for(&self.command).to_string();
        RawInvocation {
            text: self.text,
            identity: Identity::new(self.user_id, self.user_name),
            environment,
            response_url: self.response_url,
            channel_id: self.channel_id,
        }
    }
}

// ---------------------------------------------------------------------------
// Interactive messages
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct InteractivePayload {
    #[serde(default)]
    callback_id: String,
    user: SlackUser,
    #[serde(default)]
    actions: Vec<SlackAction>,
    response_url: Option<String>,
    channel: Option<SlackChannel>,
}

#[derive(Debug, Deserialize)]
struct SlackUser {
    id: String,
    // Interactive payloads use `name`, newer ones `username`.
    #[serde(alias = "username", default)]
    name: String,
}

#[derive(Debug, Deserialize)]
struct SlackAction {
    #[serde(default)]
    name: String,
    #[serde(default)]
    value: String,
}

#[derive(Debug, Deserialize)]
struct SlackChannel {
    id: String,
}

/// Decode the `payload=<json>` form Slack posts when a button is clicked.
pub fn decode_interaction(body: &[u8], slack: &SlackConfig) -> Result<ConfirmationPayload, PayloadError> {
    let mut fields = form_fields(body);
    let json = fields.remove("payload").ok_or(PayloadError::MissingField("payload"))?;
    let payload: InteractivePayload =
        serde_json::from_str(&json).map_err(|e| PayloadError::BadJson(e.to_string()))?;
    let action = payload.actions.into_iter().next().ok_or(PayloadError::NoAction)?;

    Ok(ConfirmationPayload {
        callback_id: payload.callback_id,
        identity: Identity::new(payload.user.id, payload.user.name),
        environment: slack.default_environment.clone(),
        action_name: action.name,
        action_value: action.value,
        response_url: payload.response_url.filter(|s| !s.is_empty()),
        channel_id: payload.channel.map(|c| c.id),
    })
}

fn form_fields(body: &[u8]) -> HashMap<String, String> {
    url::form_urlencoded::parse(body).into_owned().collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slack() -> SlackConfig {
        let mut cfg = SlackConfig::default();
        cfg.environments.insert("/bud-prod".into(), "prod".into());
        cfg
    }

    #[test]
    fn decodes_slash_command_form() {
        let body = b"command=%2Fbud-prod&text=cmd+history+-g+%22s3+stats%22&user_id=U42&user_name=ana\
&channel_id=C1&response_url=https%3A%2F%2Fhooks.slack.com%2Fcommands%2F1";
        let form = SlashCommandForm::decode(body).unwrap();
        assert_eq!(form.text, "cmd history -g \"s3 stats\"");
        assert_eq!(form.response_url.as_deref(), Some("https://hooks.slack.com/commands/1"));

        let raw = form.into_raw(&slack());
        assert_eq!(raw.environment, "prod");
        assert_eq!(raw.identity, Identity::new("U42", "ana"));
        assert_eq!(raw.channel_id.as_deref(), Some("C1"));
    }

    #[test]
    fn unmapped_command_uses_default_environment() {
        let form = SlashCommandForm::decode(b"command=%2Fbud&text=help&user_id=U1").unwrap();
        assert_eq!(form.into_raw(&slack()).environment, "dev");
    }

    #[test]
    fn slash_command_needs_user() {
        assert_eq!(
            SlashCommandForm::decode(b"text=help").unwrap_err(),
            PayloadError::MissingField("user_id")
        );
    }

    #[test]
    fn decodes_interaction() {
        let json = serde_json::json!({
            "callback_id": "tok.sig",
            "user": {"id": "U9", "name": "root"},
            "actions": [{"name": "confirm", "value": "yes", "type": "button"}],
            "response_url": "https://hooks.slack.com/actions/1",
            "channel": {"id": "C7", "name": "ops"}
        });
        let body: String = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("payload", &json.to_string())
            .finish();

        let payload = decode_interaction(body.as_bytes(), &slack()).unwrap();
        assert_eq!(payload.callback_id, "tok.sig");
        assert_eq!(payload.identity.user_id, "U9");
        assert_eq!(payload.action_name, "confirm");
        assert_eq!(payload.action_value, "yes");
        assert_eq!(payload.channel_id.as_deref(), Some("C7"));
        assert_eq!(payload.environment, "dev");
    }

    #[test]
    fn interaction_without_action_is_rejected() {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("payload", r#"{"callback_id":"t","user":{"id":"U1"}}"#)
            .finish();
        assert_eq!(decode_interaction(body.as_bytes(), &slack()).unwrap_err(), PayloadError::NoAction);
    }
}
