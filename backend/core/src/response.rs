//! Structured chat responses.
//!
//! Shapes follow Slack's legacy message attachments, which is what both the
//! slash-command reply and the `response_url` POST accept.
use serde::{Deserialize, Serialize};

pub const COLOR_STANDARD: &str = "#3AA3E3";
pub const COLOR_ERROR: &str = "#ff3d3d";
pub const COLOR_ACK: &str = "#a0a0a0";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    /// Only visible to the invoker.
    #[default]
    Ephemeral,
    InChannel,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionStyle {
    Primary,
    Danger,
}

/// An interactive button on an attachment.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Action {
    pub name: String,
    pub text: String,
    #[serde(rename = "type")]
    pub action_type: String,
    pub value: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub style: Option<ActionStyle>,
}

impl Action {
    pub fn button(name: impl Into<String>, text: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            text: text.into(),
            action_type: "button".to_string(),
            value: value.into(),
            style: None,
        }
    }

    pub fn with_style(mut self, style: ActionStyle) -> Self {
        self.style = Some(style);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Attachment {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub mrkdwn_in: Vec<String>,
    /// Echoed back by the platform when an action on this attachment is used.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub callback_id: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct SlackResponse {
    pub response_type: ResponseType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
    /// Replace the message that carried the clicked button.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub replace_original: bool,
}

impl SlackResponse {
    /// Title and body text, the shape every command answers with.
    pub fn standard(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self::single(Attachment {
            title: Some(title.into()),
            text: text.into(),
            color: Some(COLOR_STANDARD.to_string()),
            mrkdwn_in: vec!["text".to_string()],
            ..Default::default()
        })
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::single(Attachment {
            text: text.into(),
            color: Some(COLOR_ERROR.to_string()),
            mrkdwn_in: vec!["text".to_string()],
            ..Default::default()
        })
    }

    /// Returned right away when work has been handed to the deferred worker.
    pub fn acknowledgement(text: impl Into<String>) -> Self {
        Self::single(Attachment {
            text: text.into(),
            color: Some(COLOR_ACK.to_string()),
            mrkdwn_in: vec!["text".to_string()],
            ..Default::default()
        })
    }

    fn single(attachment: Attachment) -> Self {
        Self {
            attachments: vec![attachment],
            ..Default::default()
        }
    }

    pub fn in_channel(mut self) -> Self {
        self.response_type = ResponseType::InChannel;
        self
    }

    pub fn replacing_original(mut self) -> Self {
        self.replace_original = true;
        self
    }

    pub fn is_error(&self) -> bool {
        self.attachments
            .iter()
            .any(|a| a.color.as_deref() == Some(COLOR_ERROR))
    }

    pub fn is_acknowledgement(&self) -> bool {
        self.attachments
            .iter()
            .any(|a| a.color.as_deref() == Some(COLOR_ACK))
    }

    pub fn title(&self) -> Option<&str> {
        self.attachments.first().and_then(|a| a.title.as_deref())
    }

    /// Body text of the first attachment, or the top-level text.
    pub fn body(&self) -> &str {
        self.attachments
            .first()
            .map(|a| a.text.as_str())
            .or(self.text.as_deref())
            .unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_is_distinguishable() {
        assert!(SlackResponse::error("nope").is_error());
        assert!(!SlackResponse::standard("t", "ok").is_error());
        assert!(!SlackResponse::acknowledgement("working").is_error());
    }

    #[test]
    fn test_wire_shape() {
        let json = serde_json::to_value(SlackResponse::standard("History", "/run cmd")).unwrap();
        assert_eq!(json["response_type"], "ephemeral");
        assert_eq!(json["attachments"][0]["title"], "History");
        assert_eq!(json["attachments"][0]["mrkdwn_in"][0], "text");
        assert!(json.get("replace_original").is_none());
        assert!(json["attachments"][0].get("actions").is_none());
    }

    #[test]
    fn test_button_wire_shape() {
        let action = Action::button("confirm", "Confirm", "yes").with_style(ActionStyle::Danger);
        let json = serde_json::to_value(action).unwrap();
        assert_eq!(json["type"], "button");
        assert_eq!(json["style"], "danger");
    }
}
