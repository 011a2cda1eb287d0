//! Confirmation round-trips.
//!
//! A command that needs approval answers with a prompt whose attachment
//! `callback_id` is a signed, self-contained token. When the user clicks a
//! button the platform echoes that token back; correlation is purely a
//! function of the token, no pending-request table exists.
//!
//! Token layout: `base64url(json) "." base64url(hmac_sha256(secret, json))`.

use std::collections::BTreeMap;
use std::sync::Arc;

use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine as _;
use hmac::{Hmac, Mac};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use slackbud_core::{Action, ActionStyle, Attachment, BudError, ExecutionContext, Identity, SlackResponse};
use tracing::{debug, warn};

use crate::command::Command;
use crate::invocation::{Invocation, SwitchValue};
use crate::registry::CommandRegistry;

type HmacSha256 = Hmac<Sha256>;

pub const TOKEN_VERSION: u8 = 1;

/// Confirmation parameter holding the clicked action's name.
pub const PARAM_ACTION: &str = "action";
/// Confirmation parameter holding the clicked action's value.
pub const PARAM_VALUE: &str = "value";

pub const CHOICE_CONFIRM: &str = "confirm";
pub const CHOICE_CANCEL: &str = "cancel";

// ---------------------------------------------------------------------------
// Token
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfirmationToken {
    pub v: u8,
    pub cmd: String,
    pub sub: String,
    /// Issued-at, unix seconds.
    pub iat: i64,
    /// Flat-encoded switch values carried to the confirmation handler.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub switches: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub args: Vec<String>,
}

/// Signs and verifies tokens and deferred task envelopes.
#[derive(Clone)]
pub struct TokenCodec {
    secret: Arc<Vec<u8>>,
    ttl_secs: i64,
}

impl TokenCodec {
    pub fn new(secret: impl AsRef<[u8]>, ttl_secs: i64) -> Self {
        Self {
            secret: Arc::new(secret.as_ref().to_vec()),
            ttl_secs,
        }
    }

    fn mac(&self) -> Result<HmacSha256, BudError> {
        HmacSha256::new_from_slice(&self.secret).map_err(BudError::unrecoverable)
    }

    /// Hex HMAC-SHA256 of `body`.
    pub fn sign(&self, body: &[u8]) -> Result<String, BudError> {
        let mut mac = self.mac()?;
        mac.update(body);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }

    /// Constant-time check of a hex signature produced by [`TokenCodec::sign`].
    pub fn verify(&self, body: &[u8], signature: &str) -> bool {
        let Ok(expected) = hex::decode(signature) else { return false };
        let Ok(mut mac) = self.mac() else { return false };
        mac.update(body);
        mac.verify_slice(&expected).is_ok()
    }

    pub fn encode(&self, token: &ConfirmationToken) -> Result<String, BudError> {
        let json = serde_json::to_vec(token).map_err(BudError::unrecoverable)?;
        let mut mac = self.mac()?;
        mac.update(&json);
        let sig = mac.finalize().into_bytes();
        Ok(format!("{}.{}", URL_SAFE_NO_PAD.encode(&json), URL_SAFE_NO_PAD.encode(sig)))
    }

    pub fn decode(&self, raw: &str) -> Result<ConfirmationToken, BudError> {
        self.decode_at(raw, chrono::Utc::now().timestamp())
    }

    pub fn decode_at(&self, raw: &str, now: i64) -> Result<ConfirmationToken, BudError> {
        let invalid = |why: &str| BudError::InvalidConfirmationToken(why.to_string());

        let (payload, sig) = raw.trim().split_once('.').ok_or_else(|| invalid("not a token"))?;
        let json = URL_SAFE_NO_PAD.decode(payload).map_err(|_| invalid("payload encoding"))?;
        let sig = URL_SAFE_NO_PAD.decode(sig).map_err(|_| invalid("signature encoding"))?;

        let mut mac = self.mac()?;
        mac.update(&json);
        mac.verify_slice(&sig).map_err(|_| invalid("signature mismatch"))?;

        let token: ConfirmationToken =
            serde_json::from_slice(&json).map_err(|_| invalid("payload shape"))?;
        if token.v != TOKEN_VERSION {
            return Err(invalid("unsupported version"));
        }
        if self.ttl_secs > 0 && now.saturating_sub(token.iat) > self.ttl_secs {
            return Err(invalid("expired"));
        }
        Ok(token)
    }
}

// ---------------------------------------------------------------------------
// Issuing prompts
// ---------------------------------------------------------------------------

/// A prompt a handler wants to show before acting.
#[derive(Debug, Clone)]
pub struct ConfirmationPrompt {
    pub title: String,
    pub text: String,
    /// Switch keys from the original invocation to carry in the token.
    pub keep_switches: Vec<String>,
    pub keep_args: bool,
    pub actions: Vec<Action>,
}

impl ConfirmationPrompt {
    /// Prompt with the default Confirm / Cancel buttons.
    pub fn new(title: impl Into<String>, text: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            text: text.into(),
            keep_switches: Vec::new(),
            keep_args: false,
            actions: vec![
                Action::button(CHOICE_CONFIRM, "Confirm", "yes").with_style(ActionStyle::Danger),
                Action::button(CHOICE_CANCEL, "Cancel", "no"),
            ],
        }
    }

    pub fn keep_switch(mut self, key: &str) -> Self {
        self.keep_switches.push(key.to_string());
        self
    }

    pub fn keep_args(mut self) -> Self {
        self.keep_args = true;
        self
    }

    pub fn with_actions(mut self, actions: Vec<Action>) -> Self {
        self.actions = actions;
        self
    }
}

/// Handed to handlers so they can mint tokens without seeing the secret.
pub struct ConfirmationIssuer {
    codec: TokenCodec,
}

impl ConfirmationIssuer {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }

    pub fn issue(&self, inv: &Invocation, prompt: ConfirmationPrompt) -> Result<SlackResponse, BudError> {
        let switches = prompt
            .keep_switches
            .iter()
            .filter_map(|k| inv.get(k).map(|v| (k.clone(), v.encode())))
            .collect();
        let token = ConfirmationToken {
            v: TOKEN_VERSION,
            cmd: inv.command.clone(),
            sub: inv.sub_command().to_string(),
            iat: chrono::Utc::now().timestamp(),
            switches,
            args: if prompt.keep_args { inv.args.clone() } else { Vec::new() },
        };
        let callback_id = self.codec.encode(&token)?;
        debug!(command = %token.cmd, sub_command = %token.sub, "Issued confirmation prompt");

        Ok(SlackResponse {
            attachments: vec![Attachment {
                title: Some(prompt.title),
                text: prompt.text,
                // Clients without button support show this instead.
                fallback: Some(format!("Confirm {} {}", token.cmd, token.sub)),
                color: Some(slackbud_core::response::COLOR_STANDARD.to_string()),
                mrkdwn_in: vec!["text".to_string()],
                callback_id: Some(callback_id),
                actions: prompt.actions,
            }],
            ..Default::default()
        })
    }
}

// ---------------------------------------------------------------------------
// Correlating follow-ups
// ---------------------------------------------------------------------------

/// The user's follow-up action as decoded from the platform payload.
#[derive(Debug, Clone, Default)]
pub struct ConfirmationPayload {
    pub callback_id: String,
    pub identity: Identity,
    pub environment: String,
    pub action_name: String,
    pub action_value: String,
    pub response_url: Option<String>,
    pub channel_id: Option<String>,
}

pub struct ConfirmationCorrelator {
    codec: TokenCodec,
}

impl ConfirmationCorrelator {
    pub fn new(codec: TokenCodec) -> Self {
        Self { codec }
    }

    /// Map a follow-up back to its command and rebuild the invocation.
    ///
    /// Every failure is terminal and reported as `InvalidConfirmationToken`.
    pub fn correlate(
        &self,
        registry: &CommandRegistry,
        payload: &ConfirmationPayload,
    ) -> Result<(Arc<dyn Command>, Invocation), BudError> {
        if payload.callback_id.trim().is_empty() {
            return Err(BudError::InvalidConfirmationToken("empty".into()));
        }
        let token = self.codec.decode(&payload.callback_id)?;

        let command = registry.resolve(&token.cmd).map_err(|_| {
            warn!(command = %token.cmd, "Confirmation names an unregistered command");
            BudError::InvalidConfirmationToken(format!("unregistered command '{}'", token.cmd))
        })?;
        if command.descriptor().find_sub_command(&token.sub).is_none() {
            return Err(BudError::InvalidConfirmationToken(format!(
                "unknown sub-command '{}'",
                token.sub
            )));
        }

        let mut switches = BTreeMap::new();
        for (key, encoded) in &token.switches {
            let value = SwitchValue::decode(encoded)
                .ok_or_else(|| BudError::InvalidConfirmationToken(format!("switch '{key}'")))?;
            switches.insert(key.clone(), value);
        }

        let mut confirmation_params = BTreeMap::new();
        confirmation_params.insert(PARAM_ACTION.to_string(), payload.action_name.clone());
        confirmation_params.insert(PARAM_VALUE.to_string(), payload.action_value.clone());

        let inv = Invocation {
            raw_text: format!("{} {}", token.cmd, token.sub),
            command: token.cmd.clone(),
            sub_command: Some(token.sub.clone()),
            switches,
            args: token.args.clone(),
            identity: payload.identity.clone(),
            environment: payload.environment.clone(),
            context: ExecutionContext::Immediate,
            response_url: payload.response_url.clone(),
            channel_id: payload.channel_id.clone(),
            callback_id: Some(payload.callback_id.clone()),
            confirmation_params,
        };
        Ok((command, inv))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn codec() -> TokenCodec {
        TokenCodec::new("test-secret", 900)
    }

    fn token() -> ConfirmationToken {
        ConfirmationToken {
            v: TOKEN_VERSION,
            cmd: "user".into(),
            sub: "add".into(),
            iat: 1_000,
            switches: BTreeMap::from([("n".to_string(), "int:3".to_string())]),
            args: vec!["U42".into(), "dev".into()],
        }
    }

    #[test]
    fn test_token_roundtrip() {
        let raw = codec().encode(&token()).unwrap();
        assert_eq!(codec().decode_at(&raw, 1_010).unwrap(), token());
    }

    #[test]
    fn test_empty_and_truncated_tokens_rejected() {
        let raw = codec().encode(&token()).unwrap();
        for bad in ["", ".", "abc", &raw[..raw.len() - 4], &raw[3..]] {
            assert!(
                matches!(codec().decode_at(bad, 1_010), Err(BudError::InvalidConfirmationToken(_))),
                "accepted {bad:?}"
            );
        }
    }

    #[test]
    fn test_tampered_token_rejected() {
        let raw = codec().encode(&token()).unwrap();
        let (_, sig) = raw.split_once('.').unwrap();
        let mut forged = token();
        forged.cmd = "admin".into();
        let json = serde_json::to_vec(&forged).unwrap();
        let tampered = format!("{}.{}", URL_SAFE_NO_PAD.encode(json), sig);
        assert!(matches!(
            codec().decode_at(&tampered, 1_010),
            Err(BudError::InvalidConfirmationToken(_))
        ));
    }

    #[test]
    fn test_other_secret_rejected() {
        let raw = TokenCodec::new("other", 900).encode(&token()).unwrap();
        assert!(codec().decode_at(&raw, 1_010).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let raw = codec().encode(&token()).unwrap();
        assert!(codec().decode_at(&raw, 1_000 + 900).is_ok());
        assert!(codec().decode_at(&raw, 1_000 + 901).is_err());
        // ttl 0 disables expiry
        let forever = TokenCodec::new("test-secret", 0);
        assert!(forever.decode_at(&raw, i64::MAX).is_ok());
    }

    #[test]
    fn test_wrong_version_rejected() {
        let mut t = token();
        t.v = 2;
        let raw = codec().encode(&t).unwrap();
        assert!(codec().decode_at(&raw, 1_010).is_err());
    }

    #[test]
    fn test_envelope_signature() {
        let sig = codec().sign(b"{\"task\":\"s3stats.summary\"}").unwrap();
        assert!(codec().verify(b"{\"task\":\"s3stats.summary\"}", &sig));
        assert!(!codec().verify(b"{\"task\":\"user.add\"}", &sig));
        assert!(!codec().verify(b"anything", "zz"));
    }

    #[test]
    fn test_prompt_carries_token_and_buttons() {
        let issuer = ConfirmationIssuer::new(codec());
        let mut inv = Invocation {
            command: "user".into(),
            sub_command: Some("add".into()),
            args: vec!["U42".into()],
            ..Default::default()
        };
        inv.switches.insert("n".into(), SwitchValue::Int(3));
        let resp = issuer
            .issue(&inv, ConfirmationPrompt::new("Add user", "Add U42?").keep_args().keep_switch("n"))
            .unwrap();
        let attachment = &resp.attachments[0];
        assert_eq!(attachment.actions.len(), 2);
        let decoded = codec().decode(attachment.callback_id.as_deref().unwrap()).unwrap();
        assert_eq!(decoded.cmd, "user");
        assert_eq!(decoded.sub, "add");
        assert_eq!(decoded.args, vec!["U42"]);
        assert_eq!(decoded.switches["n"], "int:3");
    }

    fn registry() -> CommandRegistry {
        let mut registry = CommandRegistry::new();
        registry
            .register(Arc::new(crate::handlers::VersionCommand::new("1.0.0")))
            .unwrap();
        registry
    }

    fn follow_up(cmd: &str, sub: &str) -> ConfirmationPayload {
        let token = ConfirmationToken {
            v: TOKEN_VERSION,
            cmd: cmd.into(),
            sub: sub.into(),
            iat: chrono::Utc::now().timestamp(),
            switches: BTreeMap::from([("n".to_string(), "int:3".to_string())]),
            args: vec!["U42".into()],
        };
        ConfirmationPayload {
            callback_id: codec().encode(&token).unwrap(),
            identity: Identity::new("U1", "ana"),
            environment: "dev".into(),
            action_name: CHOICE_CONFIRM.into(),
            action_value: "yes".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_correlate_rebuilds_invocation() {
        let registry = registry();
        let payload = follow_up("version", "show");
        let (command, inv) = ConfirmationCorrelator::new(codec()).correlate(&registry, &payload).unwrap();
        assert_eq!(command.descriptor().name, "version");
        assert_eq!(inv.sub_command(), "show");
        assert_eq!(inv.get_int("n"), Some(3));
        assert_eq!(inv.args, vec!["U42"]);
        assert_eq!(inv.identity.user_id, "U1");
        assert_eq!(inv.confirmation_param(PARAM_ACTION), Some(CHOICE_CONFIRM));
        assert_eq!(inv.callback_id.as_deref(), Some(payload.callback_id.as_str()));
    }

    #[test]
    fn test_correlate_rejects_unregistered_command() {
        let payload = follow_up("ghost", "show");
        let err = ConfirmationCorrelator::new(codec())
            .correlate(&CommandRegistry::new(), &payload)
            .err()
            .unwrap();
        assert!(matches!(err, BudError::InvalidConfirmationToken(ref why) if why.contains("ghost")));
    }

    #[test]
    fn test_correlate_rejects_unknown_sub_command() {
        let payload = follow_up("version", "nope");
        let err = ConfirmationCorrelator::new(codec()).correlate(&registry(), &payload).err().unwrap();
        assert!(matches!(err, BudError::InvalidConfirmationToken(ref why) if why.contains("nope")));
    }

    #[test]
    fn test_correlate_rejects_blank_callback_id() {
        let correlator = ConfirmationCorrelator::new(codec());
        for blank in ["", "   "] {
            let payload = ConfirmationPayload {
                callback_id: blank.into(),
                ..follow_up("version", "show")
            };
            assert!(matches!(
                correlator.correlate(&registry(), &payload),
                Err(BudError::InvalidConfirmationToken(_))
            ));
        }
    }
}
