use thiserror::Error;

/// Text shown in chat for any internal failure.
pub const GENERIC_FAILURE: &str = "An error occurred. Please check logs.";

const DENIED: &str = "You do not have permission to run this command.";
const EXPIRED: &str = "This request has expired or is invalid. Please run the command again.";

/// Whether an error may be explained to the chat user.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Disposition {
    UserFacing,
    Internal,
}

/// Every failure that can reach the dispatcher boundary.
#[derive(Debug, Error)]
pub enum BudError {
    #[error("The command '{0}' is invalid. Please enter a valid command...")]
    UnknownCommand(String),

    #[error("Unknown sub-command '{sub_command}' for '{command}'. Valid sub-commands: {}", .available.join(", "))]
    UnknownSubCommand {
        command: String,
        sub_command: String,
        available: Vec<String>,
    },

    #[error("Unknown switch '{0}'.")]
    UnknownSwitch(String),

    #[error("Switch '{switch}' expects a value of type {expected}, got '{value}'.")]
    TypeMismatch {
        switch: String,
        expected: String,
        value: String,
    },

    #[error("Missing required switch(es): {}", .0.join(", "))]
    MissingRequiredSwitch(Vec<String>),

    #[error("permission denied")]
    PermissionDenied,

    /// Detail is for logs only.
    #[error("invalid confirmation token: {0}")]
    InvalidConfirmationToken(String),

    /// A message a handler wants shown verbatim.
    #[error("{0}")]
    User(String),

    #[error("handler failed: {0:#}")]
    Handler(#[from] anyhow::Error),

    #[error("unrecoverable: {0}")]
    Unrecoverable(String),
}

impl BudError {
    pub fn user(message: impl Into<String>) -> Self {
        BudError::User(message.into())
    }

    pub fn unrecoverable(detail: impl std::fmt::Display) -> Self {
        BudError::Unrecoverable(detail.to_string())
    }

    pub fn disposition(&self) -> Disposition {
        match self {
            BudError::Handler(_) | BudError::Unrecoverable(_) => Disposition::Internal,
            _ => Disposition::UserFacing,
        }
    }

    /// Snake-case kind used as a structured log field.
    pub fn kind(&self) -> &'static str {
        match self {
            BudError::UnknownCommand(_) => "unknown_command",
            BudError::UnknownSubCommand { .. } => "unknown_sub_command",
            BudError::UnknownSwitch(_) => "unknown_switch",
            BudError::TypeMismatch { .. } => "type_mismatch",
            BudError::MissingRequiredSwitch(_) => "missing_required_switch",
            BudError::PermissionDenied => "permission_denied",
            BudError::InvalidConfirmationToken(_) => "invalid_confirmation_token",
            BudError::User(_) => "user",
            BudError::Handler(_) => "handler_error",
            BudError::Unrecoverable(_) => "unrecoverable",
        }
    }

    /// Text that is safe to post to the chat surface.
    pub fn user_message(&self) -> String {
        match self {
            BudError::PermissionDenied => DENIED.to_string(),
            BudError::InvalidConfirmationToken(_) => EXPIRED.to_string(),
            BudError::Handler(_) | BudError::Unrecoverable(_) => GENERIC_FAILURE.to_string(),
            other => other.to_string(),
        }
    }
}
