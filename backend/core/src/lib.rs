pub mod error;
pub mod response;
pub mod types;

pub use error::{BudError, Disposition, GENERIC_FAILURE};
pub use response::{Action, ActionStyle, Attachment, ResponseType, SlackResponse};
pub use types::{ExecutionContext, Identity, PermissionLevel, RunType};
