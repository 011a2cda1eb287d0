//! Built-in commands.
//!
//! Each command is a struct implementing [`Command`](crate::command::Command)
//! that owns its descriptor and whatever collaborators it reads from.
mod cmd;
mod help;
mod s3stats;
mod user;
mod version;

pub use cmd::CmdCommand;
pub use help::HelpCommand;
pub use s3stats::S3StatsCommand;
pub use user::UserCommand;
pub use version::VersionCommand;
