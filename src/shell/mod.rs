//! Line oriented command interpreter driving a [`Filesystem`](crate::filesystem::Filesystem).

mod command;
mod session;

pub use command::{Command, CommandParseError};
pub use session::{Output, ScriptSummary, Session, ShellError};
