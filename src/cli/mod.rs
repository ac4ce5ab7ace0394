//! Command-line front end over [`crate::BackupContext`].

mod commands;
pub mod output;
pub mod prompt;
pub mod registry;
mod shell;
pub mod shell_context;

pub use prompt::PromptDialog;
pub use shell::run_cli;
pub use shell_context::{CliMode, ShellContext};
