use std::io;

use schoolsync_config::ConfigError;
use schoolsync_core::CoreError;
use thiserror::Error;

/// Failures while wiring the application together at startup.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

/// Fatal errors of the command-line front end.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    App(#[from] AppError),
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Input error: {0}")]
    Input(#[from] dialoguer::Error),
    #[error(transparent)]
    Command(#[from] CommandError),
}

/// Errors raised by a single shell command. Most are reported and the shell
/// carries on.
#[derive(Debug, Error)]
pub enum CommandError {
    #[error("{0}")]
    InvalidArguments(String),
    #[error("{0}")]
    Message(String),
    #[error(transparent)]
    Io(#[from] io::Error),
    #[error(transparent)]
    Core(#[from] CoreError),
    #[error(transparent)]
    App(#[from] AppError),
    #[error(transparent)]
    Dialoguer(#[from] dialoguer::Error),
    #[error("exit requested")]
    ExitRequested,
}
