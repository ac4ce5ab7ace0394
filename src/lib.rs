#![doc(test(attr(deny(warnings))))]

//! schoolsync keeps a local copy of the school administration data set:
//! periodic and manual snapshots of the remote store, a staleness check
//! against it, and restore from a saved snapshot.

pub mod cli;
pub mod context;
pub mod errors;
pub mod notify;
pub mod runtime;
pub mod utils;

pub use context::{
    BackupContext, ReloadHandle, MAX_AUTO_SAVE_INTERVAL, MIN_AUTO_SAVE_INTERVAL,
};
pub use errors::{AppError, CliError, CommandError};
pub use notify::{Notice, NoticeLevel, Notifier};
pub use runtime::{AppServices, RuntimeEnvironment};

use std::sync::Once;

static INIT_TRACING: Once = Once::new();

/// Initializes global tracing and emits a startup info log.
pub fn init() {
    INIT_TRACING.call_once(|| {
        utils::init_tracing();
        tracing::info!("schoolsync tracing initialized.");
    });
}
