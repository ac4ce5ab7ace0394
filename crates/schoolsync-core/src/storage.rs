use std::{fmt, path::PathBuf};

use async_trait::async_trait;
use schoolsync_domain::Snapshot;

use crate::CoreError;

/// Named slot written by periodic saves.
pub const AUTO_BACKUP_SLOT: &str = "auto-backup";

/// Concrete storage backend selected at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    Filesystem,
    LocalStore,
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BackendKind::Filesystem => "filesystem",
            BackendKind::LocalStore => "local-store",
        };
        f.write_str(label)
    }
}

/// Where a snapshot ended up after a successful save.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SavedLocation {
    File(PathBuf),
    StoreKey(String),
    Download(PathBuf),
}

impl fmt::Display for SavedLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SavedLocation::File(path) => write!(f, "{}", path.display()),
            SavedLocation::StoreKey(key) => write!(f, "local store key `{key}`"),
            SavedLocation::Download(path) => write!(f, "download {}", path.display()),
        }
    }
}

/// Result of an operation where the user picks the destination or source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selection<T> {
    Chosen(T),
    Cancelled,
}

impl<T> Selection<T> {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Selection::Cancelled)
    }
}

/// Abstraction over the places a snapshot can be persisted locally.
///
/// Implementations report every failure as an `Err` value; none of them
/// panic across this boundary.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    fn kind(&self) -> BackendKind;

    async fn save_named(&self, name: &str, snapshot: &Snapshot)
        -> Result<SavedLocation, CoreError>;

    /// Returns `Ok(None)` when nothing was ever saved under `name`.
    async fn load_named(&self, name: &str) -> Result<Option<Snapshot>, CoreError>;

    async fn save_interactive(
        &self,
        snapshot: &Snapshot,
    ) -> Result<Selection<SavedLocation>, CoreError>;

    async fn load_interactive(&self) -> Result<Selection<Snapshot>, CoreError>;
}
