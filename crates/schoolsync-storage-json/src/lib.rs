//! schoolsync-storage-json
//!
//! JSON persistence for snapshots: the desktop filesystem backend, the
//! browser-style local-store backend, and a directory-backed remote store.

pub mod dialog;
pub mod fs_backend;
mod fs_util;
pub mod kv;
pub mod local_store;
pub mod remote_dir;

pub use dialog::{FileDialog, ScriptedDialog};
pub use fs_backend::{ArchiveInfo, FilesystemBackend, DEFAULT_RETENTION};
pub use kv::{FileKeyValueStore, KeyValueStore, MemoryKeyValueStore, DEFAULT_QUOTA_BYTES};
pub use local_store::LocalStoreBackend;
pub use remote_dir::DirectoryRemoteStore;

use chrono::NaiveDate;

/// File name offered when the user saves a backup by hand.
pub fn suggested_file_name(date: NaiveDate) -> String {
    format!("school-backup-{}.json", date.format("%Y-%m-%d"))
}
