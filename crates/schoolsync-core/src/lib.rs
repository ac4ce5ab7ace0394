//! schoolsync-core
//!
//! Backup services for the school administration data set.
//! Depends on schoolsync-domain. No terminal I/O and no concrete storage:
//! the remote store and the local storage backend are injected traits.

pub mod backup_service;
pub mod error;
pub mod outcome;
pub mod remote;
pub mod storage;
pub mod time;
pub mod transfer;


pub use backup_service::{BackupService, SyncPolicy, MAX_SYNC_TOLERANCE_SECS};
pub use error::{CoreError, RemoteOperation};
pub use outcome::{Absence, Outcome};
pub use remote::{MemoryRemoteStore, RemoteError, RemoteStore};
pub use storage::{BackendKind, SavedLocation, Selection, StorageBackend, AUTO_BACKUP_SLOT};
pub use time::{Clock, SystemClock};
pub use transfer::{ImportReport, SnapshotTransfer};
