//! schoolsync-domain
//!
//! Data model shared by the backup subsystem: the tracked table set, the
//! point-in-time snapshot of those tables and the derived sync status.
//! No I/O, no async, no logging.

pub mod error;
pub mod snapshot;
pub mod sync_status;
pub mod table;

pub use error::SnapshotError;
pub use snapshot::{Row, Snapshot, SNAPSHOT_FORMAT_VERSION};
pub use sync_status::{SyncStatus, TableChange, NO_LOCAL_BACKUP_SUMMARY, SYNCHRONIZED_SUMMARY};
pub use table::TableName;
