use std::fmt;

use schoolsync_domain::{SnapshotError, TableName};
use thiserror::Error;

use crate::RemoteError;

/// Remote store call that failed during export or import.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoteOperation {
    Select,
    Delete,
    Insert,
}

impl fmt::Display for RemoteOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            RemoteOperation::Select => "select",
            RemoteOperation::Delete => "delete",
            RemoteOperation::Insert => "insert",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Remote {operation} on `{table}` failed: {source}")]
    Remote {
        table: TableName,
        operation: RemoteOperation,
        #[source]
        source: RemoteError,
    },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serde(String),
    #[error("Invalid snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("Storage quota exceeded: {needed} bytes requested, {quota} allowed")]
    QuotaExceeded { needed: usize, quota: usize },
    #[error("Storage error: {0}")]
    Storage(String),
}

impl From<serde_json::Error> for CoreError {
    fn from(err: serde_json::Error) -> Self {
        CoreError::Serde(err.to_string())
    }
}
