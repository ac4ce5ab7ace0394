use chrono::{DateTime, Duration, Utc};
use serde::Serialize;

use crate::{Snapshot, TableName};

pub const SYNCHRONIZED_SUMMARY: &str = "Local backup is synchronized with the remote store";
pub const NO_LOCAL_BACKUP_SUMMARY: &str = "No local backup found";

/// Row-count difference for one table between two snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct TableChange {
    pub table: TableName,
    pub previous: usize,
    pub current: usize,
}

/// Result of comparing the last local backup with the remote store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncStatus {
    pub has_changes: bool,
    pub summary: String,
    pub changes: Vec<TableChange>,
    pub checked_at: DateTime<Utc>,
}

impl SyncStatus {
    pub fn no_local_backup(checked_at: DateTime<Utc>) -> Self {
        Self {
            has_changes: true,
            summary: NO_LOCAL_BACKUP_SUMMARY.to_string(),
            changes: Vec::new(),
            checked_at,
        }
    }

    /// Compares `stored` against `fresh`. Row counts must match per table and
    /// the two timestamps may be at most `tolerance` apart.
    pub fn compare(
        stored: &Snapshot,
        fresh: &Snapshot,
        tolerance: Duration,
        checked_at: DateTime<Utc>,
    ) -> Self {
        let changes: Vec<TableChange> = TableName::ALL
            .into_iter()
            .filter_map(|table| {
                let previous = stored.row_count(table);
                let current = fresh.row_count(table);
                (previous != current).then_some(TableChange {
                    table,
                    previous,
                    current,
                })
            })
            .collect();

        let delta = fresh.timestamp() - stored.timestamp();
        let drift = if delta < Duration::zero() { -delta } else { delta };
        let stale = drift > tolerance;

        let mut lines: Vec<String> = changes
            .iter()
            .map(|change| format!("{}: {} → {}", change.table, change.previous, change.current))
            .collect();
        if stale && lines.is_empty() {
            lines.push(format!("last backup is {} old", describe_age(drift)));
        }
        let summary = if lines.is_empty() {
            SYNCHRONIZED_SUMMARY.to_string()
        } else {
            lines.join(", ")
        };

        Self {
            has_changes: stale || !changes.is_empty(),
            summary,
            changes,
            checked_at,
        }
    }
}

fn describe_age(age: Duration) -> String {
    let minutes = age.num_minutes();
    if minutes < 1 {
        format!("{}s", age.num_seconds())
    } else if minutes < 120 {
        format!("{minutes} min")
    } else {
        format!("{} h", age.num_hours())
    }
}
