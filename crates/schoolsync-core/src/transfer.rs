use std::{collections::BTreeMap, sync::Arc};

use schoolsync_domain::{Snapshot, TableName};
use tracing::{debug, info};

use crate::{Clock, CoreError, RemoteOperation, RemoteStore};

/// Tables touched by an import.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub written: Vec<(TableName, usize)>,
    pub skipped: Vec<TableName>,
}

impl ImportReport {
    pub fn rows_written(&self) -> usize {
        self.written.iter().map(|(_, count)| count).sum()
    }
}

/// Moves whole snapshots between the remote store and memory.
#[derive(Clone)]
pub struct SnapshotTransfer {
    remote: Arc<dyn RemoteStore>,
    clock: Arc<dyn Clock>,
}

impl SnapshotTransfer {
    pub fn new(remote: Arc<dyn RemoteStore>, clock: Arc<dyn Clock>) -> Self {
        Self { remote, clock }
    }

    /// Reads every tracked table. The first failing read aborts the export;
    /// no partial snapshot is ever returned.
    pub async fn export_all(&self) -> Result<Snapshot, CoreError> {
        let mut tables = BTreeMap::new();
        for table in TableName::ALL {
            let rows = self
                .remote
                .select_all(table)
                .await
                .map_err(|source| CoreError::Remote {
                    table,
                    operation: RemoteOperation::Select,
                    source,
                })?;
            debug!(%table, rows = rows.len(), "exported table");
            tables.insert(table, rows);
        }
        Ok(Snapshot::new(self.clock.now(), tables))
    }

    /// Replaces remote tables with the snapshot's rows.
    ///
    /// Tables without rows in the snapshot are left as they are. A failure
    /// stops the import; tables written before it stay written.
    pub async fn import_all(&self, snapshot: &Snapshot) -> Result<ImportReport, CoreError> {
        let mut report = ImportReport::default();
        for (table, rows) in snapshot.tables() {
            if rows.is_empty() {
                report.skipped.push(table);
                continue;
            }
            self.remote
                .delete_all(table)
                .await
                .map_err(|source| CoreError::Remote {
                    table,
                    operation: RemoteOperation::Delete,
                    source,
                })?;
            self.remote
                .insert_many(table, rows.to_vec())
                .await
                .map_err(|source| CoreError::Remote {
                    table,
                    operation: RemoteOperation::Insert,
                    source,
                })?;
            report.written.push((table, rows.len()));
        }
        info!(
            tables = report.written.len(),
            rows = report.rows_written(),
            "snapshot imported into remote store"
        );
        Ok(report)
    }
}
