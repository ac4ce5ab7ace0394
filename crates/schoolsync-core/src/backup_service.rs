use std::sync::Arc;

use chrono::Duration;
use schoolsync_domain::{Snapshot, SyncStatus};
use tracing::{debug, error, info};

use crate::{
    Absence, Clock, CoreError, ImportReport, Outcome, SavedLocation, Selection, SnapshotTransfer,
    StorageBackend, AUTO_BACKUP_SLOT,
};

const DEFAULT_SYNC_TOLERANCE_SECS: i64 = 60;
/// Ten years; larger configured tolerances are clamped to it.
pub const MAX_SYNC_TOLERANCE_SECS: u64 = 10 * 365 * 24 * 60 * 60;

/// Tuning for the staleness check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncPolicy {
    /// Maximum timestamp distance between two snapshots still considered in sync.
    pub tolerance: Duration,
}

impl SyncPolicy {
    pub fn with_tolerance_secs(secs: u64) -> Self {
        let secs = secs.min(MAX_SYNC_TOLERANCE_SECS) as i64;
        Self {
            tolerance: Duration::seconds(secs),
        }
    }
}

impl Default for SyncPolicy {
    fn default() -> Self {
        Self {
            tolerance: Duration::seconds(DEFAULT_SYNC_TOLERANCE_SECS),
        }
    }
}

/// Builds snapshots from the remote store and hands them to the storage backend.
///
/// No method returns a bare error: every call yields an [`Outcome`].
#[derive(Clone)]
pub struct BackupService {
    transfer: SnapshotTransfer,
    backend: Arc<dyn StorageBackend>,
    clock: Arc<dyn Clock>,
    policy: SyncPolicy,
}

impl BackupService {
    pub fn new(
        transfer: SnapshotTransfer,
        backend: Arc<dyn StorageBackend>,
        clock: Arc<dyn Clock>,
        policy: SyncPolicy,
    ) -> Self {
        Self {
            transfer,
            backend,
            clock,
            policy,
        }
    }

    pub async fn export_all(&self) -> Outcome<Snapshot> {
        self.transfer.export_all().await.into()
    }

    /// Saves a fresh snapshot into the auto-backup slot. Failures are logged
    /// and returned; callers are free to drop the outcome.
    pub async fn auto_save(&self) -> Outcome<SavedLocation> {
        let result = async {
            let snapshot = self.transfer.export_all().await?;
            self.backend.save_named(AUTO_BACKUP_SLOT, &snapshot).await
        }
        .await;
        match result {
            Ok(location) => {
                info!(%location, "auto-save completed");
                Outcome::Success(location)
            }
            Err(err) => {
                error!(error = %err, "auto-save failed");
                Outcome::Failed(err)
            }
        }
    }

    /// Saves a fresh snapshot to a destination picked by the user.
    pub async fn save_backup(&self) -> Outcome<SavedLocation> {
        let snapshot = match self.transfer.export_all().await {
            Ok(snapshot) => snapshot,
            Err(err) => return failed("manual backup export", err),
        };
        match self.backend.save_interactive(&snapshot).await {
            Ok(Selection::Chosen(location)) => {
                info!(%location, "manual backup saved");
                Outcome::Success(location)
            }
            Ok(Selection::Cancelled) => {
                debug!("manual backup cancelled");
                Outcome::Absent(Absence::Cancelled)
            }
            Err(err) => failed("manual backup save", err),
        }
    }

    /// Reads a snapshot picked by the user. Importing it is a separate step.
    pub async fn load_backup(&self) -> Outcome<Snapshot> {
        match self.backend.load_interactive().await {
            Ok(Selection::Chosen(snapshot)) => {
                info!(
                    taken_at = %snapshot.timestamp(),
                    rows = snapshot.total_rows(),
                    "backup file loaded"
                );
                Outcome::Success(snapshot)
            }
            Ok(Selection::Cancelled) => {
                debug!("backup load cancelled");
                Outcome::Absent(Absence::Cancelled)
            }
            Err(err) => failed("backup load", err),
        }
    }

    pub async fn load_auto_save(&self) -> Outcome<Snapshot> {
        match self.backend.load_named(AUTO_BACKUP_SLOT).await {
            Ok(Some(snapshot)) => Outcome::Success(snapshot),
            Ok(None) => {
                debug!("no auto-save found");
                Outcome::Absent(Absence::NoBackup)
            }
            Err(err) => failed("auto-save load", err),
        }
    }

    /// Compares the last auto-save with a fresh export. Writes nothing.
    pub async fn sync_with_remote(&self) -> Outcome<SyncStatus> {
        let stored = match self.load_auto_save().await {
            Outcome::Success(snapshot) => snapshot,
            Outcome::Absent(_) => return Outcome::Success(SyncStatus::no_local_backup(self.clock.now())),
            Outcome::Failed(err) => return Outcome::Failed(err),
        };
        let fresh = match self.transfer.export_all().await {
            Ok(snapshot) => snapshot,
            Err(err) => return failed("sync check export", err),
        };
        let status = SyncStatus::compare(&stored, &fresh, self.policy.tolerance, self.clock.now());
        debug!(has_changes = status.has_changes, summary = %status.summary, "sync status computed");
        Outcome::Success(status)
    }

    pub async fn import_snapshot(&self, snapshot: &Snapshot) -> Outcome<ImportReport> {
        match self.transfer.import_all(snapshot).await {
            Ok(report) => Outcome::Success(report),
            Err(err) => failed("snapshot import", err),
        }
    }
}

fn failed<T>(action: &str, err: CoreError) -> Outcome<T> {
    error!(error = %err, "{action} failed");
    Outcome::Failed(err)
}
