use std::{
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};

use chrono::{DateTime, Utc};
use schoolsync_config::{ConfigManager, Preferences};
use schoolsync_core::{BackupService, Clock, ImportReport, Outcome, SavedLocation};
use schoolsync_domain::SyncStatus;
use tokio::{
    task::JoinHandle,
    time::{interval_at, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info, warn};

use crate::{Notice, Notifier};

/// Bounds applied to the auto-save period.
pub const MIN_AUTO_SAVE_INTERVAL: Duration = Duration::from_secs(1);
pub const MAX_AUTO_SAVE_INTERVAL: Duration = Duration::from_secs(7 * 24 * 60 * 60);

/// Asks the host to rebuild all in-memory state after a restore.
pub trait ReloadHandle: Send + Sync {
    fn request_reload(&self);
}

#[derive(Debug, Clone, Default)]
struct ContextState {
    auto_save_enabled: bool,
    last_backup: Option<DateTime<Utc>>,
    sync_status: Option<SyncStatus>,
}

struct Shared {
    service: BackupService,
    config: ConfigManager,
    clock: Arc<dyn Clock>,
    state: Mutex<ContextState>,
}

impl Shared {
    fn state(&self) -> MutexGuard<'_, ContextState> {
        self.state
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn persist_preferences(&self) -> Result<(), schoolsync_config::ConfigError> {
        let prefs = {
            let state = self.state();
            Preferences {
                auto_save_enabled: state.auto_save_enabled,
                last_backup: state.last_backup,
            }
        };
        self.config.save_preferences(&prefs)
    }

    fn record_backup(&self) {
        self.state().last_backup = Some(self.clock.now());
        if let Err(err) = self.persist_preferences() {
            warn!(error = %err, "could not record last backup time");
        }
    }

    async fn refresh_sync_status(&self) -> Outcome<SyncStatus> {
        let outcome = self.service.sync_with_remote().await;
        if let Outcome::Success(status) = &outcome {
            self.state().sync_status = Some(status.clone());
        }
        outcome
    }

    /// Auto-save plus the sync-status refresh that follows it. Never notifies.
    async fn run_auto_save(&self) -> Outcome<SavedLocation> {
        let outcome = self.service.auto_save().await;
        if outcome.is_success() {
            self.record_backup();
        }
        if let Outcome::Failed(err) = self.refresh_sync_status().await {
            debug!(error = %err, "sync status not refreshed after auto-save");
        }
        outcome
    }
}

/// Process-wide backup state: auto-save flag, periodic timer and last-known
/// sync status.
///
/// Built once at startup, handed to the front end, and torn down with
/// [`BackupContext::shutdown`] (or on drop). At most one timer task exists.
pub struct BackupContext {
    shared: Arc<Shared>,
    notifier: Arc<dyn Notifier>,
    reload: Arc<dyn ReloadHandle>,
    interval: Duration,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl BackupContext {
    pub fn new(
        service: BackupService,
        config: ConfigManager,
        clock: Arc<dyn Clock>,
        notifier: Arc<dyn Notifier>,
        reload: Arc<dyn ReloadHandle>,
        interval: Duration,
    ) -> Self {
        Self {
            shared: Arc::new(Shared {
                service,
                config,
                clock,
                state: Mutex::new(ContextState::default()),
            }),
            notifier,
            reload,
            interval: interval.clamp(MIN_AUTO_SAVE_INTERVAL, MAX_AUTO_SAVE_INTERVAL),
            timer: Mutex::new(None),
        }
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn service(&self) -> &BackupService {
        &self.shared.service
    }

    pub fn auto_save_enabled(&self) -> bool {
        self.shared.state().auto_save_enabled
    }

    pub fn last_backup(&self) -> Option<DateTime<Utc>> {
        self.shared.state().last_backup
    }

    pub fn sync_status(&self) -> Option<SyncStatus> {
        self.shared.state().sync_status.clone()
    }

    pub fn timer_active(&self) -> bool {
        self.timer_slot()
            .as_ref()
            .map(|handle| !handle.is_finished())
            .unwrap_or(false)
    }

    /// Loads persisted preferences into the context. Unreadable preferences
    /// fall back to defaults.
    pub fn load_preferences(&self) {
        let prefs = self.shared.config.load_preferences().unwrap_or_else(|err| {
            warn!(error = %err, "preferences unreadable, using defaults");
            Preferences::default()
        });
        let mut state = self.shared.state();
        state.auto_save_enabled = prefs.auto_save_enabled;
        state.last_backup = prefs.last_backup;
    }

    /// Startup sequence: preferences, initial sync status, one immediate
    /// auto-save when enabled, then the periodic timer.
    pub async fn start(&self) {
        self.load_preferences();
        if let Outcome::Failed(err) = self.shared.refresh_sync_status().await {
            warn!(error = %err, "initial sync status unavailable");
        }
        if self.auto_save_enabled() {
            let _ = self.shared.run_auto_save().await;
        }
        self.reset_timer();
        info!(
            auto_save = self.auto_save_enabled(),
            interval_secs = self.interval.as_secs(),
            "backup context started"
        );
    }

    /// Stops the periodic timer. An auto-save already running is left to finish.
    pub fn shutdown(&self) {
        if let Some(handle) = self.timer_slot().take() {
            handle.abort();
            debug!("auto-save timer stopped");
        }
    }

    pub async fn set_auto_save_enabled(&self, enabled: bool) {
        self.shared.state().auto_save_enabled = enabled;
        let persisted = self.shared.persist_preferences();
        self.reset_timer();
        match persisted {
            Ok(()) if enabled => self.notifier.notify(Notice::success("Auto-save enabled")),
            Ok(()) => self.notifier.notify(Notice::success("Auto-save disabled")),
            Err(err) => {
                error!(error = %err, "could not persist auto-save preference");
                self.notifier.notify(Notice::error(format!(
                    "Auto-save {} for this session only: {err}",
                    if enabled { "enabled" } else { "disabled" }
                )));
            }
        }
    }

    /// Manual save to a user-chosen destination.
    pub async fn save_now(&self) -> bool {
        match self.shared.service.save_backup().await {
            Outcome::Success(location) => {
                self.shared.record_backup();
                self.notifier
                    .notify(Notice::success(format!("Backup saved to {location}")));
                true
            }
            Outcome::Absent(_) => {
                self.notifier.notify(Notice::info("Backup cancelled"));
                false
            }
            Outcome::Failed(err) => {
                self.notifier
                    .notify(Notice::error(format!("Backup failed: {err}")));
                false
            }
        }
    }

    /// User-triggered auto-save into the fixed slot. Unlike timer runs, this
    /// reports its result.
    pub async fn auto_save_now(&self) -> Outcome<SavedLocation> {
        let outcome = self.shared.run_auto_save().await;
        match &outcome {
            Outcome::Success(location) => self
                .notifier
                .notify(Notice::success(format!("Auto-save written to {location}"))),
            Outcome::Absent(_) => self.notifier.notify(Notice::info("Nothing to save")),
            Outcome::Failed(err) => self
                .notifier
                .notify(Notice::error(format!("Auto-save failed: {err}"))),
        }
        outcome
    }

    pub async fn check_sync(&self) -> Option<SyncStatus> {
        match self.shared.refresh_sync_status().await {
            Outcome::Success(status) => {
                let notice = if status.has_changes {
                    Notice::info(status.summary.clone())
                } else {
                    Notice::success(status.summary.clone())
                };
                self.notifier.notify(notice);
                Some(status)
            }
            Outcome::Absent(_) => {
                self.notifier.notify(Notice::info("No local backup found"));
                None
            }
            Outcome::Failed(err) => {
                self.notifier
                    .notify(Notice::error(format!("Sync check failed: {err}")));
                None
            }
        }
    }

    /// Loads a user-picked snapshot, imports it, then requests a full reload.
    pub async fn restore(&self) -> Outcome<ImportReport> {
        let snapshot = match self.shared.service.load_backup().await {
            Outcome::Success(snapshot) => snapshot,
            Outcome::Absent(reason) => {
                self.notifier.notify(Notice::info("Restore cancelled"));
                return Outcome::Absent(reason);
            }
            Outcome::Failed(err) => {
                self.notifier
                    .notify(Notice::error(format!("Could not read backup: {err}")));
                return Outcome::Failed(err);
            }
        };
        match self.shared.service.import_snapshot(&snapshot).await {
            Outcome::Success(report) => {
                self.notifier.notify(Notice::success(format!(
                    "Restored {} rows from the backup of {}; reloading",
                    report.rows_written(),
                    snapshot.timestamp().format("%Y-%m-%d %H:%M")
                )));
                self.reload.request_reload();
                Outcome::Success(report)
            }
            Outcome::Absent(reason) => {
                self.notifier.notify(Notice::info("Nothing to restore"));
                Outcome::Absent(reason)
            }
            Outcome::Failed(err) => {
                self.notifier.notify(Notice::error(format!(
                    "Restore failed, the remote store may be partially updated; run the restore again: {err}"
                )));
                Outcome::Failed(err)
            }
        }
    }

    fn timer_slot(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.timer
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Replaces the timer task to match the current auto-save flag.
    fn reset_timer(&self) {
        let mut slot = self.timer_slot();
        if let Some(handle) = slot.take() {
            handle.abort();
        }
        if self.auto_save_enabled() {
            *slot = Some(spawn_timer(Arc::clone(&self.shared), self.interval));
        }
    }
}

impl Drop for BackupContext {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// Each tick runs the save as its own task, so aborting the timer never
/// cancels a save in flight and a slow save never delays the next tick.
fn spawn_timer(shared: Arc<Shared>, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            let shared = Arc::clone(&shared);
            tokio::spawn(async move {
                if let Outcome::Failed(err) = shared.run_auto_save().await {
                    debug!(error = %err, "scheduled auto-save failed");
                }
            });
        }
    })
}

