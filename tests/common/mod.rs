#![allow(dead_code)]

use std::{
    collections::BTreeMap,
    path::{Path, PathBuf},
    sync::{
        atomic::{AtomicUsize, Ordering},
        Arc, Mutex,
    },
    time::Duration,
};

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use schoolsync::{BackupContext, Notice, NoticeLevel, Notifier, ReloadHandle};
use schoolsync_config::ConfigManager;
use schoolsync_core::{
    BackendKind, BackupService, Clock, CoreError, MemoryRemoteStore, RemoteError, RemoteStore,
    SavedLocation, Selection, SnapshotTransfer, StorageBackend, SyncPolicy, SystemClock,
};
use schoolsync_domain::{Row, Snapshot, TableName};
use schoolsync_storage_json::{LocalStoreBackend, MemoryKeyValueStore, ScriptedDialog};
use serde_json::json;
use tempfile::TempDir;
use tokio::sync::Notify;

pub const INTERVAL: Duration = Duration::from_secs(5 * 60);

pub fn rows(count: usize) -> Vec<Row> {
    (0..count)
        .map(|id| {
            json!({ "id": id + 1, "name": format!("row {}", id + 1) })
                .as_object()
                .cloned()
                .unwrap()
        })
        .collect()
}

pub fn seeded_remote(students: usize) -> Arc<MemoryRemoteStore> {
    let mut tables = BTreeMap::new();
    tables.insert(TableName::Students, rows(students));
    tables.insert(TableName::Classes, rows(2));
    Arc::new(MemoryRemoteStore::with_tables(tables))
}

pub fn write_snapshot_file(dir: &Path, students: usize) -> PathBuf {
    let mut tables = BTreeMap::new();
    tables.insert(TableName::Students, rows(students));
    let snapshot = Snapshot::new(Utc.with_ymd_and_hms(2024, 9, 1, 8, 0, 0).unwrap(), tables);
    let path = dir.join("picked-backup.json");
    std::fs::write(&path, snapshot.to_json_pretty().unwrap()).unwrap();
    path
}

#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().unwrap().clone()
    }

    pub fn levels(&self) -> Vec<NoticeLevel> {
        self.notices().into_iter().map(|notice| notice.level).collect()
    }

    pub fn clear(&self) {
        self.notices.lock().unwrap().clear();
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().unwrap().push(notice);
    }
}

#[derive(Default)]
pub struct RecordingReload {
    requests: AtomicUsize,
}

impl RecordingReload {
    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

impl ReloadHandle for RecordingReload {
    fn request_reload(&self) {
        self.requests.fetch_add(1, Ordering::SeqCst);
    }
}

/// Counts named-slot writes of the wrapped backend. Once held, named saves
/// wait for the returned gate before writing.
pub struct CountingBackend {
    inner: Arc<dyn StorageBackend>,
    named_saves: AtomicUsize,
    waiting: AtomicUsize,
    gate: Mutex<Option<Arc<Notify>>>,
}

impl CountingBackend {
    pub fn new(inner: Arc<dyn StorageBackend>) -> Self {
        Self {
            inner,
            named_saves: AtomicUsize::new(0),
            waiting: AtomicUsize::new(0),
            gate: Mutex::new(None),
        }
    }

    pub fn named_saves(&self) -> usize {
        self.named_saves.load(Ordering::SeqCst)
    }

    /// Saves currently parked at the gate.
    pub fn waiting(&self) -> usize {
        self.waiting.load(Ordering::SeqCst)
    }

    pub fn hold_saves(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.gate.lock().unwrap() = Some(gate.clone());
        gate
    }
}

#[async_trait]
impl StorageBackend for CountingBackend {
    fn kind(&self) -> BackendKind {
        self.inner.kind()
    }

    async fn save_named(
        &self,
        name: &str,
        snapshot: &Snapshot,
    ) -> Result<SavedLocation, CoreError> {
        let gate = self.gate.lock().unwrap().clone();
        if let Some(gate) = gate {
            self.waiting.fetch_add(1, Ordering::SeqCst);
            gate.notified().await;
            self.waiting.fetch_sub(1, Ordering::SeqCst);
        }
        let location = self.inner.save_named(name, snapshot).await?;
        self.named_saves.fetch_add(1, Ordering::SeqCst);
        Ok(location)
    }

    async fn load_named(&self, name: &str) -> Result<Option<Snapshot>, CoreError> {
        self.inner.load_named(name).await
    }

    async fn save_interactive(
        &self,
        snapshot: &Snapshot,
    ) -> Result<Selection<SavedLocation>, CoreError> {
        self.inner.save_interactive(snapshot).await
    }

    async fn load_interactive(&self) -> Result<Selection<Snapshot>, CoreError> {
        self.inner.load_interactive().await
    }
}

/// Remote store whose every call fails, as when the network is down.
pub struct OfflineRemote;

#[async_trait]
impl RemoteStore for OfflineRemote {
    async fn select_all(&self, _table: TableName) -> Result<Vec<Row>, RemoteError> {
        Err(RemoteError::new("network unreachable"))
    }

    async fn delete_all(&self, _table: TableName) -> Result<(), RemoteError> {
        Err(RemoteError::new("network unreachable"))
    }

    async fn insert_many(&self, _table: TableName, _rows: Vec<Row>) -> Result<(), RemoteError> {
        Err(RemoteError::new("network unreachable"))
    }
}

pub struct Harness {
    pub home: TempDir,
    pub backend: Arc<CountingBackend>,
    pub notifier: Arc<RecordingNotifier>,
    pub reload: Arc<RecordingReload>,
    pub config: ConfigManager,
    pub context: BackupContext,
}

impl Harness {
    pub fn new(remote: Arc<dyn RemoteStore>, dialog: ScriptedDialog) -> Self {
        Self::with_interval(remote, dialog, INTERVAL)
    }

    pub fn with_interval(
        remote: Arc<dyn RemoteStore>,
        dialog: ScriptedDialog,
        interval: Duration,
    ) -> Self {
        let home = tempfile::tempdir().unwrap();
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let local_store = LocalStoreBackend::new(
            Arc::new(MemoryKeyValueStore::new()),
            home.path().join("downloads"),
            Arc::new(dialog),
            Arc::clone(&clock),
        );
        let backend = Arc::new(CountingBackend::new(Arc::new(local_store)));
        let service = BackupService::new(
            SnapshotTransfer::new(remote, Arc::clone(&clock)),
            backend.clone(),
            Arc::clone(&clock),
            SyncPolicy::default(),
        );
        let config = ConfigManager::with_base_dir(home.path().join("app")).unwrap();
        let notifier = Arc::new(RecordingNotifier::default());
        let reload = Arc::new(RecordingReload::default());
        let context = BackupContext::new(
            service,
            config.clone(),
            clock,
            notifier.clone(),
            reload.clone(),
            interval,
        );
        Self {
            home,
            backend,
            notifier,
            reload,
            config,
            context,
        }
    }

    pub fn downloads(&self) -> Vec<String> {
        match std::fs::read_dir(self.home.path().join("downloads")) {
            Ok(entries) => entries
                .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }
}

/// Lets spawned tasks run to completion on the current-thread test runtime.
///
/// Store calls run on the blocking pool. Paused time does not auto-advance
/// while such a call is in flight, so the short sleep also waits for them.
pub async fn settle() {
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
    tokio::time::sleep(Duration::from_millis(1)).await;
    for _ in 0..20 {
        tokio::task::yield_now().await;
    }
}
