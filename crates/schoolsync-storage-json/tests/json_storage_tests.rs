use std::{
    collections::BTreeMap,
    path::PathBuf,
    sync::{Arc, Mutex},
};

use chrono::{DateTime, Duration, TimeZone, Utc};
use schoolsync_core::{
    Clock, CoreError, SavedLocation, Selection, StorageBackend, AUTO_BACKUP_SLOT,
};
use schoolsync_domain::{Row, Snapshot, TableName};
use schoolsync_storage_json::{
    FileKeyValueStore, FilesystemBackend, KeyValueStore, LocalStoreBackend, MemoryKeyValueStore,
    ScriptedDialog, DEFAULT_QUOTA_BYTES,
};
use serde_json::json;
use tempfile::tempdir;

/// Clock that moves one minute forward on every reading.
struct SteppingClock(Mutex<DateTime<Utc>>);

impl SteppingClock {
    fn new() -> Arc<Self> {
        Arc::new(Self(Mutex::new(
            Utc.with_ymd_and_hms(2025, 11, 3, 7, 0, 0).unwrap(),
        )))
    }
}

impl Clock for SteppingClock {
    fn now(&self) -> DateTime<Utc> {
        let mut now = self.0.lock().unwrap();
        let current = *now;
        *now += Duration::minutes(1);
        current
    }
}

fn snapshot_with_students(count: usize) -> Snapshot {
    let rows: Vec<Row> = (0..count)
        .map(|id| json!({ "id": id, "class_id": 1 }).as_object().cloned().unwrap())
        .collect();
    let mut tables = BTreeMap::new();
    tables.insert(TableName::Students, rows);
    Snapshot::new(Utc.with_ymd_and_hms(2025, 11, 3, 7, 0, 0).unwrap(), tables)
}

fn filesystem_backend(dir: PathBuf, dialog: ScriptedDialog) -> FilesystemBackend {
    FilesystemBackend::new(dir, Arc::new(dialog), SteppingClock::new()).expect("backend")
}

#[tokio::test]
async fn named_slot_round_trips_through_disk() {
    let dir = tempdir().expect("tempdir");
    let backend = filesystem_backend(dir.path().join("backups"), ScriptedDialog::dismissing());

    assert!(backend.load_named(AUTO_BACKUP_SLOT).await.unwrap().is_none());

    let snapshot = snapshot_with_students(3);
    let location = backend
        .save_named(AUTO_BACKUP_SLOT, &snapshot)
        .await
        .expect("save");
    assert_eq!(
        location,
        SavedLocation::File(dir.path().join("backups").join("auto-backup.json"))
    );

    let loaded = backend
        .load_named(AUTO_BACKUP_SLOT)
        .await
        .expect("load")
        .expect("slot present");
    assert_eq!(loaded, snapshot);
}

#[tokio::test]
async fn retention_keeps_thirty_newest_archives() {
    let dir = tempdir().expect("tempdir");
    let backend = filesystem_backend(dir.path().to_path_buf(), ScriptedDialog::dismissing());
    let snapshot = snapshot_with_students(1);

    let mut created = Vec::new();
    for _ in 0..35 {
        backend
            .save_named(AUTO_BACKUP_SLOT, &snapshot)
            .await
            .expect("save");
        let newest = backend.list_archives(AUTO_BACKUP_SLOT).await.unwrap();
        created.push(newest[0].file_name.clone());
    }

    let remaining: Vec<String> = backend
        .list_archives(AUTO_BACKUP_SLOT)
        .await
        .unwrap()
        .into_iter()
        .map(|archive| archive.file_name)
        .collect();
    let mut expected: Vec<String> = created[5..].to_vec();
    expected.reverse();

    assert_eq!(remaining.len(), 30);
    assert_eq!(remaining, expected);
    assert!(dir.path().join("auto-backup.json").exists());
}

#[tokio::test]
async fn interactive_save_and_load_use_picked_paths() {
    let dir = tempdir().expect("tempdir");
    let target = dir.path().join("exports").join("term1.json");
    let dialog = ScriptedDialog::new([Some(target.clone()), Some(target.clone())]);
    let backend = filesystem_backend(dir.path().join("backups"), dialog);
    let snapshot = snapshot_with_students(2);

    let saved = backend.save_interactive(&snapshot).await.expect("save");
    assert_eq!(saved, Selection::Chosen(SavedLocation::File(target.clone())));

    match backend.load_interactive().await.expect("load") {
        Selection::Chosen(loaded) => assert_eq!(loaded.row_count(TableName::Students), 2),
        Selection::Cancelled => panic!("expected a snapshot"),
    }
}

#[tokio::test]
async fn dismissed_dialog_is_a_cancellation() {
    let dir = tempdir().expect("tempdir");
    let backend = filesystem_backend(dir.path().to_path_buf(), ScriptedDialog::dismissing());

    let saved = backend
        .save_interactive(&snapshot_with_students(1))
        .await
        .expect("save");
    assert!(saved.is_cancelled());
    assert!(backend.load_interactive().await.expect("load").is_cancelled());
}

#[tokio::test]
async fn loading_a_foreign_file_reports_an_error() {
    let dir = tempdir().expect("tempdir");
    let bogus = dir.path().join("notes.json");
    std::fs::write(&bogus, r#"{ "hello": "world" }"#).unwrap();
    let backend = filesystem_backend(
        dir.path().join("backups"),
        ScriptedDialog::answering(bogus),
    );

    let err = backend.load_interactive().await.unwrap_err();
    assert!(matches!(err, CoreError::Serde(_)));
}

#[tokio::test]
async fn local_store_slot_and_download() {
    let dir = tempdir().expect("tempdir");
    let store = Arc::new(MemoryKeyValueStore::new());
    let backend = LocalStoreBackend::new(
        store.clone(),
        dir.path().to_path_buf(),
        Arc::new(ScriptedDialog::dismissing()),
        SteppingClock::new(),
    );
    let snapshot = snapshot_with_students(4);

    assert!(backend.load_named(AUTO_BACKUP_SLOT).await.unwrap().is_none());
    backend
        .save_named(AUTO_BACKUP_SLOT, &snapshot)
        .await
        .expect("save");
    assert!(store.get_item("schoolsync:auto-backup").unwrap().is_some());
    assert_eq!(
        backend.load_named(AUTO_BACKUP_SLOT).await.unwrap(),
        Some(snapshot.clone())
    );

    let first = backend.save_interactive(&snapshot).await.expect("download");
    let second = backend.save_interactive(&snapshot).await.expect("download");
    assert_eq!(
        first,
        Selection::Chosen(SavedLocation::Download(
            dir.path().join("school-backup-2025-11-03.json")
        ))
    );
    assert_eq!(
        second,
        Selection::Chosen(SavedLocation::Download(
            dir.path().join("school-backup-2025-11-03 (1).json")
        ))
    );
    assert!(backend.load_interactive().await.unwrap().is_cancelled());
}

#[tokio::test]
async fn local_store_quota_surfaces_as_error() {
    let dir = tempdir().expect("tempdir");
    let backend = LocalStoreBackend::new(
        Arc::new(MemoryKeyValueStore::with_quota(64)),
        dir.path().to_path_buf(),
        Arc::new(ScriptedDialog::dismissing()),
        SteppingClock::new(),
    );

    let err = backend
        .save_named(AUTO_BACKUP_SLOT, &snapshot_with_students(10))
        .await
        .unwrap_err();
    assert!(matches!(err, CoreError::QuotaExceeded { quota: 64, .. }));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn overlapping_slot_saves_both_succeed() {
    let dir = tempdir().expect("tempdir");
    let backend = Arc::new(filesystem_backend(
        dir.path().to_path_buf(),
        ScriptedDialog::dismissing(),
    ));

    for round in 0..20 {
        let saves: Vec<_> = [round, round + 100]
            .into_iter()
            .map(|students| {
                let backend = Arc::clone(&backend);
                tokio::spawn(async move {
                    backend
                        .save_named(AUTO_BACKUP_SLOT, &snapshot_with_students(students))
                        .await
                })
            })
            .collect();
        for save in saves {
            save.await.expect("join").expect("save");
        }
    }

    let last = backend
        .load_named(AUTO_BACKUP_SLOT)
        .await
        .expect("load")
        .expect("slot present");
    assert!([19, 119].contains(&last.row_count(TableName::Students)));
    let staging: Vec<String> = std::fs::read_dir(dir.path())
        .unwrap()
        .map(|entry| entry.unwrap().file_name().to_string_lossy().into_owned())
        .filter(|name| name.ends_with(".tmp"))
        .collect();
    assert!(staging.is_empty(), "{staging:?}");
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn local_store_saves_run_off_the_executor() {
    let dir = tempdir().expect("tempdir");
    let store = Arc::new(
        FileKeyValueStore::open(dir.path().join("local-storage.json"), DEFAULT_QUOTA_BYTES)
            .expect("store"),
    );
    let backend = LocalStoreBackend::new(
        store.clone(),
        dir.path().join("downloads"),
        Arc::new(ScriptedDialog::dismissing()),
        SteppingClock::new(),
    );

    backend
        .save_named(AUTO_BACKUP_SLOT, &snapshot_with_students(4))
        .await
        .expect("save");

    assert!(store
        .get_item(&LocalStoreBackend::key_for(AUTO_BACKUP_SLOT))
        .unwrap()
        .is_some());
    let loaded = backend
        .load_named(AUTO_BACKUP_SLOT)
        .await
        .expect("load")
        .expect("slot present");
    assert_eq!(loaded.row_count(TableName::Students), 4);
}
