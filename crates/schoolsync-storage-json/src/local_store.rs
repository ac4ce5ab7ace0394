use std::{path::PathBuf, sync::Arc};

use async_trait::async_trait;
use schoolsync_core::{BackendKind, Clock, CoreError, SavedLocation, Selection, StorageBackend};
use schoolsync_domain::Snapshot;
use tokio::fs;
use tracing::info;

use crate::{
    fs_util::{ask, load_snapshot_from_path, write_atomic},
    suggested_file_name, FileDialog, KeyValueStore,
};

const KEY_PREFIX: &str = "schoolsync:";

/// Browser-style storage: named slots go to a quota-limited key-value store,
/// manual saves become downloads and manual loads go through a file picker.
#[derive(Clone)]
pub struct LocalStoreBackend {
    store: Arc<dyn KeyValueStore>,
    downloads_dir: PathBuf,
    dialog: Arc<dyn FileDialog>,
    clock: Arc<dyn Clock>,
}

impl LocalStoreBackend {
    pub fn new(
        store: Arc<dyn KeyValueStore>,
        downloads_dir: PathBuf,
        dialog: Arc<dyn FileDialog>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            store,
            downloads_dir,
            dialog,
            clock,
        }
    }

    pub fn key_for(name: &str) -> String {
        format!("{KEY_PREFIX}{}", name.trim())
    }

    /// Runs a store call on the blocking pool; file-backed stores write synchronously.
    async fn with_store<T, F>(&self, op: F) -> Result<T, CoreError>
    where
        T: Send + 'static,
        F: FnOnce(&dyn KeyValueStore) -> Result<T, CoreError> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        tokio::task::spawn_blocking(move || op(store.as_ref()))
            .await
            .map_err(|err| CoreError::Storage(format!("local store task failed: {err}")))?
    }

    /// Picks `name`, or `stem (n).ext` like a browser does when the file exists.
    async fn download_path(&self, name: &str) -> Result<PathBuf, CoreError> {
        let candidate = self.downloads_dir.join(name);
        if !fs::try_exists(&candidate).await? {
            return Ok(candidate);
        }
        let (stem, ext) = name.rsplit_once('.').unwrap_or((name, ""));
        let mut counter = 1usize;
        loop {
            let file_name = if ext.is_empty() {
                format!("{stem} ({counter})")
            } else {
                format!("{stem} ({counter}).{ext}")
            };
            let candidate = self.downloads_dir.join(file_name);
            if !fs::try_exists(&candidate).await? {
                return Ok(candidate);
            }
            counter += 1;
        }
    }
}

#[async_trait]
impl StorageBackend for LocalStoreBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::LocalStore
    }

    async fn save_named(
        &self,
        name: &str,
        snapshot: &Snapshot,
    ) -> Result<SavedLocation, CoreError> {
        let key = Self::key_for(name);
        let json = serde_json::to_string(snapshot)?;
        let slot = key.clone();
        self.with_store(move |store| store.set_item(&slot, &json)).await?;
        Ok(SavedLocation::StoreKey(key))
    }

    async fn load_named(&self, name: &str) -> Result<Option<Snapshot>, CoreError> {
        let key = Self::key_for(name);
        match self.with_store(move |store| store.get_item(&key)).await? {
            Some(json) => Ok(Some(Snapshot::from_json(&json)?)),
            None => Ok(None),
        }
    }

    /// Downloads cannot be dismissed, so this never reports a cancellation.
    async fn save_interactive(
        &self,
        snapshot: &Snapshot,
    ) -> Result<Selection<SavedLocation>, CoreError> {
        let path = self
            .download_path(&suggested_file_name(self.clock.today()))
            .await?;
        write_atomic(&path, &snapshot.to_json_pretty()?).await?;
        info!(path = %path.display(), "snapshot downloaded");
        Ok(Selection::Chosen(SavedLocation::Download(path)))
    }

    async fn load_interactive(&self) -> Result<Selection<Snapshot>, CoreError> {
        let Some(path) = ask(&self.dialog, |dialog| dialog.pick_open_path()).await? else {
            return Ok(Selection::Cancelled);
        };
        let snapshot = load_snapshot_from_path(&path).await?;
        Ok(Selection::Chosen(snapshot))
    }
}
