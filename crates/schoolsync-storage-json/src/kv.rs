use std::{
    collections::BTreeMap,
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
    sync::{Mutex, MutexGuard},
};

use schoolsync_core::CoreError;

use crate::fs_util::tmp_path;

/// Size limit of a browser local store.
pub const DEFAULT_QUOTA_BYTES: usize = 5 * 1024 * 1024;

/// Small persistent string store addressed by fixed keys.
pub trait KeyValueStore: Send + Sync {
    fn get_item(&self, key: &str) -> Result<Option<String>, CoreError>;
    fn set_item(&self, key: &str, value: &str) -> Result<(), CoreError>;
}

fn used_bytes(entries: &BTreeMap<String, String>) -> usize {
    entries.iter().map(|(key, value)| key.len() + value.len()).sum()
}

/// Inserts `key` unless the store would outgrow `quota`.
fn insert_within_quota(
    entries: &mut BTreeMap<String, String>,
    key: &str,
    value: &str,
    quota: usize,
) -> Result<(), CoreError> {
    let current = entries.get(key).map(|old| key.len() + old.len()).unwrap_or(0);
    let needed = used_bytes(entries) - current + key.len() + value.len();
    if needed > quota {
        return Err(CoreError::QuotaExceeded { needed, quota });
    }
    entries.insert(key.to_string(), value.to_string());
    Ok(())
}

fn lock<'a>(
    entries: &'a Mutex<BTreeMap<String, String>>,
) -> Result<MutexGuard<'a, BTreeMap<String, String>>, CoreError> {
    entries
        .lock()
        .map_err(|_| CoreError::Storage("local store lock poisoned".into()))
}

/// Volatile store, cleared when the process exits.
#[derive(Debug)]
pub struct MemoryKeyValueStore {
    entries: Mutex<BTreeMap<String, String>>,
    quota: usize,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::with_quota(DEFAULT_QUOTA_BYTES)
    }

    pub fn with_quota(quota: usize) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            quota,
        }
    }
}

impl Default for MemoryKeyValueStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut entries = lock(&self.entries)?;
        insert_within_quota(&mut entries, key, value, self.quota)
    }
}

/// Store persisted as a single JSON object file.
#[derive(Debug)]
pub struct FileKeyValueStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
    quota: usize,
}

impl FileKeyValueStore {
    pub fn open(path: PathBuf, quota: usize) -> Result<Self, CoreError> {
        let entries = if path.exists() {
            let data = fs::read_to_string(&path)?;
            serde_json::from_str(&data)?
        } else {
            BTreeMap::new()
        };
        Ok(Self {
            path,
            entries: Mutex::new(entries),
            quota,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), CoreError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string(entries)?;
        let tmp = tmp_path(&self.path);
        let staged = File::create(&tmp)
            .and_then(|mut file| {
                file.write_all(json.as_bytes())?;
                file.flush()
            })
            .and_then(|()| fs::rename(&tmp, &self.path));
        if let Err(err) = staged {
            let _ = fs::remove_file(&tmp);
            return Err(err.into());
        }
        Ok(())
    }
}

impl KeyValueStore for FileKeyValueStore {
    fn get_item(&self, key: &str) -> Result<Option<String>, CoreError> {
        Ok(lock(&self.entries)?.get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), CoreError> {
        let mut entries = lock(&self.entries)?;
        let previous = entries.clone();
        insert_within_quota(&mut entries, key, value, self.quota)?;
        if let Err(err) = self.persist(&entries) {
            *entries = previous;
            return Err(err);
        }
        Ok(())
    }
}
