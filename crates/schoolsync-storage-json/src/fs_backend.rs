use std::{
    cmp::Reverse,
    fs as std_fs,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use chrono::{DateTime, Duration, NaiveDateTime, Utc};
use schoolsync_core::{BackendKind, Clock, CoreError, SavedLocation, Selection, StorageBackend};
use schoolsync_domain::Snapshot;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::{
    fs_util::{ask, load_snapshot_from_path, save_snapshot_to_path, write_atomic},
    suggested_file_name, FileDialog,
};

const BACKUP_EXTENSION: &str = "json";
const ARCHIVE_TIMESTAMP_FORMAT: &str = "%Y%m%d-%H%M%S-%9f";
const ARCHIVE_STAMP_LEN: usize = 25;
pub const DEFAULT_RETENTION: usize = 30;

/// Dated copy of a named slot kept by the retention policy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchiveInfo {
    pub file_name: String,
    pub path: PathBuf,
    pub created_at: Option<DateTime<Utc>>,
}

/// Desktop storage: snapshots live as JSON files in an application directory.
///
/// Each named save rewrites `<slot>.json` and adds a dated archive
/// `<slot>-YYYYMMDD-HHMMSS-fffffffff.json`; only the newest `retention`
/// archives per slot are kept.
#[derive(Clone)]
pub struct FilesystemBackend {
    backup_dir: PathBuf,
    retention: usize,
    dialog: Arc<dyn FileDialog>,
    clock: Arc<dyn Clock>,
}

impl FilesystemBackend {
    pub fn new(
        backup_dir: PathBuf,
        dialog: Arc<dyn FileDialog>,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, CoreError> {
        Self::with_retention(backup_dir, dialog, clock, DEFAULT_RETENTION)
    }

    pub fn with_retention(
        backup_dir: PathBuf,
        dialog: Arc<dyn FileDialog>,
        clock: Arc<dyn Clock>,
        retention: usize,
    ) -> Result<Self, CoreError> {
        std_fs::create_dir_all(&backup_dir)?;
        Ok(Self {
            backup_dir,
            retention: retention.max(1),
            dialog,
            clock,
        })
    }

    pub fn backup_dir(&self) -> &Path {
        &self.backup_dir
    }

    pub fn retention(&self) -> usize {
        self.retention
    }

    pub fn slot_path(&self, name: &str) -> PathBuf {
        self.backup_dir
            .join(format!("{}.{}", canonical_name(name), BACKUP_EXTENSION))
    }

    /// Dated archives of `name`, newest first.
    pub async fn list_archives(&self, name: &str) -> Result<Vec<ArchiveInfo>, CoreError> {
        let prefix = format!("{}-", canonical_name(name));
        let mut entries = Vec::new();
        let mut dir = match fs::read_dir(&self.backup_dir).await {
            Ok(dir) => dir,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(entries),
            Err(err) => return Err(err.into()),
        };
        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            let Some(file_name) = path.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            let Some(stamp) = archive_stamp(file_name, &prefix) else {
                continue;
            };
            entries.push(ArchiveInfo {
                file_name: file_name.to_string(),
                created_at: parse_archive_stamp(stamp),
                path: path.clone(),
            });
        }
        entries.sort_by(|a, b| b.file_name.cmp(&a.file_name));
        Ok(entries)
    }

    async fn archive_path(&self, name: &str) -> Result<PathBuf, CoreError> {
        let slug = canonical_name(name);
        let mut at = self.clock.now();
        loop {
            let candidate = self.backup_dir.join(format!(
                "{}-{}.{}",
                slug,
                at.format(ARCHIVE_TIMESTAMP_FORMAT),
                BACKUP_EXTENSION
            ));
            if !fs::try_exists(&candidate).await? {
                return Ok(candidate);
            }
            at += Duration::nanoseconds(1);
        }
    }

    /// Deletes archives beyond the retention count. Failures are only logged.
    async fn prune_archives(&self, name: &str) {
        let archives = match self.list_archives(name).await {
            Ok(archives) => archives,
            Err(err) => {
                warn!(slot = name, error = %err, "could not list archives for pruning");
                return;
            }
        };
        for archive in archives.into_iter().skip(self.retention) {
            match fs::remove_file(&archive.path).await {
                Ok(()) => debug!(file = %archive.file_name, "pruned archive"),
                Err(err) => {
                    warn!(file = %archive.file_name, error = %err, "failed to prune archive")
                }
            }
        }
    }
}

#[async_trait]
impl StorageBackend for FilesystemBackend {
    fn kind(&self) -> BackendKind {
        BackendKind::Filesystem
    }

    async fn save_named(
        &self,
        name: &str,
        snapshot: &Snapshot,
    ) -> Result<SavedLocation, CoreError> {
        let json = snapshot.to_json_pretty()?;
        let path = self.slot_path(name);
        write_atomic(&path, &json).await?;
        let archive = self.archive_path(name).await?;
        write_atomic(&archive, &json).await?;
        self.prune_archives(name).await;
        Ok(SavedLocation::File(path))
    }

    async fn load_named(&self, name: &str) -> Result<Option<Snapshot>, CoreError> {
        let path = self.slot_path(name);
        if !fs::try_exists(&path).await? {
            return Ok(None);
        }
        load_snapshot_from_path(&path).await.map(Some)
    }

    async fn save_interactive(
        &self,
        snapshot: &Snapshot,
    ) -> Result<Selection<SavedLocation>, CoreError> {
        let suggested = suggested_file_name(self.clock.today());
        let Some(path) = ask(&self.dialog, move |dialog| dialog.pick_save_path(&suggested)).await?
        else {
            return Ok(Selection::Cancelled);
        };
        save_snapshot_to_path(snapshot, &path).await?;
        info!(path = %path.display(), "snapshot written");
        Ok(Selection::Chosen(SavedLocation::File(path)))
    }

    async fn load_interactive(&self) -> Result<Selection<Snapshot>, CoreError> {
        let Some(path) = ask(&self.dialog, |dialog| dialog.pick_open_path()).await? else {
            return Ok(Selection::Cancelled);
        };
        let snapshot = load_snapshot_from_path(&path).await?;
        Ok(Selection::Chosen(snapshot))
    }
}

fn canonical_name(name: &str) -> String {
    let sanitized: String = name
        .trim()
        .to_lowercase()
        .chars()
        .map(|c| match c {
            'a'..='z' | '0'..='9' | '-' => c,
            _ => '_',
        })
        .collect();
    if sanitized.trim_matches(|c| c == '_' || c == '-').is_empty() {
        "backup".into()
    } else {
        sanitized
    }
}

fn archive_stamp<'a>(file_name: &'a str, prefix: &str) -> Option<&'a str> {
    let stem = file_name.strip_suffix(&format!(".{}", BACKUP_EXTENSION))?;
    let stamp = stem.strip_prefix(prefix)?;
    let well_formed = stamp.len() == ARCHIVE_STAMP_LEN
        && stamp
            .chars()
            .enumerate()
            .all(|(idx, c)| if idx == 8 || idx == 15 { c == '-' } else { c.is_ascii_digit() });
    well_formed.then_some(stamp)
}

fn parse_archive_stamp(stamp: &str) -> Option<DateTime<Utc>> {
    NaiveDateTime::parse_from_str(stamp.get(..15)?, "%Y%m%d-%H%M%S")
        .ok()
        .map(|naive| DateTime::from_naive_utc_and_offset(naive, Utc))
}
