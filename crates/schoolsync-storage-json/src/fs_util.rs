use std::{
    ffi::OsString,
    io,
    path::{Path, PathBuf},
    process,
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc,
    },
};

use schoolsync_core::CoreError;
use schoolsync_domain::Snapshot;
use tokio::{fs, io::AsyncWriteExt};

use crate::FileDialog;

const TMP_SUFFIX: &str = "tmp";

static STAGING_SEQ: AtomicU64 = AtomicU64::new(0);

/// Staging file next to `path`, unique per call so overlapping writers of the
/// same target never share one.
pub(crate) fn tmp_path(path: &Path) -> PathBuf {
    let seq = STAGING_SEQ.fetch_add(1, Ordering::Relaxed);
    let mut name = path.file_name().map(OsString::from).unwrap_or_default();
    name.push(format!(".{}.{}.{}", process::id(), seq, TMP_SUFFIX));
    path.with_file_name(name)
}

/// Stages `data` next to `path` and renames it into place.
pub(crate) async fn write_atomic(path: &Path, data: &str) -> io::Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).await?;
    }
    let tmp = tmp_path(path);
    let staged = async {
        let mut file = fs::File::create(&tmp).await?;
        file.write_all(data.as_bytes()).await?;
        file.flush().await?;
        drop(file);
        fs::rename(&tmp, path).await
    }
    .await;
    if staged.is_err() {
        let _ = fs::remove_file(&tmp).await;
    }
    staged
}

pub(crate) async fn save_snapshot_to_path(snapshot: &Snapshot, path: &Path) -> Result<(), CoreError> {
    let json = snapshot.to_json_pretty()?;
    write_atomic(path, &json).await?;
    Ok(())
}

pub(crate) async fn load_snapshot_from_path(path: &Path) -> Result<Snapshot, CoreError> {
    let data = fs::read_to_string(path).await?;
    Ok(Snapshot::from_json(&data)?)
}

/// Runs a blocking dialog prompt off the async executor.
pub(crate) async fn ask<F>(dialog: &Arc<dyn FileDialog>, prompt: F) -> Result<Option<PathBuf>, CoreError>
where
    F: FnOnce(&dyn FileDialog) -> io::Result<Option<PathBuf>> + Send + 'static,
{
    let dialog = Arc::clone(dialog);
    let answer = tokio::task::spawn_blocking(move || prompt(dialog.as_ref()))
        .await
        .map_err(|err| CoreError::Storage(format!("file dialog task failed: {err}")))??;
    Ok(answer)
}
