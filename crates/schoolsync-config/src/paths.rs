use std::{env, path::Path, path::PathBuf};

const DEFAULT_DIR_NAME: &str = "schoolsync";
const FALLBACK_DIR_NAME: &str = ".schoolsync";
const HOME_ENV: &str = "SCHOOLSYNC_HOME";
const CONFIG_DIR: &str = "config";
const BACKUP_DIR: &str = "backups";
const LOCAL_STORE_FILE: &str = "local-storage.json";
const REMOTE_DIR: &str = "remote";

/// Returns the application-private data directory.
///
/// `SCHOOLSYNC_HOME` wins, then the platform data directory, then `./.schoolsync`.
pub fn app_data_dir() -> PathBuf {
    if let Some(custom) = env::var_os(HOME_ENV) {
        return PathBuf::from(custom);
    }
    dirs::data_dir()
        .map(|dir| dir.join(DEFAULT_DIR_NAME))
        .unwrap_or_else(|| PathBuf::from(".").join(FALLBACK_DIR_NAME))
}

pub fn config_dir_in(base: &Path) -> PathBuf {
    base.join(CONFIG_DIR)
}

/// Directory holding the auto-backup slot and its dated archives.
pub fn backups_dir_in(base: &Path) -> PathBuf {
    base.join(BACKUP_DIR)
}

pub fn local_store_file_in(base: &Path) -> PathBuf {
    base.join(LOCAL_STORE_FILE)
}

pub fn remote_dir_in(base: &Path) -> PathBuf {
    base.join(REMOTE_DIR)
}

/// Where browser-style downloads land.
pub fn downloads_dir() -> PathBuf {
    dirs::download_dir()
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}
