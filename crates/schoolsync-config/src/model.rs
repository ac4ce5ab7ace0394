use chrono::{DateTime, Utc};
use serde::{de::Deserializer, Deserialize, Serialize};
use std::{
    fmt,
    path::{Path, PathBuf},
};

use crate::paths;

/// Installation settings for the backup subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendPreference,
    #[serde(default = "Config::default_auto_save_interval_secs")]
    pub auto_save_interval_secs: u64,
    #[serde(default = "Config::default_retention")]
    pub retention: usize,
    #[serde(default = "Config::default_sync_tolerance_secs")]
    pub sync_tolerance_secs: u64,
    #[serde(default = "Config::default_local_store_quota_bytes")]
    pub local_store_quota_bytes: usize,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Directory of the table dumps used as remote store. Defaults to `<app dir>/remote`.
    pub remote_root: Option<PathBuf>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    /// Target of browser-style downloads. Defaults to the user's download folder.
    pub downloads_dir: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend: BackendPreference::default(),
            auto_save_interval_secs: Self::default_auto_save_interval_secs(),
            retention: Self::default_retention(),
            sync_tolerance_secs: Self::default_sync_tolerance_secs(),
            local_store_quota_bytes: Self::default_local_store_quota_bytes(),
            remote_root: None,
            downloads_dir: None,
        }
    }
}

impl Config {
    pub fn default_auto_save_interval_secs() -> u64 {
        5 * 60
    }

    pub fn default_retention() -> usize {
        30
    }

    pub fn default_sync_tolerance_secs() -> u64 {
        60
    }

    pub fn default_local_store_quota_bytes() -> usize {
        5 * 1024 * 1024
    }

    pub fn resolve_remote_root(&self, base: &Path) -> PathBuf {
        self.remote_root
            .clone()
            .unwrap_or_else(|| paths::remote_dir_in(base))
    }

    pub fn resolve_downloads_dir(&self) -> PathBuf {
        self.downloads_dir.clone().unwrap_or_else(paths::downloads_dir)
    }
}

/// Which storage backend to build at startup.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BackendPreference {
    Auto,
    Filesystem,
    LocalStore,
}

impl BackendPreference {
    fn from_value(value: Option<String>) -> Self {
        value
            .map(|v| BackendPreference::from_str(v.trim()))
            .unwrap_or_default()
    }

    pub fn from_str(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "filesystem" | "desktop" => BackendPreference::Filesystem,
            "local-store" | "localstore" | "browser" => BackendPreference::LocalStore,
            _ => BackendPreference::Auto,
        }
    }
}

impl Default for BackendPreference {
    fn default() -> Self {
        BackendPreference::Auto
    }
}

impl fmt::Display for BackendPreference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            BackendPreference::Auto => "auto",
            BackendPreference::Filesystem => "filesystem",
            BackendPreference::LocalStore => "local-store",
        };
        f.write_str(label)
    }
}

impl<'de> Deserialize<'de> for BackendPreference {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(BackendPreference::from_value(value))
    }
}

/// Backup preferences changed by the user toggle and by successful saves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Preferences {
    #[serde(default = "Preferences::default_auto_save_enabled")]
    pub auto_save_enabled: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_backup: Option<DateTime<Utc>>,
}

impl Preferences {
    pub fn default_auto_save_enabled() -> bool {
        true
    }
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            auto_save_enabled: Self::default_auto_save_enabled(),
            last_backup: None,
        }
    }
}
