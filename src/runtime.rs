use std::{env, sync::Arc, time::Duration};

use schoolsync_config::{paths, BackendPreference, Config, ConfigManager};
use schoolsync_core::{
    BackendKind, BackupService, Clock, RemoteStore, SnapshotTransfer, StorageBackend, SyncPolicy,
    SystemClock,
};
use schoolsync_storage_json::{
    DirectoryRemoteStore, FileDialog, FileKeyValueStore, FilesystemBackend, LocalStoreBackend,
};
use tracing::info;

use crate::{
    context::{MAX_AUTO_SAVE_INTERVAL, MIN_AUTO_SAVE_INTERVAL},
    AppError,
};

const RUNTIME_ENV: &str = "SCHOOLSYNC_RUNTIME";

/// Host the process runs in; decides the default storage backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeEnvironment {
    Desktop,
    Browser,
}

impl RuntimeEnvironment {
    /// Reads `SCHOOLSYNC_RUNTIME`; anything but `browser`/`web` is the desktop shell.
    pub fn detect() -> Self {
        match env::var(RUNTIME_ENV) {
            Ok(value) if matches!(value.trim().to_ascii_lowercase().as_str(), "browser" | "web") => {
                RuntimeEnvironment::Browser
            }
            _ => RuntimeEnvironment::Desktop,
        }
    }

    pub fn backend_kind(self, preference: BackendPreference) -> BackendKind {
        match (preference, self) {
            (BackendPreference::Filesystem, _) => BackendKind::Filesystem,
            (BackendPreference::LocalStore, _) => BackendKind::LocalStore,
            (BackendPreference::Auto, RuntimeEnvironment::Desktop) => BackendKind::Filesystem,
            (BackendPreference::Auto, RuntimeEnvironment::Browser) => BackendKind::LocalStore,
        }
    }
}

/// Everything the front end needs, wired once at startup.
pub struct AppServices {
    pub config_manager: ConfigManager,
    pub config: Config,
    pub service: BackupService,
    pub backend_kind: BackendKind,
    /// Present when the filesystem backend is active, for archive listings.
    pub filesystem: Option<FilesystemBackend>,
    pub clock: Arc<dyn Clock>,
}

impl AppServices {
    /// Wires services against the directory-backed remote store from the configuration.
    pub fn from_environment(
        config_manager: ConfigManager,
        dialog: Arc<dyn FileDialog>,
    ) -> Result<Self, AppError> {
        let config = config_manager.load()?;
        let remote = DirectoryRemoteStore::new(config.resolve_remote_root(config_manager.base_dir()));
        Self::build(
            config_manager,
            Arc::new(remote),
            dialog,
            RuntimeEnvironment::detect(),
        )
    }

    pub fn build(
        config_manager: ConfigManager,
        remote: Arc<dyn RemoteStore>,
        dialog: Arc<dyn FileDialog>,
        environment: RuntimeEnvironment,
    ) -> Result<Self, AppError> {
        let config = config_manager.load()?;
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);
        let backend_kind = environment.backend_kind(config.backend);
        let base = config_manager.base_dir().to_path_buf();

        let (backend, filesystem): (Arc<dyn StorageBackend>, Option<FilesystemBackend>) =
            match backend_kind {
                BackendKind::Filesystem => {
                    let fs_backend = FilesystemBackend::with_retention(
                        paths::backups_dir_in(&base),
                        dialog,
                        Arc::clone(&clock),
                        config.retention,
                    )?;
                    (Arc::new(fs_backend.clone()), Some(fs_backend))
                }
                BackendKind::LocalStore => {
                    let store = FileKeyValueStore::open(
                        paths::local_store_file_in(&base),
                        config.local_store_quota_bytes,
                    )?;
                    let backend = LocalStoreBackend::new(
                        Arc::new(store),
                        config.resolve_downloads_dir(),
                        dialog,
                        Arc::clone(&clock),
                    );
                    (Arc::new(backend), None)
                }
            };
        info!(backend = %backend_kind, ?environment, "storage backend selected");

        let transfer = SnapshotTransfer::new(remote, Arc::clone(&clock));
        let policy = SyncPolicy::with_tolerance_secs(config.sync_tolerance_secs);
        let service = BackupService::new(transfer, backend, Arc::clone(&clock), policy);

        Ok(Self {
            config_manager,
            config,
            service,
            backend_kind,
            filesystem,
            clock,
        })
    }

    pub fn auto_save_interval(&self) -> Duration {
        auto_save_period(self.config.auto_save_interval_secs)
    }
}

fn auto_save_period(secs: u64) -> Duration {
    Duration::from_secs(secs).clamp(MIN_AUTO_SAVE_INTERVAL, MAX_AUTO_SAVE_INTERVAL)
}
