use chrono::{TimeZone, Utc};
use schoolsync_config::{BackendPreference, Config, ConfigManager, Preferences};
use std::fs;
use tempfile::tempdir;

#[test]
fn missing_files_load_defaults() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");

    assert_eq!(manager.load().unwrap(), Config::default());
    assert_eq!(manager.load_preferences().unwrap(), Preferences::default());
    assert!(manager.config_path().starts_with(dir.path().join("config")));
}

#[test]
fn preferences_persist_between_managers() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");
    let prefs = Preferences {
        auto_save_enabled: false,
        last_backup: Some(Utc.with_ymd_and_hms(2025, 11, 3, 10, 15, 0).unwrap()),
    };
    manager.save_preferences(&prefs).expect("save preferences");

    let reopened = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");
    assert_eq!(reopened.load_preferences().unwrap(), prefs);
}

#[test]
fn config_round_trips_custom_values() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");
    let config = Config {
        backend: BackendPreference::LocalStore,
        auto_save_interval_secs: 90,
        remote_root: Some(dir.path().join("dumps")),
        ..Config::default()
    };
    manager.save(&config).expect("save config");

    let raw = fs::read_to_string(manager.config_path()).unwrap();
    assert!(raw.contains("\"local-store\""));
    assert_eq!(manager.load().unwrap(), config);
}

#[test]
fn corrupt_preferences_are_reported() {
    let dir = tempdir().expect("tempdir");
    let manager = ConfigManager::with_base_dir(dir.path().to_path_buf()).expect("manager");
    fs::write(manager.preferences_path(), "{ not json").unwrap();

    let err = manager.load_preferences().unwrap_err();
    assert!(err.to_string().starts_with("Serialization error"));
}
