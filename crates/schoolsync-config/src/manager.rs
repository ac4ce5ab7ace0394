use std::{
    fs::{self, File},
    io::Write,
    path::{Path, PathBuf},
};

use serde::{de::DeserializeOwned, Serialize};

use crate::{paths, Config, ConfigError, Preferences};

const CONFIG_FILE: &str = "config.json";
const PREFERENCES_FILE: &str = "preferences.json";
const TMP_SUFFIX: &str = "tmp";

/// Handles persistence for [`Config`] and [`Preferences`].
#[derive(Debug, Clone)]
pub struct ConfigManager {
    base_dir: PathBuf,
    config_path: PathBuf,
    preferences_path: PathBuf,
}

impl ConfigManager {
    /// Manager rooted at [`paths::app_data_dir`].
    pub fn new() -> Result<Self, ConfigError> {
        Self::with_base_dir(paths::app_data_dir())
    }

    pub fn with_base_dir(base: PathBuf) -> Result<Self, ConfigError> {
        fs::create_dir_all(&base)?;
        let config_dir = paths::config_dir_in(&base);
        fs::create_dir_all(&config_dir)?;
        Ok(Self {
            config_path: config_dir.join(CONFIG_FILE),
            preferences_path: config_dir.join(PREFERENCES_FILE),
            base_dir: base,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn preferences_path(&self) -> &Path {
        &self.preferences_path
    }

    pub fn load(&self) -> Result<Config, ConfigError> {
        read_or_default(&self.config_path)
    }

    pub fn save(&self, config: &Config) -> Result<(), ConfigError> {
        write_json(&self.config_path, config)
    }

    pub fn load_preferences(&self) -> Result<Preferences, ConfigError> {
        read_or_default(&self.preferences_path)
    }

    pub fn save_preferences(&self, preferences: &Preferences) -> Result<(), ConfigError> {
        write_json(&self.preferences_path, preferences)
    }
}

fn read_or_default<T>(path: &Path) -> Result<T, ConfigError>
where
    T: DeserializeOwned + Default,
{
    if path.exists() {
        let data = fs::read_to_string(path)?;
        serde_json::from_str(&data).map_err(|err| ConfigError::Serde(err.to_string()))
    } else {
        Ok(T::default())
    }
}

fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let json =
        serde_json::to_string_pretty(value).map_err(|err| ConfigError::Serde(err.to_string()))?;
    let tmp = tmp_path(path);
    write_atomic(&tmp, &json)?;
    fs::rename(&tmp, path)?;
    Ok(())
}

fn tmp_path(path: &Path) -> PathBuf {
    let mut tmp = path.to_path_buf();
    let ext = match path.extension().and_then(|ext| ext.to_str()) {
        Some(existing) => format!("{}.{}", existing, TMP_SUFFIX),
        None => TMP_SUFFIX.to_string(),
    };
    tmp.set_extension(ext);
    tmp
}

fn write_atomic(path: &Path, data: &str) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let mut file = File::create(path)?;
    file.write_all(data.as_bytes())?;
    file.flush()?;
    Ok(())
}
