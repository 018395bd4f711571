use std::fs;
use std::path::{Path, PathBuf};

use camino::Utf8PathBuf;
use directories::BaseDirs;
use serde::{Deserialize, Serialize};

use crate::domain::{ConcurrencyLimit, Quality};
use crate::error::ScryError;
use crate::store::Store;

pub const LOCAL_CONFIG_FILE: &str = "scry-dl.json";

#[derive(Debug, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub schema_version: Option<u32>,
    #[serde(default)]
    pub download_dir: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
    #[serde(default)]
    pub workers: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Settings {
    pub schema_version: u32,
    pub download_dir: Utf8PathBuf,
    pub quality: Quality,
    pub workers: ConcurrencyLimit,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            schema_version: 1,
            download_dir: default_download_dir(),
            quality: Quality::default(),
            workers: ConcurrencyLimit::default(),
        }
    }
}

/// Per-invocation values that win over the config file.
#[derive(Debug, Clone, Default)]
pub struct SettingsOverrides {
    pub download_dir: Option<Utf8PathBuf>,
    pub quality: Option<Quality>,
    pub workers: Option<ConcurrencyLimit>,
}

impl Settings {
    pub fn apply(mut self, overrides: &SettingsOverrides) -> Self {
        if let Some(dir) = &overrides.download_dir {
            self.download_dir = dir.clone();
        }
        if let Some(quality) = overrides.quality {
            self.quality = quality;
        }
        if let Some(workers) = overrides.workers {
            self.workers = workers;
        }
        self
    }

    fn to_config(&self) -> Config {
        Config {
            schema_version: Some(self.schema_version),
            download_dir: Some(self.download_dir.to_string()),
            quality: Some(self.quality.to_string()),
            workers: Some(self.workers.get()),
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Explicit path, then `./scry-dl.json`, then the per-user config file.
    pub fn locate(path: Option<&str>) -> PathBuf {
        if let Some(path) = path {
            return PathBuf::from(path);
        }
        let local = PathBuf::from(LOCAL_CONFIG_FILE);
        if local.exists() {
            return local;
        }
        user_config_path().unwrap_or(local)
    }

    /// A missing file is not an error; settings fall back to defaults.
    pub fn resolve(path: Option<&str>) -> Result<Settings, ScryError> {
        let config_path = Self::locate(path);
        if !config_path.exists() {
            if path.is_some() {
                return Err(ScryError::ConfigRead(config_path));
            }
            return Ok(Settings::default());
        }

        let content = fs::read_to_string(&config_path)
            .map_err(|_| ScryError::ConfigRead(config_path.clone()))?;
        let config: Config = serde_json::from_str(&content)
            .map_err(|err| ScryError::ConfigParse(err.to_string()))?;

        Self::resolve_config(config)
    }

    pub fn resolve_config(config: Config) -> Result<Settings, ScryError> {
        let defaults = Settings::default();
        let quality = config
            .quality
            .map(|value| value.parse::<Quality>())
            .transpose()?
            .unwrap_or(defaults.quality);
        let workers = config
            .workers
            .map(ConcurrencyLimit::try_from)
            .transpose()?
            .unwrap_or(defaults.workers);
        let download_dir = config
            .download_dir
            .filter(|dir| !dir.trim().is_empty())
            .map(|dir| Utf8PathBuf::from(dir.trim()))
            .unwrap_or(defaults.download_dir);

        Ok(Settings {
            schema_version: config.schema_version.unwrap_or(defaults.schema_version),
            download_dir,
            quality,
            workers,
        })
    }

    pub fn save(path: &Path, settings: &Settings) -> Result<(), ScryError> {
        let target = Utf8PathBuf::from_path_buf(path.to_path_buf())
            .map_err(|_| ScryError::Filesystem("config path is not valid UTF-8".to_string()))?;
        let content = serde_json::to_vec_pretty(&settings.to_config())
            .map_err(|err| ScryError::Filesystem(err.to_string()))?;
        Store::write_bytes_atomic(&target, &content)
    }
}

pub fn default_download_dir() -> Utf8PathBuf {
    Utf8PathBuf::from("./downloads")
}

fn user_config_path() -> Option<PathBuf> {
    BaseDirs::new().map(|dirs| dirs.config_dir().join("scry-dl").join("config.json"))
}
