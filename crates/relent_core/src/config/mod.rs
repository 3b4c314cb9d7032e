use crate::error::AppError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

const CONFIG_FILE_NAME: &str = "config.json";
const CONFIG_ENV_VAR: &str = "RELENT_CONFIG_PATH";

/// Poll period of the reminder scheduler when nothing is configured.
pub const DEFAULT_TICK_INTERVAL_SECS: u64 = 10;

#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub tick_interval_secs: Option<u64>,
    #[serde(default)]
    pub notifications: Option<bool>,
    #[serde(default)]
    pub store_dir: Option<PathBuf>,
}

impl Config {
    pub fn tick_interval(&self) -> Duration {
        Duration::from_secs(
            self.tick_interval_secs
                .unwrap_or(DEFAULT_TICK_INTERVAL_SECS),
        )
    }

    pub fn notifications_enabled(&self) -> bool {
        self.notifications.unwrap_or(true)
    }

    pub fn validate(&self) -> Result<(), AppError> {
        if self.tick_interval_secs == Some(0) {
            return Err(AppError::invalid_data(
                "tick_interval_secs must be greater than zero",
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConfigLoad {
    pub config: Config,
    pub error: Option<AppError>,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConfigOverrides {
    pub tick_interval_secs: Option<u64>,
    pub notifications: Option<bool>,
    pub store_dir: Option<PathBuf>,
}

pub fn config_path() -> Result<PathBuf, AppError> {
    if let Ok(path) = std::env::var(CONFIG_ENV_VAR)
        && !path.trim().is_empty()
    {
        return Ok(PathBuf::from(path));
    }

    if cfg!(windows) {
        let appdata =
            std::env::var("APPDATA").map_err(|_| AppError::invalid_data("APPDATA is not set"))?;
        Ok(PathBuf::from(appdata)
            .join("relent")
            .join(CONFIG_FILE_NAME))
    } else {
        let home = std::env::var("HOME").map_err(|_| AppError::invalid_data("HOME is not set"))?;
        Ok(PathBuf::from(home)
            .join(".config")
            .join("relent")
            .join(CONFIG_FILE_NAME))
    }
}

pub fn load_config_from_path(path: &Path) -> Result<Config, AppError> {
    if !path.exists() {
        return Ok(Config::default());
    }

    let content = std::fs::read_to_string(path).map_err(|err| AppError::io(err.to_string()))?;
    let config: Config =
        serde_json::from_str(&content).map_err(|err| AppError::invalid_data(err.to_string()))?;
    config.validate()?;
    Ok(config)
}

/// Loads the config, falling back to defaults and reporting (not failing on) a bad file.
pub fn load_config_with_fallback() -> ConfigLoad {
    match config_path() {
        Ok(path) => load_config_with_fallback_from_path(&path),
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

pub fn load_config_with_fallback_from_path(path: &Path) -> ConfigLoad {
    match load_config_from_path(path) {
        Ok(config) => ConfigLoad {
            config,
            error: None,
        },
        Err(err) => ConfigLoad {
            config: Config::default(),
            error: Some(err),
        },
    }
}

pub fn merge_overrides(base: &Config, overrides: &ConfigOverrides) -> Config {
    let mut merged = base.clone();
    if let Some(secs) = overrides.tick_interval_secs {
        merged.tick_interval_secs = Some(secs);
    }
    if let Some(enabled) = overrides.notifications {
        merged.notifications = Some(enabled);
    }
    if let Some(dir) = &overrides.store_dir {
        merged.store_dir = Some(dir.clone());
    }
    merged
}
