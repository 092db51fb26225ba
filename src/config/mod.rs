use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::geometry::GeoPoint;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ConfigPathError {
    MissingHomeDirectory,
}

pub(crate) const APP_DIR: &str = "chronomap";
const APP_CONFIG_FILE: &str = "config.json";

const DEFAULT_API_BASE_URL: &str = "http://localhost:5000/api";
const DEFAULT_ROUTING_URL: &str = "https://router.project-osrm.org/route/v1/driving";
const DEFAULT_GEOLOCATION_URL: &str = "http://ip-api.com/json/";
const DEFAULT_GEOCODING_URL: &str = "https://nominatim.openstreetmap.org/search";
const DEFAULT_SHARE_BASE_URL: &str = "http://localhost:5173";
const DEFAULT_TRACKING_INTERVAL_SECS: u64 = 60;
const MIN_TRACKING_INTERVAL_SECS: u64 = 10;
const MAX_TRACKING_INTERVAL_SECS: u64 = 3600;

pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("failed to write config: {path}")]
    WriteConfig { path: PathBuf, source: io::Error },
    #[error("failed to serialize config")]
    Serialize(#[from] serde_json::Error),
}

/// Application-level settings from `config.json`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub api_base_url: String,
    pub tracking_interval_secs: u64,
    pub routing_url: String,
    pub geolocation_url: String,
    pub geocoding_url: String,
    /// Map center used until the first device fix arrives.
    pub fallback_position: GeoPoint,
    pub share_base_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_base_url: DEFAULT_API_BASE_URL.to_string(),
            tracking_interval_secs: DEFAULT_TRACKING_INTERVAL_SECS,
            routing_url: DEFAULT_ROUTING_URL.to_string(),
            geolocation_url: DEFAULT_GEOLOCATION_URL.to_string(),
            geocoding_url: DEFAULT_GEOCODING_URL.to_string(),
            fallback_position: london(),
            share_base_url: DEFAULT_SHARE_BASE_URL.to_string(),
        }
    }
}

impl AppConfig {
    pub fn tracking_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(clamp_tracking_interval(self.tracking_interval_secs))
    }

    pub fn set_tracking_interval_secs(&mut self, secs: u64) {
        self.tracking_interval_secs = clamp_tracking_interval(secs);
    }

    fn normalized(mut self) -> Self {
        self.tracking_interval_secs = clamp_tracking_interval(self.tracking_interval_secs);
        self
    }
}

fn clamp_tracking_interval(secs: u64) -> u64 {
    secs.clamp(MIN_TRACKING_INTERVAL_SECS, MAX_TRACKING_INTERVAL_SECS)
}

const fn london() -> GeoPoint {
    GeoPoint::new_unchecked(51.505, -0.09)
}

pub fn load_app_config() -> AppConfig {
    let (xdg_config_home, home) = config_env_dirs();
    load_app_config_with(xdg_config_home.as_deref(), home.as_deref())
}

pub(crate) fn load_app_config_with(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> AppConfig {
    let path = match app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home) {
        Ok(p) => p,
        Err(_) => return AppConfig::default(),
    };
    if !path.exists() {
        return AppConfig::default();
    }
    match std::fs::read_to_string(&path) {
        Ok(contents) => serde_json::from_str::<AppConfig>(&contents)
            .map(AppConfig::normalized)
            .unwrap_or_else(|err| {
                tracing::warn!(?err, ?path, "failed to parse config.json; using defaults");
                AppConfig::default()
            }),
        Err(err) => {
            tracing::warn!(?err, ?path, "failed to read config.json; using defaults");
            AppConfig::default()
        }
    }
}

pub(crate) fn save_app_config_with(
    config: &AppConfig,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> ConfigResult<()> {
    let path = app_config_path(APP_DIR, APP_CONFIG_FILE, xdg_config_home, home)
        .map_err(|_| ConfigError::MissingHomeDirectory)?;
    write_json(&path, config).map_err(|source| match source {
        WriteJsonError::Io(source) => ConfigError::WriteConfig { path, source },
        WriteJsonError::Serialize(err) => ConfigError::Serialize(err),
    })
}

pub(crate) enum WriteJsonError {
    Io(io::Error),
    Serialize(serde_json::Error),
}

/// Pretty-prints `value` to `path`, creating parent directories first.
pub(crate) fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), WriteJsonError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(WriteJsonError::Io)?;
    }
    let serialized = serde_json::to_string_pretty(value).map_err(WriteJsonError::Serialize)?;
    std::fs::write(path, serialized).map_err(WriteJsonError::Io)
}

pub(crate) fn config_env_dirs() -> (Option<PathBuf>, Option<PathBuf>) {
    (
        std::env::var_os("XDG_CONFIG_HOME").map(PathBuf::from),
        std::env::var_os("HOME").map(PathBuf::from),
    )
}

pub(crate) fn app_config_path(
    app_dir: &str,
    file_name: &str,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    let mut path = config_root(xdg_config_home, home)?;
    path.push(app_dir);
    path.push(file_name);
    Ok(path)
}

fn config_root(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> Result<PathBuf, ConfigPathError> {
    if let Some(xdg) = xdg_config_home.filter(|path| !path.as_os_str().is_empty()) {
        return Ok(xdg.to_path_buf());
    }

    let home = home.ok_or(ConfigPathError::MissingHomeDirectory)?;
    Ok(home.join(".config"))
}
