use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::config::{app_config_path, config_env_dirs, ConfigPathError, APP_DIR};
use crate::geometry::Color;

mod registry;

pub use registry::{
    resolve, BaseLayer, IconSet, MarkerCategory, ThemeSpec, TileLayer, ToolIcons,
    SATELLITE_TILES, STREET_TILES, TOOL_ICONS,
};

const THEME_CONFIG_FILE: &str = "theme.json";

pub type ThemeResult<T> = std::result::Result<T, ThemeError>;

/// Game-inspired visual skin. Has no effect on geometry or text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum ThemeId {
    #[default]
    #[serde(rename = "GTA5")]
    Gta5,
    #[serde(rename = "RDR2")]
    Rdr2,
    #[serde(rename = "RDR")]
    Rdr,
    #[serde(rename = "Cyberpunk2077", alias = "CYBERPUNK")]
    Cyberpunk2077,
}

impl ThemeId {
    pub const ALL: [ThemeId; 4] = [Self::Gta5, Self::Rdr2, Self::Rdr, Self::Cyberpunk2077];

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Gta5 => "GTA5",
            Self::Rdr2 => "RDR2",
            Self::Rdr => "RDR",
            Self::Cyberpunk2077 => "Cyberpunk2077",
        }
    }

    /// Lookup that fails closed to the default theme.
    pub fn parse_or_default(value: &str) -> Self {
        value.parse().unwrap_or_else(|err| {
            tracing::warn!(%err, "falling back to default theme");
            Self::default()
        })
    }

    pub fn spec(self) -> &'static ThemeSpec {
        resolve(self)
    }
}

impl std::fmt::Display for ThemeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ThemeId {
    type Err = ThemeError;

    fn from_str(value: &str) -> ThemeResult<Self> {
        let normalized = value.trim().to_ascii_uppercase();
        match normalized.as_str() {
            "GTA5" | "GTA" => Ok(Self::Gta5),
            "RDR2" => Ok(Self::Rdr2),
            "RDR" => Ok(Self::Rdr),
            "CYBERPUNK2077" | "CYBERPUNK" => Ok(Self::Cyberpunk2077),
            _ => Err(ThemeError::UnknownTheme(value.to_string())),
        }
    }
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("unknown theme: {0}")]
    UnknownTheme(String),
    #[error("unknown base layer: {0}")]
    UnknownLayer(String),
    #[error("missing HOME environment variable")]
    MissingHomeDirectory,
    #[error("failed to read theme config: {path}")]
    ReadConfig { path: PathBuf, source: io::Error },
    #[error("failed to write theme config: {path}")]
    WriteConfig { path: PathBuf, source: io::Error },
    #[error("failed to parse theme config")]
    ParseConfig(#[from] serde_json::Error),
}

/// Stroke parameters for a polyline or circle outline.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LineStyle {
    pub color: Color,
    pub weight: u8,
    pub opacity: f32,
    pub dash: Option<&'static str>,
}

impl LineStyle {
    pub const fn solid(color: Color, weight: u8, opacity: f32) -> Self {
        Self {
            color,
            weight,
            opacity,
            dash: None,
        }
    }

    pub const fn dashed(color: Color, weight: u8, opacity: f32, dash: &'static str) -> Self {
        Self {
            color,
            weight,
            opacity,
            dash: Some(dash),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ThemeConfig {
    // Stored as a string so an unknown id still loads and falls back.
    theme: String,
}

pub fn load_theme_preference() -> ThemeResult<ThemeId> {
    let (xdg_config_home, home) = config_env_dirs();
    load_theme_preference_with(xdg_config_home.as_deref(), home.as_deref())
}

pub(crate) fn load_theme_preference_with(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> ThemeResult<ThemeId> {
    let path = theme_config_path_with(xdg_config_home, home)?;
    if !path.exists() {
        return Ok(ThemeId::default());
    }

    let serialized = fs::read_to_string(&path).map_err(|source| ThemeError::ReadConfig {
        path: path.clone(),
        source,
    })?;
    let config: ThemeConfig = serde_json::from_str(&serialized)?;
    Ok(ThemeId::parse_or_default(&config.theme))
}

pub(crate) fn save_theme_preference_with(
    theme: ThemeId,
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> ThemeResult<()> {
    let path = theme_config_path_with(xdg_config_home, home)?;

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(|source| ThemeError::WriteConfig {
            path: path.clone(),
            source,
        })?;
    }

    let config = ThemeConfig {
        theme: theme.as_str().to_string(),
    };
    let serialized = serde_json::to_string_pretty(&config)?;
    fs::write(&path, serialized).map_err(|source| ThemeError::WriteConfig {
        path: path.clone(),
        source,
    })?;
    tracing::info!(%theme, "saved theme preference");
    Ok(())
}

fn theme_config_path_with(
    xdg_config_home: Option<&Path>,
    home: Option<&Path>,
) -> ThemeResult<PathBuf> {
    app_config_path(APP_DIR, THEME_CONFIG_FILE, xdg_config_home, home).map_err(|error| {
        match error {
            ConfigPathError::MissingHomeDirectory => ThemeError::MissingHomeDirectory,
        }
    })
}
