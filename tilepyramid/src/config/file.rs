//! Configuration file handling for ~/.tilepyramid/config.ini.
//!
//! Missing files and missing keys fall back to defaults; present keys are
//! validated and rejected with [`ConfigFileError::InvalidValue`].

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use ini::Ini;
use thiserror::Error;

use super::download::{
    DownloadConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_BACKOFF_MS, DEFAULT_WORKERS,
};
use crate::coord::{EdgeClip, TileGrid, DEFAULT_MAX_TILES, DEFAULT_MAX_ZOOM, DEFAULT_TILE_SIZE};
use crate::provider::{
    default_user_agent, UrlTemplate, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_URL_TEMPLATE,
};

/// Configuration file errors.
#[derive(Debug, Error)]
pub enum ConfigFileError {
    /// Failed to read or parse the config file
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] ini::Error),

    /// Failed to write config file
    #[error("Failed to write config file: {0}")]
    WriteError(#[source] std::io::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {section}.{key} = '{value}' - {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// Failed to create config directory
    #[error("Failed to create config directory: {0}")]
    DirectoryError(#[source] std::io::Error),
}

/// `[source]` section.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSettings {
    pub url_template: String,
    /// Per-request timeout in seconds
    pub timeout: u64,
    pub user_agent: String,
}

/// `[download]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DownloadSettings {
    pub workers: usize,
    pub max_attempts: u32,
    pub initial_backoff_ms: u64,
    pub max_backoff_ms: u64,
    pub channel_capacity: usize,
    /// Largest tile count a single build may request
    pub max_tiles: usize,
}

/// `[grid]` section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridSettings {
    pub tile_size: u32,
    pub max_zoom: u8,
    pub edge_clip: EdgeClip,
}

/// Contents of `config.ini`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConfigFile {
    pub source: SourceSettings,
    pub download: DownloadSettings,
    pub grid: GridSettings,
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_URL_TEMPLATE.to_string(),
            timeout: DEFAULT_HTTP_TIMEOUT_SECS,
            user_agent: default_user_agent().to_string(),
        }
    }
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            initial_backoff_ms: DEFAULT_INITIAL_BACKOFF_MS,
            max_backoff_ms: DEFAULT_MAX_BACKOFF_MS,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            max_tiles: DEFAULT_MAX_TILES,
        }
    }
}

impl Default for GridSettings {
    fn default() -> Self {
        Self {
            tile_size: DEFAULT_TILE_SIZE,
            max_zoom: DEFAULT_MAX_ZOOM,
            edge_clip: EdgeClip::default(),
        }
    }
}

impl ConfigFile {
    /// Load configuration from the default path (~/.tilepyramid/config.ini).
    pub fn load() -> Result<Self, ConfigFileError> {
        Self::load_from(&config_file_path())
    }

    /// Load configuration from a specific path.
    ///
    /// If the file doesn't exist, returns defaults.
    pub fn load_from(path: &Path) -> Result<Self, ConfigFileError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let ini = Ini::load_from_file(path)?;
        parse_ini(&ini)
    }

    /// Save configuration to a specific path, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigFileError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(ConfigFileError::DirectoryError)?;
        }

        let mut ini = Ini::new();
        ini.with_section(Some("source"))
            .set("url_template", self.source.url_template.as_str())
            .set("timeout", self.source.timeout.to_string())
            .set("user_agent", self.source.user_agent.as_str());
        ini.with_section(Some("download"))
            .set("workers", self.download.workers.to_string())
            .set("max_attempts", self.download.max_attempts.to_string())
            .set("initial_backoff_ms", self.download.initial_backoff_ms.to_string())
            .set("max_backoff_ms", self.download.max_backoff_ms.to_string())
            .set("channel_capacity", self.download.channel_capacity.to_string())
            .set("max_tiles", self.download.max_tiles.to_string());
        ini.with_section(Some("grid"))
            .set("tile_size", self.grid.tile_size.to_string())
            .set("max_zoom", self.grid.max_zoom.to_string())
            .set("edge_clip", self.grid.edge_clip.as_str());

        ini.write_to_file(path).map_err(ConfigFileError::WriteError)
    }

    /// Pipeline settings derived from `[download]`.
    pub fn download_config(&self) -> DownloadConfig {
        DownloadConfig::new()
            .with_workers(self.download.workers)
            .with_channel_capacity(self.download.channel_capacity)
            .with_backoff(
                self.download.max_attempts,
                Duration::from_millis(self.download.initial_backoff_ms),
                Duration::from_millis(self.download.max_backoff_ms),
            )
    }

    /// Tile grid derived from `[grid]`.
    pub fn tile_grid(&self) -> Result<TileGrid, ConfigFileError> {
        TileGrid::new(self.grid.tile_size, self.grid.max_zoom).map_err(|e| {
            ConfigFileError::InvalidValue {
                section: "grid".to_string(),
                key: "tile_size/max_zoom".to_string(),
                value: format!("{}/{}", self.grid.tile_size, self.grid.max_zoom),
                reason: e.to_string(),
            }
        })
    }
}

/// Get the path to the config directory (~/.tilepyramid).
pub fn config_directory() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".tilepyramid")
}

/// Get the path to the config file (~/.tilepyramid/config.ini).
pub fn config_file_path() -> PathBuf {
    config_directory().join("config.ini")
}

fn invalid(section: &str, key: &str, value: &str, reason: impl Into<String>) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn parse_number<T: FromStr + PartialOrd + Copy + std::fmt::Display>(
    section: &str,
    key: &str,
    value: &str,
    min: T,
) -> Result<T, ConfigFileError> {
    match value.trim().parse::<T>() {
        Ok(n) if n >= min => Ok(n),
        _ => Err(invalid(
            section,
            key,
            value,
            format!("expected an integer >= {}", min),
        )),
    }
}

fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    if let Some(section) = ini.section(Some("source")) {
        if let Some(v) = section.get("url_template") {
            let v = v.trim();
            UrlTemplate::parse(v)
                .map_err(|e| invalid("source", "url_template", v, e.to_string()))?;
            config.source.url_template = v.to_string();
        }
        if let Some(v) = section.get("timeout") {
            config.source.timeout = parse_number("source", "timeout", v, 1u64)?;
        }
        if let Some(v) = section.get("user_agent") {
            let v = v.trim();
            if !v.is_empty() {
                config.source.user_agent = v.to_string();
            }
        }
    }

    if let Some(section) = ini.section(Some("download")) {
        let d = &mut config.download;
        if let Some(v) = section.get("workers") {
            d.workers = parse_number("download", "workers", v, 1usize)?;
        }
        if let Some(v) = section.get("max_attempts") {
            d.max_attempts = parse_number("download", "max_attempts", v, 1u32)?;
        }
        if let Some(v) = section.get("initial_backoff_ms") {
            d.initial_backoff_ms = parse_number("download", "initial_backoff_ms", v, 0u64)?;
        }
        if let Some(v) = section.get("max_backoff_ms") {
            d.max_backoff_ms = parse_number("download", "max_backoff_ms", v, 0u64)?;
        }
        if let Some(v) = section.get("channel_capacity") {
            d.channel_capacity = parse_number("download", "channel_capacity", v, 1usize)?;
        }
        if let Some(v) = section.get("max_tiles") {
            d.max_tiles = parse_number("download", "max_tiles", v, 1usize)?;
        }
        if d.max_backoff_ms < d.initial_backoff_ms {
            return Err(invalid(
                "download",
                "max_backoff_ms",
                &d.max_backoff_ms.to_string(),
                "must not be smaller than initial_backoff_ms",
            ));
        }
    }

    if let Some(section) = ini.section(Some("grid")) {
        if let Some(v) = section.get("tile_size") {
            config.grid.tile_size = parse_number("grid", "tile_size", v, 1u32)?;
        }
        if let Some(v) = section.get("max_zoom") {
            config.grid.max_zoom = parse_number("grid", "max_zoom", v, 0u8)?;
        }
        if let Some(v) = section.get("edge_clip") {
            config.grid.edge_clip = EdgeClip::from_config_str(v.trim())
                .ok_or_else(|| invalid("grid", "edge_clip", v, "must be 'exact' or 'inclusive'"))?;
        }
        config.tile_grid()?;
    }

    Ok(config)
}
