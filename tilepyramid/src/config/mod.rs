//! Configuration for tilepyramid components.
//!
//! - [`ConfigFile`] reads `~/.tilepyramid/config.ini`
//! - [`DownloadConfig`] carries pipeline concurrency and retry settings

mod download;
mod file;

pub use download::{
    DownloadConfig, DEFAULT_CHANNEL_CAPACITY, DEFAULT_INITIAL_BACKOFF_MS, DEFAULT_MAX_ATTEMPTS,
    DEFAULT_MAX_BACKOFF_MS, DEFAULT_WORKERS,
};
pub use file::{
    config_directory, config_file_path, ConfigFile, ConfigFileError, DownloadSettings,
    GridSettings, SourceSettings,
};
