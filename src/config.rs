//! Configuration loading
//!
//! Resolution order for each setting:
//! 1. Command-line argument / environment variable (handled by clap in main)
//! 2. TOML config file
//! 3. Compiled default

use crate::error::{Error, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_CONFIG_FILE: &str = "tutor-srs.toml";
pub const DEFAULT_DATABASE_PATH: &str = "tutor-srs.sqlite3";
pub const DEFAULT_LOG_FILTER: &str = "tutor_srs=info";

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub database_path: Option<PathBuf>,
    pub log_filter: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub database_path: PathBuf,
    pub log_filter: String,
}

impl FileConfig {
    /// Reads `path`. A missing file is only an error when it was asked for explicitly.
    pub fn load(path: &Path, required: bool) -> Result<Self> {
        match std::fs::read_to_string(path) {
            Ok(content) => toml::from_str(&content)
                .map_err(|e| Error::Config(format!("{}: {}", path.display(), e))),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound && !required => Ok(Self::default()),
            Err(e) => Err(Error::Config(format!("{}: {}", path.display(), e))),
        }
    }
}

impl Config {
    /// Merges explicit overrides over the config file over the defaults.
    pub fn resolve(
        config_file: Option<&Path>,
        database_path: Option<PathBuf>,
        log_filter: Option<String>,
    ) -> Result<Self> {
        let file = match config_file {
            Some(path) => FileConfig::load(path, true)?,
            None => FileConfig::load(Path::new(DEFAULT_CONFIG_FILE), false)?,
        };

        Ok(Self {
            database_path: database_path
                .or(file.database_path)
                .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH)),
            log_filter: log_filter
                .or(file.log_filter)
                .unwrap_or_else(|| DEFAULT_LOG_FILTER.to_string()),
        })
    }
}
