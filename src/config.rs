use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::app_dirs::AppDirs;

pub const DEFAULT_TARGET: &str = "This is a typing test.";
pub const DEFAULT_TICK_RATE_MS: u64 = 100;

/// Where new target texts come from.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum, strum_macros::Display,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum SourceKind {
    Bundled,
    File,
    Sentences,
    Fixed,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to access config at {}: {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config at {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    pub default_target: String,
    pub source: SourceKind,
    pub quotes_file: Option<PathBuf>,
    pub sentences: usize,
    pub tick_rate_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_target: DEFAULT_TARGET.to_string(),
            source: SourceKind::Bundled,
            quotes_file: None,
            sentences: 2,
            tick_rate_ms: DEFAULT_TICK_RATE_MS,
        }
    }
}

/// Command line values that take precedence over the stored config.
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub prompt: Option<String>,
    pub quotes_file: Option<PathBuf>,
    pub source: Option<SourceKind>,
    pub sentences: Option<usize>,
}

/// Effective settings for one run.
#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub initial_target: String,
    pub source: SourceKind,
    pub quotes_file: Option<PathBuf>,
    pub sentences: usize,
    pub tick_rate_ms: u64,
}

impl Settings {
    /// Merge `overrides` over `config`. Without an explicit source, a quotes
    /// file selects the file source and a prompt selects the fixed source.
    pub fn resolve(config: &Config, overrides: Overrides) -> Self {
        let source = overrides.source.unwrap_or(if overrides.quotes_file.is_some() {
            SourceKind::File
        } else if overrides.prompt.is_some() {
            SourceKind::Fixed
        } else {
            config.source
        });

        Self {
            initial_target: overrides
                .prompt
                .unwrap_or_else(|| config.default_target.clone()),
            source,
            quotes_file: overrides.quotes_file.or_else(|| config.quotes_file.clone()),
            sentences: overrides.sentences.unwrap_or(config.sentences),
            tick_rate_ms: config.tick_rate_ms.max(1),
        }
    }
}

impl From<&Settings> for Config {
    fn from(settings: &Settings) -> Self {
        Self {
            default_target: settings.initial_target.clone(),
            source: settings.source,
            quotes_file: settings.quotes_file.clone(),
            sentences: settings.sentences,
            tick_rate_ms: settings.tick_rate_ms,
        }
    }
}

pub trait ConfigStore {
    fn try_load(&self) -> Result<Config, ConfigError>;
    fn save(&self, cfg: &Config) -> Result<(), ConfigError>;

    /// Stored config, or defaults when it is missing or unreadable.
    fn load(&self) -> Config {
        match self.try_load() {
            Ok(cfg) => cfg,
            Err(err) => {
                debug!(error = %err, "using default config");
                Config::default()
            }
        }
    }
}

#[derive(Debug, Clone)]
pub struct FileConfigStore {
    path: PathBuf,
}

impl FileConfigStore {
    #[allow(clippy::new_without_default)]
    pub fn new() -> Self {
        Self {
            path: AppDirs::config_path().unwrap_or_else(|| PathBuf::from("typequote_config.json")),
        }
    }

    pub fn with_path<P: AsRef<Path>>(p: P) -> Self {
        Self {
            path: p.as_ref().to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ConfigStore for FileConfigStore {
    fn try_load(&self) -> Result<Config, ConfigError> {
        let bytes = fs::read(&self.path).map_err(|source| ConfigError::Io {
            path: self.path.clone(),
            source,
        })?;
        serde_json::from_slice(&bytes).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })
    }

    fn save(&self, cfg: &Config) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: self.path.clone(),
            source,
        };
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(io_err)?;
        }
        let data = serde_json::to_vec_pretty(cfg).map_err(|source| ConfigError::Parse {
            path: self.path.clone(),
            source,
        })?;
        fs::write(&self.path, data).map_err(io_err)?;
        debug!(path = %self.path.display(), "config saved");
        Ok(())
    }
}
