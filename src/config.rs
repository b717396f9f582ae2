//! Optional TOML configuration.
//!
//! Looked up at `--config`/`STEPWISE_CONFIG`, else at
//! `<config dir>/stepwise/config.toml`. A missing default file means
//! defaults; a missing explicit file is an error.

use crate::debugger::tracer::TracerSettings;
use crate::debugger::window::{DEFAULT_INSTRUCTION_WINDOW, DEFAULT_SOURCE_WINDOW};
use crate::ui::ConsoleOptions;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("{field} must be at least 1")]
    Invalid { field: &'static str },
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DisplayConfig {
    /// Instructions shown around the current one.
    pub instruction_window: usize,
    /// Source lines shown around the current one.
    pub source_window: usize,
    pub clear_screen: bool,
    pub color: bool,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            instruction_window: DEFAULT_INSTRUCTION_WINDOW,
            source_window: DEFAULT_SOURCE_WINDOW,
            clear_screen: true,
            color: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SessionConfig {
    pub prompt: String,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            prompt: ">>> ".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub display: DisplayConfig,
    pub session: SessionConfig,
}

impl Config {
    /// Parse and validate configuration text. `path` is used in errors only.
    pub fn from_toml(text: &str, path: &Path) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `explicit` if given, else from the default location.
    pub fn load(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        let path = match explicit {
            Some(path) => path.to_path_buf(),
            None => match default_path() {
                Some(path) if path.is_file() => path,
                _ => {
                    debug!("No configuration file, using defaults");
                    return Ok(Self::default());
                }
            },
        };
        let text = fs::read_to_string(&path).map_err(|source| ConfigError::Read {
            path: path.clone(),
            source,
        })?;
        let config = Self::from_toml(&text, &path)?;
        info!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.display.instruction_window == 0 {
            return Err(ConfigError::Invalid {
                field: "display.instruction_window",
            });
        }
        if self.display.source_window == 0 {
            return Err(ConfigError::Invalid {
                field: "display.source_window",
            });
        }
        Ok(())
    }

    pub fn tracer_settings(&self) -> TracerSettings {
        TracerSettings {
            instruction_window: self.display.instruction_window,
            source_window: self.display.source_window,
            prompt: self.session.prompt.clone(),
        }
    }

    pub fn console_options(&self) -> ConsoleOptions {
        ConsoleOptions {
            clear_screen: self.display.clear_screen,
            color: self.display.color,
        }
    }
}

/// `<config dir>/stepwise/config.toml`, when the platform has a config dir.
pub fn default_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("stepwise").join("config.toml"))
}
