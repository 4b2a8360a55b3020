//! Configuration loading for clipwise.
//!
//! Settings live in `~/.clipwise/config.toml`. Every section is optional and a
//! missing file is not an error:
//!
//! ```toml
//! [app]
//! log_filter = "clipwise=debug"
//!
//! [diagnostics]
//! idle_timeout_secs = 30
//! ```
//!
//! `CLIPWISE_IDLE_TIMEOUT_SECS` overrides `[diagnostics] idle_timeout_secs`.

use std::path::{Path, PathBuf};
use std::time::Duration;
use std::{env, fs, io};

use serde::Deserialize;
use thiserror::Error;

use clipwise_utils::{DEFAULT_IDLE_TIMEOUT, MAX_REAPER_PERIOD};

pub const IDLE_TIMEOUT_ENV: &str = "CLIPWISE_IDLE_TIMEOUT_SECS";

#[derive(Debug, Default, Deserialize)]
pub struct ClipwiseConfig {
    pub app: Option<AppConfig>,
    pub diagnostics: Option<DiagnosticsConfig>,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config at {}", path.display())]
    Read { path: PathBuf, source: io::Error },
    #[error("failed to parse config at {}", path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

impl ConfigError {
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::Read { path, .. } | ConfigError::Parse { path, .. } => path,
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct AppConfig {
    /// Default `tracing` filter when `RUST_LOG` is unset.
    pub log_filter: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiagnosticsConfig {
    /// Seconds a diagnostics probe may sit unused before it is released.
    pub idle_timeout_secs: Option<u64>,
}

impl DiagnosticsConfig {
    /// Effective idle timeout: env override, then the file value, then the default.
    #[must_use]
    pub fn idle_timeout(&self) -> Duration {
        resolve_idle_timeout(env::var(IDLE_TIMEOUT_ENV).ok().as_deref(), self.idle_timeout_secs)
    }
}

impl ClipwiseConfig {
    /// Load `~/.clipwise/config.toml`. `Ok(None)` when there is no file.
    pub fn load() -> Result<Option<Self>, ConfigError> {
        let path = match config_path() {
            Some(path) => path,
            None => return Ok(None),
        };
        if !path.exists() {
            return Ok(None);
        }
        Self::load_from(&path).map(Some)
    }

    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = match fs::read_to_string(path) {
            Ok(content) => content,
            Err(err) => {
                tracing::warn!("Failed to read config at {:?}: {}", path, err);
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source: err,
                });
            }
        };

        match toml::from_str(&content) {
            Ok(config) => Ok(config),
            Err(err) => {
                tracing::warn!("Failed to parse config at {:?}: {}", path, err);
                Err(ConfigError::Parse {
                    path: path.to_path_buf(),
                    source: err,
                })
            }
        }
    }

    #[must_use]
    pub fn path() -> Option<PathBuf> {
        config_path()
    }

    /// Diagnostics section, or defaults when absent.
    #[must_use]
    pub fn diagnostics(&self) -> DiagnosticsConfig {
        self.diagnostics.clone().unwrap_or_default()
    }

    #[must_use]
    pub fn log_filter(&self) -> Option<&str> {
        self.app.as_ref().and_then(|app| app.log_filter.as_deref())
    }
}

pub const LOG_FILE_NAME: &str = "clipwise.log";

fn clipwise_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".clipwise"))
}

pub fn config_path() -> Option<PathBuf> {
    clipwise_dir().map(|dir| dir.join("config.toml"))
}

/// Where the log file may live, most preferred first: `~/.clipwise/logs`,
/// then `./.clipwise/logs` for when there is no usable home directory.
#[must_use]
pub fn log_file_candidates() -> Vec<PathBuf> {
    clipwise_dir()
        .into_iter()
        .chain([PathBuf::from(".clipwise")])
        .map(|dir| dir.join("logs").join(LOG_FILE_NAME))
        .collect()
}

fn resolve_idle_timeout(env_value: Option<&str>, file_value: Option<u64>) -> Duration {
    let from_env = env_value.and_then(|raw| match raw.trim().parse::<u64>() {
        Ok(secs) => Some(secs),
        Err(_) => {
            tracing::warn!("Ignoring {IDLE_TIMEOUT_ENV}={raw:?}: not a whole number of seconds");
            None
        }
    });

    match from_env.or(file_value) {
        Some(0) => {
            tracing::warn!(
                "Idle timeout of 0s would retire probes immediately; using {:?}",
                DEFAULT_IDLE_TIMEOUT
            );
            DEFAULT_IDLE_TIMEOUT
        }
        Some(secs) if Duration::from_secs(secs) > MAX_REAPER_PERIOD => {
            tracing::warn!(
                "Idle timeout of {secs}s is too long; capping at {:?}",
                MAX_REAPER_PERIOD
            );
            MAX_REAPER_PERIOD
        }
        Some(secs) => Duration::from_secs(secs),
        None => DEFAULT_IDLE_TIMEOUT,
    }
}
