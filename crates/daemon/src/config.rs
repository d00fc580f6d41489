// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rulerund configuration file
//!
//! ```toml
//! [engine]
//! max_workers = 8
//! cleanup_interval = "60s"
//!
//! [log]
//! filter = "info"
//! file = "/var/log/rulerun/rulerund.log"
//!
//! [status]
//! interval = "30s"
//! ```
//!
//! Every section and key is optional.

use rulerun_core::{ConfigError, EngineConfig};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_LOG_FILTER: &str = "info";
pub const DEFAULT_STATUS_INTERVAL: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DaemonConfig {
    pub engine: EngineConfig,
    pub log: LogConfig,
    pub status: StatusConfig,
}

/// Where logs go and how much of them
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LogConfig {
    /// `EnvFilter` directives; `RUST_LOG` takes precedence when set
    pub filter: String,
    /// Log file; stderr when unset
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            filter: DEFAULT_LOG_FILTER.to_string(),
            file: None,
        }
    }
}

/// Periodic status logging
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct StatusConfig {
    /// Zero disables status logging
    #[serde(with = "humantime_serde")]
    pub interval: Duration,
}

impl Default for StatusConfig {
    fn default() -> Self {
        Self {
            interval: DEFAULT_STATUS_INTERVAL,
        }
    }
}

impl StatusConfig {
    pub fn enabled(&self) -> bool {
        !self.interval.is_zero()
    }
}

impl DaemonConfig {
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(source)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_toml_str(&source)
    }

    /// `<config dir>/rulerun/rulerund.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("rulerun").join("rulerund.toml"))
    }

    /// Load the configuration the daemon should run with.
    ///
    /// An explicit path must exist. Without one the default path is used if
    /// present, otherwise built-in defaults. Returns the file actually read.
    pub fn resolve(explicit: Option<&Path>) -> Result<(Self, Option<PathBuf>), ConfigError> {
        if let Some(path) = explicit {
            return Ok((Self::load(path)?, Some(path.to_path_buf())));
        }
        match Self::default_path() {
            Some(path) if path.is_file() => Ok((Self::load(&path)?, Some(path))),
            _ => {
                tracing::debug!("no config file found, using defaults");
                Ok((Self::default(), None))
            }
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
