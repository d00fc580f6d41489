// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Engine tuning: worker pool size and registry cleanup period

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Fewest worker threads a pool will run with
pub const MIN_WORKERS: usize = 1;
/// Most worker threads a pool will run with
pub const MAX_WORKERS: usize = 256;
pub const DEFAULT_WORKERS: usize = 8;
pub const DEFAULT_CLEANUP_INTERVAL: Duration = Duration::from_secs(60);

/// Error loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Engine configuration
///
/// ```toml
/// max_workers = 8
/// cleanup_interval = "60s"
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct EngineConfig {
    /// Maximum concurrent worker threads
    pub max_workers: usize,
    /// Period between registry cleanup sweeps
    #[serde(with = "humantime_serde")]
    pub cleanup_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_workers: DEFAULT_WORKERS,
            cleanup_interval: DEFAULT_CLEANUP_INTERVAL,
        }
    }
}

impl EngineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_workers(mut self, max_workers: usize) -> Self {
        self.max_workers = max_workers;
        self
    }

    pub fn with_cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }

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

    /// Pool size actually used, clamped to `[MIN_WORKERS, MAX_WORKERS]`
    pub fn effective_workers(&self) -> usize {
        let clamped = self.max_workers.clamp(MIN_WORKERS, MAX_WORKERS);
        if clamped != self.max_workers {
            tracing::warn!(
                requested = self.max_workers,
                effective = clamped,
                "max_workers out of range, clamping"
            );
        }
        clamped
    }

    /// Cleanup period actually used; a zero interval falls back to the default
    pub fn effective_cleanup_interval(&self) -> Duration {
        if self.cleanup_interval.is_zero() {
            tracing::warn!("cleanup_interval is zero, using default");
            DEFAULT_CLEANUP_INTERVAL
        } else {
            self.cleanup_interval
        }
    }
}

#[cfg(test)]
#[path = "engine_tests.rs"]
mod tests;
