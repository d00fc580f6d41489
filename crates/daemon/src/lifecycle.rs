// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle management: logging, startup, reload, shutdown.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use rulerun_adapters::{
    DirectTransactionRunner, NoOpSecurityPropagator, TracedSecurityPropagator,
    TracedTransactionRunner, TracingStatisticsSink,
};
use rulerun_core::ConfigError;
use rulerun_engine::{EngineError, ExecutionSnapshot, ExecutionStatus, Scheduler, SchedulerDeps};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{DaemonConfig, LogConfig};

/// Errors that can occur while running the daemon
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("engine error: {0}")]
    Engine(#[from] EngineError),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("log file path has no file name: {0}")]
    LogPath(PathBuf),
    #[error("failed to install logging: {0}")]
    Logging(String),
    #[error("engine shutdown failed: {0}")]
    Shutdown(String),
}

/// Install the global tracing subscriber.
///
/// Logs go to `config.file` through a non-blocking appender, or to stderr.
/// The returned guard flushes the appender when dropped.
pub fn setup_logging(
    config: &LogConfig,
) -> Result<Option<tracing_appender::non_blocking::WorkerGuard>, LifecycleError> {
    use tracing_subscriber::{fmt, prelude::*, EnvFilter};

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.filter));

    match &config.file {
        Some(path) => {
            let (dir, name) = split_log_path(path)?;
            std::fs::create_dir_all(dir)?;
            let file_appender = tracing_appender::rolling::never(dir, name);
            let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_ansi(false).with_writer(non_blocking))
                .try_init()
                .map_err(|e| LifecycleError::Logging(e.to_string()))?;
            Ok(Some(guard))
        }
        None => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_writer(std::io::stderr))
                .try_init()
                .map_err(|e| LifecycleError::Logging(e.to_string()))?;
            Ok(None)
        }
    }
}

fn split_log_path(path: &Path) -> Result<(&Path, &std::ffi::OsStr), LifecycleError> {
    let name = path
        .file_name()
        .ok_or_else(|| LifecycleError::LogPath(path.to_path_buf()))?;
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    Ok((dir, name))
}

/// Point-in-time summary of the engine, logged periodically
#[derive(Debug, Clone, Serialize)]
pub struct StatusSummary {
    pub uptime_secs: u64,
    pub workers: usize,
    pub pool_generation: u64,
    pub in_flight: usize,
    pub registry_keys: usize,
    pub active: Vec<ExecutionSnapshot>,
}

/// A running scheduler plus the configuration it was started from
pub struct EngineHost {
    scheduler: Arc<Scheduler>,
    config: DaemonConfig,
    config_path: Option<PathBuf>,
    start_time: Instant,
}

impl EngineHost {
    /// Start the scheduler with direct transactions, the system identity and
    /// tracing statistics
    pub fn start(config: DaemonConfig, config_path: Option<PathBuf>) -> Result<Self, LifecycleError> {
        let deps = SchedulerDeps::new(
            Arc::new(TracedTransactionRunner::new(DirectTransactionRunner::new())),
            Arc::new(TracedSecurityPropagator::new(NoOpSecurityPropagator::new())),
            Arc::new(TracingStatisticsSink),
        );
        let scheduler = Scheduler::start(config.engine.clone(), deps)?;

        info!(
            workers = scheduler.pool().size(),
            cleanup_interval_ms = config.engine.effective_cleanup_interval().as_millis() as u64,
            config = ?config_path,
            "engine started"
        );

        Ok(Self {
            scheduler: Arc::new(scheduler),
            config,
            config_path,
            start_time: Instant::now(),
        })
    }

    pub fn scheduler(&self) -> &Arc<Scheduler> {
        &self.scheduler
    }

    pub fn config(&self) -> &DaemonConfig {
        &self.config
    }

    /// Re-read the config file and apply its engine and status sections.
    ///
    /// Log settings are fixed for the life of the process. Without a config
    /// file there is nothing to reload. On error the running configuration
    /// is kept.
    pub fn reload(&mut self) -> Result<bool, LifecycleError> {
        let Some(path) = &self.config_path else {
            info!("no config file to reload");
            return Ok(false);
        };

        let next = DaemonConfig::load(path)?;
        if next.log != self.config.log {
            info!("log settings changed, restart to apply them");
        }
        self.scheduler.apply_config(&next.engine)?;
        self.config.engine = next.engine;
        self.config.status = next.status;

        info!(config = %path.display(), "configuration reloaded");
        Ok(true)
    }

    pub fn status(&self) -> StatusSummary {
        let pool = self.scheduler.pool();
        let mut active: Vec<ExecutionSnapshot> = self
            .scheduler
            .all_active_rules()
            .into_values()
            .flatten()
            .map(|status| status.snapshot())
            .collect();
        active.sort_by(|a, b| a.entity.as_str().cmp(b.entity.as_str()));

        StatusSummary {
            uptime_secs: self.start_time.elapsed().as_secs(),
            workers: pool.size(),
            pool_generation: pool.generation(),
            in_flight: pool.in_flight(),
            registry_keys: self.scheduler.registry_keys(),
            active,
        }
    }

    /// Emit one status line, plus one debug line per active batch
    pub fn log_status(&self) {
        let summary = self.status();
        info!(
            uptime_secs = summary.uptime_secs,
            workers = summary.workers,
            pool_generation = summary.pool_generation,
            in_flight = summary.in_flight,
            registry_keys = summary.registry_keys,
            active = summary.active.len(),
            "engine status"
        );
        for snapshot in &summary.active {
            match serde_json::to_string(snapshot) {
                Ok(json) => debug!(entity = %snapshot.entity, batch = %json, "active batch"),
                Err(e) => debug!(entity = %snapshot.entity, error = %e, "active batch"),
            }
        }
    }

    /// Cancel unfinished batches and wait for the workers to exit
    pub fn shutdown(&self) {
        info!("shutting down engine...");
        self.scheduler.shutdown();
        info!("engine stopped");
    }
}

#[cfg(test)]
#[path = "lifecycle_tests.rs"]
mod tests;
