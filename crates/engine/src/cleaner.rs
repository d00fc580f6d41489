// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Background sweeper for empty registry keys
//!
//! Entries unregister themselves when they finish but leave their key
//! behind. The cleaner runs on its own thread, independent of the worker
//! pool, and drops those keys on a fixed period.

use crate::error::EngineError;
use crate::registry::ExecutionRegistry;
use crossbeam_channel::{RecvTimeoutError, Sender};
use rulerun_core::Clock;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

/// Periodic registry sweeper running on a dedicated thread
pub struct RegistryCleaner {
    interval: Duration,
    stop: Option<Sender<()>>,
    handle: Option<JoinHandle<()>>,
}

impl RegistryCleaner {
    /// Start sweeping `registry` every `interval`
    pub fn start<C: Clock>(
        registry: Arc<ExecutionRegistry<C>>,
        interval: Duration,
    ) -> Result<Self, EngineError> {
        let (stop, stopped) = crossbeam_channel::bounded::<()>(1);
        let thread = "rulerun-registry-cleaner".to_string();

        let handle = std::thread::Builder::new()
            .name(thread.clone())
            .spawn(move || loop {
                match stopped.recv_timeout(interval) {
                    Err(RecvTimeoutError::Timeout) => {
                        sweep_once(&registry);
                    }
                    Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                }
            })
            .map_err(|source| EngineError::ThreadSpawn { thread, source })?;

        tracing::debug!(interval_ms = interval.as_millis() as u64, "registry cleaner started");
        Ok(Self {
            interval,
            stop: Some(stop),
            handle: Some(handle),
        })
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    /// Wake the cleaner thread and wait for it to exit
    pub fn stop(&mut self) {
        if let Some(stop) = self.stop.take() {
            let _ = stop.try_send(());
        }
        if let Some(handle) = self.handle.take() {
            if handle.join().is_err() {
                tracing::error!("registry cleaner thread panicked");
            }
            tracing::debug!("registry cleaner stopped");
        }
    }
}

impl Drop for RegistryCleaner {
    fn drop(&mut self) {
        self.stop();
    }
}

/// One sweep; a panic is logged and never escapes the cleaner thread
pub(crate) fn sweep_once<C: Clock>(registry: &ExecutionRegistry<C>) -> usize {
    match panic::catch_unwind(AssertUnwindSafe(|| registry.sweep())) {
        Ok(0) => 0,
        Ok(removed) => {
            tracing::debug!(removed, "swept empty registry keys");
            removed
        }
        Err(_) => {
            tracing::error!("registry sweep panicked, will retry next period");
            0
        }
    }
}

#[cfg(test)]
#[path = "cleaner_tests.rs"]
mod tests;
