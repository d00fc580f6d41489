// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error types for the rule engine

use thiserror::Error;

/// Errors that can occur while scheduling or managing workers
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("worker pool is shut down")]
    PoolShutDown,
    #[error("failed to spawn {thread} thread: {source}")]
    ThreadSpawn {
        thread: String,
        #[source]
        source: std::io::Error,
    },
}
