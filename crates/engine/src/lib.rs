// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Asynchronous rule execution engine
//!
//! Runs batches of rules for an entity on a worker pool, at most one batch
//! per entity at a time, each rule in its own transaction.

mod cleaner;
mod entry;
mod error;
mod pool;
mod registry;
mod scheduler;
mod status;

pub use cleaner::RegistryCleaner;
pub use entry::ExecutionEntry;
pub use error::EngineError;
pub use pool::{Job, WorkerPool};
pub use registry::ExecutionRegistry;
pub use scheduler::{ExecutionHandle, ScheduleOutcome, Scheduler, SchedulerDeps};
pub use status::{EntryState, ExecutionSnapshot, ExecutionStatus, FailedRule};
