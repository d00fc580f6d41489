// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rulerun-daemon: host process for the rule engine
//!
//! Loads configuration, installs logging, runs a [`rulerun_engine::Scheduler`]
//! and reacts to reload and shutdown signals.

pub mod args;
pub mod config;
pub mod lifecycle;

pub use args::Args;
pub use config::{DaemonConfig, LogConfig, StatusConfig};
pub use lifecycle::{setup_logging, EngineHost, LifecycleError, StatusSummary};
