// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! rulerun-core: shared types for the rule execution engine
//!
//! This crate provides:
//! - Rule, rule context and rule task types
//! - Clock and id generation abstractions
//! - Engine configuration

pub mod clock;
pub mod config;
pub mod error;
pub mod id;
pub mod rule;

pub use clock::{Clock, FakeClock, SystemClock};
pub use config::{ConfigError, EngineConfig};
pub use error::RuleError;
pub use id::{IdGen, SequentialIdGen, UuidIdGen};
pub use rule::{EntityKey, FnRule, OperationId, Rule, RuleContext, RuleId, RuleTask};
