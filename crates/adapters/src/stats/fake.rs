// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Fake statistics sink for testing
#![cfg_attr(coverage_nightly, coverage(off))]

use super::{RuleExecution, RuleOutcome, StatisticsSink, StatsError};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

/// Records executions; can be switched into a failing mode
#[derive(Clone, Default)]
pub struct FakeStatisticsSink {
    records: Arc<Mutex<Vec<RuleExecution>>>,
    failing: Arc<AtomicBool>,
}

impl FakeStatisticsSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// A sink whose every `record` call errors
    pub fn failing() -> Self {
        let sink = Self::default();
        sink.failing.store(true, Ordering::SeqCst);
        sink
    }

    pub fn records(&self) -> Vec<RuleExecution> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn count(&self, outcome: RuleOutcome) -> usize {
        self.records()
            .iter()
            .filter(|r| r.outcome == outcome)
            .count()
    }
}

impl StatisticsSink for FakeStatisticsSink {
    fn record(&self, execution: &RuleExecution) -> Result<(), StatsError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(StatsError::Unavailable("fake sink is failing".to_string()));
        }
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(execution.clone());
        Ok(())
    }
}
