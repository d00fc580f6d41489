// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::{RuleExecution, RuleOutcome, StatisticsSink, StatsError};

/// Sink that discards everything
#[derive(Clone, Copy, Debug, Default)]
pub struct NoOpStatisticsSink;

impl StatisticsSink for NoOpStatisticsSink {
    fn record(&self, _execution: &RuleExecution) -> Result<(), StatsError> {
        Ok(())
    }
}

/// Sink that emits one structured event per rule under the
/// `rulerun::stats` target
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingStatisticsSink;

impl StatisticsSink for TracingStatisticsSink {
    fn record(&self, execution: &RuleExecution) -> Result<(), StatsError> {
        let elapsed_ms = execution.elapsed.as_millis() as u64;
        match execution.outcome {
            RuleOutcome::Completed => tracing::debug!(
                target: "rulerun::stats",
                rule = %execution.rule,
                entity = %execution.entity,
                operation = %execution.operation,
                mode = ?execution.mode,
                elapsed_ms,
                "rule completed"
            ),
            RuleOutcome::Failed => tracing::debug!(
                target: "rulerun::stats",
                rule = %execution.rule,
                entity = %execution.entity,
                operation = %execution.operation,
                mode = ?execution.mode,
                elapsed_ms,
                "rule failed"
            ),
        }
        Ok(())
    }
}
