// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution entry: one scheduled batch of rules for one entity
//!
//! The owning worker pops rules in submission order and runs each one under
//! the identity captured at scheduling time, inside its own transaction. A
//! failing rule is recorded and the batch moves on. Cancellation is checked
//! only between rules; a rule that has started always runs to completion.
//!
//! Pending queue, processing slot and outcome lists live behind one mutex so
//! status readers never see a rule that is neither pending nor processing.

use crate::pool::Job;
use crate::registry::ExecutionRegistry;
use crate::scheduler::SchedulerDeps;
use crate::status::{EntryState, ExecutionSnapshot, ExecutionStatus, FailedRule};
use rulerun_adapters::{ExecutionMode, RuleExecution, RuleOutcome, SecurityIdentity};
use rulerun_core::{Clock, EntityKey, OperationId, RuleContext, RuleError, RuleId, RuleTask};
use std::collections::{HashSet, VecDeque};
use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Condvar, Mutex, MutexGuard, Weak};
use std::time::{Duration, Instant};

struct Processing {
    rule: RuleId,
    started: Instant,
}

struct Progress {
    state: EntryState,
    pending: VecDeque<RuleTask>,
    processing: Option<Processing>,
    completed: Vec<RuleId>,
    failed: Vec<FailedRule>,
    abandoned: Vec<RuleId>,
}

/// A batch of rules bound to one entity and run by one worker
pub struct ExecutionEntry<C: Clock> {
    id: String,
    context: Arc<RuleContext>,
    identity: SecurityIdentity,
    progress: Mutex<Progress>,
    finished: Condvar,
    cancelled: AtomicBool,
    deps: SchedulerDeps,
    registry: Weak<ExecutionRegistry<C>>,
    clock: C,
}

impl<C: Clock> ExecutionEntry<C> {
    pub(crate) fn new(
        id: String,
        context: Arc<RuleContext>,
        tasks: Vec<RuleTask>,
        identity: SecurityIdentity,
        deps: SchedulerDeps,
        registry: &Arc<ExecutionRegistry<C>>,
        clock: C,
    ) -> Self {
        Self {
            id,
            context,
            identity,
            progress: Mutex::new(Progress {
                state: EntryState::Created,
                pending: tasks.into(),
                processing: None,
                completed: Vec::new(),
                failed: Vec::new(),
                abandoned: Vec::new(),
            }),
            finished: Condvar::new(),
            cancelled: AtomicBool::new(false),
            deps,
            registry: Arc::downgrade(registry),
            clock,
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Shared context every rule in the batch runs against
    pub fn context(&self) -> &Arc<RuleContext> {
        &self.context
    }

    /// Identity the batch runs as
    pub fn identity(&self) -> &SecurityIdentity {
        &self.identity
    }

    /// Block until the batch is done and unregistered, or `timeout` passes.
    /// Returns whether the batch is done.
    pub fn wait(&self, timeout: Duration) -> bool {
        let progress = self.lock();
        let (progress, _) = self
            .finished
            .wait_timeout_while(progress, timeout, |p| p.state != EntryState::Done)
            .unwrap_or_else(|e| e.into_inner());
        progress.state == EntryState::Done
    }

    /// Request that no further rules start. Returns false when the batch is
    /// already done or cancellation was already requested.
    pub fn request_cancel(&self) -> bool {
        let progress = self.lock();
        if progress.state == EntryState::Done {
            return false;
        }
        !self.cancelled.swap(true, Ordering::SeqCst)
    }

    fn lock(&self) -> MutexGuard<'_, Progress> {
        self.progress.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Worker loop: drain the pending queue, then unregister
    fn execute_batch(&self) {
        let span = tracing::info_span!(
            "rules.batch",
            entry = %self.id,
            entity = %self.context.entity(),
            operation = %self.context.operation(),
        );
        let _guard = span.enter();

        let total = {
            let mut progress = self.lock();
            progress.state = EntryState::Running;
            progress.pending.len()
        };
        tracing::debug!(rules = total, identity = %self.identity, "batch started");

        while let Some(task) = self.next_task() {
            let result = self.execute_task(&task);
            self.record_outcome(&task, result);
        }

        self.finish();
    }

    /// Pop the next rule and mark it processing, or abandon the rest of the
    /// queue if cancellation was requested
    fn next_task(&self) -> Option<RuleTask> {
        let mut progress = self.lock();
        let task = progress.pending.pop_front()?;

        if self.cancelled.load(Ordering::SeqCst) {
            let mut abandoned = vec![task.id().clone()];
            abandoned.extend(progress.pending.drain(..).map(|t| t.id().clone()));
            tracing::info!(abandoned = abandoned.len(), "batch cancelled");
            progress.abandoned.extend(abandoned);
            return None;
        }

        progress.processing = Some(Processing {
            rule: task.id().clone(),
            started: self.clock.now(),
        });
        Some(task)
    }

    fn execute_task(&self, task: &RuleTask) -> Result<(), RuleError> {
        let span = tracing::info_span!("rule", rule = %task.id());
        let _guard = span.enter();

        let transactions = &self.deps.transactions;
        let mut in_transaction = || {
            transactions.run_in_new_transaction(&mut || {
                panic::catch_unwind(AssertUnwindSafe(|| task.execute()))
                    .unwrap_or_else(|payload| Err(RuleError::from_panic(payload.as_ref())))
            })
        };

        panic::catch_unwind(AssertUnwindSafe(|| {
            self.deps.security.run_as(&self.identity, &mut in_transaction)
        }))
        .unwrap_or_else(|payload| Err(RuleError::from_panic(payload.as_ref())))
    }

    fn record_outcome(&self, task: &RuleTask, result: Result<(), RuleError>) {
        let elapsed = {
            let mut progress = self.lock();
            let elapsed = progress
                .processing
                .take()
                .map(|p| self.clock.elapsed_since(p.started))
                .unwrap_or_default();
            match &result {
                Ok(()) => progress.completed.push(task.id().clone()),
                Err(e) => progress.failed.push(FailedRule {
                    rule: task.id().clone(),
                    error: e.to_string(),
                }),
            }
            elapsed
        };

        let outcome = match &result {
            Ok(()) => {
                tracing::debug!(elapsed_ms = elapsed.as_millis() as u64, "rule completed");
                RuleOutcome::Completed
            }
            Err(e) => {
                tracing::error!(
                    rule = %task.id(),
                    elapsed_ms = elapsed.as_millis() as u64,
                    error = %e,
                    "rule failed"
                );
                RuleOutcome::Failed
            }
        };

        let execution = RuleExecution {
            rule: task.id().clone(),
            entity: self.context.entity().clone(),
            operation: self.context.operation().clone(),
            mode: ExecutionMode::Scheduled,
            outcome,
            elapsed,
        };
        if let Err(e) = self.deps.stats.record(&execution) {
            tracing::debug!(error = %e, "statistics not recorded");
        }
    }

    fn finish(&self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.context.entity(), &self.id);
        }

        let mut progress = self.lock();
        progress.state = EntryState::Done;
        tracing::info!(
            completed = progress.completed.len(),
            failed = progress.failed.len(),
            abandoned = progress.abandoned.len(),
            "batch finished"
        );
        drop(progress);
        self.finished.notify_all();
    }
}

impl<C: Clock> Job for ExecutionEntry<C> {
    fn id(&self) -> &str {
        &self.id
    }

    fn run(&self) {
        self.execute_batch();
    }

    fn cancel(&self) -> bool {
        self.request_cancel()
    }
}

impl<C: Clock> ExecutionStatus for ExecutionEntry<C> {
    fn id(&self) -> &str {
        &self.id
    }

    fn entity(&self) -> &EntityKey {
        self.context.entity()
    }

    fn operation(&self) -> &OperationId {
        self.context.operation()
    }

    fn state(&self) -> EntryState {
        self.lock().state
    }

    fn pending_rules(&self) -> Vec<RuleId> {
        self.lock().pending.iter().map(|t| t.id().clone()).collect()
    }

    fn completed_rules(&self) -> Vec<RuleId> {
        distinct(self.lock().completed.iter())
    }

    fn failed_rules(&self) -> Vec<RuleId> {
        distinct(self.lock().failed.iter().map(|f| &f.rule))
    }

    fn failures(&self) -> Vec<FailedRule> {
        self.lock().failed.clone()
    }

    fn abandoned_rules(&self) -> Vec<RuleId> {
        self.lock().abandoned.clone()
    }

    fn current_rule(&self) -> Option<RuleId> {
        self.lock().processing.as_ref().map(|p| p.rule.clone())
    }

    fn current_elapsed(&self) -> Option<Duration> {
        self.lock()
            .processing
            .as_ref()
            .map(|p| self.clock.elapsed_since(p.started))
    }

    fn is_done(&self) -> bool {
        let progress = self.lock();
        progress.pending.is_empty() && progress.processing.is_none()
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    fn snapshot(&self) -> ExecutionSnapshot {
        let progress = self.lock();
        ExecutionSnapshot {
            id: self.id.clone(),
            entity: self.context.entity().clone(),
            operation: self.context.operation().clone(),
            state: progress.state,
            cancelled: self.cancelled.load(Ordering::SeqCst),
            pending: progress.pending.iter().map(|t| t.id().clone()).collect(),
            processing: progress.processing.as_ref().map(|p| p.rule.clone()),
            processing_elapsed_ms: progress
                .processing
                .as_ref()
                .map(|p| self.clock.elapsed_since(p.started).as_millis() as u64),
            completed: distinct(progress.completed.iter()),
            failed: progress.failed.clone(),
            abandoned: progress.abandoned.clone(),
        }
    }
}

/// Rule ids in first-seen order, each once
fn distinct<'a>(ids: impl Iterator<Item = &'a RuleId>) -> Vec<RuleId> {
    let mut seen = HashSet::new();
    ids.filter(|id| seen.insert(*id)).cloned().collect()
}

impl<C: Clock> std::fmt::Debug for ExecutionEntry<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionEntry")
            .field("id", &self.id)
            .field("entity", self.context.entity())
            .field("cancelled", &self.cancelled.load(Ordering::SeqCst))
            .finish()
    }
}

#[cfg(test)]
#[path = "entry_tests.rs"]
mod tests;
