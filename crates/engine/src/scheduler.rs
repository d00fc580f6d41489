// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Scheduler: the engine's public entry point
//!
//! Two ways to run rules, with deliberately different error handling:
//!
//! - [`Scheduler::schedule_rules`] accepts a batch for background execution.
//!   At most one batch runs per entity; a second request while one is active
//!   is dropped. Rule failures are recorded on the batch and never reach the
//!   caller.
//! - [`Scheduler::run_rules`] runs rules on the caller's thread right away and
//!   returns the first failure. No registry, no dedup, no isolation.
//!
//! Mixing them up is easy: a caller expecting `schedule_rules` to report a
//! failing rule will never see it except through the status API.

use crate::cleaner::{self, RegistryCleaner};
use crate::entry::ExecutionEntry;
use crate::error::EngineError;
use crate::pool::{Job, WorkerPool};
use crate::registry::ExecutionRegistry;
use crate::status::ExecutionStatus;
use rulerun_adapters::{
    DirectTransactionRunner, ExecutionMode, NoOpSecurityPropagator, NoOpStatisticsSink,
    RuleExecution, RuleOutcome, SecurityPropagator, StatisticsSink, TransactionRunner,
};
use rulerun_core::{
    Clock, EngineConfig, EntityKey, IdGen, Rule, RuleContext, RuleError, RuleTask, SystemClock,
    UuidIdGen,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Collaborators injected into the scheduler
#[derive(Clone)]
pub struct SchedulerDeps {
    pub transactions: Arc<dyn TransactionRunner>,
    pub security: Arc<dyn SecurityPropagator>,
    pub stats: Arc<dyn StatisticsSink>,
}

impl SchedulerDeps {
    pub fn new(
        transactions: Arc<dyn TransactionRunner>,
        security: Arc<dyn SecurityPropagator>,
        stats: Arc<dyn StatisticsSink>,
    ) -> Self {
        Self {
            transactions,
            security,
            stats,
        }
    }
}

impl Default for SchedulerDeps {
    /// No transactions, a fixed system identity, no statistics
    fn default() -> Self {
        Self::new(
            Arc::new(DirectTransactionRunner::new()),
            Arc::new(NoOpSecurityPropagator::new()),
            Arc::new(NoOpStatisticsSink),
        )
    }
}

/// Handle to an accepted batch: status, cancellation and completion wait
pub struct ExecutionHandle<C: Clock = SystemClock> {
    entry: Arc<ExecutionEntry<C>>,
}

impl<C: Clock> ExecutionHandle<C> {
    pub fn id(&self) -> &str {
        self.entry.id()
    }

    /// Request cooperative cancellation: no further rule starts
    pub fn cancel(&self) -> bool {
        self.entry.request_cancel()
    }

    /// Block until the batch finishes and is unregistered, or `timeout`
    /// passes. Returns whether it finished.
    pub fn wait(&self, timeout: Duration) -> bool {
        self.entry.wait(timeout)
    }

    pub fn status(&self) -> &dyn ExecutionStatus {
        &*self.entry
    }

    pub fn entry(&self) -> &Arc<ExecutionEntry<C>> {
        &self.entry
    }
}

impl<C: Clock> Clone for ExecutionHandle<C> {
    fn clone(&self) -> Self {
        Self {
            entry: Arc::clone(&self.entry),
        }
    }
}

/// Result of a `schedule_rules` call
pub enum ScheduleOutcome<C: Clock = SystemClock> {
    /// Batch accepted and queued on the worker pool
    Scheduled(ExecutionHandle<C>),
    /// A batch is already active for the entity; this request was dropped
    AlreadyActive,
    /// No rules were given
    NothingToRun,
}

impl<C: Clock> ScheduleOutcome<C> {
    pub fn is_scheduled(&self) -> bool {
        matches!(self, ScheduleOutcome::Scheduled(_))
    }

    pub fn handle(&self) -> Option<&ExecutionHandle<C>> {
        match self {
            ScheduleOutcome::Scheduled(handle) => Some(handle),
            _ => None,
        }
    }

    pub fn into_handle(self) -> Option<ExecutionHandle<C>> {
        match self {
            ScheduleOutcome::Scheduled(handle) => Some(handle),
            _ => None,
        }
    }
}

/// Asynchronous rule scheduler with per-entity mutual exclusion
pub struct Scheduler<C: Clock = SystemClock, I: IdGen = UuidIdGen> {
    registry: Arc<ExecutionRegistry<C>>,
    pool: WorkerPool,
    cleaner: Mutex<Option<RegistryCleaner>>,
    config: Mutex<EngineConfig>,
    deps: SchedulerDeps,
    clock: C,
    id_gen: I,
}

impl Scheduler {
    /// Start a scheduler on the system clock with UUID execution ids
    pub fn start(config: EngineConfig, deps: SchedulerDeps) -> Result<Self, EngineError> {
        Self::start_with(config, deps, SystemClock, UuidIdGen)
    }
}

impl<C: Clock, I: IdGen> Scheduler<C, I> {
    /// Start the worker pool and registry cleaner
    pub fn start_with(
        config: EngineConfig,
        deps: SchedulerDeps,
        clock: C,
        id_gen: I,
    ) -> Result<Self, EngineError> {
        let registry = Arc::new(ExecutionRegistry::new());
        let pool = WorkerPool::new(config.effective_workers())?;
        let cleaner =
            RegistryCleaner::start(Arc::clone(&registry), config.effective_cleanup_interval())?;

        Ok(Self {
            registry,
            pool,
            cleaner: Mutex::new(Some(cleaner)),
            config: Mutex::new(config),
            deps,
            clock,
            id_gen,
        })
    }

    /// Accept `rules` for background execution against `context`.
    ///
    /// Never blocks. If a batch is already active for the context's entity
    /// the request is dropped with a warning and `AlreadyActive` returned.
    /// Rule failures are recorded on the batch, never returned here; use the
    /// returned handle or the status methods to observe them.
    ///
    /// Fails only when the worker pool is shut down.
    pub fn schedule_rules(
        &self,
        rules: Vec<Arc<dyn Rule>>,
        context: RuleContext,
    ) -> Result<ScheduleOutcome<C>, EngineError> {
        let entity = context.entity().clone();
        if rules.is_empty() {
            tracing::debug!(entity = %entity, "no rules to schedule");
            return Ok(ScheduleOutcome::NothingToRun);
        }

        let context = Arc::new(context);
        let tasks = RuleTask::batch(rules, &context);
        let count = tasks.len();
        let entry = Arc::new(ExecutionEntry::new(
            self.id_gen.next(),
            context,
            tasks,
            self.deps.security.capture(),
            self.deps.clone(),
            &self.registry,
            self.clock.clone(),
        ));

        if !self.registry.register_if_absent(&entity, Arc::clone(&entry)) {
            tracing::warn!(
                entity = %entity,
                rules = count,
                "rules already running for entity, request dropped"
            );
            return Ok(ScheduleOutcome::AlreadyActive);
        }

        let job: Arc<dyn Job> = entry.clone();
        if let Err(e) = self.pool.submit(job) {
            self.registry.remove(&entity, entry.id());
            tracing::error!(entity = %entity, error = %e, "could not submit rules");
            return Err(e);
        }

        tracing::info!(entity = %entity, entry = entry.id(), rules = count, "rules scheduled");
        Ok(ScheduleOutcome::Scheduled(ExecutionHandle { entry }))
    }

    /// Schedule once the caller's current transaction commits.
    ///
    /// For observers reacting to a persist: the batch must not see the
    /// entity before its own write is visible. Errors from the deferred
    /// scheduling are logged.
    pub fn schedule_rules_on_commit(
        self: &Arc<Self>,
        rules: Vec<Arc<dyn Rule>>,
        context: RuleContext,
    ) {
        let scheduler = Arc::downgrade(self);
        self.deps.transactions.on_commit(Box::new(move || {
            let Some(scheduler) = scheduler.upgrade() else {
                tracing::warn!(entity = %context.entity(), "scheduler gone before commit");
                return;
            };
            let entity = context.entity().clone();
            if let Err(e) = scheduler.schedule_rules(rules, context) {
                tracing::error!(entity = %entity, error = %e, "deferred scheduling failed");
            }
        }));
    }

    /// Run `rules` now on the calling thread, each in its own transaction.
    ///
    /// Unlike `schedule_rules`, the first failure is returned immediately
    /// and later rules do not run. There is no dedup against scheduled
    /// batches for the same entity.
    pub fn run_rules(
        &self,
        rules: Vec<Arc<dyn Rule>>,
        context: RuleContext,
    ) -> Result<(), RuleError> {
        let context = Arc::new(context);
        for task in RuleTask::batch(rules, &context) {
            let started = self.clock.now();
            let result = self
                .deps
                .transactions
                .run_in_new_transaction(&mut || task.execute());
            let elapsed = self.clock.elapsed_since(started);

            let execution = RuleExecution {
                rule: task.id().clone(),
                entity: context.entity().clone(),
                operation: context.operation().clone(),
                mode: ExecutionMode::Immediate,
                outcome: if result.is_ok() {
                    RuleOutcome::Completed
                } else {
                    RuleOutcome::Failed
                },
                elapsed,
            };
            if let Err(e) = self.deps.stats.record(&execution) {
                tracing::debug!(error = %e, "statistics not recorded");
            }

            if let Err(e) = result {
                tracing::warn!(
                    entity = %context.entity(),
                    rule = %task.id(),
                    error = %e,
                    "immediate rule failed"
                );
                return Err(e);
            }
        }
        Ok(())
    }

    /// Read-only view of every active batch, by entity
    pub fn all_active_rules(&self) -> HashMap<EntityKey, Vec<Arc<dyn ExecutionStatus>>> {
        self.registry
            .snapshot()
            .into_iter()
            .map(|(key, entries)| {
                let statuses = entries
                    .into_iter()
                    .map(|entry| entry as Arc<dyn ExecutionStatus>)
                    .collect();
                (key, statuses)
            })
            .collect()
    }

    /// Active batches for one entity; empty if none
    pub fn active_rules(&self, key: &EntityKey) -> Vec<Arc<dyn ExecutionStatus>> {
        self.registry
            .get(key)
            .into_iter()
            .map(|entry| entry as Arc<dyn ExecutionStatus>)
            .collect()
    }

    /// Ask every active batch for `key` to stop before its next rule.
    ///
    /// Never blocks; a rule already executing runs to completion. Returns
    /// how many batches accepted the request.
    pub fn cancel_running_rules_for_instance(&self, key: &EntityKey) -> usize {
        let entries = self.registry.get(key);
        if entries.is_empty() {
            tracing::info!(entity = %key, "no running rules to cancel");
            return 0;
        }

        let mut cancelled = 0;
        for entry in entries {
            if entry.request_cancel() {
                tracing::info!(entity = %key, entry = entry.id(), "cancellation requested");
                cancelled += 1;
            } else {
                tracing::warn!(entity = %key, entry = entry.id(), "could not cancel rules");
            }
        }
        cancelled
    }

    /// Apply a changed configuration.
    ///
    /// A new worker count starts a new pool generation; running batches
    /// finish on the old one. A new cleanup interval restarts the cleaner.
    pub fn apply_config(&self, config: &EngineConfig) -> Result<(), EngineError> {
        let mut current = self.config.lock().unwrap_or_else(|e| e.into_inner());

        let workers = config.effective_workers();
        if workers != self.pool.size() && self.pool.reconfigure(workers)? {
            tracing::info!(workers, "worker count changed");
        }

        let interval = config.effective_cleanup_interval();
        if interval != current.effective_cleanup_interval() {
            let started = RegistryCleaner::start(Arc::clone(&self.registry), interval);
            let mut cleaner = self.cleaner.lock().unwrap_or_else(|e| e.into_inner());
            replace_cleaner(&mut cleaner, started)?;
            tracing::info!(interval_ms = interval.as_millis() as u64, "cleanup interval changed");
        }

        *current = config.clone();
        Ok(())
    }

    /// Run one registry sweep now. Returns how many keys were dropped.
    pub fn sweep_registry(&self) -> usize {
        cleaner::sweep_once(&self.registry)
    }

    /// Stop the cleaner, cancel every unfinished batch and wait for the
    /// workers to exit. A rule executing at this point still completes.
    pub fn shutdown(&self) {
        if let Some(mut cleaner) = self
            .cleaner
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()
        {
            cleaner.stop();
        }
        let interrupted = self.pool.shutdown_now();
        tracing::info!(interrupted, "scheduler shutting down");
        self.pool.join();
    }

    pub fn config(&self) -> EngineConfig {
        self.config
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Number of keys held by the registry, including empty ones not yet swept
    pub fn registry_keys(&self) -> usize {
        self.registry.key_count()
    }
}

/// Swap in a started cleaner. On a failed start the running cleaner stays.
fn replace_cleaner(
    slot: &mut Option<RegistryCleaner>,
    started: Result<RegistryCleaner, EngineError>,
) -> Result<(), EngineError> {
    let next = started?;
    if let Some(mut previous) = slot.replace(next) {
        previous.stop();
    }
    Ok(())
}

#[cfg(test)]
#[path = "scheduler_tests.rs"]
mod tests;
