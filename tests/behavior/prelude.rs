//! Shared fixtures for behavior tests

#![allow(dead_code)]

use crossbeam_channel::{Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

pub use rulerun_adapters::{
    ExecutionMode, FakeSecurityPropagator, FakeStatisticsSink, FakeTransactionRunner, RuleOutcome,
    SecurityIdentity,
};
pub use rulerun_core::{EngineConfig, EntityKey, FnRule, Rule, RuleContext, RuleError, RuleId};
pub use rulerun_engine::{
    EngineError, EntryState, ExecutionHandle, ExecutionStatus, ScheduleOutcome, Scheduler,
    SchedulerDeps,
};

pub const TIMEOUT: Duration = Duration::from_secs(10);

/// A running scheduler wired to fake collaborators
pub struct Engine {
    pub scheduler: Arc<Scheduler>,
    pub transactions: FakeTransactionRunner,
    pub security: FakeSecurityPropagator,
    pub stats: FakeStatisticsSink,
}

impl Engine {
    pub fn start() -> Self {
        Self::with_config(EngineConfig::new().with_max_workers(4))
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self::build(config, FakeStatisticsSink::new())
    }

    pub fn with_stats(stats: FakeStatisticsSink) -> Self {
        Self::build(EngineConfig::new().with_max_workers(4), stats)
    }

    fn build(config: EngineConfig, stats: FakeStatisticsSink) -> Self {
        let transactions = FakeTransactionRunner::new();
        let security = FakeSecurityPropagator::new(SecurityIdentity::new("acme", "alice"));
        let deps = SchedulerDeps::new(
            Arc::new(transactions.clone()),
            Arc::new(security.clone()),
            Arc::new(stats.clone()),
        );
        let scheduler = Scheduler::start(config, deps).unwrap();
        Self {
            scheduler: Arc::new(scheduler),
            transactions,
            security,
            stats,
        }
    }

    /// Schedule a batch that must be accepted
    pub fn schedule(&self, entity: &str, rules: Vec<Arc<dyn Rule>>) -> ExecutionHandle {
        match self
            .scheduler
            .schedule_rules(rules, RuleContext::new(entity, "update"))
            .unwrap()
        {
            ScheduleOutcome::Scheduled(handle) => handle,
            ScheduleOutcome::AlreadyActive => panic!("batch for {} was rejected", entity),
            ScheduleOutcome::NothingToRun => panic!("batch for {} was empty", entity),
        }
    }

    pub fn try_schedule(&self, entity: &str, rules: Vec<Arc<dyn Rule>>) -> ScheduleOutcome {
        self.scheduler
            .schedule_rules(rules, RuleContext::new(entity, "update"))
            .unwrap()
    }
}

impl Drop for Engine {
    fn drop(&mut self) {
        self.scheduler.shutdown();
    }
}

pub fn key(entity: &str) -> EntityKey {
    EntityKey::from(entity)
}

pub fn ids(names: &[&str]) -> Vec<RuleId> {
    names.iter().map(|n| RuleId::from(*n)).collect()
}

pub fn ok(id: &str) -> Arc<dyn Rule> {
    FnRule::shared(id, |_: &RuleContext| Ok(()))
}

pub fn fail(id: &str) -> Arc<dyn Rule> {
    FnRule::shared(id, |_: &RuleContext| Err(RuleError::failed("business check failed")))
}

pub fn panics(id: &str) -> Arc<dyn Rule> {
    FnRule::shared(id, |_: &RuleContext| -> Result<(), RuleError> {
        panic!("rule bug")
    })
}

/// Rules that block once started until the test releases them
pub struct Gate {
    started_tx: Sender<RuleId>,
    started_rx: Receiver<RuleId>,
    release_tx: Sender<()>,
    release_rx: Receiver<()>,
}

impl Gate {
    pub fn new() -> Self {
        let (started_tx, started_rx) = crossbeam_channel::unbounded();
        let (release_tx, release_rx) = crossbeam_channel::unbounded();
        Self {
            started_tx,
            started_rx,
            release_tx,
            release_rx,
        }
    }

    pub fn rule(&self, id: &str) -> Arc<dyn Rule> {
        let started = self.started_tx.clone();
        let release = self.release_rx.clone();
        let rule_id = RuleId::from(id);
        FnRule::shared(id, move |_: &RuleContext| {
            let _ = started.send(rule_id.clone());
            let _ = release.recv_timeout(TIMEOUT);
            Ok(())
        })
    }

    /// Block until a gated rule starts; returns its id
    pub fn wait_started(&self) -> RuleId {
        self.started_rx.recv_timeout(TIMEOUT).unwrap()
    }

    /// Let one gated rule finish
    pub fn release(&self) {
        self.release_tx.send(()).unwrap();
    }
}

/// Shared log of rule executions, in the order they ran
#[derive(Clone, Default)]
pub struct Journal {
    entries: Arc<Mutex<Vec<String>>>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    /// Rule that appends `label` when it runs
    pub fn rule(&self, id: &str, label: &str) -> Arc<dyn Rule> {
        let entries = Arc::clone(&self.entries);
        let label = label.to_string();
        FnRule::shared(id, move |_: &RuleContext| {
            entries.lock().unwrap().push(label.clone());
            Ok(())
        })
    }

    pub fn entries(&self) -> Vec<String> {
        self.entries.lock().unwrap().clone()
    }
}

/// Tracks how many rules run at once and the highest count seen
#[derive(Clone, Default)]
pub struct Overlap {
    running: Arc<AtomicUsize>,
    peak: Arc<AtomicUsize>,
}

impl Overlap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn rule(&self, id: &str) -> Arc<dyn Rule> {
        let overlap = self.clone();
        FnRule::shared(id, move |_: &RuleContext| {
            let now = overlap.running.fetch_add(1, Ordering::SeqCst) + 1;
            overlap.peak.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(Duration::from_millis(1));
            overlap.running.fetch_sub(1, Ordering::SeqCst);
            Ok(())
        })
    }

    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}
