//! At most one batch per entity

use crate::prelude::*;
use std::sync::Barrier;

#[test]
fn second_batch_while_first_is_active_never_runs() {
    let engine = Engine::start();
    let gate = Gate::new();
    let journal = Journal::new();

    let first = engine.schedule("order-1", vec![gate.rule("hold"), journal.rule("a", "first")]);
    gate.wait_started();

    let second = engine.try_schedule("order-1", vec![journal.rule("b", "second")]);
    assert!(matches!(second, ScheduleOutcome::AlreadyActive));
    assert_eq!(engine.scheduler.active_rules(&key("order-1")).len(), 1);

    gate.release();
    assert!(first.wait(TIMEOUT));
    assert_eq!(journal.entries(), vec!["first"]);
}

#[test]
fn concurrent_requests_admit_exactly_one_batch() {
    let engine = Engine::start();
    let gate = Gate::new();
    let barrier = Barrier::new(8);

    let accepted: Vec<ExecutionHandle> = std::thread::scope(|scope| {
        let requests: Vec<_> = (0..8)
            .map(|_| {
                scope.spawn(|| {
                    let rules = vec![gate.rule("hold")];
                    barrier.wait();
                    engine.try_schedule("order-1", rules).into_handle()
                })
            })
            .collect();
        requests
            .into_iter()
            .filter_map(|r| r.join().unwrap())
            .collect()
    });

    assert_eq!(accepted.len(), 1);
    gate.wait_started();
    assert_eq!(engine.scheduler.all_active_rules().len(), 1);

    gate.release();
    assert!(accepted[0].wait(TIMEOUT));
}

#[test]
fn rules_for_one_entity_never_overlap() {
    let engine = Engine::with_config(EngineConfig::new().with_max_workers(8));
    let overlap = Overlap::new();

    std::thread::scope(|scope| {
        for _ in 0..4 {
            scope.spawn(|| {
                for _ in 0..50 {
                    if let Some(handle) = engine
                        .try_schedule("order-1", vec![overlap.rule("r1"), overlap.rule("r2")])
                        .into_handle()
                    {
                        assert!(handle.wait(TIMEOUT));
                    }
                }
            });
        }
    });

    assert_eq!(overlap.peak(), 1);
}

#[test]
fn different_entities_run_in_parallel() {
    let engine = Engine::start();
    let gate = Gate::new();

    let a = engine.schedule("order-1", vec![gate.rule("a")]);
    let b = engine.schedule("order-2", vec![gate.rule("b")]);

    let mut started = vec![gate.wait_started(), gate.wait_started()];
    started.sort();
    assert_eq!(started, ids(&["a", "b"]));

    gate.release();
    gate.release();
    assert!(a.wait(TIMEOUT));
    assert!(b.wait(TIMEOUT));
}

#[test]
fn failing_batch_scheduled_twice_is_recorded_once() {
    let engine = Engine::start();
    let gate = Gate::new();

    let first = engine.schedule("x", vec![gate.rule("hold"), fail("fail"), fail("fail")]);
    gate.wait_started();
    let second = engine.try_schedule("x", vec![fail("fail"), fail("fail")]);
    assert!(matches!(second, ScheduleOutcome::AlreadyActive));

    gate.release();
    assert!(first.wait(TIMEOUT));

    similar_asserts::assert_eq!(first.status().failed_rules(), ids(&["fail"]));
    assert_eq!(first.status().failures().len(), 2);
    assert_eq!(engine.stats.count(RuleOutcome::Failed), 2);
}
