//! Pool size changes at runtime

use crate::prelude::*;

#[test]
fn resizing_the_pool_leaves_running_batches_alone() {
    let engine = Engine::with_config(EngineConfig::new().with_max_workers(1));
    let gate = Gate::new();

    let running = engine.schedule("order-1", vec![gate.rule("r1"), ok("r2")]);
    gate.wait_started();

    engine
        .scheduler
        .apply_config(&EngineConfig::new().with_max_workers(4))
        .unwrap();
    assert_eq!(engine.scheduler.pool().size(), 4);

    // New batches run while the old generation's worker is still busy
    let fresh = engine.schedule("order-2", vec![ok("x")]);
    assert!(fresh.wait(TIMEOUT));

    gate.release();
    assert!(running.wait(TIMEOUT));
    assert!(!running.status().is_cancelled());
    assert_eq!(running.status().completed_rules(), ids(&["r1", "r2"]));
}

#[test]
fn out_of_range_worker_counts_are_clamped() {
    let engine = Engine::with_config(EngineConfig::new().with_max_workers(0));
    assert_eq!(engine.scheduler.pool().size(), 1);

    engine
        .scheduler
        .apply_config(&EngineConfig::new().with_max_workers(10_000))
        .unwrap();
    assert_eq!(engine.scheduler.pool().size(), 256);
}

#[test]
fn exclusion_holds_across_a_resize() {
    let engine = Engine::with_config(EngineConfig::new().with_max_workers(2));
    let gate = Gate::new();

    let first = engine.schedule("order-1", vec![gate.rule("hold")]);
    gate.wait_started();
    engine
        .scheduler
        .apply_config(&EngineConfig::new().with_max_workers(6))
        .unwrap();

    assert!(matches!(
        engine.try_schedule("order-1", vec![ok("late")]),
        ScheduleOutcome::AlreadyActive
    ));

    gate.release();
    assert!(first.wait(TIMEOUT));
}
