//! Registry keys are dropped once their batches finish

use crate::prelude::*;
use std::time::{Duration, Instant};

#[test]
fn finished_entity_has_no_active_rules() {
    let engine = Engine::start();

    let handle = engine.schedule("order-1", vec![ok("r1")]);
    assert!(handle.wait(TIMEOUT));

    assert!(engine.scheduler.active_rules(&key("order-1")).is_empty());
    assert!(engine.scheduler.all_active_rules().is_empty());
}

#[test]
fn sweep_drops_keys_of_finished_entities() {
    let engine = Engine::start();
    let gate = Gate::new();

    let done = engine.schedule("order-1", vec![ok("r1")]);
    let busy = engine.schedule("order-2", vec![gate.rule("hold")]);
    assert!(done.wait(TIMEOUT));
    gate.wait_started();

    assert_eq!(engine.scheduler.registry_keys(), 2);
    assert_eq!(engine.scheduler.sweep_registry(), 1);
    assert_eq!(engine.scheduler.registry_keys(), 1);
    assert_eq!(engine.scheduler.active_rules(&key("order-2")).len(), 1);

    gate.release();
    assert!(busy.wait(TIMEOUT));
}

#[test]
fn background_cleaner_sweeps_on_its_own() {
    let engine = Engine::with_config(
        EngineConfig::new()
            .with_max_workers(2)
            .with_cleanup_interval(Duration::from_millis(20)),
    );

    let handle = engine.schedule("order-1", vec![ok("r1")]);
    assert!(handle.wait(TIMEOUT));

    let deadline = Instant::now() + TIMEOUT;
    while engine.scheduler.registry_keys() > 0 && Instant::now() < deadline {
        std::thread::sleep(Duration::from_millis(5));
    }
    assert_eq!(engine.scheduler.registry_keys(), 0);
}

#[test]
fn status_snapshot_of_a_finished_batch() {
    let engine = Engine::start();

    let handle = engine.schedule("order-1", vec![ok("r1"), fail("r2")]);
    assert!(handle.wait(TIMEOUT));

    let snapshot = handle.status().snapshot();
    let json = serde_json::to_value(&snapshot).unwrap();
    similar_asserts::assert_eq!(
        json,
        serde_json::json!({
            "id": handle.id(),
            "entity": "order-1",
            "operation": "update",
            "state": "done",
            "cancelled": false,
            "pending": [],
            "processing": null,
            "processing_elapsed_ms": null,
            "completed": ["r1"],
            "failed": [{ "rule": "r2", "error": "rule failed: business check failed" }],
            "abandoned": [],
        })
    );
}
