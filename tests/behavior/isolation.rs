//! One failing rule does not stop its batch

use crate::prelude::*;

#[test]
fn failing_middle_rule_leaves_the_others_completed() {
    let engine = Engine::start();

    let handle = engine.schedule("order-1", vec![ok("r1"), fail("r2"), ok("r3")]);
    assert!(handle.wait(TIMEOUT));

    let status = handle.status();
    similar_asserts::assert_eq!(status.completed_rules(), ids(&["r1", "r3"]));
    similar_asserts::assert_eq!(status.failed_rules(), ids(&["r2"]));
    assert!(status.pending_rules().is_empty());
    assert!(status.abandoned_rules().is_empty());
}

#[test]
fn panicking_rule_is_isolated_like_a_failure() {
    let engine = Engine::start();

    let handle = engine.schedule("order-1", vec![panics("r1"), ok("r2")]);
    assert!(handle.wait(TIMEOUT));

    let status = handle.status();
    assert_eq!(status.failed_rules(), ids(&["r1"]));
    assert_eq!(status.failures()[0].error, "rule panicked: rule bug");
    assert_eq!(status.completed_rules(), ids(&["r2"]));

    // The worker survived and takes new work
    let next = engine.schedule("order-2", vec![ok("r3")]);
    assert!(next.wait(TIMEOUT));
    assert_eq!(next.status().completed_rules(), ids(&["r3"]));
}

#[test]
fn failures_never_reach_the_scheduling_caller() {
    let engine = Engine::start();

    let outcome = engine
        .scheduler
        .schedule_rules(vec![fail("r1")], RuleContext::new("order-1", "update"));

    let handle = outcome.unwrap().into_handle().unwrap();
    assert!(handle.wait(TIMEOUT));
    assert_eq!(handle.status().failed_rules(), ids(&["r1"]));
}

#[test]
fn immediate_run_propagates_the_first_failure() {
    let engine = Engine::start();
    let journal = Journal::new();

    let result = engine.scheduler.run_rules(
        vec![
            journal.rule("r1", "r1"),
            fail("r2"),
            journal.rule("r3", "r3"),
        ],
        RuleContext::new("order-1", "update"),
    );

    assert_eq!(result, Err(RuleError::failed("business check failed")));
    assert_eq!(journal.entries(), vec!["r1"]);
}

#[test]
fn every_partition_of_the_batch_is_accounted_for() {
    let engine = Engine::start();
    let rules = vec![ok("a"), fail("b"), ok("c"), panics("d"), ok("e")];

    let handle = engine.schedule("order-1", rules);
    assert!(handle.wait(TIMEOUT));

    let status = handle.status();
    let mut seen: Vec<RuleId> = status
        .completed_rules()
        .into_iter()
        .chain(status.failed_rules())
        .chain(status.pending_rules())
        .chain(status.abandoned_rules())
        .collect();
    seen.sort();
    similar_asserts::assert_eq!(seen, ids(&["a", "b", "c", "d", "e"]));
}
