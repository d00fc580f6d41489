//! Transactions, identity and statistics around rule execution

use crate::prelude::*;
use rulerun_adapters::{active_identity, TransactionCall};
use std::sync::{Arc, Mutex};

#[test]
fn each_rule_commits_or_rolls_back_on_its_own() {
    let engine = Engine::start();

    let handle = engine.schedule("order-1", vec![ok("r1"), fail("r2"), ok("r3")]);
    assert!(handle.wait(TIMEOUT));

    assert_eq!(engine.transactions.commits(), 2);
    assert_eq!(engine.transactions.rollbacks(), 1);
}

#[test]
fn batch_runs_as_the_identity_that_scheduled_it() {
    let engine = Engine::start();
    let seen = Arc::new(Mutex::new(Vec::new()));
    let observe = {
        let seen = Arc::clone(&seen);
        FnRule::shared("observe", move |_: &RuleContext| {
            seen.lock().unwrap().push(active_identity());
            Ok(())
        })
    };

    engine
        .security
        .set_caller(SecurityIdentity::new("globex", "hank"));
    let handle = engine.schedule("order-1", vec![observe]);
    assert!(handle.wait(TIMEOUT));

    assert_eq!(
        *seen.lock().unwrap(),
        vec![Some(SecurityIdentity::new("globex", "hank"))]
    );
    assert_eq!(
        engine.security.established(),
        vec![SecurityIdentity::new("globex", "hank")]
    );
}

#[test]
fn scheduling_on_commit_waits_for_the_outer_transaction() {
    let engine = Engine::start();
    let journal = Journal::new();

    engine.scheduler.schedule_rules_on_commit(
        vec![journal.rule("r1", "ran")],
        RuleContext::new("order-1", "create"),
    );
    assert!(engine.scheduler.all_active_rules().is_empty());
    assert!(engine
        .transactions
        .calls()
        .contains(&TransactionCall::Deferred));

    assert_eq!(engine.transactions.commit_outer(), 1);

    let deadline = std::time::Instant::now() + TIMEOUT;
    while journal.entries().is_empty() && std::time::Instant::now() < deadline {
        std::thread::sleep(std::time::Duration::from_millis(5));
    }
    assert_eq!(journal.entries(), vec!["ran"]);
}

#[test]
fn statistics_cover_both_entry_points() {
    let engine = Engine::start();

    let handle = engine.schedule("order-1", vec![ok("r1"), fail("r2")]);
    assert!(handle.wait(TIMEOUT));
    engine
        .scheduler
        .run_rules(vec![ok("r3")], RuleContext::new("order-1", "update"))
        .unwrap();

    let records = engine.stats.records();
    assert_eq!(records.len(), 3);
    assert_eq!(
        records
            .iter()
            .map(|r| (r.rule.as_str(), r.mode, r.outcome))
            .collect::<Vec<_>>(),
        vec![
            ("r1", ExecutionMode::Scheduled, RuleOutcome::Completed),
            ("r2", ExecutionMode::Scheduled, RuleOutcome::Failed),
            ("r3", ExecutionMode::Immediate, RuleOutcome::Completed),
        ]
    );
}

#[test]
fn broken_statistics_sink_changes_nothing() {
    let engine = Engine::with_stats(FakeStatisticsSink::failing());

    let handle = engine.schedule("order-1", vec![ok("r1"), fail("r2"), ok("r3")]);
    assert!(handle.wait(TIMEOUT));

    assert_eq!(handle.status().completed_rules(), ids(&["r1", "r3"]));
    assert_eq!(handle.status().failed_rules(), ids(&["r2"]));
    assert!(engine.stats.records().is_empty());
    assert_eq!(
        engine
            .scheduler
            .run_rules(vec![ok("r4")], RuleContext::new("order-1", "update")),
        Ok(())
    );
}

#[test]
fn rules_in_a_batch_share_the_context() {
    let engine = Engine::start();
    let produce = FnRule::shared("produce", |ctx: &RuleContext| {
        let total = ctx
            .after()
            .and_then(|after| after["total"].as_i64())
            .ok_or_else(|| RuleError::failed("no total"))?;
        ctx.set_state("doubled", serde_json::json!(total * 2));
        Ok(())
    });
    let consume = FnRule::shared("consume", |ctx: &RuleContext| match ctx.state("doubled") {
        Some(value) if value == serde_json::json!(84) => Ok(()),
        other => Err(RuleError::failed(format!("doubled was {:?}", other))),
    });

    let context = RuleContext::new("invoice-3", "approve")
        .with_after(serde_json::json!({ "total": 42 }));
    let handle = engine
        .scheduler
        .schedule_rules(vec![produce, consume], context)
        .unwrap()
        .into_handle()
        .unwrap();
    assert!(handle.wait(TIMEOUT));

    assert_eq!(handle.status().completed_rules(), ids(&["produce", "consume"]));
    assert_eq!(handle.status().operation().as_str(), "approve");
}
