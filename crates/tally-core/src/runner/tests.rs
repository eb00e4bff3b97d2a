//! Tests for the runner module.

use std::time::Duration;

use super::*;
use crate::{
    loggers::{EntryKind, MemoryLogger},
    models::Status,
};

/// Helper function to create a runner recording the default plan into a
/// memory logger
fn create_test_runner(autostart: bool) -> (Arc<MemoryLogger>, Runner) {
    let logger = Arc::new(MemoryLogger::new());
    let runner = RunnerBuilder::new()
        .with_logger(logger.clone())
        .autostart(autostart)
        .build();
    (logger, runner)
}

fn plan_with_test(name: &str, logger: &Arc<MemoryLogger>) -> Plan {
    let mut plan = Plan::new(name).with_logger(logger.clone());
    plan.module("m").test("t", |t| {
        t.assert(true, "ran")?;
        Ok(())
    });
    plan
}

#[tokio::test]
async fn test_nothing_runs_before_start() {
    let (logger, mut runner) = create_test_runner(false);
    let plan = plan_with_test("a", &logger);

    let tail = runner.run(Some(&plan), None).expect("Failed to run plan");
    tokio::task::yield_now().await;
    assert!(logger.is_empty());
    assert_eq!(tail.state(), SignalState::Pending);

    runner.start();
    assert_eq!(runner.wait().await, Outcome::Resolved);
    assert_eq!(logger.count(Status::Passed), 1);
}

#[tokio::test]
async fn test_runs_are_queued_in_order() {
    let (logger, mut runner) = create_test_runner(false);
    let first = plan_with_test("first", &logger);
    let second = plan_with_test("second", &logger);

    runner.run(Some(&first), None).expect("Failed to run first plan");
    runner.run(Some(&second), None).expect("Failed to run second plan");
    runner.start();
    runner.wait().await;

    let first_end = logger
        .position(|e| e.kind == EntryKind::End && e.plan.as_deref() == Some("first"))
        .expect("Failed to find first plan end");
    let second_begin = logger
        .position(|e| e.kind == EntryKind::Begin && e.plan.as_deref() == Some("second"))
        .expect("Failed to find second plan begin");
    assert!(first_end < second_begin);
}

#[tokio::test]
async fn test_run_while_running_queues_after_tail() {
    let (logger, mut runner) = create_test_runner(true);
    let mut slow = Plan::new("slow").with_logger(logger.clone());
    slow.module("m").test_async("waits", |t, done| {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            let _ = t.assert(true, "slow done");
            done.resolve();
        });
        Ok(())
    });
    let quick = plan_with_test("quick", &logger);

    runner.run(Some(&slow), None).expect("Failed to run slow plan");
    tokio::task::yield_now().await;
    runner.run(Some(&quick), None).expect("Failed to run quick plan");
    runner.wait().await;

    let slow_done = logger
        .position(|e| e.message.as_deref() == Some("slow done"))
        .expect("Failed to find slow assertion");
    let quick_begin = logger
        .position(|e| e.kind == EntryKind::Begin && e.plan.as_deref() == Some("quick"))
        .expect("Failed to find quick plan begin");
    assert!(slow_done < quick_begin);
}

#[tokio::test]
async fn test_default_plan_is_reset_after_run() {
    let (logger, mut runner) = create_test_runner(true);
    runner.module("math").test("add", |t| {
        t.assert(1 + 1 == 2, "sum")?;
        Ok(())
    });
    assert!(!runner.default_plan().is_empty());

    runner.run(None, None).expect("Failed to run default plan");
    assert!(runner.default_plan().is_empty());
    runner.wait().await;

    let begin = logger
        .find(|e| e.kind == EntryKind::Begin)
        .expect("Failed to find plan begin");
    assert_eq!(begin.plan.as_deref(), Some(DEFAULT_PLAN));
    assert_eq!(logger.count(Status::Passed), 1);
}

#[tokio::test]
async fn test_abort_halts_until_reset() {
    let (logger, mut runner) = create_test_runner(false);
    runner.abort();
    assert!(runner.is_halted());

    let plan = plan_with_test("blocked", &logger);
    let err = runner.run(Some(&plan), None).unwrap_err();
    assert!(matches!(err, TallyError::ScheduleHalted));

    runner.reset();
    assert!(!runner.is_halted());
    runner.run(Some(&plan), None).expect("Failed to run after reset");
    runner.start();
    runner.wait().await;
    assert_eq!(logger.count(Status::Passed), 1);
}

#[tokio::test]
async fn test_reset_waits_for_previous_schedule_to_drain() {
    let (logger, mut runner) = create_test_runner(true);
    let mut slow = Plan::new("slow").with_logger(logger.clone());
    slow.module("m").test_async("sleeps", |t, done| {
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            let _ = t.assert(true, "slow done");
            done.resolve();
        });
        Ok(())
    });
    let quick = plan_with_test("quick", &logger);

    runner.run(Some(&slow), None).expect("Failed to run slow plan");
    tokio::time::sleep(Duration::from_millis(10)).await;
    runner.reset();
    assert!(!runner.is_halted());
    runner.run(Some(&quick), None).expect("Failed to run after reset");
    runner.wait().await;

    let slow_done = logger
        .position(|e| e.message.as_deref() == Some("slow done"))
        .expect("Failed to find slow assertion");
    let quick_begin = logger
        .position(|e| e.kind == EntryKind::Begin && e.plan.as_deref() == Some("quick"))
        .expect("Failed to find quick plan begin");
    assert!(slow_done < quick_begin);

    let slow_entry = logger
        .find(|e| e.message.as_deref() == Some("slow done"))
        .expect("Failed to find slow assertion");
    assert_eq!(slow_entry.plan.as_deref(), Some("slow"));
}

#[tokio::test]
async fn test_reset_without_autostart_still_gates_on_start() {
    let (logger, mut runner) = create_test_runner(false);
    runner.reset();
    let plan = plan_with_test("gated", &logger);
    runner.run(Some(&plan), None).expect("Failed to run plan");
    tokio::task::yield_now().await;
    assert!(logger.is_empty());

    runner.start();
    runner.wait().await;
    assert_eq!(logger.count(Status::Passed), 1);
}

#[tokio::test(start_paused = true)]
async fn test_config_default_timeout_applies() {
    let logger = Arc::new(MemoryLogger::new());
    let mut runner = RunnerBuilder::new()
        .with_logger(logger.clone())
        .with_default_timeout(Duration::from_millis(30))
        .build();
    runner.test_async("hangs", |_, done| {
        tokio::spawn(async move {
            std::future::pending::<()>().await;
            done.resolve();
        });
        Ok(())
    });

    runner.run(None, None).expect("Failed to run default plan");
    runner.wait().await;

    let failure = logger
        .find(|e| e.status == Some(Status::Failed))
        .expect("Failed to find timeout failure");
    assert_eq!(failure.message.as_deref(), Some("timeout"));
}

#[tokio::test]
async fn test_config_throws_on_failure_applies() {
    let logger = Arc::new(MemoryLogger::new());
    let mut runner = RunnerBuilder::new()
        .with_logger(logger.clone())
        .throws_on_failure(true)
        .build();
    runner.test("strict", |t| {
        t.assert(false, "must hold")?;
        Ok(())
    });

    runner.run(None, None).expect("Failed to run default plan");
    runner.wait().await;

    assert_eq!(logger.count(Status::Failed), 0);
    assert_eq!(logger.count(Status::Errors), 1);
}

#[tokio::test]
async fn test_plan_settings_override_config() {
    let logger = Arc::new(MemoryLogger::new());
    let mut runner = RunnerBuilder::new().throws_on_failure(true).build();
    let mut plan = Plan::new("lenient").with_logger(logger.clone());
    plan.set_throws_on_failure(false);
    plan.test("soft", |t| {
        t.assert(false, "recorded")?;
        Ok(())
    });

    runner.run(Some(&plan), None).expect("Failed to run plan");
    runner.wait().await;

    assert_eq!(logger.count(Status::Failed), 1);
    assert_eq!(logger.count(Status::Errors), 0);
}

#[tokio::test]
async fn test_config_filter_is_fallback() {
    let logger = Arc::new(MemoryLogger::new());
    let mut runner = RunnerBuilder::new()
        .with_logger(logger.clone())
        .with_filter(Filter::new().include("kept"))
        .build();
    runner.module("kept").test("t", |t| {
        t.assert(true, "kept")?;
        Ok(())
    });
    runner.module("dropped").test("t", |t| {
        t.assert(true, "dropped")?;
        Ok(())
    });

    runner.run(None, None).expect("Failed to run default plan");
    runner.wait().await;

    assert_eq!(logger.count(Status::Passed), 1);
    assert!(logger.find(|e| e.module() == "dropped").is_none());
}

#[tokio::test]
async fn test_finish_runs_default_plan() {
    let (logger, mut runner) = create_test_runner(false);
    runner.test("t", |t| {
        t.assert(true, "finished")?;
        Ok(())
    });

    let outcome = runner.finish().await.expect("Failed to finish runner");
    assert_eq!(outcome, Outcome::Resolved);
    assert_eq!(logger.count(Status::Passed), 1);
}

#[tokio::test]
async fn test_empty_runner_finishes_immediately() {
    let (_logger, mut runner) = create_test_runner(true);
    let outcome = runner.finish().await.expect("Failed to finish runner");
    assert_eq!(outcome, Outcome::Resolved);
}
