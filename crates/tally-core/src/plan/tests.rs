//! Tests for plan scheduling.

use std::{
    sync::{
        atomic::{AtomicBool, AtomicUsize, Ordering},
        Arc,
    },
    time::Duration,
};

use anyhow::anyhow;

use super::*;
use crate::{
    assertions::Assertions,
    error::TallyError,
    loggers::{EntryKind, LogEntry, MemoryLogger},
    models::{Mode, Status},
    signal::SignalState,
};

/// Helper function to create a plan recording into a memory logger
fn create_test_plan(name: &str) -> (Arc<MemoryLogger>, Plan) {
    let logger = Arc::new(MemoryLogger::new());
    let plan = Plan::new(name);
    plan.set_logger(logger.clone());
    (logger, plan)
}

/// Schedules `plan` on a fresh head signal, starts it and waits for the tail.
async fn run_plan(plan: &Plan, filter: Option<&Filter>) {
    let (head, signal) = Signal::pending();
    let tail = plan
        .schedule(&signal, filter)
        .expect("Failed to schedule plan");
    head.resolve();
    assert_eq!(tail.wait().await, Outcome::Resolved);
}

fn kinds(logger: &MemoryLogger) -> Vec<EntryKind> {
    logger.entries().iter().map(|e| e.kind).collect()
}

fn is_info(entry: &LogEntry, test: &str, mode: Mode) -> bool {
    entry.kind == EntryKind::Info && entry.test.as_deref() == Some(test) && entry.mode == Some(mode)
}

#[tokio::test]
async fn test_single_passing_assertion() {
    let (logger, mut plan) = create_test_plan("arithmetic");
    plan.module("math").test("add", |t| {
        t.assert(1 + 1 == 2, "sum")?;
        Ok(())
    });

    run_plan(&plan, None).await;

    assert_eq!(
        kinds(&logger),
        vec![
            EntryKind::Begin,
            EntryKind::ModuleBegin,
            EntryKind::Test,
            EntryKind::ModuleEnd,
            EntryKind::End,
        ]
    );
    let item = logger.assertions().remove(0);
    assert_eq!(item.status, Some(Status::Passed));
    assert_eq!(item.message.as_deref(), Some("sum"));
    assert_eq!(item.module(), "math");
    assert_eq!(item.mode, Some(Mode::Test));
    assert_eq!(logger.count(Status::Failed), 0);
    assert_eq!(logger.count(Status::Errors), 0);
    assert_eq!(logger.count(Status::Warnings), 0);
}

#[tokio::test]
async fn test_body_error_is_recorded_before_teardown() {
    let (logger, mut plan) = create_test_plan("errors");
    let failed_in_teardown = Arc::new(AtomicBool::new(false));
    let seen = Arc::clone(&failed_in_teardown);

    plan.module("m")
        .teardown(move |t| {
            seen.store(t.test_failed(), Ordering::SeqCst);
            Ok(())
        })
        .test("explodes", |_| Err(anyhow!("boom")));

    run_plan(&plan, None).await;

    let errors: Vec<_> = logger
        .assertions()
        .into_iter()
        .filter(|e| e.status == Some(Status::Errors))
        .collect();
    assert_eq!(errors.len(), 1);
    assert!(errors[0]
        .message
        .as_deref()
        .is_some_and(|m| m.contains("boom")));
    assert!(failed_in_teardown.load(Ordering::SeqCst));
}

#[tokio::test]
async fn test_panicking_body_is_recorded_as_error() {
    let (logger, mut plan) = create_test_plan("panics");
    let teardowns = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&teardowns);

    plan.module("m")
        .teardown(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        })
        .test("panics", |_| panic!("kaboom"))
        .test("after", |t| {
            t.assert(true, "still runs")?;
            Ok(())
        });

    run_plan(&plan, None).await;

    let error = logger
        .find(|e| e.status == Some(Status::Errors))
        .expect("Failed to find error entry");
    assert_eq!(error.message.as_deref(), Some("kaboom"));
    assert_eq!(error.test.as_deref(), Some("panics"));
    assert_eq!(logger.count(Status::Passed), 1);
    assert_eq!(teardowns.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_failed_setup_skips_body_but_runs_teardown() {
    let (logger, mut plan) = create_test_plan("setup");
    let body_ran = Arc::new(AtomicBool::new(false));
    let teardown_ran = Arc::new(AtomicBool::new(false));
    let (body, teardown) = (Arc::clone(&body_ran), Arc::clone(&teardown_ran));

    plan.module("m")
        .setup(|t| {
            t.assert(false, "setup check")?;
            Ok(())
        })
        .teardown(move |_| {
            teardown.store(true, Ordering::SeqCst);
            Ok(())
        })
        .test("body", move |_| {
            body.store(true, Ordering::SeqCst);
            Ok(())
        });

    run_plan(&plan, None).await;

    assert!(!body_ran.load(Ordering::SeqCst));
    assert!(teardown_ran.load(Ordering::SeqCst));
    let failed = logger.assertions().remove(0);
    assert_eq!(failed.status, Some(Status::Failed));
    assert_eq!(failed.mode, Some(Mode::Setup));
}

#[tokio::test]
async fn test_setup_error_still_runs_teardown() {
    let (logger, mut plan) = create_test_plan("setup");
    let teardown_ran = Arc::new(AtomicBool::new(false));
    let teardown = Arc::clone(&teardown_ran);

    plan.module("m")
        .setup(|_| Err(anyhow!("no database")))
        .teardown(move |t| {
            teardown.store(true, Ordering::SeqCst);
            t.assert(true, "cleaned up")?;
            Ok(())
        })
        .test("body", |t| {
            t.assert(true, "unreached")?;
            Ok(())
        });

    run_plan(&plan, None).await;

    assert!(teardown_ran.load(Ordering::SeqCst));
    let entries = logger.assertions();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].status, Some(Status::Errors));
    assert_eq!(entries[0].mode, Some(Mode::Setup));
    assert_eq!(entries[1].message.as_deref(), Some("cleaned up"));
    assert_eq!(entries[1].mode, Some(Mode::Teardown));
}

#[tokio::test]
async fn test_filter_selects_modules() {
    let (logger, mut plan) = create_test_plan("filtered");
    plan.module("A").test("a1", |t| {
        t.assert(true, "a1")?;
        Ok(())
    });
    plan.module("B").test("b1", |t| {
        t.assert(true, "b1")?;
        Ok(())
    });

    let filter = Filter::from_json(r#"{"A": true}"#).expect("Failed to parse filter");
    run_plan(&plan, Some(&filter)).await;

    assert_eq!(logger.count(Status::Passed), 1);
    assert!(logger.find(|e| e.module() == "B").is_none());
    assert!(logger.find(|e| e.kind == EntryKind::ModuleBegin && e.module() == "A").is_some());
}

#[tokio::test]
async fn test_nested_filter_selects_tests() {
    let (logger, mut plan) = create_test_plan("filtered");
    plan.module("A")
        .test("t1", |t| {
            t.assert(true, "t1")?;
            Ok(())
        })
        .test("t2", |t| {
            t.assert(true, "t2")?;
            Ok(())
        });

    let filter = Filter::new().nested("A", Filter::new().include("t2"));
    run_plan(&plan, Some(&filter)).await;

    let entries = logger.assertions();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].test.as_deref(), Some("t2"));
}

#[tokio::test]
async fn test_module_with_no_selected_tests_is_silent() {
    let (logger, mut plan) = create_test_plan("filtered");
    plan.module("A").test("t1", |_| Ok(()));

    let filter = Filter::new().nested("A", Filter::new().exclude("t1"));
    run_plan(&plan, Some(&filter)).await;

    assert_eq!(kinds(&logger), vec![EntryKind::Begin, EntryKind::End]);
}

#[tokio::test]
async fn test_tests_run_strictly_in_order() {
    let (logger, mut plan) = create_test_plan("ordering");
    plan.module("m")
        .setup(|t| {
            t.info("setup")?;
            Ok(())
        })
        .teardown(|t| {
            t.info("teardown")?;
            Ok(())
        })
        .test_async("t1", |t, done| {
            tokio::spawn(async move {
                tokio::time::sleep(Duration::from_millis(20)).await;
                let _ = t.assert(true, "t1 late");
                done.resolve();
            });
            Ok(())
        })
        .test("t2", |t| {
            t.assert(true, "t2")?;
            Ok(())
        });

    run_plan(&plan, None).await;

    let t1_late = logger
        .position(|e| e.message.as_deref() == Some("t1 late"))
        .expect("Failed to find t1 assertion");
    let t1_teardown = logger
        .position(|e| is_info(e, "t1", Mode::Teardown))
        .expect("Failed to find t1 teardown");
    let t2_setup = logger
        .position(|e| is_info(e, "t2", Mode::Setup))
        .expect("Failed to find t2 setup");
    let t2_assert = logger
        .position(|e| e.message.as_deref() == Some("t2"))
        .expect("Failed to find t2 assertion");

    assert!(t1_late < t1_teardown);
    assert!(t1_teardown < t2_setup);
    assert!(t2_setup < t2_assert);
}

#[tokio::test]
async fn test_modules_run_in_insertion_order() {
    let (logger, mut plan) = create_test_plan("ordering");
    for name in ["first", "second", "third"] {
        plan.module(name).test("t", |t| {
            t.assert(true, "ran")?;
            Ok(())
        });
    }

    run_plan(&plan, None).await;

    let order: Vec<String> = logger
        .entries()
        .iter()
        .filter(|e| e.kind == EntryKind::ModuleBegin)
        .map(LogEntry::module)
        .collect();
    assert_eq!(order, vec!["first", "second", "third"]);
}

#[tokio::test]
async fn test_expected_assertion_mismatch() {
    let (logger, mut plan) = create_test_plan("expect");
    plan.module("m").add(
        Test::sync("counted", |t| {
            t.assert(true, "only one")?;
            Ok(())
        })
        .expect(2),
    );

    run_plan(&plan, None).await;

    let entries = logger.assertions();
    assert_eq!(entries.len(), 2);
    assert_eq!(entries[0].message.as_deref(), Some("only one"));
    assert_eq!(entries[1].status, Some(Status::Failed));
    assert_eq!(
        entries[1].message.as_deref(),
        Some("expected assertions (actual = 1, expected = 2)")
    );
}

#[tokio::test]
async fn test_expected_assertion_match_is_recorded() {
    let (logger, mut plan) = create_test_plan("expect");
    plan.module("m").test("counted", |t| {
        t.expect(1)?;
        t.assert(true, "the one")?;
        Ok(())
    });

    run_plan(&plan, None).await;

    assert_eq!(logger.count(Status::Passed), 2);
    assert_eq!(logger.count(Status::Failed), 0);
}

#[tokio::test(start_paused = true)]
async fn test_never_completed_async_test_waits_for_timeout() {
    let (logger, mut plan) = create_test_plan("timeouts");
    plan.module("m").add(
        Test::with_done("hangs", |_, done| {
            tokio::spawn(async move {
                std::future::pending::<()>().await;
                done.resolve();
            });
            Ok(())
        })
        .timeout(Duration::from_millis(50)),
    );

    let (head, signal) = Signal::pending();
    let tail = plan
        .schedule(&signal, None)
        .expect("Failed to schedule plan");
    head.resolve();

    tokio::time::sleep(Duration::from_millis(40)).await;
    assert_eq!(tail.state(), SignalState::Pending);

    assert_eq!(tail.wait().await, Outcome::Resolved);
    let timeout = logger
        .find(|e| e.status == Some(Status::Failed))
        .expect("Failed to find timeout failure");
    assert_eq!(timeout.message.as_deref(), Some("timeout"));
    assert_eq!(timeout.mode, Some(Mode::Test));
}

#[tokio::test(start_paused = true)]
async fn test_timeout_armed_from_handler() {
    let (logger, mut plan) = create_test_plan("timeouts");
    plan.module("m").test_async("slow", |t, done| {
        t.timeout(Duration::from_millis(10), "slow handler")?;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(5)).await;
            done.resolve();
        });
        Ok(())
    });

    run_plan(&plan, None).await;

    let timeout = logger
        .find(|e| e.status == Some(Status::Failed))
        .expect("Failed to find timeout failure");
    assert_eq!(timeout.message.as_deref(), Some("timeout slow handler"));
}

#[tokio::test]
async fn test_dropped_completion_is_an_error() {
    let (logger, mut plan) = create_test_plan("async");
    plan.module("m").test_async("forgets", |_, done| {
        drop(done);
        Ok(())
    });

    run_plan(&plan, None).await;

    let error = logger
        .find(|e| e.status == Some(Status::Errors))
        .expect("Failed to find error entry");
    assert_eq!(
        error.message.as_deref(),
        Some("completion dropped before being invoked")
    );
}

#[tokio::test]
async fn test_cancelled_completion_is_an_error() {
    let (logger, mut plan) = create_test_plan("async");
    plan.module("m").test_async("cancels", |_, done| {
        done.cancel("connection reset");
        Ok(())
    });

    run_plan(&plan, None).await;

    assert_eq!(logger.count(Status::Errors), 1);
    assert!(logger
        .find(|e| e.message.as_deref() == Some("connection reset"))
        .is_some());
}

#[tokio::test]
async fn test_future_handler() {
    let (logger, mut plan) = create_test_plan("futures");
    plan.module("m").test_future("awaits", |t| async move {
        tokio::task::yield_now().await;
        t.equal(&"ready", &"ready", "value")?;
        Ok(())
    });

    run_plan(&plan, None).await;

    assert_eq!(logger.count(Status::Passed), 1);
}

#[tokio::test]
async fn test_throws_on_failure_turns_failures_into_errors() {
    let (logger, mut plan) = create_test_plan("strict");
    plan.set_throws_on_failure(true);
    plan.module("m").test("strict", |t| {
        t.equal(&1, &2, "numbers")?;
        t.assert(true, "unreached")?;
        Ok(())
    });

    run_plan(&plan, None).await;

    assert_eq!(logger.count(Status::Passed), 0);
    assert_eq!(logger.count(Status::Failed), 0);
    let error = logger
        .find(|e| e.status == Some(Status::Errors))
        .expect("Failed to find error entry");
    assert!(error
        .message
        .as_deref()
        .is_some_and(|m| m.starts_with("AssertionError: numbers should be equal")));
}

#[tokio::test]
async fn test_schedule_twice_is_rejected() {
    let (_logger, mut plan) = create_test_plan("twice");
    plan.test("t", |_| Ok(()));

    let (head, signal) = Signal::pending();
    let tail = plan
        .schedule(&signal, None)
        .expect("Failed to schedule plan");
    let err = plan.schedule(&signal, None).unwrap_err();
    assert!(matches!(err, TallyError::PlanAlreadyScheduled { ref plan } if plan == "twice"));

    head.resolve();
    tail.wait().await;
    assert!(!plan.state().is_scheduled());
    plan.schedule(&Signal::resolved(), None)
        .expect("Failed to reschedule finished plan")
        .wait()
        .await;
}

#[tokio::test]
async fn test_empty_plan_returns_input_signal() {
    let (logger, plan) = create_test_plan("empty");
    let signal = Signal::resolved();
    let tail = plan.schedule(&signal, None).expect("Failed to schedule plan");
    assert!(tail.is_same(&signal));
    assert!(logger.is_empty());
}

#[tokio::test]
async fn test_cancelled_head_still_runs_plan() {
    let (logger, mut plan) = create_test_plan("cancelled");
    plan.test("t", |t| {
        t.assert(true, "ran anyway")?;
        Ok(())
    });

    let tail = plan
        .schedule(&Signal::cancelled(), None)
        .expect("Failed to schedule plan");
    tail.wait().await;

    assert_eq!(logger.count(Status::Passed), 1);
}

#[tokio::test]
async fn test_tests_without_module_use_default() {
    let (logger, mut plan) = create_test_plan("defaults");
    plan.test("loose", |t| {
        t.assert(true, "ok")?;
        Ok(())
    });
    assert_eq!(
        plan.current_module().map(Module::name).as_deref(),
        Some(DEFAULT_MODULE)
    );

    run_plan(&plan, None).await;
    assert_eq!(logger.assertions()[0].module(), DEFAULT_MODULE);
}

#[tokio::test]
async fn test_run_state_tracks_current_test() {
    let (_logger, mut plan) = create_test_plan("state");
    let state = plan.state().clone();
    let observed = Arc::new(parking_lot::Mutex::new(None));
    let sink = Arc::clone(&observed);

    plan.module("m").test("inside", move |_| {
        *sink.lock() = Some((state.is_running(), state.current_test()));
        Ok(())
    });

    run_plan(&plan, None).await;

    let (running, current) = observed
        .lock()
        .clone()
        .expect("Failed to observe state");
    assert!(running);
    let current = current.expect("Failed to observe current test");
    assert_eq!(current.test_name, "inside");
    assert_eq!(current.mode, Mode::Test);

    assert!(!plan.state().is_running());
    assert!(plan.state().current_test().is_none());
}

#[tokio::test]
async fn test_fixtures_flow_from_setup_to_teardown() {
    let (logger, mut plan) = create_test_plan("fixtures");
    plan.module_with(
        "db",
        ModuleOptions {
            setup: Some(Handler::sync(|t| {
                t.insert(vec![1, 2, 3]);
                Ok(())
            })),
            teardown: Some(Handler::sync(|t| {
                let rows: Option<Vec<i32>> = t.take();
                t.assert(rows.is_some_and(|r| r.len() == 4), "fixture updated")?;
                Ok(())
            })),
        },
    )
    .test("pushes", |t| {
        t.with(|rows: &mut Vec<i32>| rows.push(4));
        Ok(())
    });

    run_plan(&plan, None).await;

    assert_eq!(logger.count(Status::Passed), 1);
}

#[tokio::test]
async fn test_child_module_names() {
    let (logger, mut plan) = create_test_plan("nested");
    let outer = Module::new("outer");
    let mut inner = outer.child("inner");
    inner.test("deep", |t| {
        t.assert(true, "nested")?;
        Ok(())
    });
    plan.add_module(inner);

    run_plan(&plan, None).await;

    let item = logger.assertions().remove(0);
    assert_eq!(item.module_names, vec!["outer", "inner"]);
    assert_eq!(item.module(), "outer.inner");
}

#[tokio::test]
async fn test_module_with_keeps_handlers_it_does_not_replace() {
    let (logger, mut plan) = create_test_plan("reselect");
    plan.module("m").teardown(|t| {
        t.info("original teardown")?;
        Ok(())
    });
    plan.module_with(
        "m",
        ModuleOptions {
            setup: Some(Handler::sync(|t| {
                t.info("added setup")?;
                Ok(())
            })),
            teardown: None,
        },
    )
    .test("t", |_| Ok(()));

    run_plan(&plan, None).await;

    assert_eq!(plan.modules().len(), 1);
    let entries = logger.entries();
    assert!(entries.iter().any(|e| is_info(e, "t", Mode::Setup)));
    let teardown = entries
        .iter()
        .find(|e| is_info(e, "t", Mode::Teardown))
        .expect("Failed to find teardown output");
    assert_eq!(teardown.message.as_deref(), Some("original teardown"));
}
