//! Execution of a single phase (setup, test body or teardown).
//!
//! Every phase follows the same transition: enter (set mode, reset counters,
//! publish the current test), invoke the handler, convert anything that
//! escapes the handler into a recorded error, wait for completion according
//! to the handler's async flag, then exit (clear mode, verify the expected
//! assertion count, clear the current test).

use std::{
    panic::{self, AssertUnwindSafe},
    time::Duration,
};

use futures::FutureExt;
use log::warn;

use crate::{
    assertions::panic_message,
    context::{Completion, Done, TestContext},
    handler::{Handler, HandlerResult},
    models::Mode,
};

/// Runs one phase to completion and reports whether it passed.
///
/// A missing handler is an empty, passing phase.
pub(crate) async fn run_phase(
    ctx: &TestContext,
    mode: Mode,
    handler: Option<&Handler>,
    expected: Option<usize>,
    timeout: Option<Duration>,
) -> bool {
    ctx.enter(mode, expected, timeout);

    match handler {
        None => {}
        Some(Handler::Sync(f)) => {
            let result = panic::catch_unwind(AssertUnwindSafe(|| f(ctx)));
            settle_result(ctx, result);
        }
        Some(Handler::Async(f)) => {
            let (done, completion) = Done::channel();
            let handle = ctx.clone();
            match panic::catch_unwind(AssertUnwindSafe(move || f(handle, done))) {
                Ok(Ok(())) => {
                    if let Some(received) = ctx.race_timer(completion).await {
                        match received {
                            Ok(Completion::Resolved) => {}
                            Ok(Completion::Cancelled(reason)) => ctx.record_escape(&reason),
                            Err(_) => {
                                warn!(
                                    "{} dropped its completion without invoking it",
                                    ctx.test_info()
                                );
                                ctx.record_escape("completion dropped before being invoked");
                            }
                        }
                    }
                }
                escaped => settle_result(ctx, escaped),
            }
        }
        Some(Handler::Future(f)) => {
            let handle = ctx.clone();
            match panic::catch_unwind(AssertUnwindSafe(move || f(handle))) {
                Ok(fut) => {
                    let guarded = AssertUnwindSafe(fut).catch_unwind();
                    if let Some(result) = ctx.race_timer(guarded).await {
                        settle_result(ctx, result);
                    }
                }
                Err(payload) => ctx.record_escape(&panic_message(payload.as_ref())),
            }
        }
    }

    ctx.exit()
}

fn settle_result(ctx: &TestContext, result: std::thread::Result<HandlerResult>) {
    match result {
        Ok(Ok(())) => {}
        Ok(Err(e)) => ctx.record_escape(&format!("{e:#}")),
        Err(payload) => ctx.record_escape(&panic_message(payload.as_ref())),
    }
}
