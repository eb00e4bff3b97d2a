//! The assertion context handed to every setup, test and teardown handler.
//!
//! A [`TestContext`] is created once per scheduled test and shared by all
//! three of its phases. It tracks the pass/fail state of the *current* phase
//! (reset at every phase entry), forwards every recorded assertion to the
//! plan's logger, and refuses to record anything while the test is in
//! [`Mode::Planning`].
//!
//! The context is a cheap handle, so async handlers may move clones into
//! spawned tasks and keep asserting until they invoke their [`Done`]. Once
//! the phase exits, any further assertion through a stale clone fails with
//! [`TallyError::NotRunning`].
//!
//! # Fixtures
//!
//! Setup, body and teardown of one test share a typed fixture store, so a
//! setup handler can build state that the body and teardown consume:
//!
//! ```rust,no_run
//! use tally_core::{Handler, Module};
//!
//! let mut module = Module::new("db");
//! module.set_setup(Some(Handler::sync(|t| {
//!     t.insert(vec![1, 2, 3]);
//!     Ok(())
//! })));
//! module.test("reads fixture", |t| {
//!     let len = t.with(|rows: &mut Vec<i32>| rows.len()).unwrap_or(0);
//!     t.assert(len == 3, "fixture visible")?;
//!     Ok(())
//! });
//! ```

use std::{
    any::{Any, TypeId},
    collections::HashMap,
    fmt,
    future::Future,
    sync::Arc,
    time::Duration,
};

use log::{debug, warn};
use parking_lot::Mutex;
use tokio::{
    sync::{oneshot, Notify},
    time::{sleep_until, Instant},
};

use crate::{
    error::{AssertionError, Result, TallyError},
    handler::HandlerResult,
    loggers::Logger,
    models::{Mode, Status, TestInfo},
    state::RunState,
};

/// How an async phase reported completion.
#[derive(Debug)]
pub(crate) enum Completion {
    Resolved,
    Cancelled(String),
}

/// Continuation handed to async handlers.
///
/// Invoking it (by value) completes the current phase. Dropping it without
/// invoking completes the phase with a recorded error.
#[derive(Debug)]
pub struct Done {
    tx: oneshot::Sender<Completion>,
}

impl Done {
    pub(crate) fn channel() -> (Done, oneshot::Receiver<Completion>) {
        let (tx, rx) = oneshot::channel();
        (Done { tx }, rx)
    }

    /// Completes the phase successfully.
    pub fn resolve(self) {
        self.send(Completion::Resolved);
    }

    /// Completes the phase, recording `reason` as an error.
    pub fn cancel(self, reason: impl fmt::Display) {
        self.send(Completion::Cancelled(reason.to_string()));
    }

    /// Completes the phase from a handler-style result.
    pub fn finish(self, result: HandlerResult) {
        match result {
            Ok(()) => self.resolve(),
            Err(e) => self.cancel(format!("{e:#}")),
        }
    }

    fn send(self, completion: Completion) {
        // The receiver is gone once the phase was forced to completion by a
        // timeout; late invocations are ignored.
        if self.tx.send(completion).is_err() {
            debug!("phase already completed; ignoring late continuation");
        }
    }
}

#[derive(Debug)]
struct PhaseTimer {
    at: Instant,
    message: String,
}

#[derive(Debug, Default)]
struct PhaseState {
    mode: Mode,
    failed: bool,
    test_failed: bool,
    actual: usize,
    expected: Option<usize>,
    timer: Option<PhaseTimer>,
}

struct ContextInner {
    info: TestInfo,
    logger: Arc<dyn Logger>,
    throws_on_failure: bool,
    run_state: RunState,
    state: Mutex<PhaseState>,
    rearm: Notify,
    fixtures: Mutex<HashMap<TypeId, Box<dyn Any + Send>>>,
}

/// Assertion sink and per-phase state for one running test.
#[derive(Clone)]
pub struct TestContext {
    inner: Arc<ContextInner>,
}

impl TestContext {
    pub(crate) fn new(
        info: TestInfo,
        logger: Arc<dyn Logger>,
        throws_on_failure: bool,
        run_state: RunState,
    ) -> Self {
        Self {
            inner: Arc::new(ContextInner {
                info: info.in_mode(Mode::Planning),
                logger,
                throws_on_failure,
                run_state,
                state: Mutex::default(),
                rearm: Notify::new(),
                fixtures: Mutex::default(),
            }),
        }
    }

    /// Identity of the test, tagged with the current mode.
    pub fn test_info(&self) -> TestInfo {
        self.inner.info.in_mode(self.mode())
    }

    /// Current execution mode.
    pub fn mode(&self) -> Mode {
        self.inner.state.lock().mode
    }

    /// Whether a phase is executing.
    pub fn is_running(&self) -> bool {
        self.mode().is_running()
    }

    /// Whether the current phase has failed so far.
    pub fn has_failed(&self) -> bool {
        self.inner.state.lock().failed
    }

    /// Whether any phase of this test has failed so far.
    pub fn test_failed(&self) -> bool {
        self.inner.state.lock().test_failed
    }

    /// Assertions recorded in the current phase.
    pub fn assertion_count(&self) -> usize {
        self.inner.state.lock().actual
    }

    // ..........................................................
    // Primitive API
    //

    /// Primitive assertion. Every other assertion helper reduces to this.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::NotRunning` outside of a phase, and
    /// `TallyError::Assertion` for a failed assertion when the plan throws
    /// on failure.
    pub fn assert(&self, pass: bool, message: impl AsRef<str>) -> Result<()> {
        self.record(pass, message.as_ref(), None, true)
    }

    /// Primitive assertion that also logs the compared values.
    ///
    /// The message becomes `message (actual = .., expected = ..)`; no
    /// comparison is performed here.
    pub fn assert_values<A, E>(
        &self,
        pass: bool,
        message: impl AsRef<str>,
        actual: &A,
        expected: &E,
    ) -> Result<()>
    where
        A: fmt::Debug + ?Sized,
        E: fmt::Debug + ?Sized,
    {
        let values = (format!("{actual:?}"), format!("{expected:?}"));
        self.record(pass, message.as_ref(), Some(values), true)
    }

    /// Records an error and fails the current phase.
    pub fn error(&self, message: impl fmt::Display) -> Result<()> {
        let mode = self.running_mode("assert error", |state| {
            state.failed = true;
            state.test_failed = true;
        })?;
        self.inner
            .logger
            .add(Status::Errors, &self.inner.info.in_mode(mode), &message.to_string());
        Ok(())
    }

    /// Records a warning. Warnings do not fail the phase.
    pub fn warn(&self, message: impl fmt::Display) -> Result<()> {
        let mode = self.running_mode("warn", |_| {})?;
        self.inner
            .logger
            .add(Status::Warnings, &self.inner.info.in_mode(mode), &message.to_string());
        Ok(())
    }

    /// Sends informational output to the logger. Not an assertion.
    pub fn info(&self, message: impl fmt::Display) -> Result<()> {
        let mode = self.running_mode("log info", |_| {})?;
        self.inner
            .logger
            .info(&self.inner.info.in_mode(mode), &message.to_string());
        Ok(())
    }

    /// Sets the number of assertions expected in the current phase.
    pub fn expect(&self, count: usize) -> Result<()> {
        self.running_mode("expect", |state| state.expected = Some(count))?;
        Ok(())
    }

    /// Assertion count expected for the current phase, if any.
    pub fn expected(&self) -> Option<usize> {
        self.inner.state.lock().expected
    }

    /// Arms a timer for the current phase, replacing any earlier one.
    ///
    /// If the phase has not completed when the timer fires, a failed
    /// `timeout <message>` assertion is recorded and the phase is forced to
    /// completion.
    pub fn timeout(&self, duration: Duration, message: impl Into<String>) -> Result<()> {
        let message = message.into();
        self.running_mode("arm timeout", |state| {
            state.timer = Some(PhaseTimer {
                at: Instant::now() + duration,
                message,
            });
        })?;
        self.inner.rearm.notify_one();
        Ok(())
    }

    // ..........................................................
    // Fixtures
    //

    /// Stores a fixture shared by all phases of this test.
    pub fn insert<T: Any + Send>(&self, value: T) {
        self.inner
            .fixtures
            .lock()
            .insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Runs `f` against a stored fixture.
    pub fn with<T, R, F>(&self, f: F) -> Option<R>
    where
        T: Any + Send,
        F: FnOnce(&mut T) -> R,
    {
        let mut fixtures = self.inner.fixtures.lock();
        fixtures
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_mut::<T>())
            .map(f)
    }

    /// Removes and returns a stored fixture.
    pub fn take<T: Any + Send>(&self) -> Option<T> {
        self.inner
            .fixtures
            .lock()
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast::<T>().ok())
            .map(|boxed| *boxed)
    }

    // ..........................................................
    // Phase lifecycle
    //

    pub(crate) fn enter(&self, mode: Mode, expected: Option<usize>, timeout: Option<Duration>) {
        {
            let mut state = self.inner.state.lock();
            state.mode = mode;
            state.failed = false;
            state.actual = 0;
            state.expected = expected;
            state.timer = timeout.map(|duration| PhaseTimer {
                at: Instant::now() + duration,
                message: String::new(),
            });
        }
        self.inner.run_state.enter_test(self.inner.info.in_mode(mode));
        debug!("{} entered {mode}", self.inner.info);
    }

    /// Ends the current phase and reports whether it passed.
    pub(crate) fn exit(&self) -> bool {
        let verify = {
            let mut state = self.inner.state.lock();
            state.timer = None;
            if state.failed {
                None
            } else {
                state.expected.map(|expected| (state.actual, expected))
            }
        };

        if let Some((actual, expected)) = verify {
            let values = (actual.to_string(), expected.to_string());
            // Already running, so this cannot fail and never throws.
            let _ = self.record(actual == expected, "expected assertions", Some(values), false);
        }

        let (mode, passed) = {
            let mut state = self.inner.state.lock();
            let mode = state.mode;
            let passed = !state.failed;
            state.mode = Mode::Planning;
            state.failed = false;
            (mode, passed)
        };
        self.inner.run_state.exit_test();
        debug!("{} left {mode} (passed: {passed})", self.inner.info);
        passed
    }

    /// Records a handler failure that escaped the handler.
    pub(crate) fn record_escape(&self, message: &str) {
        if let Err(e) = self.error(message) {
            warn!("could not record handler error: {e}");
        }
    }

    /// Waits for `fut`, racing it against the phase timer.
    ///
    /// Returns `None` if the timer fired first; the timeout failure has then
    /// already been recorded.
    pub(crate) async fn race_timer<F: Future>(&self, fut: F) -> Option<F::Output> {
        tokio::pin!(fut);
        loop {
            let deadline = self.inner.state.lock().timer.as_ref().map(|t| t.at);
            let rearmed = self.inner.rearm.notified();
            tokio::pin!(rearmed);

            match deadline {
                Some(at) => {
                    tokio::select! {
                        output = &mut fut => return Some(output),
                        _ = &mut rearmed => continue,
                        _ = sleep_until(at) => {
                            if self.fire_timer(at) {
                                return None;
                            }
                        }
                    }
                }
                None => {
                    tokio::select! {
                        output = &mut fut => return Some(output),
                        _ = &mut rearmed => continue,
                    }
                }
            }
        }
    }

    /// Fires the timer armed for `at`. Returns false if it was re-armed.
    fn fire_timer(&self, at: Instant) -> bool {
        let message = {
            let mut state = self.inner.state.lock();
            match &state.timer {
                Some(timer) if timer.at == at => {}
                _ => return false,
            }
            let timer = state.timer.take();
            state.failed = true;
            state.test_failed = true;
            state.actual += 1;
            timer.map(|t| t.message).unwrap_or_default()
        };
        let text = format!("timeout {message}").trim_end().to_string();
        warn!("{} {text}", self.inner.info);
        self.inner
            .logger
            .add(Status::Failed, &self.test_info(), &text);
        true
    }

    fn running_mode<F>(&self, operation: &'static str, update: F) -> Result<Mode>
    where
        F: FnOnce(&mut PhaseState),
    {
        let mut state = self.inner.state.lock();
        if !state.mode.is_running() {
            return Err(TallyError::not_running(&self.inner.info, operation));
        }
        update(&mut state);
        Ok(state.mode)
    }

    fn record(
        &self,
        pass: bool,
        message: &str,
        values: Option<(String, String)>,
        may_throw: bool,
    ) -> Result<()> {
        let mode = self.running_mode("assert", |state| {
            if !pass {
                state.failed = true;
                state.test_failed = true;
            }
            state.actual += 1;
        })?;

        if !pass && may_throw && self.inner.throws_on_failure {
            let mut err = AssertionError::new(message);
            if let Some((actual, expected)) = values {
                err = err.with_values(actual, expected);
            }
            return Err(err.into());
        }

        let text = match &values {
            Some((actual, expected)) => {
                format!("{message} (actual = {actual}, expected = {expected})")
            }
            None => message.to_string(),
        };
        let status = if pass { Status::Passed } else { Status::Failed };
        self.inner
            .logger
            .add(status, &self.inner.info.in_mode(mode), &text);
        Ok(())
    }
}

impl fmt::Debug for TestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.state.lock();
        f.debug_struct("TestContext")
            .field("test", &self.inner.info.to_string())
            .field("mode", &state.mode)
            .field("failed", &state.failed)
            .field("actual", &state.actual)
            .field("expected", &state.expected)
            .finish()
    }
}
