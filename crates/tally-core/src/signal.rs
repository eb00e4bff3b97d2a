//! Completion signals used to chain scheduled work.
//!
//! Every schedulable unit (plan, module, test) receives a [`Signal`] meaning
//! "predecessor work is done" and returns a new one meaning "this unit and all
//! of its children are done". Chaining is monadic: [`Signal::then`] attaches a
//! continuation that does not start until the prior signal settles, so the Nth
//! unit never begins before the (N-1)th unit's whole subtree has finished.
//!
//! A signal settles exactly once, either [`Outcome::Resolved`] or
//! [`Outcome::Cancelled`]. Continuations receive the outcome and run on both
//! branches; a cancelled predecessor never stalls the chain.
//!
//! ```text
//!  head ──then──▶ test 1 ──then──▶ test 2 ──then──▶ tail
//!   │               │                │
//!   resolve()       setup/test/      setup/test/
//!                   teardown         teardown
//! ```

use std::future::Future;

use log::trace;
use tokio::sync::watch;

/// Observable state of a signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalState {
    /// Work has not finished yet
    Pending,

    /// Work finished normally
    Resolved,

    /// Work was cancelled or abandoned
    Cancelled,
}

impl SignalState {
    /// Whether the signal has settled.
    pub fn is_settled(&self) -> bool {
        !matches!(self, SignalState::Pending)
    }
}

/// Final outcome of a settled signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Resolved,
    Cancelled,
}

impl From<Outcome> for SignalState {
    fn from(outcome: Outcome) -> Self {
        match outcome {
            Outcome::Resolved => SignalState::Resolved,
            Outcome::Cancelled => SignalState::Cancelled,
        }
    }
}

/// Read side of a completion signal. Cheap to clone.
#[derive(Debug, Clone)]
pub struct Signal {
    rx: watch::Receiver<SignalState>,
}

/// Write side of a completion signal.
///
/// Dropping a trigger that has not been settled cancels its signal, so an
/// abandoned unit of work can never leave downstream work waiting forever.
#[derive(Debug)]
pub struct Trigger {
    tx: watch::Sender<SignalState>,
}

impl Signal {
    /// Creates a pending signal and the trigger that settles it.
    pub fn pending() -> (Trigger, Signal) {
        let (tx, rx) = watch::channel(SignalState::Pending);
        (Trigger { tx }, Signal { rx })
    }

    /// Creates a signal that is already resolved.
    pub fn resolved() -> Signal {
        let (_tx, rx) = watch::channel(SignalState::Resolved);
        Signal { rx }
    }

    /// Creates a signal that is already cancelled.
    pub fn cancelled() -> Signal {
        let (_tx, rx) = watch::channel(SignalState::Cancelled);
        Signal { rx }
    }

    /// Current state without waiting.
    pub fn state(&self) -> SignalState {
        *self.rx.borrow()
    }

    /// Whether both handles observe the same underlying signal.
    pub fn is_same(&self, other: &Signal) -> bool {
        self.rx.same_channel(&other.rx)
    }

    /// Waits until the signal settles.
    pub async fn wait(&self) -> Outcome {
        let mut rx = self.rx.clone();
        let settled = match rx.wait_for(SignalState::is_settled).await {
            Ok(state) => *state,
            Err(_) => SignalState::Cancelled,
        };
        match settled {
            SignalState::Resolved => Outcome::Resolved,
            _ => Outcome::Cancelled,
        }
    }

    /// Attaches a continuation that runs once this signal settles.
    ///
    /// The continuation is invoked on both the resolved and the cancelled
    /// branch and its return value settles the returned signal. If the
    /// continuation panics, the returned signal is cancelled.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn then<F, Fut>(&self, continuation: F) -> Signal
    where
        F: FnOnce(Outcome) -> Fut + Send + 'static,
        Fut: Future<Output = Outcome> + Send + 'static,
    {
        let (trigger, next) = Signal::pending();
        let prior = self.clone();
        tokio::spawn(async move {
            let outcome = prior.wait().await;
            let settled = continuation(outcome).await;
            trigger.settle(settled);
        });
        next
    }
}

impl Trigger {
    /// Resolves the signal.
    pub fn resolve(self) {
        self.settle(Outcome::Resolved);
    }

    /// Cancels the signal.
    pub fn cancel(self) {
        self.settle(Outcome::Cancelled);
    }

    /// Settles the signal with `outcome`.
    pub fn settle(self, outcome: Outcome) {
        self.set(outcome.into());
    }

    /// Whether the signal has already settled.
    pub fn is_settled(&self) -> bool {
        self.tx.borrow().is_settled()
    }

    fn set(&self, state: SignalState) {
        let previous = self.tx.send_replace(state);
        trace!("signal settled: {previous:?} -> {state:?}");
    }
}

impl Drop for Trigger {
    fn drop(&mut self) {
        if !self.is_settled() {
            self.set(SignalState::Cancelled);
        }
    }
}
