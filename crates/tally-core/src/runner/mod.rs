//! Runs plans one after another on a shared schedule.
//!
//! A [`Runner`] owns the schedule's head and tail signals. Every call to
//! [`Runner::run`] chains the given plan (or the runner's default plan) after
//! the current tail, so a second run issued while the first is still
//! executing queues behind it instead of interleaving with it.
//!
//! ```text
//!  head ─▶ plan A ─▶ plan B ─▶ default plan ─▶ tail
//!   │
//!   start() / autostart
//! ```
//!
//! # Usage
//!
//! ```rust,no_run
//! use tally_core::{Assertions, RunnerBuilder};
//!
//! # async fn example() -> tally_core::Result<()> {
//! let mut runner = RunnerBuilder::new().autostart(false).build();
//! runner.module("strings").test("concat", |t| {
//!     t.equal(&format!("{}{}", "a", "b"), &"ab".to_string(), "joined")?;
//!     Ok(())
//! });
//!
//! runner.run(None, None)?;
//! runner.start();
//! runner.wait().await;
//! # Ok(())
//! # }
//! ```

use std::{future::Future, mem, sync::Arc};

use log::{debug, warn};

use crate::{
    config::RunConfig,
    context::{Done, TestContext},
    error::{Result, TallyError},
    handler::HandlerResult,
    loggers::Logger,
    models::Filter,
    plan::{Module, ModuleOptions, Plan, Test},
    signal::{Outcome, Signal, SignalState, Trigger},
};

pub mod builder;

#[cfg(test)]
mod tests;

pub use builder::RunnerBuilder;

/// Name of the plan built through the runner's planning methods.
pub const DEFAULT_PLAN: &str = "default";

/// Schedules plans sequentially and owns the default plan.
pub struct Runner {
    config: RunConfig,
    logger: Option<Arc<dyn Logger>>,
    default_plan: Plan,
    head: Option<Trigger>,
    root: Signal,
    tail: Signal,
}

impl Runner {
    pub(crate) fn new(config: RunConfig, logger: Option<Arc<dyn Logger>>) -> Self {
        let default_plan = Self::fresh_plan(logger.as_ref());
        let (head, root) = Self::fresh_root(config.autostart);
        let tail = root.clone();
        Self {
            config,
            logger,
            default_plan,
            head,
            root,
            tail,
        }
    }

    fn fresh_plan(logger: Option<&Arc<dyn Logger>>) -> Plan {
        let plan = Plan::new(DEFAULT_PLAN);
        if let Some(logger) = logger {
            plan.set_logger(Arc::clone(logger));
        }
        plan
    }

    fn fresh_root(autostart: bool) -> (Option<Trigger>, Signal) {
        let (trigger, root) = Signal::pending();
        if autostart {
            trigger.resolve();
            (None, root)
        } else {
            (Some(trigger), root)
        }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    /// The plan built through [`Runner::module`], [`Runner::test`] and
    /// friends.
    pub fn default_plan(&self) -> &Plan {
        &self.default_plan
    }

    pub fn default_plan_mut(&mut self) -> &mut Plan {
        &mut self.default_plan
    }

    /// Signal at the start of the schedule.
    pub fn root(&self) -> &Signal {
        &self.root
    }

    /// Signal that settles once everything scheduled so far has finished.
    pub fn tail(&self) -> &Signal {
        &self.tail
    }

    /// Whether the schedule was cancelled and needs a [`Runner::reset`].
    pub fn is_halted(&self) -> bool {
        self.root.state() == SignalState::Cancelled || self.tail.state() == SignalState::Cancelled
    }

    // ..........................................................
    // Planning through the default plan
    //

    pub fn module(&mut self, name: &str) -> &mut Module {
        self.default_plan.module(name)
    }

    pub fn module_with(&mut self, name: &str, options: ModuleOptions) -> &mut Module {
        self.default_plan.module_with(name, options)
    }

    pub fn add_module(&mut self, module: Module) -> &mut Module {
        self.default_plan.add_module(module)
    }

    pub fn setup<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&TestContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.default_plan.setup(f);
        self
    }

    pub fn teardown<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&TestContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.default_plan.teardown(f);
        self
    }

    pub fn test<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&TestContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.default_plan.test(name, f);
        self
    }

    pub fn test_async<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(TestContext, Done) -> HandlerResult + Send + Sync + 'static,
    {
        self.default_plan.test_async(name, f);
        self
    }

    pub fn test_future<F, Fut>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.default_plan.test_future(name, f);
        self
    }

    pub fn add_test(&mut self, test: Test) -> &mut Self {
        self.default_plan.add_test(test);
        self
    }

    // ..........................................................
    // Running
    //

    /// Queues `plan` (or the default plan) after everything already
    /// scheduled and returns the new tail.
    ///
    /// Running the default plan hands it to the schedule and replaces it
    /// with an empty one. `filter` falls back to the configured filter.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::ScheduleHalted` if the schedule was cancelled
    /// and `TallyError::PlanAlreadyScheduled` if `plan` is still queued from
    /// an earlier run.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn run(&mut self, plan: Option<&Plan>, filter: Option<&Filter>) -> Result<Signal> {
        if self.is_halted() {
            warn!("refusing to run: schedule was cancelled");
            return Err(TallyError::ScheduleHalted);
        }

        let filter = filter.or(self.config.filter.as_ref());
        let tail = match plan {
            Some(plan) => plan.schedule_with(&self.tail, filter, &self.config)?,
            None => {
                let fresh = Self::fresh_plan(self.logger.as_ref());
                let plan = mem::replace(&mut self.default_plan, fresh);
                plan.schedule_with(&self.tail, filter, &self.config)?
            }
        };

        debug!("queued run after current tail");
        self.tail = tail.clone();
        Ok(tail)
    }

    /// Resolves the head signal, releasing everything queued so far.
    pub fn start(&mut self) {
        if let Some(head) = self.head.take() {
            debug!("starting schedule");
            head.resolve();
        }
    }

    /// Cancels the head signal if it has not been released yet.
    ///
    /// Work already queued still drains; further runs fail with
    /// `TallyError::ScheduleHalted` until [`Runner::reset`].
    pub fn abort(&mut self) {
        if let Some(head) = self.head.take() {
            debug!("aborting schedule");
            head.cancel();
        }
    }

    /// Starts a new schedule and discards the default plan.
    ///
    /// Work queued on the previous schedule keeps running and the new root
    /// does not settle until it has drained, so plans from the two schedules
    /// never overlap.
    ///
    /// # Panics
    ///
    /// Panics if previous work is still pending and this is called outside
    /// of a Tokio runtime.
    pub fn reset(&mut self) {
        let (head, gate) = Self::fresh_root(self.config.autostart);
        let root = if self.tail.state().is_settled() {
            gate
        } else {
            debug!("reset while previous schedule is draining");
            self.tail.then(move |_| async move { gate.wait().await })
        };
        self.head = head;
        self.tail = root.clone();
        self.root = root;
        self.default_plan = Self::fresh_plan(self.logger.as_ref());
    }

    /// Waits for everything scheduled so far.
    pub async fn wait(&self) -> Outcome {
        self.tail.wait().await
    }

    /// Runs the default plan if it has modules, starts the schedule and
    /// waits for it to drain.
    ///
    /// # Errors
    ///
    /// Returns the same errors as [`Runner::run`].
    pub async fn finish(&mut self) -> Result<Outcome> {
        if !self.default_plan.is_empty() {
            self.run(None, None)?;
        }
        self.start();
        Ok(self.wait().await)
    }
}

impl std::fmt::Debug for Runner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Runner")
            .field("config", &self.config)
            .field("default_plan", &self.default_plan)
            .field("started", &self.head.is_none())
            .field("root", &self.root.state())
            .field("tail", &self.tail.state())
            .finish_non_exhaustive()
    }
}
