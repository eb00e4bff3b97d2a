//! Plans, modules and tests, and how they are scheduled.
//!
//! A [`Plan`] is an ordered collection of [`Module`]s, each an ordered
//! collection of [`Test`]s. Scheduling a plan threads one completion
//! [`Signal`] through every unit in insertion order:
//!
//! ```text
//!  signal ─▶ plan begin ─▶ module begin ─▶ test 1 ─▶ test 2 ─▶ module end ─▶ ... ─▶ plan end
//!                                           │
//!                                           ├─ setup      (skips body on failure)
//!                                           ├─ body
//!                                           └─ teardown   (always)
//! ```
//!
//! Nothing runs until the signal passed to [`Plan::schedule`] settles. Every
//! continuation runs on both the resolved and the cancelled branch, so a
//! failing, panicking or timed-out phase never stalls what comes after it.
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tally_core::{Assertions, MemoryLogger, Plan, Signal};
//!
//! # async fn example() -> tally_core::Result<()> {
//! let logger = Arc::new(MemoryLogger::new());
//! let mut plan = Plan::new("arithmetic");
//! plan.set_logger(logger.clone());
//! plan.module("math").test("add", |t| {
//!     t.equal(&(1 + 1), &2, "sum")?;
//!     Ok(())
//! });
//!
//! let (head, signal) = Signal::pending();
//! let tail = plan.schedule(&signal, None)?;
//! head.resolve();
//! tail.wait().await;
//! # Ok(())
//! # }
//! ```

use std::{fmt, future::Future, sync::Arc, time::Duration};

use log::debug;
use parking_lot::Mutex;

use crate::{
    config::{RunConfig, Verbosity},
    context::{Done, TestContext},
    error::Result,
    handler::{Handler, HandlerResult},
    loggers::{ForwardLogger, Logger},
    models::Filter,
    signal::{Outcome, Signal},
    state::RunState,
};

pub mod module;
mod phase;
pub mod test_case;

#[cfg(test)]
mod tests;

pub use module::Module;
pub use test_case::Test;

/// Module that receives tests added before any module was selected.
pub const DEFAULT_MODULE: &str = "default";

/// Everything a scheduled module needs from its plan.
pub(crate) struct PlanScope {
    pub(crate) name: String,
    pub(crate) logger: Arc<dyn Logger>,
    pub(crate) throws_on_failure: bool,
    pub(crate) default_timeout: Option<Duration>,
    pub(crate) state: RunState,
}

/// Inline setup and teardown for [`Plan::module_with`].
#[derive(Debug, Clone, Default)]
pub struct ModuleOptions {
    pub setup: Option<Handler>,
    pub teardown: Option<Handler>,
}

/// Top-level, ordered collection of modules.
pub struct Plan {
    name: String,
    modules: Vec<Module>,
    current: Option<usize>,
    logger: Mutex<Option<Arc<dyn Logger>>>,
    throws_on_failure: Option<bool>,
    default_timeout: Option<Duration>,
    state: RunState,
}

impl Plan {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            modules: Vec::new(),
            current: None,
            logger: Mutex::new(None),
            throws_on_failure: None,
            default_timeout: None,
            state: RunState::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn modules(&self) -> &[Module] {
        &self.modules
    }

    /// Whether the plan has no modules.
    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }

    /// Handle onto this plan's execution state.
    pub fn state(&self) -> &RunState {
        &self.state
    }

    // ..........................................................
    // Modules
    //

    /// Selects the module named `name` as the target of later calls,
    /// creating it if needed.
    pub fn module(&mut self, name: &str) -> &mut Module {
        let index = match self.modules.iter().position(|m| m.name() == name) {
            Some(index) => index,
            None => {
                self.modules.push(Module::new(name));
                self.modules.len() - 1
            }
        };
        self.current = Some(index);
        &mut self.modules[index]
    }

    /// Like [`Plan::module`], then installs whichever of setup and teardown
    /// `options` provides. Handlers left out keep their current value.
    pub fn module_with(&mut self, name: &str, options: ModuleOptions) -> &mut Module {
        let module = self.module(name);
        if let Some(setup) = options.setup {
            module.set_setup(Some(setup));
        }
        if let Some(teardown) = options.teardown {
            module.set_teardown(Some(teardown));
        }
        module
    }

    /// Appends a fully built module and selects it.
    pub fn add_module(&mut self, module: Module) -> &mut Module {
        self.modules.push(module);
        let index = self.modules.len() - 1;
        self.current = Some(index);
        &mut self.modules[index]
    }

    /// The module that receives setup, teardown and tests added directly on
    /// the plan.
    pub fn current_module(&self) -> Option<&Module> {
        self.current.map(|index| &self.modules[index])
    }

    fn current_module_mut(&mut self) -> &mut Module {
        let current = self.current;
        match current {
            Some(index) => &mut self.modules[index],
            None => self.module(DEFAULT_MODULE),
        }
    }

    // ..........................................................
    // Building through the current module
    //

    pub fn setup<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&TestContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.current_module_mut().setup(f);
        self
    }

    pub fn setup_async<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(TestContext, Done) -> HandlerResult + Send + Sync + 'static,
    {
        self.current_module_mut().setup_async(f);
        self
    }

    pub fn teardown<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&TestContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.current_module_mut().teardown(f);
        self
    }

    pub fn teardown_async<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(TestContext, Done) -> HandlerResult + Send + Sync + 'static,
    {
        self.current_module_mut().teardown_async(f);
        self
    }

    pub fn test<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&TestContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.current_module_mut().test(name, f);
        self
    }

    pub fn test_async<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(TestContext, Done) -> HandlerResult + Send + Sync + 'static,
    {
        self.current_module_mut().test_async(name, f);
        self
    }

    pub fn test_future<F, Fut>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.current_module_mut().test_future(name, f);
        self
    }

    pub fn add_test(&mut self, test: Test) -> &mut Self {
        self.current_module_mut().add(test);
        self
    }

    // ..........................................................
    // Settings
    //

    /// The plan's logger, creating a [`ForwardLogger`] named after the plan
    /// if none was set.
    pub fn logger(&self) -> Arc<dyn Logger> {
        self.logger_or_default(Verbosity::default())
    }

    pub fn set_logger(&self, logger: Arc<dyn Logger>) {
        *self.logger.lock() = Some(logger);
    }

    pub fn with_logger(self, logger: Arc<dyn Logger>) -> Self {
        self.set_logger(logger);
        self
    }

    /// Whether failed assertions are returned as errors from `assert`.
    pub fn throws_on_failure(&self) -> bool {
        self.throws_on_failure.unwrap_or(false)
    }

    pub fn set_throws_on_failure(&mut self, throws: bool) -> &mut Self {
        self.throws_on_failure = Some(throws);
        self
    }

    /// Timeout armed at each phase of tests without one of their own.
    pub fn default_timeout(&self) -> Option<Duration> {
        self.default_timeout
    }

    pub fn set_default_timeout(&mut self, timeout: Option<Duration>) -> &mut Self {
        self.default_timeout = timeout;
        self
    }

    fn logger_or_default(&self, verbosity: Verbosity) -> Arc<dyn Logger> {
        let mut slot = self.logger.lock();
        if let Some(logger) = slot.as_ref() {
            return Arc::clone(logger);
        }
        let logger: Arc<dyn Logger> =
            Arc::new(ForwardLogger::new(self.name.as_str()).with_verbosity(verbosity));
        *slot = Some(Arc::clone(&logger));
        logger
    }

    // ..........................................................
    // Scheduling
    //

    /// Chains the whole plan onto `signal` and returns the signal that
    /// settles after the plan end notification.
    ///
    /// A plan without modules returns `signal` itself. Modules and tests
    /// excluded by `filter` are skipped without logger events.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::PlanAlreadyScheduled` if the previous schedule of
    /// this plan has not finished.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub fn schedule(&self, signal: &Signal, filter: Option<&Filter>) -> Result<Signal> {
        self.schedule_with(signal, filter, &RunConfig::default())
    }

    /// Schedules with `config` supplying the settings this plan leaves unset.
    pub(crate) fn schedule_with(
        &self,
        signal: &Signal,
        filter: Option<&Filter>,
        config: &RunConfig,
    ) -> Result<Signal> {
        if self.modules.is_empty() {
            debug!("plan {} has no modules; nothing to schedule", self.name);
            return Ok(signal.clone());
        }
        self.state.try_schedule(&self.name)?;

        let scope = Arc::new(PlanScope {
            name: self.name.clone(),
            logger: self.logger_or_default(config.verbosity),
            throws_on_failure: self.throws_on_failure.unwrap_or(config.throws_on_failure),
            default_timeout: self.default_timeout.or(config.default_timeout),
            state: self.state.clone(),
        });
        debug!(
            "scheduling plan {} ({} modules, filtered: {})",
            self.name,
            self.modules.len(),
            filter.is_some()
        );

        let begun = {
            let scope = Arc::clone(&scope);
            signal.then(move |_| async move {
                scope.state.begin();
                debug!("plan {} begin", scope.name);
                scope.logger.begin(&scope.name);
                Outcome::Resolved
            })
        };

        let finished = self
            .modules
            .iter()
            .fold(begun, |prior, module| module.schedule(&prior, filter, &scope));

        Ok(finished.then(move |_| async move {
            scope.logger.end(&scope.name);
            scope.state.end();
            debug!("plan {} end", scope.name);
            Outcome::Resolved
        }))
    }
}

impl fmt::Debug for Plan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plan")
            .field("name", &self.name)
            .field("modules", &self.modules)
            .field("current", &self.current)
            .field("throws_on_failure", &self.throws_on_failure)
            .field("default_timeout", &self.default_timeout)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}
