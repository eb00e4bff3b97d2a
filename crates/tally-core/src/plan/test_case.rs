//! A single named test and its three-phase schedule.

use std::{fmt, future::Future, sync::Arc, time::Duration};

use log::debug;

use super::{module::ModuleScope, phase::run_phase};
use crate::{
    context::{Done, TestContext},
    handler::{Handler, HandlerResult},
    models::{Filter, Mode, TestInfo},
    signal::{Outcome, Signal},
};

/// A named unit of work run between its module's setup and teardown.
#[derive(Debug, Clone)]
pub struct Test {
    name: String,
    handler: Option<Handler>,
    module_names: Vec<String>,
    timeout: Option<Duration>,
    expected: Option<usize>,
}

impl Test {
    /// Creates a test with a handler.
    pub fn new(name: impl Into<String>, handler: Handler) -> Self {
        Self {
            name: name.into(),
            handler: Some(handler),
            module_names: Vec::new(),
            timeout: None,
            expected: None,
        }
    }

    /// Creates a test without a handler; its body phase passes trivially.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            handler: None,
            module_names: Vec::new(),
            timeout: None,
            expected: None,
        }
    }

    /// Creates a synchronous test.
    pub fn sync<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&TestContext) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(name, Handler::sync(f))
    }

    /// Creates a test that completes when its [`Done`] is invoked.
    pub fn with_done<F>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(TestContext, Done) -> HandlerResult + Send + Sync + 'static,
    {
        Self::new(name, Handler::with_done(f))
    }

    /// Creates a test whose body is a future.
    pub fn future<F, Fut>(name: impl Into<String>, f: F) -> Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::new(name, Handler::future(f))
    }

    /// Arms a timer of `duration` at the entry of each phase of this test.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = Some(duration);
        self
    }

    /// Presets the number of assertions expected from the test body.
    pub fn expect(mut self, count: usize) -> Self {
        self.expected = Some(count);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn handler(&self) -> Option<&Handler> {
        self.handler.as_ref()
    }

    /// Whether the body completes asynchronously.
    pub fn is_async(&self) -> bool {
        self.handler.as_ref().is_some_and(Handler::is_async)
    }

    /// Names of the owning module, outermost first. Empty until the test is
    /// added to a module.
    pub fn module_names(&self) -> &[String] {
        &self.module_names
    }

    pub(crate) fn set_module(&mut self, module_names: &[String]) {
        self.module_names = module_names.to_vec();
    }

    /// Whether `filter` selects this test.
    pub fn is_selected(&self, filter: Option<&Filter>) -> bool {
        filter.map_or(true, |f| f.selects(&self.name))
    }

    /// Chains this test onto `signal`.
    ///
    /// The returned signal resolves after setup, body and teardown have all
    /// completed, whatever their outcome. A test excluded by `filter` returns
    /// `signal` itself.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a Tokio runtime.
    pub(crate) fn schedule(
        &self,
        signal: &Signal,
        filter: Option<&Filter>,
        scope: &Arc<ModuleScope>,
    ) -> Signal {
        if !self.is_selected(filter) {
            return signal.clone();
        }

        let test = self.clone();
        let scope = Arc::clone(scope);
        signal.then(move |_| async move {
            test.run(&scope).await;
            Outcome::Resolved
        })
    }

    /// Runs setup, body and teardown in order. Teardown always runs; the body
    /// is skipped when setup fails.
    async fn run(&self, scope: &ModuleScope) -> bool {
        let info = TestInfo::new(scope.module_names.clone(), self.name.clone());
        scope.plan.logger.test_begin(&info);
        let ctx = TestContext::new(
            info,
            Arc::clone(&scope.plan.logger),
            scope.plan.throws_on_failure,
            scope.plan.state.clone(),
        );
        let timeout = self.timeout.or(scope.plan.default_timeout);

        let setup_passed =
            run_phase(&ctx, Mode::Setup, scope.setup.as_ref(), None, timeout).await;
        let body_passed = if setup_passed {
            run_phase(&ctx, Mode::Test, self.handler.as_ref(), self.expected, timeout).await
        } else {
            debug!("{self}: setup failed, skipping body");
            false
        };
        let teardown_passed =
            run_phase(&ctx, Mode::Teardown, scope.teardown.as_ref(), None, timeout).await;

        let passed = setup_passed && body_passed && teardown_passed;
        debug!("{self} finished (passed: {passed})");
        passed
    }
}

impl fmt::Display for Test {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let info = TestInfo::new(self.module_names.clone(), self.name.clone());
        write!(f, "{info}")
    }
}
