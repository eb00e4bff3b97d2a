//! Modules: ordered groups of tests sharing setup and teardown.

use std::{future::Future, sync::Arc};

use super::{PlanScope, Test};
use crate::{
    context::{Done, TestContext},
    handler::{Handler, HandlerResult},
    models::Filter,
    signal::{Outcome, Signal},
};

/// Everything a scheduled test needs from its module.
pub(crate) struct ModuleScope {
    pub(crate) module_names: Vec<String>,
    pub(crate) setup: Option<Handler>,
    pub(crate) teardown: Option<Handler>,
    pub(crate) plan: Arc<PlanScope>,
}

/// A named, ordered group of tests.
///
/// Nesting is expressed through the name path only: a child module created
/// with [`Module::child`] carries its parent's names followed by its own, and
/// is added to the plan as an independent module.
#[derive(Debug, Clone)]
pub struct Module {
    module_names: Vec<String>,
    tests: Vec<Test>,
    setup: Option<Handler>,
    teardown: Option<Handler>,
}

impl Module {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            module_names: vec![name.into()],
            tests: Vec::new(),
            setup: None,
            teardown: None,
        }
    }

    /// Creates an empty module nested under this one by name.
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut module_names = self.module_names.clone();
        module_names.push(name.into());
        Self {
            module_names,
            tests: Vec::new(),
            setup: None,
            teardown: None,
        }
    }

    /// Dotted module path, e.g. `outer.inner`. Filters match on this name.
    pub fn name(&self) -> String {
        self.module_names.join(".")
    }

    pub fn module_names(&self) -> &[String] {
        &self.module_names
    }

    pub fn tests(&self) -> &[Test] {
        &self.tests
    }

    pub fn is_empty(&self) -> bool {
        self.tests.is_empty()
    }

    // ..........................................................
    // Tests
    //

    /// Appends a test and takes ownership of it.
    pub fn add(&mut self, mut test: Test) -> &mut Self {
        test.set_module(&self.module_names);
        self.tests.push(test);
        self
    }

    /// Appends a synchronous test.
    pub fn test<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(&TestContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.add(Test::sync(name, f))
    }

    /// Appends a test that completes when its [`Done`] is invoked.
    pub fn test_async<F>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(TestContext, Done) -> HandlerResult + Send + Sync + 'static,
    {
        self.add(Test::with_done(name, f))
    }

    /// Appends a test whose body is a future.
    pub fn test_future<F, Fut>(&mut self, name: impl Into<String>, f: F) -> &mut Self
    where
        F: Fn(TestContext) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        self.add(Test::future(name, f))
    }

    // ..........................................................
    // Setup and teardown
    //

    /// Sets a synchronous setup run before every test.
    pub fn setup<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&TestContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.set_setup(Some(Handler::sync(f)))
    }

    /// Sets an asynchronous setup run before every test.
    pub fn setup_async<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(TestContext, Done) -> HandlerResult + Send + Sync + 'static,
    {
        self.set_setup(Some(Handler::with_done(f)))
    }

    /// Sets a synchronous teardown run after every test.
    pub fn teardown<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(&TestContext) -> HandlerResult + Send + Sync + 'static,
    {
        self.set_teardown(Some(Handler::sync(f)))
    }

    /// Sets an asynchronous teardown run after every test.
    pub fn teardown_async<F>(&mut self, f: F) -> &mut Self
    where
        F: Fn(TestContext, Done) -> HandlerResult + Send + Sync + 'static,
    {
        self.set_teardown(Some(Handler::with_done(f)))
    }

    pub fn set_setup(&mut self, handler: Option<Handler>) -> &mut Self {
        self.setup = handler;
        self
    }

    pub fn set_teardown(&mut self, handler: Option<Handler>) -> &mut Self {
        self.teardown = handler;
        self
    }

    pub fn setup_handler(&self) -> Option<&Handler> {
        self.setup.as_ref()
    }

    pub fn teardown_handler(&self) -> Option<&Handler> {
        self.teardown.as_ref()
    }

    // ..........................................................
    // Scheduling
    //

    /// Whether `filter` selects this module at all.
    pub fn is_selected(&self, filter: Option<&Filter>) -> bool {
        filter.map_or(true, |f| f.selects(&self.name()))
    }

    /// Chains every selected test onto `signal`, in insertion order, between
    /// module begin and end notifications.
    ///
    /// Returns `signal` itself when the module is filtered out or none of its
    /// tests are selected; such a module produces no logger events.
    pub(crate) fn schedule(
        &self,
        signal: &Signal,
        filter: Option<&Filter>,
        plan: &Arc<PlanScope>,
    ) -> Signal {
        if !self.is_selected(filter) {
            return signal.clone();
        }

        let name = self.name();
        let test_filter = filter.and_then(|f| f.descend(&name));
        let selected: Vec<&Test> = self
            .tests
            .iter()
            .filter(|test| test.is_selected(test_filter))
            .collect();
        if selected.is_empty() {
            return signal.clone();
        }

        let scope = Arc::new(ModuleScope {
            module_names: self.module_names.clone(),
            setup: self.setup.clone(),
            teardown: self.teardown.clone(),
            plan: Arc::clone(plan),
        });

        let begun = {
            let scope = Arc::clone(&scope);
            signal.then(move |_| async move {
                scope.plan.logger.module_begin(&scope.module_names);
                Outcome::Resolved
            })
        };

        let finished = selected
            .into_iter()
            .fold(begun, |prior, test| test.schedule(&prior, None, &scope));

        finished.then(move |_| async move {
            scope.plan.logger.module_end(&scope.module_names);
            Outcome::Resolved
        })
    }
}
