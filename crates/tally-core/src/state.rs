//! Execution state shared between a plan and the work it schedules.
//!
//! This replaces process-wide "current test" and "running plan" pointers:
//! each plan owns a [`RunState`] and threads it explicitly through every test
//! it schedules. Outside of active execution it reports nothing.

use std::sync::Arc;

use log::error;
use parking_lot::Mutex;

use crate::{
    error::{Result, TallyError},
    models::TestInfo,
};

#[derive(Debug, Default)]
struct StateInner {
    scheduled: bool,
    running: bool,
    current_test: Option<TestInfo>,
}

/// Handle onto a plan's execution state. Cheap to clone.
#[derive(Debug, Clone, Default)]
pub struct RunState {
    inner: Arc<Mutex<StateInner>>,
}

impl RunState {
    /// Creates an idle state.
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether the plan has a schedule that has not finished yet.
    pub fn is_scheduled(&self) -> bool {
        self.inner.lock().scheduled
    }

    /// Whether the plan's begin notification has fired and its end has not.
    pub fn is_running(&self) -> bool {
        self.inner.lock().running
    }

    /// The test whose phase is currently executing, if any.
    pub fn current_test(&self) -> Option<TestInfo> {
        self.inner.lock().current_test.clone()
    }

    pub(crate) fn try_schedule(&self, plan: &str) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.scheduled {
            return Err(TallyError::PlanAlreadyScheduled {
                plan: plan.to_string(),
            });
        }
        inner.scheduled = true;
        Ok(())
    }

    pub(crate) fn begin(&self) {
        self.inner.lock().running = true;
    }

    pub(crate) fn end(&self) {
        let mut inner = self.inner.lock();
        inner.running = false;
        inner.scheduled = false;
        inner.current_test = None;
    }

    pub(crate) fn enter_test(&self, info: TestInfo) {
        let mut inner = self.inner.lock();
        if let Some(active) = &inner.current_test {
            error!("{info} entered {} while {active} is still executing", info.mode);
        }
        inner.current_test = Some(info);
    }

    pub(crate) fn exit_test(&self) {
        self.inner.lock().current_test = None;
    }
}
