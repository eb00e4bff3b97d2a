//! Result loggers.
//!
//! A [`Logger`] is the sink for everything a plan produces: plan begin/end,
//! module and test boundaries, and one [`Logger::add`] call per recorded assertion,
//! error or warning. Loggers must tolerate being called from whichever
//! runtime thread is driving the schedule, hence `Send + Sync` and `&self`
//! methods.
//!
//! Three implementations ship with the crate:
//!
//! - [`MemoryLogger`]: keeps a full event history, for inspecting runs
//! - [`ForwardLogger`]: forwards events to the [`log`] facade (plan default)
//! - [`SummaryLogger`]: aggregates counts into [`PlanReport`]s
//!
//! [`PlanReport`]: crate::models::PlanReport

use crate::models::{Status, TestInfo};

pub mod forward;
pub mod memory;
pub mod summary;

pub use forward::ForwardLogger;
pub use memory::{EntryKind, LogEntry, MemoryLogger};
pub use summary::SummaryLogger;

/// Sink for plan, module and assertion events.
pub trait Logger: Send + Sync {
    /// Called before the first module of `plan` runs.
    fn begin(&self, plan: &str);

    /// Called after the last module of `plan` has finished.
    fn end(&self, plan: &str);

    /// Records one assertion outcome.
    fn add(&self, status: Status, info: &TestInfo, message: &str);

    /// Called before the first selected test of a module runs.
    fn module_begin(&self, _module_names: &[String]) {}

    /// Called after the last selected test of a module has finished.
    fn module_end(&self, _module_names: &[String]) {}

    /// Called before a test's setup phase runs.
    fn test_begin(&self, _info: &TestInfo) {}

    /// Informational output that is not an assertion.
    fn info(&self, _info: &TestInfo, _message: &str) {}

    fn pass(&self, info: &TestInfo, message: &str) {
        self.add(Status::Passed, info, message);
    }

    fn fail(&self, info: &TestInfo, message: &str) {
        self.add(Status::Failed, info, message);
    }

    fn error(&self, info: &TestInfo, message: &str) {
        self.add(Status::Errors, info, message);
    }

    fn warn(&self, info: &TestInfo, message: &str) {
        self.add(Status::Warnings, info, message);
    }
}
