//! Logger that forwards results to the `log` facade.

use log::{debug, info, log, Level};

use super::Logger;
use crate::{
    config::Verbosity,
    models::{Mode, Status, TestInfo},
};

const TARGET: &str = "tally";

/// Forwards plan events to whatever `log` backend the host installed.
///
/// This is the logger a plan builds for itself when none was set.
#[derive(Debug, Clone)]
pub struct ForwardLogger {
    plan: String,
    verbosity: Verbosity,
}

impl ForwardLogger {
    /// Creates a forwarding logger keyed by the plan name.
    pub fn new(plan: impl Into<String>) -> Self {
        Self {
            plan: plan.into(),
            verbosity: Verbosity::default(),
        }
    }

    /// Sets the verbosity. Passing assertions are logged at `info` under
    /// [`Verbosity::All`] and at `debug` otherwise.
    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.verbosity = verbosity;
        self
    }

    /// Name of the plan this logger was created for.
    pub fn plan(&self) -> &str {
        &self.plan
    }

    fn level_for(&self, status: Status) -> Level {
        match status {
            Status::Passed if self.verbosity == Verbosity::All => Level::Info,
            Status::Passed => Level::Debug,
            Status::Warnings => Level::Warn,
            Status::Failed | Status::Errors => Level::Error,
        }
    }
}

impl Logger for ForwardLogger {
    fn begin(&self, plan: &str) {
        info!(target: TARGET, "plan '{plan}' started");
    }

    fn end(&self, plan: &str) {
        info!(target: TARGET, "plan '{plan}' complete");
    }

    fn add(&self, status: Status, info: &TestInfo, message: &str) {
        let label = status.as_str().to_uppercase();
        let level = self.level_for(status);
        if info.mode == Mode::Test {
            log!(target: TARGET, level, "{info} {label}: {message}");
        } else {
            log!(target: TARGET, level, "{info} {label}: {message} in {}", info.mode);
        }
    }

    fn module_begin(&self, module_names: &[String]) {
        debug!(target: TARGET, "module '{}' started", module_names.join("."));
    }

    fn module_end(&self, module_names: &[String]) {
        debug!(target: TARGET, "module '{}' complete", module_names.join("."));
    }

    fn test_begin(&self, info: &TestInfo) {
        debug!(target: TARGET, "{info} started");
    }

    fn info(&self, info: &TestInfo, message: &str) {
        if self.verbosity == Verbosity::Summary {
            debug!(target: TARGET, "{info} INFO: {message}");
        } else {
            info!(target: TARGET, "{info} INFO: {message}");
        }
    }
}
