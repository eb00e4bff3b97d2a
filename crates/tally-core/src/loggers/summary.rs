//! Logger that aggregates results into reports.

use jiff::Timestamp;
use log::warn;
use parking_lot::Mutex;

use super::Logger;
use crate::{
    config::Verbosity,
    models::{Counts, ModuleReport, PlanReport, ReportEntry, Status, TestInfo, TestReport},
};

#[derive(Debug, Default)]
struct SummaryState {
    active: Option<PlanReport>,
    finished: Vec<PlanReport>,
}

/// Aggregates passed/failed/errors/warnings counts per test, module and plan.
///
/// Individual assertions are retained according to the [`Verbosity`]: none
/// for `Summary`, only problems for `Failures`, everything for `All`.
#[derive(Debug, Default)]
pub struct SummaryLogger {
    verbosity: Verbosity,
    state: Mutex<SummaryState>,
}

impl SummaryLogger {
    pub fn new(verbosity: Verbosity) -> Self {
        Self {
            verbosity,
            state: Mutex::default(),
        }
    }

    /// Reports for every plan that has ended, oldest first.
    pub fn reports(&self) -> Vec<PlanReport> {
        self.state.lock().finished.clone()
    }

    /// Report for the most recently ended plan.
    pub fn last_report(&self) -> Option<PlanReport> {
        self.state.lock().finished.last().cloned()
    }

    /// Snapshot of the plan currently running, if any.
    pub fn active_report(&self) -> Option<PlanReport> {
        self.state.lock().active.clone()
    }
}

fn module_for<'a>(report: &'a mut PlanReport, names: &[String]) -> &'a mut ModuleReport {
    let reuse = report
        .modules
        .last()
        .is_some_and(|m| m.module_names.as_slice() == names);
    if !reuse {
        report.modules.push(ModuleReport {
            module_names: names.to_vec(),
            counts: Counts::default(),
            tests: Vec::new(),
        });
    }
    let last = report.modules.len() - 1;
    &mut report.modules[last]
}

fn test_for<'a>(module: &'a mut ModuleReport, name: &str) -> &'a mut TestReport {
    let reuse = module.tests.last().is_some_and(|t| t.name == name);
    if !reuse {
        module.tests.push(TestReport {
            name: name.to_string(),
            counts: Counts::default(),
            entries: Vec::new(),
        });
    }
    let last = module.tests.len() - 1;
    &mut module.tests[last]
}

impl Logger for SummaryLogger {
    fn begin(&self, plan: &str) {
        let mut state = self.state.lock();
        if let Some(previous) = state.active.take() {
            warn!(
                "summary logger only supports one plan at a time; '{}' was still running",
                previous.name
            );
            state.finished.push(previous);
        }
        state.active = Some(PlanReport {
            name: plan.to_string(),
            counts: Counts::default(),
            modules: Vec::new(),
            started_at: Timestamp::now(),
            finished_at: None,
        });
    }

    fn end(&self, plan: &str) {
        let mut state = self.state.lock();
        match state.active.take() {
            Some(mut report) => {
                report.finished_at = Some(Timestamp::now());
                state.finished.push(report);
            }
            None => warn!("plan '{plan}' ended without having begun"),
        }
    }

    fn module_begin(&self, module_names: &[String]) {
        let mut state = self.state.lock();
        if let Some(report) = state.active.as_mut() {
            module_for(report, module_names);
        }
    }

    fn test_begin(&self, info: &TestInfo) {
        let mut state = self.state.lock();
        if let Some(report) = state.active.as_mut() {
            let module = module_for(report, &info.module_names);
            test_for(module, &info.test_name);
        }
    }

    fn add(&self, status: Status, info: &TestInfo, message: &str) {
        let mut state = self.state.lock();
        let Some(report) = state.active.as_mut() else {
            warn!("{info} logged '{message}' outside of a running plan");
            return;
        };

        report.counts.record(status);
        let module = module_for(report, &info.module_names);
        module.counts.record(status);
        let test = test_for(module, &info.test_name);
        test.counts.record(status);

        let is_problem = status != Status::Passed;
        if self.verbosity.keeps(is_problem) {
            test.entries.push(ReportEntry {
                status,
                mode: info.mode,
                message: message.to_string(),
            });
        }
    }
}
