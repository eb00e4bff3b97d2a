//! Aggregated result counts and reports.

use jiff::Timestamp;
use serde::{Deserialize, Serialize};

use super::{Mode, Status};

/// Per-status assertion counts.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Counts {
    pub passed: u32,
    pub failed: u32,
    pub errors: u32,
    pub warnings: u32,
}

impl Counts {
    /// Increment the counter for `status`.
    pub fn record(&mut self, status: Status) {
        match status {
            Status::Passed => self.passed += 1,
            Status::Failed => self.failed += 1,
            Status::Errors => self.errors += 1,
            Status::Warnings => self.warnings += 1,
        }
    }

    /// Count for a single status.
    pub fn get(&self, status: Status) -> u32 {
        match status {
            Status::Passed => self.passed,
            Status::Failed => self.failed,
            Status::Errors => self.errors,
            Status::Warnings => self.warnings,
        }
    }

    /// Total number of recorded events.
    pub fn total(&self) -> u32 {
        self.passed + self.failed + self.errors + self.warnings
    }

    /// True when nothing failed or errored.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errors == 0
    }

    /// Adds `other` into these counts.
    pub fn merge(&mut self, other: &Counts) {
        self.passed += other.passed;
        self.failed += other.failed;
        self.errors += other.errors;
        self.warnings += other.warnings;
    }
}

/// A single assertion kept in a report.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReportEntry {
    pub status: Status,
    pub mode: Mode,
    pub message: String,
}

/// Results for one test.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TestReport {
    pub name: String,
    pub counts: Counts,
    /// Assertions retained according to the logger's verbosity
    #[serde(default)]
    pub entries: Vec<ReportEntry>,
}

/// Results for one module.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModuleReport {
    pub module_names: Vec<String>,
    pub counts: Counts,
    pub tests: Vec<TestReport>,
}

impl ModuleReport {
    /// Hierarchical module name, segments joined by `.`.
    pub fn name(&self) -> String {
        self.module_names.join(".")
    }
}

/// Results for a whole plan run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlanReport {
    pub name: String,
    pub counts: Counts,
    pub modules: Vec<ModuleReport>,
    pub started_at: Timestamp,
    pub finished_at: Option<Timestamp>,
}

impl PlanReport {
    /// Finds a module report by its hierarchical name.
    pub fn module(&self, name: &str) -> Option<&ModuleReport> {
        self.modules.iter().find(|m| m.name() == name)
    }

    /// Whether the plan finished without failures or errors.
    pub fn is_success(&self) -> bool {
        self.counts.is_success()
    }
}
