//! Plain-text rendering of result counts and reports.
//!
//! Reports render as an indented outline, one line per plan, module and
//! test, followed by any assertions the summary logger retained:
//!
//! ```text
//! Plan arithmetic: 2 passed, 1 failed, 0 errors, 0 warnings in 12ms
//!   math: 2 passed, 1 failed, 0 errors, 0 warnings
//!     add: 1 passed, 0 failed, 0 errors, 0 warnings
//!     sub: 1 passed, 1 failed, 0 errors, 0 warnings
//!       [failed] test: difference should be equal (actual = 2, expected = 3)
//! ```

use std::fmt;

use crate::models::{Counts, ModuleReport, PlanReport, ReportEntry, TestReport};

impl fmt::Display for Counts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} passed, {} failed, {} errors, {} warnings",
            self.passed, self.failed, self.errors, self.warnings
        )
    }
}

impl fmt::Display for ReportEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}: {}", self.status, self.mode, self.message)
    }
}

impl fmt::Display for TestReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name, self.counts)?;
        for entry in &self.entries {
            write!(f, "\n  {entry}")?;
        }
        Ok(())
    }
}

impl fmt::Display for ModuleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.name(), self.counts)?;
        for test in &self.tests {
            for line in test.to_string().lines() {
                write!(f, "\n  {line}")?;
            }
        }
        Ok(())
    }
}

impl fmt::Display for PlanReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Plan {}: {}", self.name, self.counts)?;
        if let Some(finished_at) = self.finished_at {
            let elapsed = finished_at.duration_since(self.started_at);
            write!(f, " in {elapsed:#}")?;
        }
        for module in &self.modules {
            for line in module.to_string().lines() {
                write!(f, "\n  {line}")?;
            }
        }
        Ok(())
    }
}
