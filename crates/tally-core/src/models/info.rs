//! Test identity passed to loggers.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::Mode;

/// Describes the test an event belongs to.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TestInfo {
    /// Enclosing module names, outermost first
    pub module_names: Vec<String>,

    /// Name of the test
    pub test_name: String,

    /// Phase that produced the event
    pub mode: Mode,
}

impl TestInfo {
    /// Creates test info for a test in the planning mode.
    pub fn new(module_names: Vec<String>, test_name: impl Into<String>) -> Self {
        Self {
            module_names,
            test_name: test_name.into(),
            mode: Mode::Planning,
        }
    }

    /// Returns a copy of this info tagged with `mode`.
    pub fn in_mode(&self, mode: Mode) -> Self {
        Self {
            mode,
            ..self.clone()
        }
    }

    /// Hierarchical module name, segments joined by `.`.
    pub fn module_name(&self) -> String {
        self.module_names.join(".")
    }
}

impl fmt::Display for TestInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let module = if self.module_names.is_empty() {
            "(unknown module)".to_string()
        } else {
            self.module_name()
        };
        write!(f, "Test<{}:{}>", module, self.test_name)
    }
}
