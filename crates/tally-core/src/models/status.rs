//! Status and mode enumerations shared by the engine and loggers.

use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Outcome of a single recorded assertion.
///
/// The serialized names form the stable vocabulary consumed by loggers.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Assertion passed
    Passed,

    /// Assertion failed
    Failed,

    /// Handler raised an error
    Errors,

    /// Non-fatal warning
    Warnings,
}

impl FromStr for Status {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "passed" | "pass" | "ok" => Ok(Status::Passed),
            "failed" | "fail" => Ok(Status::Failed),
            "errors" | "error" => Ok(Status::Errors),
            "warnings" | "warn" => Ok(Status::Warnings),
            _ => Err(format!("Invalid status: {s}")),
        }
    }
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Status {
    /// Wire representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            Status::Passed => "passed",
            Status::Failed => "failed",
            Status::Errors => "errors",
            Status::Warnings => "warnings",
        }
    }

    /// True for statuses that mark the enclosing phase as failed.
    pub fn is_failure(&self) -> bool {
        matches!(self, Status::Failed | Status::Errors)
    }
}

/// Execution mode of a test.
///
/// A test sits in [`Mode::Planning`] except while one of its phases is
/// actively executing.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// Not running
    #[default]
    Planning,

    /// Running the module setup handler
    Setup,

    /// Running the test body
    Test,

    /// Running the module teardown handler
    Teardown,
}

impl FromStr for Mode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "planning" => Ok(Mode::Planning),
            "setup" => Ok(Mode::Setup),
            "test" => Ok(Mode::Test),
            "teardown" => Ok(Mode::Teardown),
            _ => Err(format!("Invalid mode: {s}")),
        }
    }
}

impl fmt::Display for Mode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Mode {
    /// Wire representation of the mode.
    pub fn as_str(&self) -> &'static str {
        match self {
            Mode::Planning => "planning",
            Mode::Setup => "setup",
            Mode::Test => "test",
            Mode::Teardown => "teardown",
        }
    }

    /// Whether a phase is executing in this mode.
    pub fn is_running(&self) -> bool {
        !matches!(self, Mode::Planning)
    }
}
