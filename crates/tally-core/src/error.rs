//! Error types for the test scheduling library.

use std::fmt;

use thiserror::Error;

/// Comprehensive error type for all scheduling and assertion operations.
#[derive(Error, Debug)]
pub enum TallyError {
    /// An assertion primitive was used outside of an active phase
    #[error("Cannot {operation} while test is not running ({test})")]
    NotRunning {
        test: String,
        operation: &'static str,
    },
    /// A failed assertion raised under throw-on-failure mode
    #[error(transparent)]
    Assertion(#[from] AssertionError),
    /// The plan still has an unfinished schedule
    #[error("Plan '{plan}' is already scheduled and has not finished running")]
    PlanAlreadyScheduled { plan: String },
    /// The runner's schedule tail was cancelled
    #[error("Schedule was cancelled; reset the runner before running again")]
    ScheduleHalted,
    /// Filter parsing errors
    #[error("Invalid filter: {source}")]
    InvalidFilter {
        #[from]
        source: serde_json::Error,
    },
    /// Invalid input validation errors
    #[error("Invalid input for field '{field}': {reason}")]
    InvalidInput { field: String, reason: String },
}

/// Error raised by a failed assertion when the plan throws on failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub struct AssertionError {
    /// Assertion description
    pub message: String,
    /// Rendered actual value, if one was supplied
    pub actual: Option<String>,
    /// Rendered expected value, if one was supplied
    pub expected: Option<String>,
}

impl AssertionError {
    /// Creates an assertion error with no attached values.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            actual: None,
            expected: None,
        }
    }

    /// Attaches rendered actual and expected values.
    pub fn with_values(mut self, actual: impl Into<String>, expected: impl Into<String>) -> Self {
        self.actual = Some(actual.into());
        self.expected = Some(expected.into());
        self
    }
}

impl fmt::Display for AssertionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AssertionError:")?;
        if !self.message.is_empty() {
            write!(f, " {}", self.message)?;
        }
        if self.actual.is_some() || self.expected.is_some() {
            write!(
                f,
                " (actual = \"{}\" - expected = \"{}\")",
                self.actual.as_deref().unwrap_or_default(),
                self.expected.as_deref().unwrap_or_default()
            )?;
        }
        Ok(())
    }
}

/// Builder for creating input validation errors.
pub struct InvalidInputBuilder {
    field: String,
}

impl InvalidInputBuilder {
    /// Create a new invalid input error builder for a field.
    pub fn new(field: impl Into<String>) -> Self {
        Self {
            field: field.into(),
        }
    }

    /// Build the error with the given reason.
    pub fn with_reason(self, reason: impl Into<String>) -> TallyError {
        TallyError::InvalidInput {
            field: self.field,
            reason: reason.into(),
        }
    }
}

impl TallyError {
    /// Creates a builder for input validation errors.
    pub fn invalid_input(field: impl Into<String>) -> InvalidInputBuilder {
        InvalidInputBuilder::new(field)
    }

    /// Creates a usage error for an operation attempted outside a phase.
    pub fn not_running(test: impl fmt::Display, operation: &'static str) -> Self {
        TallyError::NotRunning {
            test: test.to_string(),
            operation,
        }
    }

    /// Returns true for errors that indicate misuse of the scheduling API
    /// rather than a recorded test outcome.
    pub fn is_usage_error(&self) -> bool {
        matches!(
            self,
            TallyError::NotRunning { .. }
                | TallyError::PlanAlreadyScheduled { .. }
                | TallyError::ScheduleHalted
        )
    }
}

/// Extension trait for parsing configuration values with field context.
pub trait ConfigResultExt<T> {
    /// Map a parse error into an invalid input error for `field`.
    fn config_context(self, field: &str) -> Result<T>;
}

impl<T, E> ConfigResultExt<T> for std::result::Result<T, E>
where
    E: fmt::Display,
{
    fn config_context(self, field: &str) -> Result<T> {
        self.map_err(|e| TallyError::invalid_input(field).with_reason(e.to_string()))
    }
}

/// Result type alias for scheduling operations
pub type Result<T> = std::result::Result<T, TallyError>;
