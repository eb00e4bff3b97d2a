//! Assertion helpers built on the primitive [`TestContext::assert_values`].
//!
//! Each helper performs a comparison and delegates to the primitive, so all
//! of them share its mode check, logging and throw-on-failure behavior.

use std::{
    fmt,
    panic::{self, AssertUnwindSafe},
};

use serde::Serialize;

use crate::{context::TestContext, error::Result};

/// What [`Assertions::raises`] expects the callback to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Raises<'a> {
    /// The callback must not fail
    Nothing,

    /// The callback must fail somehow
    Anything,

    /// The callback must fail with exactly this message
    Message(&'a str),
}

/// Higher-level assertions available on every [`TestContext`].
pub trait Assertions {
    /// Asserts that `pass` is true.
    fn ok(&self, pass: bool, message: &str) -> Result<()>;

    /// Asserts `actual == expected`.
    fn equal<A, E>(&self, actual: &A, expected: &E, message: &str) -> Result<()>
    where
        A: PartialEq<E> + fmt::Debug + ?Sized,
        E: fmt::Debug + ?Sized;

    /// Asserts `actual != expected`.
    fn not_equal<A, E>(&self, actual: &A, expected: &E, message: &str) -> Result<()>
    where
        A: PartialEq<E> + fmt::Debug + ?Sized,
        E: fmt::Debug + ?Sized;

    /// Asserts structural equality of the serialized forms of two values.
    fn deep_equal<A, E>(&self, actual: &A, expected: &E, message: &str) -> Result<()>
    where
        A: Serialize + fmt::Debug + ?Sized,
        E: Serialize + fmt::Debug + ?Sized;

    /// Asserts structural inequality of the serialized forms of two values.
    fn deep_not_equal<A, E>(&self, actual: &A, expected: &E, message: &str) -> Result<()>
    where
        A: Serialize + fmt::Debug + ?Sized,
        E: Serialize + fmt::Debug + ?Sized;

    /// Runs `callback` and asserts how it fails.
    ///
    /// A returned `Err` or a panic both count as failing; the message is the
    /// error's display or the panic payload.
    fn raises<F, T, X>(&self, callback: F, expected: Raises<'_>, message: &str) -> Result<()>
    where
        F: FnOnce() -> std::result::Result<T, X>,
        X: fmt::Display;
}

fn structural<T: Serialize + ?Sized>(value: &T) -> Option<serde_json::Value> {
    serde_json::to_value(value).ok()
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "handler panicked".to_string()
    }
}

impl Assertions for TestContext {
    fn ok(&self, pass: bool, message: &str) -> Result<()> {
        self.assert(pass, message)
    }

    fn equal<A, E>(&self, actual: &A, expected: &E, message: &str) -> Result<()>
    where
        A: PartialEq<E> + fmt::Debug + ?Sized,
        E: fmt::Debug + ?Sized,
    {
        let message = format!("{message} should be equal");
        self.assert_values(actual == expected, message, actual, expected)
    }

    fn not_equal<A, E>(&self, actual: &A, expected: &E, message: &str) -> Result<()>
    where
        A: PartialEq<E> + fmt::Debug + ?Sized,
        E: fmt::Debug + ?Sized,
    {
        let message = format!("{message} should not be equal");
        self.assert_values(actual != expected, message, actual, expected)
    }

    fn deep_equal<A, E>(&self, actual: &A, expected: &E, message: &str) -> Result<()>
    where
        A: Serialize + fmt::Debug + ?Sized,
        E: Serialize + fmt::Debug + ?Sized,
    {
        let (a, e) = (structural(actual), structural(expected));
        let pass = a.is_some() && a == e;
        let message = format!("{message} should be deep equal");
        self.assert_values(pass, message, actual, expected)
    }

    fn deep_not_equal<A, E>(&self, actual: &A, expected: &E, message: &str) -> Result<()>
    where
        A: Serialize + fmt::Debug + ?Sized,
        E: Serialize + fmt::Debug + ?Sized,
    {
        let (a, e) = (structural(actual), structural(expected));
        let pass = a.is_some() && a != e;
        let message = format!("{message} should not be deep equal");
        self.assert_values(pass, message, actual, expected)
    }

    fn raises<F, T, X>(&self, callback: F, expected: Raises<'_>, message: &str) -> Result<()>
    where
        F: FnOnce() -> std::result::Result<T, X>,
        X: fmt::Display,
    {
        let raised = match panic::catch_unwind(AssertUnwindSafe(callback)) {
            Ok(Ok(_)) => None,
            Ok(Err(e)) => Some(e.to_string()),
            Err(payload) => Some(panic_message(payload.as_ref())),
        };

        match expected {
            Raises::Nothing => self.assert(
                raised.is_none(),
                format!(
                    "{message} expected no exception, actual {}",
                    raised.as_deref().unwrap_or("none")
                ),
            ),
            Raises::Anything => self.assert(
                raised.is_some(),
                format!(
                    "{message} expected exception, actual {}",
                    raised.as_deref().unwrap_or("none")
                ),
            ),
            Raises::Message(text) => {
                let actual = raised.unwrap_or_default();
                self.equal(actual.as_str(), text, message)
            }
        }
    }
}
