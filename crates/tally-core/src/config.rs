//! Run configuration with environment overrides.

use std::{str::FromStr, time::Duration};

use serde::{Deserialize, Serialize};

use crate::{
    error::{ConfigResultExt, Result, TallyError},
    models::Filter,
};

/// Environment variable holding the default phase timeout in milliseconds.
pub const ENV_TIMEOUT_MS: &str = "TALLY_TIMEOUT_MS";
/// Environment variable enabling throw-on-failure mode.
pub const ENV_THROWS: &str = "TALLY_THROWS";
/// Environment variable selecting the verbosity.
pub const ENV_VERBOSE: &str = "TALLY_VERBOSE";
/// Environment variable holding a JSON filter.
pub const ENV_FILTER: &str = "TALLY_FILTER";

/// How much per-assertion detail loggers keep.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Verbosity {
    /// Counts only
    #[default]
    Summary,

    /// Counts plus failing, erroring and warning assertions
    Failures,

    /// Every assertion
    All,
}

impl FromStr for Verbosity {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "summary" | "false" | "0" | "" => Ok(Verbosity::Summary),
            "failures" => Ok(Verbosity::Failures),
            "all" | "true" | "1" => Ok(Verbosity::All),
            _ => Err(format!("Invalid verbosity: {s}")),
        }
    }
}

impl Verbosity {
    /// Whether an assertion with the given failure-ness should be kept.
    pub fn keeps(&self, is_problem: bool) -> bool {
        match self {
            Verbosity::Summary => false,
            Verbosity::Failures => is_problem,
            Verbosity::All => true,
        }
    }
}

/// Settings applied by a [`Runner`](crate::Runner) to the plans it runs.
#[derive(Debug, Clone, PartialEq)]
pub struct RunConfig {
    /// Timeout armed at the entry of every phase that has no timeout of its own
    pub default_timeout: Option<Duration>,

    /// Turn failed assertions into errors returned from `assert`
    pub throws_on_failure: bool,

    /// Detail kept by the default loggers
    pub verbosity: Verbosity,

    /// Resolve the head signal immediately instead of waiting for `start`
    pub autostart: bool,

    /// Filter applied when `run` is given none
    pub filter: Option<Filter>,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            default_timeout: None,
            throws_on_failure: false,
            verbosity: Verbosity::default(),
            autostart: true,
            filter: None,
        }
    }
}

impl RunConfig {
    /// Defaults overlaid with values from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::InvalidInput` for unparsable values and
    /// `TallyError::InvalidFilter` for a malformed filter.
    pub fn from_env() -> Result<Self> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Overlays values produced by `lookup` onto this configuration.
    pub fn overlay<L>(mut self, lookup: L) -> Result<Self>
    where
        L: Fn(&str) -> Option<String>,
    {
        if let Some(raw) = lookup(ENV_TIMEOUT_MS) {
            let millis: u64 = raw.trim().parse().config_context(ENV_TIMEOUT_MS)?;
            self.default_timeout = (millis > 0).then(|| Duration::from_millis(millis));
        }
        if let Some(raw) = lookup(ENV_THROWS) {
            self.throws_on_failure = parse_flag(ENV_THROWS, &raw)?;
        }
        if let Some(raw) = lookup(ENV_VERBOSE) {
            self.verbosity = raw.trim().parse().config_context(ENV_VERBOSE)?;
        }
        if let Some(raw) = lookup(ENV_FILTER) {
            self.filter = Some(Filter::from_json(&raw)?);
        }
        Ok(self)
    }
}

fn parse_flag(field: &str, raw: &str) -> Result<bool> {
    match raw.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" | "" => Ok(false),
        other => Err(TallyError::invalid_input(field)
            .with_reason(format!("not a boolean: {other}"))),
    }
}
