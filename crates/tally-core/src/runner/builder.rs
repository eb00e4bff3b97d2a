//! Builder for creating and configuring Runner instances.

use std::{sync::Arc, time::Duration};

use super::Runner;
use crate::{
    config::{RunConfig, Verbosity},
    error::Result,
    loggers::Logger,
    models::Filter,
};

/// Builder for creating and configuring Runner instances.
#[derive(Clone, Default)]
pub struct RunnerBuilder {
    config: RunConfig,
    logger: Option<Arc<dyn Logger>>,
}

impl RunnerBuilder {
    /// Creates a new builder with default settings.
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a builder starting from the process environment.
    ///
    /// # Errors
    ///
    /// Returns `TallyError::InvalidInput` or `TallyError::InvalidFilter` for
    /// malformed environment values.
    pub fn from_env() -> Result<Self> {
        Ok(Self::new().with_config(RunConfig::from_env()?))
    }

    /// Replaces the whole configuration.
    pub fn with_config(mut self, config: RunConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the logger given to the default plan.
    ///
    /// Plans passed to [`Runner::run`] keep their own logger.
    pub fn with_logger(mut self, logger: Arc<dyn Logger>) -> Self {
        self.logger = Some(logger);
        self
    }

    /// Sets the timeout armed at every phase without one of its own.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = Some(timeout);
        self
    }

    pub fn throws_on_failure(mut self, throws: bool) -> Self {
        self.config.throws_on_failure = throws;
        self
    }

    pub fn with_verbosity(mut self, verbosity: Verbosity) -> Self {
        self.config.verbosity = verbosity;
        self
    }

    /// Sets the filter used when [`Runner::run`] is given none.
    pub fn with_filter(mut self, filter: Filter) -> Self {
        self.config.filter = Some(filter);
        self
    }

    /// Whether queued work starts immediately or waits for
    /// [`Runner::start`].
    pub fn autostart(mut self, autostart: bool) -> Self {
        self.config.autostart = autostart;
        self
    }

    /// Builds the configured runner.
    pub fn build(self) -> Runner {
        Runner::new(self.config, self.logger)
    }
}

impl std::fmt::Debug for RunnerBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunnerBuilder")
            .field("config", &self.config)
            .field("logger", &self.logger.is_some())
            .finish()
    }
}
