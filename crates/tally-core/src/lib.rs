//! Core library for the Tally unit-testing engine.
//!
//! This crate provides the test-plan scheduler, the assertion context handed
//! to every handler, and pluggable result loggers.
//!
//! # Execution Model
//!
//! - **Plans, modules and tests** ([`plan`]): an ordered plan of modules,
//!   each an ordered list of tests sharing setup and teardown handlers
//! - **Completion signals** ([`signal`]): every scheduled unit waits on the
//!   signal of the unit before it and settles its own when its whole subtree
//!   has finished, so tests never overlap
//! - **Assertion context** ([`context`], [`assertions`]): tracks the current
//!   phase and forwards every assertion to the plan's logger
//! - **Loggers** ([`loggers`]): receive plan, module and assertion events
//!
//! Handler failures, panics and timeouts are recorded and never abort
//! sibling tests; only misuse of the scheduling API surfaces as an
//! [`Err`](TallyError) to the caller.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//!
//! use tally_core::{Assertions, RunnerBuilder, SummaryLogger, Verbosity};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let summary = Arc::new(SummaryLogger::new(Verbosity::Failures));
//! let mut runner = RunnerBuilder::from_env()?
//!     .with_logger(summary.clone())
//!     .build();
//!
//! runner.module("math").test("add", |t| {
//!     t.equal(&(1 + 1), &2, "sum")?;
//!     Ok(())
//! });
//!
//! runner.finish().await?;
//! if let Some(report) = summary.last_report() {
//!     println!("{report}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod assertions;
pub mod config;
pub mod context;
pub mod display;
pub mod error;
pub mod handler;
pub mod loggers;
pub mod models;
pub mod plan;
pub mod runner;
pub mod signal;
pub mod state;

// Re-export commonly used types
pub use assertions::{Assertions, Raises};
pub use config::{RunConfig, Verbosity};
pub use context::{Done, TestContext};
pub use error::{AssertionError, Result, TallyError};
pub use handler::{Handler, HandlerResult};
pub use loggers::{EntryKind, ForwardLogger, LogEntry, Logger, MemoryLogger, SummaryLogger};
pub use models::{
    Counts, Filter, Mode, ModuleReport, PlanReport, ReportEntry, Selection, Status, TestInfo,
    TestReport,
};
pub use plan::{Module, ModuleOptions, Plan, Test};
pub use runner::{Runner, RunnerBuilder};
pub use signal::{Outcome, Signal, SignalState, Trigger};
pub use state::RunState;
