//! Data models shared between the scheduler and result loggers.
//!
//! These types form the stable contract between the engine and any logger:
//! the status vocabulary (`passed`, `failed`, `errors`, `warnings`), the phase
//! modes (`planning`, `setup`, `test`, `teardown`), the [`TestInfo`] that
//! identifies where an event came from, and the aggregated [`Counts`] and
//! reports produced by the summary logger.

pub mod filter;
pub mod info;
pub mod status;
pub mod summary;


pub use filter::{Filter, Selection};
pub use info::TestInfo;
pub use status::{Mode, Status};
pub use summary::{Counts, ModuleReport, PlanReport, ReportEntry, TestReport};
