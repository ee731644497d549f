//! Daily scheduling
//!
//! `model` holds the schedule entries and the pure next-run math; `daemon`
//! is the polling loop that fires retry-wrapped update cycles.

pub mod daemon;
pub mod model;

pub use daemon::SchedulerDaemon;
pub use model::{next_run_after, ScheduleEntry};
