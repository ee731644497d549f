pub mod auth;
pub mod config;
pub mod error;
pub mod fallback;
pub mod history;
pub mod ops;
pub mod orchestrator;
pub mod retry;
pub mod scheduler;
pub mod session;

#[cfg(test)]
pub(crate) mod testutil;

// Re-exports for convenience
pub use config::Config;
pub use error::{PulseError, Result};
pub use orchestrator::{Orchestrator, UpdateReport, UpdateRunner};
pub use retry::{run_with_retry, RetryOutcome, RetryPolicy};
pub use scheduler::SchedulerDaemon;
