//! Bounded retry around one update cycle
//!
//! Deliberately simple: a fixed delay and a fixed attempt budget, no jitter
//! and no backoff. These runs happen a handful of times a day; adaptive
//! pacing would be complexity without a payoff.

use crate::config::Config;
use crate::error::Result;
use crate::orchestrator::UpdateReport;
use async_trait::async_trait;
use std::time::Duration;
use tracing::{error, info, warn};

/// Attempt budget for one scheduled update
#[derive(Debug, Clone, Copy)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_attempts: config.max_retries.max(1),
            delay: Duration::from_secs(config.retry_delay_secs),
        }
    }
}

/// One retry-wrapped run, as recorded in history
#[derive(Debug, Clone)]
pub struct RetryOutcome {
    pub succeeded: bool,
    pub attempts: u32,
    pub report: Option<UpdateReport>,
}

/// A cycle factory the controller can invoke once per attempt
#[async_trait]
pub trait Cycle: Send {
    async fn run(&mut self, attempt: u32) -> Result<UpdateReport>;
}

/// Run cycles until one succeeds or the budget is spent. Every error coming
/// out of a cycle is absorbed here; nothing propagates to the scheduler.
/// Terminal errors (invalid credentials, broken config) abort the remaining
/// budget immediately since they cannot change between attempts.
pub async fn run_with_retry<C: Cycle>(policy: &RetryPolicy, cycle: &mut C) -> RetryOutcome {
    let max_attempts = policy.max_attempts.max(1);
    let mut last_report = None;

    for attempt in 1..=max_attempts {
        info!(attempt, max_attempts, "starting update attempt");

        match cycle.run(attempt).await {
            Ok(report) if report.succeeded => {
                info!(attempt, "update attempt succeeded");
                return RetryOutcome {
                    succeeded: true,
                    attempts: attempt,
                    report: Some(report),
                };
            }
            Ok(report) => {
                warn!(attempt, "update attempt failed");
                last_report = Some(report);
            }
            // No report here: details from an earlier attempt would
            // misdescribe the run that actually terminated it.
            Err(e) if e.is_terminal() => {
                error!(attempt, "update attempt failed terminally: {e}");
                return RetryOutcome {
                    succeeded: false,
                    attempts: attempt,
                    report: None,
                };
            }
            Err(e) => {
                error!(attempt, "update attempt crashed: {e}");
            }
        }

        if attempt < max_attempts {
            info!(delay_secs = policy.delay.as_secs(), "waiting before next attempt");
            tokio::time::sleep(policy.delay).await;
        }
    }

    error!("all update attempts failed");
    RetryOutcome {
        succeeded: false,
        attempts: max_attempts,
        report: last_report,
    }
}
