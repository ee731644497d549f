//! Continuous scheduler loop
//!
//! Polls once a minute, fires the retry controller synchronously for every
//! schedule entry that has come due and not yet fired today, and resets the
//! fired marks at local midnight. Shutdown is an explicit cancellation
//! token checked once per tick; an in-flight update cycle is never aborted
//! mid-flight.

use crate::error::Result;
use crate::history::{HistoryEntry, HistoryStore};
use crate::retry::{run_with_retry, Cycle, RetryPolicy};
use crate::scheduler::model::{next_run_after, ScheduleEntry};
use chrono::{Local, NaiveDate, NaiveDateTime, Timelike};
use std::time::Duration;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

const POLL_INTERVAL: Duration = Duration::from_secs(60);

/// Tracks which entries have fired today. Entries already in the past at
/// construction count as missed, not due.
#[derive(Debug)]
pub struct FiringState {
    entries: Vec<ScheduleEntry>,
    fired: Vec<bool>,
    day: NaiveDate,
}

impl FiringState {
    pub fn new(entries: Vec<ScheduleEntry>, now: NaiveDateTime) -> Result<Self> {
        let entries = ScheduleEntry::normalize(entries);
        // Validates non-emptiness up front.
        next_run_after(now, &entries)?;

        let now_minute = now.hour() * 60 + now.minute();
        let fired = entries
            .iter()
            .map(|e| e.minute_of_day() <= now_minute)
            .collect();

        Ok(Self {
            entries,
            fired,
            day: now.date(),
        })
    }

    pub fn entries(&self) -> &[ScheduleEntry] {
        &self.entries
    }

    /// Entries newly due at `now`; marks them fired. Day rollover resets all
    /// marks first.
    pub fn due_entries(&mut self, now: NaiveDateTime) -> Vec<ScheduleEntry> {
        if now.date() != self.day {
            self.day = now.date();
            self.fired.fill(false);
        }

        let now_minute = now.hour() * 60 + now.minute();
        let mut due = Vec::new();
        for (entry, fired) in self.entries.iter().zip(self.fired.iter_mut()) {
            if !*fired && entry.minute_of_day() <= now_minute {
                *fired = true;
                due.push(*entry);
            }
        }
        due
    }
}

/// The daemon: firing state plus the cycle runner and history sink
pub struct SchedulerDaemon<C: Cycle> {
    state: FiringState,
    policy: RetryPolicy,
    cycle: C,
    history: HistoryStore,
}

impl<C: Cycle> SchedulerDaemon<C> {
    pub fn new(state: FiringState, policy: RetryPolicy, cycle: C, history: HistoryStore) -> Self {
        Self {
            state,
            policy,
            cycle,
            history,
        }
    }

    /// Main loop. Blocks for the duration of each update; overlapping fires
    /// are not a concern at this cadence.
    pub async fn run(&mut self, cancel: CancellationToken) -> anyhow::Result<()> {
        info!(
            entries = %self
                .state
                .entries()
                .iter()
                .map(|e| e.to_string())
                .collect::<Vec<_>>()
                .join(", "),
            "scheduler started"
        );

        loop {
            if cancel.is_cancelled() {
                break;
            }

            let now = Local::now().naive_local();
            for entry in self.state.due_entries(now) {
                info!(%entry, "scheduled update triggered");
                let outcome = run_with_retry(&self.policy, &mut self.cycle).await;
                if outcome.succeeded {
                    info!(%entry, attempts = outcome.attempts, "scheduled update completed");
                } else {
                    error!(%entry, attempts = outcome.attempts, "scheduled update failed");
                }
                if let Err(e) = self.history.append(&HistoryEntry::from_outcome(&outcome)) {
                    error!("failed to record history: {e}");
                }
            }

            // Hourly heartbeat so long quiet stretches are visibly alive.
            if now.minute() == 0 {
                if let Ok(next) = next_run_after(now, self.state.entries()) {
                    debug!(%next, "scheduler heartbeat");
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = sleep(POLL_INTERVAL) => {}
            }
        }

        info!("scheduler stopped gracefully");
        Ok(())
    }
}
