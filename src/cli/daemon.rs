use anyhow::{Context, Result};
use chrono::Local;
use jobpulse_core::config::Config;
use jobpulse_core::history::HistoryStore;
use jobpulse_core::orchestrator::UpdateRunner;
use jobpulse_core::retry::RetryPolicy;
use jobpulse_core::scheduler::daemon::FiringState;
use jobpulse_core::scheduler::SchedulerDaemon;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn handle_daemon_run(config: Arc<Config>) -> Result<()> {
    let entries = config
        .schedule_entries()
        .context("Invalid schedule configuration")?;
    let state = FiringState::new(entries, Local::now().naive_local())
        .context("Failed to initialize schedule")?;

    let mut daemon = SchedulerDaemon::new(
        state,
        RetryPolicy::from_config(&config),
        UpdateRunner::new(config.clone()),
        HistoryStore::new(config.history_path()),
    );

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            println!("\nShutting down daemon...");
            signal_cancel.cancel();
        }
    });

    daemon.run(cancel).await
}
