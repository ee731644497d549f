//! `jobpulse` - keeps a job-portal profile looking recently active
//!
//! This binary wires the update orchestration in `jobpulse-core` to a CLI:
//! one-shot runs, a schedule daemon, config validation and status reporting.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use console::Style;
use std::sync::Arc;

use crate::cli::{Cli, Commands};
use jobpulse_core::config::{find_config_file, Config};
use jobpulse_core::history::HistoryStore;
use jobpulse_core::orchestrator::UpdateRunner;
use jobpulse_core::retry::{run_with_retry, RetryPolicy};
use jobpulse_core::scheduler::next_run_after;

mod cli;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("jobpulse=info,jobpulse_core=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = Arc::new(load_config(&cli)?);

    match &cli.command {
        Commands::Run => {
            ensure_valid(&config)?;
            handle_run(config).await
        }

        Commands::Daemon => {
            ensure_valid(&config)?;
            cli::daemon::handle_daemon_run(config).await
        }

        Commands::Info => {
            ensure_valid(&config)?;
            handle_info(config).await
        }

        Commands::Status => handle_status(&config),

        Commands::Validate => handle_validate(&config),
    }
}

fn load_config(cli: &Cli) -> Result<Config> {
    if let Some(path) = &cli.config {
        return Config::load(path)
            .with_context(|| format!("Failed to load config from {}", path.display()));
    }

    match find_config_file() {
        Some(path) => {
            Config::load(&path).with_context(|| format!("Failed to load {}", path.display()))
        }
        None => {
            let dim = Style::new().dim();
            println!(
                "{}",
                dim.apply_to(format!(
                    "No config file found (looked for jobpulse.toml in the current directory and {}), using defaults.",
                    Config::default_path()
                        .map(|p| p.display().to_string())
                        .unwrap_or_else(|| "the user config directory".to_string())
                ))
            );
            Ok(Config::default())
        }
    }
}

/// Pre-flight check for commands that will touch the network. Errors are
/// printed and abort before any request is made.
fn ensure_valid(config: &Config) -> Result<()> {
    let report = config.validate();

    let yellow = Style::new().yellow();
    for warning in &report.warnings {
        println!("{} {}", yellow.apply_to("warning:"), warning);
    }

    if !report.is_valid() {
        let red = Style::new().red().bold();
        for error in &report.errors {
            eprintln!("{} {}", red.apply_to("error:"), error);
        }
        std::process::exit(2);
    }
    Ok(())
}

async fn handle_run(config: Arc<Config>) -> Result<()> {
    let policy = RetryPolicy::from_config(&config);
    let history = HistoryStore::new(config.history_path());
    let mut runner = UpdateRunner::new(config);

    let outcome = run_with_retry(&policy, &mut runner).await;
    if let Err(e) = history.append(&jobpulse_core::history::HistoryEntry::from_outcome(&outcome)) {
        eprintln!("Failed to record history: {e}");
    }

    if let Some(report) = &outcome.report {
        for (name, detail) in report.operation_details() {
            println!("  {name}: {detail}");
        }
    }

    if outcome.succeeded {
        let green = Style::new().green().bold();
        println!(
            "{} Profile updated (attempt {} of {}).",
            green.apply_to("✓"),
            outcome.attempts,
            policy.max_attempts
        );
        Ok(())
    } else {
        let red = Style::new().red().bold();
        eprintln!(
            "{} Update failed after {} attempt(s).",
            red.apply_to("✗"),
            outcome.attempts
        );
        std::process::exit(1);
    }
}

fn handle_status(config: &Config) -> Result<()> {
    let blue = Style::new().blue().bold();
    let dim = Style::new().dim();

    let now = Local::now();
    println!("{} {}", blue.apply_to("Time:"), now.format("%Y-%m-%d %H:%M:%S"));

    match config.schedule_entries() {
        Ok(entries) => {
            let rendered: Vec<String> = entries.iter().map(|e| e.to_string()).collect();
            println!("{} {}", blue.apply_to("Schedule:"), rendered.join(", "));
            let next = next_run_after(now.naive_local(), &entries)?;
            println!("{} {}", blue.apply_to("Next run:"), next.format("%Y-%m-%d %H:%M"));
        }
        Err(e) => println!("{} invalid ({e})", blue.apply_to("Schedule:")),
    }

    println!(
        "{} resume={} headline={} salary={}",
        blue.apply_to("Updates:"),
        config.update_resume,
        config.update_headline,
        config
            .expected_salary
            .map(|s| s.to_string())
            .unwrap_or_else(|| "off".to_string())
    );

    match HistoryStore::new(config.history_path()).stats() {
        Some(stats) => {
            println!(
                "{} {} runs, {} ok, {} failed ({:.0}% success)",
                blue.apply_to("History:"),
                stats.total,
                stats.successful,
                stats.failed,
                stats.success_rate
            );
            if let Some(last) = stats.last {
                println!(
                    "{} {} ({})",
                    blue.apply_to("Last run:"),
                    last.timestamp.with_timezone(&Local).format("%Y-%m-%d %H:%M"),
                    if last.success { "ok" } else { "failed" }
                );
            }
        }
        None => println!("{}", dim.apply_to("No update history yet.")),
    }

    Ok(())
}

/// Authenticate and report who the session belongs to. Read-only.
async fn handle_info(config: Arc<Config>) -> Result<()> {
    use jobpulse_core::auth::{authenticate, default_strategies};
    use jobpulse_core::ops;
    use jobpulse_core::session::{HttpTransport, Session};

    let transport = Arc::new(HttpTransport::new(config.request_timeout_secs)?);
    let mut session = Session::new(transport, config.cookie_path());

    let strategies = default_strategies();
    let authenticated = authenticate(&mut session, &config.credentials(), &strategies).await?;
    if !authenticated {
        session.close();
        let red = Style::new().red().bold();
        eprintln!("{} Could not authenticate.", red.apply_to("✗"));
        std::process::exit(1);
    }

    let identity = ops::fetch_identity(&mut session).await;
    session.close();

    let green = Style::new().green().bold();
    println!("{} Logged in: {}", green.apply_to("✓"), identity.detail);
    Ok(())
}

fn handle_validate(config: &Config) -> Result<()> {
    let report = config.validate();

    let yellow = Style::new().yellow();
    for warning in &report.warnings {
        println!("{} {}", yellow.apply_to("warning:"), warning);
    }

    if report.is_valid() {
        let green = Style::new().green().bold();
        println!("{} Configuration is valid.", green.apply_to("✓"));
        Ok(())
    } else {
        let red = Style::new().red().bold();
        for error in &report.errors {
            eprintln!("{} {}", red.apply_to("error:"), error);
        }
        std::process::exit(2);
    }
}
