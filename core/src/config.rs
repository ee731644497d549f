//! Configuration store
//!
//! Handles loading/saving the TOML config file and pre-flight validation.
//! The config is constructed once at process start and passed down by
//! reference; nothing in the core reads ambient global state.

use crate::error::{PulseError, Result};
use crate::scheduler::model::ScheduleEntry;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Sentinel values shipped in the config template. Authentication must never
/// be attempted while these are still in place.
pub const PLACEHOLDER_EMAIL: &str = "your_email@example.com";
pub const PLACEHOLDER_PASSWORD: &str = "your_password";

/// Portal login credentials. Immutable once loaded.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

impl Credentials {
    /// Reject empty or template credentials before any network call.
    pub fn validate(&self) -> Result<()> {
        if self.email.trim().is_empty() || self.email == PLACEHOLDER_EMAIL {
            return Err(PulseError::MissingConfig {
                key: "email".to_string(),
            });
        }
        if self.password.trim().is_empty() || self.password == PLACEHOLDER_PASSWORD {
            return Err(PulseError::MissingConfig {
                key: "password".to_string(),
            });
        }
        Ok(())
    }
}

/// jobpulse configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Portal login email
    #[serde(default = "default_email")]
    pub email: String,

    /// Portal login password
    #[serde(default = "default_password")]
    pub password: String,

    /// Daily update times, 24-hour "HH:MM"
    #[serde(default = "default_schedule")]
    pub schedule: Vec<String>,

    /// Re-upload the resume each cycle
    #[serde(default = "default_true")]
    pub update_resume: bool,

    /// Path to the resume file
    #[serde(default)]
    pub resume_path: Option<PathBuf>,

    /// Rotate the profile headline each cycle
    #[serde(default)]
    pub update_headline: bool,

    /// Headlines cycled through round-robin
    #[serde(default)]
    pub headlines: Vec<String>,

    /// Expected annual salary; salary update runs only when set
    #[serde(default)]
    pub expected_salary: Option<u64>,

    /// Attempts per scheduled update
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Seconds between retry attempts
    #[serde(default = "default_retry_delay")]
    pub retry_delay_secs: u64,

    /// HTTP request timeout in seconds
    #[serde(default = "default_timeout")]
    pub request_timeout_secs: u64,

    /// Upper bound of the randomized pause between operations, milliseconds.
    /// Zero disables pacing (used by tests).
    #[serde(default = "default_pacing")]
    pub pacing_max_ms: u64,
}

fn default_email() -> String {
    PLACEHOLDER_EMAIL.to_string()
}

fn default_password() -> String {
    PLACEHOLDER_PASSWORD.to_string()
}

fn default_schedule() -> Vec<String> {
    ["07:00", "08:00", "08:30", "08:45", "09:00"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_true() -> bool {
    true
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay() -> u64 {
    60
}

fn default_timeout() -> u64 {
    30
}

fn default_pacing() -> u64 {
    3000
}

impl Default for Config {
    fn default() -> Self {
        Self {
            email: default_email(),
            password: default_password(),
            schedule: default_schedule(),
            update_resume: true,
            resume_path: None,
            update_headline: false,
            headlines: Vec::new(),
            expected_salary: None,
            max_retries: default_max_retries(),
            retry_delay_secs: default_retry_delay(),
            request_timeout_secs: default_timeout(),
            pacing_max_ms: default_pacing(),
        }
    }
}

/// Outcome of pre-flight validation. Errors block startup; warnings don't.
#[derive(Debug, Default)]
pub struct ConfigReport {
    pub errors: Vec<String>,
    pub warnings: Vec<String>,
}

impl ConfigReport {
    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }
}

impl Config {
    /// Load configuration from file
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let content = toml::to_string_pretty(self)?;
        if let Some(parent) = path.as_ref().parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(path, content)?;
        Ok(())
    }

    /// Load from the default location, falling back to template defaults
    pub fn load_or_default() -> Self {
        if let Some(path) = find_config_file() {
            if let Ok(config) = Self::load(&path) {
                return config;
            }
        }
        Self::default()
    }

    /// Default config file path inside the user's config directory
    pub fn default_path() -> Option<PathBuf> {
        get_config_dir().map(|dir| dir.join("jobpulse.toml"))
    }

    pub fn credentials(&self) -> Credentials {
        Credentials {
            email: self.email.clone(),
            password: self.password.clone(),
        }
    }

    /// Parsed, deduplicated, ascending schedule entries
    pub fn schedule_entries(&self) -> Result<Vec<ScheduleEntry>> {
        let mut entries = Vec::with_capacity(self.schedule.len());
        for raw in &self.schedule {
            entries.push(ScheduleEntry::parse(raw)?);
        }
        Ok(ScheduleEntry::normalize(entries))
    }

    /// Cookie persistence file path
    pub fn cookie_path(&self) -> PathBuf {
        data_dir().join("cookies.txt")
    }

    /// Update history file path
    pub fn history_path(&self) -> PathBuf {
        data_dir().join("history.json")
    }

    /// Validate settings the way an operator would want them checked before
    /// the first scheduled run.
    pub fn validate(&self) -> ConfigReport {
        let mut report = ConfigReport::default();

        if let Err(e) = self.credentials().validate() {
            report.errors.push(e.to_string());
        }

        if self.schedule.is_empty() {
            report.errors.push("schedule is empty".to_string());
        } else if let Err(e) = self.schedule_entries() {
            report.errors.push(e.to_string());
        }

        if self.max_retries == 0 {
            report.errors.push("max_retries must be at least 1".to_string());
        }

        if self.update_resume {
            match &self.resume_path {
                None => report
                    .warnings
                    .push("update_resume is enabled but resume_path is not set".to_string()),
                Some(path) if !path.exists() => report
                    .warnings
                    .push(format!("resume file not found: {}", path.display())),
                _ => {}
            }
        }

        if self.update_headline && self.headlines.is_empty() {
            report
                .warnings
                .push("update_headline is enabled but no headlines are configured".to_string());
        }

        report
    }
}

/// Find the configuration file in standard locations
pub fn find_config_file() -> Option<PathBuf> {
    if let Ok(cwd) = std::env::current_dir() {
        let path = cwd.join("jobpulse.toml");
        if path.exists() {
            return Some(path);
        }
    }

    if let Some(path) = Config::default_path() {
        if path.exists() {
            return Some(path);
        }
    }

    None
}

/// Get the configuration directory path
pub fn get_config_dir() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join("jobpulse"))
}

fn data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("jobpulse")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn placeholder_credentials_are_rejected() {
        let config = Config::default();
        assert!(config.credentials().validate().is_err());

        let report = config.validate();
        assert!(!report.is_valid());
        assert!(report.errors.iter().any(|e| e.contains("email")));
    }

    #[test]
    fn real_credentials_pass() {
        let creds = Credentials {
            email: "someone@example.org".to_string(),
            password: "hunter2!".to_string(),
        };
        assert!(creds.validate().is_ok());
    }

    #[test]
    fn empty_schedule_is_an_error() {
        let mut config = Config::default();
        config.email = "someone@example.org".to_string();
        config.password = "hunter2!".to_string();
        config.schedule.clear();

        let report = config.validate();
        assert!(report.errors.iter().any(|e| e.contains("schedule")));
    }

    #[test]
    fn headline_without_candidates_warns() {
        let mut config = Config::default();
        config.email = "someone@example.org".to_string();
        config.password = "hunter2!".to_string();
        config.update_headline = true;

        let report = config.validate();
        assert!(report.is_valid());
        assert!(report.warnings.iter().any(|w| w.contains("headline")));
    }

    #[test]
    fn config_round_trip() {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("jobpulse.toml");

        let mut config = Config::default();
        config.email = "someone@example.org".to_string();
        config.expected_salary = Some(1_200_000);
        config.save(&path).expect("save");

        let loaded = Config::load(&path).expect("load");
        assert_eq!(loaded.email, "someone@example.org");
        assert_eq!(loaded.expected_salary, Some(1_200_000));
        assert_eq!(loaded.schedule.len(), 5);
    }
}
