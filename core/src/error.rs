//! Structured error types for jobpulse
//!
//! The taxonomy mirrors the failure-handling policy: configuration errors
//! are fatal pre-flight, invalid credentials are terminal for a whole run,
//! transport failures are always retryable.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Primary error type for jobpulse operations
#[derive(Error, Debug)]
pub enum PulseError {
    // =========================================================================
    // Configuration Errors (fatal, pre-flight, never retried)
    // =========================================================================
    /// Invalid configuration
    #[error("invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// Missing required config
    #[error("missing required configuration: {key}")]
    MissingConfig { key: String },

    // =========================================================================
    // Authentication Errors
    // =========================================================================
    /// The portal rejected the credentials outright. Retrying with the same
    /// secret cannot succeed and risks an account lockout.
    #[error("invalid credentials: {reason}")]
    InvalidCredentials { reason: String },

    // =========================================================================
    // Network / Transport Errors
    // =========================================================================
    /// Network/connection error
    #[error("connection failed: {message}")]
    ConnectionFailed { message: String },

    /// Timeout
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: Duration },

    /// Unexpected HTTP status from the portal
    #[error("unexpected status {status} from {url}")]
    UnexpectedStatus { status: u16, url: String },

    // =========================================================================
    // Persistence Errors
    // =========================================================================
    /// Cookie file line could not be parsed
    #[error("malformed cookie file {path} at line {line}")]
    CookieFileCorrupted { path: PathBuf, line: usize },

    // =========================================================================
    // External Error Wrappers
    // =========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(String),

    #[error("HTTP error: {0}")]
    Http(String),
}

impl PulseError {
    /// Check if error is retryable (transient)
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::ConnectionFailed { .. } => true,
            Self::Timeout { .. } => true,
            Self::Http(_) => true,

            // Server-side trouble is worth another attempt; client errors
            // are not going to fix themselves.
            Self::UnexpectedStatus { status, .. } => {
                matches!(status, 429 | 500 | 502 | 503 | 504)
            }

            Self::Io(io_err) => matches!(
                io_err.kind(),
                std::io::ErrorKind::Interrupted
                    | std::io::ErrorKind::WouldBlock
                    | std::io::ErrorKind::TimedOut
            ),

            Self::InvalidConfig { .. }
            | Self::MissingConfig { .. }
            | Self::InvalidCredentials { .. }
            | Self::CookieFileCorrupted { .. }
            | Self::Json(_) => false,
        }
    }

    /// Terminal errors abort the whole retry budget: nothing observable can
    /// change between attempts.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::InvalidConfig { .. }
                | Self::MissingConfig { .. }
                | Self::InvalidCredentials { .. }
        )
    }
}

impl From<serde_json::Error> for PulseError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

impl From<reqwest::Error> for PulseError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout {
                duration: Duration::from_secs(0),
            }
        } else if err.is_connect() {
            Self::ConnectionFailed {
                message: err.to_string(),
            }
        } else {
            Self::Http(err.to_string())
        }
    }
}

/// Result type alias using PulseError
pub type Result<T> = std::result::Result<T, PulseError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_retryable_errors() {
        assert!(PulseError::Timeout {
            duration: Duration::from_secs(30)
        }
        .is_retryable());

        assert!(PulseError::ConnectionFailed {
            message: "refused".to_string()
        }
        .is_retryable());

        assert!(PulseError::UnexpectedStatus {
            status: 503,
            url: "https://example.com".to_string()
        }
        .is_retryable());

        assert!(!PulseError::UnexpectedStatus {
            status: 404,
            url: "https://example.com".to_string()
        }
        .is_retryable());

        assert!(!PulseError::InvalidCredentials {
            reason: "rejected".to_string()
        }
        .is_retryable());
    }

    #[test]
    fn test_terminal_errors() {
        assert!(PulseError::InvalidCredentials {
            reason: "rejected".to_string()
        }
        .is_terminal());

        assert!(PulseError::MissingConfig {
            key: "email".to_string()
        }
        .is_terminal());

        assert!(!PulseError::Timeout {
            duration: Duration::from_secs(5)
        }
        .is_terminal());
    }
}
