//! First-success-wins endpoint chains
//!
//! The portal's endpoints and page structure change without notice, so every
//! network action is an ordered list of candidate requests. The first one
//! that comes back with a success-class status wins; everything else is
//! absorbed and logged. The auth strategies and all sub-update operations
//! share this single primitive.

use crate::error::Result;
use crate::session::{RequestSpec, Session};
use tracing::{debug, warn};

/// One candidate request with a human-readable label for the logs
#[derive(Debug, Clone)]
pub struct Candidate {
    pub label: String,
    pub request: RequestSpec,
}

impl Candidate {
    pub fn new(label: impl Into<String>, request: RequestSpec) -> Self {
        Self {
            label: label.into(),
            request,
        }
    }
}

/// Outcome of walking a candidate chain
#[derive(Debug, Clone)]
pub enum ChainResult {
    /// Some candidate returned a success-class status
    Hit {
        label: String,
        status: u16,
        body: String,
    },
    /// Every candidate failed; the details are per-candidate
    Exhausted { failures: Vec<String> },
}

impl ChainResult {
    pub fn is_hit(&self) -> bool {
        matches!(self, ChainResult::Hit { .. })
    }
}

/// A final URL on the login page means the session was bounced, whatever the
/// status code said.
pub fn bounced_to_login(final_url: &str) -> bool {
    let lower = final_url.to_ascii_lowercase();
    lower.contains("/nlogin") || lower.contains("login")
}

/// Try candidates in order, stopping at the first success-class response
/// that was not redirected back to the login page. Transport errors on one
/// candidate never abort the chain.
pub async fn first_success(
    session: &mut Session,
    what: &str,
    candidates: &[Candidate],
) -> Result<ChainResult> {
    let mut failures = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        debug!(what, candidate = %candidate.label, url = %candidate.request.url, "trying candidate");
        match session.execute(&candidate.request).await {
            Ok(response) => {
                if response.is_success() && !bounced_to_login(&response.final_url) {
                    debug!(what, candidate = %candidate.label, status = response.status, "candidate succeeded");
                    return Ok(ChainResult::Hit {
                        label: candidate.label.clone(),
                        status: response.status,
                        body: response.body,
                    });
                }
                let reason = if bounced_to_login(&response.final_url) {
                    format!("{}: redirected to login ({})", candidate.label, response.final_url)
                } else {
                    format!("{}: status {}", candidate.label, response.status)
                };
                warn!(what, "{reason}");
                failures.push(reason);
            }
            Err(e) if e.is_retryable() => {
                let reason = format!("{}: {e}", candidate.label);
                warn!(what, "{reason}");
                failures.push(reason);
            }
            // Non-transient errors (corrupt state, local IO) are real.
            Err(e) => return Err(e),
        }
    }

    Ok(ChainResult::Exhausted { failures })
}
