//! Sub-update operations
//!
//! Each operation is best-effort: it tries its own ordered list of endpoint
//! candidates and folds whatever happens into an [`OperationReport`]. No
//! error ever crosses an operation boundary; a failed resume upload must not
//! stop the headline rotation that follows it.

use crate::fallback::{first_success, Candidate, ChainResult};
use crate::session::{RequestSpec, Session};
use std::path::Path;
use tracing::{info, warn};

pub const PROFILE_URL: &str = "https://www.naukri.com/mnjuser/profile";
const HOMEPAGE_URL: &str = "https://www.naukri.com/mnjuser/homepage";
const DASHBOARD_API_URL: &str =
    "https://www.naukri.com/cloudgateway-mynaukri/resman-aggregator-services/v0/users/self";
const RESUME_UPLOAD_URL: &str =
    "https://www.naukri.com/cloudgateway-mynaukri/files-upload-services/v0/users/self/resume";
const RESUME_UPLOAD_ALT_URL: &str = "https://www.naukri.com/mnjuser/uploadResume";
const PROFILE_EDIT_API_URL: &str =
    "https://www.naukri.com/cloudgateway-mynaukri/resman-aggregator-services/v0/users/self/fullprofiles";

/// Typed outcome of one operation; consumed into the cycle report
#[derive(Debug, Clone)]
pub struct OperationReport {
    pub attempted: bool,
    pub succeeded: bool,
    pub detail: String,
}

impl OperationReport {
    /// Operation did not run; not a failure
    pub fn skipped(detail: impl Into<String>) -> Self {
        Self {
            attempted: false,
            succeeded: false,
            detail: detail.into(),
        }
    }

    /// Some endpoint accepted the update
    pub fn confirmed(detail: impl Into<String>) -> Self {
        Self {
            attempted: true,
            succeeded: true,
            detail: detail.into(),
        }
    }

    /// All candidates were exhausted; logged, non-fatal
    pub fn unconfirmed(detail: impl Into<String>) -> Self {
        Self {
            attempted: true,
            succeeded: false,
            detail: detail.into(),
        }
    }
}

/// Round-robin over the configured headlines. The index only ever grows;
/// `next` reduces it modulo the candidate count, so any call count is safe.
#[derive(Debug, Clone)]
pub struct HeadlineRotation {
    headlines: Vec<String>,
    index: usize,
}

impl HeadlineRotation {
    pub fn new(headlines: Vec<String>) -> Self {
        Self {
            headlines,
            index: 0,
        }
    }

    pub fn next(&mut self) -> Option<String> {
        if self.headlines.is_empty() {
            return None;
        }
        let headline = self.headlines[self.index % self.headlines.len()].clone();
        self.index += 1;
        Some(headline)
    }
}

fn report_from_chain(name: &str, result: ChainResult) -> OperationReport {
    match result {
        ChainResult::Hit { label, status, .. } => {
            info!(operation = name, candidate = %label, status, "operation confirmed");
            OperationReport::confirmed(format!("via {label} (status {status})"))
        }
        ChainResult::Exhausted { failures } => {
            warn!(operation = name, "all endpoint candidates exhausted");
            OperationReport::unconfirmed(format!(
                "all endpoints failed: {}",
                failures.join("; ")
            ))
        }
    }
}

async fn run_chain(session: &mut Session, name: &str, candidates: Vec<Candidate>) -> OperationReport {
    match first_success(session, name, &candidates).await {
        Ok(result) => report_from_chain(name, result),
        Err(e) => {
            warn!(operation = name, "operation aborted: {e}");
            OperationReport::unconfirmed(e.to_string())
        }
    }
}

/// Read-only profile access that refreshes the "last seen" timestamp. The
/// cheapest proof of a still-valid session, so its result feeds overall
/// cycle success.
pub async fn touch_profile(session: &mut Session) -> OperationReport {
    let candidates = vec![
        Candidate::new("profile page", RequestSpec::get(PROFILE_URL)),
        Candidate::new("homepage", RequestSpec::get(HOMEPAGE_URL)),
        Candidate::new("dashboard api", RequestSpec::get(DASHBOARD_API_URL)),
    ];
    run_chain(session, "touch_profile", candidates).await
}

/// Re-upload the resume. A missing or empty file is a skip, not an error:
/// resume refresh is optional functionality gated by configuration.
pub async fn update_resume(session: &mut Session, path: &Path) -> OperationReport {
    match std::fs::metadata(path) {
        Err(_) => {
            info!(path = %path.display(), "resume file not found, skipping upload");
            return OperationReport::skipped(format!("resume file not found: {}", path.display()));
        }
        Ok(meta) if meta.len() == 0 => {
            info!(path = %path.display(), "resume file is empty, skipping upload");
            return OperationReport::skipped(format!("resume file is empty: {}", path.display()));
        }
        Ok(_) => {}
    }

    let candidates = vec![
        Candidate::new(
            "files upload service",
            RequestSpec::upload(RESUME_UPLOAD_URL, "file", path.to_path_buf()),
        ),
        // Field name matches the legacy upload form's file input.
        Candidate::new(
            "legacy upload form",
            RequestSpec::upload(RESUME_UPLOAD_ALT_URL, "attachCV", path.to_path_buf()),
        ),
    ];
    run_chain(session, "update_resume", candidates).await
}

/// Rotate the profile headline to the next configured candidate
pub async fn update_headline(
    session: &mut Session,
    rotation: &mut HeadlineRotation,
) -> OperationReport {
    let Some(headline) = rotation.next() else {
        return OperationReport::skipped("no headlines configured");
    };

    let candidates = vec![
        Candidate::new(
            "profile edit api",
            RequestSpec::post_json(
                PROFILE_EDIT_API_URL,
                serde_json::json!({ "resumeHeadline": headline }),
            ),
        ),
        Candidate::new(
            "profile form",
            RequestSpec::post_form(
                PROFILE_URL,
                vec![("resumeHeadlineTxt".to_string(), headline.clone())],
            ),
        ),
    ];
    let mut report = run_chain(session, "update_headline", candidates).await;
    if report.succeeded {
        report.detail = format!("set to \"{headline}\" {}", report.detail);
    }
    report
}

/// Update the expected annual salary
pub async fn update_salary(session: &mut Session, salary: u64) -> OperationReport {
    let candidates = vec![
        Candidate::new(
            "profile edit api",
            RequestSpec::put_json(
                PROFILE_EDIT_API_URL,
                serde_json::json!({ "expectedCtc": { "absoluteCtc": salary } }),
            ),
        ),
        // Field names as seen on the salary edit form.
        Candidate::new(
            "salary form",
            RequestSpec::post_form(
                PROFILE_URL,
                vec![("annualSalary".to_string(), salary.to_string())],
            ),
        ),
    ];
    run_chain(session, "update_salary", candidates).await
}

/// Report who the session is logged in as, without mutating anything.
/// Backs the `info` CLI command.
pub async fn fetch_identity(session: &mut Session) -> OperationReport {
    let candidates = vec![
        Candidate::new("dashboard api", RequestSpec::get(DASHBOARD_API_URL)),
        Candidate::new("profile page", RequestSpec::get(PROFILE_URL)),
    ];
    match first_success(session, "fetch_identity", &candidates).await {
        Ok(ChainResult::Hit { body, label, .. }) => {
            let identity = identity_from_body(&body)
                .unwrap_or_else(|| "authenticated (identity not exposed)".to_string());
            OperationReport::confirmed(format!("{identity} (via {label})"))
        }
        Ok(ChainResult::Exhausted { failures }) => {
            OperationReport::unconfirmed(format!("all endpoints failed: {}", failures.join("; ")))
        }
        Err(e) => OperationReport::unconfirmed(e.to_string()),
    }
}

fn identity_from_body(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    for pointer in ["/name", "/fullName", "/user/fullName", "/profile/name"] {
        if let Some(name) = value.pointer(pointer).and_then(|v| v.as_str()) {
            return Some(name.to_string());
        }
    }
    None
}
