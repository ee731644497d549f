//! Update cycle orchestration
//!
//! One cycle walks `Idle → Authenticating → Active → Cleanup → Done`.
//! Authentication failure skips straight to cleanup; the cleanup step runs
//! on every exit path, including errors, so the transport session is never
//! leaked. Overall cycle success is authentication plus the profile touch;
//! the other operations degrade the report but never flip it.

use crate::auth::{authenticate, default_strategies, AuthStrategy};
use crate::config::Config;
use crate::error::Result;
use crate::ops::{self, HeadlineRotation, OperationReport};
use crate::retry::Cycle;
use crate::session::{HttpTransport, Session};
use async_trait::async_trait;
use rand::Rng;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Cycle state, tracked for the logs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CyclePhase {
    Idle,
    Authenticating,
    Active,
    Cleanup,
    Done,
}

/// Per-cycle result consumed by the retry controller and the history store
#[derive(Debug, Clone, Default)]
pub struct UpdateReport {
    pub succeeded: bool,
    pub operations: BTreeMap<String, OperationReport>,
}

impl UpdateReport {
    fn record(&mut self, name: &str, report: OperationReport) {
        self.operations.insert(name.to_string(), report);
    }

    /// Flattened per-operation details for history persistence
    pub fn operation_details(&self) -> BTreeMap<String, String> {
        self.operations
            .iter()
            .map(|(name, op)| {
                let status = if op.succeeded {
                    "ok"
                } else if op.attempted {
                    "unconfirmed"
                } else {
                    "skipped"
                };
                (name.clone(), format!("{status}: {}", op.detail))
            })
            .collect()
    }
}

/// Drives one update cycle over an exclusively-owned session
pub struct Orchestrator {
    session: Session,
    config: Arc<Config>,
    strategies: Vec<Box<dyn AuthStrategy>>,
    phase: CyclePhase,
}

impl Orchestrator {
    pub fn new(session: Session, config: Arc<Config>) -> Self {
        Self {
            session,
            config,
            strategies: default_strategies(),
            phase: CyclePhase::Idle,
        }
    }

    #[cfg(test)]
    pub fn with_strategies(mut self, strategies: Vec<Box<dyn AuthStrategy>>) -> Self {
        self.strategies = strategies;
        self
    }

    /// Run the cycle to completion. The session is closed on every exit
    /// path, success, failure or error.
    pub async fn run_cycle(mut self, rotation: &mut HeadlineRotation) -> Result<UpdateReport> {
        let result = Self::drive(
            &mut self.session,
            &self.config,
            &self.strategies,
            rotation,
            &mut self.phase,
        )
        .await;

        self.phase = CyclePhase::Cleanup;
        debug!("cycle cleanup");
        self.session.close();
        self.phase = CyclePhase::Done;

        result
    }

    async fn drive(
        session: &mut Session,
        config: &Config,
        strategies: &[Box<dyn AuthStrategy>],
        rotation: &mut HeadlineRotation,
        phase: &mut CyclePhase,
    ) -> Result<UpdateReport> {
        *phase = CyclePhase::Authenticating;
        let mut report = UpdateReport::default();

        let authenticated =
            authenticate(session, &config.credentials(), strategies).await?;
        if !authenticated {
            warn!("unable to authenticate, aborting cycle");
            return Ok(report);
        }

        *phase = CyclePhase::Active;

        // Fixed operation order: touch first because it is the cheapest
        // proof the session is valid, and the one that counts.
        let touch = ops::touch_profile(session).await;
        let touch_ok = touch.succeeded;
        report.record("touch", touch);
        pace(config).await;

        let resume = if !config.update_resume {
            OperationReport::skipped("resume update disabled")
        } else {
            match &config.resume_path {
                Some(path) => ops::update_resume(session, path).await,
                None => OperationReport::skipped("resume_path not configured"),
            }
        };
        report.record("resume", resume);
        pace(config).await;

        let headline = if config.update_headline {
            ops::update_headline(session, rotation).await
        } else {
            OperationReport::skipped("headline update disabled")
        };
        report.record("headline", headline);

        if let Some(salary) = config.expected_salary {
            pace(config).await;
            report.record("salary", ops::update_salary(session, salary).await);
        }

        report.succeeded = touch_ok;
        info!(succeeded = report.succeeded, "cycle completed");
        Ok(report)
    }
}

/// Short randomized pause between operations to keep the request pattern
/// human-paced. Disabled when pacing_max_ms is zero.
async fn pace(config: &Config) {
    if config.pacing_max_ms == 0 {
        return;
    }
    let min = (config.pacing_max_ms / 3).max(1);
    let ms = rand::thread_rng().gen_range(min..=config.pacing_max_ms);
    tokio::time::sleep(std::time::Duration::from_millis(ms)).await;
}

/// Process-lifetime owner of the headline rotation; builds a fresh transport
/// session and orchestrator for every attempt.
pub struct UpdateRunner {
    config: Arc<Config>,
    rotation: HeadlineRotation,
}

impl UpdateRunner {
    pub fn new(config: Arc<Config>) -> Self {
        let rotation = HeadlineRotation::new(config.headlines.clone());
        Self { config, rotation }
    }
}

#[async_trait]
impl Cycle for UpdateRunner {
    async fn run(&mut self, attempt: u32) -> Result<UpdateReport> {
        debug!(attempt, "constructing fresh session for cycle");
        let transport = Arc::new(HttpTransport::new(self.config.request_timeout_secs)?);
        let session = Session::new(transport, self.config.cookie_path());
        let orchestrator = Orchestrator::new(session, self.config.clone());
        orchestrator.run_cycle(&mut self.rotation).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::AuthOutcome;
    use crate::config::Credentials;
    use crate::error::PulseError;
    use crate::session::CookieRecord;
    use crate::testutil::{ok_response, scripted_session, status_response};
    use std::io::Write;

    struct StubAuth {
        kind: &'static str,
    }

    #[async_trait]
    impl AuthStrategy for StubAuth {
        fn name(&self) -> &str {
            "stub"
        }

        async fn attempt(&self, session: &mut Session, _creds: &Credentials) -> AuthOutcome {
            match self.kind {
                "success" => {
                    session.state.jar.merge(vec![CookieRecord {
                        domain: "www.naukri.com".to_string(),
                        path: "/".to_string(),
                        secure: true,
                        expires: None,
                        name: "nauk_at".to_string(),
                        value: "token".to_string(),
                    }]);
                    AuthOutcome::Success
                }
                "invalid" => AuthOutcome::InvalidCredentials("rejected".to_string()),
                _ => AuthOutcome::Inconclusive("nope".to_string()),
            }
        }
    }

    fn auth(kind: &'static str) -> Vec<Box<dyn AuthStrategy>> {
        vec![Box::new(StubAuth { kind })]
    }

    fn test_config() -> Config {
        let mut config = Config::default();
        config.email = "someone@example.org".to_string();
        config.password = "hunter2!".to_string();
        config.update_resume = false;
        config.update_headline = false;
        config.pacing_max_ms = 0;
        config
    }

    #[tokio::test]
    async fn cycle_succeeds_when_auth_and_touch_succeed() {
        let (session, _) = scripted_session(vec![Ok(ok_response("<html>"))]);
        let config = Arc::new(test_config());
        let orchestrator =
            Orchestrator::new(session, config).with_strategies(auth("success"));

        let mut rotation = HeadlineRotation::new(Vec::new());
        let report = orchestrator.run_cycle(&mut rotation).await.expect("cycle");

        assert!(report.succeeded);
        assert!(report.operations["touch"].succeeded);
        assert_eq!(report.operations["resume"].attempted, false);
    }

    #[tokio::test(start_paused = true)]
    async fn no_pause_trails_the_last_operation() {
        // pacing_max_ms = 1 pins the jitter range to exactly 1ms, so the
        // paused clock measures one tick per inter-operation pause.
        let mut config = test_config();
        config.pacing_max_ms = 1;

        let (session, _) = scripted_session(vec![Ok(ok_response("<html>"))]);
        let orchestrator =
            Orchestrator::new(session, Arc::new(config)).with_strategies(auth("success"));

        let start = tokio::time::Instant::now();
        let mut rotation = HeadlineRotation::new(Vec::new());
        orchestrator.run_cycle(&mut rotation).await.expect("cycle");

        // touch → pause → resume → pause → headline; no salary, no third pause.
        assert_eq!(start.elapsed(), std::time::Duration::from_millis(2));
    }

    #[tokio::test]
    async fn resume_exhaustion_does_not_fail_the_cycle() {
        let dir = tempfile::tempdir().expect("tempdir");
        let resume = dir.path().join("resume.pdf");
        let mut file = std::fs::File::create(&resume).expect("create");
        file.write_all(b"%PDF-1.4").expect("write");

        let mut config = test_config();
        config.update_resume = true;
        config.resume_path = Some(resume);

        // Touch succeeds, both resume upload candidates fail.
        let (session, _) = scripted_session(vec![
            Ok(ok_response("<html>")),
            Ok(status_response(500)),
            Ok(status_response(503)),
        ]);
        let orchestrator =
            Orchestrator::new(session, Arc::new(config)).with_strategies(auth("success"));

        let mut rotation = HeadlineRotation::new(Vec::new());
        let report = orchestrator.run_cycle(&mut rotation).await.expect("cycle");

        assert!(report.succeeded);
        let resume_op = &report.operations["resume"];
        assert!(resume_op.attempted);
        assert!(!resume_op.succeeded);
    }

    #[tokio::test]
    async fn touch_failure_fails_the_cycle() {
        let (session, _) = scripted_session(vec![
            Ok(status_response(500)),
            Ok(status_response(500)),
            Ok(status_response(500)),
        ]);
        let orchestrator =
            Orchestrator::new(session, Arc::new(test_config())).with_strategies(auth("success"));

        let mut rotation = HeadlineRotation::new(Vec::new());
        let report = orchestrator.run_cycle(&mut rotation).await.expect("cycle");

        assert!(!report.succeeded);
        assert!(report.operations["touch"].attempted);
    }

    #[tokio::test]
    async fn auth_failure_skips_all_operations() {
        let (session, calls) = scripted_session(vec![]);
        let orchestrator = Orchestrator::new(session, Arc::new(test_config()))
            .with_strategies(auth("inconclusive"));

        let mut rotation = HeadlineRotation::new(Vec::new());
        let report = orchestrator.run_cycle(&mut rotation).await.expect("cycle");

        assert!(!report.succeeded);
        assert!(report.operations.is_empty());
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn invalid_credentials_propagate_as_error() {
        let (session, _) = scripted_session(vec![]);
        let orchestrator =
            Orchestrator::new(session, Arc::new(test_config())).with_strategies(auth("invalid"));

        let mut rotation = HeadlineRotation::new(Vec::new());
        let result = orchestrator.run_cycle(&mut rotation).await;
        assert!(matches!(result, Err(PulseError::InvalidCredentials { .. })));
    }

    #[tokio::test]
    async fn headline_rotation_survives_across_cycles() {
        let mut config = test_config();
        config.update_headline = true;
        config.headlines = vec!["A".to_string(), "B".to_string()];
        let config = Arc::new(config);

        let mut rotation = HeadlineRotation::new(config.headlines.clone());

        for expected in ["A", "B", "A"] {
            // Touch hit + headline api hit per cycle.
            let (session, _) = scripted_session(vec![
                Ok(ok_response("<html>")),
                Ok(ok_response("{}")),
            ]);
            let orchestrator = Orchestrator::new(session, config.clone())
                .with_strategies(auth("success"));
            let report = orchestrator.run_cycle(&mut rotation).await.expect("cycle");
            assert!(report.operations["headline"]
                .detail
                .contains(expected));
        }
    }
}
