//! Authentication strategy chain
//!
//! Login against the portal is attempted through an ordered list of named
//! strategies: the structured login API, the HTML form endpoint, and finally
//! restoring a previously persisted cookie jar verified by a profile probe.
//! First success wins. An outright credential rejection stops the whole
//! chain: retrying with the same wrong secret risks an account lockout.

use crate::config::Credentials;
use crate::error::{PulseError, Result};
use crate::fallback::{first_success, Candidate};
use crate::ops::PROFILE_URL;
use crate::session::{RequestSpec, Session, TransportResponse};
use async_trait::async_trait;
use tracing::{info, warn};

/// Classified result of one strategy attempt
#[derive(Debug, Clone)]
pub enum AuthOutcome {
    /// Response confirms identity and the session carries cookies
    Success,
    /// Terminal: the portal rejected the credentials
    InvalidCredentials(String),
    /// Didn't work, didn't prove anything; try the next strategy
    Inconclusive(String),
    /// Network trouble; try the next strategy
    TransportFailure(String),
}

#[async_trait]
pub trait AuthStrategy: Send + Sync {
    fn name(&self) -> &str;
    async fn attempt(&self, session: &mut Session, creds: &Credentials) -> AuthOutcome;
}

fn classify_login_response(session: &Session, response: &TransportResponse) -> AuthOutcome {
    match response.status {
        401 | 403 => AuthOutcome::InvalidCredentials(format!(
            "login endpoint returned {}",
            response.status
        )),
        status if (200..300).contains(&status) => {
            let body = response.body.to_ascii_lowercase();
            if body.contains("invalid username") || body.contains("invalid password") {
                AuthOutcome::InvalidCredentials("login response names bad credentials".to_string())
            } else if !session.state.jar.is_empty() {
                AuthOutcome::Success
            } else {
                AuthOutcome::Inconclusive(format!(
                    "status {status} but no session cookies were issued"
                ))
            }
        }
        status => AuthOutcome::Inconclusive(format!("login endpoint returned {status}")),
    }
}

/// Walk login endpoint candidates with credential-aware classification. A
/// rejection stops the candidate list immediately, unlike the generic chain.
async fn try_login_candidates(
    session: &mut Session,
    candidates: Vec<Candidate>,
) -> AuthOutcome {
    let mut last_transport_failure = None;

    for candidate in candidates {
        match session.execute(&candidate.request).await {
            Ok(response) => match classify_login_response(session, &response) {
                AuthOutcome::Inconclusive(reason) => {
                    warn!(candidate = %candidate.label, "{reason}");
                }
                decisive => return decisive,
            },
            Err(e) if e.is_retryable() => {
                warn!(candidate = %candidate.label, "transport failure: {e}");
                last_transport_failure = Some(e.to_string());
            }
            Err(e) => return AuthOutcome::TransportFailure(e.to_string()),
        }
    }

    match last_transport_failure {
        Some(detail) => AuthOutcome::TransportFailure(detail),
        None => AuthOutcome::Inconclusive("all login endpoints exhausted".to_string()),
    }
}

/// JSON login against the portal's structured API
pub struct ApiLogin;

const LOGIN_API_URL: &str = "https://www.naukri.com/central-login-services/v1/login";
const LOGIN_API_ALT_URL: &str = "https://www.naukri.com/api/v1/login";

#[async_trait]
impl AuthStrategy for ApiLogin {
    fn name(&self) -> &str {
        "api-login"
    }

    async fn attempt(&self, session: &mut Session, creds: &Credentials) -> AuthOutcome {
        let payload = serde_json::json!({
            "username": creds.email,
            "password": creds.password,
        });
        let candidates = vec![
            Candidate::new(
                "central login service",
                RequestSpec::post_json(LOGIN_API_URL, payload.clone()),
            ),
            Candidate::new("login api v1", RequestSpec::post_json(LOGIN_API_ALT_URL, payload)),
        ];
        try_login_candidates(session, candidates).await
    }
}

/// Form-encoded login against the HTML login page endpoints
pub struct FormLogin;

const LOGIN_FORM_URL: &str = "https://www.naukri.com/nlogin/login";
const LOGIN_FORM_ALT_URL: &str = "https://login.naukri.com/nLogin/Login.php";

#[async_trait]
impl AuthStrategy for FormLogin {
    fn name(&self) -> &str {
        "form-login"
    }

    async fn attempt(&self, session: &mut Session, creds: &Credentials) -> AuthOutcome {
        // Field names match the login form's input ids.
        let fields = vec![
            ("usernameField".to_string(), creds.email.clone()),
            ("passwordField".to_string(), creds.password.clone()),
        ];
        let candidates = vec![
            Candidate::new(
                "nlogin form",
                RequestSpec::post_form(LOGIN_FORM_URL, fields.clone()),
            ),
            Candidate::new(
                "legacy login form",
                RequestSpec::post_form(LOGIN_FORM_ALT_URL, fields),
            ),
        ];
        try_login_candidates(session, candidates).await
    }
}

/// Restore the persisted cookie jar and verify it with a profile probe
pub struct CookieRestore;

#[async_trait]
impl AuthStrategy for CookieRestore {
    fn name(&self) -> &str {
        "cookie-restore"
    }

    async fn attempt(&self, session: &mut Session, _creds: &Credentials) -> AuthOutcome {
        match session.restore_cookies() {
            Ok(true) => {}
            Ok(false) => {
                return AuthOutcome::Inconclusive("no persisted cookies to restore".to_string())
            }
            Err(e) => return AuthOutcome::Inconclusive(format!("cookie restore failed: {e}")),
        }

        let probe = vec![Candidate::new(
            "profile probe",
            RequestSpec::get(PROFILE_URL),
        )];
        match first_success(session, "cookie-restore probe", &probe).await {
            Ok(result) if result.is_hit() => AuthOutcome::Success,
            Ok(_) => AuthOutcome::Inconclusive("persisted cookies no longer valid".to_string()),
            Err(e) => AuthOutcome::TransportFailure(e.to_string()),
        }
    }
}

/// The default strategy order
pub fn default_strategies() -> Vec<Box<dyn AuthStrategy>> {
    vec![Box::new(ApiLogin), Box::new(FormLogin), Box::new(CookieRestore)]
}

/// Run the strategy chain. `Ok(true)` on the first success, `Ok(false)` when
/// every strategy was exhausted, `Err(InvalidCredentials)` when a strategy
/// saw the credentials rejected. Placeholder credentials never reach the
/// network.
pub async fn authenticate(
    session: &mut Session,
    creds: &Credentials,
    strategies: &[Box<dyn AuthStrategy>],
) -> Result<bool> {
    creds.validate()?;

    for strategy in strategies {
        info!(strategy = strategy.name(), "attempting authentication");
        match strategy.attempt(session, creds).await {
            AuthOutcome::Success => {
                session.mark_authenticated();
                if let Err(e) = session.persist_cookies() {
                    warn!("could not persist cookies: {e}");
                }
                info!(strategy = strategy.name(), "authentication succeeded");
                return Ok(true);
            }
            AuthOutcome::InvalidCredentials(reason) => {
                return Err(PulseError::InvalidCredentials { reason });
            }
            AuthOutcome::Inconclusive(reason) => {
                info!(strategy = strategy.name(), "inconclusive: {reason}");
            }
            AuthOutcome::TransportFailure(detail) => {
                warn!(strategy = strategy.name(), "transport failure: {detail}");
            }
        }
    }

    warn!("all authentication strategies exhausted");
    Ok(false)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::session::CookieRecord;
    use crate::testutil::{ok_response, scripted_session, status_response};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct FixedStrategy {
        outcome_kind: &'static str,
        invocations: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl AuthStrategy for FixedStrategy {
        fn name(&self) -> &str {
            "fixed"
        }

        async fn attempt(&self, session: &mut Session, _creds: &Credentials) -> AuthOutcome {
            self.invocations.fetch_add(1, Ordering::SeqCst);
            match self.outcome_kind {
                "success" => {
                    session.state.jar.merge(vec![CookieRecord {
                        domain: "www.naukri.com".to_string(),
                        path: "/".to_string(),
                        secure: true,
                        expires: None,
                        name: "nauk_at".to_string(),
                        value: "fresh".to_string(),
                    }]);
                    AuthOutcome::Success
                }
                "invalid" => AuthOutcome::InvalidCredentials("rejected".to_string()),
                "transport" => AuthOutcome::TransportFailure("refused".to_string()),
                _ => AuthOutcome::Inconclusive("nope".to_string()),
            }
        }
    }

    fn strategy(kind: &'static str, counter: &Arc<AtomicUsize>) -> Box<dyn AuthStrategy> {
        Box::new(FixedStrategy {
            outcome_kind: kind,
            invocations: counter.clone(),
        })
    }

    fn creds() -> Credentials {
        Credentials {
            email: "someone@example.org".to_string(),
            password: "hunter2!".to_string(),
        }
    }

    #[tokio::test]
    async fn transport_failure_falls_through_to_next_strategy() {
        let (mut session, _) = scripted_session(vec![]);
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let strategies = vec![strategy("transport", &first), strategy("success", &second)];

        let authenticated = authenticate(&mut session, &creds(), &strategies)
            .await
            .expect("chain");

        assert!(authenticated);
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 1);
        assert!(session.is_authenticated());
        // Cookies from the winning strategy are present in session state.
        assert_eq!(session.state.jar.records()[0].value, "fresh");
    }

    #[tokio::test]
    async fn invalid_credentials_short_circuits_the_chain() {
        let (mut session, _) = scripted_session(vec![]);
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let strategies = vec![strategy("invalid", &first), strategy("success", &second)];

        let result = authenticate(&mut session, &creds(), &strategies).await;

        assert!(matches!(
            result,
            Err(PulseError::InvalidCredentials { .. })
        ));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
        assert!(!session.is_authenticated());
    }

    #[tokio::test]
    async fn exhausted_chain_returns_false() {
        let (mut session, _) = scripted_session(vec![]);
        let counter = Arc::new(AtomicUsize::new(0));
        let strategies = vec![
            strategy("inconclusive", &counter),
            strategy("transport", &counter),
        ];

        let authenticated = authenticate(&mut session, &creds(), &strategies)
            .await
            .expect("chain");
        assert!(!authenticated);
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn placeholder_credentials_never_reach_a_strategy() {
        let (mut session, calls) = scripted_session(vec![]);
        let counter = Arc::new(AtomicUsize::new(0));
        let strategies = vec![strategy("success", &counter)];

        let placeholder = Credentials {
            email: crate::config::PLACEHOLDER_EMAIL.to_string(),
            password: "hunter2!".to_string(),
        };
        let result = authenticate(&mut session, &placeholder, &strategies).await;

        assert!(matches!(result, Err(PulseError::MissingConfig { .. })));
        assert_eq!(counter.load(Ordering::SeqCst), 0);
        assert!(calls.lock().is_empty());
    }

    #[tokio::test]
    async fn api_login_treats_401_as_rejection_and_stops() {
        let (mut session, calls) = scripted_session(vec![Ok(status_response(401))]);

        let outcome = ApiLogin.attempt(&mut session, &creds()).await;
        assert!(matches!(outcome, AuthOutcome::InvalidCredentials(_)));
        // The second login candidate is never attempted after a rejection.
        assert_eq!(calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn api_login_without_cookies_is_inconclusive() {
        let (mut session, _) = scripted_session(vec![
            Ok(ok_response("{}")),
            Ok(ok_response("{}")),
        ]);

        let outcome = ApiLogin.attempt(&mut session, &creds()).await;
        assert!(matches!(outcome, AuthOutcome::Inconclusive(_)));
    }

    #[tokio::test]
    async fn api_login_with_cookies_succeeds() {
        let mut response = ok_response("{\"status\":\"ok\"}");
        response.cookies.push(CookieRecord {
            domain: "www.naukri.com".to_string(),
            path: "/".to_string(),
            secure: true,
            expires: None,
            name: "nauk_at".to_string(),
            value: "token".to_string(),
        });
        let (mut session, _) = scripted_session(vec![Ok(response)]);

        let outcome = ApiLogin.attempt(&mut session, &creds()).await;
        assert!(matches!(outcome, AuthOutcome::Success));
    }
}
