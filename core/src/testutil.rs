//! Scripted transport for exercising the orchestration policy without a
//! network. Responses are consumed in order; every executed request is
//! recorded for assertions.

use crate::error::{PulseError, Result};
use crate::session::{RequestSpec, Session, Transport, TransportResponse};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::sync::Arc;

pub struct ScriptedTransport {
    responses: Mutex<VecDeque<Result<TransportResponse>>>,
    pub calls: Arc<Mutex<Vec<String>>>,
}

impl ScriptedTransport {
    pub fn new(responses: Vec<Result<TransportResponse>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn execute(
        &self,
        spec: &RequestSpec,
        _cookie_header: Option<String>,
    ) -> Result<TransportResponse> {
        self.calls
            .lock()
            .push(format!("{} {}", spec.method, spec.url));
        self.responses
            .lock()
            .pop_front()
            .unwrap_or_else(|| {
                Err(PulseError::ConnectionFailed {
                    message: "script exhausted".to_string(),
                })
            })
    }
}

/// Session over a scripted transport plus the shared call log
pub fn scripted_session(
    responses: Vec<Result<TransportResponse>>,
) -> (Session, Arc<Mutex<Vec<String>>>) {
    let transport = Arc::new(ScriptedTransport::new(responses));
    let calls = transport.calls.clone();
    let dir = std::env::temp_dir().join(format!("jobpulse-test-{}", uuid::Uuid::new_v4()));
    let session = Session::new(transport, dir.join("cookies.txt"));
    (session, calls)
}

pub fn ok_response(body: &str) -> TransportResponse {
    TransportResponse {
        status: 200,
        body: body.to_string(),
        final_url: "https://www.naukri.com/mnjuser/profile".to_string(),
        cookies: Vec::new(),
    }
}

pub fn status_response(status: u16) -> TransportResponse {
    TransportResponse {
        status,
        body: String::new(),
        final_url: "https://www.naukri.com/mnjuser/profile".to_string(),
        cookies: Vec::new(),
    }
}
