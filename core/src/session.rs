//! HTTP session handling
//!
//! The orchestration core never talks to reqwest directly; it goes through
//! the [`Transport`] seam so the whole policy layer can be exercised with a
//! scripted transport in tests. The session owns its own cookie jar because
//! cookie state must be inspectable and replaceable wholesale for the
//! plain-text persistence file.

use crate::error::{PulseError, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// HTTP method subset the portal surface needs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpMethod {
    Get,
    Post,
    Put,
}

impl std::fmt::Display for HttpMethod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            HttpMethod::Get => write!(f, "GET"),
            HttpMethod::Post => write!(f, "POST"),
            HttpMethod::Put => write!(f, "PUT"),
        }
    }
}

/// Request payload variants
#[derive(Debug, Clone)]
pub enum RequestBody {
    None,
    Json(serde_json::Value),
    Form(Vec<(String, String)>),
    /// Multipart upload of a single file plus extra text fields
    File {
        field: String,
        path: PathBuf,
        extra: Vec<(String, String)>,
    },
}

/// One fully-described HTTP request
#[derive(Debug, Clone)]
pub struct RequestSpec {
    pub method: HttpMethod,
    pub url: String,
    pub body: RequestBody,
}

impl RequestSpec {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            body: RequestBody::None,
        }
    }

    pub fn post_json(url: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: RequestBody::Json(value),
        }
    }

    pub fn post_form(url: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: RequestBody::Form(fields),
        }
    }

    pub fn put_json(url: impl Into<String>, value: serde_json::Value) -> Self {
        Self {
            method: HttpMethod::Put,
            url: url.into(),
            body: RequestBody::Json(value),
        }
    }

    pub fn upload(url: impl Into<String>, field: impl Into<String>, path: PathBuf) -> Self {
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            body: RequestBody::File {
                field: field.into(),
                path,
                extra: Vec::new(),
            },
        }
    }
}

/// What the core needs back from a request
#[derive(Debug, Clone)]
pub struct TransportResponse {
    pub status: u16,
    pub body: String,
    pub final_url: String,
    pub cookies: Vec<CookieRecord>,
}

impl TransportResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// One cookie as persisted: domain, path, secure flag, expiry, name, value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieRecord {
    pub domain: String,
    pub path: String,
    pub secure: bool,
    pub expires: Option<i64>,
    pub name: String,
    pub value: String,
}

impl CookieRecord {
    /// Serialize as one tab-separated line of the cookie file
    pub fn to_line(&self) -> String {
        format!(
            "{}\t{}\t{}\t{}\t{}\t{}",
            self.domain,
            self.path,
            self.secure,
            self.expires.map_or_else(|| "-".to_string(), |e| e.to_string()),
            self.name,
            self.value
        )
    }

    pub fn parse_line(line: &str) -> Option<Self> {
        let mut parts = line.split('\t');
        let domain = parts.next()?.to_string();
        let path = parts.next()?.to_string();
        let secure = parts.next()?.parse().ok()?;
        let expires = match parts.next()? {
            "-" => None,
            raw => Some(raw.parse().ok()?),
        };
        let name = parts.next()?.to_string();
        let value = parts.next()?.to_string();
        Some(Self {
            domain,
            path,
            secure,
            expires,
            name,
            value,
        })
    }
}

/// Parse a Set-Cookie header value. Attributes we don't track are ignored.
pub fn parse_set_cookie(header: &str, default_domain: &str) -> Option<CookieRecord> {
    let mut pieces = header.split(';');
    let (name, value) = pieces.next()?.split_once('=')?;

    let mut record = CookieRecord {
        domain: default_domain.to_string(),
        path: "/".to_string(),
        secure: false,
        expires: None,
        name: name.trim().to_string(),
        value: value.trim().to_string(),
    };
    if record.name.is_empty() {
        return None;
    }

    for piece in pieces {
        let piece = piece.trim();
        if piece.eq_ignore_ascii_case("secure") {
            record.secure = true;
        } else if let Some((key, val)) = piece.split_once('=') {
            match key.trim().to_ascii_lowercase().as_str() {
                "domain" => record.domain = val.trim().trim_start_matches('.').to_string(),
                "path" => record.path = val.trim().to_string(),
                "max-age" => {
                    if let Ok(secs) = val.trim().parse::<i64>() {
                        record.expires = Some(Utc::now().timestamp() + secs);
                    }
                }
                _ => {}
            }
        }
    }

    Some(record)
}

/// In-memory cookie jar keyed by (domain, path, name)
#[derive(Debug, Clone, Default)]
pub struct CookieJar {
    records: Vec<CookieRecord>,
}

impl CookieJar {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[CookieRecord] {
        &self.records
    }

    /// Insert or replace cookies coming off a response
    pub fn merge(&mut self, incoming: Vec<CookieRecord>) {
        for cookie in incoming {
            if let Some(existing) = self.records.iter_mut().find(|c| {
                c.domain == cookie.domain && c.path == cookie.path && c.name == cookie.name
            }) {
                *existing = cookie;
            } else {
                self.records.push(cookie);
            }
        }
    }

    /// Replace the whole jar, e.g. when restoring from disk
    pub fn replace_all(&mut self, records: Vec<CookieRecord>) {
        self.records = records;
    }

    /// Value for the Cookie request header, or None when the jar is empty
    pub fn header_value(&self) -> Option<String> {
        if self.records.is_empty() {
            return None;
        }
        Some(
            self.records
                .iter()
                .map(|c| format!("{}={}", c.name, c.value))
                .collect::<Vec<_>>()
                .join("; "),
        )
    }

    /// Load records from the plain-text cookie file
    pub fn load(path: &Path) -> Result<Vec<CookieRecord>> {
        let content = std::fs::read_to_string(path)?;
        let mut records = Vec::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            match CookieRecord::parse_line(line) {
                Some(record) => records.push(record),
                None => {
                    return Err(PulseError::CookieFileCorrupted {
                        path: path.to_path_buf(),
                        line: idx + 1,
                    })
                }
            }
        }
        Ok(records)
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let mut content = String::from("# jobpulse cookie file\n");
        for record in &self.records {
            content.push_str(&record.to_line());
            content.push('\n');
        }
        std::fs::write(path, content)?;
        Ok(())
    }
}

/// Authentication state carried through one orchestrator run
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub jar: CookieJar,
    pub authenticated: bool,
    pub last_verified: Option<DateTime<Utc>>,
}

/// Abstract HTTP capability consumed by the orchestration core
#[async_trait]
pub trait Transport: Send + Sync {
    async fn execute(
        &self,
        spec: &RequestSpec,
        cookie_header: Option<String>,
    ) -> Result<TransportResponse>;
}

/// Production transport backed by reqwest
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(timeout_secs: u64) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(timeout_secs))
            .user_agent(concat!("jobpulse/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| PulseError::Http(format!("failed to build HTTP client: {e}")))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn execute(
        &self,
        spec: &RequestSpec,
        cookie_header: Option<String>,
    ) -> Result<TransportResponse> {
        let mut request = match spec.method {
            HttpMethod::Get => self.client.get(&spec.url),
            HttpMethod::Post => self.client.post(&spec.url),
            HttpMethod::Put => self.client.put(&spec.url),
        };

        if let Some(header) = cookie_header {
            request = request.header(reqwest::header::COOKIE, header);
        }

        request = match &spec.body {
            RequestBody::None => request,
            RequestBody::Json(value) => request.json(value),
            RequestBody::Form(fields) => request.form(fields),
            RequestBody::File { field, path, extra } => {
                let bytes = tokio::fs::read(path).await?;
                let file_name = path
                    .file_name()
                    .map(|n| n.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "resume".to_string());
                let mut form = reqwest::multipart::Form::new()
                    .part(field.clone(), reqwest::multipart::Part::bytes(bytes).file_name(file_name));
                for (key, value) in extra {
                    form = form.text(key.clone(), value.clone());
                }
                request.multipart(form)
            }
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let default_domain = response.url().host_str().unwrap_or_default().to_string();

        let cookies = response
            .headers()
            .get_all(reqwest::header::SET_COOKIE)
            .iter()
            .filter_map(|h| h.to_str().ok())
            .filter_map(|h| parse_set_cookie(h, &default_domain))
            .collect();

        let body = response.text().await?;

        debug!(method = %spec.method, url = %spec.url, status, "request completed");

        Ok(TransportResponse {
            status,
            body,
            final_url,
            cookies,
        })
    }
}

/// One orchestrator run's exclusive handle on the transport and its cookies
pub struct Session {
    transport: Arc<dyn Transport>,
    pub state: SessionState,
    cookie_path: PathBuf,
}

impl Session {
    pub fn new(transport: Arc<dyn Transport>, cookie_path: PathBuf) -> Self {
        Self {
            transport,
            state: SessionState::default(),
            cookie_path,
        }
    }

    /// Execute a request, threading the jar through both directions
    pub async fn execute(&mut self, spec: &RequestSpec) -> Result<TransportResponse> {
        let response = self
            .transport
            .execute(spec, self.state.jar.header_value())
            .await?;
        if !response.cookies.is_empty() {
            self.state.jar.merge(response.cookies.clone());
        }
        Ok(response)
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.authenticated
    }

    pub fn mark_authenticated(&mut self) {
        self.state.authenticated = true;
        self.state.last_verified = Some(Utc::now());
    }

    /// Replace the jar from the cookie file, if present
    pub fn restore_cookies(&mut self) -> Result<bool> {
        if !self.cookie_path.exists() {
            return Ok(false);
        }
        let records = CookieJar::load(&self.cookie_path)?;
        let restored = !records.is_empty();
        self.state.jar.replace_all(records);
        if restored {
            info!(path = %self.cookie_path.display(), "restored cookies from disk");
        }
        Ok(restored)
    }

    /// Rewrite the cookie file after a successful authentication
    pub fn persist_cookies(&self) -> Result<()> {
        self.state.jar.save(&self.cookie_path)?;
        debug!(path = %self.cookie_path.display(), count = self.state.jar.records().len(), "persisted cookies");
        Ok(())
    }

    /// Release transport resources. Dropping would do the same; the explicit
    /// call keeps the cleanup step visible in the cycle. The cookie file is
    /// only rewritten when this session actually authenticated; a failed
    /// login must not clobber a previously valid persisted jar.
    pub fn close(self) {
        if self.state.authenticated {
            if let Err(e) = self.persist_cookies() {
                warn!("failed to persist cookies on close: {e}");
            }
        }
        info!("session closed");
    }
}
