//! Transport boundary for all outbound HTTP I/O.
//!
//! Pricing sources never talk to reqwest directly; they build an
//! [`HttpRequest`] and hand it to an [`HttpTransport`]. Production code uses
//! [`ReqwestTransport`], tests use the in-memory `MockTransport`.

use std::time::Duration as StdDuration;

use async_trait::async_trait;
use thiserror::Error;

/// Minimal HTTP method enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum HttpMethod {
    Get,
    Post,
}

impl HttpMethod {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            HttpMethod::Get => "GET",
            HttpMethod::Post => "POST",
        }
    }
}

/// HTTP headers represented as key/value pairs.
///
/// Header names are treated case-insensitively by helper functions.
pub type HttpHeaders = Vec<(String, String)>;

/// A minimal HTTP request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpRequest {
    pub method: HttpMethod,
    pub url: String,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpRequest {
    /// A JSON `GET` request.
    #[must_use]
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: HttpMethod::Get,
            url: url.into(),
            headers: vec![("Accept".to_string(), "application/json".to_string())],
            body: Vec::new(),
        }
    }

    /// A form-encoded `POST` request.
    #[must_use]
    pub fn post_form(url: impl Into<String>, form: &[(String, String)]) -> Self {
        let body = url::form_urlencoded::Serializer::new(String::new())
            .extend_pairs(form.iter())
            .finish();
        Self {
            method: HttpMethod::Post,
            url: url.into(),
            headers: vec![
                ("Accept".to_string(), "application/json".to_string()),
                (
                    "Content-Type".to_string(),
                    "application/x-www-form-urlencoded".to_string(),
                ),
            ],
            body: body.into_bytes(),
        }
    }
}

/// A minimal HTTP response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpResponse {
    pub status: u16,
    pub headers: HttpHeaders,
    pub body: Vec<u8>,
}

impl HttpResponse {
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        header_get(&self.headers, name)
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

#[derive(Debug, Error)]
pub enum HttpError {
    #[error("http transport error: {0}")]
    Transport(String),

    #[error("no mock response registered for {method} {url}")]
    NoMockResponse { method: String, url: String },
}

/// Transport boundary for all HTTP I/O.
#[async_trait]
pub trait HttpTransport: Send + Sync {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError>;
}

/// Get the first header value matching `name` (case-insensitive).
#[must_use]
pub fn header_get<'a>(headers: &'a HttpHeaders, name: &str) -> Option<&'a str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// A real HTTP transport backed by reqwest.
#[derive(Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    pub fn with_timeout(timeout: StdDuration, user_agent: &str) -> Result<Self, HttpError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| HttpError::Transport(e.to_string()))?;
        Ok(Self { client })
    }
}

#[async_trait]
impl HttpTransport for ReqwestTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let method = match request.method {
            HttpMethod::Get => reqwest::Method::GET,
            HttpMethod::Post => reqwest::Method::POST,
        };

        let mut builder = self.client.request(method, &request.url);
        for (k, v) in request.headers {
            builder = builder.header(&k, &v);
        }

        if !request.body.is_empty() {
            builder = builder.body(request.body);
        }

        let resp = builder
            .send()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?;

        let status = resp.status().as_u16();
        let mut headers: HttpHeaders = Vec::new();
        for (name, value) in resp.headers().iter() {
            headers.push((
                name.as_str().to_string(),
                value.to_str().unwrap_or_default().to_string(),
            ));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| HttpError::Transport(e.to_string()))?
            .to_vec();

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

// ---------- Test-only mock transport ----------

#[cfg(test)]
use std::collections::{HashMap, VecDeque};
#[cfg(test)]
use std::sync::{Arc, Mutex};

/// In-memory mock transport.
///
/// No sockets, no loopback servers. Each route keeps a FIFO of outcomes; a
/// route can also carry a sticky outcome returned once its queue is drained.
#[cfg(test)]
#[derive(Clone, Default)]
pub struct MockTransport {
    inner: Arc<Mutex<MockTransportInner>>,
}

#[cfg(test)]
type MockOutcome = Result<HttpResponse, String>;

#[cfg(test)]
#[derive(Default)]
struct MockTransportInner {
    routes: HashMap<(HttpMethod, String), VecDeque<MockOutcome>>,
    sticky: HashMap<(HttpMethod, String), MockOutcome>,
    requests: Vec<HttpRequest>,
    sent_at: Vec<tokio::time::Instant>,
    latency: Option<StdDuration>,
}

#[cfg(test)]
impl MockTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simulate a fixed round-trip time for every request.
    pub fn with_latency(self, latency: StdDuration) -> Self {
        self.lock().latency = Some(latency);
        self
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MockTransportInner> {
        self.inner
            .lock()
            .expect("mock transport lock should not be poisoned")
    }

    /// Register a response for a method + URL, returned in FIFO order.
    pub fn push_response(
        &self,
        method: HttpMethod,
        url: impl Into<String>,
        response: HttpResponse,
    ) {
        self.lock()
            .routes
            .entry((method, url.into()))
            .or_default()
            .push_back(Ok(response));
    }

    /// Register a JSON 200 response.
    pub fn push_json(&self, method: HttpMethod, url: impl Into<String>, body: serde_json::Value) {
        self.push_response(method, url, json_response(200, &body));
    }

    /// Register a transport-level failure.
    pub fn push_error(&self, method: HttpMethod, url: impl Into<String>, message: &str) {
        self.lock()
            .routes
            .entry((method, url.into()))
            .or_default()
            .push_back(Err(message.to_string()));
    }

    /// Answer every request to this route with `response` once its queue is empty.
    pub fn always(&self, method: HttpMethod, url: impl Into<String>, response: HttpResponse) {
        self.lock().sticky.insert((method, url.into()), Ok(response));
    }

    /// Fail every request to this route once its queue is empty.
    pub fn always_fail(&self, method: HttpMethod, url: impl Into<String>, message: &str) {
        self.lock()
            .sticky
            .insert((method, url.into()), Err(message.to_string()));
    }

    #[must_use]
    pub fn requests(&self) -> Vec<HttpRequest> {
        self.lock().requests.clone()
    }

    #[must_use]
    pub fn request_count(&self) -> usize {
        self.lock().requests.len()
    }

    /// Instants at which each request reached the transport.
    #[must_use]
    pub fn sent_at(&self) -> Vec<tokio::time::Instant> {
        self.lock().sent_at.clone()
    }
}

#[cfg(test)]
pub fn json_response(status: u16, body: &serde_json::Value) -> HttpResponse {
    HttpResponse {
        status,
        headers: vec![("Content-Type".to_string(), "application/json".to_string())],
        body: serde_json::to_vec(body).expect("json body should serialize"),
    }
}

#[cfg(test)]
#[async_trait]
impl HttpTransport for MockTransport {
    async fn send(&self, request: HttpRequest) -> Result<HttpResponse, HttpError> {
        let (outcome, latency) = {
            let mut inner = self.lock();
            let key = (request.method, request.url.clone());
            inner.requests.push(request);
            inner.sent_at.push(tokio::time::Instant::now());

            let outcome = match inner.routes.get_mut(&key).and_then(|q| q.pop_front()) {
                Some(outcome) => Some(outcome),
                None => inner.sticky.get(&key).cloned(),
            };
            let outcome = outcome.ok_or_else(|| HttpError::NoMockResponse {
                method: key.0.as_str().to_string(),
                url: key.1,
            });
            (outcome, inner.latency)
        };

        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }

        match outcome? {
            Ok(resp) => Ok(resp),
            Err(message) => Err(HttpError::Transport(message)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn header_get_is_case_insensitive_and_returns_first_match() {
        let headers: HttpHeaders = vec![
            ("Retry-After".to_string(), "5".to_string()),
            ("retry-after".to_string(), "9".to_string()),
        ];
        assert_eq!(header_get(&headers, "retry-after"), Some("5"));
        assert_eq!(header_get(&headers, "RETRY-AFTER"), Some("5"));
        assert_eq!(header_get(&headers, "missing"), None);
    }

    #[test]
    fn post_form_encodes_body_and_sets_content_type() {
        let req = HttpRequest::post_form(
            "https://example.com/api/ConsultarMarcas",
            &[
                ("codigoTabelaReferencia".to_string(), "300".to_string()),
                ("codigoTipoVeiculo".to_string(), "1".to_string()),
            ],
        );
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(
            String::from_utf8(req.body.clone()).unwrap(),
            "codigoTabelaReferencia=300&codigoTipoVeiculo=1"
        );
        assert_eq!(
            header_get(&req.headers, "content-type"),
            Some("application/x-www-form-urlencoded")
        );
    }

    #[test]
    fn is_success_covers_2xx_only() {
        let mut resp = json_response(204, &serde_json::json!({}));
        assert!(resp.is_success());
        resp.status = 302;
        assert!(!resp.is_success());
        resp.status = 500;
        assert!(!resp.is_success());
    }

    #[tokio::test]
    async fn mock_transport_returns_fifo_then_sticky() {
        let transport = MockTransport::new();
        let url = "https://example.com/api";
        transport.push_json(HttpMethod::Get, url, serde_json::json!({"n": 1}));
        transport.always(
            HttpMethod::Get,
            url,
            json_response(503, &serde_json::json!({})),
        );

        let first = transport.send(HttpRequest::get(url)).await.unwrap();
        assert_eq!(first.status, 200);
        let second = transport.send(HttpRequest::get(url)).await.unwrap();
        assert_eq!(second.status, 503);
        let third = transport.send(HttpRequest::get(url)).await.unwrap();
        assert_eq!(third.status, 503);
        assert_eq!(transport.request_count(), 3);
    }

    #[tokio::test]
    async fn mock_transport_errors_when_no_response_is_registered() {
        let transport = MockTransport::new();
        let err = transport
            .send(HttpRequest::get("https://example.com/missing"))
            .await
            .expect_err("missing mock should error");
        match err {
            HttpError::NoMockResponse { method, url } => {
                assert_eq!(method, "GET");
                assert_eq!(url, "https://example.com/missing");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn mock_transport_reports_pushed_errors_as_transport_failures() {
        let transport = MockTransport::new();
        transport.push_error(HttpMethod::Get, "https://example.com/x", "connection reset");
        let err = transport
            .send(HttpRequest::get("https://example.com/x"))
            .await
            .expect_err("pushed error should surface");
        assert!(matches!(err, HttpError::Transport(ref m) if m == "connection reset"));
    }

    #[test]
    fn reqwest_transport_with_timeout_builds_client() {
        let transport =
            ReqwestTransport::with_timeout(StdDuration::from_millis(10), "fipe-sync-test")
                .expect("reqwest transport should build");
        let _ = transport;
    }

    #[tokio::test]
    async fn reqwest_transport_send_returns_transport_error_for_invalid_url() {
        let transport = ReqwestTransport::new(reqwest::Client::new());
        let err = transport
            .send(HttpRequest::get("not a url"))
            .await
            .expect_err("expected error");
        assert!(matches!(err, HttpError::Transport(_)));
    }
}
