//! Rate-limited, retrying, cache-first fetcher.
//!
//! A [`Fetcher`] is built once per run and shared by reference with every
//! pricing source. It owns all mutable request state: the concurrency
//! permits, the pacing slot and the cache handle.
//!
//! Request flow:
//! 1. derive the cache key from the request descriptor, return on a hit;
//! 2. acquire a permit (one by default, so one request in flight);
//! 3. wait until the minimum spacing since the previous request has passed;
//! 4. send, validate, decode into the caller's shape;
//! 5. on failure retry with exponential backoff until the budget is spent;
//! 6. write the raw payload through to the cache once it has decoded.
//!
//! A 2xx payload of the wrong shape (a throttling notice, an HTML page
//! wrapped in JSON) is a failed attempt like any other and is never cached.

use std::convert::Infallible;
use std::fmt::Display;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use serde_json::Value;
use thiserror::Error;
use tokio::sync::{Mutex, Semaphore};
use tokio::time::Instant;

use crate::cache::CacheStore;
use crate::http::{HttpMethod, HttpRequest, HttpTransport};
use crate::retry::{RetryPolicy, with_retry};
use crate::sync::ProgressCallback;

/// Default minimum spacing between requests, in milliseconds.
pub const DEFAULT_MIN_INTERVAL_MS: u64 = 1_000;

/// Default number of requests allowed in flight.
pub const DEFAULT_MAX_CONCURRENCY: usize = 1;

/// Longest response body excerpt kept in error messages.
const ERROR_BODY_EXCERPT: usize = 120;

/// A single failed attempt. Every variant is retryable.
#[derive(Debug, Clone, Error)]
pub enum AttemptError {
    /// Connection, timeout or TLS failure.
    #[error("network error: {0}")]
    Transport(String),

    /// Non-2xx status.
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },

    /// Body was not valid JSON.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// 2xx response carrying an upstream error object.
    #[error("upstream error: {0}")]
    Upstream(String),

    /// Valid JSON that the caller's decoder rejected.
    #[error("unexpected payload: {0}")]
    Shape(String),
}

/// Errors surfaced by [`Fetcher::fetch`].
#[derive(Debug, Error)]
pub enum FetchError {
    /// The retry budget was spent without a valid response.
    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    Exhausted {
        operation: String,
        attempts: usize,
        #[source]
        last_error: AttemptError,
    },
}

impl FetchError {
    #[must_use]
    pub fn operation(&self) -> &str {
        match self {
            FetchError::Exhausted { operation, .. } => operation,
        }
    }
}

/// What to fetch, independent of transport details.
///
/// Parameters are query pairs for `GET` and form fields for `POST`. The
/// cache key sorts them, so parameter order never splits cache entries.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Cache namespace; one per endpoint family.
    pub namespace: &'static str,
    pub method: HttpMethod,
    pub url: String,
    pub params: Vec<(String, String)>,
    /// Human-readable description used in logs and errors.
    pub operation: String,
}

impl RequestDescriptor {
    #[must_use]
    pub fn get(namespace: &'static str, url: impl Into<String>, operation: impl Into<String>) -> Self {
        Self {
            namespace,
            method: HttpMethod::Get,
            url: url.into(),
            params: Vec::new(),
            operation: operation.into(),
        }
    }

    #[must_use]
    pub fn post_form(
        namespace: &'static str,
        url: impl Into<String>,
        params: Vec<(String, String)>,
        operation: impl Into<String>,
    ) -> Self {
        Self {
            namespace,
            method: HttpMethod::Post,
            url: url.into(),
            params,
            operation: operation.into(),
        }
    }

    /// Normalized request signature: namespace, method, URL, sorted params.
    #[must_use]
    pub fn cache_key(&self) -> String {
        let mut params = self.params.clone();
        params.sort();
        let query = params
            .iter()
            .map(|(k, v)| format!("{k}={v}"))
            .collect::<Vec<_>>()
            .join("&");
        let url = self.url.trim_end_matches('/');
        if query.is_empty() {
            format!("{}:{} {}", self.namespace, self.method.as_str(), url)
        } else {
            format!("{}:{} {}?{}", self.namespace, self.method.as_str(), url, query)
        }
    }

    fn to_http_request(&self) -> HttpRequest {
        match self.method {
            HttpMethod::Get => {
                let url = if self.params.is_empty() {
                    self.url.clone()
                } else {
                    match url::Url::parse(&self.url) {
                        Ok(mut parsed) => {
                            parsed.query_pairs_mut().extend_pairs(self.params.iter());
                            parsed.to_string()
                        }
                        Err(_) => self.url.clone(),
                    }
                };
                HttpRequest::get(url)
            }
            HttpMethod::Post => HttpRequest::post_form(self.url.clone(), &self.params),
        }
    }
}

/// Pacing and retry settings.
#[derive(Debug, Clone)]
pub struct FetcherOptions {
    /// Minimum gap between the end of one request and the start of the next.
    pub min_interval: Duration,
    /// Requests allowed in flight at once.
    pub max_concurrency: usize,
    pub retry: RetryPolicy,
}

impl Default for FetcherOptions {
    fn default() -> Self {
        Self {
            min_interval: Duration::from_millis(DEFAULT_MIN_INTERVAL_MS),
            max_concurrency: DEFAULT_MAX_CONCURRENCY,
            retry: RetryPolicy::default(),
        }
    }
}

/// Counters for the run summary.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FetchStats {
    pub cache_hits: usize,
    pub network_requests: usize,
    pub failed_attempts: usize,
    pub exhausted: usize,
}

#[derive(Debug, Default)]
struct Counters {
    cache_hits: AtomicUsize,
    network_requests: AtomicUsize,
    failed_attempts: AtomicUsize,
    exhausted: AtomicUsize,
}

/// Cache-first, rate-limited, retrying JSON fetcher.
pub struct Fetcher {
    transport: Arc<dyn HttpTransport>,
    cache: Arc<CacheStore>,
    options: FetcherOptions,
    permits: Semaphore,
    /// Earliest instant the next request may start. Spacing counts from the
    /// end of the previous request, which a token bucket such as `governor`
    /// cannot express.
    next_slot: Mutex<Option<Instant>>,
    counters: Counters,
}

impl Fetcher {
    pub fn new(
        transport: Arc<dyn HttpTransport>,
        cache: Arc<CacheStore>,
        options: FetcherOptions,
    ) -> Self {
        let permits = Semaphore::new(options.max_concurrency.max(1));
        Self {
            transport,
            cache,
            options,
            permits,
            next_slot: Mutex::new(None),
            counters: Counters::default(),
        }
    }

    #[must_use]
    pub fn options(&self) -> &FetcherOptions {
        &self.options
    }

    #[must_use]
    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    #[must_use]
    pub fn stats(&self) -> FetchStats {
        FetchStats {
            cache_hits: self.counters.cache_hits.load(Ordering::Relaxed),
            network_requests: self.counters.network_requests.load(Ordering::Relaxed),
            failed_attempts: self.counters.failed_attempts.load(Ordering::Relaxed),
            exhausted: self.counters.exhausted.load(Ordering::Relaxed),
        }
    }

    /// Fetch a JSON document, from cache when possible.
    pub async fn fetch(
        &self,
        request: &RequestDescriptor,
        on_progress: Option<&ProgressCallback>,
    ) -> Result<Value, FetchError> {
        self.fetch_with(request, on_progress, |value| {
            Ok::<_, Infallible>(value.clone())
        })
        .await
    }

    /// Fetch and decode a JSON document.
    ///
    /// `decode` runs inside the retry loop: a rejected payload counts as a
    /// failed attempt. Only payloads that decode are cached, and a cached
    /// payload that no longer decodes is refetched.
    pub async fn fetch_with<T, E, D>(
        &self,
        request: &RequestDescriptor,
        on_progress: Option<&ProgressCallback>,
        decode: D,
    ) -> Result<T, FetchError>
    where
        E: Display,
        D: Fn(&Value) -> Result<T, E>,
    {
        let key = request.cache_key();
        if let Some(value) = self.cache.get(&key) {
            match decode(&value) {
                Ok(decoded) => {
                    self.counters.cache_hits.fetch_add(1, Ordering::Relaxed);
                    tracing::trace!(key = %key, "Cache hit");
                    return Ok(decoded);
                }
                Err(e) => {
                    tracing::debug!(key = %key, error = %e, "Cached payload rejected, refetching");
                }
            }
        }

        let policy = &self.options.retry;
        let (value, decoded) = with_retry(
            || async {
                let value = self.attempt(request).await?;
                match decode(&value) {
                    Ok(decoded) => Ok((value, decoded)),
                    Err(e) => {
                        self.counters.failed_attempts.fetch_add(1, Ordering::Relaxed);
                        Err(AttemptError::Shape(e.to_string()))
                    }
                }
            },
            policy,
            |_: &AttemptError| true,
            &request.operation,
            on_progress,
        )
        .await
        .map_err(|last_error| {
            self.counters.exhausted.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                operation = %request.operation,
                attempts = policy.attempts(),
                error = %last_error,
                "Retry budget exhausted"
            );
            FetchError::Exhausted {
                operation: request.operation.clone(),
                attempts: policy.attempts(),
                last_error,
            }
        })?;

        if is_cacheable(&value) {
            if let Err(e) = self.cache.set(&key, value) {
                tracing::warn!(key = %key, error = %e, "Failed to persist cache entry");
            }
        } else {
            tracing::debug!(operation = %request.operation, "Empty response not cached");
        }

        Ok(decoded)
    }

    /// One paced request under a concurrency permit.
    async fn attempt(&self, request: &RequestDescriptor) -> Result<Value, AttemptError> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|e| AttemptError::Transport(e.to_string()))?;

        self.wait_for_slot().await;
        self.counters.network_requests.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(operation = %request.operation, url = %request.url, "Requesting");

        let result = self.transport.send(request.to_http_request()).await;
        self.release_slot().await;

        let outcome = match result {
            Err(e) => Err(AttemptError::Transport(e.to_string())),
            Ok(response) if !response.is_success() => Err(AttemptError::Status {
                status: response.status,
                message: excerpt(&response.body),
            }),
            Ok(response) => parse_body(&response.body),
        };
        if outcome.is_err() {
            self.counters.failed_attempts.fetch_add(1, Ordering::Relaxed);
        }
        outcome
    }

    async fn wait_for_slot(&self) {
        let mut next = self.next_slot.lock().await;
        if let Some(at) = *next
            && at > Instant::now()
        {
            tokio::time::sleep_until(at).await;
        }
        // Reserve the next slot now so concurrent permits stay spaced.
        *next = Some(Instant::now() + self.options.min_interval);
    }

    async fn release_slot(&self) {
        let mut next = self.next_slot.lock().await;
        let after_end = Instant::now() + self.options.min_interval;
        if (*next).is_none_or(|at| at < after_end) {
            *next = Some(after_end);
        }
    }
}

fn parse_body(body: &[u8]) -> Result<Value, AttemptError> {
    let value: Value =
        serde_json::from_slice(body).map_err(|e| AttemptError::Malformed(e.to_string()))?;
    if let Some(message) = value.get("erro").or_else(|| value.get("error")) {
        let message = message
            .as_str()
            .map(str::to_string)
            .unwrap_or_else(|| message.to_string());
        return Err(AttemptError::Upstream(message));
    }
    Ok(value)
}

fn excerpt(body: &[u8]) -> String {
    let text = String::from_utf8_lossy(body);
    let text = text.trim();
    if text.chars().count() > ERROR_BODY_EXCERPT {
        let truncated: String = text.chars().take(ERROR_BODY_EXCERPT - 3).collect();
        format!("{truncated}...")
    } else {
        text.to_string()
    }
}

/// Empty answers are indistinguishable from cache misses, so they are never stored.
fn is_cacheable(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
        Value::String(s) => !s.is_empty(),
        _ => true,
    }
}
