//! Shipped request filters.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use axum::http::header::{ACCEPT, CONTENT_TYPE, HOST, ORIGIN};
use axum::http::{HeaderMap, Method, StatusCode, Uri};

use super::{Rejection, RequestFilter};
use crate::protocol::SUPPORTED_PROTOCOL_VERSIONS;
use crate::session::{Clock, TokioClock};

/// Header carrying the negotiated protocol version
pub const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

const JSON: &str = "application/json";
const EVENT_STREAM: &str = "text/event-stream";

fn header_str<'a>(headers: &'a HeaderMap, name: impl axum::http::header::AsHeaderName) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

/// Media type of a header value, without parameters, lowercased.
fn media_type(value: &str) -> String {
    value
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase()
}

/// Strip the port from a `Host` value, keeping IPv6 brackets.
fn strip_port(host: &str) -> &str {
    if host.starts_with('[') {
        return match host.find(']') {
            Some(end) => &host[..=end],
            None => host,
        };
    }
    host.split(':').next().unwrap_or(host)
}

/// Rejects requests whose `Host` is not in the allow list (DNS rebinding).
#[derive(Debug, Clone)]
pub struct HostFilter {
    allowed: Vec<String>,
}

impl HostFilter {
    /// Allow the given hosts. An empty list admits any host.
    pub fn new(allowed: Vec<String>) -> Self {
        Self {
            allowed: allowed.iter().map(|h| h.to_ascii_lowercase()).collect(),
        }
    }
}

impl RequestFilter for HostFilter {
    fn name(&self) -> &'static str {
        "host"
    }

    fn check(&self, _method: &Method, uri: &Uri, headers: &HeaderMap) -> Result<(), Rejection> {
        if self.allowed.is_empty() {
            return Ok(());
        }

        let host = header_str(headers, HOST)
            .or_else(|| uri.authority().map(|a| a.as_str()))
            .ok_or_else(|| Rejection::new(StatusCode::FORBIDDEN, "missing Host header"))?;

        let bare = strip_port(host.trim()).to_ascii_lowercase();
        if self.allowed.iter().any(|h| *h == bare) {
            Ok(())
        } else {
            Err(Rejection::new(
                StatusCode::FORBIDDEN,
                format!("host not allowed: {bare}"),
            ))
        }
    }
}

/// Rejects cross-origin requests from origins not in the allow list.
#[derive(Debug, Clone)]
pub struct OriginFilter {
    allowed: Vec<String>,
}

impl OriginFilter {
    /// Allow the given origins. An empty list admits any origin.
    pub fn new(allowed: Vec<String>) -> Self {
        Self {
            allowed: allowed
                .iter()
                .map(|o| o.trim_end_matches('/').to_ascii_lowercase())
                .collect(),
        }
    }
}

impl RequestFilter for OriginFilter {
    fn name(&self) -> &'static str {
        "origin"
    }

    fn check(&self, _method: &Method, _uri: &Uri, headers: &HeaderMap) -> Result<(), Rejection> {
        if self.allowed.is_empty() {
            return Ok(());
        }
        let Some(origin) = header_str(headers, ORIGIN) else {
            return Ok(());
        };

        let origin = origin.trim().trim_end_matches('/').to_ascii_lowercase();
        if self.allowed.iter().any(|o| *o == origin) {
            Ok(())
        } else {
            Err(Rejection::new(
                StatusCode::FORBIDDEN,
                format!("origin not allowed: {origin}"),
            ))
        }
    }
}

/// Fixed-window admission: at most `max_requests` per `window`.
pub struct RateLimitFilter {
    max_requests: u32,
    window: Duration,
    clock: Arc<dyn Clock>,
    state: Mutex<Option<(Instant, u32)>>,
}

impl std::fmt::Debug for RateLimitFilter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimitFilter")
            .field("max_requests", &self.max_requests)
            .field("window", &self.window)
            .finish_non_exhaustive()
    }
}

impl RateLimitFilter {
    /// Create a limiter on the tokio clock
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            max_requests,
            window,
            clock: Arc::new(TokioClock),
            state: Mutex::new(None),
        }
    }

    /// Use a different time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }
}

impl RequestFilter for RateLimitFilter {
    fn name(&self) -> &'static str {
        "rate_limit"
    }

    fn check(&self, _method: &Method, _uri: &Uri, _headers: &HeaderMap) -> Result<(), Rejection> {
        let now = self.clock.now();
        let mut state = self.state.lock().map_err(|_| {
            Rejection::new(StatusCode::INTERNAL_SERVER_ERROR, "rate limiter unavailable")
        })?;

        let (start, count) = match *state {
            Some((start, count)) if now.saturating_duration_since(start) < self.window => {
                (start, count)
            }
            _ => (now, 0),
        };

        if count >= self.max_requests {
            *state = Some((start, count));
            return Err(Rejection::new(
                StatusCode::TOO_MANY_REQUESTS,
                format!(
                    "rate limit of {} requests per {}s exceeded",
                    self.max_requests,
                    self.window.as_secs()
                ),
            ));
        }

        *state = Some((start, count + 1));
        Ok(())
    }
}

/// Rejects unsupported `Mcp-Protocol-Version` values. Absent is fine.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProtocolVersionFilter;

impl RequestFilter for ProtocolVersionFilter {
    fn name(&self) -> &'static str {
        "protocol_version"
    }

    fn check(&self, _method: &Method, _uri: &Uri, headers: &HeaderMap) -> Result<(), Rejection> {
        let Some(version) = headers.get(PROTOCOL_VERSION_HEADER) else {
            return Ok(());
        };

        match version.to_str() {
            Ok(v) if SUPPORTED_PROTOCOL_VERSIONS.contains(&v.trim()) => Ok(()),
            Ok(v) => Err(Rejection::new(
                StatusCode::BAD_REQUEST,
                format!(
                    "unsupported protocol version {v}; supported: {}",
                    SUPPORTED_PROTOCOL_VERSIONS.join(", ")
                ),
            )),
            Err(_) => Err(Rejection::new(
                StatusCode::BAD_REQUEST,
                "protocol version header is not ASCII",
            )),
        }
    }
}

/// POST must accept JSON and SSE; GET must accept SSE.
#[derive(Debug, Clone, Copy, Default)]
pub struct AcceptFilter;

impl AcceptFilter {
    fn accepts(accept: &str, wanted: &str) -> bool {
        let (wanted_type, _) = wanted.split_once('/').unwrap_or((wanted, ""));
        accept.split(',').map(media_type).any(|range| {
            range == "*/*" || range == wanted || range == format!("{wanted_type}/*")
        })
    }
}

impl RequestFilter for AcceptFilter {
    fn name(&self) -> &'static str {
        "accept"
    }

    fn check(&self, method: &Method, _uri: &Uri, headers: &HeaderMap) -> Result<(), Rejection> {
        let required: &[&str] = match *method {
            Method::POST => &[JSON, EVENT_STREAM],
            Method::GET => &[EVENT_STREAM],
            _ => return Ok(()),
        };

        let accept = header_str(headers, ACCEPT).unwrap_or_default();
        if required.iter().all(|wanted| Self::accepts(accept, wanted)) {
            Ok(())
        } else {
            Err(Rejection::new(
                StatusCode::NOT_ACCEPTABLE,
                format!("client must accept {}", required.join(" and ")),
            ))
        }
    }
}

/// POST bodies must be declared as JSON.
#[derive(Debug, Clone, Copy, Default)]
pub struct ContentTypeFilter;

impl RequestFilter for ContentTypeFilter {
    fn name(&self) -> &'static str {
        "content_type"
    }

    fn check(&self, method: &Method, _uri: &Uri, headers: &HeaderMap) -> Result<(), Rejection> {
        if *method != Method::POST {
            return Ok(());
        }

        match header_str(headers, CONTENT_TYPE).map(media_type) {
            Some(ct) if ct == JSON => Ok(()),
            _ => Err(Rejection::new(
                StatusCode::UNSUPPORTED_MEDIA_TYPE,
                "Content-Type must be application/json",
            )),
        }
    }
}
