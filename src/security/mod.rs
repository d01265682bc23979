//! Request filter chain for the streamable endpoint.
//!
//! Each filter either lets a request through untouched or rejects it with a
//! status and a reason. Filters never see the body and never touch session
//! state; the first rejection wins.
//!
//! # Filters
//!
//! | Order | Filter                  | Rejects with |
//! |-------|-------------------------|--------------|
//! | 1     | [`HostFilter`]          | 403          |
//! | 2     | [`OriginFilter`]        | 403          |
//! | 3     | [`RateLimitFilter`]     | 429          |
//! | 4     | [`ProtocolVersionFilter`] | 400        |
//! | 5     | [`AcceptFilter`]        | 406          |
//! | 6     | [`ContentTypeFilter`]   | 415          |
//!
//! # Usage
//!
//! ```rust
//! use axum::http::{HeaderMap, Method, Uri};
//! use mcp_transport::config::SecuritySettings;
//! use mcp_transport::security::FilterChain;
//!
//! let chain = FilterChain::from_settings(&SecuritySettings::default());
//!
//! let mut headers = HeaderMap::new();
//! headers.insert("host", "evil.example".parse().unwrap());
//!
//! let rejection = chain
//!     .check(&Method::GET, &Uri::from_static("/mcp"), &headers)
//!     .unwrap_err();
//! assert_eq!(rejection.status.as_u16(), 403);
//! ```

mod filters;

pub use filters::{
    AcceptFilter, ContentTypeFilter, HostFilter, OriginFilter, ProtocolVersionFilter,
    RateLimitFilter, PROTOCOL_VERSION_HEADER,
};

use std::fmt;
use std::time::Duration;

use axum::http::{HeaderMap, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};

use crate::config::SecuritySettings;
use crate::error::error_response;

/// Why a filter refused a request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    /// Response status
    pub status: StatusCode,
    /// Human-readable reason
    pub reason: String,
}

impl Rejection {
    /// Create a rejection
    pub fn new(status: StatusCode, reason: impl Into<String>) -> Self {
        Self {
            status,
            reason: reason.into(),
        }
    }
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.status.as_u16(), self.reason)
    }
}

impl IntoResponse for Rejection {
    fn into_response(self) -> Response {
        error_response(self.status, &self.reason)
    }
}

/// One check in the chain.
pub trait RequestFilter: Send + Sync {
    /// Filter name for logging
    fn name(&self) -> &'static str;

    /// Pass the request or reject it.
    fn check(&self, method: &Method, uri: &Uri, headers: &HeaderMap) -> Result<(), Rejection>;
}

/// Ordered, short-circuiting list of filters
#[derive(Default)]
pub struct FilterChain {
    filters: Vec<Box<dyn RequestFilter>>,
}

impl fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.names()).finish()
    }
}

impl FilterChain {
    /// Create an empty chain (admits everything)
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the standard chain from settings
    pub fn from_settings(settings: &SecuritySettings) -> Self {
        let mut chain = Self::new()
            .with(HostFilter::new(settings.allowed_hosts.clone()))
            .with(OriginFilter::new(settings.allowed_origins.clone()));

        if settings.rate_limit_requests > 0 {
            chain = chain.with(RateLimitFilter::new(
                settings.rate_limit_requests,
                Duration::from_secs(settings.rate_limit_window_secs),
            ));
        }

        chain
            .with(ProtocolVersionFilter)
            .with(AcceptFilter)
            .with(ContentTypeFilter)
    }

    /// Append a filter
    pub fn with(mut self, filter: impl RequestFilter + 'static) -> Self {
        self.filters.push(Box::new(filter));
        self
    }

    /// Run every filter in order, stopping at the first rejection.
    pub fn check(&self, method: &Method, uri: &Uri, headers: &HeaderMap) -> Result<(), Rejection> {
        for filter in &self.filters {
            if let Err(rejection) = filter.check(method, uri, headers) {
                tracing::debug!(
                    filter = filter.name(),
                    method = %method,
                    status = rejection.status.as_u16(),
                    reason = %rejection.reason,
                    "request rejected"
                );
                return Err(rejection);
            }
        }
        Ok(())
    }

    /// Filter names in order
    pub fn names(&self) -> Vec<&'static str> {
        self.filters.iter().map(|f| f.name()).collect()
    }

    /// Number of filters
    pub fn len(&self) -> usize {
        self.filters.len()
    }

    /// Check if the chain has no filters
    pub fn is_empty(&self) -> bool {
        self.filters.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_post_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("host", "localhost:3000".parse().unwrap());
        headers.insert(
            "accept",
            "application/json, text/event-stream".parse().unwrap(),
        );
        headers.insert("content-type", "application/json".parse().unwrap());
        headers
    }

    fn mcp() -> Uri {
        Uri::from_static("/mcp")
    }

    #[test]
    fn test_standard_chain_order() {
        let chain = FilterChain::from_settings(&SecuritySettings {
            rate_limit_requests: 10,
            ..SecuritySettings::default()
        });
        assert_eq!(
            chain.names(),
            vec![
                "host",
                "origin",
                "rate_limit",
                "protocol_version",
                "accept",
                "content_type"
            ]
        );
    }

    #[test]
    fn test_rate_limit_omitted_when_unlimited() {
        let chain = FilterChain::from_settings(&SecuritySettings::default());
        assert!(!chain.names().contains(&"rate_limit"));
    }

    #[test]
    fn test_valid_request_passes() {
        let chain = FilterChain::from_settings(&SecuritySettings::default());
        assert!(chain
            .check(&Method::POST, &mcp(), &valid_post_headers())
            .is_ok());
    }

    #[test]
    fn test_first_rejection_wins() {
        let chain = FilterChain::from_settings(&SecuritySettings::default());
        let mut headers = valid_post_headers();
        headers.insert("host", "evil.example".parse().unwrap());
        headers.remove("content-type");

        // Host fails before content type is looked at
        let rejection = chain.check(&Method::POST, &mcp(), &headers).unwrap_err();
        assert_eq!(rejection.status, StatusCode::FORBIDDEN);
    }

    #[test]
    fn test_empty_chain_admits_everything() {
        let chain = FilterChain::new();
        assert!(chain.is_empty());
        assert!(chain
            .check(&Method::POST, &mcp(), &HeaderMap::new())
            .is_ok());
    }

    #[test]
    fn test_rejection_display() {
        let rejection = Rejection::new(StatusCode::NOT_ACCEPTABLE, "nope");
        assert_eq!(rejection.to_string(), "406 nope");
    }
}
