//! Transport statistics tracking.
//!
//! Tracks session churn, termination causes, rejections and request latency.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;
use std::time::{Duration, Instant};

use crate::session::TerminationReason;

/// Latencies kept for percentile calculation
const LATENCY_WINDOW: usize = 1000;

/// Thread-safe transport statistics
#[derive(Debug, Default)]
pub struct TransportStats {
    /// Sessions created
    sessions_created: AtomicU64,
    /// Terminations requested by clients (DELETE)
    terminated_client: AtomicU64,
    /// Terminations by the idle sweep
    terminated_expired: AtomicU64,
    /// Terminations after missed or failed heartbeats
    terminated_heartbeat: AtomicU64,
    /// Terminations after the client dropped its stream
    terminated_disconnected: AtomicU64,
    /// Terminations during shutdown
    terminated_shutdown: AtomicU64,
    /// Sessions torn down because setup failed
    terminated_failed: AtomicU64,
    /// Creates refused at capacity
    capacity_rejections: AtomicU64,
    /// Requests refused by the filter chain
    filter_rejections: AtomicU64,
    /// Requests that reached the router
    requests: AtomicU64,
    /// Requests answered with a 5xx
    errors: AtomicU64,
    /// Request latencies (for percentile calculation)
    latencies: RwLock<Vec<Duration>>,
    /// Start time
    started_at: RwLock<Option<Instant>>,
}

impl TransportStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self {
            started_at: RwLock::new(Some(Instant::now())),
            ..Default::default()
        }
    }

    /// Record a session creation
    pub fn record_created(&self) {
        self.sessions_created.fetch_add(1, Ordering::Relaxed);
    }

    fn termination_counter(&self, reason: TerminationReason) -> &AtomicU64 {
        match reason {
            TerminationReason::Client => &self.terminated_client,
            TerminationReason::Expired => &self.terminated_expired,
            TerminationReason::Heartbeat => &self.terminated_heartbeat,
            TerminationReason::Disconnected => &self.terminated_disconnected,
            TerminationReason::Shutdown => &self.terminated_shutdown,
            TerminationReason::Failed => &self.terminated_failed,
        }
    }

    /// Record a completed termination
    pub fn record_terminated(&self, reason: TerminationReason) {
        self.termination_counter(reason)
            .fetch_add(1, Ordering::Relaxed);
    }

    /// Record a create refused at capacity
    pub fn record_capacity_rejection(&self) {
        self.capacity_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a filter chain rejection
    pub fn record_filter_rejection(&self) {
        self.filter_rejections.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a handled request
    pub fn record_request(&self, latency: Duration, failed: bool) {
        self.requests.fetch_add(1, Ordering::Relaxed);
        if failed {
            self.errors.fetch_add(1, Ordering::Relaxed);
        }

        if let Ok(mut latencies) = self.latencies.write() {
            latencies.push(latency);
            if latencies.len() > LATENCY_WINDOW {
                latencies.remove(0);
            }
        }
    }

    /// Get sessions created
    pub fn sessions_created(&self) -> u64 {
        self.sessions_created.load(Ordering::Relaxed)
    }

    /// Get terminations for one reason
    pub fn terminated(&self, reason: TerminationReason) -> u64 {
        self.termination_counter(reason).load(Ordering::Relaxed)
    }

    /// Get terminations across all reasons
    pub fn total_terminated(&self) -> u64 {
        TerminationReason::ALL
            .iter()
            .map(|reason| self.terminated(*reason))
            .sum()
    }

    /// Get capacity rejections
    pub fn capacity_rejections(&self) -> u64 {
        self.capacity_rejections.load(Ordering::Relaxed)
    }

    /// Get filter rejections
    pub fn filter_rejections(&self) -> u64 {
        self.filter_rejections.load(Ordering::Relaxed)
    }

    /// Get total requests
    pub fn total_requests(&self) -> u64 {
        self.requests.load(Ordering::Relaxed)
    }

    /// Get total errors
    pub fn total_errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Get p50 latency
    pub fn p50_latency(&self) -> Option<Duration> {
        self.percentile_latency(50)
    }

    /// Get p99 latency
    pub fn p99_latency(&self) -> Option<Duration> {
        self.percentile_latency(99)
    }

    fn percentile_latency(&self, percentile: usize) -> Option<Duration> {
        let latencies = self.latencies.read().ok()?;
        if latencies.is_empty() {
            return None;
        }

        let mut sorted = latencies.clone();
        sorted.sort();

        let idx = (sorted.len() * percentile / 100).min(sorted.len() - 1);
        Some(sorted[idx])
    }

    /// Get uptime
    pub fn uptime(&self) -> Duration {
        self.started_at
            .read()
            .ok()
            .and_then(|s| s.map(|start| start.elapsed()))
            .unwrap_or_default()
    }

    /// Get summary as JSON-compatible struct
    pub fn summary(&self) -> StatsSummary {
        StatsSummary {
            sessions_created: self.sessions_created(),
            sessions_terminated: self.total_terminated(),
            terminated_client: self.terminated(TerminationReason::Client),
            terminated_expired: self.terminated(TerminationReason::Expired),
            terminated_heartbeat: self.terminated(TerminationReason::Heartbeat),
            terminated_disconnected: self.terminated(TerminationReason::Disconnected),
            terminated_shutdown: self.terminated(TerminationReason::Shutdown),
            terminated_failed: self.terminated(TerminationReason::Failed),
            capacity_rejections: self.capacity_rejections(),
            filter_rejections: self.filter_rejections(),
            total_requests: self.total_requests(),
            total_errors: self.total_errors(),
            p50_latency_ms: self.p50_latency().map(|d| d.as_secs_f64() * 1000.0),
            p99_latency_ms: self.p99_latency().map(|d| d.as_secs_f64() * 1000.0),
            uptime_secs: self.uptime().as_secs(),
        }
    }
}

/// Statistics summary for serialization.
#[derive(Debug, Clone, serde::Serialize)]
pub struct StatsSummary {
    /// Sessions created since start.
    pub sessions_created: u64,
    /// Sessions terminated since start.
    pub sessions_terminated: u64,
    /// Terminated by client request.
    pub terminated_client: u64,
    /// Terminated by the idle sweep.
    pub terminated_expired: u64,
    /// Terminated by heartbeat supervision.
    pub terminated_heartbeat: u64,
    /// Terminated because the client went away.
    pub terminated_disconnected: u64,
    /// Terminated during shutdown.
    pub terminated_shutdown: u64,
    /// Terminated because setup failed.
    pub terminated_failed: u64,
    /// Creates refused at capacity.
    pub capacity_rejections: u64,
    /// Requests refused by the filter chain.
    pub filter_rejections: u64,
    /// Requests handled by the routers.
    pub total_requests: u64,
    /// Requests answered with a server error.
    pub total_errors: u64,
    /// 50th percentile latency in milliseconds.
    pub p50_latency_ms: Option<f64>,
    /// 99th percentile latency in milliseconds.
    pub p99_latency_ms: Option<f64>,
    /// Uptime in seconds.
    pub uptime_secs: u64,
}
