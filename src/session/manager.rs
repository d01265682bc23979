//! Session manager: creation, lookup, termination and background supervision.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex as StdMutex, Weak};

use futures::future::join_all;
use tokio::sync::Mutex;

use super::clock::{Clock, TokioClock};
use super::registry::{Session, SessionRegistry};
use super::scheduler::{PeriodicTask, Scheduler, TaskHandle};
use super::{SessionHandle, SessionId, SessionInfo, SessionKind, SessionState, TerminationReason};
use crate::config::SessionConfig;
use crate::error::{Result, TransportError};
use crate::protocol::JsonRpcMessage;
use crate::stats::{StatsSummary, TransportStats};
use crate::transport::SessionTransport;

/// Owns every live session.
///
/// The registry lock is never held across transport I/O: state transitions
/// happen under the lock, `send`/`close` happen after it is released.
pub struct SessionManager {
    config: SessionConfig,
    clock: Arc<dyn Clock>,
    registry: Mutex<SessionRegistry>,
    timers: StdMutex<Vec<TaskHandle>>,
    draining: AtomicBool,
    probe_seq: AtomicU64,
    stats: Arc<TransportStats>,
}

impl SessionManager {
    /// Create a manager on the tokio clock
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            clock: Arc::new(TokioClock),
            registry: Mutex::new(SessionRegistry::new()),
            timers: StdMutex::new(Vec::new()),
            draining: AtomicBool::new(false),
            probe_seq: AtomicU64::new(0),
            stats: Arc::new(TransportStats::new()),
        }
    }

    /// Use a different time source
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Share a stats tracker
    pub fn with_stats(mut self, stats: Arc<TransportStats>) -> Self {
        self.stats = stats;
        self
    }

    /// Get session configuration
    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Get stats tracker
    pub fn stats_tracker(&self) -> &Arc<TransportStats> {
        &self.stats
    }

    /// Whether `close_all` has begun
    pub fn is_draining(&self) -> bool {
        self.draining.load(Ordering::SeqCst)
    }

    /// Create a session of `kind` bound to a transport from `factory`.
    ///
    /// The factory is not called when the manager is at capacity or draining.
    pub async fn create<F>(&self, kind: SessionKind, factory: F) -> Result<SessionHandle>
    where
        F: FnOnce() -> Arc<dyn SessionTransport>,
    {
        let mut registry = self.registry.lock().await;

        // Checked under the lock so close_all's snapshot cannot miss a session
        if self.is_draining() {
            return Err(TransportError::ShuttingDown);
        }

        let max = self.config.max_count();
        if registry.len() >= max {
            self.stats.record_capacity_rejection();
            tracing::warn!(kind = %kind, max_sessions = max, "session capacity exceeded");
            return Err(TransportError::CapacityExceeded(max));
        }

        let id = uuid::Uuid::new_v4().to_string();
        let session = Session::new(id.clone(), kind, factory(), self.clock.now());
        let handle = session.handle();

        if let Err(e) = registry.insert(session) {
            tracing::error!(session_id = %id, error = %e, "generated session id collided");
            return Err(e);
        }
        let active = registry.len();
        drop(registry);

        self.stats.record_created();
        tracing::info!(session_id = %id, kind = %kind, active, "session created");
        Ok(handle)
    }

    /// Look up a live session.
    ///
    /// `Expired` if it has idled past the timeout but not yet been swept.
    pub async fn get(&self, id: &str) -> Result<SessionHandle> {
        let now = self.clock.now();
        let registry = self.registry.lock().await;
        let session = registry.get(id)?;

        if !session.is_active() {
            return Err(TransportError::NotFound(id.to_string()));
        }
        if session.idle(now) > self.config.timeout() {
            return Err(TransportError::Expired(id.to_string()));
        }
        Ok(session.handle())
    }

    /// Look up a live session in one identifier space.
    pub async fn get_kind(&self, id: &str, kind: SessionKind) -> Result<SessionHandle> {
        let handle = self.get(id).await?;
        if handle.kind != kind {
            return Err(TransportError::NotFound(id.to_string()));
        }
        Ok(handle)
    }

    /// Record a liveness signal for `id`.
    pub async fn touch(&self, id: &str) -> Result<()> {
        let now = self.clock.now();
        let mut registry = self.registry.lock().await;
        let session = registry.get_mut(id)?;

        if !session.is_active() {
            return Err(TransportError::NotFound(id.to_string()));
        }
        if session.idle(now) > self.config.timeout() {
            return Err(TransportError::Expired(id.to_string()));
        }
        session.touch(now);
        Ok(())
    }

    /// Terminate a session at the client's request.
    pub async fn terminate(&self, id: &str) -> Result<()> {
        self.terminate_with(id, TerminationReason::Client).await
    }

    /// Terminate a session.
    ///
    /// Only the caller that moves the session out of ACTIVE closes its
    /// transport; everyone else gets `NotFound`. A failed close is logged and
    /// the session is removed anyway.
    pub async fn terminate_with(&self, id: &str, reason: TerminationReason) -> Result<()> {
        let transport = {
            let mut registry = self.registry.lock().await;
            let session = registry.get_mut(id)?;
            if !session.advance(SessionState::Closing) {
                return Err(TransportError::NotFound(id.to_string()));
            }
            session.transport()
        };

        let closed = transport.close().await;

        let remaining = {
            let mut registry = self.registry.lock().await;
            if let Some(mut session) = registry.remove(id) {
                session.advance(SessionState::Closed);
            }
            registry.len()
        };
        self.stats.record_terminated(reason);

        match closed {
            Ok(()) => tracing::info!(
                session_id = %id,
                reason = reason.as_str(),
                active = remaining,
                "session terminated"
            ),
            Err(e) => tracing::warn!(
                session_id = %id,
                reason = reason.as_str(),
                error = %e,
                "transport close failed; session removed"
            ),
        }
        Ok(())
    }

    /// Stop the timers, refuse new sessions, and terminate every session.
    ///
    /// Returns once every transport close has settled.
    pub async fn close_all(&self) {
        self.draining.store(true, Ordering::SeqCst);
        self.stop_timers().await;

        let ids = self.registry.lock().await.ids();
        let count = self.terminate_many(ids, TerminationReason::Shutdown).await;
        tracing::info!(closed = count, "all sessions closed");
    }

    /// Terminate every session of one kind.
    pub async fn close_kind(&self, kind: SessionKind) -> usize {
        let ids: Vec<SessionId> = {
            let registry = self.registry.lock().await;
            registry
                .iter()
                .filter(|s| s.kind() == kind)
                .map(|s| s.id().to_string())
                .collect()
        };
        let count = self.terminate_many(ids, TerminationReason::Shutdown).await;
        tracing::info!(kind = %kind, closed = count, "sessions drained");
        count
    }

    async fn terminate_many(&self, ids: Vec<SessionId>, reason: TerminationReason) -> usize {
        let results = join_all(ids.iter().map(|id| self.terminate_with(id, reason))).await;
        results.iter().filter(|r| r.is_ok()).count()
    }

    /// Terminate every ACTIVE session idle past the timeout.
    ///
    /// Returns the number of sessions swept.
    pub async fn run_sweep(&self) -> usize {
        let now = self.clock.now();
        let timeout = self.config.timeout();
        let expired: Vec<SessionId> = {
            let registry = self.registry.lock().await;
            registry
                .iter()
                .filter(|s| s.is_active() && s.idle(now) > timeout)
                .map(|s| s.id().to_string())
                .collect()
        };

        let mut swept = 0;
        for id in expired {
            match self.terminate_with(&id, TerminationReason::Expired).await {
                Ok(()) => swept += 1,
                Err(e) => tracing::debug!(session_id = %id, error = %e, "sweep skipped session"),
            }
        }

        if swept > 0 {
            tracing::info!(swept, "expired sessions swept");
        }
        swept
    }

    /// One heartbeat round over every ACTIVE session.
    ///
    /// Returns the number of sessions terminated.
    pub async fn run_heartbeat(&self) -> usize {
        let max_missed = self.config.max_missed_heartbeats();
        let mut probes = Vec::new();
        let mut failed = Vec::new();
        {
            let mut registry = self.registry.lock().await;
            for session in registry.iter_mut().filter(|s| s.is_active()) {
                if session.heartbeat_round(max_missed) {
                    probes.push((session.id().to_string(), session.transport()));
                } else {
                    tracing::warn!(
                        session_id = %session.id(),
                        missed = session.missed_heartbeats(),
                        "heartbeat missed too many times"
                    );
                    failed.push(session.id().to_string());
                }
            }
        }

        for (id, transport) in probes {
            let seq = self.probe_seq.fetch_add(1, Ordering::Relaxed);
            match transport.send(JsonRpcMessage::ping(seq)).await {
                Ok(()) => {}
                // Undelivered probe counts as a miss next round unless touched
                Err(TransportError::QueueFull) => {
                    tracing::debug!(session_id = %id, "outbound queue full; probe not queued");
                }
                Err(e) => {
                    tracing::warn!(session_id = %id, error = %e, "heartbeat probe failed");
                    failed.push(id);
                }
            }
        }

        let mut terminated = 0;
        for id in failed {
            if self
                .terminate_with(&id, TerminationReason::Heartbeat)
                .await
                .is_ok()
            {
                terminated += 1;
            }
        }
        terminated
    }

    /// Install the sweep and heartbeat timers.
    ///
    /// Timers hold a weak reference and stop doing work once the manager is
    /// dropped.
    pub fn start(self: &Arc<Self>, scheduler: &dyn Scheduler) {
        let weak = Arc::downgrade(self);
        let sweep = scheduler.every(
            "session-sweep",
            self.config.cleanup_interval(),
            periodic(weak.clone(), |manager| async move {
                manager.run_sweep().await;
            }),
        );
        let heartbeat = scheduler.every(
            "session-heartbeat",
            self.config.keep_alive_interval(),
            periodic(weak, |manager| async move {
                manager.run_heartbeat().await;
            }),
        );

        if let Ok(mut timers) = self.timers.lock() {
            timers.push(sweep);
            timers.push(heartbeat);
        }
        tracing::debug!(
            cleanup_interval_ms = self.config.cleanup_interval().as_millis() as u64,
            keep_alive_interval_ms = self.config.keep_alive_interval().as_millis() as u64,
            "session timers started"
        );
    }

    /// Cancel both timers and wait for in-flight runs.
    pub async fn stop_timers(&self) {
        let timers = self
            .timers
            .lock()
            .map(|mut t| std::mem::take(&mut *t))
            .unwrap_or_default();
        for timer in &timers {
            timer.shutdown().await;
            tracing::debug!(task = timer.name(), "timer stopped");
        }
    }

    /// Get session count
    pub async fn len(&self) -> usize {
        self.registry.lock().await.len()
    }

    /// Check if no sessions are registered
    pub async fn is_empty(&self) -> bool {
        self.registry.lock().await.is_empty()
    }

    /// Describe every registered session
    pub async fn snapshot(&self) -> Vec<SessionInfo> {
        let now = self.clock.now();
        self.registry
            .lock()
            .await
            .iter()
            .map(|s| s.info(now))
            .collect()
    }

    /// Get stats summary
    pub fn stats(&self) -> StatsSummary {
        self.stats.summary()
    }
}

fn periodic<F, Fut>(manager: Weak<SessionManager>, run: F) -> PeriodicTask
where
    F: Fn(Arc<SessionManager>) -> Fut + Send + Sync + 'static,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    let run = Arc::new(run);
    Arc::new(move || {
        let manager = manager.clone();
        let run = Arc::clone(&run);
        Box::pin(async move {
            if let Some(manager) = manager.upgrade() {
                run(manager).await;
            }
        })
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use futures::future::BoxFuture;

    use super::*;
    use crate::config::SessionSettings;
    use crate::session::ManualClock;
    use crate::transport::ChannelTransport;

    /// Transport that records traffic and can be told to fail
    #[derive(Default)]
    struct MockTransport {
        sent: StdMutex<Vec<JsonRpcMessage>>,
        closes: AtomicUsize,
        fail_send: bool,
        fail_close: bool,
    }

    impl MockTransport {
        fn failing_send() -> Self {
            Self {
                fail_send: true,
                ..Default::default()
            }
        }

        fn failing_close() -> Self {
            Self {
                fail_close: true,
                ..Default::default()
            }
        }

        fn close_count(&self) -> usize {
            self.closes.load(Ordering::SeqCst)
        }

        fn sent(&self) -> Vec<JsonRpcMessage> {
            self.sent.lock().unwrap().clone()
        }
    }

    impl SessionTransport for MockTransport {
        fn send(&self, message: JsonRpcMessage) -> BoxFuture<'_, Result<()>> {
            Box::pin(async move {
                if self.fail_send {
                    return Err(TransportError::Transport("send refused".to_string()));
                }
                self.sent.lock().unwrap().push(message);
                Ok(())
            })
        }

        fn close(&self) -> BoxFuture<'_, Result<()>> {
            Box::pin(async move {
                self.closes.fetch_add(1, Ordering::SeqCst);
                tokio::task::yield_now().await;
                if self.fail_close {
                    return Err(TransportError::Transport("close refused".to_string()));
                }
                Ok(())
            })
        }

        fn closed(&self) -> BoxFuture<'static, ()> {
            Box::pin(std::future::pending())
        }

        fn is_closed(&self) -> bool {
            self.close_count() > 0
        }

        fn name(&self) -> &'static str {
            "mock"
        }
    }

    fn settings() -> SessionSettings {
        SessionSettings {
            timeout_ms: 60_000,
            cleanup_interval_ms: 10_000,
            keep_alive_interval_ms: 5_000,
            max_missed_heartbeats: 3,
            max_count: 10,
        }
    }

    fn manager_with(settings: SessionSettings) -> (Arc<SessionManager>, Arc<ManualClock>) {
        let clock = Arc::new(ManualClock::new());
        let config = SessionConfig::new(&settings).unwrap();
        let manager = SessionManager::new(config).with_clock(clock.clone());
        (Arc::new(manager), clock)
    }

    async fn create_mock(
        manager: &SessionManager,
        transport: MockTransport,
    ) -> (SessionHandle, Arc<MockTransport>) {
        let transport = Arc::new(transport);
        let bound = Arc::clone(&transport);
        let handle = manager
            .create(SessionKind::Streamable, move || bound as Arc<dyn SessionTransport>)
            .await
            .unwrap();
        (handle, transport)
    }

    #[tokio::test]
    async fn test_create_and_get() {
        let (manager, _) = manager_with(settings());
        let (handle, _) = create_mock(&manager, MockTransport::default()).await;

        assert_eq!(handle.id.len(), 36);
        let found = manager.get(&handle.id).await.unwrap();
        assert_eq!(found.id, handle.id);
        assert_eq!(manager.len().await, 1);
        assert_eq!(manager.stats().sessions_created, 1);
    }

    #[tokio::test]
    async fn test_capacity_does_not_call_factory() {
        let (manager, _) = manager_with(SessionSettings {
            max_count: 2,
            ..settings()
        });
        create_mock(&manager, MockTransport::default()).await;
        create_mock(&manager, MockTransport::default()).await;

        let called = AtomicUsize::new(0);
        let err = manager
            .create(SessionKind::Streamable, || {
                called.fetch_add(1, Ordering::SeqCst);
                Arc::new(MockTransport::default()) as Arc<dyn SessionTransport>
            })
            .await
            .unwrap_err();

        assert!(matches!(err, TransportError::CapacityExceeded(2)));
        assert_eq!(called.load(Ordering::SeqCst), 0);
        assert_eq!(manager.len().await, 2);
        assert_eq!(manager.stats().capacity_rejections, 1);
    }

    #[tokio::test]
    async fn test_ids_are_unique() {
        let (manager, _) = manager_with(settings());
        let mut ids = std::collections::HashSet::new();
        for _ in 0..10 {
            let (handle, _) = create_mock(&manager, MockTransport::default()).await;
            assert!(ids.insert(handle.id));
        }
    }

    #[tokio::test]
    async fn test_get_kind_isolates_id_spaces() {
        let (manager, _) = manager_with(settings());
        let (handle, _) = create_mock(&manager, MockTransport::default()).await;

        assert!(manager
            .get_kind(&handle.id, SessionKind::Streamable)
            .await
            .is_ok());
        assert!(matches!(
            manager.get_kind(&handle.id, SessionKind::Legacy).await,
            Err(TransportError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_terminate_is_idempotent() {
        let (manager, _) = manager_with(settings());
        let (handle, transport) = create_mock(&manager, MockTransport::default()).await;

        manager.terminate(&handle.id).await.unwrap();
        assert!(matches!(
            manager.terminate(&handle.id).await,
            Err(TransportError::NotFound(_))
        ));
        assert_eq!(transport.close_count(), 1);
        assert!(manager.is_empty().await);
    }

    #[tokio::test]
    async fn test_concurrent_terminate_closes_once() {
        let (manager, _) = manager_with(settings());
        let (handle, transport) = create_mock(&manager, MockTransport::default()).await;

        let (a, b) = tokio::join!(manager.terminate(&handle.id), manager.terminate(&handle.id));

        assert_eq!(a.is_ok() as u8 + b.is_ok() as u8, 1);
        assert_eq!(transport.close_count(), 1);
    }

    #[tokio::test]
    async fn test_closing_session_reads_as_not_found() {
        let (manager, _) = manager_with(settings());
        let (handle, _) = create_mock(&manager, MockTransport::default()).await;

        {
            let mut registry = manager.registry.lock().await;
            registry
                .get_mut(&handle.id)
                .unwrap()
                .advance(SessionState::Closing);
        }
        assert!(matches!(
            manager.get(&handle.id).await,
            Err(TransportError::NotFound(_))
        ));
        assert!(matches!(
            manager.touch(&handle.id).await,
            Err(TransportError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_get_reports_expired_before_sweep() {
        let (manager, clock) = manager_with(settings());
        let (handle, _) = create_mock(&manager, MockTransport::default()).await;

        clock.advance(Duration::from_millis(60_001));
        assert!(matches!(
            manager.get(&handle.id).await,
            Err(TransportError::Expired(_))
        ));

        assert_eq!(manager.run_sweep().await, 1);
        assert!(matches!(
            manager.get(&handle.id).await,
            Err(TransportError::NotFound(_))
        ));
    }

    #[tokio::test]
    async fn test_sweep_keeps_touched_sessions() {
        let (manager, clock) = manager_with(settings());
        let (idle, idle_transport) = create_mock(&manager, MockTransport::default()).await;
        let (busy, busy_transport) = create_mock(&manager, MockTransport::default()).await;

        clock.advance(Duration::from_secs(50));
        manager.touch(&busy.id).await.unwrap();
        clock.advance(Duration::from_secs(11));

        assert_eq!(manager.run_sweep().await, 1);
        assert!(manager.get(&idle.id).await.is_err());
        assert!(manager.get(&busy.id).await.is_ok());
        assert_eq!(idle_transport.close_count(), 1);
        assert_eq!(busy_transport.close_count(), 0);
        assert_eq!(manager.stats().terminated_expired, 1);
    }

    #[tokio::test]
    async fn test_sweep_continues_past_close_failure() {
        let (manager, clock) = manager_with(settings());
        let (_, failing) = create_mock(&manager, MockTransport::failing_close()).await;
        let (_, healthy) = create_mock(&manager, MockTransport::default()).await;

        clock.advance(Duration::from_secs(61));
        assert_eq!(manager.run_sweep().await, 2);
        assert_eq!(failing.close_count(), 1);
        assert_eq!(healthy.close_count(), 1);
        assert!(manager.is_empty().await);
    }

    #[tokio::test]
    async fn test_heartbeat_terminates_after_max_missed() {
        let (manager, _) = manager_with(settings());
        let (handle, transport) = create_mock(&manager, MockTransport::default()).await;

        // Probe, then three unanswered rounds
        assert_eq!(manager.run_heartbeat().await, 0);
        assert_eq!(manager.run_heartbeat().await, 0);
        assert_eq!(manager.run_heartbeat().await, 0);
        assert_eq!(manager.run_heartbeat().await, 1);

        assert!(manager.get(&handle.id).await.is_err());
        assert_eq!(transport.sent().len(), 3);
        assert_eq!(transport.close_count(), 1);
        assert_eq!(manager.stats().terminated_heartbeat, 1);
    }

    #[tokio::test]
    async fn test_heartbeat_reply_resets_misses() {
        let (manager, _) = manager_with(settings());
        let (handle, transport) = create_mock(&manager, MockTransport::default()).await;

        for _ in 0..10 {
            manager.run_heartbeat().await;
            manager.run_heartbeat().await;
            manager.touch(&handle.id).await.unwrap();
        }

        assert!(manager.get(&handle.id).await.is_ok());
        assert_eq!(transport.close_count(), 0);

        let probe = &transport.sent()[0];
        assert_eq!(probe.method.as_deref(), Some("ping"));
        assert!(probe
            .id
            .as_ref()
            .and_then(|id| id.as_str())
            .is_some_and(|id| id.starts_with("hb-")));
    }

    #[tokio::test]
    async fn test_full_queue_is_not_a_failed_probe() {
        let (manager, _) = manager_with(settings());
        let handle = manager
            .create(SessionKind::Streamable, || {
                Arc::new(ChannelTransport::with_capacity(2)) as Arc<dyn SessionTransport>
            })
            .await
            .unwrap();

        // Client keeps posting but never opens its stream
        for _ in 0..20 {
            assert_eq!(manager.run_heartbeat().await, 0);
            manager.touch(&handle.id).await.unwrap();
        }
        assert!(manager.get(&handle.id).await.is_ok());

        // Once activity stops the usual miss budget applies
        assert_eq!(manager.run_heartbeat().await, 0);
        assert_eq!(manager.run_heartbeat().await, 0);
        assert_eq!(manager.run_heartbeat().await, 0);
        assert_eq!(manager.run_heartbeat().await, 1);
        assert_eq!(manager.stats().terminated_heartbeat, 1);
    }

    #[tokio::test]
    async fn test_failed_probe_terminates() {
        let (manager, _) = manager_with(settings());
        let (handle, transport) = create_mock(&manager, MockTransport::failing_send()).await;
        let (other, _) = create_mock(&manager, MockTransport::default()).await;

        assert_eq!(manager.run_heartbeat().await, 1);
        assert!(manager.get(&handle.id).await.is_err());
        assert!(manager.get(&other.id).await.is_ok());
        assert_eq!(transport.close_count(), 1);
    }

    #[tokio::test]
    async fn test_close_all_empties_registry() {
        let (manager, _) = manager_with(settings());
        let (_, a) = create_mock(&manager, MockTransport::default()).await;
        let (_, b) = create_mock(&manager, MockTransport::failing_close()).await;
        let (_, c) = create_mock(&manager, MockTransport::default()).await;

        manager.close_all().await;

        assert!(manager.is_empty().await);
        for t in [a, b, c] {
            assert_eq!(t.close_count(), 1);
        }
        assert_eq!(manager.stats().terminated_shutdown, 3);

        let err = manager
            .create(SessionKind::Streamable, || {
                Arc::new(MockTransport::default()) as Arc<dyn SessionTransport>
            })
            .await
            .unwrap_err();
        assert!(matches!(err, TransportError::ShuttingDown));
    }

    #[tokio::test]
    async fn test_close_kind_leaves_other_kind() {
        let (manager, _) = manager_with(settings());
        let (streamable, _) = create_mock(&manager, MockTransport::default()).await;
        let legacy = manager
            .create(SessionKind::Legacy, || {
                Arc::new(MockTransport::default()) as Arc<dyn SessionTransport>
            })
            .await
            .unwrap();

        assert_eq!(manager.close_kind(SessionKind::Legacy).await, 1);
        assert!(manager.get(&legacy.id).await.is_err());
        assert!(manager.get(&streamable.id).await.is_ok());
    }

    #[tokio::test]
    async fn test_snapshot() {
        let (manager, clock) = manager_with(settings());
        let (handle, _) = create_mock(&manager, MockTransport::default()).await;
        clock.advance(Duration::from_secs(3));
        manager.run_heartbeat().await;
        manager.run_heartbeat().await;

        let snapshot = manager.snapshot().await;
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, handle.id);
        assert_eq!(snapshot[0].state, SessionState::Active);
        assert_eq!(snapshot[0].idle, Duration::from_secs(3));
        assert_eq!(snapshot[0].missed_heartbeats, 1);
    }
}
