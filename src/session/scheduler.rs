//! Cancellable periodic tasks.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::BoxFuture;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

/// Body of a periodic task; invoked once per period.
pub type PeriodicTask = Arc<dyn Fn() -> BoxFuture<'static, ()> + Send + Sync>;

/// Runs periodic tasks.
pub trait Scheduler: Send + Sync {
    /// Run `task` every `period`, first run one period from now.
    ///
    /// Runs never overlap: the next period is measured after the previous
    /// run returns if it overran.
    fn every(&self, name: &'static str, period: Duration, task: PeriodicTask) -> TaskHandle;
}

/// Handle to a scheduled task.
#[derive(Debug)]
pub struct TaskHandle {
    name: &'static str,
    token: CancellationToken,
    join: Mutex<Option<JoinHandle<()>>>,
}

impl TaskHandle {
    /// Wrap a cancellation token and the task driving it
    pub fn new(name: &'static str, token: CancellationToken, join: Option<JoinHandle<()>>) -> Self {
        Self {
            name,
            token,
            join: Mutex::new(join),
        }
    }

    /// Task name for logging
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Stop future runs. An in-flight run completes.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Whether `cancel` has been called
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Cancel and wait for an in-flight run to finish.
    pub async fn shutdown(&self) {
        self.cancel();
        let join = self.join.lock().ok().and_then(|mut j| j.take());
        if let Some(join) = join {
            if let Err(e) = join.await {
                tracing::warn!(task = self.name, error = %e, "periodic task ended abnormally");
            }
        }
    }
}

/// Scheduler on the tokio runtime.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn every(&self, name: &'static str, period: Duration, task: PeriodicTask) -> TaskHandle {
        let token = CancellationToken::new();
        let cancelled = token.clone();

        let join = tokio::spawn(async move {
            let mut ticker = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    () = cancelled.cancelled() => break,
                    _ = ticker.tick() => task().await,
                }
            }
            tracing::debug!(task = name, "periodic task stopped");
        });

        TaskHandle::new(name, token, Some(join))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    fn counting_task(counter: Arc<AtomicUsize>) -> PeriodicTask {
        Arc::new(move || {
            let counter = Arc::clone(&counter);
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test(start_paused = true)]
    async fn test_runs_once_per_period() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = TokioScheduler.every(
            "count",
            Duration::from_secs(10),
            counting_task(Arc::clone(&runs)),
        );

        // Nothing at t=0
        tokio::time::sleep(Duration::from_secs(9)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 1);

        tokio::time::sleep(Duration::from_secs(20)).await;
        assert_eq!(runs.load(Ordering::SeqCst), 3);

        handle.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_runs() {
        let runs = Arc::new(AtomicUsize::new(0));
        let handle = TokioScheduler.every(
            "count",
            Duration::from_secs(1),
            counting_task(Arc::clone(&runs)),
        );

        tokio::time::sleep(Duration::from_millis(1_500)).await;
        handle.shutdown().await;
        assert!(handle.is_cancelled());
        let after_cancel = runs.load(Ordering::SeqCst);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), after_cancel);
    }
}
