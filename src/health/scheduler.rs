// src/health/scheduler.rs
use super::cache::ResultCache;
use super::probe::Probe;
use crate::metrics::CheckMetrics;
use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::time::{sleep, Duration};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Background loop that refreshes one [`ResultCache`].
///
/// Runs are strictly sequential: the next one starts only after the previous
/// one has returned and a full interval has passed. Without a token the loop
/// never ends. With one, it stops before starting a run or during the wait,
/// but a run already in progress always finishes and is recorded.
pub(crate) struct Scheduler {
    pub(crate) name: Arc<str>,
    pub(crate) probe: Arc<dyn Probe>,
    pub(crate) cache: Arc<ResultCache>,
    pub(crate) interval: Duration,
    pub(crate) cancel: Option<CancellationToken>,
    pub(crate) metrics: Option<Arc<CheckMetrics>>,
}

impl Scheduler {
    pub(crate) async fn run(self) {
        info!(
            check = %self.name,
            interval = ?self.interval,
            cancellable = self.cancel.is_some(),
            "Starting async check scheduler"
        );

        loop {
            if self.is_cancelled() {
                break;
            }

            if !self.run_once().await {
                return;
            }

            if !self.wait().await {
                break;
            }
        }

        info!(check = %self.name, "Async check scheduler cancelled");
    }

    fn is_cancelled(&self) -> bool {
        self.cancel
            .as_ref()
            .map_or(false, CancellationToken::is_cancelled)
    }

    /// Returns false if the check panicked and the loop must stop.
    async fn run_once(&self) -> bool {
        let start = Instant::now();

        let outcome = match AssertUnwindSafe(self.probe.probe()).catch_unwind().await {
            Ok(outcome) => outcome,
            Err(_) => {
                error!(check = %self.name, "Check panicked, scheduler stopping");
                return false;
            }
        };

        let elapsed = start.elapsed();
        let was_healthy = self.cache.get().map(|prev| prev.is_healthy());
        let snapshot = self.cache.set(outcome);

        if let Some(metrics) = &self.metrics {
            metrics.record_run(&self.name, snapshot.is_healthy(), elapsed);
        }

        match (&snapshot.outcome, was_healthy) {
            (Err(e), Some(true)) => warn!(
                check = %self.name,
                run = snapshot.run,
                error = %e,
                "Check is now unhealthy"
            ),
            (Ok(()), Some(false)) => info!(
                check = %self.name,
                run = snapshot.run,
                "Check recovered"
            ),
            _ => {}
        }

        debug!(
            check = %self.name,
            run = snapshot.run,
            healthy = snapshot.is_healthy(),
            elapsed_ms = elapsed.as_millis() as u64,
            "Check run complete"
        );

        true
    }

    /// Returns false if cancellation fired before the interval elapsed.
    async fn wait(&self) -> bool {
        match &self.cancel {
            None => {
                sleep(self.interval).await;
                true
            }
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => false,
                    _ = sleep(self.interval) => true,
                }
            }
        }
    }
}
