// src/health/async_check.rs
use super::cache::ResultCache;
use super::error::{BoxError, CheckError};
use super::probe::{self, Probe};
use super::scheduler::Scheduler;
use crate::config::{AsyncCheckConfig, ConfigError, DEFAULT_CHECK_NAME, DEFAULT_INTERVAL_MS};
use crate::metrics::CheckMetrics;
use chrono::{DateTime, Utc};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Healthy,
    Unhealthy,
    Unknown,
}

/// Wrap a blocking check so it is refreshed every `interval` in the
/// background and can be read without waiting on it.
///
/// The first run starts immediately. Until it completes, [`AsyncCheck::check`]
/// returns [`CheckError::NoDataYet`]. The background task has no way to be
/// stopped and keeps running for the life of the runtime, even after every
/// handle to the returned check is dropped. Use
/// [`async_check_with_cancellation`] when the check must be stoppable.
///
/// # Panics
///
/// Panics when called outside a tokio runtime.
pub fn async_check<F, E>(check: F, interval: Duration) -> AsyncCheck
where
    F: FnMut() -> Result<(), E> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    AsyncCheck::builder(probe::blocking(check))
        .interval(interval)
        .spawn_on(Handle::current())
}

/// Like [`async_check`], but the background task stops once `token` is
/// cancelled.
///
/// A run that is already in progress when the token fires is allowed to
/// finish and its result is still stored. No run starts afterwards. The last
/// stored result stays readable.
///
/// # Panics
///
/// Panics when called outside a tokio runtime.
pub fn async_check_with_cancellation<F, E>(
    token: CancellationToken,
    check: F,
    interval: Duration,
) -> AsyncCheck
where
    F: FnMut() -> Result<(), E> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    AsyncCheck::builder(probe::blocking(check))
        .interval(interval)
        .cancel_on(token)
        .spawn_on(Handle::current())
}

/// Non-blocking handle onto a periodically refreshed check.
///
/// Clones share the same cached result.
#[derive(Clone)]
pub struct AsyncCheck {
    inner: Arc<Inner>,
}

struct Inner {
    name: Arc<str>,
    cache: Arc<ResultCache>,
    task: JoinHandle<()>,
}

impl AsyncCheck {
    pub fn builder<P: Probe>(probe: P) -> AsyncCheckBuilder {
        AsyncCheckBuilder::new(Arc::new(probe))
    }

    /// Latest result of the wrapped check, or [`CheckError::NoDataYet`].
    pub fn check(&self) -> Result<(), CheckError> {
        match self.inner.cache.get() {
            Some(snapshot) => snapshot.outcome.clone(),
            None => Err(CheckError::NoDataYet),
        }
    }

    pub fn status(&self) -> HealthStatus {
        match self.inner.cache.get() {
            Some(snapshot) if snapshot.is_healthy() => HealthStatus::Healthy,
            Some(_) => HealthStatus::Unhealthy,
            None => HealthStatus::Unknown,
        }
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn has_data(&self) -> bool {
        self.inner.cache.has_data()
    }

    pub fn last_updated(&self) -> Option<DateTime<Utc>> {
        self.inner.cache.get().map(|snapshot| snapshot.updated_at)
    }

    /// Number of completed runs.
    pub fn runs(&self) -> u64 {
        self.inner.cache.get().map_or(0, |snapshot| snapshot.run)
    }

    /// Whether the background task has exited (cancelled or panicked).
    pub fn is_finished(&self) -> bool {
        self.inner.task.is_finished()
    }

    /// Turn the handle into a plain function for registries that store checks
    /// as closures.
    pub fn into_fn(self) -> impl Fn() -> Result<(), CheckError> + Clone + Send + Sync + 'static {
        move || self.check()
    }
}

impl fmt::Debug for AsyncCheck {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AsyncCheck")
            .field("name", &self.inner.name)
            .field("status", &self.status())
            .field("runs", &self.runs())
            .finish()
    }
}

pub struct AsyncCheckBuilder {
    probe: Arc<dyn Probe>,
    name: String,
    interval: Duration,
    cancel: Option<CancellationToken>,
    metrics: Option<Arc<CheckMetrics>>,
    runtime: Option<Handle>,
}

impl AsyncCheckBuilder {
    fn new(probe: Arc<dyn Probe>) -> Self {
        Self {
            probe,
            name: DEFAULT_CHECK_NAME.to_string(),
            interval: Duration::from_millis(DEFAULT_INTERVAL_MS),
            cancel: None,
            metrics: None,
            runtime: None,
        }
    }

    /// Take name and interval from a loaded configuration.
    pub fn with_config(self, config: &AsyncCheckConfig) -> Self {
        self.name(config.name.clone()).interval(config.interval())
    }

    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Pause between the end of one run and the start of the next.
    pub fn interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn cancel_on(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }

    pub fn metrics(mut self, metrics: Arc<CheckMetrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Spawn the scheduler on this runtime instead of the current one.
    pub fn runtime(mut self, handle: Handle) -> Self {
        self.runtime = Some(handle);
        self
    }

    pub fn spawn(mut self) -> Result<AsyncCheck, ConfigError> {
        let handle = match self.runtime.take() {
            Some(handle) => handle,
            None => Handle::try_current().map_err(|_| ConfigError::NoRuntime)?,
        };
        Ok(self.spawn_on(handle))
    }

    fn spawn_on(self, handle: Handle) -> AsyncCheck {
        let name: Arc<str> = Arc::from(self.name);
        let cache = Arc::new(ResultCache::new());

        let scheduler = Scheduler {
            name: name.clone(),
            probe: self.probe,
            cache: cache.clone(),
            interval: self.interval,
            cancel: self.cancel,
            metrics: self.metrics,
        };
        let task = handle.spawn(scheduler.run());

        AsyncCheck {
            inner: Arc::new(Inner { name, cache, task }),
        }
    }
}
