// src/health/probe.rs

use super::error::{BoxError, CheckError};
use async_trait::async_trait;
use std::future::Future;
use std::panic;
use std::sync::{Arc, Mutex, PoisonError};

/// Something the scheduler can run once per interval.
#[async_trait]
pub trait Probe: Send + Sync + 'static {
    async fn probe(&self) -> Result<(), CheckError>;
}

/// Wrap a blocking check so it runs on tokio's blocking pool.
pub fn blocking<F, E>(check: F) -> BlockingProbe<F>
where
    F: FnMut() -> Result<(), E> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    BlockingProbe {
        check: Arc::new(Mutex::new(check)),
    }
}

/// Wrap an async check so it is awaited on the scheduler task.
pub fn from_async<F, Fut, E>(check: F) -> AsyncFnProbe<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    AsyncFnProbe { check }
}

pub struct BlockingProbe<F> {
    // Runs are sequential, so the lock is never contended.
    check: Arc<Mutex<F>>,
}

#[async_trait]
impl<F, E> Probe for BlockingProbe<F>
where
    F: FnMut() -> Result<(), E> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    async fn probe(&self) -> Result<(), CheckError> {
        let check = self.check.clone();
        let task = tokio::task::spawn_blocking(move || {
            let mut check = check.lock().unwrap_or_else(PoisonError::into_inner);
            (*check)().map_err(CheckError::new)
        });

        match task.await {
            Ok(outcome) => outcome,
            Err(err) if err.is_panic() => panic::resume_unwind(err.into_panic()),
            Err(err) => Err(CheckError::new(err)),
        }
    }
}

pub struct AsyncFnProbe<F> {
    check: F,
}

#[async_trait]
impl<F, Fut, E> Probe for AsyncFnProbe<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>> + Send + 'static,
    E: Into<BoxError> + 'static,
{
    async fn probe(&self) -> Result<(), CheckError> {
        (self.check)().await.map_err(CheckError::new)
    }
}
