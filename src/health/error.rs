// src/health/error.rs

use std::error::Error as StdError;
use std::sync::Arc;

/// Boxed error accepted from check functions.
pub type BoxError = Box<dyn StdError + Send + Sync + 'static>;

/// Outcome of reading an [`AsyncCheck`](super::AsyncCheck).
///
/// The check's own error is shared rather than copied so every caller sees
/// the same value the scheduler stored.
#[derive(Debug, Clone, thiserror::Error)]
pub enum CheckError {
    /// No run of the check has completed yet.
    #[error("no data yet")]
    NoDataYet,

    /// The wrapped check reported a failure.
    #[error(transparent)]
    Check(Arc<dyn StdError + Send + Sync + 'static>),
}

impl CheckError {
    pub fn new<E>(err: E) -> Self
    where
        E: Into<BoxError>,
    {
        CheckError::Check(Arc::from(err.into()))
    }

    pub fn is_no_data(&self) -> bool {
        matches!(self, CheckError::NoDataYet)
    }

    /// The error returned by the wrapped check, if any.
    pub fn cause(&self) -> Option<&(dyn StdError + Send + Sync + 'static)> {
        match self {
            CheckError::NoDataYet => None,
            CheckError::Check(err) => Some(err.as_ref()),
        }
    }

    pub fn downcast_ref<T: StdError + 'static>(&self) -> Option<&T> {
        self.cause().and_then(|err| err.downcast_ref::<T>())
    }
}
