mod async_check;
mod cache;
mod error;
pub mod probe;
mod scheduler;

pub use async_check::{
    async_check, async_check_with_cancellation, AsyncCheck, AsyncCheckBuilder, HealthStatus,
};
pub use cache::{ResultCache, Snapshot};
pub use error::{BoxError, CheckError};
pub use probe::Probe;
