pub mod config;
pub mod health;
pub mod metrics;

pub use health::{async_check, async_check_with_cancellation, AsyncCheck, CheckError};
