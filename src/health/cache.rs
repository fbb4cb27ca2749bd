// src/health/cache.rs

use super::error::CheckError;
use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use std::sync::Arc;

/// One completed run of a check.
#[derive(Debug)]
pub struct Snapshot {
    pub outcome: Result<(), CheckError>,
    pub updated_at: DateTime<Utc>,
    /// 1-based sequence number of the run that produced this outcome.
    pub run: u64,
}

impl Snapshot {
    pub fn is_healthy(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Latest outcome of a check plus whether there is one at all.
///
/// Presence and value live behind a single pointer, so a reader sees either
/// nothing or a complete snapshot. Reads never take a lock.
///
/// Only the scheduler that owns the cache can write to it:
///
/// ```compile_fail
/// let cache = healthcheck::health::ResultCache::new();
/// cache.set(Ok(()));
/// ```
#[derive(Debug, Default)]
pub struct ResultCache {
    latest: ArcSwapOption<Snapshot>,
}

impl ResultCache {
    pub fn new() -> Self {
        Self {
            latest: ArcSwapOption::empty(),
        }
    }

    pub fn get(&self) -> Option<Arc<Snapshot>> {
        self.latest.load_full()
    }

    pub fn has_data(&self) -> bool {
        self.latest.load().is_some()
    }

    /// Store the outcome of a finished run and return the new snapshot.
    ///
    /// Only the owning scheduler writes, so the run counter is derived from
    /// the previous snapshot without a compare-and-swap.
    pub(crate) fn set(&self, outcome: Result<(), CheckError>) -> Arc<Snapshot> {
        let run = match &*self.latest.load() {
            Some(prev) => prev.run + 1,
            None => 1,
        };
        let snapshot = Arc::new(Snapshot {
            outcome,
            updated_at: Utc::now(),
            run,
        });

        self.latest.store(Some(snapshot.clone()));
        snapshot
    }
}
