//! Time-bounded storage for completed job results.

use crate::server::error::{Error, Result};
use core::time::Duration;
use guessgen_core::{JobId, JobResult};
use parking_lot::Mutex;
use std::{collections::HashMap, time::Instant};

/// Shared cache of final results, keyed by job id.
///
/// Each key is written once. Entries stop resolving after their TTL.
pub trait ResultStore: Send + Sync {
    /// Stores `result` for `job_id` for `ttl`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ResultAlreadyStored`] if a live result exists.
    fn put(&self, job_id: JobId, result: JobResult, ttl: Duration) -> Result<()>;

    /// Returns the stored result if it has not expired.
    fn get(&self, job_id: JobId) -> Option<JobResult>;

    /// Drops expired entries and returns how many were removed.
    fn purge_expired(&self) -> usize;
}

struct StoredResult {
    result: JobResult,
    expires_at: Instant,
}

impl StoredResult {
    fn is_live(&self, now: Instant) -> bool {
        now < self.expires_at
    }
}

#[derive(Default)]
pub struct MemoryResultStore {
    entries: Mutex<HashMap<JobId, StoredResult>>,
}

impl MemoryResultStore {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries.lock().len()
    }

    #[cfg(test)]
    fn put_expiring_at(&self, job_id: JobId, result: JobResult, expires_at: Instant) {
        self.entries
            .lock()
            .insert(job_id, StoredResult { result, expires_at });
    }
}

impl ResultStore for MemoryResultStore {
    fn put(&self, job_id: JobId, result: JobResult, ttl: Duration) -> Result<()> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        if entries.get(&job_id).is_some_and(|e| e.is_live(now)) {
            return Err(Error::ResultAlreadyStored { job_id });
        }

        entries.insert(
            job_id,
            StoredResult {
                result,
                expires_at: now + ttl,
            },
        );
        Ok(())
    }

    fn get(&self, job_id: JobId) -> Option<JobResult> {
        let now = Instant::now();
        let mut entries = self.entries.lock();

        match entries.get(&job_id) {
            Some(entry) if entry.is_live(now) => Some(entry.result.clone()),
            Some(_) => {
                entries.remove(&job_id);
                None
            }
            None => None,
        }
    }

    fn purge_expired(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.lock();
        let before = entries.len();
        entries.retain(|_, entry| entry.is_live(now));
        before - entries.len()
    }
}
