//! In-memory record of every job the service knows about.

use core::time::Duration;
use guessgen_core::{JobId, JobStatus, ProgressEvent};
use parking_lot::Mutex;
use serde::Serialize;
use std::{collections::HashMap, time::Instant};

/// Snapshot of one job's lifecycle.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct Job {
    pub id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    pub requested: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub generated: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip)]
    finished_at: Option<Instant>,
}

impl Job {
    fn queued(id: JobId, requested: usize) -> Self {
        Self {
            id,
            status: JobStatus::Queued,
            progress: 0,
            requested,
            generated: None,
            message: None,
            error: None,
            finished_at: None,
        }
    }

    /// Folds `event` into the snapshot. Returns `false`, leaving the job
    /// untouched, if the state machine does not allow the transition.
    fn apply(&mut self, event: &ProgressEvent) -> bool {
        if !self.status.can_transition_to(event.status) {
            return false;
        }

        self.status = event.status;
        self.progress = self.progress.max(event.progress);
        if event.message.is_some() {
            self.message.clone_from(&event.message);
        }

        match event.status {
            JobStatus::Completed => {
                self.generated = event.current;
                self.finished_at = Some(Instant::now());
            }
            JobStatus::Failed => {
                self.error.clone_from(&event.error);
                self.finished_at = Some(Instant::now());
            }
            _ => {}
        }
        true
    }
}

/// Jobs by id. Terminal jobs are kept for `retention` and then purged.
pub struct JobRegistry {
    jobs: Mutex<HashMap<JobId, Job>>,
    retention: Duration,
}

impl JobRegistry {
    pub fn new(retention: Duration) -> Self {
        Self {
            jobs: Mutex::new(HashMap::new()),
            retention,
        }
    }

    /// Records a new job in the `queued` state.
    pub fn insert(&self, id: JobId, requested: usize) -> Job {
        let job = Job::queued(id, requested);
        self.jobs.lock().insert(id, job.clone());
        job
    }

    pub fn remove(&self, id: JobId) -> Option<Job> {
        self.jobs.lock().remove(&id)
    }

    pub fn get(&self, id: JobId) -> Option<Job> {
        self.jobs.lock().get(&id).cloned()
    }

    /// Applies a lifecycle event. Returns `false` for unknown jobs and
    /// rejected transitions.
    pub fn apply(&self, event: &ProgressEvent) -> bool {
        self.jobs
            .lock()
            .get_mut(&event.job_id)
            .is_some_and(|job| job.apply(event))
    }

    /// Drops terminal jobs whose retention has elapsed.
    pub fn purge_expired(&self) -> usize {
        let mut jobs = self.jobs.lock();
        let before = jobs.len();
        jobs.retain(|_, job| {
            job.finished_at
                .is_none_or(|finished| finished.elapsed() < self.retention)
        });
        before - jobs.len()
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.jobs.lock().len()
    }
}
