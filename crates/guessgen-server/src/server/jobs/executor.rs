//! Bounded, concurrency-limited execution of queued jobs.
//!
//! Submissions go into a bounded queue and are rejected immediately when it
//! is full. A single dispatch loop pulls jobs off the queue whenever one of
//! `concurrency` slots is free and runs each on its own task under a time
//! limit. Panics in a job are caught and reported as failures.
//!
//! On shutdown the queue is closed, jobs that were never picked up are failed
//! with [`Error::ServiceShutdown`], and running jobs get `shutdown_timeout` to
//! finish.

use super::lifecycle::JobLifecycle;
use crate::server::{
    error::{Error, Result},
    telemetry::{
        decrement_jobs_inflight, increment_guesses_generated, increment_jobs_completed,
        increment_jobs_failed, increment_jobs_inflight, record_job_duration,
    },
};
use core::{any::Any, panic::AssertUnwindSafe, time::Duration};
use futures::FutureExt;
use guessgen_core::{GenerationRequest, JobId};
use parking_lot::Mutex;
use std::{sync::Arc, time::Instant};
use tokio::{
    sync::{
        Semaphore,
        mpsc::{self, error::TrySendError},
    },
    task::JoinHandle,
    time::timeout,
};
use tokio_util::{sync::CancellationToken, task::TaskTracker};
use tracing::Instrument;

/// A job waiting for an execution slot.
#[derive(Debug)]
pub struct QueuedJob {
    pub id: JobId,
    pub request: GenerationRequest,
}

#[derive(Clone, Debug)]
pub struct ExecutorSettings {
    /// Jobs allowed to run at once.
    pub concurrency: usize,
    /// Jobs allowed to wait for a slot.
    pub queue_size: usize,
    pub job_timeout: Duration,
    /// How long [`JobExecutor::shutdown`] waits for running jobs.
    pub shutdown_timeout: Duration,
}

pub struct JobExecutor {
    queue: mpsc::Sender<QueuedJob>,
    shutdown_token: CancellationToken,
    tracker: TaskTracker,
    dispatcher: Mutex<Option<JoinHandle<()>>>,
    shutdown_timeout: Duration,
}

impl JobExecutor {
    /// Spawns the dispatch loop driving `lifecycle`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<L: JobLifecycle>(lifecycle: Arc<L>, settings: ExecutorSettings) -> Self {
        let (queue, rx) = mpsc::channel(settings.queue_size.max(1));
        let shutdown_token = CancellationToken::new();
        let tracker = TaskTracker::new();

        let dispatcher = tokio::spawn(dispatch_loop(
            lifecycle,
            rx,
            shutdown_token.clone(),
            tracker.clone(),
            settings.clone(),
        ));

        tracing::debug!(
            "Job executor running {} slots, queue of {}",
            settings.concurrency,
            settings.queue_size
        );

        Self {
            queue,
            shutdown_token,
            tracker,
            dispatcher: Mutex::new(Some(dispatcher)),
            shutdown_timeout: settings.shutdown_timeout,
        }
    }

    /// Enqueues `job` without waiting.
    ///
    /// # Errors
    ///
    /// - [`Error::ServiceOverloaded`] if the queue is full.
    /// - [`Error::ServiceShutdown`] once shutdown has begun.
    pub fn submit(&self, job: QueuedJob) -> Result<()> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        self.queue.try_send(job).map_err(|e| match e {
            TrySendError::Full(_) => Error::ServiceOverloaded,
            TrySendError::Closed(_) => Error::ServiceShutdown,
        })
    }

    /// Jobs currently holding a slot.
    pub fn inflight(&self) -> usize {
        self.tracker.len()
    }

    pub fn is_shutting_down(&self) -> bool {
        self.shutdown_token.is_cancelled()
    }

    /// Stops accepting jobs, fails the queued ones and waits up to
    /// `shutdown_timeout` for running jobs.
    pub async fn shutdown(&self) {
        tracing::debug!("Refusing new jobs");
        self.shutdown_token.cancel();

        let dispatcher = self.dispatcher.lock().take();
        if let Some(dispatcher) = dispatcher {
            if let Err(e) = dispatcher.await {
                tracing::error!("Job dispatch loop failed: {e}");
            }
        }

        self.tracker.close();
        if timeout(self.shutdown_timeout, self.tracker.wait())
            .await
            .is_err()
        {
            tracing::warn!(
                "{} jobs still running after {:?}, abandoning them",
                self.tracker.len(),
                self.shutdown_timeout
            );
        }

        tracing::info!("Job executor shutdown complete");
    }
}

async fn dispatch_loop<L: JobLifecycle>(
    lifecycle: Arc<L>,
    mut rx: mpsc::Receiver<QueuedJob>,
    shutdown_token: CancellationToken,
    tracker: TaskTracker,
    settings: ExecutorSettings,
) {
    let slots = Arc::new(Semaphore::new(settings.concurrency.max(1)));

    loop {
        // Wait for a slot before taking a job so the rest stay queued and
        // the queue bound applies.
        let permit = tokio::select! {
            () = shutdown_token.cancelled() => break,
            permit = Arc::clone(&slots).acquire_owned() => match permit {
                Ok(permit) => permit,
                Err(_) => break,
            },
        };

        let job = tokio::select! {
            () = shutdown_token.cancelled() => break,
            job = rx.recv() => match job {
                Some(job) => job,
                None => break,
            },
        };

        let span = tracing::info_span!("job", job_id = %job.id);
        let lifecycle = Arc::clone(&lifecycle);
        let limit = settings.job_timeout;
        tracker.spawn(
            async move {
                let _permit = permit;
                run_job(lifecycle.as_ref(), job, limit).await;
            }
            .instrument(span),
        );
    }

    rx.close();
    let mut dropped = 0;
    while let Ok(job) = rx.try_recv() {
        lifecycle.on_failure(job.id, &Error::ServiceShutdown);
        increment_jobs_failed();
        dropped += 1;
    }
    if dropped > 0 {
        tracing::warn!("Failed {dropped} queued jobs at shutdown");
    }
}

async fn run_job<L: JobLifecycle>(lifecycle: &L, job: QueuedJob, limit: Duration) {
    let QueuedJob { id, request } = job;
    let requested = request.requested;
    let start = Instant::now();
    increment_jobs_inflight();
    tracing::info!(requested, "Job started");

    let run = AssertUnwindSafe(lifecycle.run(id, request)).catch_unwind();
    let outcome = match timeout(limit, run).await {
        Ok(Ok(outcome)) => outcome,
        Ok(Err(panic)) => Err(Error::JobPanicked {
            reason: panic_message(panic.as_ref()),
        }),
        Err(_) => Err(Error::JobTimedOut {
            limit_secs: limit.as_secs(),
        }),
    };

    let outcome = outcome.and_then(|result| {
        let generated = result.total;
        lifecycle
            .on_success(id, requested, result)
            .map(|()| generated)
    });

    match outcome {
        Ok(generated) => {
            tracing::info!(generated, "Job completed");
            increment_jobs_completed();
            increment_guesses_generated(generated as u64);
        }
        Err(e) => {
            tracing::error!("Job failed: {e}");
            increment_jobs_failed();
            lifecycle.on_failure(id, &e);
        }
    }

    decrement_jobs_inflight();
    record_job_duration(start.elapsed().as_secs_f64() * 1000.0);
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
