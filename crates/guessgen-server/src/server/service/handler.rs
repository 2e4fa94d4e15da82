//! Job service wiring and request-level operations.
//!
//! This module defines [`JobService`], which owns every long-lived component
//! of the server and exposes the operations the HTTP and WebSocket handlers
//! need.
//!
//! ## Responsibilities
//!
//! - Spawn the chunk worker pool, the job executor and the progress relay.
//! - Validate submissions, register jobs and hand them to the executor.
//! - Answer status, result and subscription requests.
//! - Periodically expire finished jobs, results and idle subscriber rooms.
//! - Shut everything down in dependency order.

use crate::server::{
    config::ServerConfig,
    error::{Error, Result},
    jobs::{
        executor::{ExecutorSettings, JobExecutor, QueuedJob},
        orchestrator::{JobOrchestrator, OrchestratorSettings},
        publisher::ProgressPublisher,
        registry::{Job, JobRegistry},
    },
    pool::manager::WorkerPool,
    relay::{
        bus::MemoryBus,
        hub::SubscriberHub,
        listener::{ProgressRelay, Subscription},
        store::{MemoryResultStore, ResultStore},
    },
    telemetry::increment_jobs_submitted,
};
use guessgen_core::{CandidatePool, GenerationRequest, JobId, JobResult, JobStatus, ProgressEvent};
use parking_lot::Mutex;
use std::sync::Arc;
use tokio::{task::JoinHandle, time::MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// What one expiry sweep removed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub jobs: usize,
    pub results: usize,
    pub rooms: usize,
}

/// The running job service.
///
/// Shared between handlers behind an [`Arc`].
pub struct JobService {
    config: ServerConfig,
    worker_pool: Arc<WorkerPool>,
    registry: Arc<JobRegistry>,
    store: Arc<MemoryResultStore>,
    hub: Arc<SubscriberHub>,
    relay: ProgressRelay,
    executor: JobExecutor,
    shutdown_token: CancellationToken,
    sweeper: Mutex<Option<JoinHandle<()>>>,
}

impl JobService {
    /// Builds the service and starts its background tasks.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(config: ServerConfig) -> Arc<Self> {
        let worker_pool = Arc::new(WorkerPool::spawn(
            config.num_workers,
            config.work_request_buffer_size,
        ));

        let bus = Arc::new(MemoryBus::new(config.bus_buffer_size));
        let store = Arc::new(MemoryResultStore::new());
        let hub = Arc::new(SubscriberHub::new(config.subscriber_buffer_size));
        let registry = Arc::new(JobRegistry::new(config.result_ttl));

        // Subscribe the relay before any job can publish.
        let relay = ProgressRelay::new(bus.clone(), store.clone(), hub.clone());
        relay.start();

        let publisher = ProgressPublisher::new(bus, registry.clone());
        let orchestrator = JobOrchestrator::new(
            worker_pool.clone(),
            publisher,
            store.clone(),
            OrchestratorSettings {
                large_batch_threshold: config.large_batch_threshold,
                max_blocks: config.max_blocks,
                max_chunks: worker_pool.num_workers(),
                result_ttl: config.result_ttl,
                seed: config.seed,
            },
        );

        let executor = JobExecutor::spawn(
            Arc::new(orchestrator),
            ExecutorSettings {
                concurrency: config.job_concurrency,
                queue_size: config.job_queue_size,
                job_timeout: config.job_timeout,
                shutdown_timeout: config.shutdown_timeout,
            },
        );

        let service = Arc::new(Self {
            config,
            worker_pool,
            registry,
            store,
            hub,
            relay,
            executor,
            shutdown_token: CancellationToken::new(),
            sweeper: Mutex::new(None),
        });

        let sweeper = tokio::spawn(sweep_loop(Arc::downgrade(&service)));
        *service.sweeper.lock() = Some(sweeper);
        service
    }

    /// Validates a submission and queues the job.
    ///
    /// # Errors
    ///
    /// - [`Error::Generation`] for a non-positive count.
    /// - [`Error::ServiceOverloaded`] / [`Error::ServiceShutdown`] when the
    ///   executor refuses the job.
    pub fn submit<S: AsRef<str>>(&self, combinations: &[S], count: i64) -> Result<JobId> {
        if self.executor.is_shutting_down() {
            return Err(Error::ServiceShutdown);
        }

        let pool = CandidatePool::from_combinations(combinations);
        let request = GenerationRequest::new(pool, count, self.config.max_guesses)?;
        if let Some(asked) = request.clamped_from {
            tracing::warn!(
                "Requested {asked} guesses, clamped to {}",
                request.requested
            );
        }

        let id = JobId::new();
        let requested = request.requested;
        let candidates = request.pool.len();
        self.registry.insert(id, requested);

        if let Err(e) = self.executor.submit(QueuedJob { id, request }) {
            self.registry.remove(id);
            tracing::warn!("Rejected job {id}: {e}");
            return Err(e);
        }

        increment_jobs_submitted();
        tracing::info!(job_id = %id, requested, candidates, "Job queued");
        Ok(id)
    }

    /// Current snapshot of a job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JobNotFound`] for unknown or purged jobs.
    pub fn job(&self, id: JobId) -> Result<Job> {
        self.registry
            .get(id)
            .ok_or(Error::JobNotFound { job_id: id })
    }

    /// The stored result of a completed job.
    ///
    /// # Errors
    ///
    /// Returns [`Error::JobNotFound`] if no live result exists.
    pub fn result(&self, id: JobId) -> Result<JobResult> {
        self.store
            .get(id)
            .ok_or(Error::JobNotFound { job_id: id })
    }

    /// Subscribes to a job's progress.
    ///
    /// A job that already failed is answered with its failed event instead of
    /// a live stream that would never produce anything.
    pub fn subscribe(&self, id: JobId) -> Subscription {
        match self.relay.subscribe(id) {
            Subscription::Live(receiver) => match self.registry.get(id) {
                Some(job) if job.status == JobStatus::Failed => Subscription::Replayed(
                    ProgressEvent::failed(id, job.error.unwrap_or_default()),
                ),
                _ => Subscription::Live(receiver),
            },
            replayed => replayed,
        }
    }

    /// Drops expired jobs and results, and rooms nobody listens to.
    pub fn sweep(&self) -> SweepReport {
        let report = SweepReport {
            jobs: self.registry.purge_expired(),
            results: self.store.purge_expired(),
            rooms: self.hub.prune_idle(),
        };
        if report != SweepReport::default() {
            tracing::debug!(?report, "Expiry sweep");
        }
        report
    }

    /// Whether new jobs are still accepted.
    pub fn is_accepting(&self) -> bool {
        !self.executor.is_shutting_down() && self.relay.is_running()
    }

    /// Gracefully shuts the service down.
    ///
    /// - Stops the sweeper.
    /// - Shuts the executor down, failing queued jobs and giving running ones
    ///   `SHUTDOWN_TIMEOUT` to finish.
    /// - Stops the relay, then the worker pool.
    pub async fn shutdown(&self) {
        tracing::info!(
            "Shutting down with {} jobs running",
            self.executor.inflight()
        );
        self.shutdown_token.cancel();
        let sweeper = self.sweeper.lock().take();
        if let Some(sweeper) = sweeper {
            if let Err(e) = sweeper.await {
                tracing::error!("Sweeper task failed: {e}");
            }
        }

        self.executor.shutdown().await;
        self.relay.stop().await;
        self.worker_pool.shutdown().await;
    }
}

async fn sweep_loop(service: std::sync::Weak<JobService>) {
    let (period, token) = match service.upgrade() {
        Some(service) => (
            service.config.sweep_interval,
            service.shutdown_token.clone(),
        ),
        None => return,
    };

    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    // The first tick completes immediately.
    ticker.tick().await;

    loop {
        tokio::select! {
            () = token.cancelled() => break,
            _ = ticker.tick() => match service.upgrade() {
                Some(service) => {
                    service.sweep();
                }
                None => break,
            },
        }
    }
}
