//! Asynchronous worker pool for chunked guess generation.
//!
//! This module defines the [`WorkerPool`] struct, which owns a fixed set of
//! worker tasks responsible for processing [`WorkRequest`]s. It distributes
//! work using round-robin scheduling and supports coordinated shutdown via a
//! shared [`CancellationToken`].
//!
//! Each worker listens on its own bounded [`mpsc::Receiver`] and runs one
//! chunk at a time, so the number of workers caps how many chunks generate in
//! parallel across all jobs.

use super::{
    request::{ChunkTask, WorkRequest},
    worker::worker_loop,
};
use crate::server::{
    error::{Error, Result},
    generation::coordinator::ChunkDispatch,
};
use core::time::Duration;
use guessgen_core::Guess;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::{
    sync::{mpsc, oneshot},
    time::timeout,
};
use tokio_util::sync::CancellationToken;

/// How long each worker gets to acknowledge shutdown.
const WORKER_ACK_TIMEOUT: Duration = Duration::from_secs(3);

/// A cooperative pool of asynchronous workers that process [`WorkRequest`]s.
///
/// Workers receive requests over bounded MPSC channels. Work is distributed in
/// round-robin fashion and the pool supports graceful, cancellable shutdown.
pub struct WorkerPool {
    workers: Vec<mpsc::Sender<WorkRequest>>,
    next_worker: AtomicUsize,
    shutdown_token: CancellationToken,
}

impl WorkerPool {
    /// Spawns `num_workers` worker tasks, each with a request channel of
    /// `buffer_size` slots.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn(num_workers: usize, buffer_size: usize) -> Self {
        let num_workers = num_workers.max(1);
        let mut workers = Vec::with_capacity(num_workers);

        for worker_id in 0..num_workers {
            let (tx, rx) = mpsc::channel(buffer_size.max(1));
            workers.push(tx);
            tokio::spawn(worker_loop(worker_id, rx));
        }

        tracing::debug!("Spawned {num_workers} chunk workers");

        Self {
            workers,
            next_worker: AtomicUsize::new(0),
            shutdown_token: CancellationToken::new(),
        }
    }

    pub fn num_workers(&self) -> usize {
        self.workers.len()
    }

    /// Returns the index of the next worker to receive work (round-robin).
    ///
    /// Uses a relaxed atomic increment to minimize contention.
    pub fn next_worker_index(&self) -> usize {
        self.next_worker.fetch_add(1, Ordering::Relaxed) % self.workers.len()
    }

    /// Sends a [`WorkRequest`] to the next worker in the pool.
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - The pool is shutting down (`shutdown_token` was cancelled).
    /// - The worker's channel is closed.
    pub async fn send_to_next_worker(&self, request: WorkRequest) -> Result<()> {
        if self.shutdown_token.is_cancelled() {
            return Err(Error::ServiceShutdown);
        }

        let worker_idx = self.next_worker_index();
        let worker = &self.workers[worker_idx];

        match worker.send(request).await {
            Ok(()) => Ok(()),
            Err(_) => Err(Error::ChannelError {
                context: format!("Worker {worker_idx} channel closed"),
            }),
        }
    }

    /// Gracefully shuts down all workers in the pool.
    ///
    /// - Cancels the shared [`CancellationToken`] to refuse new chunks.
    /// - Sends a [`WorkRequest::Shutdown`] to each worker. It is queued behind
    ///   any chunk already sent, so those still complete.
    /// - Waits (up to 3 seconds per worker) for shutdown acknowledgements.
    pub async fn shutdown(&self) {
        tracing::debug!("Refusing new chunks");
        self.shutdown_token.cancel();

        let mut shutdown_handles = Vec::with_capacity(self.workers.len());
        for (i, worker) in self.workers.iter().enumerate() {
            let (tx, rx) = oneshot::channel();
            if let Err(e) = worker.send(WorkRequest::Shutdown { response: tx }).await {
                tracing::error!("Failed to send shutdown to worker {i}: {e}");
            } else {
                shutdown_handles.push((i, rx));
            }
        }

        let ack_futures = shutdown_handles.into_iter().map(|(i, rx)| async move {
            match timeout(WORKER_ACK_TIMEOUT, rx).await {
                Ok(Ok(())) => tracing::trace!("Worker {i} shutdown acknowledged"),
                Ok(Err(e)) => tracing::error!("Worker {i} returned error: {e}"),
                Err(_) => tracing::warn!("Worker {i} shutdown timed out"),
            }
        });

        futures::future::join_all(ack_futures).await;

        tracing::info!("Worker pool shutdown complete");
    }
}

impl ChunkDispatch for WorkerPool {
    async fn dispatch(&self, task: ChunkTask) -> Result<Vec<Guess>> {
        let index = task.index;
        let (response, rx) = oneshot::channel();
        self.send_to_next_worker(WorkRequest::Generate { task, response })
            .await?;

        rx.await.map_err(|_| Error::ChannelError {
            context: format!("Worker dropped the response for chunk {index}"),
        })?
    }
}
