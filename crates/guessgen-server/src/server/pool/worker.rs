use super::request::WorkRequest;
use crate::server::generation::processor::handle_chunk_request;
use tokio::sync::mpsc;

/// Worker task responsible for processing [`WorkRequest`] messages.
///
/// The worker listens on an MPSC channel and handles one request at a time
/// until a shutdown signal is received or every sender is dropped.
///
/// # Request Types
///
/// - [`WorkRequest::Generate`]: Runs a chunk via [`handle_chunk_request`].
/// - [`WorkRequest::Shutdown`]: Signals the worker to stop and acknowledge
///   shutdown.
pub async fn worker_loop(worker_id: usize, mut rx: mpsc::Receiver<WorkRequest>) {
    tracing::trace!("Worker {worker_id} started");

    while let Some(work) = rx.recv().await {
        match work {
            WorkRequest::Generate { task, response } => {
                handle_chunk_request(worker_id, task, response).await;
            }
            WorkRequest::Shutdown { response } => {
                tracing::debug!("Worker {worker_id} received shutdown signal");

                if response.send(()).is_err() {
                    tracing::error!("Worker {worker_id} failed to acknowledge shutdown");
                }
                break;
            }
        }
    }

    tracing::trace!("Worker {worker_id} stopped");
}
