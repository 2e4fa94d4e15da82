use crate::server::{
    error::{Error, Result},
    pool::request::ChunkTask,
};
use guessgen_core::{Guess, generate_chunk};
use tokio::sync::oneshot;

/// Runs a single chunk within a worker and replies on `response`.
///
/// Generation is CPU-bound, so it runs on Tokio's blocking pool rather than
/// the async workers. A panic inside the chunk is caught by the blocking task
/// and reported as [`Error::ChunkPanicked`]; it never reaches sibling chunks
/// or the worker loop.
///
/// If the requester has already gone away the chunk is skipped.
pub async fn handle_chunk_request(
    worker_id: usize,
    task: ChunkTask,
    response: oneshot::Sender<Result<Vec<Guess>>>,
) {
    if response.is_closed() {
        tracing::debug!("Worker {worker_id} skipping chunk {}: requester gone", task.index);
        return;
    }

    let outcome = run_chunk(task).await;
    if let Err(e) = &outcome {
        tracing::debug!("Worker {worker_id} chunk failed: {e}");
    }

    if response.send(outcome).is_err() {
        tracing::debug!("Worker {worker_id} failed to send chunk result");
    }
}

/// Generates one chunk on the blocking pool.
pub async fn run_chunk(task: ChunkTask) -> Result<Vec<Guess>> {
    let ChunkTask {
        index,
        values,
        count,
        seed,
    } = task;

    match tokio::task::spawn_blocking(move || generate_chunk(&values, count, seed)).await {
        Ok(generated) => Ok(generated?),
        Err(join_err) => Err(Error::ChunkPanicked {
            index,
            reason: join_err.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn replies_with_chunk() {
        let (tx, rx) = oneshot::channel();
        let task = ChunkTask {
            index: 0,
            values: (1..=9).collect::<Vec<u8>>().into(),
            count: 4,
            seed: 5,
        };

        handle_chunk_request(0, task, tx).await;
        assert_eq!(rx.await.unwrap().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn same_task_same_guesses() {
        let values: Arc<[u8]> = (1..=30).collect::<Vec<u8>>().into();
        let task = ChunkTask {
            index: 3,
            values,
            count: 25,
            seed: 77,
        };

        let a = run_chunk(task.clone()).await.unwrap();
        let b = run_chunk(task).await.unwrap();
        assert_eq!(a, b);
    }

    #[tokio::test]
    async fn skips_when_requester_is_gone() {
        let (tx, rx) = oneshot::channel();
        drop(rx);
        let task = ChunkTask {
            index: 0,
            values: (1..=9).collect::<Vec<u8>>().into(),
            count: 4,
            seed: 5,
        };
        handle_chunk_request(0, task, tx).await;
    }
}
