use crate::server::error::Result;
use guessgen_core::Guess;
use std::sync::Arc;
use tokio::sync::oneshot;

/// One slice of a distribution, ready to run on a worker.
#[derive(Clone, Debug)]
pub struct ChunkTask {
    /// Position of the chunk within its distribution, for logs.
    pub index: usize,
    /// Padded pool values, shared by every chunk of the distribution.
    pub values: Arc<[u8]>,
    pub count: usize,
    pub seed: u64,
}

/// Messages understood by a worker task.
#[derive(Debug)]
pub enum WorkRequest {
    /// Generate a chunk and reply with its guesses or the reason it failed.
    Generate {
        task: ChunkTask,
        response: oneshot::Sender<Result<Vec<Guess>>>,
    },
    /// Stop the worker after acknowledging.
    Shutdown { response: oneshot::Sender<()> },
}
