//! Runs one generation job from pickup to its terminal event.
//!
//! ```text
//! queued ─► started ─► processing ─► completed
//!    │         │           │  ▲
//!    │         │           └──┘ (one update per block)
//!    └─────────┴───────────┴──► failed
//! ```
//!
//! | step                         | progress              |
//! |------------------------------|-----------------------|
//! | picked up                    | 0                     |
//! | pool extracted and padded    | 10                    |
//! | each block of a large job    | 10 → 95, linear       |
//! | single pass (small job)      | 90                    |
//! | completed / failed           | 100                   |
//!
//! The result is persisted only when the job completes.

use super::{lifecycle::JobLifecycle, publisher::ProgressPublisher};
use crate::server::{
    error::{Error, Result},
    generation::{
        coordinator::{ChunkDispatch, distribute},
        processor::run_chunk,
    },
    pool::request::ChunkTask,
    relay::store::ResultStore,
};
use core::time::Duration;
use guessgen_core::{
    GUESS_SIZE, GenerationRequest, Guess, JobId, JobResult, ProgressEvent, chunk_seed,
    combination::binomial,
};
use rand::{Rng, SeedableRng, rngs::StdRng};
use std::{collections::HashSet, sync::Arc};

/// Progress once the candidate pool is ready.
pub const POOL_READY_PROGRESS: u8 = 10;
/// Progress after a small job's single pass.
pub const SINGLE_PASS_PROGRESS: u8 = 90;
/// Ceiling for block progress; 100 is reserved for the terminal event.
pub const BLOCKS_DONE_PROGRESS: u8 = 95;

/// Rough number of guesses per block of a large job.
const GUESSES_PER_BLOCK: usize = 100;

/// Distributions the last block may run to make up guesses lost to
/// duplicates across chunks and blocks.
const MAX_FILL_ROUNDS: usize = 16;

#[derive(Clone, Debug)]
pub struct OrchestratorSettings {
    /// Jobs requesting more than this are split into blocks.
    pub large_batch_threshold: usize,
    pub max_blocks: usize,
    /// Chunks per distribution, usually the worker count.
    pub max_chunks: usize,
    pub result_ttl: Duration,
    /// Fixed base seed; a fresh random seed per job when `None`.
    pub seed: Option<u64>,
}

/// Number of blocks a large job of `total` guesses is split into; always at
/// least one.
pub fn block_count(total: usize, max_blocks: usize) -> usize {
    (total / GUESSES_PER_BLOCK).clamp(1, max_blocks.max(1))
}

/// Progress after `done` of `blocks` blocks.
pub fn block_progress(done: usize, blocks: usize) -> u8 {
    let span = usize::from(BLOCKS_DONE_PROGRESS - POOL_READY_PROGRESS);
    let progress = usize::from(POOL_READY_PROGRESS) + span * done / blocks.max(1);
    progress.min(usize::from(BLOCKS_DONE_PROGRESS)) as u8
}

/// The [`JobLifecycle`] implementation for guess generation.
pub struct JobOrchestrator<D> {
    dispatcher: Arc<D>,
    publisher: ProgressPublisher,
    store: Arc<dyn ResultStore>,
    settings: OrchestratorSettings,
}

impl<D> JobOrchestrator<D>
where
    D: ChunkDispatch + 'static,
{
    pub fn new(
        dispatcher: Arc<D>,
        publisher: ProgressPublisher,
        store: Arc<dyn ResultStore>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            dispatcher,
            publisher,
            store,
            settings,
        }
    }

    /// Runs a large job block by block. Every block but the last asks for
    /// `requested / blocks` guesses; the last asks for whatever is still
    /// missing and repeats, up to [`MAX_FILL_ROUNDS`] distributions, until
    /// the count is met or the pool has no combinations left.
    async fn generate_in_blocks(
        &self,
        job_id: JobId,
        values: Arc<[u8]>,
        requested: usize,
        base_seed: u64,
    ) -> Result<Vec<Guess>> {
        let max_chunks = self.settings.max_chunks.max(1);
        let blocks = block_count(requested, self.settings.max_blocks);
        let per_block = requested / blocks;
        let available = binomial(values.len(), GUESS_SIZE)
            .and_then(|c| usize::try_from(c).ok())
            .unwrap_or(usize::MAX);
        let target = requested.min(available);
        tracing::debug!("Splitting {requested} guesses into {blocks} blocks");

        let mut seen = HashSet::with_capacity(target);
        let mut merged = Vec::with_capacity(target);
        let mut dispatches = 0;

        for block in 0..blocks {
            let last = block + 1 == blocks;
            let rounds = if last { MAX_FILL_ROUNDS } else { 1 };
            for _ in 0..rounds {
                let missing = target - merged.len();
                let size = if last { missing } else { per_block.min(missing) };
                if size == 0 {
                    break;
                }

                // Offset by whole distributions so no two chunks of the job
                // share a seed.
                let seed = chunk_seed(base_seed, dispatches * max_chunks);
                dispatches += 1;
                let guesses = distribute(
                    self.dispatcher.as_ref(),
                    Arc::clone(&values),
                    size,
                    max_chunks,
                    seed,
                )
                .await?;
                merged.extend(guesses.into_iter().filter(|g| seen.insert(*g)));
            }

            let done = block + 1;
            self.publisher.publish(
                ProgressEvent::processing(job_id, block_progress(done, blocks))
                    .with_counts(merged.len(), requested)
                    .with_message(format!("Block {done}/{blocks} done")),
            );
        }

        if dispatches > blocks {
            tracing::debug!(
                "Last block ran {} extra distributions to fill the count",
                dispatches - blocks
            );
        }
        Ok(merged)
    }
}

impl<D> JobLifecycle for JobOrchestrator<D>
where
    D: ChunkDispatch + 'static,
{
    async fn run(&self, job_id: JobId, request: GenerationRequest) -> Result<JobResult> {
        let GenerationRequest {
            pool, requested, ..
        } = request;

        self.publisher
            .publish(ProgressEvent::started(job_id, requested));

        let seed = self.settings.seed.unwrap_or_else(rand::random);
        let mut rng = StdRng::seed_from_u64(seed);

        let unique = pool.len();
        let pool = pool.padded(&mut rng);
        let values: Arc<[u8]> = pool.values().into();
        let base_seed: u64 = rng.random();

        tracing::info!(requested, unique, seed, "Generating guesses");
        self.publisher.publish(
            ProgressEvent::processing(job_id, POOL_READY_PROGRESS)
                .with_message(format!("Found {unique} unique candidates")),
        );

        let mut guesses = if requested > self.settings.large_batch_threshold {
            self.generate_in_blocks(job_id, values, requested, base_seed)
                .await?
        } else {
            let guesses = run_chunk(ChunkTask {
                index: 0,
                values,
                count: requested,
                seed: base_seed,
            })
            .await?;
            self.publisher.publish(
                ProgressEvent::processing(job_id, SINGLE_PASS_PROGRESS)
                    .with_counts(guesses.len(), requested),
            );
            guesses
        };

        guesses.truncate(requested);
        if guesses.len() < requested {
            tracing::warn!(
                "Only {} of {requested} unique guesses available from {} candidates",
                guesses.len(),
                pool.len()
            );
        }

        Ok(JobResult::new(guesses))
    }

    fn on_success(&self, job_id: JobId, requested: usize, result: JobResult) -> Result<()> {
        let generated = result.total;
        self.store.put(job_id, result, self.settings.result_ttl)?;
        self.publisher
            .publish(ProgressEvent::completed(job_id, generated, requested));
        Ok(())
    }

    fn on_failure(&self, job_id: JobId, error: &Error) {
        self.publisher
            .publish(ProgressEvent::failed(job_id, error.to_string()));
    }
}

#[cfg(test)]
mod tests;
