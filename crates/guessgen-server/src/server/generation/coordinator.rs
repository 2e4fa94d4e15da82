use crate::server::{
    error::{Error, Result},
    pool::request::ChunkTask,
    telemetry::increment_chunk_failures,
};
use futures::stream::{FuturesUnordered, StreamExt};
use guessgen_core::{Guess, chunk_seed};
use std::{collections::HashSet, future::Future, sync::Arc};

/// Something that can run a [`ChunkTask`] to completion.
///
/// Implemented by the worker pool; tests substitute their own.
pub trait ChunkDispatch: Send + Sync {
    fn dispatch(&self, task: ChunkTask) -> impl Future<Output = Result<Vec<Guess>>> + Send;
}

/// Splits `total` into `parts` counts that differ by at most one, larger
/// counts first.
pub fn split_evenly(total: usize, parts: usize) -> Vec<usize> {
    if parts == 0 {
        return Vec::new();
    }
    let base = total / parts;
    let remainder = total % parts;
    (0..parts)
        .map(|i| base + usize::from(i < remainder))
        .collect()
}

/// Generates up to `total` unique guesses by fanning chunks out across
/// `dispatcher`.
///
/// The count is split evenly over `min(max_chunks, total)` chunks. Chunk `i`
/// is seeded with `base_seed + i`. All chunks are in flight at once and are
/// merged in completion order, so the caller must not rely on the order of
/// the result.
///
/// Duplicates across chunks are removed and the merged result is truncated
/// to `total`. A shortfall is returned as-is; chunks are never re-run.
///
/// A failed chunk is logged and excluded.
///
/// # Errors
///
/// Returns [`Error::AllChunksFailed`] when no chunk succeeds.
pub async fn distribute<D>(
    dispatcher: &D,
    values: Arc<[u8]>,
    total: usize,
    max_chunks: usize,
    base_seed: u64,
) -> Result<Vec<Guess>>
where
    D: ChunkDispatch,
{
    if total == 0 {
        return Ok(Vec::new());
    }

    let counts = split_evenly(total, max_chunks.max(1).min(total));
    let chunks = counts.len();

    let mut pending: FuturesUnordered<_> = counts
        .into_iter()
        .enumerate()
        .map(|(index, count)| {
            let task = ChunkTask {
                index,
                values: Arc::clone(&values),
                count,
                seed: chunk_seed(base_seed, index),
            };
            async move { (index, dispatcher.dispatch(task).await) }
        })
        .collect();

    let mut seen = HashSet::with_capacity(total);
    let mut merged = Vec::with_capacity(total);
    let mut failures = 0;
    let mut last_error = None;

    while let Some((index, outcome)) = pending.next().await {
        match outcome {
            Ok(guesses) => {
                tracing::trace!("Chunk {index} returned {} guesses", guesses.len());
                merged.extend(guesses.into_iter().filter(|g| seen.insert(*g)));
            }
            Err(e) => {
                tracing::warn!("Chunk {index} failed and is excluded: {e}");
                increment_chunk_failures();
                failures += 1;
                last_error = Some(e);
            }
        }
    }

    if failures == chunks {
        return Err(Error::AllChunksFailed {
            chunks,
            reason: last_error.map_or_else(String::new, |e| e.to_string()),
        });
    }

    if merged.len() < total {
        tracing::debug!(
            "Distribution short by {} guesses ({failures} failed chunks)",
            total - merged.len()
        );
    }

    merged.truncate(total);
    Ok(merged)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::generation::processor::run_chunk;
    use parking_lot::Mutex;

    /// Runs chunks inline and fails the ones listed in `failing`.
    #[derive(Default)]
    struct ScriptedDispatch {
        failing: Vec<usize>,
        seen: Mutex<Vec<ChunkTask>>,
    }

    impl ChunkDispatch for ScriptedDispatch {
        async fn dispatch(&self, task: ChunkTask) -> Result<Vec<Guess>> {
            self.seen.lock().push(task.clone());
            if self.failing.contains(&task.index) {
                return Err(Error::ChunkPanicked {
                    index: task.index,
                    reason: "scripted".to_string(),
                });
            }
            run_chunk(task).await
        }
    }

    fn values(range: core::ops::RangeInclusive<u8>) -> Arc<[u8]> {
        range.collect::<Vec<u8>>().into()
    }

    fn assert_unique(guesses: &[Guess]) {
        let unique: HashSet<_> = guesses.iter().collect();
        assert_eq!(unique.len(), guesses.len());
    }

    #[test]
    fn split_puts_remainder_first() {
        assert_eq!(split_evenly(10, 3), vec![4, 3, 3]);
        assert_eq!(split_evenly(3, 3), vec![1, 1, 1]);
        assert_eq!(split_evenly(7, 1), vec![7]);
        assert!(split_evenly(5, 0).is_empty());
        assert_eq!(split_evenly(10, 3).iter().sum::<usize>(), 10);
    }

    #[tokio::test]
    async fn chunks_get_even_counts_and_distinct_seeds() {
        let dispatch = ScriptedDispatch::default();
        let guesses = distribute(&dispatch, values(1..=40), 10, 4, 100).await.unwrap();
        assert_eq!(guesses.len(), 10);
        assert_unique(&guesses);

        let mut tasks = dispatch.seen.lock().clone();
        tasks.sort_by_key(|t| t.index);
        let counts: Vec<_> = tasks.iter().map(|t| t.count).collect();
        let seeds: Vec<_> = tasks.iter().map(|t| t.seed).collect();
        assert_eq!(counts, vec![3, 3, 2, 2]);
        assert_eq!(seeds, vec![100, 101, 102, 103]);
    }

    #[tokio::test]
    async fn never_uses_more_chunks_than_requested() {
        let dispatch = ScriptedDispatch::default();
        distribute(&dispatch, values(1..=20), 2, 8, 0).await.unwrap();
        assert_eq!(dispatch.seen.lock().len(), 2);
    }

    #[tokio::test]
    async fn cross_chunk_duplicates_are_removed() {
        // Seven values hold only seven guesses, so every chunk overlaps.
        let dispatch = ScriptedDispatch::default();
        let guesses = distribute(&dispatch, values(1..=7), 20, 4, 9).await.unwrap();
        assert_unique(&guesses);
        assert!(guesses.len() <= 7);
    }

    #[tokio::test]
    async fn failed_chunks_are_excluded() {
        let dispatch = ScriptedDispatch {
            failing: vec![1],
            ..Default::default()
        };
        let guesses = distribute(&dispatch, values(1..=30), 12, 3, 1).await.unwrap();
        assert_eq!(guesses.len(), 8);
        assert_unique(&guesses);
    }

    #[tokio::test]
    async fn all_failed_chunks_fail_the_distribution() {
        let dispatch = ScriptedDispatch {
            failing: vec![0, 1],
            ..Default::default()
        };
        let err = distribute(&dispatch, values(1..=30), 10, 2, 1)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::AllChunksFailed { chunks: 2, .. }));
    }

    #[tokio::test]
    async fn zero_total_dispatches_nothing() {
        let dispatch = ScriptedDispatch::default();
        assert!(distribute(&dispatch, values(1..=30), 0, 4, 1).await.unwrap().is_empty());
        assert!(dispatch.seen.lock().is_empty());
    }
}
