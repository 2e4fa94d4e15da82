//! Unique guess sampling over a candidate pool.
//!
//! [`sample_guesses`] turns pool values into up to `target` pairwise-distinct
//! [`Guess`]es. The strategy depends on how many candidates there are:
//!
//! - **Sparse** (more than [`SPARSE_POOL_THRESHOLD`] candidates): draw random
//!   6-index selections, at most [`RANDOM_ATTEMPTS`] times. If that leaves the
//!   result short, shuffle the pool and enumerate the 6-subsets of its first
//!   [`ENUMERATION_WINDOW`] elements, which bounds the enumeration cost.
//! - **Dense** (at most [`SPARSE_POOL_THRESHOLD`] candidates): visit all
//!   `C(n, 6)` combinations in uniformly random order.
//!
//! A short result is not an error. It means the combinations ran out before
//! the target was reached, and callers must accept it.
//!
//! All randomness comes from the `rng` argument; with a seeded generator the
//! output is fully reproducible.

use crate::{
    combination::{Combinations, binomial, nth_combination},
    common::{Error, GUESS_SIZE, Guess, Result},
};
use rand::{
    Rng,
    seq::{SliceRandom, index},
};
use std::collections::HashSet;

/// Pools larger than this use random draws before falling back to
/// enumeration.
pub const SPARSE_POOL_THRESHOLD: usize = 60;

/// Upper bound on random draws for sparse pools.
pub const RANDOM_ATTEMPTS: usize = 1000;

/// Number of shuffled pool elements the sparse fallback enumerates over.
pub const ENUMERATION_WINDOW: usize = 50;

/// Dense pools with at most this many combinations are materialized and
/// shuffled in full; larger ones are visited through uniformly drawn ranks.
pub const MATERIALIZE_LIMIT: u128 = 1 << 18;

/// Generates up to `target` unique guesses from `values`.
///
/// Index selections that do not form a valid guess (a repeated or
/// out-of-range value in `values`) are skipped.
///
/// # Errors
///
/// Returns [`Error::PoolTooSmall`] if `values` has fewer than six entries.
/// Callers are expected to pad the pool first.
pub fn sample_guesses<R>(values: &[u8], target: usize, rng: &mut R) -> Result<Vec<Guess>>
where
    R: Rng + ?Sized,
{
    if values.len() < GUESS_SIZE {
        return Err(Error::PoolTooSmall {
            len: values.len(),
            required: GUESS_SIZE,
        });
    }

    let mut collector = Collector::new(target);
    if collector.is_full() {
        return Ok(collector.into_guesses());
    }

    if values.len() > SPARSE_POOL_THRESHOLD {
        sample_sparse(values, rng, &mut collector)?;
    } else {
        sample_dense(values, rng, &mut collector)?;
    }

    Ok(collector.into_guesses())
}

fn sample_sparse<R>(values: &[u8], rng: &mut R, collector: &mut Collector) -> Result<()>
where
    R: Rng + ?Sized,
{
    let n = values.len();

    for _ in 0..collector.target.min(RANDOM_ATTEMPTS) {
        let indices = index::sample(rng, n, GUESS_SIZE).into_vec();
        collector.offer_indices(values, &indices);
        if collector.is_full() {
            return Ok(());
        }
    }

    let mut permuted = values.to_vec();
    permuted.shuffle(rng);

    for indices in Combinations::new(GUESS_SIZE, n.min(ENUMERATION_WINDOW))? {
        collector.offer_indices(&permuted, &indices);
        if collector.is_full() {
            break;
        }
    }

    Ok(())
}

fn sample_dense<R>(values: &[u8], rng: &mut R, collector: &mut Collector) -> Result<()>
where
    R: Rng + ?Sized,
{
    let n = values.len();
    let total = binomial(n, GUESS_SIZE).ok_or(Error::SetTooLarge {
        n,
        max: SPARSE_POOL_THRESHOLD,
    })?;

    if total <= MATERIALIZE_LIMIT {
        let mut all: Vec<Guess> = Combinations::new(GUESS_SIZE, n)?
            .filter_map(|indices| Guess::from_indices(values, &indices).ok())
            .collect();
        all.shuffle(rng);

        for guess in all {
            collector.offer(guess);
            if collector.is_full() {
                break;
            }
        }
        return Ok(());
    }

    // Distinct ranks drawn uniformly come back in random order, which is
    // distributed exactly like the prefix of a fully shuffled enumeration.
    let total = usize::try_from(total).map_err(|_| Error::SetTooLarge {
        n,
        max: SPARSE_POOL_THRESHOLD,
    })?;
    let amount = collector.target.min(total);

    for rank in index::sample(rng, total, amount) {
        if let Some(indices) = nth_combination(GUESS_SIZE, n, rank as u128) {
            collector.offer_indices(values, &indices);
        }
        if collector.is_full() {
            break;
        }
    }

    Ok(())
}

/// Running set of accepted guesses, in acceptance order.
struct Collector {
    target: usize,
    seen: HashSet<Guess>,
    guesses: Vec<Guess>,
}

impl Collector {
    fn new(target: usize) -> Self {
        // Targets come from user input; cap the up-front allocation.
        let capacity = target.min(1 << 16);
        Self {
            target,
            seen: HashSet::with_capacity(capacity),
            guesses: Vec::with_capacity(capacity),
        }
    }

    fn is_full(&self) -> bool {
        self.guesses.len() >= self.target
    }

    fn offer(&mut self, guess: Guess) {
        if !self.is_full() && self.seen.insert(guess) {
            self.guesses.push(guess);
        }
    }

    fn offer_indices(&mut self, values: &[u8], indices: &[usize]) {
        if let Ok(guess) = Guess::from_indices(values, indices) {
            self.offer(guess);
        }
    }

    fn into_guesses(self) -> Vec<Guess> {
        self.guesses
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::{MAX_VALUE, MIN_VALUE};
    use rand::{SeedableRng, rngs::StdRng};

    fn assert_valid_unique(guesses: &[Guess], pool: &[u8]) {
        let unique: HashSet<_> = guesses.iter().collect();
        assert_eq!(unique.len(), guesses.len(), "duplicate guesses");

        for guess in guesses {
            let values = guess.values();
            assert!(values.windows(2).all(|w| w[0] < w[1]));
            for value in values {
                assert!((MIN_VALUE..=MAX_VALUE).contains(value));
                assert!(pool.contains(value), "{value} not in pool");
            }
        }
    }

    #[test]
    fn small_pool_yields_requested_unique_guesses() {
        let pool: Vec<u8> = (1..=8).collect();
        let mut rng = StdRng::seed_from_u64(7);

        let guesses = sample_guesses(&pool, 5, &mut rng).unwrap();
        assert_eq!(guesses.len(), 5);
        assert_valid_unique(&guesses, &pool);
    }

    #[test]
    fn exhausted_enumeration_returns_short_result() {
        let pool: Vec<u8> = (1..=8).collect();
        let mut rng = StdRng::seed_from_u64(1);

        let guesses = sample_guesses(&pool, 100, &mut rng).unwrap();
        assert_eq!(guesses.len(), 28);
        assert_valid_unique(&guesses, &pool);
    }

    #[test]
    fn exact_pool_of_six_yields_one_guess() {
        let pool = [3, 9, 27, 33, 41, 58];
        let mut rng = StdRng::seed_from_u64(0);

        let guesses = sample_guesses(&pool, 3, &mut rng).unwrap();
        assert_eq!(guesses, vec![Guess::new(pool).unwrap()]);
    }

    #[test]
    fn rejects_pool_smaller_than_guess() {
        let mut rng = StdRng::seed_from_u64(0);
        assert_eq!(
            sample_guesses(&[1, 2, 3, 4, 5], 1, &mut rng),
            Err(Error::PoolTooSmall {
                len: 5,
                required: GUESS_SIZE
            })
        );
    }

    #[test]
    fn zero_target_is_empty() {
        let pool: Vec<u8> = (1..=10).collect();
        let mut rng = StdRng::seed_from_u64(0);
        assert!(sample_guesses(&pool, 0, &mut rng).unwrap().is_empty());
    }

    #[test]
    fn full_range_pool_uses_rank_sampling() {
        let pool: Vec<u8> = (1..=60).collect();
        let mut rng = StdRng::seed_from_u64(99);

        let guesses = sample_guesses(&pool, 5000, &mut rng).unwrap();
        assert_eq!(guesses.len(), 5000);
        assert_valid_unique(&guesses, &pool);
    }

    #[test]
    fn same_seed_same_output() {
        let pool: Vec<u8> = (10..=40).collect();

        let a = sample_guesses(&pool, 200, &mut StdRng::seed_from_u64(42)).unwrap();
        let b = sample_guesses(&pool, 200, &mut StdRng::seed_from_u64(42)).unwrap();
        let c = sample_guesses(&pool, 200, &mut StdRng::seed_from_u64(43)).unwrap();

        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn dense_order_is_shuffled() {
        let pool: Vec<u8> = (1..=12).collect();
        let mut rng = StdRng::seed_from_u64(5);

        let guesses = sample_guesses(&pool, 50, &mut rng).unwrap();
        let mut sorted = guesses.clone();
        sorted.sort();
        assert_ne!(guesses, sorted);
    }

    #[test]
    fn sparse_pool_collects_from_random_draws_and_window() {
        // Values repeat so the pool can exceed the sparse threshold; draws
        // that hit a repeated value are skipped.
        let pool: Vec<u8> = (0..90).map(|i| (i % 60) as u8 + 1).collect();
        let mut rng = StdRng::seed_from_u64(3);

        let guesses = sample_guesses(&pool, 1500, &mut rng).unwrap();
        assert_eq!(guesses.len(), 1500);
        assert_valid_unique(&guesses, &pool);
    }
}
