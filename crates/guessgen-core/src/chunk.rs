//! The unit of parallel generation.
//!
//! A chunk is a slice of a job's requested count, generated independently
//! from every other chunk with its own seeded random stream. Given the same
//! pool, count and seed, [`generate_chunk`] always returns the same guesses.

use crate::{common::Guess, common::Result, sampler::sample_guesses};
use rand::{SeedableRng, rngs::StdRng};

/// Seed for chunk `index` of a job whose base seed is `base`.
///
/// Adjacent chunks get adjacent seeds; `StdRng` seeding spreads them into
/// unrelated streams.
pub const fn chunk_seed(base: u64, index: usize) -> u64 {
    base.wrapping_add(index as u64)
}

/// Generates up to `count` unique guesses from `values` with a generator
/// seeded from `seed`.
///
/// # Errors
///
/// Fails only on sampler preconditions (fewer than six values).
pub fn generate_chunk(values: &[u8], count: usize, seed: u64) -> Result<Vec<Guess>> {
    let mut rng = StdRng::seed_from_u64(seed);
    sample_guesses(values, count, &mut rng)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::Error;

    #[test]
    fn same_seed_is_reproducible() {
        let pool: Vec<u8> = (1..=20).collect();
        let a = generate_chunk(&pool, 50, 1234).unwrap();
        let b = generate_chunk(&pool, 50, 1234).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 50);
    }

    #[test]
    fn neighbouring_seeds_differ() {
        let pool: Vec<u8> = (1..=20).collect();
        let a = generate_chunk(&pool, 50, chunk_seed(99, 0)).unwrap();
        let b = generate_chunk(&pool, 50, chunk_seed(99, 1)).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn seed_wraps_at_u64_max() {
        assert_eq!(chunk_seed(u64::MAX, 1), 0);
        assert_eq!(chunk_seed(10, 3), 13);
    }

    #[test]
    fn propagates_small_pool_error() {
        assert!(matches!(
            generate_chunk(&[1, 2, 3], 1, 0),
            Err(Error::PoolTooSmall { len: 3, .. })
        ));
    }
}
