//! Candidate pools and generation requests.
//!
//! A [`CandidatePool`] is the deduplicated, ascending set of values a job may
//! draw guesses from. Pools are usually built from user-selected digit
//! combinations with [`CandidatePool::from_combinations`], which reads each
//! string as a run of two-digit numbers.

use crate::common::{Error, GUESS_SIZE, MAX_VALUE, MIN_VALUE, Result};
use rand::{Rng, seq::index};
use serde::{Deserialize, Serialize};

/// Default upper bound on the number of guesses a single job may request.
pub const DEFAULT_MAX_GUESSES: usize = 10_000;

/// Ascending, duplicate-free values in `1..=60`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CandidatePool {
    values: Vec<u8>,
}

impl CandidatePool {
    /// Builds a pool from arbitrary values, sorting and dropping repeats.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueOutOfRange`] for any value outside `1..=60`.
    pub fn new<I>(values: I) -> Result<Self>
    where
        I: IntoIterator<Item = u8>,
    {
        let mut values: Vec<u8> = values.into_iter().collect();
        if let Some(&bad) = values
            .iter()
            .find(|v| !(MIN_VALUE..=MAX_VALUE).contains(*v))
        {
            return Err(Error::ValueOutOfRange {
                value: u32::from(bad),
            });
        }

        values.sort_unstable();
        values.dedup();
        Ok(Self { values })
    }

    /// Extracts a pool from digit combinations such as `"0512"` or `"123456"`.
    ///
    /// Each string is consumed two characters at a time. Pairs of ASCII
    /// digits that form a value in `1..=60` join the pool; anything else
    /// (`"00"`, `"75"`, `"a4"`) is skipped, as is a trailing odd character.
    pub fn from_combinations<S>(combinations: &[S]) -> Self
    where
        S: AsRef<str>,
    {
        let mut values = Vec::new();

        for combination in combinations {
            let chars: Vec<char> = combination.as_ref().chars().collect();
            values.extend(
                chars
                    .chunks_exact(2)
                    .filter_map(|pair| Some(pair[0].to_digit(10)? * 10 + pair[1].to_digit(10)?))
                    .filter_map(|v| u8::try_from(v).ok())
                    .filter(|v| (MIN_VALUE..=MAX_VALUE).contains(v)),
            );
        }

        values.sort_unstable();
        values.dedup();
        Self { values }
    }

    /// Returns the pool padded to at least six values.
    ///
    /// Missing values are drawn uniformly, without replacement, from the
    /// values in `1..=60` not already in the pool. Pools that already hold six
    /// or more values are returned unchanged.
    #[must_use]
    pub fn padded<R>(mut self, rng: &mut R) -> Self
    where
        R: Rng + ?Sized,
    {
        let needed = GUESS_SIZE.saturating_sub(self.values.len());
        if needed == 0 {
            return self;
        }

        let absent: Vec<u8> = (MIN_VALUE..=MAX_VALUE)
            .filter(|v| self.values.binary_search(v).is_err())
            .collect();

        self.values
            .extend(index::sample(rng, absent.len(), needed).iter().map(|i| absent[i]));
        self.values.sort_unstable();
        self
    }

    pub fn values(&self) -> &[u8] {
        &self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Whether the pool can form at least one guess without padding.
    pub fn is_sufficient(&self) -> bool {
        self.values.len() >= GUESS_SIZE
    }
}

/// A validated request for `requested` guesses from `pool`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct GenerationRequest {
    pub pool: CandidatePool,
    pub requested: usize,
    /// The count the caller asked for, when it exceeded the maximum.
    pub clamped_from: Option<u64>,
}

impl GenerationRequest {
    /// Validates `requested` and clamps it to `max`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidRequest`] if `requested` is zero or negative,
    /// or if `max` is zero.
    pub fn new(pool: CandidatePool, requested: i64, max: usize) -> Result<Self> {
        if max == 0 {
            return Err(Error::InvalidRequest {
                reason: "maximum guess count must be positive".to_string(),
            });
        }
        if requested <= 0 {
            return Err(Error::InvalidRequest {
                reason: format!("requested count must be positive, got {requested}"),
            });
        }

        let asked = requested.unsigned_abs();
        let (requested, clamped_from) = match usize::try_from(asked) {
            Ok(n) if n <= max => (n, None),
            _ => (max, Some(asked)),
        };

        Ok(Self {
            pool,
            requested,
            clamped_from,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{SeedableRng, rngs::StdRng};

    #[test]
    fn new_sorts_and_dedups() {
        let pool = CandidatePool::new([9, 3, 9, 1, 60]).unwrap();
        assert_eq!(pool.values(), &[1, 3, 9, 60]);
        assert_eq!(
            CandidatePool::new([1, 61]),
            Err(Error::ValueOutOfRange { value: 61 })
        );
        assert_eq!(
            CandidatePool::new([0]),
            Err(Error::ValueOutOfRange { value: 0 })
        );
    }

    #[test]
    fn extracts_two_digit_values() {
        let pool = CandidatePool::from_combinations(&["0512", "1205", "607"]);
        assert_eq!(pool.values(), &[5, 12, 60]);
    }

    #[test]
    fn extraction_skips_out_of_range_pairs() {
        let pool = CandidatePool::from_combinations(&["00", "61", "99", "01"]);
        assert_eq!(pool.values(), &[1]);
        assert!(CandidatePool::from_combinations::<&str>(&[]).is_empty());
    }

    #[test]
    fn extraction_skips_non_digit_pairs() {
        let pool = CandidatePool::from_combinations(&["12a4", "0506"]);
        assert_eq!(pool.values(), &[5, 6, 12]);

        // Full-width digits do not count.
        let pool = CandidatePool::from_combinations(&["１２07", "x", "-1+2"]);
        assert_eq!(pool.values(), &[7]);
    }

    #[test]
    fn padding_fills_empty_pool_to_six() {
        let mut rng = StdRng::seed_from_u64(11);
        let pool = CandidatePool::default().padded(&mut rng);

        assert_eq!(pool.len(), GUESS_SIZE);
        assert!(pool.values().windows(2).all(|w| w[0] < w[1]));
        assert!(
            pool.values()
                .iter()
                .all(|v| (MIN_VALUE..=MAX_VALUE).contains(v))
        );
    }

    #[test]
    fn padding_keeps_existing_values() {
        let mut rng = StdRng::seed_from_u64(2);
        let pool = CandidatePool::new([7, 14, 21]).unwrap().padded(&mut rng);

        assert_eq!(pool.len(), GUESS_SIZE);
        for v in [7, 14, 21] {
            assert!(pool.values().contains(&v));
        }
    }

    #[test]
    fn padding_leaves_sufficient_pool_alone() {
        let mut rng = StdRng::seed_from_u64(0);
        let original = CandidatePool::new(1..=8).unwrap();
        assert_eq!(original.clone().padded(&mut rng), original);
    }

    #[test]
    fn request_rejects_non_positive_counts() {
        let pool = CandidatePool::default();
        assert!(GenerationRequest::new(pool.clone(), 0, 10).is_err());
        assert!(GenerationRequest::new(pool.clone(), -5, 10).is_err());
        assert!(GenerationRequest::new(pool, 1, 0).is_err());
    }

    #[test]
    fn request_clamps_to_maximum() {
        let pool = CandidatePool::default();

        let req = GenerationRequest::new(pool.clone(), 25_000, DEFAULT_MAX_GUESSES).unwrap();
        assert_eq!(req.requested, DEFAULT_MAX_GUESSES);
        assert_eq!(req.clamped_from, Some(25_000));

        let req = GenerationRequest::new(pool, 42, DEFAULT_MAX_GUESSES).unwrap();
        assert_eq!(req.requested, 42);
        assert_eq!(req.clamped_from, None);
    }
}
