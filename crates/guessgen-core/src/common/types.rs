//! # Guess Types and Constants
//!
//! This module defines the unit of output of the whole system, the [`Guess`],
//! together with the bounds every guess must respect.
//!
//! ## Invariants
//!
//! - A guess holds exactly [`GUESS_SIZE`] values.
//! - Every value lies in [`MIN_VALUE`]`..=`[`MAX_VALUE`].
//! - Values are strictly increasing, so two guesses are equal exactly when
//!   their sorted tuples are equal.
//!
//! These invariants are enforced at construction; a `Guess` value that exists
//! is always valid.

use super::error::{Error, Result};
use core::fmt;
use serde::{Deserialize, Serialize};

/// Number of values in one guess.
pub const GUESS_SIZE: usize = 6;

/// Smallest value a guess (or candidate pool) may contain.
pub const MIN_VALUE: u8 = 1;

/// Largest value a guess (or candidate pool) may contain.
pub const MAX_VALUE: u8 = 60;

/// One generated selection: six distinct values in `1..=60`, ascending.
///
/// Serialized as a plain JSON array (`[4, 8, 15, 16, 23, 42]`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "Vec<u8>", into = "[u8; GUESS_SIZE]")]
pub struct Guess([u8; GUESS_SIZE]);

impl Guess {
    /// Builds a guess from six values in any order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ValueOutOfRange`] if a value is outside `1..=60` and
    /// [`Error::DuplicateValue`] if a value repeats.
    pub fn new(mut values: [u8; GUESS_SIZE]) -> Result<Self> {
        values.sort_unstable();

        for (i, &value) in values.iter().enumerate() {
            if !(MIN_VALUE..=MAX_VALUE).contains(&value) {
                return Err(Error::ValueOutOfRange {
                    value: u32::from(value),
                });
            }
            if i > 0 && values[i - 1] == value {
                return Err(Error::DuplicateValue { value });
            }
        }

        Ok(Self(values))
    }

    /// Builds a guess by mapping pool indices back to pool values.
    ///
    /// # Errors
    ///
    /// Fails like [`Guess::new`] when the selected values do not form a valid
    /// guess, or with [`Error::InvalidRequest`] when an index is out of bounds
    /// or the selection is not exactly six long.
    pub fn from_indices(values: &[u8], indices: &[usize]) -> Result<Self> {
        if indices.len() != GUESS_SIZE {
            return Err(Error::InvalidRequest {
                reason: format!("expected {GUESS_SIZE} indices, got {}", indices.len()),
            });
        }

        let mut selected = [0_u8; GUESS_SIZE];
        for (slot, &index) in selected.iter_mut().zip(indices) {
            *slot = *values.get(index).ok_or_else(|| Error::InvalidRequest {
                reason: format!("index {index} out of bounds for pool of {}", values.len()),
            })?;
        }

        Self::new(selected)
    }

    /// Returns the values in ascending order.
    pub const fn values(&self) -> &[u8; GUESS_SIZE] {
        &self.0
    }

    pub fn iter(&self) -> impl Iterator<Item = u8> + '_ {
        self.0.iter().copied()
    }
}

impl From<Guess> for [u8; GUESS_SIZE] {
    fn from(guess: Guess) -> Self {
        guess.0
    }
}

impl TryFrom<Vec<u8>> for Guess {
    type Error = Error;

    fn try_from(values: Vec<u8>) -> Result<Self> {
        let values: [u8; GUESS_SIZE] =
            values
                .try_into()
                .map_err(|v: Vec<u8>| Error::InvalidRequest {
                    reason: format!("a guess needs {GUESS_SIZE} values, got {}", v.len()),
                })?;
        Self::new(values)
    }
}

impl fmt::Display for Guess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, value) in self.0.iter().enumerate() {
            if i > 0 {
                f.write_str("-")?;
            }
            write!(f, "{value:02}")?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_sorts_values() {
        let guess = Guess::new([42, 4, 23, 8, 16, 15]).unwrap();
        assert_eq!(guess.values(), &[4, 8, 15, 16, 23, 42]);
    }

    #[test]
    fn new_rejects_out_of_range() {
        assert_eq!(
            Guess::new([0, 1, 2, 3, 4, 5]),
            Err(Error::ValueOutOfRange { value: 0 })
        );
        assert_eq!(
            Guess::new([1, 2, 3, 4, 5, 61]),
            Err(Error::ValueOutOfRange { value: 61 })
        );
    }

    #[test]
    fn new_rejects_duplicates() {
        assert_eq!(
            Guess::new([7, 1, 2, 7, 4, 5]),
            Err(Error::DuplicateValue { value: 7 })
        );
    }

    #[test]
    fn from_indices_maps_to_pool_values() {
        let pool = [10, 20, 30, 40, 50, 60, 5];
        let guess = Guess::from_indices(&pool, &[6, 0, 1, 2, 3, 4]).unwrap();
        assert_eq!(guess.values(), &[5, 10, 20, 30, 40, 50]);
        assert!(Guess::from_indices(&pool, &[0, 1, 2, 3, 4, 9]).is_err());
        assert!(Guess::from_indices(&pool, &[0, 1, 2]).is_err());
    }

    #[test]
    fn serializes_as_plain_array() {
        let guess = Guess::new([6, 5, 4, 3, 2, 1]).unwrap();
        let json = serde_json::to_string(&guess).unwrap();
        assert_eq!(json, "[1,2,3,4,5,6]");

        let back: Guess = serde_json::from_str("[60,1,2,3,4,5]").unwrap();
        assert_eq!(back.values(), &[1, 2, 3, 4, 5, 60]);
        assert!(serde_json::from_str::<Guess>("[1,2,3]").is_err());
        assert!(serde_json::from_str::<Guess>("[1,1,2,3,4,5]").is_err());
    }

    #[test]
    fn displays_zero_padded() {
        let guess = Guess::new([1, 2, 13, 24, 35, 60]).unwrap();
        assert_eq!(guess.to_string(), "01-02-13-24-35-60");
    }
}
