//! Lexicographic k-subset enumeration using Gosper's hack.
//!
//! A k-subset of `{0, .., n-1}` is represented as an `n`-bit mask with exactly
//! `k` bits set. Gosper's successor step computes the next-larger integer with
//! the same popcount in a handful of arithmetic operations:
//!
//! ```text
//! c    = m & -m
//! r    = m + c
//! next = (((r ^ m) / c) >> 2) | r
//! ```
//!
//! Starting from the `k` lowest bits and stopping once the mask reaches
//! `1 << n` therefore visits all `C(n, k)` subsets in strictly increasing mask
//! order. That order is colexicographic on the index lists, which is what
//! [`nth_combination`] decodes directly through the combinatorial number
//! system.
//!
//! Masks are `u128`, so `n` is limited to [`MAX_SET_SIZE`]. The iterator is
//! plain data: clone it to restart, share nothing between callers.

use crate::common::{Error, Result};

/// Largest universe size the bitmask can represent without overflow.
pub const MAX_SET_SIZE: usize = 127;

/// Lazy iterator over every k-subset of `{0, .., n-1}`.
///
/// Each item is an ascending list of `k` indices. `k = 0` yields a single
/// empty subset; `k > n` yields nothing.
#[derive(Clone, Debug)]
pub struct Combinations {
    mask: u128,
    limit: u128,
    k: usize,
    done: bool,
}

impl Combinations {
    /// Creates an enumeration of the `k`-subsets of an `n`-element set.
    ///
    /// # Errors
    ///
    /// Returns [`Error::SetTooLarge`] if `n` exceeds [`MAX_SET_SIZE`].
    pub fn new(k: usize, n: usize) -> Result<Self> {
        if n > MAX_SET_SIZE {
            return Err(Error::SetTooLarge {
                n,
                max: MAX_SET_SIZE,
            });
        }

        let empty = k > n;
        let mask = if empty { 0 } else { (1_u128 << k) - 1 };

        Ok(Self {
            mask,
            limit: 1_u128 << n,
            k,
            done: empty,
        })
    }
}

impl Iterator for Combinations {
    type Item = Vec<usize>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done || self.mask >= self.limit {
            return None;
        }

        let current = self.mask;
        if self.k == 0 {
            // The successor step divides by the lowest set bit, which the
            // empty mask does not have.
            self.done = true;
        } else {
            self.mask = next_mask(current);
        }

        Some(mask_to_indices(current, self.k))
    }
}

/// Gosper's successor: the next-larger integer with the same popcount.
///
/// `mask` must be non-zero and below `1 << MAX_SET_SIZE`.
#[inline]
const fn next_mask(mask: u128) -> u128 {
    let c = mask & mask.wrapping_neg();
    let r = mask + c;
    (((r ^ mask) / c) >> 2) | r
}

fn mask_to_indices(mut mask: u128, k: usize) -> Vec<usize> {
    let mut indices = Vec::with_capacity(k);
    while mask != 0 {
        indices.push(mask.trailing_zeros() as usize);
        mask &= mask - 1;
    }
    indices
}

/// Number of `k`-subsets of an `n`-element set, or `None` on overflow.
pub fn binomial(n: usize, k: usize) -> Option<u128> {
    if k > n {
        return Some(0);
    }

    let k = k.min(n - k);
    let mut acc: u128 = 1;
    for i in 0..k {
        // acc * (n - i) is always divisible by (i + 1) at this point.
        acc = acc.checked_mul((n - i) as u128)? / (i as u128 + 1);
    }
    Some(acc)
}

/// Returns the `rank`-th subset in the order [`Combinations`] yields them.
///
/// Returns `None` if `rank >= C(n, k)` or the binomials overflow.
pub fn nth_combination(k: usize, n: usize, rank: u128) -> Option<Vec<usize>> {
    if rank >= binomial(n, k)? {
        return None;
    }

    let mut indices = vec![0; k];
    let mut rank = rank;
    let mut upper = n;

    for i in (1..=k).rev() {
        // Largest c below `upper` with C(c, i) <= rank. C(i - 1, i) = 0, so
        // the scan stops no lower than i - 1.
        let mut c = upper - 1;
        let mut weight = binomial(c, i)?;
        while weight > rank {
            c -= 1;
            weight = binomial(c, i)?;
        }

        indices[i - 1] = c;
        rank -= weight;
        upper = c;
    }

    Some(indices)
}
