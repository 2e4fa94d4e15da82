//! Parallel generation across the worker pool.
//!
//! ## Structure
//!
//! - [`coordinator`] - Splits a count into seeded chunks, fans them out and
//!   merges the results without duplicates.
//! - [`processor`] - Runs one chunk inside a worker.

pub mod coordinator;
pub mod processor;
