//! Chunk worker pool.
//!
//! ## Structure
//!
//! - [`manager`] - [`WorkerPool`](manager::WorkerPool): round-robin dispatch
//!   and coordinated shutdown.
//! - [`worker`] - The per-worker receive loop.
//! - [`request`] - Messages exchanged with workers.

pub mod manager;
pub mod request;
pub mod worker;
