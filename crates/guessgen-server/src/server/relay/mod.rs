//! Delivery of job progress to real-time subscribers.
//!
//! ## Structure
//!
//! - [`bus`] - Channel-addressed pub/sub that jobs publish progress on.
//! - [`store`] - TTL-bounded, write-once storage of completed results.
//! - [`hub`] - Per-job broadcast targets for live subscribers.
//! - [`listener`] - [`ProgressRelay`](listener::ProgressRelay): forwards bus
//!   traffic into the hub and replays stored results to late subscribers.

pub mod bus;
pub mod hub;
pub mod listener;
pub mod store;
