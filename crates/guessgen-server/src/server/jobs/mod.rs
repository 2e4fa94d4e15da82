//! Job lifecycle: submission, execution, progress and records.
//!
//! ## Structure
//!
//! - [`executor`] - Bounded queue and concurrency slots that jobs run in.
//! - [`lifecycle`] - The callbacks the executor drives for each job.
//! - [`orchestrator`] - Generation of one job, with progress reporting.
//! - [`publisher`] - Records events in the registry and publishes them.
//! - [`registry`] - Per-job status snapshots.

pub mod executor;
pub mod lifecycle;
pub mod orchestrator;
pub mod publisher;
pub mod registry;
