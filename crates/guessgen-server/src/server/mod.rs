//! Job server internals.
//!
//! ## Structure
//!
//! - [`config`] - Command-line and environment configuration.
//! - [`error`] - Service error type and its HTTP mapping.
//! - [`generation`] - Distribution of chunks across the worker pool.
//! - [`jobs`] - Job execution, orchestration, progress and records.
//! - [`pool`] - The chunk worker pool.
//! - [`relay`] - Progress bus, result store and live subscriber fan-out.
//! - [`service`] - The HTTP and WebSocket surface.
//! - [`telemetry`] - Logging, tracing and metrics setup.

pub mod config;
pub mod error;
pub mod generation;
pub mod jobs;
pub mod pool;
pub mod relay;
pub mod service;
pub mod telemetry;
