//! HTTP and WebSocket surface of the job service.
//!
//! ## Structure
//!
//! - [`handler`] - [`JobService`](handler::JobService): owns the worker pool,
//!   executor and relay, and implements submission, status, result and
//!   subscription.
//! - [`routes`] - The axum router and JSON handlers.
//! - [`ws`] - WebSocket progress subscriptions.

pub mod handler;
pub mod routes;
pub mod ws;
