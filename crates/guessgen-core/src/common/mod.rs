//! Shared types and error definitions used across the guessgen crates.
//!
//! ## Submodules
//!
//! - [`error`] - Centralized error type for generation preconditions.
//! - [`types`] - The [`Guess`](types::Guess) value and its bounds.
//! - [`event`] - Job ids, lifecycle status, results and progress events.

pub mod error;
pub mod event;
pub mod types;

pub use error::{Error, Result};
pub use event::*;
pub use types::*;
