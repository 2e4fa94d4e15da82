#![doc = include_str!("../README.md")]

mod common;
pub use common::*;

pub mod chunk;
pub mod combination;
pub mod pool;
pub mod sampler;

pub use chunk::{chunk_seed, generate_chunk};
pub use combination::Combinations;
pub use pool::{CandidatePool, DEFAULT_MAX_GUESSES, GenerationRequest};
pub use sampler::sample_guesses;
