//! Error types for the job service.
//!
//! This module defines the service-level `Error` enum. It wraps generation
//! precondition failures from `guessgen_core` and adds the failure modes of
//! the worker pool, the job executor and the progress relay. It implements
//! [`IntoResponse`] so handlers can return it directly with a matching HTTP
//! status and a JSON `{"error": ...}` body.
//!
//! ## Error Cases
//! - `Generation`: A generation precondition failed (bad pool, bad count).
//! - `ChannelError`: An internal communication failure between tasks or
//!   workers.
//! - `ChunkPanicked`: A chunk worker panicked while generating.
//! - `AllChunksFailed`: Every chunk of a distribution failed.
//! - `JobTimedOut`: A job exceeded its time limit.
//! - `JobPanicked`: Orchestration code panicked while running a job.
//! - `ResultAlreadyStored`: A second result was written for the same job.
//! - `JobNotFound`: The job id is unknown or has expired.
//! - `ServiceOverloaded`: The job queue is full.
//! - `ServiceShutdown`: A request arrived while the service was shutting down.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use guessgen_core::JobId;
use serde_json::json;

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the job service.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// A request or pool violated a generation precondition.
    #[error(transparent)]
    Generation(#[from] guessgen_core::Error),

    /// Internal channel send/receive failure (e.g., closed or full channel).
    #[error("Channel error: {context}")]
    ChannelError { context: String },

    /// A chunk worker panicked; its contribution is lost.
    #[error("Chunk {index} panicked: {reason}")]
    ChunkPanicked { index: usize, reason: String },

    /// No chunk of a distribution produced a result.
    #[error("All {chunks} chunks failed, last error: {reason}")]
    AllChunksFailed { chunks: usize, reason: String },

    /// The job ran longer than the configured limit.
    #[error("Job exceeded time limit of {limit_secs}s")]
    JobTimedOut { limit_secs: u64 },

    /// Orchestration code panicked.
    #[error("Job panicked: {reason}")]
    JobPanicked { reason: String },

    /// Results are write-once.
    #[error("Result for job {job_id} already stored")]
    ResultAlreadyStored { job_id: JobId },

    #[error("Job {job_id} not found")]
    JobNotFound { job_id: JobId },

    /// The submission queue is at capacity.
    #[error("Service is overloaded, try again later")]
    ServiceOverloaded,

    /// The service is in the process of shutting down.
    #[error("Service is shutting down")]
    ServiceShutdown,
}

impl Error {
    pub const fn status_code(&self) -> StatusCode {
        match self {
            Self::Generation(_) => StatusCode::BAD_REQUEST,
            Self::JobNotFound { .. } => StatusCode::NOT_FOUND,
            Self::ServiceOverloaded | Self::ServiceShutdown => StatusCode::SERVICE_UNAVAILABLE,
            Self::ResultAlreadyStored { .. } => StatusCode::CONFLICT,
            Self::ChannelError { .. }
            | Self::ChunkPanicked { .. }
            | Self::AllChunksFailed { .. }
            | Self::JobTimedOut { .. }
            | Self::JobPanicked { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status = self.status_code();
        if status.is_server_error() {
            tracing::error!("Request failed: {self}");
        }
        (status, Json(json!({ "error": self.to_string() }))).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn maps_errors_to_status_codes() {
        let invalid = Error::from(guessgen_core::Error::InvalidRequest {
            reason: "nope".to_string(),
        });
        assert_eq!(invalid.status_code(), StatusCode::BAD_REQUEST);
        assert_eq!(
            Error::JobNotFound {
                job_id: JobId::new()
            }
            .status_code(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            Error::ServiceOverloaded.status_code(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            Error::JobTimedOut { limit_secs: 1 }.status_code(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn generation_errors_keep_their_message() {
        let err = Error::from(guessgen_core::Error::ValueOutOfRange { value: 99 });
        assert_eq!(err.to_string(), "Value 99 out of range 1..=60");
    }
}
