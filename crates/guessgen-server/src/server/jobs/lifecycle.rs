use crate::server::error::{Error, Result};
use guessgen_core::{GenerationRequest, JobId, JobResult};
use std::future::Future;

/// Callbacks the job executor drives for every job it runs.
///
/// For one job the executor calls [`run`](Self::run) once, then exactly one
/// of [`on_success`](Self::on_success) or [`on_failure`](Self::on_failure).
/// If `on_success` itself fails, `on_failure` follows with that error.
pub trait JobLifecycle: Send + Sync + 'static {
    /// Produces the job's result.
    fn run(
        &self,
        job_id: JobId,
        request: GenerationRequest,
    ) -> impl Future<Output = Result<JobResult>> + Send;

    /// Finalizes a successful run.
    ///
    /// # Errors
    ///
    /// A failure here turns the job into a failed one.
    fn on_success(&self, job_id: JobId, requested: usize, result: JobResult) -> Result<()>;

    /// Finalizes a job that failed, timed out, panicked or was dropped at
    /// shutdown.
    fn on_failure(&self, job_id: JobId, error: &Error);
}
