//! Job identity, lifecycle status and progress events.
//!
//! A job moves through `queued → started → processing → {completed | failed}`.
//! Every transition is announced with a [`ProgressEvent`] published on the
//! job's own channel (see [`progress_channel`]). The terminal `completed`
//! payload mirrors the [`JobResult`] that is persisted for late readers.

use super::{
    error::{Error, Result},
    types::Guess,
};
use core::{fmt, str::FromStr};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Prefix shared by every per-job progress channel.
pub const PROGRESS_CHANNEL_PREFIX: &str = "task_progress:";

/// Pattern matching every per-job progress channel.
pub const PROGRESS_CHANNEL_PATTERN: &str = "task_progress:*";

/// Opaque, unique job token.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(Uuid);

impl JobId {
    /// Allocates a fresh random id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for JobId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| Error::InvalidRequest {
                reason: format!("invalid job id {s:?}: {e}"),
            })
    }
}

/// Name of the progress channel for `job_id`.
pub fn progress_channel(job_id: JobId) -> String {
    format!("{PROGRESS_CHANNEL_PREFIX}{job_id}")
}

/// Extracts the job id from a progress channel name.
///
/// Returns `None` for channels outside the progress namespace or with a
/// malformed id.
pub fn job_id_from_channel(channel: &str) -> Option<JobId> {
    channel.strip_prefix(PROGRESS_CHANNEL_PREFIX)?.parse().ok()
}

/// Lifecycle state of a job.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Started,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// `completed` and `failed` are final.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }

    /// Whether the state machine allows moving from `self` to `next`.
    ///
    /// `processing → processing` is allowed so per-block updates can be
    /// recorded. Any non-terminal state may fail.
    pub const fn can_transition_to(self, next: Self) -> bool {
        match (self, next) {
            (Self::Queued, Self::Started)
            | (Self::Started, Self::Processing)
            | (Self::Processing, Self::Processing | Self::Completed) => true,
            (current, Self::Failed) => !current.is_terminal(),
            _ => false,
        }
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Queued => "queued",
            Self::Started => "started",
            Self::Processing => "processing",
            Self::Completed => "completed",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Final value of a completed job, as persisted in the result store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobResult {
    pub total: usize,
    pub guesses: Vec<Guess>,
}

impl JobResult {
    pub fn new(guesses: Vec<Guess>) -> Self {
        Self {
            total: guesses.len(),
            guesses,
        }
    }
}

/// A lifecycle update for one job.
///
/// Optional fields are omitted from the JSON payload when absent.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub status: JobStatus,
    pub progress: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<JobResult>,
}

impl ProgressEvent {
    fn bare(job_id: JobId, status: JobStatus, progress: u8) -> Self {
        Self {
            job_id,
            status,
            progress: progress.min(100),
            message: None,
            current: None,
            total: None,
            error: None,
            result: None,
        }
    }

    /// The job was picked up by an executor slot.
    pub fn started(job_id: JobId, requested: usize) -> Self {
        Self {
            total: Some(requested),
            ..Self::bare(job_id, JobStatus::Started, 0)
        }
    }

    /// Intermediate progress while guesses are being generated.
    pub fn processing(job_id: JobId, progress: u8) -> Self {
        Self::bare(job_id, JobStatus::Processing, progress)
    }

    /// The job finished; carries the final counts but not the guesses.
    pub fn completed(job_id: JobId, generated: usize, requested: usize) -> Self {
        Self {
            current: Some(generated),
            total: Some(requested),
            ..Self::bare(job_id, JobStatus::Completed, 100)
        }
    }

    /// Completed-equivalent event synthesized from a stored result.
    pub fn replay(job_id: JobId, result: JobResult) -> Self {
        Self {
            current: Some(result.total),
            total: Some(result.total),
            result: Some(result),
            ..Self::bare(job_id, JobStatus::Completed, 100)
        }
    }

    /// The job failed; `error` is the human-readable cause.
    pub fn failed(job_id: JobId, error: impl Into<String>) -> Self {
        Self {
            error: Some(error.into()),
            ..Self::bare(job_id, JobStatus::Failed, 100)
        }
    }

    #[must_use]
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    #[must_use]
    pub fn with_counts(mut self, current: usize, total: usize) -> Self {
        self.current = Some(current);
        self.total = Some(total);
        self
    }

    pub const fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }
}
