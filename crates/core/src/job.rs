//! Generation job model and the status endpoint's wire format.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;

// ---------------------------------------------------------------------------
// Wire status values
// ---------------------------------------------------------------------------

/// Job accepted, not yet started.
pub const STATUS_QUEUED: &str = "queued";
/// Alias some workers report instead of `queued`.
pub const STATUS_PENDING: &str = "pending";
/// Job is rendering.
pub const STATUS_PROCESSING: &str = "processing";
/// Job finished and carries a result.
pub const STATUS_COMPLETED: &str = "completed";
/// Job failed.
pub const STATUS_FAILED: &str = "failed";
/// Alternate failure value.
pub const STATUS_ERROR: &str = "error";

/// Message used when a failed job carries no error text.
pub const DEFAULT_JOB_FAILURE: &str = "Job processing failed";

// ---------------------------------------------------------------------------
// JobStatus
// ---------------------------------------------------------------------------

/// Lifecycle status of a [`GenerationJob`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
}

impl JobStatus {
    /// Map a raw status string from the service.
    ///
    /// Unknown values (and an empty/missing status) are treated as
    /// non-terminal `Processing`.
    pub fn from_wire(raw: &str) -> Self {
        match raw {
            STATUS_QUEUED | STATUS_PENDING => Self::Queued,
            STATUS_COMPLETED => Self::Completed,
            STATUS_FAILED | STATUS_ERROR => Self::Failed,
            _ => Self::Processing,
        }
    }

    /// `Completed` and `Failed` end polling.
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Failed)
    }
}

// ---------------------------------------------------------------------------
// Wire types
// ---------------------------------------------------------------------------

/// One rendered output in a status response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct RenderOutput {
    #[serde(default)]
    pub image: Option<String>,
}

/// Body of `GET /image-gen/{userId}/{jobId}/status`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct StatusResponse {
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub result: Option<Vec<RenderOutput>>,
    #[serde(default)]
    pub error: Option<String>,
}

impl StatusResponse {
    pub fn job_status(&self) -> JobStatus {
        JobStatus::from_wire(&self.status)
    }

    /// Image URL of the first result, if present and non-empty.
    pub fn result_url(&self) -> Option<&str> {
        self.result
            .as_deref()?
            .first()?
            .image
            .as_deref()
            .filter(|url| !url.trim().is_empty())
    }

    /// Server-provided failure text, or [`DEFAULT_JOB_FAILURE`].
    pub fn failure_message(&self) -> String {
        self.error
            .as_deref()
            .filter(|msg| !msg.is_empty())
            .unwrap_or(DEFAULT_JOB_FAILURE)
            .to_string()
    }
}

// ---------------------------------------------------------------------------
// GenerationJob
// ---------------------------------------------------------------------------

/// One submitted effect-rendering request.
///
/// Created when submission succeeds and updated only from polling
/// responses. Once terminal, further updates are rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerationJob {
    pub job_id: String,
    pub status: JobStatus,
    pub result_url: Option<String>,
}

impl GenerationJob {
    /// A freshly submitted job in the `Queued` state.
    pub fn new(job_id: impl Into<String>) -> Self {
        Self {
            job_id: job_id.into(),
            status: JobStatus::Queued,
            result_url: None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Apply a new status observed while polling.
    pub fn record_status(&mut self, status: JobStatus) -> Result<(), CoreError> {
        if self.is_terminal() {
            return Err(CoreError::Conflict(format!(
                "Job {} is already {:?}",
                self.job_id, self.status
            )));
        }
        self.status = status;
        Ok(())
    }

    /// Mark the job completed with its rendered output.
    pub fn complete(&mut self, result_url: &str) -> Result<(), CoreError> {
        if result_url.trim().is_empty() {
            return Err(CoreError::Validation("No image URL in response".into()));
        }
        self.record_status(JobStatus::Completed)?;
        self.result_url = Some(result_url.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
