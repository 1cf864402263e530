/// Errors from the storage, job and status endpoints.
///
/// Each variant names the pipeline stage that failed. The string payload
/// is a human-readable detail (HTTP status and body, or the transport
/// error).
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EffectsError {
    /// The signed-URL provisioning request failed.
    #[error("Failed to get signed URL: {0}")]
    Provisioning(String),

    /// Writing the file bytes to the signed URL failed.
    #[error("Failed to upload file: {0}")]
    Upload(String),

    /// The job submission request failed or returned no job id.
    #[error("Failed to submit job: {0}")]
    Submission(String),

    /// A single status request failed at the HTTP level.
    #[error("Failed to check status: {0}")]
    StatusCheck(String),

    /// The job reached a `failed`/`error` status.
    #[error("{0}")]
    Job(String),

    /// The job never reached a terminal status.
    #[error("Job timed out after {attempts} polls")]
    Timeout { attempts: u32 },

    /// The caller cancelled the operation.
    #[error("Operation cancelled")]
    Cancelled,
}
