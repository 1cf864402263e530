//! Session state machine: the four lifecycle states and their transition
//! rules.
//!
//! ```text
//! Upload ──[file]──► Upload(uploading) ──[ok]──► Preview ──[generate]──► Processing ──[done]──► Result
//!    ▲                      │                      │  ▲                       │
//!    │◄────[failed/cancel]──┘                      │  └───[failed/cancel]─────┘
//!    │◄──────────────────────[cancel]──────────────┘
//!    │◄──────────────────────────────[reset, from anywhere]─────────────────────────────────
//! ```
//!
//! This module is pure data. The async driver that performs the uploads and
//! polling lives in `bdaymagic-session`.

use std::fmt;

use serde::Serialize;

use crate::error::CoreError;
use crate::job::{GenerationJob, JobStatus};

/// Status line shown while the photo is being uploaded.
pub const UPLOADING_STATUS: &str = "UPLOADING IMAGE...";

// ---------------------------------------------------------------------------
// Phase
// ---------------------------------------------------------------------------

/// Which surface is active, without the data it carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    Upload,
    Preview,
    Processing,
    Result,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Upload => "upload",
            Self::Preview => "preview",
            Self::Processing => "processing",
            Self::Result => "result",
        };
        f.write_str(name)
    }
}

// ---------------------------------------------------------------------------
// Data carried by states
// ---------------------------------------------------------------------------

/// The user's photo after a successful upload.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadedImage {
    /// Publicly retrievable URL of the original photo.
    pub source_url: String,
}

impl UploadedImage {
    pub fn new(source_url: impl Into<String>) -> Self {
        Self {
            source_url: source_url.into(),
        }
    }
}

/// Progress of the generation step, rendered as the live status line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcessingStage {
    Submitting,
    Queued,
    Polling { attempt: u32 },
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Submitting => f.write_str("SUBMITTING JOB..."),
            Self::Queued => f.write_str("QUEUED..."),
            Self::Polling { attempt } => write!(f, "PROCESSING MAGIC... ({attempt})"),
        }
    }
}

// ---------------------------------------------------------------------------
// SessionState
// ---------------------------------------------------------------------------

/// Exactly one of the four lifecycle states.
///
/// Each variant carries the data that state requires, so a `Processing`
/// session always has an uploaded image and a `Result` session always has
/// a non-empty result URL.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SessionState {
    /// No image. `uploading` is set while the storage upload is in flight.
    Upload { uploading: bool },
    /// Image uploaded, no job yet.
    Preview { image: UploadedImage },
    /// Job being submitted or polled. `job` is `None` until submission
    /// returns an id.
    Processing {
        image: UploadedImage,
        job: Option<GenerationJob>,
        stage: ProcessingStage,
    },
    /// Rendering finished.
    Result {
        image: UploadedImage,
        job: GenerationJob,
        result_url: String,
    },
}

impl Default for SessionState {
    fn default() -> Self {
        Self::idle()
    }
}

/// Inputs that drive [`SessionState::transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// The user chose or dropped a file; the upload is about to start.
    FileSelected,
    UploadSucceeded(UploadedImage),
    UploadFailed,
    /// The user asked to render the effect.
    Generate,
    JobSubmitted { job_id: String },
    /// A non-terminal status was observed on poll `attempt`.
    JobProgress { attempt: u32, status: JobStatus },
    JobCompleted { result_url: String },
    GenerationFailed,
    Cancel,
    Reset,
}

impl SessionEvent {
    fn action(&self) -> &'static str {
        match self {
            Self::FileSelected => "select a file",
            Self::UploadSucceeded(_) => "finish an upload",
            Self::UploadFailed => "fail an upload",
            Self::Generate => "generate",
            Self::JobSubmitted { .. } => "record a submitted job",
            Self::JobProgress { .. } => "record job progress",
            Self::JobCompleted { .. } => "complete a job",
            Self::GenerationFailed => "fail a generation",
            Self::Cancel => "cancel",
            Self::Reset => "reset",
        }
    }
}

impl SessionState {
    /// The initial state: nothing uploaded, nothing in flight.
    pub fn idle() -> Self {
        Self::Upload { uploading: false }
    }

    pub fn phase(&self) -> Phase {
        match self {
            Self::Upload { .. } => Phase::Upload,
            Self::Preview { .. } => Phase::Preview,
            Self::Processing { .. } => Phase::Processing,
            Self::Result { .. } => Phase::Result,
        }
    }

    pub fn image(&self) -> Option<&UploadedImage> {
        match self {
            Self::Upload { .. } => None,
            Self::Preview { image }
            | Self::Processing { image, .. }
            | Self::Result { image, .. } => Some(image),
        }
    }

    pub fn job(&self) -> Option<&GenerationJob> {
        match self {
            Self::Processing { job, .. } => job.as_ref(),
            Self::Result { job, .. } => Some(job),
            _ => None,
        }
    }

    pub fn result_url(&self) -> Option<&str> {
        match self {
            Self::Result { result_url, .. } => Some(result_url),
            _ => None,
        }
    }

    /// An upload or a generation is in flight.
    pub fn is_busy(&self) -> bool {
        matches!(
            self,
            Self::Upload { uploading: true } | Self::Processing { .. }
        )
    }

    /// Live status line for the busy states.
    pub fn status_text(&self) -> Option<String> {
        match self {
            Self::Upload { uploading: true } => Some(UPLOADING_STATUS.to_string()),
            Self::Processing { stage, .. } => Some(stage.to_string()),
            _ => None,
        }
    }

    /// Compute the state that follows `event`, or explain why the event is
    /// not allowed here. `self` is never modified.
    pub fn transition(&self, event: SessionEvent) -> Result<SessionState, CoreError> {
        use SessionEvent as E;
        use SessionState as S;

        match (self, event) {
            (_, E::Reset) => Ok(S::idle()),

            // -- Upload ---------------------------------------------------------
            (S::Upload { uploading: false }, E::FileSelected) => {
                Ok(S::Upload { uploading: true })
            }
            (S::Upload { uploading: true } | S::Processing { .. }, E::FileSelected) => Err(
                CoreError::Conflict("Please wait for the current image to finish".into()),
            ),
            (S::Upload { uploading: true }, E::UploadSucceeded(image)) => Ok(S::Preview { image }),
            (S::Upload { uploading: true }, E::UploadFailed | E::Cancel) => Ok(S::idle()),
            (S::Upload { uploading: false }, E::Cancel) => Ok(S::idle()),
            (S::Upload { .. }, E::Generate) => {
                Err(CoreError::Validation("No image uploaded.".into()))
            }

            // -- Preview --------------------------------------------------------
            (S::Preview { image }, E::Generate) => Ok(S::Processing {
                image: image.clone(),
                job: None,
                stage: ProcessingStage::Submitting,
            }),
            (S::Preview { .. }, E::Cancel) => Ok(S::idle()),

            // -- Processing -----------------------------------------------------
            (S::Processing { .. }, E::Generate) => Err(CoreError::Conflict(
                "A generation is already in progress".into(),
            )),
            (S::Processing { image, job: None, .. }, E::JobSubmitted { job_id }) => {
                Ok(S::Processing {
                    image: image.clone(),
                    job: Some(GenerationJob::new(job_id)),
                    stage: ProcessingStage::Queued,
                })
            }
            (S::Processing { image, job: Some(job), .. }, E::JobProgress { attempt, status })
                if !status.is_terminal() =>
            {
                let mut job = job.clone();
                job.record_status(status)?;
                Ok(S::Processing {
                    image: image.clone(),
                    job: Some(job),
                    stage: ProcessingStage::Polling { attempt },
                })
            }
            (S::Processing { image, job: Some(job), .. }, E::JobCompleted { result_url }) => {
                let mut job = job.clone();
                job.complete(&result_url)?;
                Ok(S::Result {
                    image: image.clone(),
                    job,
                    result_url,
                })
            }
            (S::Processing { image, .. }, E::GenerationFailed | E::Cancel) => Ok(S::Preview {
                image: image.clone(),
            }),

            (state, event) => Err(CoreError::InvalidTransition {
                phase: state.phase(),
                action: event.action(),
            }),
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
