use bdaymagic_core::error::CoreError;
use bdaymagic_effects::EffectsError;

/// Why a session action did not complete.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    /// The action is not allowed in the current state (or the input was
    /// invalid). The state is unchanged.
    #[error(transparent)]
    Rejected(#[from] CoreError),

    /// The storage upload failed; the session is back in `Upload`.
    #[error("Upload failed: {0}")]
    Upload(EffectsError),

    /// Submission or polling failed; the session is back in `Preview`.
    #[error("{0}")]
    Generation(EffectsError),

    /// The job completed without a usable image URL.
    #[error("No image URL in response")]
    MissingResultUrl,

    /// There is no result to download.
    #[error("No result is available to download")]
    NotReady,

    /// A cancel or reset superseded the operation; its outcome was
    /// discarded.
    #[error("Operation was cancelled")]
    Abandoned,
}
