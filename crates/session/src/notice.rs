use serde::Serialize;

use bdaymagic_effects::DownloadOutcome;

/// User-facing messages published by the session alongside state changes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum SessionNotice {
    /// Something failed; show the message and wait for a fresh action.
    Error(String),
    /// A download started. Presentation shows a busy affordance.
    DownloadStarted { url: String },
    /// A download ended, successfully or via the fallback. Always follows
    /// `DownloadStarted`.
    DownloadFinished(DownloadOutcome),
}
