//! The session driver.
//!
//! Every state change goes through [`SessionState::transition`] while the
//! in-flight lock is held, so a cancel or reset can never interleave with a
//! client result being applied. Each upload or generation runs under its
//! own [`CancellationToken`] and epoch; once a cancel or reset bumps the
//! epoch, late results from the superseded operation are discarded.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use bdaymagic_core::error::CoreError;
use bdaymagic_core::media::MediaFile;
use bdaymagic_core::session::{SessionEvent, SessionState, UploadedImage};
use bdaymagic_effects::{
    DownloadOutcome, EffectsError, EffectsService, ImageStore, PollProgress, ResultDownloader,
};

use crate::error::SessionError;
use crate::notice::SessionNotice;

/// Broadcast channel capacity for notices.
const NOTICE_CHANNEL_CAPACITY: usize = 64;

/// Bookkeeping for the operation currently allowed to change the state.
#[derive(Default)]
struct Inflight {
    epoch: u64,
    token: Option<CancellationToken>,
}

/// Handle on a started upload or generation.
struct Operation {
    epoch: u64,
    token: CancellationToken,
    /// State right after the operation's first transition.
    started: SessionState,
}

/// One user's upload-through-result session.
///
/// Share it behind an `Arc`: actions such as [`cancel`](Self::cancel) are
/// meant to be called while [`generate`](Self::generate) is still awaiting.
pub struct Session {
    store: Arc<dyn ImageStore>,
    effects: Arc<dyn EffectsService>,
    downloader: Arc<dyn ResultDownloader>,
    state_tx: watch::Sender<SessionState>,
    notice_tx: broadcast::Sender<SessionNotice>,
    inflight: Mutex<Inflight>,
}

impl Session {
    pub fn new(
        store: Arc<dyn ImageStore>,
        effects: Arc<dyn EffectsService>,
        downloader: Arc<dyn ResultDownloader>,
    ) -> Self {
        let (state_tx, _) = watch::channel(SessionState::idle());
        let (notice_tx, _) = broadcast::channel(NOTICE_CHANNEL_CAPACITY);
        Self {
            store,
            effects,
            downloader,
            state_tx,
            notice_tx,
            inflight: Mutex::new(Inflight::default()),
        }
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> SessionState {
        self.state_tx.borrow().clone()
    }

    /// Receive every state change. The receiver starts at the current state.
    pub fn subscribe_state(&self) -> watch::Receiver<SessionState> {
        self.state_tx.subscribe()
    }

    /// Receive user-facing notices published from now on.
    pub fn subscribe_notices(&self) -> broadcast::Receiver<SessionNotice> {
        self.notice_tx.subscribe()
    }

    // ---- actions ----

    /// Upload `file` and move to `Preview`.
    ///
    /// Rejected while another upload or a generation is running. On failure
    /// the session returns to `Upload` and an error notice is published.
    pub async fn select_file(&self, file: MediaFile) -> Result<UploadedImage, SessionError> {
        if let Err(e) = file.validate_image() {
            return Err(self.reject(e));
        }

        let op = self
            .begin(SessionEvent::FileSelected)
            .map_err(|e| self.reject(e))?;

        tracing::info!(file = %file.name, size = file.bytes.len(), "Uploading selected image");

        match self.store.upload(&file, &op.token).await {
            Ok(image) => {
                self.finish(&op, SessionEvent::UploadSucceeded(image.clone()))?;
                Ok(image)
            }
            Err(EffectsError::Cancelled) => Err(SessionError::Abandoned),
            Err(e) => {
                self.finish(&op, SessionEvent::UploadFailed)?;
                let err = SessionError::Upload(e);
                tracing::warn!(error = %err, "Upload failed");
                self.notify(SessionNotice::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Submit the uploaded image, poll until the job finishes and move to
    /// `Result`. Returns the result URL.
    ///
    /// Any failure returns the session to `Preview` with the image kept, so
    /// the user can try again without re-uploading.
    pub async fn generate(&self) -> Result<String, SessionError> {
        let op = self
            .begin(SessionEvent::Generate)
            .map_err(|e| self.reject(e))?;

        let Some(image) = op.started.image().cloned() else {
            return Err(SessionError::NotReady);
        };

        match self.run_generation(&op, &image.source_url).await {
            Ok(result_url) => {
                self.finish(
                    &op,
                    SessionEvent::JobCompleted {
                        result_url: result_url.clone(),
                    },
                )?;
                tracing::info!(result_url = %result_url, "Generation finished");
                Ok(result_url)
            }
            Err(SessionError::Generation(EffectsError::Cancelled) | SessionError::Abandoned) => {
                Err(SessionError::Abandoned)
            }
            Err(err) => {
                self.finish(&op, SessionEvent::GenerationFailed)?;
                tracing::warn!(error = %err, "Generation failed");
                self.notify(SessionNotice::Error(err.to_string()));
                Err(err)
            }
        }
    }

    /// Abandon the current step.
    ///
    /// From `Preview` this clears the uploaded image; while uploading it
    /// returns to `Upload`; while processing it returns to `Preview`. Any
    /// outstanding request or poll wait is cancelled.
    pub fn cancel(&self) -> Result<(), SessionError> {
        let mut inflight = self.lock_inflight();
        self.apply(SessionEvent::Cancel)?;
        Self::abort(&mut inflight);
        tracing::info!(state = %self.state_tx.borrow().phase(), "Session cancelled");
        Ok(())
    }

    /// Clear everything and return to `Upload`, cancelling whatever is in
    /// flight. Always succeeds and is idempotent.
    pub fn reset(&self) {
        let mut inflight = self.lock_inflight();
        Self::abort(&mut inflight);
        if let Err(e) = self.apply(SessionEvent::Reset) {
            tracing::error!(error = %e, "Reset transition rejected");
        }
        tracing::info!("Session reset");
    }

    /// Save the result image. Only valid in `Result`.
    ///
    /// Publishes `DownloadStarted` and, whatever happens, a matching
    /// `DownloadFinished`.
    pub async fn download(&self) -> Result<DownloadOutcome, SessionError> {
        let url = self
            .state_tx
            .borrow()
            .result_url()
            .map(str::to_string)
            .ok_or(SessionError::NotReady)?;

        self.notify(SessionNotice::DownloadStarted { url: url.clone() });
        let outcome = self.downloader.download(&url).await;
        self.notify(SessionNotice::DownloadFinished(outcome.clone()));
        Ok(outcome)
    }

    // ---- private helpers ----

    async fn run_generation(&self, op: &Operation, image_url: &str) -> Result<String, SessionError> {
        let job_id = self
            .effects
            .submit(image_url, &op.token)
            .await
            .map_err(SessionError::Generation)?;

        self.advance(
            op,
            SessionEvent::JobSubmitted {
                job_id: job_id.clone(),
            },
        )?;

        let on_progress = |progress: PollProgress| {
            let event = SessionEvent::JobProgress {
                attempt: progress.attempt,
                status: progress.status,
            };
            if let Err(e) = self.advance(op, event) {
                tracing::debug!(error = %e, "Dropped progress update");
            }
        };

        let response = self
            .effects
            .poll(&job_id, &op.token, &on_progress)
            .await
            .map_err(SessionError::Generation)?;

        response
            .result_url()
            .map(str::to_string)
            .ok_or(SessionError::MissingResultUrl)
    }

    fn lock_inflight(&self) -> MutexGuard<'_, Inflight> {
        // The guarded data is plain bookkeeping, so a poisoned lock is still
        // consistent.
        self.inflight
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Apply `event` to the published state. Caller holds the in-flight lock.
    fn apply(&self, event: SessionEvent) -> Result<(), CoreError> {
        let mut outcome = Ok(());
        self.state_tx
            .send_if_modified(|state| match state.transition(event) {
                Ok(next) => {
                    let changed = *state != next;
                    *state = next;
                    changed
                }
                Err(e) => {
                    outcome = Err(e);
                    false
                }
            });
        outcome
    }

    /// Start a new operation with `event`, handing out a fresh token.
    fn begin(&self, event: SessionEvent) -> Result<Operation, CoreError> {
        let mut inflight = self.lock_inflight();
        self.apply(event)?;

        inflight.epoch += 1;
        let token = CancellationToken::new();
        inflight.token = Some(token.clone());

        Ok(Operation {
            epoch: inflight.epoch,
            token,
            started: self.state_tx.borrow().clone(),
        })
    }

    /// Apply an intermediate event if `op` is still current.
    fn advance(&self, op: &Operation, event: SessionEvent) -> Result<(), SessionError> {
        let inflight = self.lock_inflight();
        Self::ensure_current(&inflight, op)?;
        self.apply(event)?;
        Ok(())
    }

    /// Apply the final event of `op` and release its token.
    fn finish(&self, op: &Operation, event: SessionEvent) -> Result<(), SessionError> {
        let mut inflight = self.lock_inflight();
        Self::ensure_current(&inflight, op)?;
        inflight.token = None;
        self.apply(event)?;
        Ok(())
    }

    fn ensure_current(inflight: &Inflight, op: &Operation) -> Result<(), SessionError> {
        if inflight.epoch != op.epoch || op.token.is_cancelled() {
            return Err(SessionError::Abandoned);
        }
        Ok(())
    }

    /// Cancel the in-flight token, if any, and invalidate its epoch.
    fn abort(inflight: &mut Inflight) {
        inflight.epoch += 1;
        if let Some(token) = inflight.token.take() {
            token.cancel();
        }
    }

    fn reject(&self, error: CoreError) -> SessionError {
        match &error {
            CoreError::Conflict(_) => {
                tracing::debug!(error = %error, "Ignoring action while busy");
            }
            _ => {
                tracing::warn!(error = %error, "Action rejected");
                self.notify(SessionNotice::Error(error.to_string()));
            }
        }
        SessionError::Rejected(error)
    }

    fn notify(&self, notice: SessionNotice) {
        // No subscribers is fine: nobody is rendering.
        let _ = self.notice_tx.send(notice);
    }
}
