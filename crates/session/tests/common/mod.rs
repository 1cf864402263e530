//! In-memory backends for driving a [`Session`] without a network.

#![allow(dead_code)]

use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;

use bdaymagic_core::job::{JobStatus, RenderOutput, StatusResponse};
use bdaymagic_core::media::MediaFile;
use bdaymagic_core::session::{SessionState, UploadedImage};
use bdaymagic_effects::{
    DownloadOutcome, EffectsError, EffectsService, ImageStore, PollProgress, ResultDownloader,
};
use bdaymagic_session::{Session, SessionNotice, SessionObserver};

pub const SOURCE_URL: &str = "https://assets.dressr.ai/media/abc.png";
pub const RESULT_URL: &str = "https://cdn.example/out.png";

/// How a fake call ends.
#[derive(Clone)]
pub enum Outcome<T> {
    Succeed(T),
    Fail(EffectsError),
    /// Block until cancelled, then report `Cancelled`.
    Hang,
}

// ---------------------------------------------------------------------------
// FakeStore
// ---------------------------------------------------------------------------

pub struct FakeStore {
    pub outcome: Outcome<String>,
    pub calls: AtomicU32,
    pub started: Notify,
}

impl FakeStore {
    pub fn new(outcome: Outcome<String>) -> Self {
        Self {
            outcome,
            calls: AtomicU32::new(0),
            started: Notify::new(),
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageStore for FakeStore {
    async fn upload(
        &self,
        _file: &MediaFile,
        cancel: &CancellationToken,
    ) -> Result<UploadedImage, EffectsError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.notify_one();
        match &self.outcome {
            Outcome::Succeed(url) => Ok(UploadedImage::new(url.clone())),
            Outcome::Fail(e) => Err(e.clone()),
            Outcome::Hang => {
                cancel.cancelled().await;
                Err(EffectsError::Cancelled)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// FakeEffects
// ---------------------------------------------------------------------------

pub struct FakeEffects {
    pub submit: Outcome<String>,
    /// Non-terminal statuses reported before `poll` finishes.
    pub progress: Vec<JobStatus>,
    pub poll: Outcome<StatusResponse>,
    pub submitted_urls: Mutex<Vec<String>>,
    pub polled_jobs: Mutex<Vec<String>>,
    pub submit_started: Notify,
    pub poll_started: Notify,
    pub poll_cancelled: AtomicU32,
}

impl FakeEffects {
    pub fn new(submit: Outcome<String>, progress: Vec<JobStatus>, poll: Outcome<StatusResponse>) -> Self {
        Self {
            submit,
            progress,
            poll,
            submitted_urls: Mutex::new(Vec::new()),
            polled_jobs: Mutex::new(Vec::new()),
            submit_started: Notify::new(),
            poll_started: Notify::new(),
            poll_cancelled: AtomicU32::new(0),
        }
    }

    /// Submission returns `abc123`; one `processing` tick, then completion
    /// with [`RESULT_URL`].
    pub fn completing() -> Self {
        Self::new(
            Outcome::Succeed("abc123".into()),
            vec![JobStatus::Processing],
            Outcome::Succeed(completed(Some(RESULT_URL))),
        )
    }
}

#[async_trait]
impl EffectsService for FakeEffects {
    async fn submit(
        &self,
        image_url: &str,
        cancel: &CancellationToken,
    ) -> Result<String, EffectsError> {
        self.submitted_urls.lock().unwrap().push(image_url.to_string());
        self.submit_started.notify_one();
        match &self.submit {
            Outcome::Succeed(id) => Ok(id.clone()),
            Outcome::Fail(e) => Err(e.clone()),
            Outcome::Hang => {
                cancel.cancelled().await;
                Err(EffectsError::Cancelled)
            }
        }
    }

    async fn poll(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
        on_progress: &(dyn Fn(PollProgress) + Send + Sync),
    ) -> Result<StatusResponse, EffectsError> {
        self.polled_jobs.lock().unwrap().push(job_id.to_string());
        for (i, status) in self.progress.iter().enumerate() {
            on_progress(PollProgress {
                attempt: i as u32 + 1,
                max_polls: 60,
                status: *status,
            });
        }
        self.poll_started.notify_one();
        match &self.poll {
            Outcome::Succeed(response) => Ok(response.clone()),
            Outcome::Fail(e) => Err(e.clone()),
            Outcome::Hang => {
                cancel.cancelled().await;
                self.poll_cancelled.fetch_add(1, Ordering::SeqCst);
                Err(EffectsError::Cancelled)
            }
        }
    }
}

/// A `completed` status response, optionally carrying a result image.
pub fn completed(image: Option<&str>) -> StatusResponse {
    StatusResponse {
        status: "completed".into(),
        result: Some(vec![RenderOutput {
            image: image.map(str::to_string),
        }]),
        error: None,
    }
}

// ---------------------------------------------------------------------------
// FakeDownloader
// ---------------------------------------------------------------------------

pub struct FakeDownloader {
    pub urls: Mutex<Vec<String>>,
}

#[async_trait]
impl ResultDownloader for FakeDownloader {
    async fn download(&self, url: &str) -> DownloadOutcome {
        self.urls.lock().unwrap().push(url.to_string());
        DownloadOutcome::Saved {
            path: PathBuf::from("/tmp/birthday_magic_test.png"),
        }
    }
}

// ---------------------------------------------------------------------------
// Harness
// ---------------------------------------------------------------------------

pub struct Harness {
    pub session: Arc<Session>,
    pub store: Arc<FakeStore>,
    pub effects: Arc<FakeEffects>,
    pub downloader: Arc<FakeDownloader>,
}

pub fn harness(store: FakeStore, effects: FakeEffects) -> Harness {
    let store = Arc::new(store);
    let effects = Arc::new(effects);
    let downloader = Arc::new(FakeDownloader {
        urls: Mutex::new(Vec::new()),
    });
    let session = Arc::new(Session::new(
        store.clone(),
        effects.clone(),
        downloader.clone(),
    ));
    Harness {
        session,
        store,
        effects,
        downloader,
    }
}

pub fn photo() -> MediaFile {
    MediaFile::new("photo.png", "image/png", b"png".to_vec())
}

pub fn preview_state() -> SessionState {
    SessionState::Preview {
        image: UploadedImage::new(SOURCE_URL),
    }
}

// ---------------------------------------------------------------------------
// Recorder
// ---------------------------------------------------------------------------

/// Observer that stores everything it is shown.
#[derive(Default, Clone)]
pub struct Recorder {
    pub states: Arc<Mutex<Vec<SessionState>>>,
    pub notices: Arc<Mutex<Vec<SessionNotice>>>,
}

impl SessionObserver for Recorder {
    fn on_state(&mut self, state: &SessionState) {
        self.states.lock().unwrap().push(state.clone());
    }

    fn on_notice(&mut self, notice: &SessionNotice) {
        self.notices.lock().unwrap().push(notice.clone());
    }
}
