//! Retrieval of the rendered result.
//!
//! First tries to fetch the image and save it under a generated
//! `birthday_magic_<id>.png` name. If that fails for any reason the
//! retriever falls back to handing the URL to the platform's link opener
//! and returns instructions for saving it by hand. Downloads never fail
//! from the caller's point of view.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use bdaymagic_core::media;

use crate::http::failure_detail;

/// Instructions shown when the result could not be saved automatically.
pub const MANUAL_SAVE_INSTRUCTIONS: &str =
    "If the image opened in your browser, right-click it and select \"Save image as...\" to download. \
     Otherwise open the link below and save it manually.";

/// Fetch limit used unless [`ResultRetriever::with_request_timeout`] says
/// otherwise.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// How a download attempt ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum DownloadOutcome {
    /// The image was written to `path`.
    Saved { path: PathBuf },
    /// Saving failed; the user has to fetch `url` themselves.
    Fallback {
        url: String,
        suggested_filename: String,
        /// Whether the link was handed to the system opener.
        opened: bool,
        instructions: String,
    },
}

/// Failure of the fetch-and-save path. Never leaves this module.
#[derive(Debug, thiserror::Error)]
enum DownloadError {
    #[error("fetch failed: {0}")]
    Fetch(#[from] reqwest::Error),

    #[error("fetch failed: {0}")]
    Status(String),

    #[error("could not write {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Saves a result URL somewhere the user can reach it.
#[async_trait]
pub trait ResultDownloader: Send + Sync {
    async fn download(&self, url: &str) -> DownloadOutcome;
}

/// Fetch-and-save retriever backed by [`reqwest`] and `tokio::fs`.
pub struct ResultRetriever {
    client: reqwest::Client,
    download_dir: PathBuf,
    open_links: bool,
    request_timeout: Duration,
}

impl ResultRetriever {
    /// `open_links` controls whether the fallback launches the system
    /// opener for the result URL.
    pub fn new(client: reqwest::Client, download_dir: impl Into<PathBuf>, open_links: bool) -> Self {
        Self {
            client,
            download_dir: download_dir.into(),
            open_links,
            request_timeout: DEFAULT_REQUEST_TIMEOUT,
        }
    }

    /// Bound the result fetch; a fetch that takes longer falls back to the
    /// direct link.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn download_dir(&self) -> &Path {
        &self.download_dir
    }

    async fn fetch_and_save(&self, url: &str, filename: &str) -> Result<PathBuf, DownloadError> {
        let response = self
            .client
            .get(url)
            .timeout(self.request_timeout)
            .send()
            .await?;
        if !response.status().is_success() {
            return Err(DownloadError::Status(failure_detail(response).await));
        }
        let bytes = response.bytes().await?;

        let path = self.download_dir.join(filename);
        tokio::fs::write(&path, &bytes)
            .await
            .map_err(|source| DownloadError::Write {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

#[async_trait]
impl ResultDownloader for ResultRetriever {
    async fn download(&self, url: &str) -> DownloadOutcome {
        let filename = media::result_filename();

        match self.fetch_and_save(url, &filename).await {
            Ok(path) => {
                tracing::info!(path = %path.display(), "Saved result image");
                DownloadOutcome::Saved { path }
            }
            Err(e) => {
                tracing::warn!(error = %e, url, "Result download failed, falling back to direct link");
                let opened = self.open_links && open_link(url).await;
                DownloadOutcome::Fallback {
                    url: url.to_string(),
                    suggested_filename: filename,
                    opened,
                    instructions: MANUAL_SAVE_INSTRUCTIONS.to_string(),
                }
            }
        }
    }
}

const NO_ARGS: &[&str] = &[];

/// `start` under `cmd` would re-parse the URL and cut it at `&`.
const WINDOWS_OPENER_ARGS: &[&str] = &["url.dll,FileProtocolHandler"];

/// Program and leading arguments that open a link on `os` (a
/// `std::env::consts::OS` value). The URL is appended as a single argument
/// and never passes through a shell.
fn opener_command(os: &str) -> (&'static str, &'static [&'static str]) {
    match os {
        "macos" => ("open", NO_ARGS),
        "windows" => ("rundll32", WINDOWS_OPENER_ARGS),
        _ => ("xdg-open", NO_ARGS),
    }
}

/// Hand `url` to the platform's default opener. Returns whether the opener
/// could be launched and exited successfully.
async fn open_link(url: &str) -> bool {
    let (program, args) = opener_command(std::env::consts::OS);
    let mut command = tokio::process::Command::new(program);
    command.args(args);

    match command.arg(url).status().await {
        Ok(status) if status.success() => true,
        Ok(status) => {
            tracing::warn!(%status, "Link opener exited unsuccessfully");
            false
        }
        Err(e) => {
            tracing::warn!(error = %e, "Could not launch link opener");
            false
        }
    }
}
