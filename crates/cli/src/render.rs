//! Plain-text terminal rendering of session output.

use std::io::Write;

use bdaymagic_core::session::SessionState;
use bdaymagic_effects::DownloadOutcome;
use bdaymagic_session::{SessionNotice, SessionObserver};

/// Writes one line per visible state change and per notice.
///
/// Repeated identical state lines are suppressed, so re-publishing the same
/// status does not spam the terminal.
pub struct TerminalRenderer<W> {
    out: W,
    last_line: Option<String>,
}

impl<W: Write + Send> TerminalRenderer<W> {
    pub fn new(out: W) -> Self {
        Self {
            out,
            last_line: None,
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn line(&mut self, text: &str) {
        if let Err(e) = writeln!(self.out, "{text}") {
            tracing::debug!(error = %e, "Terminal write failed");
        }
    }
}

impl<W: Write + Send> SessionObserver for TerminalRenderer<W> {
    fn on_state(&mut self, state: &SessionState) {
        let text = describe_state(state);
        if self.last_line.as_deref() == Some(text.as_str()) {
            return;
        }
        self.line(&text);
        self.last_line = Some(text);
    }

    fn on_notice(&mut self, notice: &SessionNotice) {
        for text in describe_notice(notice) {
            self.line(&text);
        }
    }
}

/// The status line for `state`.
pub fn describe_state(state: &SessionState) -> String {
    match state {
        SessionState::Upload { uploading: false } => "Waiting for a photo".to_string(),
        SessionState::Preview { image } => format!("Photo uploaded: {}", image.source_url),
        SessionState::Result { result_url, .. } => {
            format!("Your birthday photo is ready: {result_url}")
        }
        busy => busy.status_text().unwrap_or_default(),
    }
}

/// Lines shown for `notice`.
pub fn describe_notice(notice: &SessionNotice) -> Vec<String> {
    match notice {
        SessionNotice::Error(message) => vec![format!("Error: {message}")],
        SessionNotice::DownloadStarted { .. } => vec!["Downloading result...".to_string()],
        SessionNotice::DownloadFinished(DownloadOutcome::Saved { path }) => {
            vec![format!("Saved to {}", path.display())]
        }
        SessionNotice::DownloadFinished(DownloadOutcome::Fallback {
            url,
            suggested_filename,
            opened,
            instructions,
        }) => {
            let mut lines = vec!["Could not save the image automatically.".to_string()];
            if *opened {
                lines.push("Opened the image in your browser.".to_string());
            }
            lines.push(instructions.clone());
            lines.push(format!("Link: {url}"));
            lines.push(format!("Suggested filename: {suggested_filename}"));
            lines
        }
    }
}
