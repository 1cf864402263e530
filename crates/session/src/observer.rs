//! Presentation binding.
//!
//! A [`SessionObserver`] is told about every state change and notice; it
//! never drives the session itself. [`run_observer`] pumps both channels
//! into an observer until the session is dropped or `cancel` fires.

use tokio::sync::broadcast::error::RecvError;
use tokio::sync::{broadcast, watch};
use tokio_util::sync::CancellationToken;

use bdaymagic_core::session::SessionState;

use crate::notice::SessionNotice;

/// Renders session output on some surface (terminal, log, test recorder).
pub trait SessionObserver: Send {
    /// Called with the initial state and after every change.
    fn on_state(&mut self, state: &SessionState);

    /// Called for each published notice.
    fn on_notice(&mut self, notice: &SessionNotice);
}

/// Feed `observer` until both channels close or `cancel` is triggered.
///
/// Intermediate states may be coalesced if the observer falls behind; the
/// latest state is always delivered.
pub async fn run_observer<O: SessionObserver>(
    mut states: watch::Receiver<SessionState>,
    mut notices: broadcast::Receiver<SessionNotice>,
    observer: &mut O,
    cancel: CancellationToken,
) {
    let initial = states.borrow_and_update().clone();
    observer.on_state(&initial);

    let mut states_open = true;
    let mut notices_open = true;

    while states_open || notices_open {
        tokio::select! {
            _ = cancel.cancelled() => break,
            changed = states.changed(), if states_open => {
                match changed {
                    Ok(()) => {
                        let state = states.borrow_and_update().clone();
                        observer.on_state(&state);
                    }
                    Err(_) => states_open = false,
                }
            }
            notice = notices.recv(), if notices_open => {
                match notice {
                    Ok(notice) => observer.on_notice(&notice),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(skipped, "Observer lagged behind session notices");
                    }
                    Err(RecvError::Closed) => notices_open = false,
                }
            }
        }
    }
}
