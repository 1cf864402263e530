use crate::session::Phase;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CoreError {
    #[error("{0}")]
    Validation(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Cannot {action} while in the {phase} state")]
    InvalidTransition { phase: Phase, action: &'static str },
}
