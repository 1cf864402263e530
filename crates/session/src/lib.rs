//! Session driver for the upload → preview → processing → result pipeline.
//!
//! [`Session`] owns the single active [`SessionState`], runs the storage
//! and effects clients in the right order, and threads a cancellation token
//! into whatever is in flight so that cancel and reset actually stop
//! outstanding I/O. Presentation code subscribes to state changes and
//! notices through [`observer`] instead of being driven directly.
//!
//! [`SessionState`]: bdaymagic_core::session::SessionState

pub mod driver;
pub mod error;
pub mod notice;
pub mod observer;

pub use driver::Session;
pub use error::SessionError;
pub use notice::SessionNotice;
pub use observer::{run_observer, SessionObserver};
