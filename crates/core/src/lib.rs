//! Pure domain layer for the birthday-magic photo effect pipeline.
//!
//! Holds everything that does not perform I/O: identifier generation,
//! configuration, media helpers, job wire types and the session state
//! machine's transition rules. The HTTP clients live in
//! `bdaymagic-effects` and the session driver in `bdaymagic-session`.

pub mod config;
pub mod error;
pub mod ids;
pub mod job;
pub mod media;
pub mod session;
