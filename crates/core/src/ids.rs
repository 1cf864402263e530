//! Random opaque identifiers for storage keys and download filenames.
//!
//! Identifiers only need to avoid collisions between uploads; they are
//! never used as secrets.

use rand::Rng;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Length of identifiers produced by [`generate_id`].
pub const DEFAULT_ID_LENGTH: usize = 21;

/// Length of the suffix used for downloaded result filenames.
pub const FILENAME_SUFFIX_LENGTH: usize = 8;

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Generate a [`DEFAULT_ID_LENGTH`]-character alphanumeric identifier.
pub fn generate_id() -> String {
    generate_id_with_length(DEFAULT_ID_LENGTH)
}

/// Generate an identifier of exactly `length` characters drawn from
/// `A-Z`, `a-z` and `0-9`.
pub fn generate_id_with_length(length: usize) -> String {
    rand::rng()
        .sample_iter(&rand::distr::Alphanumeric)
        .take(length)
        .map(char::from)
        .collect()
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
