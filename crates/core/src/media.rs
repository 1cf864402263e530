//! Selected media files, storage-key derivation and result filenames.

use std::path::Path;

use crate::error::CoreError;
use crate::ids;

// ---------------------------------------------------------------------------
// Constants
// ---------------------------------------------------------------------------

/// Prefix of every storage key written by the uploader.
pub const STORAGE_KEY_PREFIX: &str = "media/";

/// Extension used when the selected file name carries none.
pub const DEFAULT_EXTENSION: &str = "jpg";

/// Prefix of the filename suggested for a downloaded result.
pub const RESULT_FILENAME_PREFIX: &str = "birthday_magic_";

/// Content type assumed for files with an unrecognised extension.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Message shown when a non-image file is selected.
pub const INVALID_IMAGE_MESSAGE: &str = "Please select a valid image file (JPG, PNG).";

/// Known image extensions and their MIME types.
const IMAGE_TYPES: &[(&str, &str)] = &[
    ("jpg", "image/jpeg"),
    ("jpeg", "image/jpeg"),
    ("png", "image/png"),
    ("webp", "image/webp"),
    ("gif", "image/gif"),
    ("bmp", "image/bmp"),
    ("heic", "image/heic"),
    ("avif", "image/avif"),
];

// ---------------------------------------------------------------------------
// MediaFile
// ---------------------------------------------------------------------------

/// A file chosen by the user, held in memory until it is uploaded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaFile {
    /// Original file name, used only for its extension.
    pub name: String,
    /// Declared MIME type, forwarded as `Content-Type` on upload.
    pub content_type: String,
    /// Raw file contents.
    pub bytes: Vec<u8>,
}

impl MediaFile {
    pub fn new(name: impl Into<String>, content_type: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            name: name.into(),
            content_type: content_type.into(),
            bytes,
        }
    }

    /// Build a file from a path on disk and its already-read contents,
    /// inferring the content type from the extension.
    pub fn from_path_and_bytes(path: &Path, bytes: Vec<u8>) -> Self {
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        let content_type = content_type_for(&name).to_string();
        Self::new(name, content_type, bytes)
    }

    /// Extension of the file name, or [`DEFAULT_EXTENSION`].
    pub fn extension(&self) -> &str {
        file_extension(&self.name)
    }

    /// Whether the declared content type is an image type.
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }

    /// Reject files whose content type is not `image/*`.
    pub fn validate_image(&self) -> Result<(), CoreError> {
        if self.is_image() {
            Ok(())
        } else {
            Err(CoreError::Validation(INVALID_IMAGE_MESSAGE.to_string()))
        }
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Text after the last `.` of `name`, or [`DEFAULT_EXTENSION`] when there is
/// no dot or nothing follows it.
pub fn file_extension(name: &str) -> &str {
    match name.rsplit_once('.') {
        Some((_, ext)) if !ext.is_empty() => ext,
        _ => DEFAULT_EXTENSION,
    }
}

/// MIME type for a file name, by extension (case-insensitive).
pub fn content_type_for(name: &str) -> &'static str {
    let ext = file_extension(name).to_ascii_lowercase();
    IMAGE_TYPES
        .iter()
        .find(|(known, _)| *known == ext)
        .map(|(_, mime)| *mime)
        .unwrap_or(FALLBACK_CONTENT_TYPE)
}

/// Storage key for a newly uploaded file: `media/<id>.<ext>`.
pub fn storage_key(id: &str, extension: &str) -> String {
    format!("{STORAGE_KEY_PREFIX}{id}.{extension}")
}

/// Public URL of a stored object. Computed locally; the storage API never
/// returns it.
pub fn public_url(asset_host: &str, key: &str) -> String {
    format!("{}/{}", asset_host.trim_end_matches('/'), key)
}

/// Fresh filename for a downloaded result, e.g. `birthday_magic_Ab3dE9xZ.png`.
pub fn result_filename() -> String {
    format!(
        "{RESULT_FILENAME_PREFIX}{}.png",
        ids::generate_id_with_length(ids::FILENAME_SUFFIX_LENGTH)
    )
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
