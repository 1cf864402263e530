//! HTTP clients for the remote image-effects service.
//!
//! - [`storage`]: signed-URL upload of the user's photo.
//! - [`api`]: job submission and bounded status polling.
//! - [`download`]: fetch-and-save of the rendered result with a
//!   direct-link fallback.
//!
//! Each client sits behind an `async_trait` so the session driver can be
//! exercised against in-memory fakes.

pub mod api;
pub mod download;
pub mod error;
pub mod storage;

mod http;

pub use api::{EffectsApi, EffectsService, PollProgress};
pub use download::{DownloadOutcome, ResultDownloader, ResultRetriever};
pub use error::EffectsError;
pub use storage::{ImageStore, StorageUploader};
