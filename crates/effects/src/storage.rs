//! Upload of the user's photo to publicly addressable storage.
//!
//! The upload is a two-step handshake: ask the provisioning endpoint for a
//! short-lived signed URL for a freshly generated storage key, then `PUT`
//! the raw bytes there. The public URL is derived locally from the asset
//! host and the key.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use bdaymagic_core::config::EffectsConfig;
use bdaymagic_core::ids;
use bdaymagic_core::media::{self, MediaFile};
use bdaymagic_core::session::UploadedImage;

use crate::error::EffectsError;
use crate::http::{cancellable, failure_detail};

/// Anything that can turn a local file into a public URL.
#[async_trait]
pub trait ImageStore: Send + Sync {
    /// Upload `file` and return its public retrieval URL.
    ///
    /// Fails with [`EffectsError::Provisioning`] or [`EffectsError::Upload`],
    /// or [`EffectsError::Cancelled`] if `cancel` fires first.
    async fn upload(
        &self,
        file: &MediaFile,
        cancel: &CancellationToken,
    ) -> Result<UploadedImage, EffectsError>;
}

/// Signed-URL uploader backed by [`reqwest`].
pub struct StorageUploader {
    client: reqwest::Client,
    upload_api_url: String,
    project_id: String,
    asset_host: String,
    request_timeout: Duration,
}

impl StorageUploader {
    pub fn new(client: reqwest::Client, config: &EffectsConfig) -> Self {
        Self {
            client,
            upload_api_url: config.upload_api_url.clone(),
            project_id: config.project_id.clone(),
            asset_host: config.asset_host.clone(),
            request_timeout: config.request_timeout(),
        }
    }

    /// Request a signed write destination for `key`.
    async fn signed_url(&self, key: &str) -> Result<String, EffectsError> {
        let response = self
            .client
            .get(format!("{}/media/get-upload-url", self.upload_api_url))
            .query(&[("fileName", key), ("projectId", self.project_id.as_str())])
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| EffectsError::Provisioning(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EffectsError::Provisioning(failure_detail(response).await));
        }

        let signed_url = response
            .text()
            .await
            .map_err(|e| EffectsError::Provisioning(e.to_string()))?
            .trim()
            .to_string();

        if signed_url.is_empty() {
            return Err(EffectsError::Provisioning(
                "empty signed URL in response".into(),
            ));
        }
        Ok(signed_url)
    }

    /// Write the file bytes to the signed destination.
    async fn put_bytes(&self, signed_url: &str, file: &MediaFile) -> Result<(), EffectsError> {
        let response = self
            .client
            .put(signed_url)
            .header(reqwest::header::CONTENT_TYPE, file.content_type.as_str())
            .body(file.bytes.clone())
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| EffectsError::Upload(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EffectsError::Upload(failure_detail(response).await));
        }
        Ok(())
    }
}

#[async_trait]
impl ImageStore for StorageUploader {
    async fn upload(
        &self,
        file: &MediaFile,
        cancel: &CancellationToken,
    ) -> Result<UploadedImage, EffectsError> {
        let key = media::storage_key(&ids::generate_id(), file.extension());
        tracing::debug!(key = %key, size = file.bytes.len(), "Requesting signed upload URL");

        let signed_url = cancellable(cancel, self.signed_url(&key)).await??;
        cancellable(cancel, self.put_bytes(&signed_url, file)).await??;

        let source_url = media::public_url(&self.asset_host, &key);
        tracing::info!(key = %key, url = %source_url, "Uploaded image to storage");

        Ok(UploadedImage::new(source_url))
    }
}
