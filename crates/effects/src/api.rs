//! REST client for the image-effects job API.
//!
//! Wraps job submission (`POST /image-gen`) and status checks
//! (`GET /image-gen/{userId}/{jobId}/status`), plus the bounded polling
//! loop that drives a job to a terminal state.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

use bdaymagic_core::config::EffectsConfig;
use bdaymagic_core::job::{JobStatus, StatusResponse};

use crate::error::EffectsError;
use crate::http::{api_headers, cancellable, failure_detail};

/// Model and tool type for the effects endpoint.
const IMAGE_EFFECTS_MODEL: &str = "image-effects";

/// Notification emitted after every non-terminal status check.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PollProgress {
    /// 1-based number of the status check that just completed.
    pub attempt: u32,
    /// Attempts allowed before timing out.
    pub max_polls: u32,
    /// Status reported by the service on this attempt.
    pub status: JobStatus,
}

/// Submit-and-track access to the effects service.
#[async_trait]
pub trait EffectsService: Send + Sync {
    /// Queue a render of `image_url`. Returns the job id.
    async fn submit(&self, image_url: &str, cancel: &CancellationToken)
        -> Result<String, EffectsError>;

    /// Poll `job_id` until it completes, fails, times out or is cancelled.
    ///
    /// `on_progress` is invoked once per non-terminal status check.
    async fn poll(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
        on_progress: &(dyn Fn(PollProgress) + Send + Sync),
    ) -> Result<StatusResponse, EffectsError>;
}

/// JSON body of `POST /image-gen`.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct SubmitRequest<'a> {
    model: &'a str,
    tool_type: &'a str,
    effect_id: &'a str,
    image_url: &'a str,
    user_id: &'a str,
    remove_watermark: bool,
    is_private: bool,
}

/// Response to `POST /image-gen`. Other fields are ignored.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SubmitResponse {
    #[serde(default)]
    job_id: Option<String>,
}

/// HTTP client for the effects job API.
pub struct EffectsApi {
    client: reqwest::Client,
    api_url: String,
    origin: String,
    user_id: String,
    effect_id: String,
    poll_interval: Duration,
    request_timeout: Duration,
    max_polls: u32,
}

impl EffectsApi {
    pub fn new(client: reqwest::Client, config: &EffectsConfig) -> Self {
        Self {
            client,
            api_url: config.effects_api_url.clone(),
            origin: config.origin.clone(),
            user_id: config.user_id.clone(),
            effect_id: config.effect_id.clone(),
            poll_interval: config.poll_interval(),
            request_timeout: config.request_timeout(),
            max_polls: config.max_polls,
        }
    }

    /// Perform one status request.
    ///
    /// Only HTTP-level problems are errors here; a `failed` job is returned
    /// as a normal response.
    pub async fn check_status(&self, job_id: &str) -> Result<StatusResponse, EffectsError> {
        let response = self
            .client
            .get(format!(
                "{}/image-gen/{}/{}/status",
                self.api_url, self.user_id, job_id
            ))
            .headers(api_headers(&self.origin))
            .timeout(self.request_timeout)
            .send()
            .await
            .map_err(|e| EffectsError::StatusCheck(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EffectsError::StatusCheck(failure_detail(response).await));
        }

        response
            .json::<StatusResponse>()
            .await
            .map_err(|e| EffectsError::StatusCheck(format!("invalid status body: {e}")))
    }

    async fn submit_request(&self, image_url: &str) -> Result<String, EffectsError> {
        let body = SubmitRequest {
            model: IMAGE_EFFECTS_MODEL,
            tool_type: IMAGE_EFFECTS_MODEL,
            effect_id: &self.effect_id,
            image_url,
            user_id: &self.user_id,
            remove_watermark: true,
            is_private: true,
        };

        let response = self
            .client
            .post(format!("{}/image-gen", self.api_url))
            .headers(api_headers(&self.origin))
            .timeout(self.request_timeout)
            .json(&body)
            .send()
            .await
            .map_err(|e| EffectsError::Submission(e.to_string()))?;

        if !response.status().is_success() {
            return Err(EffectsError::Submission(failure_detail(response).await));
        }

        let parsed = response
            .json::<SubmitResponse>()
            .await
            .map_err(|e| EffectsError::Submission(format!("invalid response body: {e}")))?;

        parsed
            .job_id
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| EffectsError::Submission("response missing jobId".into()))
    }
}

#[async_trait]
impl EffectsService for EffectsApi {
    async fn submit(
        &self,
        image_url: &str,
        cancel: &CancellationToken,
    ) -> Result<String, EffectsError> {
        let job_id = cancellable(cancel, self.submit_request(image_url)).await??;
        tracing::info!(job_id = %job_id, effect_id = %self.effect_id, "Submitted effect job");
        Ok(job_id)
    }

    async fn poll(
        &self,
        job_id: &str,
        cancel: &CancellationToken,
        on_progress: &(dyn Fn(PollProgress) + Send + Sync),
    ) -> Result<StatusResponse, EffectsError> {
        for attempt in 1..=self.max_polls {
            let response = cancellable(cancel, self.check_status(job_id)).await??;

            match response.job_status() {
                JobStatus::Completed => {
                    tracing::info!(job_id, attempt, "Effect job completed");
                    return Ok(response);
                }
                JobStatus::Failed => {
                    let message = response.failure_message();
                    tracing::warn!(job_id, attempt, error = %message, "Effect job failed");
                    return Err(EffectsError::Job(message));
                }
                status => {
                    tracing::debug!(job_id, attempt, raw_status = %response.status, "Effect job still running");
                    on_progress(PollProgress {
                        attempt,
                        max_polls: self.max_polls,
                        status,
                    });
                }
            }

            // No wait after the last attempt: the timeout is already decided.
            if attempt < self.max_polls {
                cancellable(cancel, tokio::time::sleep(self.poll_interval)).await?;
            }
        }

        tracing::warn!(job_id, max_polls = self.max_polls, "Effect job timed out");
        Err(EffectsError::Timeout {
            attempts: self.max_polls,
        })
    }
}
