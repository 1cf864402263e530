use std::path::PathBuf;
use std::time::Duration;

use crate::error::CoreError;

/// Connection and job settings for the remote effects service.
///
/// Defaults reproduce the production page. Override any field via the
/// environment variables listed on [`EffectsConfig::from_env`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EffectsConfig {
    /// Tenant identifier sent with every job and used in status URLs.
    pub user_id: String,
    /// Storage project passed to the signed-URL endpoint.
    pub project_id: String,
    /// Effect to render.
    pub effect_id: String,
    /// Delay between two status checks, in milliseconds.
    pub poll_interval_ms: u64,
    /// Maximum number of status checks before giving up.
    pub max_polls: u32,
    /// Upper bound on any single HTTP request, in milliseconds.
    pub request_timeout_ms: u64,
    /// Base URL of the signed-URL provisioning API.
    pub upload_api_url: String,
    /// Public host that serves uploaded media, prefixed to storage keys.
    pub asset_host: String,
    /// Base URL of the job submission / status API.
    pub effects_api_url: String,
    /// Value of the `Origin` header (and `Referer`, with a trailing slash).
    pub origin: String,
    /// Directory where downloaded results are written.
    pub download_dir: PathBuf,
}

impl Default for EffectsConfig {
    fn default() -> Self {
        Self {
            user_id: "DObRu1vyStbUynoQmTcHBlhs55z2".to_string(),
            project_id: "dressr".to_string(),
            effect_id: "birthdaybackgroundtophoto".to_string(),
            poll_interval_ms: 2000,
            max_polls: 60,
            request_timeout_ms: 30_000,
            upload_api_url: "https://core.faceswapper.ai".to_string(),
            asset_host: "https://assets.dressr.ai".to_string(),
            effects_api_url: "https://api.chromastudio.ai".to_string(),
            origin: "https://www.chromastudio.ai".to_string(),
            download_dir: PathBuf::from("."),
        }
    }
}

impl EffectsConfig {
    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                    | Default                         |
    /// |----------------------------|---------------------------------|
    /// | `EFFECTS_USER_ID`          | `DObRu1vyStbUynoQmTcHBlhs55z2`  |
    /// | `EFFECTS_PROJECT_ID`       | `dressr`                        |
    /// | `EFFECTS_EFFECT_ID`        | `birthdaybackgroundtophoto`     |
    /// | `EFFECTS_POLL_INTERVAL_MS` | `2000`                          |
    /// | `EFFECTS_MAX_POLLS`        | `60`                            |
    /// | `EFFECTS_REQUEST_TIMEOUT_MS` | `30000`                       |
    /// | `EFFECTS_UPLOAD_API_URL`   | `https://core.faceswapper.ai`   |
    /// | `EFFECTS_ASSET_HOST`       | `https://assets.dressr.ai`      |
    /// | `EFFECTS_API_URL`          | `https://api.chromastudio.ai`   |
    /// | `EFFECTS_ORIGIN`           | `https://www.chromastudio.ai`   |
    /// | `DOWNLOAD_DIR`             | `.`                             |
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    ///
    /// Missing keys fall back to [`EffectsConfig::default`]; present but
    /// malformed values are rejected.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let text = |key: &str, default: String| {
            lookup(key).map_or(default, |v| v.trim().to_string())
        };
        let url = |key: &str, default: String| text(key, default).trim_end_matches('/').to_string();

        let poll_interval_ms = match lookup("EFFECTS_POLL_INTERVAL_MS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                CoreError::Config(format!(
                    "EFFECTS_POLL_INTERVAL_MS must be a valid u64, got '{raw}'"
                ))
            })?,
            None => defaults.poll_interval_ms,
        };

        let max_polls = match lookup("EFFECTS_MAX_POLLS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                CoreError::Config(format!("EFFECTS_MAX_POLLS must be a valid u32, got '{raw}'"))
            })?,
            None => defaults.max_polls,
        };

        let request_timeout_ms = match lookup("EFFECTS_REQUEST_TIMEOUT_MS") {
            Some(raw) => raw.trim().parse().map_err(|_| {
                CoreError::Config(format!(
                    "EFFECTS_REQUEST_TIMEOUT_MS must be a valid u64, got '{raw}'"
                ))
            })?,
            None => defaults.request_timeout_ms,
        };

        let config = Self {
            user_id: text("EFFECTS_USER_ID", defaults.user_id),
            project_id: text("EFFECTS_PROJECT_ID", defaults.project_id),
            effect_id: text("EFFECTS_EFFECT_ID", defaults.effect_id),
            poll_interval_ms,
            max_polls,
            request_timeout_ms,
            upload_api_url: url("EFFECTS_UPLOAD_API_URL", defaults.upload_api_url),
            asset_host: url("EFFECTS_ASSET_HOST", defaults.asset_host),
            effects_api_url: url("EFFECTS_API_URL", defaults.effects_api_url),
            origin: url("EFFECTS_ORIGIN", defaults.origin),
            download_dir: lookup("DOWNLOAD_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.download_dir),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that identifiers and URLs are non-empty and that at least one
    /// poll is allowed.
    pub fn validate(&self) -> Result<(), CoreError> {
        let required = [
            ("user_id", &self.user_id),
            ("project_id", &self.project_id),
            ("effect_id", &self.effect_id),
            ("upload_api_url", &self.upload_api_url),
            ("asset_host", &self.asset_host),
            ("effects_api_url", &self.effects_api_url),
            ("origin", &self.origin),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(CoreError::Config(format!("{field} must not be empty")));
            }
        }

        if self.max_polls == 0 {
            return Err(CoreError::Config("max_polls must be at least 1".into()));
        }

        if self.request_timeout_ms == 0 {
            return Err(CoreError::Config("request_timeout_ms must be at least 1".into()));
        }

        Ok(())
    }

    /// Delay between two status checks.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    /// Limit applied to every individual HTTP request.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
