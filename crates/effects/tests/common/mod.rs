//! In-process stand-in for the storage and effects endpoints.
//!
//! [`spawn`] binds an `axum` router on `127.0.0.1:0` and returns the base
//! URL together with shared state that records every request, so tests can
//! point an [`EffectsConfig`] at it and assert on what was sent.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post, put};
use axum::{Json, Router};
use serde_json::{json, Value};

use bdaymagic_core::config::EffectsConfig;

/// Canned behaviour of the fake service.
pub struct MockSettings {
    pub provision_status: StatusCode,
    pub put_status: StatusCode,
    pub put_delay: Duration,
    pub submit_status: StatusCode,
    pub submit_body: Value,
    /// Status responses served in order; once drained, `status_default` is
    /// served forever.
    pub status_script: Vec<(StatusCode, Value)>,
    pub status_default: (StatusCode, Value),
    /// Delay before every status response; long values simulate a hung
    /// service.
    pub status_delay: Duration,
    pub result_status: StatusCode,
    pub result_delay: Duration,
    pub result_bytes: Vec<u8>,
}

impl Default for MockSettings {
    fn default() -> Self {
        Self {
            provision_status: StatusCode::OK,
            put_status: StatusCode::OK,
            put_delay: Duration::ZERO,
            submit_status: StatusCode::OK,
            submit_body: json!({ "jobId": "abc123" }),
            status_script: Vec::new(),
            status_default: (StatusCode::OK, json!({ "status": "processing" })),
            status_delay: Duration::ZERO,
            result_status: StatusCode::OK,
            result_delay: Duration::ZERO,
            result_bytes: b"\x89PNG fake image".to_vec(),
        }
    }
}

/// What the fake service saw.
#[derive(Debug, Default, Clone)]
pub struct Recorded {
    pub provision_query: HashMap<String, String>,
    pub put_key: Option<String>,
    pub put_content_type: Option<String>,
    pub put_body: Vec<u8>,
    pub submit_body: Option<Value>,
    pub submit_origin: Option<String>,
    pub status_paths: Vec<(String, String)>,
}

pub struct MockState {
    pub base_url: String,
    settings: MockSettings,
    script: Mutex<VecDeque<(StatusCode, Value)>>,
    pub recorded: Mutex<Recorded>,
    pub provision_calls: AtomicU32,
    pub put_calls: AtomicU32,
    pub submit_calls: AtomicU32,
    pub status_calls: AtomicU32,
}

impl MockState {
    pub fn status_calls(&self) -> u32 {
        self.status_calls.load(Ordering::SeqCst)
    }

    pub fn recorded(&self) -> Recorded {
        self.recorded.lock().unwrap().clone()
    }

    /// URL of the canned result image.
    pub fn result_url(&self) -> String {
        format!("{}/results/out.png", self.base_url)
    }
}

/// Start the fake service and return its shared state.
pub async fn spawn(settings: MockSettings) -> Arc<MockState> {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let base_url = format!("http://{}", listener.local_addr().unwrap());

    let state = Arc::new(MockState {
        base_url,
        script: Mutex::new(settings.status_script.iter().cloned().collect()),
        settings,
        recorded: Mutex::new(Recorded::default()),
        provision_calls: AtomicU32::new(0),
        put_calls: AtomicU32::new(0),
        submit_calls: AtomicU32::new(0),
        status_calls: AtomicU32::new(0),
    });

    let app = Router::new()
        .route("/media/get-upload-url", get(provision))
        .route("/signed/{*key}", put(receive_bytes))
        .route("/image-gen", post(submit))
        .route("/image-gen/{user_id}/{job_id}/status", get(status))
        .route("/results/out.png", get(result_image))
        .with_state(Arc::clone(&state));

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    state
}

/// Configuration pointing every endpoint at the fake service, with a fast
/// poll interval.
pub fn config_for(state: &MockState, max_polls: u32) -> EffectsConfig {
    EffectsConfig {
        upload_api_url: state.base_url.clone(),
        effects_api_url: state.base_url.clone(),
        poll_interval_ms: 1,
        max_polls,
        ..EffectsConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn provision(
    State(state): State<Arc<MockState>>,
    Query(query): Query<HashMap<String, String>>,
) -> (StatusCode, String) {
    state.provision_calls.fetch_add(1, Ordering::SeqCst);
    let file_name = query.get("fileName").cloned().unwrap_or_default();
    state.recorded.lock().unwrap().provision_query = query;

    if !state.settings.provision_status.is_success() {
        return (state.settings.provision_status, "provisioning refused".into());
    }
    (
        StatusCode::OK,
        format!("{}/signed/{}\n", state.base_url, file_name),
    )
}

async fn receive_bytes(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Path(key): Path<String>,
    body: Bytes,
) -> StatusCode {
    state.put_calls.fetch_add(1, Ordering::SeqCst);
    tokio::time::sleep(state.settings.put_delay).await;
    let mut recorded = state.recorded.lock().unwrap();
    recorded.put_key = Some(key);
    recorded.put_content_type = headers
        .get("content-type")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    recorded.put_body = body.to_vec();
    state.settings.put_status
}

async fn submit(
    State(state): State<Arc<MockState>>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> (StatusCode, Json<Value>) {
    state.submit_calls.fetch_add(1, Ordering::SeqCst);
    {
        let mut recorded = state.recorded.lock().unwrap();
        recorded.submit_body = Some(body);
        recorded.submit_origin = headers
            .get("origin")
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
    }
    (
        state.settings.submit_status,
        Json(state.settings.submit_body.clone()),
    )
}

async fn status(
    State(state): State<Arc<MockState>>,
    Path((user_id, job_id)): Path<(String, String)>,
) -> (StatusCode, Json<Value>) {
    state.status_calls.fetch_add(1, Ordering::SeqCst);
    state
        .recorded
        .lock()
        .unwrap()
        .status_paths
        .push((user_id, job_id));

    tokio::time::sleep(state.settings.status_delay).await;

    let (code, body) = state
        .script
        .lock()
        .unwrap()
        .pop_front()
        .unwrap_or_else(|| state.settings.status_default.clone());
    (code, Json(body))
}

async fn result_image(State(state): State<Arc<MockState>>) -> (StatusCode, Vec<u8>) {
    tokio::time::sleep(state.settings.result_delay).await;
    (state.settings.result_status, state.settings.result_bytes.clone())
}
