//! Request helpers shared by the clients.

use std::future::Future;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, ORIGIN, REFERER};
use tokio_util::sync::CancellationToken;

use crate::error::EffectsError;

/// `Accept` header sent to the effects API.
const ACCEPT_JSON_OR_TEXT: &str = "application/json, text/plain, */*";

/// Run `fut` to completion unless `cancel` fires first.
pub(crate) async fn cancellable<F>(
    cancel: &CancellationToken,
    fut: F,
) -> Result<F::Output, EffectsError>
where
    F: Future,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(EffectsError::Cancelled),
        out = fut => Ok(out),
    }
}

/// Describe a non-2xx response as `"<status>: <body>"`, or just the status
/// when the body is empty or unreadable.
pub(crate) async fn failure_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let body = body.trim();
    if body.is_empty() {
        status.to_string()
    } else {
        format!("{status}: {body}")
    }
}

/// Headers the effects API expects from its web front end.
pub(crate) fn api_headers(origin: &str) -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON_OR_TEXT));
    if let Ok(value) = HeaderValue::from_str(origin) {
        headers.insert(ORIGIN, value);
    }
    if let Ok(value) = HeaderValue::from_str(&format!("{origin}/")) {
        headers.insert(REFERER, value);
    }
    headers
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn api_headers_carry_origin_and_referer() {
        let headers = api_headers("https://www.chromastudio.ai");
        assert_eq!(headers[ACCEPT], ACCEPT_JSON_OR_TEXT);
        assert_eq!(headers[ORIGIN], "https://www.chromastudio.ai");
        assert_eq!(headers[REFERER], "https://www.chromastudio.ai/");
    }

    #[tokio::test]
    async fn cancellable_returns_output_when_not_cancelled() {
        let cancel = CancellationToken::new();
        let out = cancellable(&cancel, async { 7 }).await;
        assert_eq!(out, Ok(7));
    }

    #[tokio::test]
    async fn cancellable_stops_pending_future() {
        let cancel = CancellationToken::new();
        cancel.cancel();
        let out = cancellable(&cancel, std::future::pending::<()>()).await;
        assert_eq!(out, Err(EffectsError::Cancelled));
    }
}
