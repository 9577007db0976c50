//! Latest-result fetch and results view state
//!
//! [`ResultFetcher`] issues one `GET /results/latest` and classifies the
//! reply:
//! - 404 → [`ResultState::Empty`] ("no results yet" is not a failure)
//! - other non-2xx, network errors, malformed bodies, `success: false`
//!   → [`ResultState::Failed`]
//! - a usable payload → aggregated into [`ResultState::Ready`]
//!
//! [`ResultView`] holds the state for one view lifetime. It fetches at most
//! once and stops writing as soon as it is closed.

use crate::aggregator;
use crate::auth::AuthContext;
use crate::models::result::PAYLOAD_KEYS;
use crate::models::{ResultPayload, ResultState};
use crate::services::is_success;
use churn_common::api::select_message;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const LATEST_PATH: &str = "/results/latest";

/// Fallback message when the server gives no reason
pub const LOAD_FAILED_MESSAGE: &str = "Failed to load results";

/// Prediction-service result client
#[derive(Clone)]
pub struct ResultFetcher {
    http_client: reqwest::Client,
    ml_api_url: String,
}

impl ResultFetcher {
    pub fn new(http_client: reqwest::Client, ml_api_url: impl Into<String>) -> Self {
        Self {
            http_client,
            ml_api_url: ml_api_url.into(),
        }
    }

    /// Fetch and aggregate the latest result for the context's identity
    pub async fn fetch_latest(&self, auth: &AuthContext) -> ResultState {
        let identity = auth.identity();
        debug!(%identity, "Fetching latest results");

        let request = self
            .http_client
            .get(format!("{}{}", self.ml_api_url, LATEST_PATH))
            .query(&[("user_id", identity)]);

        let response = match auth.authorize(request).send().await {
            Ok(response) => response,
            Err(e) => {
                warn!(error = %e, "Latest results request failed");
                return ResultState::Failed(e.to_string());
            }
        };

        let status = response.status().as_u16();
        let state = match response.bytes().await {
            Ok(body) => classify_latest_response(status, &body),
            Err(e) => ResultState::Failed(e.to_string()),
        };

        match &state {
            ResultState::Ready(result) => info!(
                %identity,
                total = result.summary.total,
                churned = result.summary.churned,
                "Latest results loaded"
            ),
            ResultState::Empty => info!(%identity, "No results yet"),
            ResultState::Failed(message) => warn!(%identity, status, %message, "Latest results failed"),
            ResultState::Loading => {}
        }

        state
    }
}

/// Map a `/results/latest` response to a view state
pub fn classify_latest_response(status: u16, body: &[u8]) -> ResultState {
    if status == 404 {
        return ResultState::Empty;
    }

    let parsed: Option<Value> = serde_json::from_slice(body).ok();

    if !is_success(status) {
        let message = parsed
            .map(|b| select_message(&b, ""))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("{} (HTTP {})", LOAD_FAILED_MESSAGE, status));
        return ResultState::Failed(message);
    }

    let Some(body) = parsed.filter(Value::is_object) else {
        return malformed();
    };

    if body.get("success").and_then(Value::as_bool) == Some(false)
        || body.get("error").is_some_and(|e| !e.is_null())
    {
        return ResultState::Failed(select_message(&body, LOAD_FAILED_MESSAGE));
    }

    let payload = match extract_payload(&body) {
        PayloadShape::Present(raw) => ResultPayload::from_value(raw),
        PayloadShape::Absent => return ResultState::Empty,
        PayloadShape::Malformed => return malformed(),
    };
    if payload.is_empty() {
        return ResultState::Empty;
    }

    ResultState::Ready(aggregator::enrich(&payload))
}

fn malformed() -> ResultState {
    ResultState::Failed(format!("{}: malformed response", LOAD_FAILED_MESSAGE))
}

enum PayloadShape<'a> {
    Present(&'a Value),
    /// Well-formed envelope carrying no result
    Absent,
    Malformed,
}

/// The payload is either wrapped as `{success, data}` or is the body itself
fn extract_payload(body: &Value) -> PayloadShape<'_> {
    match body.get("data") {
        Some(data) if data.is_object() => PayloadShape::Present(data),
        Some(data) if !data.is_null() => PayloadShape::Malformed,
        _ if PAYLOAD_KEYS.iter().any(|k| body.get(*k).is_some()) => PayloadShape::Present(body),
        _ if body.get("success").is_some() => PayloadShape::Absent,
        _ => PayloadShape::Malformed,
    }
}

/// State of one results view
///
/// Re-entering the view means creating a new `ResultView`; there is no
/// caching across views.
pub struct ResultView {
    state: Arc<RwLock<ResultState>>,
    started: AtomicBool,
    cancel: CancellationToken,
}

impl ResultView {
    pub fn new() -> Self {
        Self {
            state: Arc::new(RwLock::new(ResultState::Loading)),
            started: AtomicBool::new(false),
            cancel: CancellationToken::new(),
        }
    }

    pub async fn state(&self) -> ResultState {
        self.state.read().await.clone()
    }

    /// Token cancelled when the view is torn down
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Tear down: in-flight results are discarded
    pub fn close(&self) {
        self.cancel.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Run the view's single fetch
    ///
    /// Later calls are no-ops, as is a call after [`Self::close`].
    pub async fn load(&self, fetcher: &ResultFetcher, auth: &AuthContext) {
        if self.is_closed() || self.started.swap(true, Ordering::SeqCst) {
            return;
        }

        let state = fetcher.fetch_latest(auth).await;

        if self.is_closed() {
            debug!("Results view closed, discarding fetched state");
            return;
        }
        *self.state.write().await = state;
    }
}

impl Default for ResultView {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn classify(status: u16, body: Value) -> ResultState {
        classify_latest_response(status, body.to_string().as_bytes())
    }

    #[test]
    fn test_not_found_is_empty() {
        assert_eq!(classify_latest_response(404, b""), ResultState::Empty);
        assert_eq!(
            classify(404, json!({"success": false, "error": "No results"})),
            ResultState::Empty
        );
    }

    #[test]
    fn test_success_false_message() {
        assert_eq!(
            classify(200, json!({"success": false, "message": "bad format"})),
            ResultState::Failed("bad format".to_string())
        );
        assert_eq!(
            classify(200, json!({"success": false})),
            ResultState::Failed("Failed to load results".to_string())
        );
    }

    #[test]
    fn test_server_error_status() {
        assert_eq!(
            classify(500, json!({"error": "model not loaded"})),
            ResultState::Failed("model not loaded".to_string())
        );
        assert_eq!(
            classify_latest_response(503, b"unavailable"),
            ResultState::Failed("Failed to load results (HTTP 503)".to_string())
        );
    }

    #[test]
    fn test_malformed_body() {
        assert!(matches!(
            classify_latest_response(200, b"{not json"),
            ResultState::Failed(_)
        ));
        assert!(matches!(classify(200, json!([1, 2])), ResultState::Failed(_)));

        let malformed = ResultState::Failed("Failed to load results: malformed response".to_string());
        for body in [
            json!({"success": true, "data": "oops"}),
            json!({"success": true, "data": [1, 2, 3]}),
            json!({"success": true, "data": 42}),
            json!({"unexpected": true}),
        ] {
            assert_eq!(classify(200, body.clone()), malformed, "{}", body);
        }
    }

    #[test]
    fn test_enveloped_payload() {
        let state = classify(
            200,
            json!({
                "success": true,
                "data": {"predictions": [{"churn_prediction": 1}, {"churn_prediction": 0}]}
            }),
        );
        let ResultState::Ready(result) = state else {
            panic!("expected Ready");
        };
        assert_eq!(result.summary.total, 2);
        assert_eq!(result.summary.churn_rate_percent, 50.0);
    }

    #[test]
    fn test_bare_payload() {
        let state = classify(
            200,
            json!({"pieData": [{"name": "Retained", "value": 8}, {"name": "Churned", "value": 2}]}),
        );
        let ResultState::Ready(result) = state else {
            panic!("expected Ready");
        };
        assert_eq!(result.pie_data[1].value, serde_json::Number::from(2));
        assert_eq!(result.summary.total, 0);
    }

    #[test]
    fn test_success_without_data_is_empty() {
        assert_eq!(classify(200, json!({"success": true})), ResultState::Empty);
        assert_eq!(
            classify(200, json!({"success": true, "data": null})),
            ResultState::Empty
        );
        assert_eq!(
            classify(200, json!({"success": true, "data": {}})),
            ResultState::Empty
        );
    }

    #[tokio::test]
    async fn test_closed_view_never_fetches() {
        let view = ResultView::new();
        view.close();

        // Unroutable address: would fail if a request were made
        let fetcher = ResultFetcher::new(reqwest::Client::new(), "http://127.0.0.1:9");
        view.load(&fetcher, &AuthContext::anonymous()).await;

        assert_eq!(view.state().await, ResultState::Loading);
    }
}
