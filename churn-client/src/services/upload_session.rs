//! CSV upload session
//!
//! One session owns at most one selected candidate and at most one
//! transmission at a time. A submission runs strictly in sequence:
//!
//! 1. Re-validate the candidate (no network on failure)
//! 2. Acquire a session token if the auth context requires one
//! 3. Stream the multipart body to `POST /predict`, reporting progress
//! 4. Classify the response into an [`UploadOutcome`]
//!
//! The in-flight marker is a guard: whichever way the submission ends, the
//! uploading flag clears and progress returns to 0.

use crate::auth::AuthContext;
use crate::models::{UploadCandidate, UploadOutcome, ValidationReason};
use crate::progress::{ObserverHandle, ProgressBody, DEFAULT_CHUNK_SIZE};
use crate::services::{is_success, SessionAuthenticator};
use crate::validator;
use churn_common::api::PredictResponse;
use reqwest::multipart::{Form, Part};
use serde_json::Value;
use std::sync::atomic::{AtomicBool, AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

const PREDICT_PATH: &str = "/predict";
const DEFAULT_RESULT_LOCATION: &str = "/results";

/// Fallback message when the server gives no reason
pub const UPLOAD_FAILED_MESSAGE: &str = "Upload failed.";

/// Observable session state
#[derive(Debug, Default)]
pub struct UploadState {
    uploading: AtomicBool,
    progress: AtomicU8,
}

impl UploadState {
    pub fn is_uploading(&self) -> bool {
        self.uploading.load(Ordering::SeqCst)
    }

    pub fn progress(&self) -> u8 {
        self.progress.load(Ordering::SeqCst)
    }

    /// Claim the in-flight marker, or `None` when already claimed
    fn try_begin(self: &Arc<Self>, observer: ObserverHandle) -> Option<InFlightGuard> {
        self.uploading
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .ok()?;
        self.progress.store(0, Ordering::SeqCst);
        Some(InFlightGuard {
            state: Arc::clone(self),
            observer,
        })
    }

    fn record_progress(&self, percent: u8) {
        self.progress.fetch_max(percent, Ordering::SeqCst);
    }
}

/// Releases the in-flight marker on every exit path
struct InFlightGuard {
    state: Arc<UploadState>,
    observer: ObserverHandle,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.state.progress.store(0, Ordering::SeqCst);
        self.state.uploading.store(false, Ordering::SeqCst);
        self.observer.progress(0);
    }
}

/// Upload session against the prediction service
pub struct UploadSession {
    http_client: reqwest::Client,
    ml_api_url: String,
    authenticator: Option<SessionAuthenticator>,
    state: Arc<UploadState>,
    selected: Mutex<Option<UploadCandidate>>,
    chunk_size: usize,
}

impl UploadSession {
    pub fn new(http_client: reqwest::Client, ml_api_url: impl Into<String>) -> Self {
        Self {
            http_client,
            ml_api_url: ml_api_url.into(),
            authenticator: None,
            state: Arc::new(UploadState::default()),
            selected: Mutex::new(None),
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }

    /// Used when the auth context requires a session that is not yet held
    pub fn with_authenticator(mut self, authenticator: SessionAuthenticator) -> Self {
        self.authenticator = Some(authenticator);
        self
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size.max(1);
        self
    }

    pub fn state(&self) -> Arc<UploadState> {
        Arc::clone(&self.state)
    }

    pub fn is_uploading(&self) -> bool {
        self.state.is_uploading()
    }

    pub fn progress(&self) -> u8 {
        self.state.progress()
    }

    /// Select a file, replacing any previous selection
    ///
    /// An invalid file clears the selection.
    pub fn select(&self, candidate: UploadCandidate) -> Result<(), ValidationReason> {
        let mut selected = self.selected.lock().unwrap_or_else(|e| e.into_inner());
        match validator::validate(&candidate) {
            Ok(()) => {
                debug!(name = candidate.name(), bytes = candidate.byte_size(), "File selected");
                *selected = Some(candidate);
                Ok(())
            }
            Err(reason) => {
                *selected = None;
                Err(reason)
            }
        }
    }

    pub fn selected(&self) -> Option<UploadCandidate> {
        self.selected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    pub fn clear_selection(&self) {
        *self.selected.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }

    /// Submit the selected file; the selection is discarded on submission
    ///
    /// Returns `None` when nothing is selected.
    pub async fn submit_selected(
        &self,
        auth: &mut AuthContext,
        observer: ObserverHandle,
    ) -> Option<UploadOutcome> {
        if self.is_uploading() {
            return Some(UploadOutcome::Busy);
        }
        let candidate = self
            .selected
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .take()?;
        Some(self.submit(candidate, auth, observer).await)
    }

    /// Validate and transmit a candidate
    pub async fn submit(
        &self,
        candidate: UploadCandidate,
        auth: &mut AuthContext,
        observer: ObserverHandle,
    ) -> UploadOutcome {
        if let Err(reason) = validator::validate(&candidate) {
            info!(name = candidate.name(), ?reason, "Upload rejected before transmission");
            return UploadOutcome::Rejected { reason };
        }

        let Some(_guard) = self.state.try_begin(observer.clone()) else {
            warn!(name = candidate.name(), "Upload already in progress");
            return UploadOutcome::Busy;
        };

        if auth.needs_session() {
            if let Err(message) = self.acquire_session(auth).await {
                return UploadOutcome::TransportFailure {
                    http_status: None,
                    message,
                };
            }
        }

        let outcome = self.transmit(&candidate, auth, &observer).await;

        match &outcome {
            UploadOutcome::Accepted { result_location } => {
                info!(name = candidate.name(), %result_location, "Upload accepted");
                observer.accepted(result_location);
            }
            other => warn!(name = candidate.name(), outcome = ?other, "Upload failed"),
        }

        outcome
    }

    async fn acquire_session(&self, auth: &mut AuthContext) -> Result<(), String> {
        let Some(authenticator) = &self.authenticator else {
            return Err("Authentication required: please log in before uploading.".to_string());
        };
        authenticator
            .acquire(auth)
            .await
            .map_err(|e| format!("Authentication required: {}", e))
    }

    async fn transmit(
        &self,
        candidate: &UploadCandidate,
        auth: &AuthContext,
        observer: &ObserverHandle,
    ) -> UploadOutcome {
        let contents = match candidate.read_contents().await {
            Ok(contents) => contents,
            Err(e) => {
                return UploadOutcome::TransportFailure {
                    http_status: None,
                    message: format!("Could not read {}: {}", candidate.name(), e),
                }
            }
        };

        let state = Arc::clone(&self.state);
        let progress_observer = observer.clone();
        let body = ProgressBody::new(
            contents,
            self.chunk_size,
            Arc::new(move |percent: u8| {
                state.record_progress(percent);
                progress_observer.progress(percent);
            }),
        );

        let part = match Part::stream(reqwest::Body::wrap_stream(body))
            .file_name(candidate.name().to_string())
            .mime_str(candidate.mime_hint())
        {
            Ok(part) => part,
            Err(e) => {
                return UploadOutcome::TransportFailure {
                    http_status: None,
                    message: e.to_string(),
                }
            }
        };

        let form = Form::new()
            .part("file", part)
            .text("user_id", auth.identity().to_string());

        debug!(
            name = candidate.name(),
            bytes = candidate.byte_size(),
            identity = auth.identity(),
            "Sending prediction request"
        );

        let request = self
            .http_client
            .post(format!("{}{}", self.ml_api_url, PREDICT_PATH))
            .multipart(form);

        let response = match auth.authorize(request).send().await {
            Ok(response) => response,
            Err(e) => {
                return UploadOutcome::TransportFailure {
                    http_status: e.status().map(|s| s.as_u16()),
                    message: e.to_string(),
                }
            }
        };

        let status = response.status().as_u16();
        match response.bytes().await {
            Ok(body) => classify_upload_response(status, &body),
            Err(e) => UploadOutcome::TransportFailure {
                http_status: Some(status),
                message: e.to_string(),
            },
        }
    }
}

/// Map a `/predict` response to an outcome
pub fn classify_upload_response(status: u16, body: &[u8]) -> UploadOutcome {
    let parsed: Option<PredictResponse> = serde_json::from_slice::<Value>(body)
        .ok()
        .filter(Value::is_object)
        .and_then(|v| serde_json::from_value(v).ok());

    if !is_success(status) {
        let message = parsed
            .map(|r| r.message_or(""))
            .filter(|m| !m.is_empty())
            .unwrap_or_else(|| format!("{} (HTTP {})", UPLOAD_FAILED_MESSAGE, status));
        return UploadOutcome::TransportFailure {
            http_status: Some(status),
            message,
        };
    }

    let Some(response) = parsed else {
        return UploadOutcome::TransportFailure {
            http_status: Some(status),
            message: format!("{} Malformed response from server.", UPLOAD_FAILED_MESSAGE),
        };
    };

    if response.has_error() || !response.is_success() {
        return UploadOutcome::ServerRejected {
            message: response.message_or(UPLOAD_FAILED_MESSAGE),
        };
    }

    UploadOutcome::Accepted {
        result_location: response
            .redirect
            .filter(|r| !r.is_empty())
            .unwrap_or_else(|| DEFAULT_RESULT_LOCATION.to_string()),
    }
}
