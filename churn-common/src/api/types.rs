//! Shared API request/response types
//!
//! Bodies exchanged with two services:
//! - the prediction service (`/predict`, `/results/*`)
//! - the account backend (`/api/auth/*`)
//!
//! Both services report failures in the body with an `error` and/or
//! `message` field. [`select_message`] applies the single priority rule the
//! client uses everywhere: `error` beats `message` beats a caller fallback.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ========================================
// Message Selection
// ========================================

/// Extract a human-readable string from a body-level message field
///
/// Strings are used as-is (empty strings count as absent). An object with a
/// nested `message` string yields that string. Any other non-null value is
/// rendered as compact JSON so the user still sees something specific.
pub fn field_text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::String(s) => Some(s.clone()),
        Value::Object(map) => match map.get("message") {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.clone()),
            _ => Some(Value::Object(map.clone()).to_string()),
        },
        other => Some(other.to_string()),
    }
}

/// Pick the most specific failure message from a JSON body
///
/// Priority: `error` > `message` > `fallback`.
///
/// # Examples
///
/// ```
/// use churn_common::api::select_message;
/// use serde_json::json;
///
/// let body = json!({"success": false, "message": "bad format"});
/// assert_eq!(select_message(&body, "Upload failed."), "bad format");
///
/// let body = json!({"error": "quota exceeded", "message": "ignored"});
/// assert_eq!(select_message(&body, "Upload failed."), "quota exceeded");
/// ```
pub fn select_message(body: &Value, fallback: &str) -> String {
    field_text(body.get("error"))
        .or_else(|| field_text(body.get("message")))
        .unwrap_or_else(|| fallback.to_string())
}

// ========================================
// Prediction Service
// ========================================

/// Response body of `POST /predict`
///
/// The service has reported success two ways over time: a boolean
/// `success` flag and a `status: "success"` string. Either is accepted.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct PredictResponse {
    #[serde(default)]
    pub success: Option<bool>,

    #[serde(default)]
    pub status: Option<String>,

    /// Most specific failure description, string or object
    #[serde(default)]
    pub error: Option<Value>,

    #[serde(default)]
    pub message: Option<Value>,

    /// Where the results can be viewed, when the service says so
    #[serde(default, alias = "redirect_to", alias = "resultsUrl")]
    pub redirect: Option<String>,
}

impl PredictResponse {
    /// True when the body carries a non-empty `error` field
    pub fn has_error(&self) -> bool {
        field_text(self.error.as_ref()).is_some()
    }

    /// True when the application-level success flag is set
    pub fn is_success(&self) -> bool {
        self.success == Some(true)
            || self
                .status
                .as_deref()
                .is_some_and(|s| s.eq_ignore_ascii_case("success"))
    }

    /// Failure message by priority, see [`select_message`]
    pub fn message_or(&self, fallback: &str) -> String {
        field_text(self.error.as_ref())
            .or_else(|| field_text(self.message.as_ref()))
            .unwrap_or_else(|| fallback.to_string())
    }
}

// ========================================
// Account Backend
// ========================================

/// Body of `POST /api/auth/login`
#[derive(Clone, Deserialize, Serialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl std::fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginRequest")
            .field("email", &self.email)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Response of `POST /api/auth/login`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LoginResponse {
    #[serde(default)]
    pub success: bool,

    /// Bearer credential for subsequent requests
    #[serde(default, alias = "accessToken", alias = "access_token")]
    pub token: Option<String>,

    #[serde(default)]
    pub message: Option<String>,

    /// Opaque identity assigned by the backend
    #[serde(default, alias = "userId")]
    pub user_id: Option<String>,
}

/// Response of `GET /api/auth/is-auth`
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct AuthStatusResponse {
    #[serde(default)]
    pub success: bool,

    #[serde(default)]
    pub message: Option<String>,
}
