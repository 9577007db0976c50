//! Account backend session client
//!
//! Establishes a bearer session by logging in with stored credentials and
//! checks whether an existing credential is still valid.

use crate::auth::AuthContext;
use churn_common::api::{AuthStatusResponse, LoginRequest, LoginResponse};
use thiserror::Error;
use tracing::{debug, info, warn};

const LOGIN_PATH: &str = "/api/auth/login";
const IS_AUTH_PATH: &str = "/api/auth/is-auth";

/// Session establishment errors
#[derive(Debug, Error)]
pub enum AuthError {
    #[error("No login credentials configured")]
    MissingCredentials,

    #[error("Login rejected: {0}")]
    Rejected(String),

    #[error("Login response did not include a token")]
    NoToken,

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Parse error: {0}")]
    ParseError(String),
}

/// Account backend client
#[derive(Clone)]
pub struct SessionAuthenticator {
    http_client: reqwest::Client,
    backend_url: String,
}

impl SessionAuthenticator {
    pub fn new(http_client: reqwest::Client, backend_url: impl Into<String>) -> Self {
        Self {
            http_client,
            backend_url: backend_url.into(),
        }
    }

    /// Log in with the context's credentials and store the session in it
    pub async fn acquire(&self, auth: &mut AuthContext) -> Result<(), AuthError> {
        let credentials = auth.credentials().ok_or(AuthError::MissingCredentials)?;
        let request = LoginRequest {
            email: credentials.email.clone(),
            password: credentials.password.clone(),
        };

        debug!(email = %request.email, "Requesting session token");

        let response = self
            .http_client
            .post(format!("{}{}", self.backend_url, LOGIN_PATH))
            .json(&request)
            .send()
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .bytes()
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        let login: LoginResponse = match serde_json::from_slice(&body) {
            Ok(login) => login,
            Err(_) if !status.is_success() => {
                return Err(AuthError::Rejected(format!("HTTP {}", status.as_u16())));
            }
            Err(e) => return Err(AuthError::ParseError(e.to_string())),
        };

        if !status.is_success() || !login.success {
            let message = login.message.unwrap_or_else(|| "Login failed.".to_string());
            warn!(status = status.as_u16(), %message, "Login rejected");
            return Err(AuthError::Rejected(message));
        }

        let token = login.token.filter(|t| !t.is_empty()).ok_or(AuthError::NoToken)?;
        auth.establish_session(token, login.user_id);

        info!(identity = %auth.identity(), "Session established");
        Ok(())
    }

    /// Whether the context's credential is currently accepted
    ///
    /// A 401 means "not logged in" and is not an error.
    pub async fn check(&self, auth: &AuthContext) -> Result<bool, AuthError> {
        let request = self
            .http_client
            .get(format!("{}{}", self.backend_url, IS_AUTH_PATH));

        let response = auth
            .authorize(request)
            .send()
            .await
            .map_err(|e| AuthError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::UNAUTHORIZED {
            return Ok(false);
        }
        if !status.is_success() {
            return Err(AuthError::Rejected(format!("HTTP {}", status.as_u16())));
        }

        let body: AuthStatusResponse = response
            .json()
            .await
            .map_err(|e| AuthError::ParseError(e.to_string()))?;
        Ok(body.success)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_acquire_without_credentials() {
        let authenticator = SessionAuthenticator::new(reqwest::Client::new(), "http://127.0.0.1:9");
        let mut auth = AuthContext::anonymous().requiring_session();

        let result = authenticator.acquire(&mut auth).await;
        assert!(matches!(result, Err(AuthError::MissingCredentials)));
        assert!(auth.bearer_token().is_none());
    }
}
