//! churn-client library interface
//!
//! Client side of the churn-prediction service: CSV upload with progress
//! and response classification, latest-result fetch, and derivation of
//! chart-ready series from whatever the service returns.

pub mod aggregator;
pub mod auth;
pub mod models;
pub mod progress;
pub mod services;
pub mod validator;

pub use crate::aggregator::enrich;
pub use crate::auth::{AuthContext, Credentials};
pub use crate::models::{EnrichedResult, ResultState, UploadCandidate, UploadOutcome};
pub use crate::progress::{ObserverHandle, UploadObserver};

use churn_common::config::ClientConfig;
use services::{
    build_http_client, ResultDownloader, ResultFetcher, SessionAuthenticator, UploadSession,
};

/// All client services wired to one configuration
pub struct ChurnClient {
    pub upload: UploadSession,
    pub results: ResultFetcher,
    pub downloads: ResultDownloader,
    pub authenticator: SessionAuthenticator,
}

impl ChurnClient {
    pub fn from_config(config: &ClientConfig) -> churn_common::Result<Self> {
        let http_client = build_http_client()?;
        let authenticator = SessionAuthenticator::new(http_client.clone(), &config.backend_url);

        Ok(Self {
            upload: UploadSession::new(http_client.clone(), &config.ml_api_url)
                .with_authenticator(authenticator.clone()),
            results: ResultFetcher::new(http_client.clone(), &config.ml_api_url),
            downloads: ResultDownloader::new(http_client, &config.ml_api_url),
            authenticator,
        })
    }

    /// Auth context from configured identity, token and credentials
    pub fn auth_context(config: &ClientConfig) -> AuthContext {
        let mut auth = AuthContext::anonymous();
        if let Some(identity) = &config.identity {
            auth = auth.with_identity(identity.clone());
        }
        if let Some(token) = &config.bearer_token {
            auth = auth.with_bearer_token(token.clone());
        }
        if let (Some(email), Some(password)) = (&config.email, &config.password) {
            auth = auth
                .with_credentials(Credentials {
                    email: email.clone(),
                    password: password.clone(),
                })
                .requiring_session();
        }
        auth
    }
}
