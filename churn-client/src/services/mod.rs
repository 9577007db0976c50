//! Network services
//!
//! - session_authenticator: login / session check against the account backend
//! - upload_session: validated, single-flight CSV submission with progress
//! - result_fetcher: latest result fetch, classification and view state
//! - result_download: raw CSV download of the latest result

pub mod result_download;
pub mod result_fetcher;
pub mod session_authenticator;
pub mod upload_session;

pub use result_download::{DownloadError, ResultDownloader};
pub use result_fetcher::{ResultFetcher, ResultView};
pub use session_authenticator::{AuthError, SessionAuthenticator};
pub use upload_session::UploadSession;

const USER_AGENT: &str = concat!("churn-client/", env!("CARGO_PKG_VERSION"));

/// Shared HTTP client
///
/// No request timeout is configured: failures surface through the
/// transport's own error signal.
pub fn build_http_client() -> churn_common::Result<reqwest::Client> {
    let client = reqwest::Client::builder().user_agent(USER_AGENT).build()?;
    Ok(client)
}

/// True for 2xx statuses
pub(crate) fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}
