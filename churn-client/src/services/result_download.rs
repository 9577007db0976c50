//! Result CSV download
//!
//! Streams `GET /results/download` for the context's identity into a file.

use crate::auth::AuthContext;
use futures::StreamExt;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::io::AsyncWriteExt;
use tracing::{debug, info, warn};

const DOWNLOAD_PATH: &str = "/results/download";

/// Suffix of the file being written; renamed away once the body is complete
const PARTIAL_SUFFIX: &str = ".part";

/// File name used when the result does not suggest one
pub const DEFAULT_DOWNLOAD_NAME: &str = "churn_results.csv";

/// Download errors
#[derive(Debug, Error)]
pub enum DownloadError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Download failed with HTTP {0}")]
    Status(u16),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Prediction-service download client
#[derive(Clone)]
pub struct ResultDownloader {
    http_client: reqwest::Client,
    ml_api_url: String,
}

impl ResultDownloader {
    pub fn new(http_client: reqwest::Client, ml_api_url: impl Into<String>) -> Self {
        Self {
            http_client,
            ml_api_url: ml_api_url.into(),
        }
    }

    /// Save the latest result CSV into `dest_dir`
    ///
    /// `name_hint` is typically the result's `csv_url`; only its final path
    /// segment is used.
    pub async fn download(
        &self,
        auth: &AuthContext,
        dest_dir: &Path,
        name_hint: Option<&str>,
    ) -> Result<PathBuf, DownloadError> {
        let request = self
            .http_client
            .get(format!("{}{}", self.ml_api_url, DOWNLOAD_PATH))
            .query(&[("user_id", auth.identity())]);

        let response = auth
            .authorize(request)
            .send()
            .await
            .map_err(|e| DownloadError::NetworkError(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DownloadError::Status(status.as_u16()));
        }

        let file_name = download_file_name(name_hint);
        let target = dest_dir.join(&file_name);
        let partial = dest_dir.join(format!("{}{}", file_name, PARTIAL_SUFFIX));
        tokio::fs::create_dir_all(dest_dir).await?;

        let written = match write_body(response, &partial).await {
            Ok(written) => written,
            Err(e) => {
                warn!(path = %partial.display(), error = %e, "Download interrupted, discarding partial file");
                let _ = tokio::fs::remove_file(&partial).await;
                return Err(e);
            }
        };
        tokio::fs::rename(&partial, &target).await?;

        info!(path = %target.display(), bytes = written, "Results downloaded");
        Ok(target)
    }
}

/// Stream the response body into `path`, returning the byte count
async fn write_body(response: reqwest::Response, path: &Path) -> Result<u64, DownloadError> {
    let mut file = tokio::fs::File::create(path).await?;

    let mut written: u64 = 0;
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| DownloadError::NetworkError(e.to_string()))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;

    debug!(bytes = written, "Download stream complete");
    Ok(written)
}

/// Safe local file name for a download
pub fn download_file_name(hint: Option<&str>) -> String {
    hint.and_then(|h| {
        h.split(['/', '\\'])
            .last()
            .map(|segment| segment.split(['?', '#']).next().unwrap_or_default())
            .map(str::trim)
            .filter(|segment| !segment.is_empty() && *segment != "." && *segment != "..")
            .map(str::to_string)
    })
    .unwrap_or_else(|| DEFAULT_DOWNLOAD_NAME.to_string())
}
