//! Upload candidate and outcome types

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;

/// Why a candidate file was refused before any network call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationReason {
    /// File name does not end with `.csv`
    #[error("Only CSV files are allowed.")]
    NotCsv,

    /// File is larger than the upload limit
    #[error("File exceeds the 15 MB upload limit.")]
    TooLarge,
}

/// Where the candidate's bytes come from
#[derive(Clone)]
enum CandidateSource {
    Memory(Arc<Vec<u8>>),
    File(PathBuf),
}

/// A file selected for upload
///
/// Holds only metadata until submission; file-backed candidates are not
/// read until they have passed validation.
#[derive(Clone)]
pub struct UploadCandidate {
    name: String,
    byte_size: u64,
    mime_hint: String,
    source: CandidateSource,
}

impl UploadCandidate {
    /// Candidate backed by in-memory bytes
    pub fn from_bytes(name: impl Into<String>, bytes: Vec<u8>) -> Self {
        let name = name.into();
        Self {
            mime_hint: mime_hint_for(&name).to_string(),
            byte_size: bytes.len() as u64,
            name,
            source: CandidateSource::Memory(Arc::new(bytes)),
        }
    }

    /// Candidate backed by a file on disk (reads metadata only)
    pub async fn from_path(path: &Path) -> std::io::Result<Self> {
        let metadata = tokio::fs::metadata(path).await?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        Ok(Self {
            mime_hint: mime_hint_for(&name).to_string(),
            byte_size: metadata.len(),
            name,
            source: CandidateSource::File(path.to_path_buf()),
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn byte_size(&self) -> u64 {
        self.byte_size
    }

    pub fn mime_hint(&self) -> &str {
        &self.mime_hint
    }

    /// Load the bytes to transmit
    pub(crate) async fn read_contents(&self) -> std::io::Result<Vec<u8>> {
        match &self.source {
            CandidateSource::Memory(bytes) => Ok(bytes.as_ref().clone()),
            CandidateSource::File(path) => tokio::fs::read(path).await,
        }
    }
}

impl std::fmt::Debug for UploadCandidate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UploadCandidate")
            .field("name", &self.name)
            .field("byte_size", &self.byte_size)
            .field("mime_hint", &self.mime_hint)
            .finish()
    }
}

fn mime_hint_for(name: &str) -> &'static str {
    if name.to_lowercase().ends_with(".csv") {
        "text/csv"
    } else {
        "application/octet-stream"
    }
}

/// Result of one submission
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", rename_all = "snake_case")]
pub enum UploadOutcome {
    /// Backend accepted the file; results can be viewed at the hint
    Accepted { result_location: String },

    /// Refused locally, nothing was sent
    Rejected { reason: ValidationReason },

    /// Network or HTTP-layer failure
    TransportFailure {
        http_status: Option<u16>,
        message: String,
    },

    /// Backend understood the request and declined it
    ServerRejected { message: String },

    /// Another submission is already in flight on this session
    Busy,
}

impl UploadOutcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, UploadOutcome::Accepted { .. })
    }

    /// Single human-readable line for the user
    pub fn user_message(&self) -> String {
        match self {
            UploadOutcome::Accepted { .. } => "File uploaded successfully!".to_string(),
            UploadOutcome::Rejected { reason } => reason.to_string(),
            UploadOutcome::TransportFailure { message, .. } => message.clone(),
            UploadOutcome::ServerRejected { message } => message.clone(),
            UploadOutcome::Busy => "An upload is already in progress.".to_string(),
        }
    }
}
