//! Print file staging for the fabrik print agent.
//!
//! Staging copies a named print file from remote object storage into a local
//! directory the agent can upload to the printer controller from. The
//! [`FileStager`] trait is the seam the orchestrator depends on;
//! [`BlobStager`] is the HTTP implementation.

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use thiserror::Error;

use fabrik_core::FileId;

/// A result type using `StagingError`.
pub type Result<T> = std::result::Result<T, StagingError>;

/// Errors that can occur while staging a file.
#[derive(Debug, Error)]
pub enum StagingError {
    /// The file id would escape the staging directory.
    #[error("invalid file name: {0}")]
    InvalidFileName(String),

    /// The download request failed.
    #[error("download failed: {0}")]
    Download(#[from] reqwest::Error),

    /// The object store answered with a non-success status.
    #[error("object store returned status {status} for {file_id}")]
    Status {
        /// The file that was requested.
        file_id: FileId,
        /// The HTTP status code returned.
        status: u16,
    },

    /// Writing the staged file to disk failed.
    #[error("staging I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for retrieving print files into local storage.
#[async_trait]
pub trait FileStager: Send + Sync {
    /// Retrieve `file_id` from remote storage.
    ///
    /// Returns the local path of the staged file.
    ///
    /// # Errors
    ///
    /// Returns a [`StagingError`] if the file cannot be fetched or written.
    async fn stage(&self, file_id: &FileId) -> Result<PathBuf>;
}

/// Stager that downloads files over HTTP from an object-storage base URL.
///
/// Files land at `<staging_dir>/<file_id>`; the directory is created on
/// demand and an existing staged copy is overwritten.
#[derive(Debug, Clone)]
pub struct BlobStager {
    client: reqwest::Client,
    base_url: String,
    staging_dir: PathBuf,
}

impl BlobStager {
    /// Create a new stager downloading from `base_url` into `staging_dir`.
    ///
    /// # Panics
    ///
    /// Panics if the HTTP client cannot be created (should never happen with
    /// default TLS).
    #[must_use]
    pub fn new(base_url: impl Into<String>, staging_dir: impl Into<PathBuf>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .connect_timeout(Duration::from_secs(5))
            .build()
            .expect("failed to create HTTP client");

        Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            staging_dir: staging_dir.into(),
        }
    }

    /// Get the local staging directory.
    #[must_use]
    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    /// Reject file ids that would resolve outside the staging directory.
    fn validate_file_id(file_id: &FileId) -> Result<()> {
        let name = file_id.as_str();
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(StagingError::InvalidFileName(name.to_string()));
        }
        Ok(())
    }
}

#[async_trait]
impl FileStager for BlobStager {
    async fn stage(&self, file_id: &FileId) -> Result<PathBuf> {
        Self::validate_file_id(file_id)?;

        tokio::fs::create_dir_all(&self.staging_dir).await?;

        let url = format!("{}/{}", self.base_url, file_id);
        tracing::info!(file_id = %file_id, "Downloading file from object storage");

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(StagingError::Status {
                file_id: file_id.clone(),
                status: response.status().as_u16(),
            });
        }

        let bytes = response.bytes().await?;
        let local_path = self.staging_dir.join(file_id.as_str());
        tokio::fs::write(&local_path, &bytes).await?;

        tracing::info!(
            file_id = %file_id,
            path = %local_path.display(),
            size_bytes = bytes.len(),
            "Staged file"
        );

        Ok(local_path)
    }
}
