//! Error taxonomy for ingestion jobs
//!
//! Two families surface to callers: [`IngestionError`] for dispatch, job
//! definition, workspace and download problems, and [`StorageError`] for
//! bucket and object failures. [`Error`] is what a pipeline run returns.

use std::path::PathBuf;

use thiserror::Error;

use crate::model::SourceKind;

/// Transport-level failure inside a source downloader.
///
/// Wrapped into a source-specific [`IngestionError`] variant by the pipeline
/// that invoked the downloader.
#[derive(Debug, Error)]
pub enum DownloadError {
    /// HTTP error with optional status code
    #[error("{}", fmt_http(*status, message))]
    Http {
        status: Option<u16>,
        message: String,
    },
    /// Credentials missing or rejected
    #[error("authentication failed: {0}")]
    Auth(String),
    /// Dataset or file does not exist upstream
    #[error("not found: {0}")]
    NotFound(String),
    /// Downloaded archive could not be unpacked
    #[error("archive error: {0}")]
    Archive(String),
    /// Listing feed could not be parsed
    #[error("feed error: {0}")]
    Feed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

fn fmt_http(status: Option<u16>, message: &str) -> String {
    match status {
        Some(s) => format!("HTTP {s}: {message}"),
        None => format!("HTTP error: {message}"),
    }
}

impl DownloadError {
    /// Create HTTP error from reqwest error
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        let status = e.status().map(|s| s.as_u16());
        // Strip URL from error to avoid leaking query strings in logs
        let message = e.without_url().to_string();
        match status {
            Some(401 | 403) => Self::Auth(message),
            Some(404) => Self::NotFound(message),
            _ => Self::Http { status, message },
        }
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http { status, .. } => match status {
                None => true,
                Some(s) => *s == 429 || *s >= 500,
            },
            Self::Io(e) => e.kind() != std::io::ErrorKind::StorageFull,
            Self::Auth(_) | Self::NotFound(_) | Self::Archive(_) | Self::Feed(_) => false,
        }
    }
}

/// Pipeline, dispatch and job-definition failures.
#[derive(Debug, Error)]
pub enum IngestionError {
    /// A pipeline was handed a job whose source it does not handle.
    #[error("{pipeline} requires a {expected} source, got {found}")]
    SourceMismatch {
        pipeline: &'static str,
        expected: SourceKind,
        found: SourceKind,
    },

    #[error("no pipeline registered for job {job_id}")]
    NoPipeline { job_id: String },

    #[error("job '{job}' not defined in {origin}")]
    JobNotDefined { job: String, origin: String },

    #[error("job '{job}' is invalid: {reason}")]
    InvalidJob { job: String, reason: String },

    #[error("workspace {}: {source}", path.display())]
    Workspace {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("kaggle download failed: {0}")]
    Kaggle(#[source] DownloadError),

    #[error("arxiv download failed: {0}")]
    Arxiv(#[source] DownloadError),
}

impl IngestionError {
    pub(crate) fn workspace(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Workspace {
            path: path.into(),
            source,
        }
    }
}

/// Object store failures.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Store settings missing or malformed
    #[error("storage not configured: {0}")]
    Config(String),

    #[error("could not ensure bucket {bucket}: {message}")]
    BucketCreation { bucket: String, message: String },

    #[error("failed to upload {object} to bucket {bucket}: {message}")]
    ObjectUpload {
        bucket: String,
        object: String,
        message: String,
    },

    #[error("failed to download {bucket}/{object}: {message}")]
    ObjectDownload {
        bucket: String,
        object: String,
        message: String,
    },

    #[error("IO error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Error returned by a pipeline run.
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Ingestion(#[from] IngestionError),
    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
