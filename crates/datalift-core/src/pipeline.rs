//! Pipeline contract and the per-source pipelines
//!
//! A pipeline is bound to one [`DataSource`] variant. `run` always follows the
//! same order: variant check, workspace preparation, download, publish. The
//! variant check happens before anything touches the filesystem or network.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{DownloadError, IngestionError, Result, StorageError};
use crate::model::{ArxivSource, DataSource, IngestionJob, KaggleSource, SourceKind};
use crate::workspace;

/// Fetches one source variant into a local directory.
///
/// Returns the local paths of the files kept after applying `file_filter`
/// (trimmed base names; `None` keeps everything).
pub trait Downloader<S>: Send + Sync {
    fn download(
        &self,
        source: &S,
        destination_dir: &Path,
        file_filter: Option<&[String]>,
    ) -> Result<Vec<PathBuf>, DownloadError>;
}

/// Uploads a local file into a bucket, creating the bucket when absent.
pub trait Publisher: Send + Sync {
    fn publish(&self, bucket: &str, object_name: &str, local_path: &Path)
        -> Result<(), StorageError>;
}

/// Executable strategy for one source variant.
pub trait Pipeline: Send + Sync {
    /// Short name used in logs and errors.
    fn name(&self) -> &'static str;

    /// True iff the job's source is this pipeline's variant. No I/O.
    fn can_handle(&self, job: &IngestionJob) -> bool;

    /// Run the job and return published object names in upload order.
    fn run(&self, job: &IngestionJob) -> Result<Vec<String>>;
}

/// Kaggle dataset pipeline.
pub struct KagglePipeline {
    downloader: Arc<dyn Downloader<KaggleSource>>,
    publisher: Arc<dyn Publisher>,
}

impl KagglePipeline {
    pub fn new(
        downloader: Arc<dyn Downloader<KaggleSource>>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            downloader,
            publisher,
        }
    }

    fn source<'a>(&self, job: &'a IngestionJob) -> Result<&'a KaggleSource, IngestionError> {
        match job.source() {
            DataSource::Kaggle(source) => Ok(source),
            other => Err(IngestionError::SourceMismatch {
                pipeline: self.name(),
                expected: SourceKind::Kaggle,
                found: other.kind(),
            }),
        }
    }
}

impl Pipeline for KagglePipeline {
    fn name(&self) -> &'static str {
        "KagglePipeline"
    }

    fn can_handle(&self, job: &IngestionJob) -> bool {
        matches!(job.source(), DataSource::Kaggle(_))
    }

    fn run(&self, job: &IngestionJob) -> Result<Vec<String>> {
        let source = self.source(job)?;
        log::info!(
            "{}: executing Kaggle ingestion of {}",
            job.job_id(),
            source.dataset_ref()
        );
        execute(job, self.publisher.as_ref(), |dir| {
            self.downloader
                .download(source, dir, source.files_to_pull())
                .map_err(IngestionError::Kaggle)
        })
    }
}

/// arXiv category pipeline.
pub struct ArxivPipeline {
    downloader: Arc<dyn Downloader<ArxivSource>>,
    publisher: Arc<dyn Publisher>,
}

impl ArxivPipeline {
    pub fn new(
        downloader: Arc<dyn Downloader<ArxivSource>>,
        publisher: Arc<dyn Publisher>,
    ) -> Self {
        Self {
            downloader,
            publisher,
        }
    }

    fn source<'a>(&self, job: &'a IngestionJob) -> Result<&'a ArxivSource, IngestionError> {
        match job.source() {
            DataSource::Arxiv(source) => Ok(source),
            other => Err(IngestionError::SourceMismatch {
                pipeline: self.name(),
                expected: SourceKind::Arxiv,
                found: other.kind(),
            }),
        }
    }
}

impl Pipeline for ArxivPipeline {
    fn name(&self) -> &'static str {
        "ArxivPipeline"
    }

    fn can_handle(&self, job: &IngestionJob) -> bool {
        matches!(job.source(), DataSource::Arxiv(_))
    }

    fn run(&self, job: &IngestionJob) -> Result<Vec<String>> {
        let source = self.source(job)?;
        log::info!(
            "{}: executing arXiv ingestion of {} ({})",
            job.job_id(),
            source.dataset_ref(),
            source.category()
        );
        execute(job, self.publisher.as_ref(), |dir| {
            self.downloader
                .download(source, dir, source.files_to_pull())
                .map_err(IngestionError::Arxiv)
        })
    }
}

/// Shared workflow once the source variant has been checked.
fn execute(
    job: &IngestionJob,
    publisher: &dyn Publisher,
    fetch: impl FnOnce(&Path) -> Result<Vec<PathBuf>, IngestionError>,
) -> Result<Vec<String>> {
    let workspace = workspace::prepare_workspace(job)?;
    let files = fetch(&workspace)?;

    if files.is_empty() {
        log::warn!("{}: no files downloaded", job.job_id());
        return Ok(Vec::new());
    }
    log::info!("{}: {} file(s) downloaded", job.job_id(), files.len());

    let uploaded = publish_files(job, publisher, &files, &workspace)?;
    log::info!(
        "{}: completed ({} objects uploaded)",
        job.job_id(),
        uploaded.len()
    );
    Ok(uploaded)
}

/// Upload `files` in order; the first failure aborts the job.
fn publish_files(
    job: &IngestionJob,
    publisher: &dyn Publisher,
    files: &[PathBuf],
    workspace: &Path,
) -> Result<Vec<String>> {
    let destination = job.destination();
    let mut uploaded = Vec::with_capacity(files.len());
    for file in files {
        let relative = workspace::relative_to(file, workspace)?;
        let object_name = destination.object_name(&relative);
        publisher.publish(&destination.bucket, &object_name, file)?;
        log::info!(
            "{}: uploaded {} to bucket={} as {}",
            job.job_id(),
            relative.display(),
            destination.bucket,
            object_name
        );
        uploaded.push(object_name);
    }
    Ok(uploaded)
}
