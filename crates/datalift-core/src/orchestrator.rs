//! Orchestrator and job runner
//!
//! The orchestrator owns the job definitions (read once, never reloaded) and
//! the collaborators every pipeline needs. A fresh registry is built for each
//! resolution; pipelines hold nothing but `Arc`s, so this is cheap and needs
//! no locking.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::error::{IngestionError, Result};
use crate::jobs::JobsConfig;
use crate::model::{ArxivSource, IngestionJob, KaggleSource, DEFAULT_WORKSPACE};
use crate::pipeline::{ArxivPipeline, Downloader, KagglePipeline, Publisher};
use crate::registry::PipelineRegistry;

/// External clients injected into the pipelines.
#[derive(Clone)]
pub struct Collaborators {
    pub kaggle: Arc<dyn Downloader<KaggleSource>>,
    pub arxiv: Arc<dyn Downloader<ArxivSource>>,
    pub publisher: Arc<dyn Publisher>,
}

/// Builds jobs from named configuration and runs them.
pub struct Orchestrator {
    config: JobsConfig,
    origin: String,
    workspace: PathBuf,
    collaborators: Collaborators,
}

impl Orchestrator {
    pub fn new(config: JobsConfig, collaborators: Collaborators) -> Self {
        Self {
            config,
            origin: "configuration".to_string(),
            workspace: PathBuf::from(DEFAULT_WORKSPACE),
            collaborators,
        }
    }

    /// Describe where the job definitions came from (used in errors).
    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = origin.into();
        self
    }

    /// Workspace root handed to every job built here.
    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = workspace.into();
        self
    }

    pub fn workspace(&self) -> &Path {
        &self.workspace
    }

    pub fn jobs(&self) -> &JobsConfig {
        &self.config
    }

    /// Registry in dispatch order: Kaggle, then arXiv.
    pub fn registry(&self) -> PipelineRegistry {
        let c = &self.collaborators;
        PipelineRegistry::new(vec![
            Box::new(KagglePipeline::new(c.kaggle.clone(), c.publisher.clone())),
            Box::new(ArxivPipeline::new(c.arxiv.clone(), c.publisher.clone())),
        ])
    }

    /// Build the job named `job_name`. Fails before any I/O on a missing or
    /// malformed definition.
    pub fn build_job(&self, job_name: &str) -> Result<IngestionJob, IngestionError> {
        self.config.build_job(job_name, &self.origin, &self.workspace)
    }

    /// Build, resolve and run a managed job.
    pub fn run(&self, job_name: &str) -> Result<Vec<String>> {
        let job = self.build_job(job_name)?;
        self.run_job(&job)
    }

    /// Resolve and run an already-built job.
    pub fn run_job(&self, job: &IngestionJob) -> Result<Vec<String>> {
        let registry = self.registry();
        let pipeline = registry.resolve(job)?;
        pipeline.run(job)
    }
}

/// Entry point used by the CLI.
pub struct JobRunner {
    orchestrator: Orchestrator,
}

impl JobRunner {
    pub fn new(orchestrator: Orchestrator) -> Self {
        Self { orchestrator }
    }

    pub fn orchestrator(&self) -> &Orchestrator {
        &self.orchestrator
    }

    /// Run a job defined in configuration.
    pub fn run(&self, job_name: &str) -> Result<Vec<String>> {
        log::info!("Starting job {job_name}");
        let uploaded = self.orchestrator.run(job_name)?;
        log::info!("{job_name}: {} object(s) published", uploaded.len());
        Ok(uploaded)
    }

    /// Run a configured job the caller already built and validated.
    pub fn run_job(&self, job: &IngestionJob) -> Result<Vec<String>> {
        log::info!("Starting job {}", job.job_id());
        let uploaded = self.orchestrator.run_job(job)?;
        log::info!("{}: {} object(s) published", job.job_id(), uploaded.len());
        Ok(uploaded)
    }

    /// Run a job built by the caller.
    pub fn run_adhoc(&self, job: &IngestionJob) -> Result<Vec<String>> {
        log::info!(
            "Starting ad-hoc job {} ({})",
            job.job_id(),
            job.source().dataset_ref()
        );
        let uploaded = self.orchestrator.run_job(job)?;
        log::info!("{}: {} object(s) published", job.job_id(), uploaded.len());
        Ok(uploaded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{Error, StorageError};
    use crate::model::{DataSource, Destination, SourceKind};
    use crate::pipeline::testing::{FakeDownloader, RecordingPublisher};

    const CONFIG: &str = r#"
default_bucket = "fallback"

[jobs.demo.dataset]
owner_slug = "owner"
dataset_slug = "slug"

[jobs.demo.destination]
bucket = "lake"
prefix = "kaggle"

[jobs.defaulted.dataset]
owner_slug = "owner"
dataset_slug = "slug"

[jobs.papers.dataset]
source = "arxiv"
category = "cs.LG"
dataset_slug = "ml"

[jobs.papers.destination]
prefix = "/arxiv/"

[jobs.broken.dataset]
dataset_slug = "slug"
"#;

    struct Fixture {
        kaggle: Arc<FakeDownloader>,
        arxiv: Arc<FakeDownloader>,
        publisher: Arc<RecordingPublisher>,
        orchestrator: Orchestrator,
        _tmp: tempfile::TempDir,
    }

    fn fixture(kaggle_files: Vec<&'static str>, arxiv_files: Vec<&'static str>) -> Fixture {
        let tmp = tempfile::tempdir().unwrap();
        let kaggle = Arc::new(FakeDownloader::with_files(kaggle_files));
        let arxiv = Arc::new(FakeDownloader::with_files(arxiv_files));
        let publisher = Arc::new(RecordingPublisher::default());
        let config: JobsConfig = toml::from_str(CONFIG).unwrap();
        let orchestrator = Orchestrator::new(
            config,
            Collaborators {
                kaggle: kaggle.clone(),
                arxiv: arxiv.clone(),
                publisher: publisher.clone(),
            },
        )
        .with_origin("datalift.toml")
        .with_workspace(tmp.path());
        Fixture {
            kaggle,
            arxiv,
            publisher,
            orchestrator,
            _tmp: tmp,
        }
    }

    #[test]
    fn build_job_uses_name_as_id() {
        let f = fixture(vec![], vec![]);
        let job = f.orchestrator.build_job("demo").unwrap();
        assert_eq!(job.job_id(), "demo");
        assert_eq!(job.kind(), SourceKind::Kaggle);
        assert_eq!(job.source().dataset_ref(), "owner/slug");
        assert_eq!(job.destination(), &Destination::new("lake", "kaggle"));
        assert_eq!(job.workspace_root(), f.orchestrator.workspace());
    }

    #[test]
    fn build_job_applies_default_bucket() {
        let f = fixture(vec![], vec![]);
        let job = f.orchestrator.build_job("defaulted").unwrap();
        assert_eq!(job.destination().bucket, "fallback");
    }

    #[test]
    fn build_job_arxiv_variant() {
        let f = fixture(vec![], vec![]);
        let job = f.orchestrator.build_job("papers").unwrap();
        assert!(matches!(job.source(), DataSource::Arxiv(s) if s.category() == "cs.LG"));
    }

    #[test]
    fn undefined_job_fails() {
        let f = fixture(vec![], vec![]);
        let err = f.orchestrator.build_job("nope").unwrap_err();
        assert!(matches!(err, IngestionError::JobNotDefined { .. }));
        assert_eq!(err.to_string(), "job 'nope' not defined in datalift.toml");
    }

    #[test]
    fn malformed_job_fails_before_io() {
        let f = fixture(vec!["x.csv"], vec![]);
        let err = f.orchestrator.run("broken").unwrap_err();
        assert!(matches!(
            err,
            Error::Ingestion(IngestionError::InvalidJob { .. })
        ));
        assert_eq!(f.kaggle.calls(), 0);
        assert!(!f.orchestrator.workspace().join("broken").exists());
    }

    #[test]
    fn demo_end_to_end() {
        let f = fixture(vec!["x.csv", "y.csv"], vec![]);
        let runner = JobRunner::new(f.orchestrator);

        let uploaded = runner.run("demo").unwrap();

        assert_eq!(uploaded, vec!["kaggle/x.csv", "kaggle/y.csv"]);
        assert_eq!(
            f.publisher.published(),
            vec![
                ("lake".to_string(), "kaggle/x.csv".to_string()),
                ("lake".to_string(), "kaggle/y.csv".to_string()),
            ]
        );
        assert_eq!(f.arxiv.calls(), 0);
    }

    #[test]
    fn arxiv_job_dispatches_to_arxiv_downloader() {
        let f = fixture(vec![], vec!["2401.00001v1.pdf"]);
        let uploaded = f.orchestrator.run("papers").unwrap();
        assert_eq!(uploaded, vec!["arxiv/2401.00001v1.pdf"]);
        assert_eq!(f.kaggle.calls(), 0);
        assert_eq!(f.arxiv.calls(), 1);
        assert_eq!(f.publisher.published()[0].0, "fallback");
    }

    #[test]
    fn empty_download_publishes_nothing() {
        let f = fixture(vec![], vec![]);
        assert!(f.orchestrator.run("demo").unwrap().is_empty());
        assert!(f.publisher.published().is_empty());
    }

    #[test]
    fn adhoc_job_runs_through_registry() {
        let f = fixture(vec!["a.csv", "b.csv"], vec![]);
        let job = IngestionJob::new(
            "adhoc-1",
            KaggleSource::new("someone", "data", Some(vec!["b.csv"])).into(),
            Destination::new("scratch", ""),
        )
        .with_workspace(f.orchestrator.workspace());
        let runner = JobRunner::new(f.orchestrator);
        assert_eq!(runner.run_adhoc(&job).unwrap(), vec!["b.csv"]);
    }

    #[test]
    fn storage_error_propagates_unchanged() {
        let tmp = tempfile::tempdir().unwrap();
        let publisher = Arc::new(RecordingPublisher {
            fail_on: Some("kaggle/x.csv"),
            ..Default::default()
        });
        let orchestrator = Orchestrator::new(
            toml::from_str(CONFIG).unwrap(),
            Collaborators {
                kaggle: Arc::new(FakeDownloader::with_files(vec!["x.csv"])),
                arxiv: Arc::new(FakeDownloader::with_files(vec![])),
                publisher,
            },
        )
        .with_workspace(tmp.path());

        let err = orchestrator.run("demo").unwrap_err();
        assert!(matches!(
            err,
            Error::Storage(StorageError::ObjectUpload { ref object, .. }) if object == "kaggle/x.csv"
        ));
    }

    #[test]
    fn registry_is_rebuilt_in_fixed_order() {
        let f = fixture(vec![], vec![]);
        let job = f.orchestrator.build_job("demo").unwrap();
        assert_eq!(f.orchestrator.registry().matching(&job), vec!["KagglePipeline"]);
        assert_eq!(f.orchestrator.registry().len(), 2);
    }
}
