//! Subcommands and the collaborator wiring they share

pub mod get;
pub mod jobs;
pub mod run;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};
use comfy_table::{modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Cell, Color, Table};

use datalift_arxiv::ArxivClient;
use datalift_core::pipeline::Downloader;
use datalift_core::{
    Collaborators, DownloadError, HttpClient, JobRunner, KaggleSource, Orchestrator, Publisher,
    SharedProgress,
};
use datalift_kaggle::{KaggleClient, KaggleCredentials, KaggleSettings};
use datalift_store::{LocalPublisher, ObjectStore, S3Publisher, StoreSettings};

use crate::config::Config;

/// Object store selected by configuration.
pub enum Store {
    S3(Arc<S3Publisher>),
    Local(Arc<LocalPublisher>),
}

impl Store {
    pub fn from_config(config: &Config) -> Result<Self> {
        if let Some(dir) = &config.storage.local_dir {
            log::info!("Publishing to local directory {}", dir.display());
            return Ok(Self::Local(Arc::new(LocalPublisher::new(dir))));
        }
        let settings = StoreSettings::resolve(&config.storage.options())
            .context("Object store is not configured")?;
        Ok(Self::S3(Arc::new(S3Publisher::new(&settings))))
    }

    pub fn publisher(&self) -> Arc<dyn Publisher> {
        match self {
            Self::S3(p) => p.clone(),
            Self::Local(p) => p.clone(),
        }
    }

    pub fn object_store(&self) -> &dyn ObjectStore {
        match self {
            Self::S3(p) => p.as_ref(),
            Self::Local(p) => p.as_ref(),
        }
    }
}

/// Stands in for the Kaggle client when no credentials were found, so jobs
/// for other sources still run.
struct MissingKaggleCredentials(String);

impl Downloader<KaggleSource> for MissingKaggleCredentials {
    fn download(
        &self,
        _source: &KaggleSource,
        _destination_dir: &Path,
        _file_filter: Option<&[String]>,
    ) -> Result<Vec<PathBuf>, DownloadError> {
        Err(DownloadError::Auth(self.0.clone()))
    }
}

fn kaggle_downloader(
    config: &Config,
    http: &HttpClient,
    progress: &SharedProgress,
) -> Arc<dyn Downloader<KaggleSource>> {
    let creds =
        KaggleCredentials::resolve(config.kaggle.username.as_deref(), config.kaggle.key.as_deref());
    match creds {
        Ok(credentials) => {
            let settings = KaggleSettings {
                api_url: config.kaggle.api_url.clone(),
                credentials,
            };
            Arc::new(KaggleClient::new(http.clone(), settings, progress.clone()))
        }
        Err(e) => {
            log::debug!("Kaggle client unavailable: {e}");
            Arc::new(MissingKaggleCredentials(e.to_string()))
        }
    }
}

/// Build the job runner with real clients.
pub fn job_runner(
    config: &Config,
    workspace: Option<PathBuf>,
    progress: &SharedProgress,
) -> Result<JobRunner> {
    let http = HttpClient::new(&config.http.settings()).context("Failed to build HTTP client")?;
    let store = Store::from_config(config)?;

    let collaborators = Collaborators {
        kaggle: kaggle_downloader(config, &http, progress),
        arxiv: Arc::new(ArxivClient::new(
            http.clone(),
            config.arxiv.settings(),
            progress.clone(),
        )),
        publisher: store.publisher(),
    };

    let orchestrator = Orchestrator::new(config.jobs_config(), collaborators)
        .with_origin(config.origin())
        .with_workspace(workspace.unwrap_or_else(|| config.workspace.clone()));
    Ok(JobRunner::new(orchestrator))
}

/// Print a key-value summary table on stderr
pub fn print_summary(title: &str, rows: &[(&str, String)]) {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_header(vec![
            Cell::new(title).fg(Color::Cyan),
            Cell::new("Value").fg(Color::Cyan),
        ]);
    for (label, value) in rows {
        table.add_row(vec![Cell::new(label), Cell::new(value)]);
    }
    eprintln!("\n{table}");
}
