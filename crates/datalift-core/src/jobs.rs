//! Managed job definitions, as read from the `[jobs]` section of the config

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;

use crate::error::IngestionError;
use crate::model::{ArxivSource, DataSource, Destination, IngestionJob, KaggleSource, SourceKind};

/// Named job definitions plus the bucket used when a job omits one.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct JobsConfig {
    pub default_bucket: Option<String>,
    pub jobs: BTreeMap<String, JobConfig>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JobConfig {
    pub dataset: DatasetConfig,
    #[serde(default)]
    pub destination: DestinationConfig,
}

/// Dataset descriptor. Which locator fields are required depends on `source`.
#[derive(Debug, Clone, Deserialize)]
pub struct DatasetConfig {
    #[serde(default)]
    pub source: SourceKind,
    pub owner_slug: Option<String>,
    pub category: Option<String>,
    pub dataset_slug: String,
    pub file_names: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DestinationConfig {
    pub bucket: Option<String>,
    pub prefix: Option<String>,
}

fn required<'a>(job: &str, field: &str, value: Option<&'a str>) -> Result<&'a str, IngestionError> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| IngestionError::InvalidJob {
            job: job.to_string(),
            reason: format!("dataset.{field} is required"),
        })
}

impl JobsConfig {
    /// Build the job named `job_name` rooted at `workspace`. `origin` names
    /// where the definitions came from, for the not-defined error.
    pub fn build_job(
        &self,
        job_name: &str,
        origin: &str,
        workspace: &Path,
    ) -> Result<IngestionJob, IngestionError> {
        let job_cfg = self
            .jobs
            .get(job_name)
            .ok_or_else(|| IngestionError::JobNotDefined {
                job: job_name.to_string(),
                origin: origin.to_string(),
            })?;

        let source = job_cfg.dataset.to_source(job_name)?;
        let destination = job_cfg
            .destination
            .to_destination(job_name, self.default_bucket.as_deref())?;

        Ok(IngestionJob::new(job_name, source, destination).with_workspace(workspace))
    }
}

impl DatasetConfig {
    /// Build the source variant named by `source`.
    pub fn to_source(&self, job: &str) -> Result<DataSource, IngestionError> {
        let slug = required(job, "dataset_slug", Some(&self.dataset_slug))?;
        let file_names = self.file_names.as_deref();
        let source = match self.source {
            SourceKind::Kaggle => {
                let owner = required(job, "owner_slug", self.owner_slug.as_deref())?;
                KaggleSource::new(owner, slug, file_names).into()
            }
            SourceKind::Arxiv => {
                let category = required(job, "category", self.category.as_deref())?;
                ArxivSource::new(category, slug, file_names).into()
            }
        };
        Ok(source)
    }
}

impl DestinationConfig {
    /// Resolve the destination, falling back to `default_bucket`.
    pub fn to_destination(
        &self,
        job: &str,
        default_bucket: Option<&str>,
    ) -> Result<Destination, IngestionError> {
        let bucket = self
            .bucket
            .as_deref()
            .or(default_bucket)
            .map(str::trim)
            .unwrap_or_default();
        if bucket.is_empty() {
            return Err(IngestionError::InvalidJob {
                job: job.to_string(),
                reason: "no destination bucket and no default_bucket configured".into(),
            });
        }
        Ok(Destination::new(
            bucket,
            self.prefix.clone().unwrap_or_default(),
        ))
    }
}
