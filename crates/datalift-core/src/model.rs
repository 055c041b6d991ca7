//! Job descriptions: what to fetch and where it goes

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Default workspace root for downloads
pub const DEFAULT_WORKSPACE: &str = "data/tmp";

/// Source variant tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    #[default]
    Kaggle,
    Arxiv,
}

impl SourceKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Kaggle => "kaggle",
            Self::Arxiv => "arxiv",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Trim allow-list entries and drop the empty ones.
///
/// `None` stays `None` so "no filter" and "filter with only blanks" remain
/// distinguishable; the latter never requires filtering.
fn normalize_file_names<I, S>(file_names: Option<I>) -> Option<Vec<String>>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    file_names.map(|names| {
        names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .collect()
    })
}

/// A Kaggle dataset, addressed as `owner/slug`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KaggleSource {
    name: String,
    owner_slug: String,
    dataset_slug: String,
    file_names: Option<Vec<String>>,
}

impl KaggleSource {
    pub fn new<I, S>(owner_slug: &str, dataset_slug: &str, file_names: Option<I>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let owner_slug = owner_slug.trim().to_string();
        let dataset_slug = dataset_slug.trim().to_string();
        Self {
            name: format!("kaggle::{owner_slug}/{dataset_slug}"),
            owner_slug,
            dataset_slug,
            file_names: normalize_file_names(file_names),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn owner_slug(&self) -> &str {
        &self.owner_slug
    }

    pub fn dataset_slug(&self) -> &str {
        &self.dataset_slug
    }

    pub fn dataset_ref(&self) -> String {
        format!("{}/{}", self.owner_slug, self.dataset_slug)
    }

    pub fn files_to_pull(&self) -> Option<&[String]> {
        self.file_names.as_deref()
    }
}

/// An arXiv category listing, stored under `dataset_slug`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArxivSource {
    name: String,
    category: String,
    dataset_slug: String,
    file_names: Option<Vec<String>>,
}

impl ArxivSource {
    pub fn new<I, S>(category: &str, dataset_slug: &str, file_names: Option<I>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let category = category.trim().to_string();
        let dataset_slug = dataset_slug.trim().to_string();
        Self {
            name: format!("arxiv::{category}/{dataset_slug}"),
            category,
            dataset_slug,
            file_names: normalize_file_names(file_names),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn category(&self) -> &str {
        &self.category
    }

    pub fn dataset_slug(&self) -> &str {
        &self.dataset_slug
    }

    pub fn dataset_ref(&self) -> String {
        self.dataset_slug.clone()
    }

    pub fn files_to_pull(&self) -> Option<&[String]> {
        self.file_names.as_deref()
    }
}

/// Where a job's data comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DataSource {
    Kaggle(KaggleSource),
    Arxiv(ArxivSource),
}

impl DataSource {
    pub fn kind(&self) -> SourceKind {
        match self {
            Self::Kaggle(_) => SourceKind::Kaggle,
            Self::Arxiv(_) => SourceKind::Arxiv,
        }
    }

    pub fn name(&self) -> &str {
        match self {
            Self::Kaggle(s) => s.name(),
            Self::Arxiv(s) => s.name(),
        }
    }

    pub fn dataset_ref(&self) -> String {
        match self {
            Self::Kaggle(s) => s.dataset_ref(),
            Self::Arxiv(s) => s.dataset_ref(),
        }
    }

    /// Trimmed, non-empty allow-list, or `None` when every file is kept.
    pub fn files_to_pull(&self) -> Option<&[String]> {
        match self {
            Self::Kaggle(s) => s.files_to_pull(),
            Self::Arxiv(s) => s.files_to_pull(),
        }
    }

    pub fn requires_filtering(&self) -> bool {
        self.files_to_pull().is_some_and(|f| !f.is_empty())
    }
}

impl From<KaggleSource> for DataSource {
    fn from(s: KaggleSource) -> Self {
        Self::Kaggle(s)
    }
}

impl From<ArxivSource> for DataSource {
    fn from(s: ArxivSource) -> Self {
        Self::Arxiv(s)
    }
}

/// Target bucket plus object-name prefix.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Destination {
    pub bucket: String,
    pub prefix: String,
}

impl Destination {
    pub fn new(bucket: impl Into<String>, prefix: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            prefix: prefix.into(),
        }
    }

    /// Object name for a path relative to the job workspace.
    ///
    /// `prefix = "/raw/"`, `a/b.csv` gives `raw/a/b.csv`; an empty prefix
    /// gives the relative path alone.
    pub fn object_name(&self, relative_path: &Path) -> String {
        let prefix = self.prefix.trim_matches('/');
        let relative = relative_path
            .components()
            .filter_map(|c| match c {
                std::path::Component::Normal(part) => Some(part.to_string_lossy()),
                _ => None,
            })
            .collect::<Vec<_>>()
            .join("/");

        [prefix, relative.as_str()]
            .into_iter()
            .filter(|part| !part.is_empty())
            .collect::<Vec<_>>()
            .join("/")
    }
}

/// One request to move one dataset into object storage.
#[derive(Debug, Clone)]
pub struct IngestionJob {
    job_id: String,
    source: DataSource,
    destination: Destination,
    workspace: PathBuf,
}

impl IngestionJob {
    pub fn new(job_id: impl Into<String>, source: DataSource, destination: Destination) -> Self {
        Self {
            job_id: job_id.into(),
            source,
            destination,
            workspace: PathBuf::from(DEFAULT_WORKSPACE),
        }
    }

    /// Override the workspace root (defaults to [`DEFAULT_WORKSPACE`]).
    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = workspace.into();
        self
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn source(&self) -> &DataSource {
        &self.source
    }

    pub fn destination(&self) -> &Destination {
        &self.destination
    }

    pub fn kind(&self) -> SourceKind {
        self.source.kind()
    }

    /// Workspace root shared by all jobs.
    pub fn workspace_root(&self) -> &Path {
        &self.workspace
    }

    /// Per-job scratch directory: `<workspace>/<job_id>`.
    pub fn workspace_path(&self) -> PathBuf {
        self.workspace.join(&self.job_id)
    }
}
