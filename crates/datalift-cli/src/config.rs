//! `datalift.toml`: jobs, store, source clients and HTTP timeouts

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

use datalift_core::{HttpSettings, JobConfig, JobsConfig, DEFAULT_WORKSPACE};

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Root for per-job scratch directories
    pub workspace: PathBuf,
    /// Bucket for jobs that don't name one
    pub default_bucket: Option<String>,
    pub jobs: BTreeMap<String, JobConfig>,
    pub storage: StorageConfig,
    pub kaggle: KaggleConfig,
    pub arxiv: ArxivConfig,
    pub http: HttpConfig,
    /// File this configuration was read from
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            workspace: PathBuf::from(DEFAULT_WORKSPACE),
            default_bucket: None,
            jobs: BTreeMap::new(),
            storage: StorageConfig::default(),
            kaggle: KaggleConfig::default(),
            arxiv: ArxivConfig::default(),
            http: HttpConfig::default(),
            path: None,
        }
    }
}

/// Object store connection. Unset values fall back to `MINIO_*` variables.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub endpoint: Option<String>,
    pub access_key: Option<String>,
    pub secret_key: Option<String>,
    pub region: Option<String>,
    pub secure: Option<bool>,
    /// Publish into this directory instead of an S3 endpoint
    pub local_dir: Option<PathBuf>,
}

impl StorageConfig {
    pub fn options(&self) -> datalift_store::StoreOptions {
        datalift_store::StoreOptions {
            endpoint: self.endpoint.clone(),
            access_key: self.access_key.clone(),
            secret_key: self.secret_key.clone(),
            region: self.region.clone(),
            secure: self.secure,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct KaggleConfig {
    pub api_url: String,
    pub username: Option<String>,
    pub key: Option<String>,
}

impl Default for KaggleConfig {
    fn default() -> Self {
        Self {
            api_url: datalift_kaggle::DEFAULT_API_URL.to_string(),
            username: None,
            key: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ArxivConfig {
    pub api_url: String,
    pub max_results: usize,
    pub batch_size: usize,
    pub request_delay_ms: u64,
    /// Attempts per listing page
    pub max_retries: u32,
}

impl Default for ArxivConfig {
    fn default() -> Self {
        Self {
            api_url: datalift_arxiv::DEFAULT_API_URL.to_string(),
            max_results: 10,
            batch_size: 10,
            request_delay_ms: 3000,
            max_retries: 3,
        }
    }
}

impl ArxivConfig {
    pub fn settings(&self) -> datalift_arxiv::ArxivSettings {
        let defaults = datalift_arxiv::ArxivSettings::default();
        datalift_arxiv::ArxivSettings {
            api_url: self.api_url.clone(),
            max_results: self.max_results,
            batch_size: self.batch_size,
            request_delay: Duration::from_millis(self.request_delay_ms),
            retry: datalift_core::RetryPolicy {
                max_attempts: self.max_retries,
                ..defaults.retry
            },
        }
    }
}

/// Timeouts in seconds
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    pub connect_timeout: u64,
    pub read_timeout: u64,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            connect_timeout: 30,
            read_timeout: 30,
        }
    }
}

impl HttpConfig {
    pub fn settings(&self) -> HttpSettings {
        HttpSettings {
            connect_timeout: Duration::from_secs(self.connect_timeout),
            read_timeout: Duration::from_secs(self.read_timeout),
        }
    }
}

/// Replace every `${VAR}` in `s` with its value from `lookup`.
///
/// Any unset variable makes the whole value unset, so the field falls back
/// to its environment default. An unterminated `${` is kept literally.
fn expand_vars(s: &str, lookup: impl Fn(&str) -> Option<String>) -> Option<String> {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;
    while let Some(open) = rest.find("${") {
        let Some(len) = rest[open + 2..].find('}') else {
            break;
        };
        out.push_str(&rest[..open]);
        out.push_str(&lookup(&rest[open + 2..open + 2 + len])?);
        rest = &rest[open + 3 + len..];
    }
    out.push_str(rest);
    Some(out)
}

impl Config {
    /// First of `./datalift.toml` and the user config dir's `config.toml`,
    /// or defaults when neither exists.
    pub fn load() -> Result<Self> {
        let local_config = PathBuf::from("datalift.toml");
        if local_config.exists() {
            return Self::from_file(&local_config);
        }

        if let Some(config_dir) = directories::ProjectDirs::from("", "", "datalift") {
            let user_config = config_dir.config_dir().join("config.toml");
            if user_config.exists() {
                return Self::from_file(&user_config);
            }
        }

        log::debug!("No config file found, using defaults");
        Ok(Self::default())
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config = Self::parse(&content, |name| std::env::var(name).ok())
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
        config.path = Some(path.to_path_buf());

        log::info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Parse TOML, then expand `${VAR}` references in the store and Kaggle
    /// connection values through `lookup`.
    fn parse(
        content: &str,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, toml::de::Error> {
        let mut config: Config = toml::from_str(content)?;
        let expand = |value: &mut Option<String>| {
            *value = value.take().and_then(|s| expand_vars(&s, &lookup));
        };
        let storage = &mut config.storage;
        for value in [
            &mut storage.endpoint,
            &mut storage.access_key,
            &mut storage.secret_key,
            &mut storage.region,
            &mut config.kaggle.username,
            &mut config.kaggle.key,
        ] {
            expand(value);
        }
        Ok(config)
    }

    /// Where the job definitions came from, for error messages.
    pub fn origin(&self) -> String {
        match &self.path {
            Some(path) => path.display().to_string(),
            None => "default configuration".to_string(),
        }
    }

    /// Managed job definitions for the orchestrator.
    pub fn jobs_config(&self) -> JobsConfig {
        JobsConfig {
            default_bucket: self.default_bucket.clone(),
            jobs: self.jobs.clone(),
        }
    }
}
