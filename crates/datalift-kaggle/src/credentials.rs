//! Kaggle API credentials
//!
//! Resolution order: explicit values from config, `KAGGLE_USERNAME` /
//! `KAGGLE_KEY`, then `kaggle.json` in `$KAGGLE_CONFIG_DIR` or `~/.kaggle`.

use std::fmt;
use std::path::{Path, PathBuf};

use datalift_core::DownloadError;
use serde::Deserialize;

#[derive(Clone, Deserialize)]
pub struct KaggleCredentials {
    pub username: String,
    pub key: String,
}

impl fmt::Debug for KaggleCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("KaggleCredentials")
            .field("username", &self.username)
            .field("key", &"***")
            .finish()
    }
}

impl KaggleCredentials {
    pub fn new(username: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            key: key.into(),
        }
    }

    /// Parse a `kaggle.json` file (`{"username": ..., "key": ...}`).
    pub fn from_file(path: &Path) -> Result<Self, DownloadError> {
        let text = std::fs::read_to_string(path)?;
        serde_json::from_str(&text)
            .map_err(|e| DownloadError::Auth(format!("{}: {e}", path.display())))
    }

    /// Location of `kaggle.json`, if a home or override directory exists.
    pub fn default_file() -> Option<PathBuf> {
        if let Ok(dir) = std::env::var("KAGGLE_CONFIG_DIR") {
            return Some(PathBuf::from(dir).join("kaggle.json"));
        }
        directories::BaseDirs::new().map(|d| d.home_dir().join(".kaggle").join("kaggle.json"))
    }

    /// Resolve credentials from config, the environment, then `kaggle.json`.
    pub fn resolve(username: Option<&str>, key: Option<&str>) -> Result<Self, DownloadError> {
        Self::resolve_with(
            username,
            key,
            |name| std::env::var(name).ok(),
            Self::default_file().as_deref(),
        )
    }

    fn resolve_with(
        username: Option<&str>,
        key: Option<&str>,
        env: impl Fn(&str) -> Option<String>,
        file: Option<&Path>,
    ) -> Result<Self, DownloadError> {
        let non_empty = |v: Option<String>| v.filter(|s| !s.trim().is_empty());

        let username =
            non_empty(username.map(str::to_string)).or_else(|| non_empty(env("KAGGLE_USERNAME")));
        let key = non_empty(key.map(str::to_string)).or_else(|| non_empty(env("KAGGLE_KEY")));
        if let (Some(username), Some(key)) = (username, key) {
            return Ok(Self::new(username, key));
        }

        match file {
            Some(path) if path.is_file() => {
                log::debug!("Using Kaggle credentials from {}", path.display());
                Self::from_file(path)
            }
            _ => Err(DownloadError::Auth(
                "no Kaggle credentials (set [kaggle] username/key, KAGGLE_USERNAME/KAGGLE_KEY \
                 or ~/.kaggle/kaggle.json)"
                    .into(),
            )),
        }
    }
}
