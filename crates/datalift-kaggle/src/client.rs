//! Kaggle dataset download client

use std::path::{Path, PathBuf};

use datalift_core::pipeline::Downloader;
use datalift_core::{workspace, DownloadError, HttpClient, KaggleSource, SharedProgress};

use crate::archive::extract_zip;
use crate::credentials::KaggleCredentials;

pub const DEFAULT_API_URL: &str = "https://www.kaggle.com/api/v1";

#[derive(Debug, Clone)]
pub struct KaggleSettings {
    pub api_url: String,
    pub credentials: KaggleCredentials,
}

impl KaggleSettings {
    pub fn new(credentials: KaggleCredentials) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            credentials,
        }
    }
}

/// Downloads whole datasets as a zip archive and unpacks them in place.
pub struct KaggleClient {
    http: HttpClient,
    settings: KaggleSettings,
    progress: SharedProgress,
}

impl KaggleClient {
    pub fn new(http: HttpClient, settings: KaggleSettings, progress: SharedProgress) -> Self {
        Self {
            http,
            settings,
            progress,
        }
    }

    fn download_url(&self, source: &KaggleSource) -> String {
        format!(
            "{}/datasets/download/{}/{}",
            self.settings.api_url.trim_end_matches('/'),
            source.owner_slug(),
            source.dataset_slug()
        )
    }

    /// Fetch the dataset archive for extraction into `dir`, returning the
    /// archive path. The archive sits next to `dir`, not inside it.
    pub fn download_archive(
        &self,
        source: &KaggleSource,
        dir: &Path,
    ) -> Result<PathBuf, DownloadError> {
        let archive = archive_path(dir, source.dataset_slug());
        let creds = &self.settings.credentials;
        let request = self
            .http
            .get(&self.download_url(source))
            .basic_auth(&creds.username, Some(&creds.key));

        log::info!(
            "Downloading Kaggle dataset {} into {}",
            source.dataset_ref(),
            dir.display()
        );
        let pb = self.progress.download_bar(&source.dataset_ref());
        let result = self.http.download_to_file(request, &archive, &pb);
        pb.finish_and_clear();

        let bytes = result.inspect_err(|e| {
            log::error!("Failed to download Kaggle dataset {}: {e}", source.dataset_ref());
        })?;
        log::debug!("{}: {bytes} bytes", archive.display());
        Ok(archive)
    }
}

impl Downloader<KaggleSource> for KaggleClient {
    fn download(
        &self,
        source: &KaggleSource,
        destination_dir: &Path,
        file_filter: Option<&[String]>,
    ) -> Result<Vec<PathBuf>, DownloadError> {
        workspace::ensure_dir(destination_dir)?;
        let archive = self.download_archive(source, destination_dir)?;
        unpack(&archive, destination_dir, file_filter)
    }
}

/// Where the archive for a dataset extracted into `dir` is stored.
///
/// A hidden sibling of `dir`, so no file inside the dataset can share its
/// path.
fn archive_path(dir: &Path, slug: &str) -> PathBuf {
    match (dir.parent(), dir.file_name()) {
        (Some(parent), Some(name)) => {
            parent.join(format!(".{}.{slug}.zip", name.to_string_lossy()))
        }
        _ => dir.join(format!(".{slug}.download.zip")),
    }
}

/// Extract `archive` into `dir`, drop the archive, list what remains and
/// apply the allow-list.
fn unpack(
    archive: &Path,
    dir: &Path,
    file_filter: Option<&[String]>,
) -> Result<Vec<PathBuf>, DownloadError> {
    let extracted = extract_zip(archive, dir);
    std::fs::remove_file(archive)?;
    extracted?;

    let files = workspace::list_files(dir)?;
    Ok(workspace::filter_files(files, file_filter))
}
