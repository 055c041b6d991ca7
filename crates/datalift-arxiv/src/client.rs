//! arXiv category listing and PDF download client

use std::path::{Path, PathBuf};
use std::time::Duration;

use datalift_core::pipeline::Downloader;
use datalift_core::retry::{retry_with_backoff, Backoff, RetryPolicy};
use datalift_core::{workspace, ArxivSource, DownloadError, HttpClient, SharedProgress};

use crate::feed::{parse_feed, Feed, FeedEntry};

pub const DEFAULT_API_URL: &str = "http://export.arxiv.org/api/query";

#[derive(Debug, Clone)]
pub struct ArxivSettings {
    pub api_url: String,
    /// Upper bound on entries fetched per job
    pub max_results: usize,
    /// Entries requested per listing page
    pub batch_size: usize,
    /// Pause between listing pages (arXiv asks for 3s)
    pub request_delay: Duration,
    /// Applied to listing pages only
    pub retry: RetryPolicy,
}

impl Default for ArxivSettings {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            max_results: 10,
            batch_size: 10,
            request_delay: Duration::from_secs(3),
            retry: RetryPolicy::new(3, Backoff::Exponential(Duration::from_secs(3))),
        }
    }
}

/// Lists the newest papers of a category and downloads their PDFs.
pub struct ArxivClient {
    http: HttpClient,
    settings: ArxivSettings,
    progress: SharedProgress,
}

impl ArxivClient {
    pub fn new(http: HttpClient, settings: ArxivSettings, progress: SharedProgress) -> Self {
        Self {
            http,
            settings,
            progress,
        }
    }

    pub fn query_url(&self, category: &str, start: usize, max_results: usize) -> String {
        format!(
            "{}?search_query=cat:{category}&start={start}&max_results={max_results}",
            self.settings.api_url
        )
    }

    /// `(start, size)` of each listing page, capped at `max_results` in total.
    fn batches(&self) -> Vec<(usize, usize)> {
        let max = self.settings.max_results;
        let step = self.settings.batch_size.max(1);
        (0..max)
            .step_by(step)
            .map(|start| (start, step.min(max - start)))
            .collect()
    }

    fn fetch_page(&self, url: &str) -> Result<Feed, DownloadError> {
        retry_with_backoff(
            "arxiv listing",
            &self.settings.retry,
            DownloadError::is_retryable,
            || {
                let body = self.http.get_text(self.http.get(url))?;
                parse_feed(&body)
            },
        )
    }

    /// Listing entries for `category`, in feed order.
    pub fn fetch_listing(&self, category: &str) -> Result<Vec<FeedEntry>, DownloadError> {
        let mut entries = Vec::new();
        let batches = self.batches();
        for (i, &(start, size)) in batches.iter().enumerate() {
            if i > 0 && !self.settings.request_delay.is_zero() {
                std::thread::sleep(self.settings.request_delay);
            }
            let url = self.query_url(category, start, size);
            log::debug!("arXiv listing {url}");
            let page = self.fetch_page(&url)?;
            let received = page.entries.len();
            entries.extend(page.entries);

            let exhausted = page
                .total_results
                .is_some_and(|total| start + received >= total);
            if received == 0 || exhausted {
                break;
            }
        }
        log::info!("arXiv {category}: {} entries listed", entries.len());
        Ok(entries)
    }

    /// Download the entry's PDF into `dir` as `<arxiv id>.pdf`.
    pub fn download_pdf(&self, entry: &FeedEntry, dir: &Path) -> Result<PathBuf, DownloadError> {
        let path = dir.join(entry.file_name());
        let pb = self.progress.download_bar(&entry.file_name());
        let result = self
            .http
            .download_to_file(self.http.get(&entry.pdf_url()), &path, &pb);
        pb.finish_and_clear();
        result.inspect_err(|e| log::error!("Failed to download PDF for {}: {e}", entry.id))?;
        log::info!("Downloaded {}", path.display());
        Ok(path)
    }
}

impl Downloader<ArxivSource> for ArxivClient {
    fn download(
        &self,
        source: &ArxivSource,
        destination_dir: &Path,
        file_filter: Option<&[String]>,
    ) -> Result<Vec<PathBuf>, DownloadError> {
        workspace::ensure_dir(destination_dir)?;
        let entries = self.fetch_listing(source.category())?;
        select(&entries, file_filter)
            .into_iter()
            .map(|entry| self.download_pdf(entry, destination_dir))
            .collect()
    }
}

/// Entries whose PDF file name passes the allow-list, duplicates dropped.
fn select<'a>(entries: &'a [FeedEntry], file_filter: Option<&[String]>) -> Vec<&'a FeedEntry> {
    let mut seen = std::collections::HashSet::new();
    entries
        .iter()
        .filter(|e| workspace::is_allowed(&e.file_name(), file_filter))
        .filter(|e| seen.insert(e.file_name()))
        .collect()
}
