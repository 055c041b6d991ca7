//! Integration tests for datalift-arxiv
//!
//! These tests require network access and are marked #[ignore] by default.
//! Run with: cargo test -p datalift-arxiv --test integration -- --ignored

use std::sync::Arc;

use datalift_arxiv::{ArxivClient, ArxivSettings};
use datalift_core::pipeline::Downloader;
use datalift_core::{ArxivSource, HttpClient, HttpSettings, ProgressContext};
use tempfile::TempDir;

fn client(max_results: usize, batch_size: usize) -> ArxivClient {
    let http = HttpClient::new(&HttpSettings::default()).expect("HTTP client");
    let settings = ArxivSettings {
        max_results,
        batch_size,
        ..Default::default()
    };
    ArxivClient::new(http, settings, Arc::new(ProgressContext::hidden()))
}

/// Run with: cargo test -p datalift-arxiv --test integration -- --ignored listing_pages
#[test]
#[ignore]
fn listing_pages() {
    let entries = client(4, 2)
        .fetch_listing("cs.LG")
        .expect("Listing should succeed");

    assert!(!entries.is_empty() && entries.len() <= 4);
    for entry in &entries {
        assert!(!entry.arxiv_id().is_empty());
        assert!(entry.pdf_url().contains("/pdf/"), "{}", entry.pdf_url());
    }
}

/// Run with: cargo test -p datalift-arxiv --test integration -- --ignored download_papers
#[test]
#[ignore]
fn download_papers() {
    let temp_dir = TempDir::new().expect("Failed to create temp dir");
    let source = ArxivSource::new("cs.LG", "ml-papers", None::<Vec<String>>);

    let files = client(2, 2)
        .download(&source, temp_dir.path(), None)
        .expect("Download should succeed");

    assert!(!files.is_empty());
    for file in &files {
        assert_eq!(file.extension().and_then(|e| e.to_str()), Some("pdf"));
        let size = std::fs::metadata(file).unwrap().len();
        assert!(size > 10_000, "PDF should be > 10KB, got {size} bytes");
    }

    // Part files are renamed on completion
    let leftovers = std::fs::read_dir(temp_dir.path())
        .unwrap()
        .filter_map(|e| e.ok())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "part"))
        .count();
    assert_eq!(leftovers, 0);
}
