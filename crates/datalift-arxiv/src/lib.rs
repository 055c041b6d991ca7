//! Datalift arXiv - category listings and PDF downloads from the arXiv API
//!
//! The Atom query API is paged in batches with a pause between pages.
//! Each listed paper's PDF is saved as `<arxiv id>.pdf`.

pub mod client;
pub mod feed;

pub use client::{ArxivClient, ArxivSettings, DEFAULT_API_URL};
pub use feed::{parse_feed, Feed, FeedEntry};
