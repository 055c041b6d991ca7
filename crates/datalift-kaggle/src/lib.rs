//! Datalift Kaggle - dataset downloads from the Kaggle public API
//!
//! Datasets are fetched as a single zip archive with HTTP basic auth,
//! unpacked into the job workspace and filtered by base name.

pub mod archive;
pub mod client;
pub mod credentials;

pub use client::{KaggleClient, KaggleSettings, DEFAULT_API_URL};
pub use credentials::KaggleCredentials;
