//! Datalift Core - ingestion jobs from public dataset sources into object storage
//!
//! A job names a source, a destination bucket/prefix and a workspace. The
//! orchestrator resolves the job to a pipeline, which prepares the workspace,
//! calls the source downloader and publishes every retrieved file.
//! Network clients live in their own crates and plug in through
//! [`Downloader`] and [`Publisher`].

pub mod error;
pub mod http;
pub mod jobs;
pub mod logging;
pub mod model;
pub mod orchestrator;
pub mod pipeline;
pub mod progress;
pub mod registry;
pub mod retry;
pub mod workspace;

// Re-exports for convenience
pub use error::{DownloadError, Error, IngestionError, Result, StorageError};
pub use http::{HttpClient, HttpSettings, SHARED_RUNTIME};
pub use jobs::{DatasetConfig, DestinationConfig, JobConfig, JobsConfig};
pub use logging::{init_logging, IndicatifLogger, Verbosity};
pub use model::{
    ArxivSource, DataSource, Destination, IngestionJob, KaggleSource, SourceKind,
    DEFAULT_WORKSPACE,
};
pub use orchestrator::{Collaborators, JobRunner, Orchestrator};
pub use pipeline::{ArxivPipeline, Downloader, KagglePipeline, Pipeline, Publisher};
pub use progress::{ProgressContext, SharedProgress};
pub use registry::PipelineRegistry;
pub use retry::{retry_with_backoff, Backoff, RetryPolicy};
