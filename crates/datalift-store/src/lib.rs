//! Datalift Store - publishing ingested files to object storage
//!
//! [`S3Publisher`] talks to MinIO or any S3-compatible endpoint.
//! [`LocalPublisher`] writes the same layout to a directory tree.

use std::path::Path;

use datalift_core::{Publisher, StorageError};

pub mod local;
pub mod s3;
pub mod settings;

pub use local::LocalPublisher;
pub use s3::S3Publisher;
pub use settings::{StoreOptions, StoreSettings};

/// A publisher that can also fetch objects back.
pub trait ObjectStore: Publisher {
    /// Copy `bucket/object_name` to `dest`, returning bytes written.
    fn download(&self, bucket: &str, object_name: &str, dest: &Path) -> Result<u64, StorageError>;
}

fn create_parent(path: &Path) -> Result<(), StorageError> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => {
            std::fs::create_dir_all(parent).map_err(|source| StorageError::Io {
                path: parent.to_path_buf(),
                source,
            })
        }
        _ => Ok(()),
    }
}
