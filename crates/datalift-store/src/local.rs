//! Filesystem publisher: `<root>/<bucket>/<object name>`
//!
//! Same contract as the S3 publisher, for offline runs and tests.

use std::fs;
use std::path::{Component, Path, PathBuf};

use datalift_core::{Publisher, StorageError};

use crate::ObjectStore;

pub struct LocalPublisher {
    root: PathBuf,
}

impl LocalPublisher {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path of `object_name` inside `bucket`, or `None` if either would
    /// leave the root.
    fn object_path(&self, bucket: &str, object_name: &str) -> Option<PathBuf> {
        let mut path = self.root.clone();
        for part in [bucket, object_name] {
            let rel = Path::new(part);
            if part.is_empty() || !rel.components().all(|c| matches!(c, Component::Normal(_))) {
                return None;
            }
            path.push(rel);
        }
        Some(path)
    }
}

impl Publisher for LocalPublisher {
    fn publish(
        &self,
        bucket: &str,
        object_name: &str,
        local_path: &Path,
    ) -> Result<(), StorageError> {
        let target = self
            .object_path(bucket, object_name)
            .ok_or_else(|| StorageError::ObjectUpload {
                bucket: bucket.to_string(),
                object: object_name.to_string(),
                message: "invalid bucket or object name".into(),
            })?;

        let bucket_dir = self.root.join(bucket);
        if !bucket_dir.exists() {
            log::info!("Created bucket {bucket} under {}", self.root.display());
        }
        crate::create_parent(&target)?;
        fs::copy(local_path, &target).map_err(|source| StorageError::Io {
            path: local_path.to_path_buf(),
            source,
        })?;
        log::debug!("Copied {} to {}", local_path.display(), target.display());
        Ok(())
    }
}

impl ObjectStore for LocalPublisher {
    fn download(&self, bucket: &str, object_name: &str, dest: &Path) -> Result<u64, StorageError> {
        let not_found = |message: &str| StorageError::ObjectDownload {
            bucket: bucket.to_string(),
            object: object_name.to_string(),
            message: message.to_string(),
        };
        let source = self
            .object_path(bucket, object_name)
            .ok_or_else(|| not_found("invalid bucket or object name"))?;
        if !source.is_file() {
            return Err(not_found("no such object"));
        }
        crate::create_parent(dest)?;
        fs::copy(&source, dest).map_err(|source| StorageError::Io {
            path: dest.to_path_buf(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn setup() -> (tempfile::TempDir, LocalPublisher, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let publisher = LocalPublisher::new(dir.path().join("store"));
        let file = dir.path().join("x.csv");
        fs::write(&file, "a,b\n").unwrap();
        (dir, publisher, file)
    }

    #[test]
    fn publish_creates_bucket_and_prefix_dirs() {
        let (_dir, publisher, file) = setup();
        publisher.publish("lake", "raw/kaggle/x.csv", &file).unwrap();
        let stored = publisher.root().join("lake/raw/kaggle/x.csv");
        assert_eq!(fs::read_to_string(stored).unwrap(), "a,b\n");
    }

    #[test]
    fn publish_overwrites_existing_object() {
        let (dir, publisher, file) = setup();
        publisher.publish("lake", "x.csv", &file).unwrap();
        let newer = dir.path().join("newer.csv");
        fs::write(&newer, "c,d\n").unwrap();
        publisher.publish("lake", "x.csv", &newer).unwrap();
        assert_eq!(
            fs::read_to_string(publisher.root().join("lake/x.csv")).unwrap(),
            "c,d\n"
        );
    }

    #[test]
    fn publish_rejects_escaping_names() {
        let (_dir, publisher, file) = setup();
        for (bucket, object) in [("lake", "../x.csv"), ("..", "x.csv"), ("", "x.csv")] {
            assert!(matches!(
                publisher.publish(bucket, object, &file),
                Err(StorageError::ObjectUpload { .. })
            ));
        }
    }

    #[test]
    fn publish_missing_file_is_io_error() {
        let (dir, publisher, _) = setup();
        let err = publisher
            .publish("lake", "gone.csv", &dir.path().join("gone.csv"))
            .unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));
    }

    #[test]
    fn download_round_trip() {
        let (dir, publisher, file) = setup();
        publisher.publish("lake", "p/x.csv", &file).unwrap();
        let dest = dir.path().join("out/x.csv");
        assert_eq!(publisher.download("lake", "p/x.csv", &dest).unwrap(), 4);
        assert_eq!(fs::read_to_string(dest).unwrap(), "a,b\n");
    }

    #[test]
    fn download_missing_object() {
        let (dir, publisher, _) = setup();
        let err = publisher
            .download("lake", "nope.csv", &dir.path().join("nope.csv"))
            .unwrap_err();
        assert!(matches!(err, StorageError::ObjectDownload { .. }));
    }
}
