//! S3-compatible publisher (MinIO, AWS)

use std::collections::HashSet;
use std::fs::File;
use std::io::Write;
use std::path::Path;
use std::sync::Mutex;

use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_s3::error::DisplayErrorContext;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{BucketLocationConstraint, CreateBucketConfiguration};
use datalift_core::{Publisher, StorageError, SHARED_RUNTIME};

use crate::settings::{StoreSettings, DEFAULT_REGION};
use crate::ObjectStore;

/// Uploads through the S3 API with path-style addressing.
pub struct S3Publisher {
    client: aws_sdk_s3::Client,
    region: String,
    /// Buckets already checked or created during this process
    ensured: Mutex<HashSet<String>>,
}

impl S3Publisher {
    pub fn new(settings: &StoreSettings) -> Self {
        let creds = Credentials::new(
            &settings.access_key,
            &settings.secret_key,
            None,
            None,
            "datalift",
        );
        let config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .endpoint_url(settings.endpoint_url())
            .credentials_provider(creds)
            .region(Region::new(settings.region.clone()))
            .force_path_style(true)
            .build();
        log::debug!("S3 endpoint {}", settings.endpoint_url());

        Self {
            client: aws_sdk_s3::Client::from_conf(config),
            region: settings.region.clone(),
            ensured: Mutex::new(HashSet::new()),
        }
    }

    fn already_ensured(&self, bucket: &str) -> bool {
        self.ensured
            .lock()
            .map(|set| set.contains(bucket))
            .unwrap_or(false)
    }

    fn mark_ensured(&self, bucket: &str) {
        if let Ok(mut set) = self.ensured.lock() {
            set.insert(bucket.to_string());
        }
    }

    /// Create `bucket` if it does not exist. Returns true if it was created.
    pub fn ensure_bucket(&self, bucket: &str) -> Result<bool, StorageError> {
        if self.already_ensured(bucket) {
            return Ok(false);
        }

        let exists = SHARED_RUNTIME.handle().block_on(async {
            match self.client.head_bucket().bucket(bucket).send().await {
                Ok(_) => Ok(true),
                Err(err) if err.as_service_error().is_some_and(|e| e.is_not_found()) => Ok(false),
                Err(err) => Err(bucket_error(bucket, DisplayErrorContext(&err).to_string())),
            }
        })?;
        let created = if exists {
            false
        } else {
            self.create_bucket(bucket)?
        };

        self.mark_ensured(bucket);
        Ok(created)
    }

    /// Issue `CreateBucket`. A bucket this account already owns counts as
    /// success and returns false.
    pub fn create_bucket(&self, bucket: &str) -> Result<bool, StorageError> {
        let mut request = self.client.create_bucket().bucket(bucket);
        if self.region != DEFAULT_REGION {
            request = request.create_bucket_configuration(
                CreateBucketConfiguration::builder()
                    .location_constraint(BucketLocationConstraint::from(self.region.as_str()))
                    .build(),
            );
        }

        let created = SHARED_RUNTIME.handle().block_on(async {
            match request.send().await {
                Ok(_) => Ok(true),
                Err(err)
                    if err
                        .as_service_error()
                        .is_some_and(|e| e.is_bucket_already_owned_by_you()) =>
                {
                    Ok(false)
                }
                Err(err) => Err(bucket_error(bucket, DisplayErrorContext(&err).to_string())),
            }
        })?;

        if created {
            log::info!("Created bucket {bucket}");
        } else {
            log::debug!("Bucket {bucket} already owned");
        }
        Ok(created)
    }
}

fn bucket_error(bucket: &str, message: String) -> StorageError {
    StorageError::BucketCreation {
        bucket: bucket.to_string(),
        message,
    }
}

impl Publisher for S3Publisher {
    fn publish(
        &self,
        bucket: &str,
        object_name: &str,
        local_path: &Path,
    ) -> Result<(), StorageError> {
        self.ensure_bucket(bucket)?;

        let upload_err = |message: String| StorageError::ObjectUpload {
            bucket: bucket.to_string(),
            object: object_name.to_string(),
            message,
        };
        let content_type = mime_guess::from_path(local_path)
            .first_or_octet_stream()
            .to_string();

        SHARED_RUNTIME.handle().block_on(async {
            let body = ByteStream::from_path(local_path)
                .await
                .map_err(|e| upload_err(e.to_string()))?;
            self.client
                .put_object()
                .bucket(bucket)
                .key(object_name)
                .content_type(content_type)
                .body(body)
                .send()
                .await
                .map_err(|e| upload_err(DisplayErrorContext(&e).to_string()))?;
            Ok::<_, StorageError>(())
        })?;

        log::debug!("Uploaded {} to {bucket}/{object_name}", local_path.display());
        Ok(())
    }
}

impl ObjectStore for S3Publisher {
    fn download(&self, bucket: &str, object_name: &str, dest: &Path) -> Result<u64, StorageError> {
        let download_err = |message: String| StorageError::ObjectDownload {
            bucket: bucket.to_string(),
            object: object_name.to_string(),
            message,
        };
        let io_err = |source: std::io::Error| StorageError::Io {
            path: dest.to_path_buf(),
            source,
        };

        SHARED_RUNTIME.handle().block_on(async {
            let mut response = self
                .client
                .get_object()
                .bucket(bucket)
                .key(object_name)
                .send()
                .await
                .map_err(|e| download_err(DisplayErrorContext(&e).to_string()))?;

            crate::create_parent(dest)?;
            let mut out = File::create(dest).map_err(io_err)?;
            let mut written = 0u64;
            while let Some(chunk) = response
                .body
                .try_next()
                .await
                .map_err(|e| download_err(e.to_string()))?
            {
                out.write_all(&chunk).map_err(io_err)?;
                written += chunk.len() as u64;
            }
            out.flush().map_err(io_err)?;
            Ok::<_, StorageError>(written)
        })
    }
}
