//! S3-backed object store

use crate::{object_url, ObjectStore, Result, StoreError};
use anyhow::Context;
use async_trait::async_trait;
use aws_config::BehaviorVersion;
use aws_sdk_s3::error::{ProvideErrorMetadata, SdkError};
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use std::path::Path;
use tracing::{debug, warn};

/// Upper bound on keys per DeleteObjects request.
pub const MAX_DELETE_BATCH: usize = 1000;

/// Shared S3 client for efficient operations
///
/// Creating an S3 client is relatively expensive, so this struct allows
/// reusing the client across multiple operations.
#[derive(Clone)]
pub struct S3Store {
    client: aws_sdk_s3::Client,
}

impl S3Store {
    /// Create a new S3 client from the default AWS credential chain
    pub async fn new() -> Self {
        let sdk_config = aws_config::load_defaults(BehaviorVersion::latest()).await;
        let client = aws_sdk_s3::Client::new(&sdk_config);
        Self { client }
    }

    pub fn from_client(client: aws_sdk_s3::Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ObjectStore for S3Store {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| classify(e, bucket, key, "upload"))?;
        debug!("Uploaded {}", object_url(bucket, key));
        Ok(())
    }

    async fn upload_file(&self, path: &Path, bucket: &str, key: &str) -> Result<()> {
        let body = ByteStream::from_path(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(body)
            .send()
            .await
            .map_err(|e| classify(e, bucket, key, "upload"))?;
        debug!("Uploaded {} to {}", path.display(), object_url(bucket, key));
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        let response = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(e, bucket, key, "fetch"))?;

        let data = response
            .body
            .collect()
            .await
            .with_context(|| format!("Failed to read body of {}", object_url(bucket, key)))?;
        Ok(data.into_bytes().to_vec())
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| classify(e, bucket, key, "delete"))?;
        Ok(())
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<usize> {
        let mut deleted = 0;

        for chunk in keys.chunks(MAX_DELETE_BATCH) {
            let objects = chunk
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<std::result::Result<Vec<_>, _>>()
                .context("Failed to build object identifiers")?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .build()
                .context("Failed to build delete request")?;

            let response = self
                .client
                .delete_objects()
                .bucket(bucket)
                .delete(delete)
                .send()
                .await
                .with_context(|| {
                    format!("Failed to delete {} objects from bucket {bucket}", chunk.len())
                })?;

            deleted += response.deleted().len();
            for error in response.errors() {
                warn!(
                    "Failed to delete {}: {} ({})",
                    object_url(bucket, error.key().unwrap_or_default()),
                    error.message().unwrap_or_default(),
                    error.code().unwrap_or_default()
                );
            }
        }

        Ok(deleted)
    }
}

/// Map an SDK failure to [`StoreError`], keyed on the S3 error code.
fn classify<E, R>(err: SdkError<E, R>, bucket: &str, key: &str, action: &str) -> StoreError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug + Send + Sync + 'static,
{
    let url = object_url(bucket, key);
    match err.as_service_error().and_then(|e| e.code()) {
        Some("NoSuchKey") => StoreError::NoSuchKey(url),
        _ => StoreError::Other(anyhow::Error::new(err).context(format!("Failed to {action} {url}"))),
    }
}
