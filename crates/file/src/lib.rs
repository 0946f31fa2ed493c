//! Object store abstraction for publishing and tearing down load-test files.
//!
//! [`ObjectStore`] covers exactly the operations the generator needs: put
//! (from memory or from a local file), get, delete, and batched delete.
//!
//! # Implementations
//!
//! - [`S3Store`]: AWS S3 through `aws-sdk-s3`, configured from the default
//!   credential chain
//! - [`MemoryStore`]: a process-local map, used in tests
//!
//! # Example
//!
//! ```ignore
//! use xml_loadgen_file::{ObjectStore, S3Store};
//!
//! let store = S3Store::new().await;
//! store.put_object("my-bucket", "test_xmls/a.xml", xml_bytes).await?;
//! let removed = store.delete_objects("my-bucket", &keys).await?;
//! ```

mod memory;
mod s3;

use anyhow::Context;
use async_trait::async_trait;
use std::path::Path;

pub use memory::MemoryStore;
pub use s3::{S3Store, MAX_DELETE_BATCH};

/// Errors returned by [`ObjectStore`] operations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The object does not exist (S3 error code `NoSuchKey`).
    #[error("The object {0} does not exist")]
    NoSuchKey(String),

    /// Any other failure, with context.
    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StoreError {
    pub fn is_no_such_key(&self) -> bool {
        matches!(self, StoreError::NoSuchKey(_))
    }
}

pub type Result<T, E = StoreError> = std::result::Result<T, E>;

/// Minimal object store used by the generator and cleanup commands.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `body` under `bucket/key`, replacing any existing object.
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()>;

    /// Upload a local file.
    async fn upload_file(&self, path: &Path, bucket: &str, key: &str) -> Result<()> {
        let body = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read file: {}", path.display()))?;
        self.put_object(bucket, key, body).await
    }

    /// Fetch an object's bytes.
    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>>;

    /// Delete one object.
    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()>;

    /// Delete many objects, returning how many were removed.
    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<usize>;

    /// Fetch an object into a local file.
    async fn download_file(&self, bucket: &str, key: &str, path: &Path) -> Result<()> {
        let body = self.get_object(bucket, key).await?;
        tokio::fs::write(path, body)
            .await
            .with_context(|| format!("Failed to write file: {}", path.display()))?;
        Ok(())
    }
}

/// Render an object location as `s3://bucket/key`.
pub fn object_url(bucket: &str, key: &str) -> String {
    format!("s3://{bucket}/{key}")
}

/// A bucket and key, written `s3://bucket/key`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ObjectLocation {
    pub bucket: String,
    pub key: String,
}

impl ObjectLocation {
    pub fn new(bucket: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            bucket: bucket.into(),
            key: key.into(),
        }
    }

    /// Whether `value` is written as an `s3://` URI.
    pub fn is_uri(value: &str) -> bool {
        value.starts_with("s3://")
    }
}

impl std::str::FromStr for ObjectLocation {
    type Err = anyhow::Error;

    fn from_str(uri: &str) -> anyhow::Result<Self> {
        let rest = uri
            .strip_prefix("s3://")
            .with_context(|| format!("Not an s3:// URI: {uri}"))?;
        match rest.split_once('/') {
            Some((bucket, key)) if !bucket.is_empty() && !key.is_empty() => {
                Ok(Self::new(bucket, key))
            }
            _ => anyhow::bail!("Expected s3://<bucket>/<key>, got {uri}"),
        }
    }
}

impl std::fmt::Display for ObjectLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&object_url(&self.bucket, &self.key))
    }
}

/// Join a key prefix and a file name with exactly one `/`.
pub fn join_key(prefix: &str, name: &str) -> String {
    let prefix = prefix.trim_matches('/');
    let name = name.trim_start_matches('/');
    if prefix.is_empty() {
        name.to_string()
    } else {
        format!("{prefix}/{name}")
    }
}
