//! In-memory object store.

use crate::{object_url, ObjectStore, Result, StoreError};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

type Objects = BTreeMap<(String, String), Vec<u8>>;

/// Object store backed by a map of `(bucket, key)` to bytes.
///
/// Mirrors S3 semantics where they matter to callers: reading a missing
/// key fails with [`StoreError::NoSuchKey`], deleting one succeeds.
#[derive(Debug, Default)]
pub struct MemoryStore {
    objects: Mutex<Objects>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys present in `bucket`, sorted.
    pub fn keys(&self, bucket: &str) -> Vec<String> {
        self.lock()
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn contains(&self, bucket: &str, key: &str) -> bool {
        self.lock()
            .contains_key(&(bucket.to_string(), key.to_string()))
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Objects> {
        // A poisoned map is still a valid map.
        self.objects.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl ObjectStore for MemoryStore {
    async fn put_object(&self, bucket: &str, key: &str, body: Vec<u8>) -> Result<()> {
        self.lock()
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }

    async fn get_object(&self, bucket: &str, key: &str) -> Result<Vec<u8>> {
        self.lock()
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NoSuchKey(object_url(bucket, key)))
    }

    async fn delete_object(&self, bucket: &str, key: &str) -> Result<()> {
        self.lock().remove(&(bucket.to_string(), key.to_string()));
        Ok(())
    }

    async fn delete_objects(&self, bucket: &str, keys: &[String]) -> Result<usize> {
        let mut objects = self.lock();
        Ok(keys
            .iter()
            .filter(|key| objects.remove(&(bucket.to_string(), key.to_string())).is_some())
            .count())
    }
}
