use async_trait::async_trait;
use shared::error::{AppError, ErrorCode};
use std::collections::HashMap;
use std::sync::Mutex;

use crate::{normalize_ttl_minutes, ObjectStore};

/// In-process `ObjectStore` double for tests that don't need real S3 —
/// mirrors the shape of `ObjectStore` exactly so the generation pipeline
/// can be exercised without network access.
#[derive(Default)]
pub struct InMemoryObjectStore {
    buckets: Mutex<HashMap<String, HashMap<String, (Vec<u8>, String)>>>,
}

impl InMemoryObjectStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ObjectStore for InMemoryObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError> {
        let mut buckets = self.buckets.lock().unwrap();
        buckets
            .entry(bucket.to_string())
            .or_default()
            .insert(key.to_string(), (bytes, content_type.to_string()));
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, AppError> {
        let buckets = self.buckets.lock().unwrap();
        buckets
            .get(bucket)
            .and_then(|objects| objects.get(key))
            .map(|(bytes, _)| bytes.clone())
            .ok_or_else(|| {
                AppError::with_message(ErrorCode::StorageNotFound, format!("object not found: {key}"))
            })
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, AppError> {
        let buckets = self.buckets.lock().unwrap();
        Ok(buckets.get(bucket).is_some_and(|objects| objects.contains_key(key)))
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), AppError> {
        let mut buckets = self.buckets.lock().unwrap();
        if let Some(objects) = buckets.get_mut(bucket) {
            objects.remove(key);
        }
        Ok(())
    }

    async fn presign(&self, bucket: &str, key: &str, ttl_minutes: i64) -> Result<String, AppError> {
        let ttl = normalize_ttl_minutes(ttl_minutes);
        Ok(format!("memory://{bucket}/{key}?ttl={ttl}"))
    }

    async fn ensure_bucket(&self, bucket: &str) -> Result<(), AppError> {
        self.buckets.lock().unwrap().entry(bucket.to_string()).or_default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn put_then_get_round_trips() {
        let store = InMemoryObjectStore::new();
        store.put("b", "k", b"hello".to_vec(), "text/plain").await.unwrap();
        assert_eq!(store.get("b", "k").await.unwrap(), b"hello");
    }

    #[tokio::test]
    async fn get_missing_key_is_not_found() {
        let store = InMemoryObjectStore::new();
        let err = store.get("b", "missing").await.unwrap_err();
        assert_eq!(err.code, ErrorCode::StorageNotFound);
    }

    #[tokio::test]
    async fn delete_removes_the_object() {
        let store = InMemoryObjectStore::new();
        store.put("b", "k", b"x".to_vec(), "text/plain").await.unwrap();
        store.delete("b", "k").await.unwrap();
        assert!(!store.exists("b", "k").await.unwrap());
    }
}
