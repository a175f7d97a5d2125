use async_trait::async_trait;
use aws_sdk_s3::Client as S3Client;
use aws_sdk_s3::presigning::PresigningConfig;
use shared::error::{AppError, ErrorCode};
use std::time::Duration;

use crate::{normalize_ttl_minutes, ObjectStore};

pub struct S3ObjectStore {
    client: S3Client,
}

impl S3ObjectStore {
    pub fn new(client: S3Client) -> Self {
        Self { client }
    }

    /// Mirrors the teacher's `AppState::new` S3 client construction:
    /// load the default AWS config chain, then build the client from it.
    pub async fn from_env() -> Self {
        let config = aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
        Self::new(S3Client::new(&config))
    }
}

#[async_trait]
impl ObjectStore for S3ObjectStore {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError> {
        self.client
            .put_object()
            .bucket(bucket)
            .key(key)
            .body(bytes.into())
            .content_type(content_type)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(bucket, key, error = %e, "S3 put_object failed");
                AppError::with_message(ErrorCode::StorageTransient, "object store write failed")
            })?;
        Ok(())
    }

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, AppError> {
        let output = self.client.get_object().bucket(bucket).key(key).send().await;
        let output = match output {
            Ok(output) => output,
            Err(e) => {
                if is_not_found(&e) {
                    return Err(AppError::with_message(
                        ErrorCode::StorageNotFound,
                        format!("object not found: {key}"),
                    ));
                }
                tracing::error!(bucket, key, error = %e, "S3 get_object failed");
                return Err(AppError::with_message(
                    ErrorCode::StorageTransient,
                    "object store read failed",
                ));
            }
        };
        let bytes = output
            .body
            .collect()
            .await
            .map_err(|e| {
                tracing::error!(bucket, key, error = %e, "S3 object body read failed");
                AppError::with_message(ErrorCode::StorageTransient, "object store read failed")
            })?
            .into_bytes();
        Ok(bytes.to_vec())
    }

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, AppError> {
        match self.client.head_object().bucket(bucket).key(key).send().await {
            Ok(_) => Ok(true),
            Err(e) if is_not_found(&e) => Ok(false),
            Err(e) => {
                tracing::error!(bucket, key, error = %e, "S3 head_object failed");
                Err(AppError::with_message(
                    ErrorCode::StorageTransient,
                    "object store probe failed",
                ))
            }
        }
    }

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), AppError> {
        self.client
            .delete_object()
            .bucket(bucket)
            .key(key)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(bucket, key, error = %e, "S3 delete_object failed");
                AppError::with_message(ErrorCode::StorageTransient, "object store delete failed")
            })?;
        Ok(())
    }

    async fn presign(&self, bucket: &str, key: &str, ttl_minutes: i64) -> Result<String, AppError> {
        let ttl_minutes = normalize_ttl_minutes(ttl_minutes);
        let presigning = PresigningConfig::expires_in(Duration::from_secs((ttl_minutes * 60) as u64))
            .map_err(|e| {
                tracing::error!(error = %e, "failed to build presigning config");
                AppError::internal("failed to build presigned URL")
            })?;

        let presigned = self
            .client
            .get_object()
            .bucket(bucket)
            .key(key)
            .presigned(presigning)
            .await
            .map_err(|e| {
                tracing::error!(bucket, key, error = %e, "S3 presign failed");
                AppError::with_message(ErrorCode::StorageTransient, "failed to presign object URL")
            })?;

        Ok(presigned.uri().to_string())
    }

    async fn ensure_bucket(&self, bucket: &str) -> Result<(), AppError> {
        if self.client.head_bucket().bucket(bucket).send().await.is_ok() {
            return Ok(());
        }
        self.client
            .create_bucket()
            .bucket(bucket)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(bucket, error = %e, "S3 create_bucket failed");
                AppError::with_message(ErrorCode::StorageTransient, "failed to ensure bucket")
            })?;
        Ok(())
    }
}

fn is_not_found<E, R>(err: &aws_sdk_s3::error::SdkError<E, R>) -> bool
where
    E: std::error::Error + 'static,
{
    err.as_service_error()
        .map(|e| e.to_string().contains("NotFound") || e.to_string().contains("NoSuchKey"))
        .unwrap_or(false)
}
