//! C5 — Object Store Adapter
//!
//! A narrow contract over durable blob storage: `put`/`get`/`exists`/
//! `delete`/`presign`/`ensure_bucket`. Grounded on the teacher's
//! `crab-cloud::api::image` module (the same `aws-sdk-s3` client calls —
//! `put_object`, presigned `get_object`, `list_objects_v2` — generalized
//! from a fixed `images/{tenant}/{hash}.jpg` layout into the trait below)
//! and `crab-cloud::state` (the `aws_config::load_defaults` +
//! `S3Client::new` construction sequence, reused verbatim in
//! [`S3ObjectStore::from_env`]).

mod memory;
mod s3;

pub use memory::InMemoryObjectStore;
pub use s3::S3ObjectStore;

use async_trait::async_trait;
use shared::error::AppError;

/// Presigned URL TTLs are capped to 7 days; callers passing 0 or a
/// negative value get this default instead.
pub const DEFAULT_PRESIGN_TTL_MINUTES: i64 = 60;
pub const MAX_PRESIGN_TTL_MINUTES: i64 = 7 * 24 * 60;

#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn put(
        &self,
        bucket: &str,
        key: &str,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<(), AppError>;

    async fn get(&self, bucket: &str, key: &str) -> Result<Vec<u8>, AppError>;

    async fn exists(&self, bucket: &str, key: &str) -> Result<bool, AppError>;

    async fn delete(&self, bucket: &str, key: &str) -> Result<(), AppError>;

    async fn presign(&self, bucket: &str, key: &str, ttl_minutes: i64) -> Result<String, AppError>;

    async fn ensure_bucket(&self, bucket: &str) -> Result<(), AppError>;
}

/// Normalizes a caller-supplied TTL: non-positive becomes the default,
/// anything past the cap is clamped down to it.
pub fn normalize_ttl_minutes(ttl_minutes: i64) -> i64 {
    if ttl_minutes <= 0 {
        DEFAULT_PRESIGN_TTL_MINUTES
    } else {
        ttl_minutes.min(MAX_PRESIGN_TTL_MINUTES)
    }
}

/// `{tenantSchema}/certificates/{year}/{MM}/{certificateId}.pdf`
pub fn certificate_storage_key(
    tenant_schema: &str,
    issued_at: chrono::DateTime<chrono::Utc>,
    certificate_id: i64,
) -> String {
    use chrono::Datelike;
    format!(
        "{tenant_schema}/certificates/{:04}/{:02}/{certificate_id}.pdf",
        issued_at.year(),
        issued_at.month(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalizes_non_positive_ttl_to_default() {
        assert_eq!(normalize_ttl_minutes(0), DEFAULT_PRESIGN_TTL_MINUTES);
        assert_eq!(normalize_ttl_minutes(-5), DEFAULT_PRESIGN_TTL_MINUTES);
    }

    #[test]
    fn clamps_ttl_to_seven_days() {
        assert_eq!(normalize_ttl_minutes(MAX_PRESIGN_TTL_MINUTES + 100), MAX_PRESIGN_TTL_MINUTES);
    }

    #[test]
    fn leaves_in_range_ttl_untouched() {
        assert_eq!(normalize_ttl_minutes(120), 120);
    }

    #[test]
    fn key_layout_matches_spec_shape() {
        let issued_at = chrono::DateTime::parse_from_rfc3339("2026-03-05T00:00:00Z")
            .unwrap()
            .with_timezone(&chrono::Utc);
        assert_eq!(
            certificate_storage_key("acme", issued_at, 42),
            "acme/certificates/2026/03/42.pdf"
        );
    }
}
