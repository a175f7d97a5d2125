//! C8 — Certificate Engine
//!
//! The only component allowed to advance a certificate's status. Every
//! multi-statement write goes through [`CertificateEngine::run_in_tx`],
//! the explicit transaction primitive this system uses in place of the
//! teacher's direct `state.pool` access — the engine owns the pool and a
//! tenant-bound connection is always acquired before a transaction opens.

use chrono::{Datelike, Duration, Utc};
use serde_json::{json, Value};
use shared::error::{AppError, ErrorCode};
use sqlx::{Connection, Executor, PgPool, Postgres, Transaction};
use std::sync::Arc;
use tenant::TenantContext;

use render::{CertificateFields, PageSettings, RenderInput, TemplateFields};
use storage::ObjectStore;
use templates::{TemplateStore, VersionStatus};

use crate::hash_index::HashIndex;
use crate::model::{Certificate, CertificateStatus, GenerateRequest, GenerationMode};

pub struct CertificateEngine {
    pool: PgPool,
    store: Arc<dyn ObjectStore>,
    bucket: String,
    base_url: String,
}

impl CertificateEngine {
    pub fn new(pool: PgPool, store: Arc<dyn ObjectStore>, bucket: String, base_url: String) -> Self {
        Self { pool, store, bucket, base_url }
    }

    /// `runInTx(schema, fn)` — acquires a tenant-bound connection, opens a
    /// transaction on it, and commits on success / rolls back on error.
    pub async fn run_in_tx<F, T>(&self, tenant: &TenantContext, f: F) -> Result<T, AppError>
    where
        F: for<'t> FnOnce(
            &'t mut Transaction<'_, Postgres>,
        ) -> std::pin::Pin<Box<dyn std::future::Future<Output = Result<T, AppError>> + Send + 't>>,
    {
        let mut conn = tenant.acquire(&self.pool).await?;
        let mut tx = conn.begin().await.map_err(|e| AppError::database(e.to_string()))?;
        match f(&mut tx).await {
            Ok(value) => {
                tx.commit().await.map_err(|e| AppError::database(e.to_string()))?;
                Ok(value)
            }
            Err(err) => {
                let _ = tx.rollback().await;
                Err(err)
            }
        }
    }

    /// Validates, assigns identifiers, enforces the monthly quota, and
    /// persists PENDING inside one transaction. The sync/async split
    /// happens after this returns: the caller either drives
    /// [`CertificateEngine::process`] inline or enqueues the id.
    pub async fn generate(
        &self,
        tenant: &TenantContext,
        request: GenerateRequest,
        _mode: GenerationMode,
        max_certificates_per_month: i32,
    ) -> Result<Certificate, AppError> {
        self.run_in_tx(tenant, move |tx| {
            Box::pin(async move {
                let template = TemplateStore::find(&mut **tx, request.template_id)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("template {}", request.template_id)))?;

                let version_number = request
                    .template_version
                    .or(template.current_version)
                    .ok_or_else(|| AppError::validation("template has no published version"))?;

                let version = TemplateStore::find_version(&mut **tx, request.template_id, version_number)
                    .await?
                    .ok_or_else(|| AppError::not_found(format!("template version {version_number}")))?;

                if version.status() != VersionStatus::Published {
                    return Err(AppError::validation(format!(
                        "template version {version_number} is {}, not PUBLISHED",
                        version.status().as_str()
                    )));
                }

                let report = templates::validate(&request.recipient_data, &version.field_schema);
                if !report.is_valid() {
                    let err = AppError::validation("recipient data failed field-schema validation").with_detail(
                        "fieldErrors",
                        json!(report
                            .errors
                            .iter()
                            .map(|e| json!({"field": e.field, "message": e.message}))
                            .collect::<Vec<_>>()),
                    );
                    return Err(err);
                }

                let now = Utc::now();
                let month_start = now.with_day(1).unwrap().date_naive().and_hms_opt(0, 0, 0).unwrap();
                let month_start = chrono::DateTime::<Utc>::from_naive_utc_and_offset(month_start, Utc);
                let month_end = month_start + next_month_offset(month_start);

                let issued_this_month: i64 = sqlx::query_scalar(
                    "SELECT COUNT(*) FROM certificates WHERE issued_at >= $1 AND issued_at < $2",
                )
                .bind(month_start)
                .bind(month_end)
                .fetch_one(&mut **tx)
                .await
                .map_err(|e| AppError::database(e.to_string()))?;

                if issued_this_month >= max_certificates_per_month as i64 {
                    return Err(AppError::quota_exceeded(max_certificates_per_month));
                }

                let certificate_number = request
                    .certificate_number
                    .clone()
                    .unwrap_or_else(|| generate_certificate_number(Some(&template.code), now));

                let certificate = sqlx::query_as::<_, Certificate>(
                    "INSERT INTO certificates
                        (certificate_number, template_id, template_version, status, recipient_data, metadata, created_at)
                     VALUES ($1, $2, $3, 'PENDING', $4, $5, $6)
                     RETURNING *",
                )
                .bind(&certificate_number)
                .bind(request.template_id)
                .bind(version_number)
                .bind(&request.recipient_data)
                .bind(json!({}))
                .bind(now)
                .fetch_one(&mut **tx)
                .await
                .map_err(|e| AppError::database(e.to_string()))?;

                Ok(certificate)
            })
        })
        .await
    }

    /// Drives C6/C5/C7 for one certificate: PENDING/PROCESSING/FAILED ->
    /// markProcessing -> render -> store -> insert hash -> markIssued (or
    /// mark PENDING with `previewGeneratedAt` set, for preview mode).
    pub async fn process(&self, tenant: &TenantContext, certificate_id: i64, preview: bool) -> Result<(), AppError> {
        let mut conn = tenant.acquire(&self.pool).await?;

        let certificate = fetch_certificate(&mut **conn, certificate_id).await?;

        match certificate.status() {
            CertificateStatus::Pending | CertificateStatus::Processing | CertificateStatus::Failed => {}
            CertificateStatus::Issued => return Ok(()),
            CertificateStatus::Revoked => {
                return Err(AppError::illegal_transition("REVOKED", "PROCESSING"));
            }
        }

        sqlx::query("UPDATE certificates SET status = 'PROCESSING' WHERE id = $1")
            .bind(certificate_id)
            .execute(&mut **conn)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        let template = TemplateStore::find(&mut **conn, certificate.template_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("template {}", certificate.template_id)))?;
        let version = TemplateStore::find_version(&mut **conn, certificate.template_id, certificate.template_version)
            .await?
            .ok_or_else(|| AppError::not_found("template version"))?;

        let render_input = RenderInput {
            html: version.html,
            css: version.css,
            settings: PageSettings::default(),
            recipient: certificate.recipient_data.clone(),
            metadata: certificate.metadata.clone(),
            certificate: CertificateFields {
                id: certificate.id,
                number: certificate.certificate_number.clone(),
                issued_at: certificate.issued_at,
                expires_at: None,
            },
            template: TemplateFields { code: template.code.clone(), name: template.name.clone() },
            template_version: certificate.template_version,
            base_url: self.base_url.clone(),
        };

        let rendered = match render::render(render_input).await {
            Ok(output) => output,
            Err(e) => {
                self.mark_as_failed_inner(&mut conn, certificate_id, &e.message).await?;
                return Err(e);
            }
        };

        HashIndex::insert(&mut **conn, certificate_id, &rendered.hash).await?;

        let key = storage::certificate_storage_key(tenant.require()?.as_str(), Utc::now(), certificate_id);
        if let Err(e) = self.store.put(&self.bucket, &key, rendered.pdf, "application/pdf").await {
            // Pass 2 failed after the hash was persisted: FAILED, hash row stays.
            self.mark_as_failed_inner(&mut conn, certificate_id, &e.message).await?;
            return Err(e);
        }

        if preview {
            let metadata = merge_metadata(&certificate.metadata, "previewGeneratedAt", json!(Utc::now().to_rfc3339()));
            sqlx::query(
                "UPDATE certificates SET status = 'PENDING', storage_key = $1, metadata = $2 WHERE id = $3",
            )
            .bind(&key)
            .bind(&metadata)
            .bind(certificate_id)
            .execute(&mut **conn)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        } else {
            sqlx::query(
                "UPDATE certificates SET status = 'ISSUED', storage_key = $1, issued_at = now() WHERE id = $2",
            )
            .bind(&key)
            .bind(certificate_id)
            .execute(&mut **conn)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        }

        Ok(())
    }

    /// Requires current status PENDING with a completed preview; promotes
    /// to ISSUED without re-rendering.
    pub async fn issue_preview(&self, tenant: &TenantContext, certificate_id: i64) -> Result<Certificate, AppError> {
        let mut conn = tenant.acquire(&self.pool).await?;
        let certificate = fetch_certificate(&mut **conn, certificate_id).await?;

        if certificate.status() != CertificateStatus::Pending || certificate.preview_generated_at().is_none() {
            return Err(AppError::illegal_transition(certificate.status().as_str(), "ISSUED"));
        }
        let Some(key) = &certificate.storage_key else {
            return Err(AppError::illegal_transition("PENDING", "ISSUED"));
        };
        if !self.store.exists(&self.bucket, key).await? {
            return Err(AppError::with_message(ErrorCode::RenderFailed, "preview PDF missing from storage"));
        }

        let updated: Certificate = sqlx::query_as(
            "UPDATE certificates SET status = 'ISSUED', issued_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(certificate_id)
        .fetch_one(&mut **conn)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
        Ok(updated)
    }

    pub async fn revoke(&self, tenant: &TenantContext, certificate_id: i64) -> Result<Certificate, AppError> {
        let mut conn = tenant.acquire(&self.pool).await?;
        let certificate = fetch_certificate(&mut **conn, certificate_id).await?;

        if certificate.status() == CertificateStatus::Revoked {
            return Ok(certificate);
        }

        let updated: Certificate = sqlx::query_as(
            "UPDATE certificates SET status = 'REVOKED', revoked_at = now() WHERE id = $1 RETURNING *",
        )
        .bind(certificate_id)
        .fetch_one(&mut **conn)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
        Ok(updated)
    }

    /// Writes `{error, errorTimestamp}` into `metadata`, preserving
    /// existing keys. Malformed existing JSON is replaced by a minimal
    /// fallback rather than allowed to mask the failure.
    pub async fn mark_as_failed(&self, tenant: &TenantContext, certificate_id: i64, message: &str) -> Result<(), AppError> {
        let mut conn = tenant.acquire(&self.pool).await?;
        self.mark_as_failed_inner(&mut conn, certificate_id, message).await
    }

    async fn mark_as_failed_inner(
        &self,
        conn: &mut tenant::TenantConnection,
        certificate_id: i64,
        message: &str,
    ) -> Result<(), AppError> {
        let existing: Option<Value> = sqlx::query_scalar("SELECT metadata FROM certificates WHERE id = $1")
            .bind(certificate_id)
            .fetch_optional(&mut ***conn)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        let base = existing.unwrap_or_else(|| json!({}));
        let merged = merge_metadata(&base, "error", json!(message));
        let merged = merge_metadata(&merged, "errorTimestamp", json!(Utc::now().to_rfc3339()));

        sqlx::query("UPDATE certificates SET status = 'FAILED', failure_reason = $1, metadata = $2 WHERE id = $3")
            .bind(message)
            .bind(&merged)
            .bind(certificate_id)
            .execute(&mut ***conn)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        Ok(())
    }

    pub async fn find(&self, tenant: &TenantContext, certificate_id: i64) -> Result<Certificate, AppError> {
        let mut conn = tenant.acquire(&self.pool).await?;
        fetch_certificate(&mut **conn, certificate_id).await
    }

    pub async fn get_download_url(&self, tenant: &TenantContext, certificate_id: i64, ttl_minutes: i64) -> Result<String, AppError> {
        let mut conn = tenant.acquire(&self.pool).await?;
        let certificate = fetch_certificate(&mut **conn, certificate_id).await?;
        let key = certificate
            .storage_key
            .ok_or_else(|| AppError::not_found("certificate has no stored PDF"))?;
        self.store.presign(&self.bucket, &key, ttl_minutes).await
    }

    /// Certificate ids in this tenant whose preview has aged past
    /// `max_preview_age_minutes`. Read-only; the sweeper decides what to
    /// do with each id and calls [`CertificateEngine::sweep_one`].
    pub async fn list_expired_previews(
        &self,
        tenant: &TenantContext,
        max_preview_age_minutes: i64,
    ) -> Result<Vec<i64>, AppError> {
        let mut conn = tenant.acquire(&self.pool).await?;
        let cutoff = Utc::now() - Duration::minutes(max_preview_age_minutes);
        let ids: Vec<i64> = sqlx::query_scalar(
            "SELECT id FROM certificates
             WHERE status = 'PENDING'
               AND (metadata->>'previewGeneratedAt') IS NOT NULL
               AND (metadata->>'previewGeneratedAt')::timestamptz < $1",
        )
        .bind(cutoff)
        .fetch_all(&mut **conn)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
        Ok(ids)
    }

    /// Deletes the preview PDF, clears `storageKey`/`previewGeneratedAt`,
    /// and transitions to REVOKED. Called by the sweeper, one certificate
    /// at a time, so a single failure never halts the sweep.
    pub async fn sweep_one(&self, tenant: &TenantContext, certificate_id: i64) -> Result<(), AppError> {
        let mut conn = tenant.acquire(&self.pool).await?;
        let certificate = fetch_certificate(&mut **conn, certificate_id).await?;

        if certificate.status() != CertificateStatus::Pending {
            return Ok(());
        }

        if let Some(key) = &certificate.storage_key {
            self.store.delete(&self.bucket, key).await?;
        }

        let metadata = strip_metadata_key(&certificate.metadata, "previewGeneratedAt");

        sqlx::query(
            "UPDATE certificates SET status = 'REVOKED', storage_key = NULL, metadata = $1, revoked_at = now() WHERE id = $2",
        )
        .bind(&metadata)
        .bind(certificate_id)
        .execute(&mut **conn)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;
        Ok(())
    }

    pub async fn get_verification_url(&self, tenant: &TenantContext, certificate_id: i64) -> Result<String, AppError> {
        let mut conn = tenant.acquire(&self.pool).await?;
        let hash = HashIndex::find_by_certificate_id(&mut **conn, certificate_id)
            .await?
            .ok_or_else(|| AppError::not_found("certificate hash"))?;
        Ok(format!("{}/api/certificates/verify/{}", self.base_url.trim_end_matches('/'), hash.hash))
    }
}

/// Looks up a certificate by id, mapping a missing row to `NotFound`
/// rather than a generic database error — every handler that resolves a
/// caller-supplied certificate id goes through this.
async fn fetch_certificate<'e, E>(conn: E, certificate_id: i64) -> Result<Certificate, AppError>
where
    E: Executor<'e, Database = Postgres>,
{
    sqlx::query_as("SELECT * FROM certificates WHERE id = $1")
        .bind(certificate_id)
        .fetch_one(conn)
        .await
        .map_err(|e| match e {
            sqlx::Error::RowNotFound => AppError::not_found(format!("certificate {certificate_id}")),
            other => AppError::database(other.to_string()),
        })
}

fn next_month_offset(month_start: chrono::DateTime<Utc>) -> Duration {
    let (y, m) = (month_start.year(), month_start.month());
    let (ny, nm) = if m == 12 { (y + 1, 1) } else { (y, m + 1) };
    let next = chrono::NaiveDate::from_ymd_opt(ny, nm, 1)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    let next = chrono::DateTime::<Utc>::from_naive_utc_and_offset(next, Utc);
    next - month_start
}

/// `{TEMPLATE_CODE}-{yyyymmdd}-{RAND6}`, or `CERT-{yyyymmdd}-{RAND6}`
/// when no template code is available.
pub fn generate_certificate_number(template_code: Option<&str>, now: chrono::DateTime<Utc>) -> String {
    let prefix = template_code.unwrap_or("CERT");
    format!("{prefix}-{}-{}", now.format("%Y%m%d"), shared::util::random_hex6())
}

fn strip_metadata_key(existing: &Value, key: &str) -> Value {
    match existing.as_object() {
        Some(map) => {
            let mut map = map.clone();
            map.remove(key);
            Value::Object(map)
        }
        None => json!({}),
    }
}

fn merge_metadata(existing: &Value, key: &str, value: Value) -> Value {
    match existing.as_object() {
        Some(map) => {
            let mut map = map.clone();
            map.insert(key.to_string(), value);
            Value::Object(map)
        }
        None => {
            let mut map = serde_json::Map::new();
            map.insert(key.to_string(), value);
            Value::Object(map)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn certificate_number_uses_template_code_prefix() {
        let now = chrono::DateTime::parse_from_rfc3339("2026-03-05T00:00:00Z").unwrap().with_timezone(&Utc);
        let number = generate_certificate_number(Some("CRS"), now);
        assert!(number.starts_with("CRS-20260305-"));
    }

    #[test]
    fn certificate_number_falls_back_to_cert_prefix() {
        let now = chrono::DateTime::parse_from_rfc3339("2026-03-05T00:00:00Z").unwrap().with_timezone(&Utc);
        let number = generate_certificate_number(None, now);
        assert!(number.starts_with("CERT-20260305-"));
    }

    #[test]
    fn merge_metadata_preserves_existing_keys() {
        let existing = json!({"a": 1});
        let merged = merge_metadata(&existing, "b", json!(2));
        assert_eq!(merged, json!({"a": 1, "b": 2}));
    }

    #[test]
    fn merge_metadata_replaces_malformed_existing_with_fallback() {
        let existing = json!("not an object");
        let merged = merge_metadata(&existing, "error", json!("boom"));
        assert_eq!(merged, json!({"error": "boom"}));
    }

    #[test]
    fn strip_metadata_key_removes_only_that_key() {
        let existing = json!({"previewGeneratedAt": "2026-01-01T00:00:00Z", "other": 1});
        let stripped = strip_metadata_key(&existing, "previewGeneratedAt");
        assert_eq!(stripped, json!({"other": 1}));
    }
}
