//! C12 — Verification Service
//!
//! Public, tenant-less: walks every active tenant via C2 and probes C7
//! (here, a direct join against `certificate_hashes`/`certificates` in
//! the bound schema, using the tenant registry's acquire-then-`SET
//! search_path` pattern) until a match with status ISSUED turns up.

use certs::{Certificate, CertificateStatus};
use shared::error::AppError;
use sqlx::{Executor, PgPool};
use tenant::{TenantRegistry, TenantSchema};

/// Hashes longer than this are rejected outright rather than probed
/// against every tenant — `base64(SHA-256(..))` is 44 characters, so
/// this leaves generous headroom without allowing pathological input.
pub const MAX_HASH_LENGTH: usize = 256;

pub struct VerificationService {
    pool: PgPool,
    registry: TenantRegistry,
}

impl VerificationService {
    pub fn new(pool: PgPool, registry: TenantRegistry) -> Self {
        Self { pool, registry }
    }

    /// Returns `Ok(None)` for "not found" rather than an error — an
    /// unmatched hash is an expected outcome, not a failure.
    pub async fn verify(&self, hash: &str) -> Result<Option<Certificate>, AppError> {
        if !is_plausible_hash(hash) {
            return Ok(None);
        }

        let customers = self.registry.list_active().await?;
        for customer in customers {
            let Ok(schema) = TenantSchema::parse(customer.tenant_schema.clone()) else {
                tracing::warn!(schema = %customer.tenant_schema, "verification: skipping tenant with invalid schema name");
                continue;
            };

            match probe_schema(&self.pool, &schema, hash).await {
                Ok(Some(certificate)) if certificate.status() == CertificateStatus::Issued => {
                    return Ok(Some(certificate));
                }
                Ok(_) => continue,
                Err(e) => {
                    tracing::error!(schema = %schema, error = %e, "verification: probe failed, continuing to next tenant");
                    continue;
                }
            }
        }

        Ok(None)
    }
}

fn is_plausible_hash(hash: &str) -> bool {
    !hash.is_empty() && hash.len() <= MAX_HASH_LENGTH
}

async fn probe_schema(pool: &PgPool, schema: &TenantSchema, hash: &str) -> Result<Option<Certificate>, AppError> {
    let mut conn = pool.acquire().await.map_err(|e| AppError::database(e.to_string()))?;
    conn.execute(format!("SET search_path TO \"{schema}\", public").as_str())
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

    sqlx::query_as::<_, Certificate>(
        "SELECT c.* FROM certificates c
         JOIN certificate_hashes h ON h.certificate_id = c.id
         WHERE h.hash = $1",
    )
    .bind(hash)
    .fetch_optional(&mut *conn)
    .await
    .map_err(|e| AppError::database(e.to_string()))
}

/// Constant-time byte comparison. Unused by `verify` itself (the lookup
/// above is a database equality match, not a manual comparison), but
/// required by SPEC_FULL.md for any future endpoint that checks a
/// caller-supplied hash against a persisted one.
pub fn constant_time_eq(a: &str, b: &str) -> bool {
    let (a, b) = (a.as_bytes(), b.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    let mut diff = 0u8;
    for (x, y) in a.iter().zip(b.iter()) {
        diff |= x ^ y;
    }
    diff == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_empty_hash() {
        assert!(!is_plausible_hash(""));
    }

    #[test]
    fn rejects_over_long_hash() {
        let hash = "a".repeat(MAX_HASH_LENGTH + 1);
        assert!(!is_plausible_hash(&hash));
    }

    #[test]
    fn accepts_typical_hash_length() {
        assert!(is_plausible_hash("c29tZS1zaGEyNTYtaGFzaC1pbi1iYXNlNjQ="));
    }

    #[test]
    fn constant_time_eq_matches_equal_strings() {
        assert!(constant_time_eq("abc123", "abc123"));
    }

    #[test]
    fn constant_time_eq_rejects_different_strings() {
        assert!(!constant_time_eq("abc123", "abc124"));
        assert!(!constant_time_eq("abc123", "abc12"));
    }
}
