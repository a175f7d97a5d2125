//! C7 — Hash Index
//!
//! Per-tenant index keyed by `hash`. Tenant-less verification (C12)
//! does not go through this module — it joins `certificate_hashes`
//! against `certificates` directly per probed schema, since it needs
//! both rows from a single round trip rather than two.

use shared::error::AppError;
use sqlx::{Executor, Postgres};

use crate::model::CertificateHash;

pub struct HashIndex;

impl HashIndex {
    pub async fn insert<'e, E>(conn: E, certificate_id: i64, hash: &str) -> Result<CertificateHash, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, CertificateHash>(
            "INSERT INTO certificate_hashes (certificate_id, hash, created_at)
             VALUES ($1, $2, now())
             RETURNING *",
        )
        .bind(certificate_id)
        .bind(hash)
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::database(e.to_string()))
    }

    pub async fn find_by_certificate_id<'e, E>(
        conn: E,
        certificate_id: i64,
    ) -> Result<Option<CertificateHash>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, CertificateHash>("SELECT * FROM certificate_hashes WHERE certificate_id = $1")
            .bind(certificate_id)
            .fetch_optional(conn)
            .await
            .map_err(|e| AppError::database(e.to_string()))
    }
}
