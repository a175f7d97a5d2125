//! C2 — Tenant Registry
//!
//! Maps customer identifiers, domains, and header values to tenant
//! schemas, and provisions new customers. Grounded on the teacher's
//! `crab-cloud::db::tenants` module — same `sqlx::query_as` + `PgPool`
//! shape, generalized from a flat tenant-id-column table to the
//! schema-per-tenant model this system requires.

use chrono::Utc;
use shared::error::{AppError, ErrorCode};
use sqlx::PgPool;

use crate::context::TenantSchema;
use crate::model::Customer;

#[derive(Clone)]
pub struct TenantRegistry {
    pool: PgPool,
}

/// Fields supplied by the caller when onboarding a new customer.
/// `tenant_schema` is generated from `domain` when absent.
pub struct NewCustomer {
    pub name: String,
    pub domain: String,
    pub tenant_schema: Option<String>,
    pub max_users: i32,
    pub max_certificates_per_month: i32,
}

impl TenantRegistry {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Accepts either a numeric customer id or a literal schema name, as
    /// carried by `X-Tenant-Id` / `X-Tenant-Schema`.
    pub async fn resolve_by_header(&self, header_value: &str) -> Result<Customer, AppError> {
        if let Ok(id) = header_value.parse::<i64>() {
            if let Some(customer) = self.find_by_id(id).await? {
                return Ok(customer);
            }
        }
        self.find_by_schema(header_value)
            .await?
            .ok_or_else(|| AppError::tenant_not_found(header_value))
    }

    pub async fn find_by_id(&self, id: i64) -> Result<Option<Customer>, AppError> {
        sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(e.to_string()))
    }

    pub async fn find_by_schema(&self, schema: &str) -> Result<Option<Customer>, AppError> {
        sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE tenant_schema = $1")
            .bind(schema)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(e.to_string()))
    }

    pub async fn schema_of(&self, id: i64) -> Result<TenantSchema, AppError> {
        let customer = self
            .find_by_id(id)
            .await?
            .ok_or_else(|| AppError::tenant_not_found(id.to_string()))?;
        TenantSchema::parse(customer.tenant_schema)
    }

    pub async fn customer_of(&self, schema: &TenantSchema) -> Result<Customer, AppError> {
        self.find_by_schema(schema.as_str())
            .await?
            .ok_or_else(|| AppError::tenant_not_found(schema.as_str()))
    }

    /// Customers with `status = ACTIVE`, ordered by id. Used by the
    /// verification service and the preview sweeper to enumerate tenants.
    pub async fn list_active(&self) -> Result<Vec<Customer>, AppError> {
        sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE status = 'ACTIVE' ORDER BY id ASC",
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::database(e.to_string()))
    }

    /// Onboard a new customer: validate uniqueness, persist the row, then
    /// provision its schema. If schema creation fails the customer row is
    /// rolled back; a failure during that rollback is logged but does not
    /// mask the original error.
    pub async fn onboard(&self, new: NewCustomer) -> Result<Customer, AppError> {
        if self.find_by_domain(&new.domain).await?.is_some() {
            return Err(AppError::already_exists(format!("domain {}", new.domain)));
        }

        let schema = match new.tenant_schema {
            Some(s) => {
                let schema = TenantSchema::parse(s)?;
                if self.find_by_schema(schema.as_str()).await?.is_some() {
                    return Err(AppError::already_exists(format!(
                        "tenant schema {}",
                        schema.as_str()
                    )));
                }
                schema
            }
            None => self.generate_unique_schema(&new.domain).await?,
        };

        let now = Utc::now();
        let row: Customer = sqlx::query_as::<_, Customer>(
            "INSERT INTO customers
                (name, domain, tenant_schema, status, max_users, max_certificates_per_month, created_at)
             VALUES ($1, $2, $3, 'TRIAL', $4, $5, $6)
             RETURNING *",
        )
        .bind(&new.name)
        .bind(&new.domain)
        .bind(schema.as_str())
        .bind(new.max_users)
        .bind(new.max_certificates_per_month)
        .bind(now)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

        if let Err(provision_err) = self.provision_schema(&schema).await {
            if let Err(rollback_err) = self.delete_customer(row.id).await {
                tracing::error!(
                    customer_id = row.id,
                    error = %rollback_err,
                    "failed to roll back customer row after schema provisioning failure"
                );
            }
            return Err(AppError::with_message(
                ErrorCode::TenantSchemaCreationFailed,
                provision_err.to_string(),
            ));
        }

        Ok(row)
    }

    async fn find_by_domain(&self, domain: &str) -> Result<Option<Customer>, AppError> {
        sqlx::query_as::<_, Customer>("SELECT * FROM customers WHERE domain = $1")
            .bind(domain)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::database(e.to_string()))
    }

    async fn delete_customer(&self, id: i64) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM customers WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    /// Derive a schema name from the domain, sanitized to the naming
    /// pattern and disambiguated with a numeric suffix on collision.
    async fn generate_unique_schema(&self, domain: &str) -> Result<TenantSchema, AppError> {
        let base = sanitize_schema_candidate(domain);
        let mut candidate = base.clone();
        let mut suffix = 0u32;
        loop {
            if self.find_by_schema(&candidate).await?.is_none() {
                return TenantSchema::parse(candidate);
            }
            suffix += 1;
            candidate = format!("{base}_{suffix}");
        }
    }

    /// Runs the database's schema-provisioning procedure. The actual DDL
    /// (`CREATE SCHEMA`, table creation inside it) is an external
    /// collaborator per the spec's scope boundary; here it is reached
    /// through a single SQL batch against the template so the rollback
    /// discipline above has one well-defined failure point.
    async fn provision_schema(&self, schema: &TenantSchema) -> Result<(), sqlx::Error> {
        let create = format!("CREATE SCHEMA \"{schema}\"");
        sqlx::query(&create).execute(&self.pool).await?;

        let template = include_str!("../migrations/tenant_schema.sql");
        for statement in template.split(';') {
            let statement = statement.trim();
            if statement.is_empty() {
                continue;
            }
            let scoped = format!("SET search_path TO \"{schema}\", public; {statement}");
            sqlx::raw_sql(&scoped).execute(&self.pool).await?;
        }
        Ok(())
    }
}

fn sanitize_schema_candidate(domain: &str) -> String {
    let mut out: String = domain
        .to_lowercase()
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() { c } else { '_' })
        .collect();
    out.truncate(60);
    if out.is_empty() {
        out = "tenant".to_string();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitizes_domain_into_schema_candidate() {
        assert_eq!(sanitize_schema_candidate("Acme-Corp.com"), "acme_corp_com");
        assert_eq!(sanitize_schema_candidate(""), "tenant");
    }

    #[test]
    fn sanitized_candidate_is_always_a_valid_schema_name() {
        let candidate = sanitize_schema_candidate("日本語.example.co");
        assert!(TenantSchema::parse(candidate).is_ok());
    }
}
