//! C1 — Tenant Context
//!
//! A validated schema identifier plus the explicit binding that carries it
//! through a unit of work. Nothing here is global or thread-local: a
//! [`TenantContext`] is a plain value the caller constructs, passes down
//! the call stack, and drops — an HTTP middleware builds one per request
//! (mirrors the teacher's `tenant_auth_middleware` attaching a
//! `TenantIdentity` via `axum::Extension`), a queue worker builds a fresh
//! one per delivery, and the verification service builds one per tenant
//! it probes.

use once_cell_free::OnceRegex;
use shared::error::{AppError, ErrorCode};
use sqlx::PgPool;
use sqlx::pool::PoolConnection;
use sqlx::{Executor, Postgres};
use std::ops::{Deref, DerefMut};

/// A tenant schema name, validated against `^[A-Za-z0-9_]{1,75}$`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct TenantSchema(String);

mod once_cell_free {
    //! Tiny lazily-initialized regex holder, so the pattern is compiled
    //! once per process without pulling in `once_cell` for a single use.
    use regex::Regex;
    use std::sync::OnceLock;

    pub struct OnceRegex(OnceLock<Regex>, &'static str);

    impl OnceRegex {
        pub const fn new(pattern: &'static str) -> Self {
            Self(OnceLock::new(), pattern)
        }

        pub fn get(&self) -> &Regex {
            self.0.get_or_init(|| Regex::new(self.1).expect("static pattern is valid"))
        }
    }
}

static SCHEMA_PATTERN: OnceRegex = OnceRegex::new(r"^[A-Za-z0-9_]{1,75}$");

impl TenantSchema {
    /// Validate and wrap a schema name. Fails with `InvalidTenant` if the
    /// string does not match `^[A-Za-z0-9_]{1,75}$`.
    pub fn parse(raw: impl Into<String>) -> Result<Self, AppError> {
        let raw = raw.into();
        if SCHEMA_PATTERN.get().is_match(&raw) {
            Ok(Self(raw))
        } else {
            Err(AppError::with_message(
                ErrorCode::InvalidTenant,
                format!("tenant schema '{raw}' does not match ^[A-Za-z0-9_]{{1,75}}$"),
            ))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for TenantSchema {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for TenantSchema {
    type Error = AppError;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<TenantSchema> for String {
    fn from(value: TenantSchema) -> Self {
        value.0
    }
}

/// Explicit per-operation tenant binding.
///
/// Not `Clone`-shared as ambient state — each request/task constructs and
/// owns its own `TenantContext`. Binding is strictly non-inherited across
/// work-unit boundaries: a queue worker must call [`TenantContext::bind`]
/// itself on every delivery rather than reusing a context built elsewhere.
#[derive(Debug, Default, Clone)]
pub struct TenantContext {
    schema: Option<TenantSchema>,
}

impl TenantContext {
    pub fn empty() -> Self {
        Self { schema: None }
    }

    pub fn bound(schema: TenantSchema) -> Self {
        Self { schema: Some(schema) }
    }

    pub fn bind(&mut self, schema: TenantSchema) {
        self.schema = Some(schema);
    }

    pub fn current(&self) -> Option<&TenantSchema> {
        self.schema.as_ref()
    }

    pub fn clear(&mut self) {
        self.schema = None;
    }

    /// The bound schema, or `MissingTenant` if none is set.
    pub fn require(&self) -> Result<&TenantSchema, AppError> {
        self.schema
            .as_ref()
            .ok_or_else(|| AppError::new(ErrorCode::MissingTenant))
    }

    /// Check out a pooled connection and pin it to this context's schema.
    ///
    /// Every checkout re-issues `SET search_path`, even when the
    /// underlying physical connection was previously used by a different
    /// tenant's work — pooled connections carry no memory of who used
    /// them last.
    pub async fn acquire(&self, pool: &PgPool) -> Result<TenantConnection, AppError> {
        let schema = self.require()?.clone();
        let mut conn = pool
            .acquire()
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        conn.execute(format!("SET search_path TO \"{schema}\", public").as_str())
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        Ok(TenantConnection { conn, schema })
    }
}

/// A pooled connection whose `search_path` has been pinned to one
/// tenant's schema. Dropping it returns the connection to the pool; the
/// next acquirer re-pins the path before issuing any statement, so no
/// tenant data can leak through a reused connection.
pub struct TenantConnection {
    conn: PoolConnection<Postgres>,
    schema: TenantSchema,
}

impl TenantConnection {
    pub fn schema(&self) -> &TenantSchema {
        &self.schema
    }
}

impl Deref for TenantConnection {
    type Target = PoolConnection<Postgres>;
    fn deref(&self) -> &Self::Target {
        &self.conn
    }
}

impl DerefMut for TenantConnection {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.conn
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_valid_schema_names() {
        assert!(TenantSchema::parse("acme_corp").is_ok());
        assert!(TenantSchema::parse("A1_b2").is_ok());
        assert!(TenantSchema::parse("x".repeat(75)).is_ok());
    }

    #[test]
    fn rejects_invalid_schema_names() {
        assert!(TenantSchema::parse("").is_err());
        assert!(TenantSchema::parse("has space").is_err());
        assert!(TenantSchema::parse("has-dash").is_err());
        assert!(TenantSchema::parse("x".repeat(76)).is_err());
    }

    #[test]
    fn context_starts_empty_and_requires_binding() {
        let ctx = TenantContext::empty();
        assert!(ctx.current().is_none());
        assert_eq!(ctx.require().unwrap_err().code, ErrorCode::MissingTenant);
    }

    #[test]
    fn bind_then_clear_round_trips() {
        let mut ctx = TenantContext::empty();
        ctx.bind(TenantSchema::parse("acme").unwrap());
        assert_eq!(ctx.current().unwrap().as_str(), "acme");
        ctx.clear();
        assert!(ctx.current().is_none());
    }
}
