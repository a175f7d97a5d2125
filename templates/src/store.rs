//! C3 — Template Store
//!
//! CRUD on `Template` plus version lifecycle (`createVersion`,
//! `listVersions`, `findVersion`, `publish`, `archive`, `markDraft`), all
//! scoped to the caller's tenant connection. Grounded on the teacher's
//! `crab-cloud::db::store::label_template` module — plain `sqlx::query_as`
//! functions taking a connection and returning domain structs, with
//! transactions wrapping any multi-statement write.

use chrono::Utc;
use serde_json::Value;
use shared::error::AppError;
use sqlx::Executor;
use sqlx::Postgres;

use crate::model::{DraftVersion, Template, TemplateVersion, VersionStatus};

pub struct TemplateStore;

impl TemplateStore {
    /// Rejects empty HTML, empty/non-object `fieldSchema`, and a missing
    /// `createdBy`.
    pub fn validate(draft: &DraftVersion) -> Result<(), AppError> {
        if draft.html.trim().is_empty() {
            return Err(AppError::validation("template html must not be empty"));
        }
        match &draft.field_schema {
            Value::Object(map) if !map.is_empty() => {}
            _ => {
                return Err(AppError::validation(
                    "fieldSchema must be a non-empty JSON object",
                ));
            }
        }
        if draft.created_by.trim().is_empty() {
            return Err(AppError::validation("createdBy must not be empty"));
        }
        Ok(())
    }

    pub async fn create<'e, E>(
        conn: E,
        name: &str,
        code: &str,
        created_by: &str,
    ) -> Result<Template, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let now = Utc::now();
        sqlx::query_as::<_, Template>(
            "INSERT INTO templates (name, code, status, metadata, created_by, created_at, updated_at)
             VALUES ($1, $2, 'DRAFT', '{}'::jsonb, $3, $4, $4)
             RETURNING *",
        )
        .bind(name)
        .bind(code)
        .bind(created_by)
        .bind(now)
        .fetch_one(conn)
        .await
        .map_err(|e| AppError::database(e.to_string()))
    }

    pub async fn find<'e, E>(conn: E, id: i64) -> Result<Option<Template>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Template>("SELECT * FROM templates WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await
            .map_err(|e| AppError::database(e.to_string()))
    }

    pub async fn list<'e, E>(conn: E) -> Result<Vec<Template>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, Template>("SELECT * FROM templates ORDER BY id ASC")
            .fetch_all(conn)
            .await
            .map_err(|e| AppError::database(e.to_string()))
    }

    pub async fn delete<'e, E>(conn: E, id: i64) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let result = sqlx::query("DELETE FROM templates WHERE id = $1")
            .bind(id)
            .execute(conn)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("template {id}")));
        }
        Ok(())
    }

    /// `nextVersion = 1 + max(existing)`.
    pub async fn create_version(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        template_id: i64,
        draft: DraftVersion,
    ) -> Result<TemplateVersion, AppError> {
        Self::validate(&draft)?;

        let next_version: i32 = sqlx::query_scalar(
            "SELECT COALESCE(MAX(version), 0) + 1 FROM template_versions WHERE template_id = $1",
        )
        .bind(template_id)
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

        let version = sqlx::query_as::<_, TemplateVersion>(
            "INSERT INTO template_versions (template_id, version, html, css, field_schema, status, created_at)
             VALUES ($1, $2, $3, $4, $5, 'DRAFT', $6)
             RETURNING *",
        )
        .bind(template_id)
        .bind(next_version)
        .bind(&draft.html)
        .bind(&draft.css)
        .bind(&draft.field_schema)
        .bind(Utc::now())
        .fetch_one(&mut **tx)
        .await
        .map_err(|e| AppError::database(e.to_string()))?;

        Ok(version)
    }

    pub async fn list_versions<'e, E>(
        conn: E,
        template_id: i64,
    ) -> Result<Vec<TemplateVersion>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, TemplateVersion>(
            "SELECT * FROM template_versions WHERE template_id = $1 ORDER BY version ASC",
        )
        .bind(template_id)
        .fetch_all(conn)
        .await
        .map_err(|e| AppError::database(e.to_string()))
    }

    pub async fn find_version<'e, E>(
        conn: E,
        template_id: i64,
        version: i32,
    ) -> Result<Option<TemplateVersion>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        sqlx::query_as::<_, TemplateVersion>(
            "SELECT * FROM template_versions WHERE template_id = $1 AND version = $2",
        )
        .bind(template_id)
        .bind(version)
        .fetch_optional(conn)
        .await
        .map_err(|e| AppError::database(e.to_string()))
    }

    /// Sets the version to PUBLISHED and atomically writes the template's
    /// `current_version`. DRAFT -> PUBLISHED only. The version previously
    /// referenced by `current_version`, if any, moves to ARCHIVED rather
    /// than reverting to DRAFT — its content stays immutable and any
    /// certificate already issued against it keeps pointing at a version
    /// that still exists, just no longer publishable.
    pub async fn publish(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        template_id: i64,
        version: i32,
    ) -> Result<(), AppError> {
        let existing = Self::find_version(&mut **tx, template_id, version)
            .await?
            .ok_or_else(|| AppError::not_found(format!("template version {version}")))?;
        if existing.status() != VersionStatus::Draft {
            return Err(AppError::illegal_transition(
                existing.status().as_str(),
                "PUBLISHED",
            ));
        }

        let template = Self::find(&mut **tx, template_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("template {template_id}")))?;
        if let Some(previous) = template.current_version {
            sqlx::query("UPDATE template_versions SET status = 'ARCHIVED' WHERE template_id = $1 AND version = $2")
                .bind(template_id)
                .bind(previous)
                .execute(&mut **tx)
                .await
                .map_err(|e| AppError::database(e.to_string()))?;
        }

        sqlx::query("UPDATE template_versions SET status = 'PUBLISHED' WHERE template_id = $1 AND version = $2")
            .bind(template_id)
            .bind(version)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;

        sqlx::query("UPDATE templates SET status = 'PUBLISHED', current_version = $1, updated_at = now() WHERE id = $2")
            .bind(version)
            .bind(template_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        Ok(())
    }

    /// DRAFT -> ARCHIVED or PUBLISHED -> ARCHIVED at the template level,
    /// cascading to the currently PUBLISHED version, if any, since a
    /// template cannot be ARCHIVED while one of its versions still is.
    pub async fn archive(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        template_id: i64,
    ) -> Result<(), AppError> {
        let template = Self::find(&mut **tx, template_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("template {template_id}")))?;

        if let Some(version) = template.current_version {
            sqlx::query("UPDATE template_versions SET status = 'ARCHIVED' WHERE template_id = $1 AND version = $2")
                .bind(template_id)
                .bind(version)
                .execute(&mut **tx)
                .await
                .map_err(|e| AppError::database(e.to_string()))?;
        }

        sqlx::query("UPDATE templates SET status = 'ARCHIVED', updated_at = now() WHERE id = $1")
            .bind(template_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        Ok(())
    }

    /// PUBLISHED -> DRAFT, forbidden once any certificate references the
    /// template's current version. ARCHIVED -> DRAFT is always forbidden.
    /// The current version reverts to DRAFT alongside the template and
    /// `current_version` is cleared, since the template no longer has a
    /// published version once this completes.
    pub async fn mark_draft(
        tx: &mut sqlx::Transaction<'_, Postgres>,
        template_id: i64,
    ) -> Result<(), AppError> {
        let template = Self::find(&mut **tx, template_id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("template {template_id}")))?;

        match template.status() {
            crate::model::TemplateStatus::Published => {}
            other => {
                return Err(AppError::illegal_transition(other.as_str(), "DRAFT"));
            }
        }

        if let Some(version) = template.current_version {
            let referenced: i64 = sqlx::query_scalar(
                "SELECT COUNT(*) FROM certificates WHERE template_id = $1 AND template_version = $2",
            )
            .bind(template_id)
            .bind(version)
            .fetch_one(&mut **tx)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
            if referenced > 0 {
                return Err(AppError::illegal_transition("PUBLISHED", "DRAFT"));
            }

            sqlx::query("UPDATE template_versions SET status = 'DRAFT' WHERE template_id = $1 AND version = $2")
                .bind(template_id)
                .bind(version)
                .execute(&mut **tx)
                .await
                .map_err(|e| AppError::database(e.to_string()))?;
        }

        sqlx::query("UPDATE templates SET status = 'DRAFT', current_version = NULL, updated_at = now() WHERE id = $1")
            .bind(template_id)
            .execute(&mut **tx)
            .await
            .map_err(|e| AppError::database(e.to_string()))?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn draft(html: &str, schema: Value, created_by: &str) -> DraftVersion {
        DraftVersion {
            html: html.to_string(),
            css: None,
            field_schema: schema,
            created_by: created_by.to_string(),
        }
    }

    #[test]
    fn rejects_empty_html() {
        let d = draft("", json!({"name": {"type": "string"}}), "alice");
        assert!(TemplateStore::validate(&d).is_err());
    }

    #[test]
    fn rejects_empty_field_schema() {
        let d = draft("<html></html>", json!({}), "alice");
        assert!(TemplateStore::validate(&d).is_err());
    }

    #[test]
    fn rejects_non_object_field_schema() {
        let d = draft("<html></html>", json!([1, 2, 3]), "alice");
        assert!(TemplateStore::validate(&d).is_err());
    }

    #[test]
    fn rejects_missing_created_by() {
        let d = draft("<html></html>", json!({"name": {"type": "string"}}), "");
        assert!(TemplateStore::validate(&d).is_err());
    }

    #[test]
    fn accepts_well_formed_draft() {
        let d = draft("<html></html>", json!({"name": {"type": "string"}}), "alice");
        assert!(TemplateStore::validate(&d).is_ok());
    }
}
