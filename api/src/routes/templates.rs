//! Handlers for `/api/templates/*`, covering C3 (Template Store) and C4
//! (Field-Schema Validator, invoked indirectly through `certs::generate`).

use axum::extract::{Path, State};
use axum::{Extension, Json};
use serde::Deserialize;
use serde_json::Value;
use shared::error::{AppError, ApiResponse};
use sqlx::Connection;
use templates::{DraftVersion, Template, TemplateStore, TemplateVersion};

use crate::auth::CallerIdentity;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateTemplateBody {
    pub name: String,
    pub code: String,
    pub created_by: String,
}

/// `POST /api/templates`
pub async fn create(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Json(body): Json<CreateTemplateBody>,
) -> Result<ApiResponse<Template>, AppError> {
    let mut conn = identity.tenant.acquire(&state.pool).await?;
    let template = TemplateStore::create(&mut **conn, &body.name, &body.code, &body.created_by).await?;
    Ok(ApiResponse::success(template))
}

#[derive(Debug, Deserialize)]
pub struct CreateVersionBody {
    pub html: String,
    pub css: Option<String>,
    pub field_schema: Value,
    pub created_by: String,
}

/// `POST /api/templates/:id/versions` — server-assigned `nextVersion`,
/// wrapped in a transaction since it reads the current max before writing.
pub async fn create_version(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(template_id): Path<i64>,
    Json(body): Json<CreateVersionBody>,
) -> Result<ApiResponse<TemplateVersion>, AppError> {
    let mut conn = identity.tenant.acquire(&state.pool).await?;
    let mut tx = conn.begin().await.map_err(|e| AppError::database(e.to_string()))?;

    let draft = DraftVersion {
        html: body.html,
        css: body.css,
        field_schema: body.field_schema,
        created_by: body.created_by,
    };
    let version = TemplateStore::create_version(&mut tx, template_id, draft).await?;

    tx.commit().await.map_err(|e| AppError::database(e.to_string()))?;
    Ok(ApiResponse::success(version))
}

/// `POST /api/templates/:id/versions/:version/publish` — DRAFT -> PUBLISHED
/// only, atomically with the template's `current_version` pointer.
pub async fn publish(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path((template_id, version)): Path<(i64, i32)>,
) -> Result<ApiResponse<()>, AppError> {
    let mut conn = identity.tenant.acquire(&state.pool).await?;
    let mut tx = conn.begin().await.map_err(|e| AppError::database(e.to_string()))?;

    TemplateStore::publish(&mut tx, template_id, version).await?;

    tx.commit().await.map_err(|e| AppError::database(e.to_string()))?;
    Ok(ApiResponse::ok())
}
