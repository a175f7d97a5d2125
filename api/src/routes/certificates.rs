//! Handlers for `/api/certificates/*`, covering C8 (Certificate Engine),
//! C9 (Generation Queue), and C12 (Verification Service).

use axum::extract::{Path, Query, State};
use axum::{Extension, Json};
use certs::{Certificate, GenerateRequest, GenerationMode};
use queue::GenerationMessage;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::error::{AppError, ApiResponse};

use crate::auth::CallerIdentity;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateBody {
    pub template_id: i64,
    pub template_version: Option<i32>,
    pub recipient_data: Value,
    pub certificate_number: Option<String>,
    #[serde(default)]
    pub preview: bool,
}

#[derive(Debug, Deserialize)]
pub struct GenerateQuery {
    pub mode: Option<String>,
}

fn parse_mode(query: &GenerateQuery) -> GenerationMode {
    match query.mode.as_deref() {
        Some("async") => GenerationMode::Async,
        _ => GenerationMode::Sync,
    }
}

/// `POST /api/certificates` — validates and persists PENDING inside C8,
/// then either drives the render inline (`?mode=sync`, the default) or
/// hands the id to C9 for the worker to pick up (`?mode=async`).
pub async fn generate(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Query(query): Query<GenerateQuery>,
    Json(body): Json<GenerateBody>,
) -> Result<ApiResponse<Certificate>, AppError> {
    let mode = parse_mode(&query);
    let customer = state
        .registry
        .find_by_id(identity.customer_id)
        .await?
        .ok_or_else(|| AppError::tenant_not_found(identity.customer_id.to_string()))?;

    let preview = body.preview;
    let request = GenerateRequest {
        template_id: body.template_id,
        template_version: body.template_version,
        recipient_data: body.recipient_data,
        certificate_number: body.certificate_number,
        preview,
    };

    let certificate = state
        .engine
        .generate(&identity.tenant, request, mode, customer.max_certificates_per_month)
        .await?;

    match mode {
        GenerationMode::Sync => {
            state.engine.process(&identity.tenant, certificate.id, preview).await?;
            let certificate = state.engine.find(&identity.tenant, certificate.id).await?;
            Ok(ApiResponse::success(certificate))
        }
        GenerationMode::Async => {
            let message = GenerationMessage {
                certificate_id: certificate.id,
                tenant_schema: identity.tenant.require()?.as_str().to_string(),
                is_preview: preview,
            };
            state.publisher.publish(&message).await?;
            Ok(ApiResponse::success(certificate))
        }
    }
}

/// `GET /api/certificates/:id`
pub async fn fetch(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Certificate>, AppError> {
    let certificate = state.engine.find(&identity.tenant, id).await?;
    Ok(ApiResponse::success(certificate))
}

/// `POST /api/certificates/:id/preview/issue`
pub async fn issue_preview(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Certificate>, AppError> {
    let certificate = state.engine.issue_preview(&identity.tenant, id).await?;
    Ok(ApiResponse::success(certificate))
}

/// `POST /api/certificates/:id/revoke`
pub async fn revoke(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(id): Path<i64>,
) -> Result<ApiResponse<Certificate>, AppError> {
    let certificate = state.engine.revoke(&identity.tenant, id).await?;
    Ok(ApiResponse::success(certificate))
}

#[derive(Debug, Deserialize)]
pub struct DownloadQuery {
    pub ttl_minutes: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct DownloadResponse {
    pub url: String,
}

/// `GET /api/certificates/:id/download` — a presigned URL, never the PDF
/// bytes themselves.
pub async fn download(
    State(state): State<AppState>,
    Extension(identity): Extension<CallerIdentity>,
    Path(id): Path<i64>,
    Query(query): Query<DownloadQuery>,
) -> Result<ApiResponse<DownloadResponse>, AppError> {
    let ttl_minutes = storage::normalize_ttl_minutes(query.ttl_minutes.unwrap_or(state.download_ttl_minutes));
    let url = state.engine.get_download_url(&identity.tenant, id, ttl_minutes).await?;
    Ok(ApiResponse::success(DownloadResponse { url }))
}

#[derive(Debug, Deserialize)]
pub struct VerifyQuery {
    pub hash: Option<String>,
}

async fn verify_hash(state: &AppState, hash: &str) -> Result<ApiResponse<Certificate>, AppError> {
    match state.verifier.verify(hash).await? {
        Some(certificate) => Ok(ApiResponse::success(certificate)),
        // Never distinguish "wrong hash" from "right hash, not yet issued" —
        // both come back as a plain not-found.
        None => Err(AppError::not_found("certificate")),
    }
}

/// `GET /api/certificates/verify?hash=...` — public, no tenant header.
pub async fn verify_by_query(
    State(state): State<AppState>,
    Query(query): Query<VerifyQuery>,
) -> Result<ApiResponse<Certificate>, AppError> {
    let hash = query.hash.ok_or_else(|| AppError::validation("hash query parameter is required"))?;
    verify_hash(&state, &hash).await
}

/// `GET /api/certificates/verify/:hash` — public, no tenant header.
pub async fn verify_by_path(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<ApiResponse<Certificate>, AppError> {
    let hash = urlencoding::decode(&hash).map(|decoded| decoded.into_owned()).unwrap_or(hash);
    verify_hash(&state, &hash).await
}
