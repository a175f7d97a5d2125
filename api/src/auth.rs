//! C13 — Security/Auth Edge
//!
//! Reuses the teacher's JWT bearer-token shape verbatim
//! (`crab-cloud::auth::tenant_auth::tenant_auth_middleware`):
//! `Authorization: Bearer <jwt>` decoded with `jsonwebtoken`, claims
//! `{sub, email, exp, iat}`, `sub` carrying the customer id. `sub` is
//! resolved to a tenant schema via C2 and attached as a
//! [`CallerIdentity`] extension.
//!
//! Per SPEC_FULL.md §4.13, identity resolution itself never blocks: this
//! middleware is only layered onto the route groups that require
//! authentication (mirroring how the teacher layers `edge_auth_middleware`
//! only onto `/api/edge/*`), so public routes like verification never run
//! it at all rather than tolerating a missing/invalid token.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use shared::error::AppError;
use tenant::TenantContext;

use crate::state::AppState;

const JWT_EXPIRY_HOURS: i64 = 24;

#[derive(Debug, Serialize, Deserialize)]
pub struct TenantClaims {
    /// Customer id.
    pub sub: String,
    pub email: String,
    pub exp: usize,
    pub iat: usize,
}

/// The caller's identity and tenant binding, attached to authenticated
/// requests by [`auth_middleware`].
#[derive(Debug, Clone)]
pub struct CallerIdentity {
    pub customer_id: i64,
    pub email: String,
    pub tenant: TenantContext,
}

pub fn create_token(customer_id: i64, email: &str, secret: &str) -> Result<String, jsonwebtoken::errors::Error> {
    let now = chrono::Utc::now();
    let claims = TenantClaims {
        sub: customer_id.to_string(),
        email: email.to_string(),
        exp: (now + chrono::Duration::hours(JWT_EXPIRY_HOURS)).timestamp() as usize,
        iat: now.timestamp() as usize,
    };
    jsonwebtoken::encode(&Header::default(), &claims, &EncodingKey::from_secret(secret.as_bytes()))
}

/// Verifies the bearer token and attaches a [`CallerIdentity`] extension,
/// or rejects with 401 before the request reaches the handler.
pub async fn auth_middleware(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, Response> {
    let header = request
        .headers()
        .get("Authorization")
        .and_then(|v| v.to_str().ok())
        .ok_or_else(AppError::not_authenticated)
        .map_err(IntoResponse::into_response)?;

    let token = header
        .strip_prefix("Bearer ")
        .ok_or_else(AppError::not_authenticated)
        .map_err(IntoResponse::into_response)?;

    let token_data = jsonwebtoken::decode::<TenantClaims>(
        token,
        &DecodingKey::from_secret(state.jwt_secret.as_bytes()),
        &Validation::default(),
    )
    .map_err(|e| {
        tracing::debug!("JWT validation failed: {e}");
        AppError::not_authenticated().into_response()
    })?;

    let customer_id: i64 = token_data
        .claims
        .sub
        .parse()
        .map_err(|_| AppError::not_authenticated().into_response())?;

    let schema = state
        .registry
        .schema_of(customer_id)
        .await
        .map_err(IntoResponse::into_response)?;

    request.extensions_mut().insert(CallerIdentity {
        customer_id,
        email: token_data.claims.email,
        tenant: TenantContext::bound(schema),
    });

    Ok(next.run(request).await)
}
