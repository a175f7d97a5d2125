//! Route composition, mirroring `crab-cloud::api::mod::create_router`:
//! public routes carry no auth layer at all, protected routes are merged
//! in with [`crate::auth::auth_middleware`] layered only on them.

pub mod certificates;
pub mod health;
pub mod templates;

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;

use crate::auth;
use crate::state::AppState;

pub fn router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(health::health_check))
        .route("/api/certificates/verify", get(certificates::verify_by_query))
        .route("/api/certificates/verify/{hash}", get(certificates::verify_by_path));

    let protected = Router::new()
        .route("/api/certificates", post(certificates::generate))
        .route("/api/certificates/{id}", get(certificates::fetch))
        .route("/api/certificates/{id}/preview/issue", post(certificates::issue_preview))
        .route("/api/certificates/{id}/revoke", post(certificates::revoke))
        .route("/api/certificates/{id}/download", get(certificates::download))
        .route("/api/templates", post(templates::create))
        .route("/api/templates/{id}/versions", post(templates::create_version))
        .route("/api/templates/{id}/versions/{version}/publish", post(templates::publish))
        .layer(middleware::from_fn_with_state(state.clone(), auth::auth_middleware));

    public.merge(protected).with_state(state)
}
