// HTTP API: login, token guard, administrative endpoints

pub mod admin;
pub mod auth_middleware;
mod error;
pub mod login;

pub use admin::create_admin_router;
pub use auth_middleware::require_token;
pub use error::{upstream, ApiError};
pub use login::create_login_router;

use crate::broker::Connector;
use crate::credentials::CredentialCodec;
use axum::{response::Json, routing::get, Router};
use serde_json::{json, Value};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared application state
///
/// Immutable after startup; requests share nothing else.
#[derive(Clone)]
pub struct AppState {
    pub codec: Arc<CredentialCodec>,
    pub connector: Arc<dyn Connector>,
    /// Used by create-user when the request has no password
    pub default_user_password: String,
}

/// Create the complete API router
///
/// - `POST /auth/login`
/// - `/admin/*` behind the token guard
/// - `GET /health`
pub fn create_router(state: AppState) -> Router {
    let state = Arc::new(state);

    Router::new()
        .nest("/auth", create_login_router())
        .nest("/admin", create_admin_router(Arc::clone(&state)))
        .route("/health", get(health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// GET /health - liveness, no database access
async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}
