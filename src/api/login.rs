use crate::api::{ApiError, AppState};
use crate::credentials::{CredentialRecord, IssueError};
use axum::{
    extract::{rejection::JsonRejection, State},
    response::Json,
    routing::post,
    Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

/// Request to log in with database credentials
#[derive(Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub hostname: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
    #[serde(default)]
    pub database: Option<String>,
}

/// Response for successful login
#[derive(Serialize, Deserialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Create login router (mounted under `/auth`)
pub fn create_login_router() -> Router<Arc<AppState>> {
    Router::new().route("/login", post(login))
}

/// POST /auth/login - Probe credentials and issue a token
async fn login(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Json<LoginResponse>, ApiError> {
    let Json(request) = payload?;

    let mut record = CredentialRecord::new(request.hostname, request.username, request.password);
    record.database = request.database.filter(|db| !db.is_empty());

    info!(hostname = %record.hostname, username = %record.username, "Login attempt");

    let token = state
        .codec
        .issue(&record, state.connector.as_ref())
        .await
        .map_err(|e| match e {
            IssueError::Incomplete => ApiError::LoginIncomplete,
            IssueError::Rejected(source) => ApiError::LoginRejected(source),
            IssueError::Seal => ApiError::Internal("Failed to issue token."),
        })?;

    info!(hostname = %record.hostname, username = %record.username, "Token issued");

    Ok(Json(LoginResponse { token }))
}
