use crate::api::{ApiError, AppState};
use crate::auth::authenticate;
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::sync::Arc;
use tracing::debug;


/// Session boundary guard for administrative routes
///
/// Decodes the bearer token on every request and, on success, stores the
/// decoded `CredentialRecord` in the request extensions, where it lives
/// exactly as long as the request. Handlers read it with
/// `Extension<CredentialRecord>`.
///
/// # Flow
/// 1. Extract bearer token from Authorization header
/// 2. Decrypt, authenticate and check expiry
/// 3. Attach the record and run the handler
///
/// # Errors
/// - 401: missing or malformed Authorization header
/// - 403: invalid or expired token, reported identically
pub async fn require_token(
    State(state): State<Arc<AppState>>,
    mut req: Request,
    next: Next,
) -> Response {
    match authenticate(req.headers(), &state.codec) {
        Ok(record) => {
            req.extensions_mut().insert(record);
            next.run(req).await
        }
        Err(e) => {
            debug!(path = %req.uri().path(), error = %e, "Request rejected by token guard");
            ApiError::from(e).into_response()
        }
    }
}
