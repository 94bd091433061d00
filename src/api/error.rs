use crate::admin::{RootUserProtected, ValidationErrors};
use crate::auth::AuthError;
use crate::broker::{CommandError, ConnectError};
use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Json, Response},
};
use serde::Serialize;
use tracing::{error, warn};

/// Error response body
#[derive(Serialize)]
struct ErrorResponse {
    message: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    errors: Vec<String>,
}

/// API error types
///
/// Connection and upstream failures carry details for the server log only;
/// clients receive a generic message.
#[derive(Debug)]
pub enum ApiError {
    /// No usable bearer token
    MissingToken,
    /// Token invalid or expired (deliberately one outcome)
    InvalidToken,
    /// Login without hostname, username or password
    LoginIncomplete,
    /// Login probe failed
    LoginRejected(ConnectError),
    /// Bad request shape
    Validation(Vec<String>),
    /// Database name already taken
    DatabaseExists(String),
    /// Username already taken
    UserExists,
    /// Referenced user does not exist (request error)
    UnknownUser(String),
    /// Looked-up user does not exist
    UserNotFound(String),
    /// Role edit on a root-privileged user
    Forbidden(RootUserProtected),
    /// Could not connect with the operator's credentials
    Connection(ConnectError),
    /// Database command failed unexpectedly
    Upstream {
        context: &'static str,
        source: CommandError,
    },
    Internal(&'static str),
}

/// Wraps a command failure with the generic message shown to clients.
pub fn upstream(context: &'static str) -> impl FnOnce(CommandError) -> ApiError {
    move |source| ApiError::Upstream { context, source }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut errors = Vec::new();

        let (status, message) = match self {
            ApiError::MissingToken => (
                StatusCode::UNAUTHORIZED,
                AuthError::MissingToken.to_string(),
            ),
            ApiError::InvalidToken => (
                StatusCode::FORBIDDEN,
                AuthError::InvalidOrExpired.to_string(),
            ),
            ApiError::LoginIncomplete => (
                StatusCode::BAD_REQUEST,
                "Hostname, username, and password are required.".to_string(),
            ),
            ApiError::LoginRejected(e) => {
                warn!(error = %e, "Credential probe failed");
                (
                    StatusCode::UNAUTHORIZED,
                    "Invalid database credentials or unable to connect.".to_string(),
                )
            }
            ApiError::Validation(messages) => {
                let message = messages.join(" ");
                errors = messages;
                (StatusCode::BAD_REQUEST, message)
            }
            ApiError::DatabaseExists(name) => (
                StatusCode::BAD_REQUEST,
                format!("Database '{}' already exists.", name),
            ),
            ApiError::UserExists => (StatusCode::CONFLICT, "Username already exists.".to_string()),
            ApiError::UnknownUser(name) => (
                StatusCode::BAD_REQUEST,
                format!("User '{}' does not exist in the admin database.", name),
            ),
            ApiError::UserNotFound(name) => (
                StatusCode::NOT_FOUND,
                format!("User '{}' does not exist in the admin database.", name),
            ),
            ApiError::Forbidden(e) => (StatusCode::FORBIDDEN, e.to_string()),
            ApiError::Connection(e) => {
                warn!(error = %e, "Database connection failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Unable to connect to the database server.".to_string(),
                )
            }
            ApiError::Upstream { context, source } => {
                error!(error = %source, "{}", context);
                (StatusCode::INTERNAL_SERVER_ERROR, context.to_string())
            }
            ApiError::Internal(message) => {
                error!("{}", message);
                (StatusCode::INTERNAL_SERVER_ERROR, message.to_string())
            }
        };

        (status, Json(ErrorResponse { message, errors })).into_response()
    }
}

impl From<AuthError> for ApiError {
    fn from(e: AuthError) -> Self {
        match e {
            AuthError::MissingToken => ApiError::MissingToken,
            AuthError::InvalidOrExpired => ApiError::InvalidToken,
        }
    }
}

impl From<ConnectError> for ApiError {
    fn from(e: ConnectError) -> Self {
        ApiError::Connection(e)
    }
}

impl From<ValidationErrors> for ApiError {
    fn from(e: ValidationErrors) -> Self {
        ApiError::Validation(e.0)
    }
}

impl From<RootUserProtected> for ApiError {
    fn from(e: RootUserProtected) -> Self {
        ApiError::Forbidden(e)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(e: JsonRejection) -> Self {
        ApiError::Validation(vec![e.body_text()])
    }
}
