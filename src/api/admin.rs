use crate::admin::{
    ensure_roles_editable, validate_database_name, validate_new_user, validate_roles,
    DatabaseInfo, RoleGrant, UserInfo, ValidationErrors, ADMIN_DATABASE,
};
use crate::api::{require_token, upstream, ApiError, AppState};
use crate::broker::{with_connection, CommandError};
use crate::credentials::CredentialRecord;
use axum::{
    extract::{rejection::JsonRejection, Path, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post, put},
    Extension, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

const FETCH_DATABASES_FAILED: &str = "Failed to fetch databases.";
const FETCH_USERS_FAILED: &str = "Error fetching users";
const CREATE_DATABASE_FAILED: &str = "Failed to create database.";
const CREATE_USER_FAILED: &str = "Failed to create user.";
const CHANGE_PASSWORD_FAILED: &str = "Failed to change password.";
const DELETE_USER_FAILED: &str = "Failed to delete user.";
const UPDATE_ROLES_FAILED: &str = "An error occurred while updating roles.";

#[derive(Serialize)]
struct MessageResponse {
    message: String,
}

#[derive(Serialize)]
struct DatabasesResponse {
    databases: Vec<DatabaseInfo>,
}

#[derive(Serialize)]
struct UsersResponse {
    users: Vec<UserInfo>,
}

#[derive(Serialize)]
struct UserResponse {
    user: UserInfo,
}

#[derive(Deserialize)]
pub struct CreateDatabaseRequest {
    #[serde(rename = "dbName", default)]
    pub db_name: String,
}

#[derive(Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: String,
    /// Falls back to the configured default password when absent
    pub password: Option<String>,
    #[serde(default)]
    pub roles: Vec<RoleGrant>,
}

#[derive(Deserialize)]
pub struct ChangePasswordRequest {
    #[serde(default)]
    pub username: String,
    #[serde(rename = "newPassword", default)]
    pub new_password: String,
}

#[derive(Deserialize)]
pub struct DeleteUserRequest {
    #[serde(default)]
    pub username: String,
}

#[derive(Deserialize)]
pub struct EditRolesRequest {
    #[serde(default)]
    pub username: String,
    pub roles: Option<Vec<RoleGrant>>,
}

/// Create administrative router (mounted under `/admin`)
///
/// Every route runs behind [`require_token`].
pub fn create_admin_router(state: Arc<AppState>) -> Router<Arc<AppState>> {
    Router::new()
        .route("/databases", get(list_databases))
        .route("/users", get(list_users))
        .route("/getUser/:user", get(get_user))
        .route("/create-database", post(create_database))
        .route("/create-user", post(create_user))
        .route("/change-password", post(change_password))
        .route("/delete-user", post(delete_user))
        .route("/edit-roles", put(edit_roles))
        .route_layer(middleware::from_fn_with_state(state, require_token))
}

fn message(status: StatusCode, message: String) -> Response {
    (status, Json(MessageResponse { message })).into_response()
}

/// GET /admin/databases - List all databases
async fn list_databases(
    State(state): State<Arc<AppState>>,
    Extension(record): Extension<CredentialRecord>,
) -> Result<Json<DatabasesResponse>, ApiError> {
    let databases = with_connection(state.connector.as_ref(), &record, |session| {
        Box::pin(async move {
            session
                .list_databases()
                .await
                .map_err(upstream(FETCH_DATABASES_FAILED))
        })
    })
    .await?;

    Ok(Json(DatabasesResponse { databases }))
}

/// GET /admin/users - List users across all databases
async fn list_users(
    State(state): State<Arc<AppState>>,
    Extension(record): Extension<CredentialRecord>,
) -> Result<Json<UsersResponse>, ApiError> {
    let users = with_connection(state.connector.as_ref(), &record, |session| {
        Box::pin(async move { session.list_users().await.map_err(upstream(FETCH_USERS_FAILED)) })
    })
    .await?;

    Ok(Json(UsersResponse { users }))
}

/// GET /admin/getUser/:user - Get one user of the admin database
async fn get_user(
    State(state): State<Arc<AppState>>,
    Extension(record): Extension<CredentialRecord>,
    Path(username): Path<String>,
) -> Result<Json<UserResponse>, ApiError> {
    let user = with_connection(state.connector.as_ref(), &record, move |session| {
        Box::pin(async move {
            let user = session
                .find_user(&username)
                .await
                .map_err(upstream(FETCH_USERS_FAILED))?;
            user.ok_or(ApiError::UserNotFound(username))
        })
    })
    .await?;

    Ok(Json(UserResponse { user }))
}

/// POST /admin/create-database - Create a database
///
/// A database exists on the server once it holds a collection, so an initial
/// collection is created in it.
async fn create_database(
    State(state): State<Arc<AppState>>,
    Extension(record): Extension<CredentialRecord>,
    payload: Result<Json<CreateDatabaseRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let name = request.db_name;
    validate_database_name(&name)?;

    let name = with_connection(state.connector.as_ref(), &record, move |session| {
        Box::pin(async move {
            let databases = session
                .list_databases()
                .await
                .map_err(upstream(CREATE_DATABASE_FAILED))?;
            if databases.iter().any(|db| db.name == name) {
                return Err(ApiError::DatabaseExists(name));
            }

            session
                .create_database(&name)
                .await
                .map_err(upstream(CREATE_DATABASE_FAILED))?;
            Ok::<_, ApiError>(name)
        })
    })
    .await?;

    info!(database = %name, operator = %record.username, "Database created");

    Ok(message(
        StatusCode::CREATED,
        format!("Database '{}' created successfully.", name),
    ))
}

/// POST /admin/create-user - Create a user in the admin database
async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(record): Extension<CredentialRecord>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let password = request
        .password
        .unwrap_or_else(|| state.default_user_password.clone());
    let user = validate_new_user(&request.username, &password, &request.roles)?;

    let username = with_connection(state.connector.as_ref(), &record, move |session| {
        Box::pin(async move {
            let created = session.create_user(&user).await;
            match created {
                Ok(()) => Ok(user.username),
                Err(CommandError::Conflict) => Err(ApiError::UserExists),
                Err(e) => Err(upstream(CREATE_USER_FAILED)(e)),
            }
        })
    })
    .await?;

    info!(username = %username, operator = %record.username, "User created");

    Ok(message(
        StatusCode::CREATED,
        format!(
            "User '{}' created successfully in database '{}'.",
            username, ADMIN_DATABASE
        ),
    ))
}

/// POST /admin/change-password - Change a user's password
async fn change_password(
    State(state): State<Arc<AppState>>,
    Extension(record): Extension<CredentialRecord>,
    payload: Result<Json<ChangePasswordRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    if request.username.is_empty() || request.new_password.is_empty() {
        return Err(ValidationErrors::single("Username and newPassword are required.").into());
    }

    let ChangePasswordRequest {
        username,
        new_password,
    } = request;

    let username = with_connection(state.connector.as_ref(), &record, move |session| {
        Box::pin(async move {
            let existing = session
                .find_user(&username)
                .await
                .map_err(upstream(CHANGE_PASSWORD_FAILED))?;
            if existing.is_none() {
                return Err(ApiError::UnknownUser(username));
            }

            session
                .update_password(&username, &new_password)
                .await
                .map_err(upstream(CHANGE_PASSWORD_FAILED))?;
            Ok::<_, ApiError>(username)
        })
    })
    .await?;

    info!(username = %username, operator = %record.username, "Password changed");

    Ok(message(
        StatusCode::OK,
        format!("Password for user '{}' has been changed successfully.", username),
    ))
}

/// POST /admin/delete-user - Remove a user from the admin database
async fn delete_user(
    State(state): State<Arc<AppState>>,
    Extension(record): Extension<CredentialRecord>,
    payload: Result<Json<DeleteUserRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    if request.username.is_empty() {
        return Err(ValidationErrors::single("username is required.").into());
    }
    let username = request.username;

    let username = with_connection(state.connector.as_ref(), &record, move |session| {
        Box::pin(async move {
            let existing = session
                .find_user(&username)
                .await
                .map_err(upstream(DELETE_USER_FAILED))?;
            if existing.is_none() {
                return Err(ApiError::UnknownUser(username));
            }

            session
                .drop_user(&username)
                .await
                .map_err(upstream(DELETE_USER_FAILED))?;
            Ok::<_, ApiError>(username)
        })
    })
    .await?;

    info!(username = %username, operator = %record.username, "User deleted");

    Ok(message(
        StatusCode::OK,
        format!(
            "User '{}' has been deleted from database {}.",
            username, ADMIN_DATABASE
        ),
    ))
}

/// PUT /admin/edit-roles - Replace a user's roles
///
/// Users holding root on the admin database are refused, whoever asks.
async fn edit_roles(
    State(state): State<Arc<AppState>>,
    Extension(record): Extension<CredentialRecord>,
    payload: Result<Json<EditRolesRequest>, JsonRejection>,
) -> Result<Response, ApiError> {
    let Json(request) = payload?;
    let (username, roles) = match (request.username, request.roles) {
        (username, Some(roles)) if !username.is_empty() => (username, roles),
        _ => return Err(ValidationErrors::single("Username and roles are required.").into()),
    };
    validate_roles(&roles)?;

    let username = with_connection(state.connector.as_ref(), &record, move |session| {
        Box::pin(async move {
            let Some(user) = session
                .find_user(&username)
                .await
                .map_err(upstream(UPDATE_ROLES_FAILED))?
            else {
                return Err(ApiError::UserNotFound(username));
            };

            ensure_roles_editable(&user)?;

            session
                .update_roles(&username, &roles)
                .await
                .map_err(upstream(UPDATE_ROLES_FAILED))?;
            Ok::<_, ApiError>(username)
        })
    })
    .await?;

    info!(username = %username, operator = %record.username, "Roles updated");

    Ok(message(
        StatusCode::OK,
        format!("Roles for user '{}' have been updated successfully.", username),
    ))
}
