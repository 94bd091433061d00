//! User and database administration rules.
//!
//! Request-shape validation and the root-user safety rail. Nothing here talks
//! to the database; handlers validate first and then hand the result to a
//! broker session.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;


/// Database holding the managed users.
pub const ADMIN_DATABASE: &str = "admin";

/// Roles that may be granted through the panel.
pub const ALLOWED_ROLES: [&str; 3] = ["readWrite", "dbAdmin", "userAdmin"];

pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum database name length in bytes
const MAX_DATABASE_NAME_LENGTH: usize = 64;

/// Characters the server refuses in database names
const FORBIDDEN_DATABASE_NAME_CHARS: &[char] =
    &['/', '\\', '.', ' ', '"', '$', '*', '<', '>', ':', '|', '?', '\0'];

/// A role granted on a database.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoleGrant {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub db: String,
}

impl RoleGrant {
    pub fn new(role: impl Into<String>, db: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            db: db.into(),
        }
    }

    /// Root-equivalent: `root` on the administrative database.
    pub fn is_root(&self) -> bool {
        self.role == "root" && self.db == ADMIN_DATABASE
    }
}

/// A user as stored in the administrative database.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UserInfo {
    /// `<db>.<user>`
    #[serde(rename = "_id")]
    pub id: String,
    pub user: String,
    #[serde(default)]
    pub db: String,
    #[serde(default)]
    pub roles: Vec<RoleGrant>,
}

impl UserInfo {
    pub fn has_root_role(&self) -> bool {
        self.roles.iter().any(RoleGrant::is_root)
    }
}

/// A database as reported by the server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseInfo {
    pub name: String,
    #[serde(rename = "sizeOnDisk")]
    pub size_on_disk: u64,
    pub empty: bool,
}

/// A validated create-user request.
#[derive(Clone, PartialEq)]
pub struct NewUser {
    pub username: String,
    pub password: String,
    pub roles: Vec<RoleGrant>,
}

impl fmt::Debug for NewUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NewUser")
            .field("username", &self.username)
            .field("password", &"***")
            .field("roles", &self.roles)
            .finish()
    }
}

/// One or more user-actionable input problems.
#[derive(Debug, Error, PartialEq)]
#[error("{}", .0.join(" "))]
pub struct ValidationErrors(pub Vec<String>);

impl ValidationErrors {
    pub fn single(message: impl Into<String>) -> Self {
        Self(vec![message.into()])
    }
}

/// Editing roles of a root-privileged user is refused.
#[derive(Debug, Error, PartialEq)]
#[error("Cannot edit roles for a user with root privileges.")]
pub struct RootUserProtected;

/// Validates a create-user request.
///
/// The username is trimmed and must be ASCII alphanumeric. The password must be
/// at least [`MIN_PASSWORD_LENGTH`] characters. Every role must name a role and
/// a database, and the role must be in [`ALLOWED_ROLES`].
pub fn validate_new_user(
    username: &str,
    password: &str,
    roles: &[RoleGrant],
) -> Result<NewUser, ValidationErrors> {
    let username = username.trim();
    let mut errors = Vec::new();

    if username.is_empty() || !username.chars().all(|c| c.is_ascii_alphanumeric()) {
        errors.push("Username must be alphanumeric.".to_string());
    }

    if password.chars().count() < MIN_PASSWORD_LENGTH {
        errors.push(format!(
            "Password must be at least {} characters long.",
            MIN_PASSWORD_LENGTH
        ));
    }

    if let Err(ValidationErrors(role_errors)) = validate_roles(roles) {
        errors.extend(role_errors);
    }

    if !errors.is_empty() {
        return Err(ValidationErrors(errors));
    }

    Ok(NewUser {
        username: username.to_string(),
        password: password.to_string(),
        roles: roles.to_vec(),
    })
}

/// Validates a role list for create-user and edit-roles.
pub fn validate_roles(roles: &[RoleGrant]) -> Result<(), ValidationErrors> {
    if roles.is_empty() {
        return Err(ValidationErrors::single("At least one role must be assigned."));
    }

    if roles.iter().any(|r| r.role.is_empty() || r.db.is_empty()) {
        return Err(ValidationErrors::single(
            "Each role must have a role name and associated database.",
        ));
    }

    let invalid: Vec<&str> = roles
        .iter()
        .filter(|r| !ALLOWED_ROLES.contains(&r.role.as_str()))
        .map(|r| r.role.as_str())
        .collect();

    if !invalid.is_empty() {
        return Err(ValidationErrors::single(format!(
            "Invalid roles detected: {}",
            invalid.join(", ")
        )));
    }

    Ok(())
}

/// Validates a database name against the server's naming rules.
pub fn validate_database_name(name: &str) -> Result<(), ValidationErrors> {
    if name.is_empty() {
        return Err(ValidationErrors::single("dbName is required."));
    }

    if name.len() > MAX_DATABASE_NAME_LENGTH {
        return Err(ValidationErrors::single(format!(
            "Database name must be at most {} bytes.",
            MAX_DATABASE_NAME_LENGTH
        )));
    }

    if name.contains(FORBIDDEN_DATABASE_NAME_CHARS) {
        return Err(ValidationErrors::single(
            "Database name contains characters that are not allowed.",
        ));
    }

    Ok(())
}

/// Refuses role edits on root-privileged users, whoever the requester is.
pub fn ensure_roles_editable(user: &UserInfo) -> Result<(), RootUserProtected> {
    if user.has_root_role() {
        return Err(RootUserProtected);
    }
    Ok(())
}
