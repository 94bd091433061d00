// Shared fixtures for API integration tests: an in-memory database server
// standing in for MongoDB behind the Connector seam.

#![allow(dead_code)]

use async_trait::async_trait;
use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{DateTime, Utc};
use dbpanel::admin::{DatabaseInfo, NewUser, RoleGrant, UserInfo, ADMIN_DATABASE};
use dbpanel::api::{create_router, AppState};
use dbpanel::broker::{AdminSession, CommandError, ConnectError, Connector};
use dbpanel::credentials::{CredentialCodec, CredentialRecord, TokenKey};
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const HOST: &str = "db.test.local";
pub const ROOT_USER: &str = "root";
pub const ROOT_PASSWORD: &str = "rootpass123";
pub const DEFAULT_USER_PASSWORD: &str = "password123";

#[derive(Clone)]
struct StoredUser {
    password: String,
    roles: Vec<RoleGrant>,
}

#[derive(Default)]
struct ServerState {
    databases: Vec<String>,
    users: BTreeMap<String, StoredUser>,
}

/// In-memory server. Every operator authenticates against its admin users.
#[derive(Default)]
pub struct FakeServer {
    state: Mutex<ServerState>,
    pub opened: AtomicUsize,
    pub closed: AtomicUsize,
}

impl FakeServer {
    /// A server with `admin` and `local` databases and one root user.
    pub fn new() -> Arc<Self> {
        let server = Self::default();
        {
            let mut state = server.state.lock().unwrap();
            state.databases = vec![ADMIN_DATABASE.to_string(), "local".to_string()];
            state.users.insert(
                ROOT_USER.to_string(),
                StoredUser {
                    password: ROOT_PASSWORD.to_string(),
                    roles: vec![RoleGrant::new("root", ADMIN_DATABASE)],
                },
            );
        }
        Arc::new(server)
    }

    pub fn add_user(&self, username: &str, password: &str, roles: Vec<RoleGrant>) {
        self.state.lock().unwrap().users.insert(
            username.to_string(),
            StoredUser {
                password: password.to_string(),
                roles,
            },
        );
    }

    pub fn has_database(&self, name: &str) -> bool {
        self.state
            .lock()
            .unwrap()
            .databases
            .iter()
            .any(|db| db == name)
    }

    pub fn password_of(&self, username: &str) -> Option<String> {
        self.state
            .lock()
            .unwrap()
            .users
            .get(username)
            .map(|u| u.password.clone())
    }

    pub fn roles_of(&self, username: &str) -> Option<Vec<RoleGrant>> {
        self.state
            .lock()
            .unwrap()
            .users
            .get(username)
            .map(|u| u.roles.clone())
    }

    pub fn open_connections(&self) -> usize {
        self.opened.load(Ordering::SeqCst) - self.closed.load(Ordering::SeqCst)
    }

    fn user_info(username: &str, user: &StoredUser) -> UserInfo {
        UserInfo {
            id: format!("{}.{}", ADMIN_DATABASE, username),
            user: username.to_string(),
            db: ADMIN_DATABASE.to_string(),
            roles: user.roles.clone(),
        }
    }
}

/// Connector handing out sessions on a shared [`FakeServer`].
pub struct FakeConnector(pub Arc<FakeServer>);

#[async_trait]
impl Connector for FakeConnector {
    async fn connect(
        &self,
        record: &CredentialRecord,
    ) -> Result<Box<dyn AdminSession>, ConnectError> {
        if record.hostname != HOST {
            return Err(ConnectError::Unavailable(format!(
                "no server at {}",
                record.hostname
            )));
        }

        let accepted = self
            .0
            .password_of(&record.username)
            .is_some_and(|password| password == record.password);
        if !accepted {
            return Err(ConnectError::Rejected("Authentication failed.".to_string()));
        }

        self.0.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(FakeSession(Arc::clone(&self.0))))
    }
}

struct FakeSession(Arc<FakeServer>);

#[async_trait]
impl AdminSession for FakeSession {
    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>, CommandError> {
        let state = self.0.state.lock().unwrap();
        Ok(state
            .databases
            .iter()
            .map(|name| DatabaseInfo {
                name: name.clone(),
                size_on_disk: 8192,
                empty: false,
            })
            .collect())
    }

    async fn create_database(&self, name: &str) -> Result<(), CommandError> {
        self.0.state.lock().unwrap().databases.push(name.to_string());
        Ok(())
    }

    async fn list_users(&self) -> Result<Vec<UserInfo>, CommandError> {
        let state = self.0.state.lock().unwrap();
        Ok(state
            .users
            .iter()
            .map(|(name, user)| FakeServer::user_info(name, user))
            .collect())
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserInfo>, CommandError> {
        let state = self.0.state.lock().unwrap();
        Ok(state
            .users
            .get(username)
            .map(|user| FakeServer::user_info(username, user)))
    }

    async fn create_user(&self, user: &NewUser) -> Result<(), CommandError> {
        let mut state = self.0.state.lock().unwrap();
        if state.users.contains_key(&user.username) {
            return Err(CommandError::Conflict);
        }
        state.users.insert(
            user.username.clone(),
            StoredUser {
                password: user.password.clone(),
                roles: user.roles.clone(),
            },
        );
        Ok(())
    }

    async fn update_password(&self, username: &str, password: &str) -> Result<(), CommandError> {
        let mut state = self.0.state.lock().unwrap();
        let user = state
            .users
            .get_mut(username)
            .ok_or_else(|| CommandError::Failed(format!("User {} not found", username)))?;
        user.password = password.to_string();
        Ok(())
    }

    async fn update_roles(&self, username: &str, roles: &[RoleGrant]) -> Result<(), CommandError> {
        let mut state = self.0.state.lock().unwrap();
        let user = state
            .users
            .get_mut(username)
            .ok_or_else(|| CommandError::Failed(format!("User {} not found", username)))?;
        user.roles = roles.to_vec();
        Ok(())
    }

    async fn drop_user(&self, username: &str) -> Result<(), CommandError> {
        self.0.state.lock().unwrap().users.remove(username);
        Ok(())
    }

    async fn close(self: Box<Self>) {
        self.0.closed.fetch_add(1, Ordering::SeqCst);
    }
}

pub fn test_codec() -> CredentialCodec {
    CredentialCodec::new(TokenKey::from_bytes(&[42u8; 32]).unwrap())
}

pub fn create_test_app(server: &Arc<FakeServer>) -> Router {
    create_router(AppState {
        codec: Arc::new(test_codec()),
        connector: Arc::new(FakeConnector(Arc::clone(server))),
        default_user_password: DEFAULT_USER_PASSWORD.to_string(),
    })
}

/// Token for the root operator, sealed directly at `issued_at`.
pub fn root_token_at(issued_at: DateTime<Utc>) -> String {
    test_codec()
        .seal(
            &CredentialRecord::new(HOST, ROOT_USER, ROOT_PASSWORD),
            issued_at,
        )
        .unwrap()
}

pub fn root_token() -> String {
    root_token_at(Utc::now())
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}

/// Sends one request and returns the status with the parsed JSON body.
pub async fn send(
    app: Router,
    method: &str,
    uri: &str,
    token: Option<&str>,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("Authorization", bearer(token));
    }
    let request = match body {
        Some(json) => builder
            .header("Content-Type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
