//! MongoDB implementation of the broker capabilities.

use super::{AdminSession, CommandError, ConnectError, Connector};
use crate::admin::{DatabaseInfo, NewUser, RoleGrant, UserInfo, ADMIN_DATABASE};
use crate::config::DatabaseConfig;
use crate::credentials::CredentialRecord;
use async_trait::async_trait;
use mongodb::{
    bson::{doc, Bson, Document},
    error::{Error as MongoError, ErrorKind},
    options::ClientOptions,
    Client, Database,
};
use std::time::Duration;
use tracing::debug;

/// Collection created to materialize a new database
const INITIAL_COLLECTION: &str = "initialCollection";

/// Server error codes for an existing user
const USER_ALREADY_EXISTS: i32 = 51003;
const DUPLICATE_KEY: i32 = 11000;

/// Server error code for rejected credentials
const AUTHENTICATION_FAILED: i32 = 18;

/// Opens MongoDB clients from credential records.
#[derive(Debug, Clone)]
pub struct MongoConnector {
    config: DatabaseConfig,
}

impl MongoConnector {
    pub fn new(config: DatabaseConfig) -> Self {
        Self { config }
    }
}

/// Builds the connection URI for `record`.
///
/// Username and password are percent-encoded so that reserved characters
/// (`@ : / ? # %` ...) cannot break the URI. The hostname is inserted as-is and
/// must therefore not contain URI delimiters.
pub fn connection_uri(record: &CredentialRecord, auth_source: &str) -> Result<String, ConnectError> {
    if record.hostname.is_empty() || record.hostname.contains(&['/', '@', '?', '#', ' '][..]) {
        return Err(ConnectError::InvalidTarget(
            "hostname must be host[:port][,host[:port]...]".to_string(),
        ));
    }

    Ok(format!(
        "mongodb://{}:{}@{}/?authSource={}",
        urlencoding::encode(&record.username),
        urlencoding::encode(&record.password),
        record.hostname,
        urlencoding::encode(auth_source)
    ))
}

#[async_trait]
impl Connector for MongoConnector {
    async fn connect(
        &self,
        record: &CredentialRecord,
    ) -> Result<Box<dyn AdminSession>, ConnectError> {
        let uri = connection_uri(record, &self.config.auth_source)?;

        let mut options = ClientOptions::parse(&uri)
            .await
            .map_err(|e| ConnectError::InvalidTarget(e.to_string()))?;
        options.connect_timeout = Some(Duration::from_secs(self.config.connect_timeout_secs));
        options.server_selection_timeout =
            Some(Duration::from_secs(self.config.server_selection_timeout_secs));
        options.app_name = Some(self.config.app_name.clone());
        options.default_database = record.database.clone();

        let client =
            Client::with_options(options).map_err(|e| ConnectError::InvalidTarget(e.to_string()))?;

        // The driver connects lazily; ping forces the handshake and authentication
        if let Err(e) = client.database(ADMIN_DATABASE).run_command(doc! { "ping": 1 }).await {
            client.shutdown().await;
            return Err(connect_error(e));
        }

        debug!(hostname = %record.hostname, username = %record.username, "MongoDB connection established");

        Ok(Box::new(MongoSession { client }))
    }
}

fn connect_error(e: MongoError) -> ConnectError {
    match *e.kind {
        ErrorKind::Authentication { ref message, .. } => ConnectError::Rejected(message.clone()),
        ErrorKind::Command(ref c) if c.code == AUTHENTICATION_FAILED => {
            ConnectError::Rejected(c.message.clone())
        }
        ErrorKind::InvalidArgument { ref message, .. } => {
            ConnectError::InvalidTarget(message.clone())
        }
        _ => ConnectError::Unavailable(e.to_string()),
    }
}

fn command_error(e: MongoError) -> CommandError {
    match *e.kind {
        ErrorKind::Command(ref c) if c.code == USER_ALREADY_EXISTS || c.code == DUPLICATE_KEY => {
            CommandError::Conflict
        }
        _ => CommandError::Failed(e.to_string()),
    }
}

fn roles_bson(roles: &[RoleGrant]) -> Vec<Document> {
    roles
        .iter()
        .map(|r| doc! { "role": r.role.as_str(), "db": r.db.as_str() })
        .collect()
}

/// Parses the `users` array of a `usersInfo` reply.
fn parse_users(reply: &Document) -> Result<Vec<UserInfo>, CommandError> {
    let users = reply
        .get_array("users")
        .map_err(|e| CommandError::Failed(format!("malformed usersInfo reply: {}", e)))?;

    users
        .iter()
        .filter_map(|entry| match entry {
            Bson::Document(d) => Some(d.clone()),
            _ => None,
        })
        .map(|d| {
            mongodb::bson::from_document::<UserInfo>(d)
                .map_err(|e| CommandError::Failed(format!("malformed user document: {}", e)))
        })
        .collect()
}

/// One authenticated MongoDB client.
struct MongoSession {
    client: Client,
}

impl MongoSession {
    fn admin_db(&self) -> Database {
        self.client.database(ADMIN_DATABASE)
    }

    async fn run_admin(&self, command: Document) -> Result<Document, CommandError> {
        self.admin_db().run_command(command).await.map_err(command_error)
    }
}

#[async_trait]
impl AdminSession for MongoSession {
    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>, CommandError> {
        let specs = self.client.list_databases().await.map_err(command_error)?;
        Ok(specs
            .into_iter()
            .map(|spec| DatabaseInfo {
                name: spec.name,
                size_on_disk: spec.size_on_disk,
                empty: spec.empty,
            })
            .collect())
    }

    async fn create_database(&self, name: &str) -> Result<(), CommandError> {
        self.client
            .database(name)
            .create_collection(INITIAL_COLLECTION)
            .await
            .map_err(command_error)
    }

    async fn list_users(&self) -> Result<Vec<UserInfo>, CommandError> {
        let reply = self.run_admin(doc! { "usersInfo": { "forAllDBs": true } }).await?;
        parse_users(&reply)
    }

    async fn find_user(&self, username: &str) -> Result<Option<UserInfo>, CommandError> {
        let reply = self
            .run_admin(doc! { "usersInfo": { "user": username, "db": ADMIN_DATABASE } })
            .await?;
        Ok(parse_users(&reply)?.into_iter().next())
    }

    async fn create_user(&self, user: &NewUser) -> Result<(), CommandError> {
        self.run_admin(doc! {
            "createUser": user.username.as_str(),
            "pwd": user.password.as_str(),
            "roles": roles_bson(&user.roles),
        })
        .await
        .map(|_| ())
    }

    async fn update_password(&self, username: &str, password: &str) -> Result<(), CommandError> {
        self.run_admin(doc! { "updateUser": username, "pwd": password })
            .await
            .map(|_| ())
    }

    async fn update_roles(&self, username: &str, roles: &[RoleGrant]) -> Result<(), CommandError> {
        self.run_admin(doc! { "updateUser": username, "roles": roles_bson(roles) })
            .await
            .map(|_| ())
    }

    async fn drop_user(&self, username: &str) -> Result<(), CommandError> {
        self.run_admin(doc! { "dropUser": username }).await.map(|_| ())
    }

    async fn close(self: Box<Self>) {
        self.client.shutdown().await;
    }
}
