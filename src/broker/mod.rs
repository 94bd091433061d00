//! Connection broker.
//!
//! Opens a connection for one decoded [`CredentialRecord`], lends it to a single
//! administrative operation and releases it on every exit path. Connections are
//! never pooled across requests: each request may carry different credentials.

use crate::admin::{DatabaseInfo, NewUser, RoleGrant, UserInfo};
use crate::credentials::CredentialRecord;
use async_trait::async_trait;
use futures::future::BoxFuture;
use thiserror::Error;

pub mod mongo;

pub use mongo::MongoConnector;

/// Failure to establish a connection.
///
/// Details may include server topology; log them, never return them to clients.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConnectError {
    /// Hostname or credentials cannot form a connection target
    #[error("invalid connection target: {0}")]
    InvalidTarget(String),
    /// The server rejected the credentials
    #[error("authentication rejected: {0}")]
    Rejected(String),
    /// Network error, timeout or no reachable server
    #[error("server unavailable: {0}")]
    Unavailable(String),
}

/// Failure of an administrative command on an open connection.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CommandError {
    /// The resource already exists
    #[error("already exists")]
    Conflict,
    #[error("command failed: {0}")]
    Failed(String),
}

/// Capability to open authenticated sessions against a database server.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connects with `record` and confirms the server accepted the credentials.
    async fn connect(
        &self,
        record: &CredentialRecord,
    ) -> Result<Box<dyn AdminSession>, ConnectError>;
}

/// An open connection able to run administrative commands.
///
/// Users are managed in the administrative database.
#[async_trait]
pub trait AdminSession: Send + Sync {
    async fn list_databases(&self) -> Result<Vec<DatabaseInfo>, CommandError>;

    async fn create_database(&self, name: &str) -> Result<(), CommandError>;

    async fn list_users(&self) -> Result<Vec<UserInfo>, CommandError>;

    async fn find_user(&self, username: &str) -> Result<Option<UserInfo>, CommandError>;

    /// Returns [`CommandError::Conflict`] if the username is taken.
    async fn create_user(&self, user: &NewUser) -> Result<(), CommandError>;

    async fn update_password(&self, username: &str, password: &str) -> Result<(), CommandError>;

    async fn update_roles(&self, username: &str, roles: &[RoleGrant]) -> Result<(), CommandError>;

    async fn drop_user(&self, username: &str) -> Result<(), CommandError>;

    /// Releases the connection.
    async fn close(self: Box<Self>);
}

/// Runs `operation` on a fresh connection for `record`.
///
/// The connection is closed after `operation` completes, whether it returned
/// `Ok` or `Err`. A connect failure is converted into `E` and `operation` is
/// never called.
///
/// # Example
/// ```no_run
/// # use dbpanel::broker::{with_connection, CommandError, ConnectError, Connector};
/// # use dbpanel::credentials::CredentialRecord;
/// # #[derive(Debug)]
/// # enum MyError { Connect(ConnectError), Command(CommandError) }
/// # impl From<ConnectError> for MyError { fn from(e: ConnectError) -> Self { MyError::Connect(e) } }
/// # impl From<CommandError> for MyError { fn from(e: CommandError) -> Self { MyError::Command(e) } }
/// # async fn run(connector: &dyn Connector, record: &CredentialRecord) -> Result<(), MyError> {
/// let names: Vec<String> = with_connection(connector, record, |session| {
///     Box::pin(async move {
///         let dbs = session.list_databases().await?;
///         Ok::<_, MyError>(dbs.into_iter().map(|db| db.name).collect())
///     })
/// })
/// .await?;
/// # Ok(())
/// # }
/// ```
pub async fn with_connection<T, E, F>(
    connector: &dyn Connector,
    record: &CredentialRecord,
    operation: F,
) -> Result<T, E>
where
    E: From<ConnectError>,
    F: for<'s> FnOnce(&'s dyn AdminSession) -> BoxFuture<'s, Result<T, E>>,
{
    let session = connector.connect(record).await?;
    let result = operation(session.as_ref()).await;
    session.close().await;
    result
}
