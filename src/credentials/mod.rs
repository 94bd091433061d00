//! Stateless encrypted credentials for database sessions.
//!
//! The panel never stores operator credentials server-side. At login the
//! credentials are probed against the database server and then sealed into a
//! self-contained, time-limited token that the client presents on every request.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │       CredentialCodec                    │
//! │  - issue: probe, then seal               │
//! │  - decode: open, then check expiry       │
//! └─────────────────────────────────────────┘
//!          ↓                    ↑
//!      (seal)               (open)
//!          ↓                    ↑
//! ┌─────────────────────────────────────────┐
//! │       Encryption Module                  │
//! │  - JWE compact, dir + A256GCM            │
//! │  - Unique nonce per token                │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Usage
//!
//! ```no_run
//! use dbpanel::credentials::{CredentialCodec, CredentialRecord, TokenKey};
//! use chrono::Utc;
//!
//! # fn main() -> anyhow::Result<()> {
//! let key = TokenKey::from_base64(&std::env::var("DBPANEL_TOKEN_SECRET")?)?;
//! let codec = CredentialCodec::new(key);
//!
//! let record = CredentialRecord::new("db.example.com", "admin", "secret123");
//! let token = codec.seal(&record, Utc::now())?;
//!
//! let decoded = codec.decode(&token)?;
//! assert_eq!(decoded, record);
//! # Ok(())
//! # }
//! ```
//!
//! # Security
//!
//! - Tokens are encrypted and authenticated with AES-256-GCM (tampering detected)
//! - Each token has a unique nonce (never reused)
//! - Key must be 32 bytes (256 bits), validated once at startup
//! - Tokens expire one hour after issue; expiry is enforced at decode time
//! - There is no revocation list: a token stays valid until it expires

use serde::{Deserialize, Serialize};
use std::fmt;

mod codec;
mod encryption;

pub use codec::{CredentialCodec, IssueError, TOKEN_TTL_SECS};
pub use encryption::{KeyError, TokenError, TokenKey};

/// Connection parameters for one database server.
///
/// Exists only in memory and inside an encrypted token. Never persisted and
/// never logged with its password (see the `Debug` impl).
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CredentialRecord {
    /// Server address, optionally with port (`db.example.com:27017`)
    pub hostname: String,

    pub username: String,

    pub password: String,

    /// Default database for the connection, if the operator chose one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database: Option<String>,
}

impl CredentialRecord {
    pub fn new(
        hostname: impl Into<String>,
        username: impl Into<String>,
        password: impl Into<String>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            password: password.into(),
            database: None,
        }
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    /// True when hostname, username and password are all non-empty.
    ///
    /// Tokens are only ever issued for complete records.
    pub fn is_complete(&self) -> bool {
        !self.hostname.is_empty() && !self.username.is_empty() && !self.password.is_empty()
    }
}

impl fmt::Debug for CredentialRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CredentialRecord")
            .field("hostname", &self.hostname)
            .field("username", &self.username)
            .field("password", &"***")
            .field("database", &self.database)
            .finish()
    }
}
