use super::encryption::{self, TokenError, TokenKey};
use super::CredentialRecord;
use crate::broker::{ConnectError, Connector};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Lifetime of an issued token in seconds (1 hour).
pub const TOKEN_TTL_SECS: i64 = 60 * 60;

/// Errors raised while issuing a token.
#[derive(Debug, Error)]
pub enum IssueError {
    #[error("hostname, username and password are required")]
    Incomplete,
    #[error("invalid or unreachable credentials")]
    Rejected(#[source] ConnectError),
    #[error("failed to seal token")]
    Seal,
}

/// Plaintext carried inside a token.
#[derive(Serialize, Deserialize)]
struct TokenClaims {
    #[serde(flatten)]
    record: CredentialRecord,
    /// Issued-at, Unix seconds
    iat: i64,
    /// Expiry, Unix seconds
    exp: i64,
}

/// Issues and decodes credential tokens under one process-wide key.
///
/// Holds no per-request state: decoding is a pure function of the token,
/// the key and the current time, so the codec is shared freely across tasks.
#[derive(Debug, Clone)]
pub struct CredentialCodec {
    key: TokenKey,
}

impl CredentialCodec {
    pub fn new(key: TokenKey) -> Self {
        Self { key }
    }

    /// Probes `record` against the database server and, if the connection
    /// succeeds, seals it into a token.
    ///
    /// The probe connection is released before the token is produced. No token
    /// is issued for incomplete or rejected credentials.
    pub async fn issue(
        &self,
        record: &CredentialRecord,
        connector: &dyn Connector,
    ) -> Result<String, IssueError> {
        if !record.is_complete() {
            return Err(IssueError::Incomplete);
        }

        let session = connector
            .connect(record)
            .await
            .map_err(IssueError::Rejected)?;
        session.close().await;

        debug!(hostname = %record.hostname, username = %record.username, "Credential probe succeeded");

        self.seal(record, Utc::now())
    }

    /// Seals `record` into a token issued at `issued_at`, without probing.
    pub fn seal(
        &self,
        record: &CredentialRecord,
        issued_at: DateTime<Utc>,
    ) -> Result<String, IssueError> {
        let iat = issued_at.timestamp();
        let claims = TokenClaims {
            record: record.clone(),
            iat,
            exp: iat + TOKEN_TTL_SECS,
        };

        let plaintext = serde_json::to_vec(&claims).map_err(|_| IssueError::Seal)?;
        encryption::seal(&plaintext, &self.key).map_err(|_| IssueError::Seal)
    }

    /// Decodes a token against the current time.
    pub fn decode(&self, token: &str) -> Result<CredentialRecord, TokenError> {
        self.decode_at(token, Utc::now())
    }

    /// Decodes a token as of `now`.
    ///
    /// A token is expired once `now` reaches its `exp` claim.
    pub fn decode_at(
        &self,
        token: &str,
        now: DateTime<Utc>,
    ) -> Result<CredentialRecord, TokenError> {
        let plaintext = encryption::open(token, &self.key)?;
        let claims: TokenClaims =
            serde_json::from_slice(&plaintext).map_err(|_| TokenError::Invalid)?;

        if now.timestamp() >= claims.exp {
            return Err(TokenError::Expired);
        }

        if !claims.record.is_complete() {
            return Err(TokenError::Invalid);
        }

        Ok(claims.record)
    }
}
