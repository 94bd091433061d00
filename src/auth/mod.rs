use crate::credentials::{CredentialCodec, CredentialRecord, TokenError};
use axum::http::{header::AUTHORIZATION, HeaderMap};
use thiserror::Error;

#[cfg(test)]
mod tests;

/// Extract bearer token from HTTP Authorization header
///
/// Expected format: "Authorization: Bearer <token>"
/// Returns the token string if present and valid.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<String, BearerError> {
    // Get Authorization header
    let auth_header = headers
        .get(AUTHORIZATION)
        .ok_or(BearerError::Missing)?
        .to_str()
        .map_err(|_| BearerError::InvalidFormat)?;

    // Parse "Bearer <token>" format
    parse_bearer_token(auth_header)
}

/// Parse bearer token from Authorization header value
///
/// Internal helper for extract_bearer_token
fn parse_bearer_token(header_value: &str) -> Result<String, BearerError> {
    // Expect "Bearer <token>"
    let Some((scheme, token)) = header_value.split_once(' ') else {
        return Err(BearerError::InvalidFormat);
    };

    if !scheme.eq_ignore_ascii_case("bearer") {
        return Err(BearerError::InvalidFormat);
    }

    let token = token.trim();
    if token.is_empty() {
        return Err(BearerError::Empty);
    }

    Ok(token.to_string())
}

/// Bearer extraction errors
#[derive(Debug, Error, PartialEq, Clone)]
pub enum BearerError {
    /// Authorization header not present
    #[error("Authorization token not provided")]
    Missing,
    /// Not "Bearer <token>" or not valid header text
    #[error("Invalid authorization token format")]
    InvalidFormat,
    /// Token is empty string
    #[error("Authorization token is empty")]
    Empty,
}

/// Request authentication outcome
///
/// Invalid and expired tokens are one variant on purpose: clients must not
/// learn which check failed.
#[derive(Debug, Error, PartialEq, Clone)]
pub enum AuthError {
    /// No usable bearer token in the request
    #[error("Access token is missing or invalid.")]
    MissingToken,
    /// Token failed decryption, authentication, parsing or expiry
    #[error("Invalid or expired token.")]
    InvalidOrExpired,
}

impl From<BearerError> for AuthError {
    fn from(_: BearerError) -> Self {
        AuthError::MissingToken
    }
}

impl From<TokenError> for AuthError {
    fn from(_: TokenError) -> Self {
        AuthError::InvalidOrExpired
    }
}

/// Authenticate one request
///
/// Extracts the bearer token and decodes it. Every call decodes and checks
/// expiry afresh; nothing is cached between requests.
///
/// # Errors
/// - MissingToken: no Authorization header, or not "Bearer <token>"
/// - InvalidOrExpired: token rejected by the codec for any reason
pub fn authenticate(
    headers: &HeaderMap,
    codec: &CredentialCodec,
) -> Result<CredentialRecord, AuthError> {
    let token = extract_bearer_token(headers)?;
    let record = codec.decode(&token)?;
    Ok(record)
}
