//! AES-256-GCM token envelope.
//!
//! Tokens use the JWE compact serialization with direct key agreement
//! (`alg: dir`) and AES-256-GCM content encryption (`enc: A256GCM`):
//!
//! ```text
//! BASE64URL(header) . (empty key) . BASE64URL(iv) . BASE64URL(ciphertext) . BASE64URL(tag)
//! ```
//!
//! The encoded header is bound to the ciphertext as additional authenticated data.
//! The key must be 32 bytes (256 bits) and is provided from an environment variable.

use aes_gcm::{
    aead::{Aead, AeadCore, KeyInit, OsRng, Payload},
    Aes256Gcm, Key, Nonce,
};
use base64::{
    engine::general_purpose::{STANDARD as BASE64, URL_SAFE_NO_PAD as BASE64URL},
    Engine,
};
use serde::Deserialize;
use std::fmt;
use thiserror::Error;

/// Size of the encryption key in bytes (256 bits)
const KEY_SIZE: usize = 32;

/// Size of the nonce in bytes (96 bits, standard for GCM)
const NONCE_SIZE: usize = 12;

/// Size of the GCM authentication tag in bytes
const TAG_SIZE: usize = 16;

const ALG_DIR: &str = "dir";
const ENC_A256GCM: &str = "A256GCM";

/// Errors raised while loading the process token key.
#[derive(Debug, Error, PartialEq)]
pub enum KeyError {
    #[error("token secret is not valid base64")]
    Encoding,
    #[error("token secret must be 32 bytes (256 bits), got {0} bytes")]
    Length(usize),
}

/// Errors raised while decoding a token.
///
/// `Invalid` covers every structural, cryptographic and claims failure. Callers
/// that face clients must not distinguish `Expired` from `Invalid`.
#[derive(Debug, Error, PartialEq, Clone, Copy)]
pub enum TokenError {
    #[error("invalid token")]
    Invalid,
    #[error("expired token")]
    Expired,
}

/// Process-wide symmetric key for sealing tokens.
#[derive(Clone)]
pub struct TokenKey([u8; KEY_SIZE]);

impl TokenKey {
    /// Decodes and validates a base64-encoded key.
    ///
    /// Fails unless the decoded key is exactly 32 bytes.
    pub fn from_base64(key_base64: &str) -> Result<Self, KeyError> {
        let key_bytes = BASE64
            .decode(key_base64.trim())
            .map_err(|_| KeyError::Encoding)?;
        Self::from_bytes(&key_bytes)
    }

    pub fn from_bytes(key_bytes: &[u8]) -> Result<Self, KeyError> {
        let key: [u8; KEY_SIZE] = key_bytes
            .try_into()
            .map_err(|_| KeyError::Length(key_bytes.len()))?;
        Ok(Self(key))
    }

    fn cipher(&self) -> Aes256Gcm {
        Aes256Gcm::new(Key::<Aes256Gcm>::from_slice(&self.0))
    }
}

impl fmt::Debug for TokenKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("TokenKey(***)")
    }
}

#[derive(Deserialize)]
struct ProtectedHeader {
    alg: String,
    enc: String,
}

fn encoded_header() -> String {
    BASE64URL.encode(format!(r#"{{"alg":"{}","enc":"{}"}}"#, ALG_DIR, ENC_A256GCM))
}

/// Encrypts `plaintext` into a compact token with a random nonce.
pub fn seal(plaintext: &[u8], key: &TokenKey) -> Result<String, aes_gcm::Error> {
    let header = encoded_header();

    // Generate random nonce (never reuse!)
    let nonce = Aes256Gcm::generate_nonce(&mut OsRng);

    let mut sealed = key.cipher().encrypt(
        &nonce,
        Payload {
            msg: plaintext,
            aad: header.as_bytes(),
        },
    )?;

    // aes-gcm appends the tag to the ciphertext
    let tag = sealed.split_off(sealed.len() - TAG_SIZE);

    Ok(format!(
        "{}..{}.{}.{}",
        header,
        BASE64URL.encode(nonce),
        BASE64URL.encode(&sealed),
        BASE64URL.encode(tag)
    ))
}

/// Decrypts and authenticates a compact token, returning the plaintext.
///
/// Every failure collapses to [`TokenError::Invalid`].
pub fn open(token: &str, key: &TokenKey) -> Result<Vec<u8>, TokenError> {
    let parts: Vec<&str> = token.split('.').collect();
    let [header, encrypted_key, iv, ciphertext, tag] = parts.as_slice() else {
        return Err(TokenError::Invalid);
    };

    // Direct encryption carries no wrapped key
    if !encrypted_key.is_empty() {
        return Err(TokenError::Invalid);
    }

    let header_json = decode_segment(header)?;
    let parsed: ProtectedHeader =
        serde_json::from_slice(&header_json).map_err(|_| TokenError::Invalid)?;
    if parsed.alg != ALG_DIR || parsed.enc != ENC_A256GCM {
        return Err(TokenError::Invalid);
    }

    let nonce_bytes = decode_segment(iv)?;
    if nonce_bytes.len() != NONCE_SIZE {
        return Err(TokenError::Invalid);
    }

    let mut sealed = decode_segment(ciphertext)?;
    let tag_bytes = decode_segment(tag)?;
    if tag_bytes.len() != TAG_SIZE {
        return Err(TokenError::Invalid);
    }
    sealed.extend_from_slice(&tag_bytes);

    key.cipher()
        .decrypt(
            Nonce::from_slice(&nonce_bytes),
            Payload {
                msg: &sealed,
                aad: header.as_bytes(),
            },
        )
        .map_err(|_| TokenError::Invalid)
}

fn decode_segment(segment: &str) -> Result<Vec<u8>, TokenError> {
    BASE64URL.decode(segment).map_err(|_| TokenError::Invalid)
}
