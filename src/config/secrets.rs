use crate::credentials::TokenKey;
use anyhow::{anyhow, Context, Result};
use std::fmt;

/// Environment variable holding the base64-encoded 32-byte token key.
pub const TOKEN_SECRET_VAR: &str = "DBPANEL_TOKEN_SECRET";

/// Older deployments name the token key `JWT_SECRET`.
pub const LEGACY_TOKEN_SECRET_VAR: &str = "JWT_SECRET";

pub const DEFAULT_USER_PASSWORD_VAR: &str = "DEFAULT_USER_PASSWORD";

const FALLBACK_USER_PASSWORD: &str = "password123";

/// Process-wide secrets. Loaded once at startup, read-only afterwards.
#[derive(Clone)]
pub struct Secrets {
    pub token_key: TokenKey,
    /// Password given to new users when a create-user request omits one
    pub default_user_password: String,
}

impl Secrets {
    /// Build from env vars. Fails if the token key is absent or malformed.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let secret = lookup(TOKEN_SECRET_VAR)
            .or_else(|| lookup(LEGACY_TOKEN_SECRET_VAR))
            .filter(|s| !s.trim().is_empty())
            .ok_or_else(|| {
                anyhow!(
                    "{} is required (base64-encoded 32-byte key)",
                    TOKEN_SECRET_VAR
                )
            })?;

        let token_key = TokenKey::from_base64(&secret)
            .with_context(|| format!("Invalid {}", TOKEN_SECRET_VAR))?;

        let default_user_password = lookup(DEFAULT_USER_PASSWORD_VAR)
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| FALLBACK_USER_PASSWORD.to_string());

        Ok(Self {
            token_key,
            default_user_password,
        })
    }
}

impl fmt::Debug for Secrets {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Secrets")
            .field("token_key", &self.token_key)
            .field("default_user_password", &"***")
            .finish()
    }
}
