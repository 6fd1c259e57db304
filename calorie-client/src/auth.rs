//! Bearer token sources.
//!
//! The token is an opaque capability string issued by the identity
//! provider. It is forwarded as-is and never decoded.

use async_trait::async_trait;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TokenError {
    #[error("environment variable {0} is not set")]
    MissingEnv(String),

    #[error("failed to read token file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Supplies the session token for each request.
///
/// `Ok(None)` means there is no session; the request goes out without an
/// `Authorization` header.
#[async_trait]
pub trait TokenProvider: Send + Sync {
    async fn token(&self) -> Result<Option<String>, TokenError>;
}

/// No session at all.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoToken;

#[async_trait]
impl TokenProvider for NoToken {
    async fn token(&self) -> Result<Option<String>, TokenError> {
        Ok(None)
    }
}

/// A fixed token.
#[derive(Clone)]
pub struct StaticToken(String);

impl StaticToken {
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }
}

impl fmt::Debug for StaticToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("StaticToken(<redacted>)")
    }
}

#[async_trait]
impl TokenProvider for StaticToken {
    async fn token(&self) -> Result<Option<String>, TokenError> {
        Ok(non_empty(&self.0))
    }
}

/// Reads the token from an environment variable on every call.
#[derive(Debug, Clone)]
pub struct EnvToken {
    var: String,
}

impl EnvToken {
    pub fn new(var: impl Into<String>) -> Self {
        Self { var: var.into() }
    }
}

#[async_trait]
impl TokenProvider for EnvToken {
    async fn token(&self) -> Result<Option<String>, TokenError> {
        match std::env::var(&self.var) {
            Ok(value) => Ok(non_empty(&value)),
            Err(_) => Err(TokenError::MissingEnv(self.var.clone())),
        }
    }
}

/// Reads the token from a file on every call, so a session refreshed by
/// another process is picked up without restarting.
#[derive(Debug, Clone)]
pub struct FileToken {
    path: PathBuf,
}

impl FileToken {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl TokenProvider for FileToken {
    async fn token(&self) -> Result<Option<String>, TokenError> {
        let contents = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| TokenError::Io {
                path: self.path.clone(),
                source,
            })?;
        Ok(non_empty(&contents))
    }
}

fn non_empty(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}
