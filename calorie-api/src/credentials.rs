//! Database credential resolution.
//!
//! Credentials come either straight from the `CALORIE_DB_*` environment
//! variables or from a managed-secret JSON document on disk:
//!
//! ```json
//! { "host": "db.internal", "port": 5432, "dbname": "calories",
//!   "username": "app", "password": "..." }
//! ```
//!
//! Fields missing from the document keep their environment values.
//! A successful resolution is cached for the life of the process; a failed
//! one is retried on the next connection attempt.

use serde::Deserialize;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;
use tokio::sync::OnceCell;

use crate::db::DbConfig;

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("failed to read secret file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse secret file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("missing credential field: {field}")]
    Missing { field: &'static str },
}

/// Where credentials are read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialSource {
    /// Use the values already present in [`DbConfig`].
    Env,
    /// Overlay a managed-secret JSON document.
    SecretFile(PathBuf),
}

impl CredentialSource {
    pub fn for_config(config: &DbConfig) -> Self {
        match &config.secret_file {
            Some(path) => CredentialSource::SecretFile(path.clone()),
            None => CredentialSource::Env,
        }
    }
}

/// Fully resolved connection parameters.
#[derive(Clone, PartialEq, Eq)]
pub struct DbCredentials {
    pub host: String,
    pub port: u16,
    pub dbname: String,
    pub user: String,
    pub password: String,
}

impl fmt::Debug for DbCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbCredentials")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("dbname", &self.dbname)
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct SecretDocument {
    host: Option<String>,
    port: Option<PortField>,
    dbname: Option<String>,
    username: Option<String>,
    password: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortField {
    Number(u16),
    Text(String),
}

impl PortField {
    fn value(&self) -> Option<u16> {
        match self {
            PortField::Number(n) => Some(*n),
            PortField::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Parse a secret document and overlay it on `base`.
pub fn parse_secret(
    path: &std::path::Path,
    raw: &str,
    base: &DbConfig,
) -> Result<DbCredentials, CredentialError> {
    let doc: SecretDocument =
        serde_json::from_str(raw).map_err(|source| CredentialError::Parse {
            path: path.to_path_buf(),
            source,
        })?;

    let credentials = DbCredentials {
        host: doc.host.unwrap_or_else(|| base.host.clone()),
        port: doc.port.and_then(|p| p.value()).unwrap_or(base.port),
        dbname: doc.dbname.unwrap_or_else(|| base.dbname.clone()),
        user: doc.username.unwrap_or_else(|| base.user.clone()),
        password: doc.password.or_else(|| base.password.clone()).unwrap_or_default(),
    };
    check(credentials)
}

fn from_env(base: &DbConfig) -> Result<DbCredentials, CredentialError> {
    check(DbCredentials {
        host: base.host.clone(),
        port: base.port,
        dbname: base.dbname.clone(),
        user: base.user.clone(),
        password: base.password.clone().unwrap_or_default(),
    })
}

fn check(credentials: DbCredentials) -> Result<DbCredentials, CredentialError> {
    if credentials.host.trim().is_empty() {
        return Err(CredentialError::Missing { field: "host" });
    }
    if credentials.user.trim().is_empty() {
        return Err(CredentialError::Missing { field: "username" });
    }
    Ok(credentials)
}

/// Resolves credentials once and hands out the cached value afterwards.
#[derive(Debug)]
pub struct CredentialResolver {
    source: CredentialSource,
    base: DbConfig,
    cached: OnceCell<DbCredentials>,
}

impl CredentialResolver {
    pub fn new(base: DbConfig) -> Self {
        Self {
            source: CredentialSource::for_config(&base),
            base,
            cached: OnceCell::new(),
        }
    }

    pub fn source(&self) -> &CredentialSource {
        &self.source
    }

    pub async fn resolve(&self) -> Result<&DbCredentials, CredentialError> {
        self.cached
            .get_or_try_init(|| async {
                match &self.source {
                    CredentialSource::Env => from_env(&self.base),
                    CredentialSource::SecretFile(path) => {
                        let raw = tokio::fs::read_to_string(path).await.map_err(|source| {
                            CredentialError::Io {
                                path: path.clone(),
                                source,
                            }
                        })?;
                        tracing::debug!(path = %path.display(), "Loaded database secret");
                        parse_secret(path, &raw, &self.base)
                    }
                }
            })
            .await
    }
}
