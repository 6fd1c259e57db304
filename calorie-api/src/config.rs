//! API Configuration Module
//!
//! Server settings loaded from environment variables with defaults suitable
//! for local development. Database settings live in [`crate::db::DbConfig`].

use std::net::SocketAddr;

use crate::telemetry::LogFormat;

/// Route prefix used when `CALORIE_ROUTE_PREFIX` is unset or empty.
pub const DEFAULT_ROUTE_PREFIX: &str = "/foods";

/// Port used when neither `PORT` nor `CALORIE_API_PORT` is set.
pub const DEFAULT_PORT: u16 = 3000;

// ============================================================================
// STORE BACKEND
// ============================================================================

/// Which store the handler talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// PostgreSQL via `deadpool-postgres`.
    Postgres,
    /// Process-local store seeded with the fallback catalog.
    Memory,
}

impl StoreBackend {
    fn parse(value: &str) -> Option<Self> {
        match value.trim().to_lowercase().as_str() {
            "postgres" | "postgresql" | "pg" => Some(StoreBackend::Postgres),
            "memory" | "mem" => Some(StoreBackend::Memory),
            _ => None,
        }
    }
}

// ============================================================================
// API CONFIGURATION
// ============================================================================

#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// Interface to bind.
    pub bind_host: String,

    pub port: u16,

    /// Mount point of the food routes, normalized to `/segment` form.
    pub route_prefix: String,

    /// Allowed CORS origins (comma-separated in env var).
    /// Empty means every origin is allowed and `*` is sent.
    pub cors_origins: Vec<String>,

    pub store_backend: StoreBackend,

    pub log_format: LogFormat,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            bind_host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            route_prefix: DEFAULT_ROUTE_PREFIX.to_string(),
            cors_origins: Vec::new(),
            store_backend: StoreBackend::Postgres,
            log_format: LogFormat::Pretty,
        }
    }
}

impl ApiConfig {
    /// Create ApiConfig from environment variables.
    ///
    /// Environment variables:
    /// - `CALORIE_API_BIND`: interface to bind (default: 0.0.0.0)
    /// - `PORT` or `CALORIE_API_PORT`: port (default: 3000)
    /// - `CALORIE_ROUTE_PREFIX`: food routes mount point (default: /foods)
    /// - `CALORIE_CORS_ORIGINS`: comma-separated allowed origins (empty = allow all)
    /// - `CALORIE_STORE`: "postgres" or "memory" (default: postgres)
    /// - `CALORIE_LOG_FORMAT`: "pretty" or "json" (default: pretty)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();

        let bind_host = lookup("CALORIE_API_BIND")
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .unwrap_or(defaults.bind_host);

        let port = lookup("PORT")
            .or_else(|| lookup("CALORIE_API_PORT"))
            .and_then(|s| s.trim().parse().ok())
            .unwrap_or(defaults.port);

        let route_prefix = lookup("CALORIE_ROUTE_PREFIX")
            .map(|s| normalize_prefix(&s))
            .unwrap_or(defaults.route_prefix);

        let cors_origins = lookup("CALORIE_CORS_ORIGINS")
            .map(|s| {
                s.split(',')
                    .map(|o| o.trim().to_string())
                    .filter(|o| !o.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let store_backend = lookup("CALORIE_STORE")
            .and_then(|s| StoreBackend::parse(&s))
            .unwrap_or(defaults.store_backend);

        let log_format = lookup("CALORIE_LOG_FORMAT")
            .and_then(|s| LogFormat::parse(&s))
            .unwrap_or(defaults.log_format);

        Self {
            bind_host,
            port,
            route_prefix,
            cors_origins,
            store_backend,
            log_format,
        }
    }

    /// Socket address to bind, or `None` if the host does not parse.
    pub fn bind_addr(&self) -> Option<SocketAddr> {
        format!("{}:{}", self.bind_host, self.port).parse().ok()
    }
}

/// `foods`, `/foods/` and `/foods` all become `/foods`. A prefix with no
/// path segment falls back to the default, since routes cannot mount at root.
pub fn normalize_prefix(raw: &str) -> String {
    let trimmed = raw.trim().trim_matches('/');
    if trimmed.is_empty() {
        DEFAULT_ROUTE_PREFIX.to_string()
    } else {
        format!("/{}", trimmed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ApiConfig::from_lookup(|_| None);
        assert_eq!(config.bind_host, "0.0.0.0");
        assert_eq!(config.port, 3000);
        assert_eq!(config.route_prefix, "/foods");
        assert!(config.cors_origins.is_empty());
        assert_eq!(config.store_backend, StoreBackend::Postgres);
        assert_eq!(config.log_format, LogFormat::Pretty);
    }

    #[test]
    fn test_port_prefers_platform_variable() {
        let config = ApiConfig::from_lookup(lookup_from(&[
            ("PORT", "8080"),
            ("CALORIE_API_PORT", "9090"),
        ]));
        assert_eq!(config.port, 8080);

        let config = ApiConfig::from_lookup(lookup_from(&[("CALORIE_API_PORT", "9090")]));
        assert_eq!(config.port, 9090);

        let config = ApiConfig::from_lookup(lookup_from(&[("PORT", "not-a-port")]));
        assert_eq!(config.port, DEFAULT_PORT);
    }

    #[test]
    fn test_env_overrides() {
        let config = ApiConfig::from_lookup(lookup_from(&[
            ("CALORIE_API_BIND", "127.0.0.1"),
            ("CALORIE_ROUTE_PREFIX", "api/foods/"),
            ("CALORIE_CORS_ORIGINS", "https://a.example, https://b.example,"),
            ("CALORIE_STORE", "Memory"),
            ("CALORIE_LOG_FORMAT", "json"),
        ]));
        assert_eq!(config.route_prefix, "/api/foods");
        assert_eq!(config.cors_origins.len(), 2);
        assert_eq!(config.store_backend, StoreBackend::Memory);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(
            config.bind_addr(),
            Some(SocketAddr::from(([127, 0, 0, 1], 3000)))
        );
    }

    #[test]
    fn test_normalize_prefix() {
        assert_eq!(normalize_prefix("foods"), "/foods");
        assert_eq!(normalize_prefix("/foods/"), "/foods");
        assert_eq!(normalize_prefix("/"), "/foods");
        assert_eq!(normalize_prefix("  "), "/foods");
    }
}
