//! Calorie API - Food Collection Query Handler
//!
//! REST handler for the food item collection. Reads and writes go to
//! PostgreSQL when it is reachable; otherwise reads are answered from the
//! fixed fallback catalog and tagged `source: "fallback"`.

pub mod config;
pub mod credentials;
pub mod db;
pub mod error;
pub mod middleware;
pub mod routes;
pub mod state;
pub mod telemetry;

// Re-export commonly used types
pub use config::{ApiConfig, StoreBackend};
pub use credentials::{CredentialError, CredentialResolver, CredentialSource, DbCredentials};
pub use db::{DbConfig, PgConnector, PgFoodStore};
pub use error::{ApiError, ApiResult, ErrorCode};
pub use middleware::build_cors_layer;
pub use routes::create_api_router;
pub use state::AppState;
pub use telemetry::{init_tracing, LogFormat};
