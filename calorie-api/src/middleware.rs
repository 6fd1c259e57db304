//! Response middleware.
//!
//! - CORS: `CorsLayer` answers preflight `OPTIONS` requests before routing
//!   and sets allow-origin and `Vary`. Allow-headers, allow-methods and the
//!   JSON content type are added to every other response as well, including
//!   errors and caught panics.
//! - Panics: converted to the generic 500 envelope.

use std::any::Any;

use axum::{
    http::{header, HeaderValue, Method},
    response::{IntoResponse, Response},
};
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::config::ApiConfig;
use crate::error::ApiError;

pub const ALLOW_HEADERS: &str = "Content-Type, Authorization";
pub const ALLOW_METHODS: &str = "GET, POST, PUT, OPTIONS";

// ============================================================================
// CORS
// ============================================================================

/// Build the CORS layer from ApiConfig.
///
/// No configured origins (or a `*` entry) allows every origin. Otherwise a
/// listed request origin is echoed back and any other gets no allow-origin.
pub fn build_cors_layer(config: &ApiConfig) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PUT, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION]);

    if config.cors_origins.is_empty() || config.cors_origins.iter().any(|o| o == "*") {
        tracing::info!("CORS: allowing all origins");
        return cors.allow_origin(AllowOrigin::any());
    }

    tracing::info!(origins = ?config.cors_origins, "CORS: allowing configured origins");
    let origins: Vec<HeaderValue> = config
        .cors_origins
        .iter()
        .filter_map(|o| o.parse().ok())
        .collect();
    cors.allow_origin(origins)
}

/// Allow-headers on responses the CORS layer leaves alone.
pub fn allow_headers_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(
        header::ACCESS_CONTROL_ALLOW_HEADERS,
        HeaderValue::from_static(ALLOW_HEADERS),
    )
}

/// Allow-methods on responses the CORS layer leaves alone.
pub fn allow_methods_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(
        header::ACCESS_CONTROL_ALLOW_METHODS,
        HeaderValue::from_static(ALLOW_METHODS),
    )
}

/// `application/json` unless the response already declares a type.
pub fn json_content_type_layer() -> SetResponseHeaderLayer<HeaderValue> {
    SetResponseHeaderLayer::if_not_present(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/json"),
    )
}

// ============================================================================
// PANICS
// ============================================================================

/// `CatchPanicLayer` handler producing the generic 500 envelope.
pub fn panic_response(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = if let Some(s) = err.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = err.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    };
    tracing::error!(panic = %detail, "Handler panicked");
    ApiError::internal().into_response()
}
