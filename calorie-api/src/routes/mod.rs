//! REST API Routes Module
//!
//! - Food collection routes under the configured prefix
//! - Health check endpoints
//! - Response middleware (CORS on every response, panic conversion)

pub mod foods;
pub mod health;

use std::sync::Arc;

use axum::{routing::get, Router};
use calorie_storage::StoreHandle;
use tower_http::{catch_panic::CatchPanicLayer, cors::CorsLayer, trace::TraceLayer};

use crate::config::ApiConfig;
use crate::middleware::{
    allow_headers_layer, allow_methods_layer, build_cors_layer, json_content_type_layer,
    panic_response,
};
use crate::state::AppState;

pub use foods::route_not_found;
pub use health::create_router as health_router;

/// Food collection routes with their prefix applied.
///
/// Every method router falls back to the route-not-found envelope, so an
/// unsupported method is a 404 like an unknown path.
pub fn foods_router(prefix: &str) -> Router<AppState> {
    Router::new()
        .route(
            prefix,
            get(foods::list_foods)
                .post(foods::create_food)
                .fallback(route_not_found),
        )
        .route(
            &format!("{}/search", prefix),
            get(foods::search_foods).fallback(route_not_found),
        )
        .route(
            &format!("{}/:id", prefix),
            get(foods::get_food)
                .put(foods::update_food)
                .fallback(route_not_found),
        )
}

/// Apply the response middleware stack.
///
/// Order, outermost first: request tracing, default headers, CORS, panic
/// catching. CORS sits outside the panic layer so 500s carry the headers
/// too, and the default headers sit outside CORS so preflights get them.
pub fn with_middleware(router: Router, cors: CorsLayer) -> Router {
    router
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors)
        .layer(allow_headers_layer())
        .layer(allow_methods_layer())
        .layer(json_content_type_layer())
        .layer(TraceLayer::new_for_http())
}

/// Build the complete application router.
pub fn create_api_router(config: &ApiConfig, store: Arc<StoreHandle>) -> Router {
    let state = AppState::new(store, &config.route_prefix);

    let router = Router::new()
        .merge(foods_router(&config.route_prefix))
        .nest("/health", health_router())
        .fallback(route_not_found)
        .with_state(state);

    with_middleware(router, build_cors_layer(config))
}
