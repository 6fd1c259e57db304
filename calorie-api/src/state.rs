//! Shared application state for Axum routers.

use std::sync::Arc;
use std::time::Instant;

use axum::extract::FromRef;
use calorie_storage::StoreHandle;

/// Mount point of the food routes, shared with the not-found handler.
#[derive(Debug, Clone)]
pub struct RoutePrefix(pub Arc<str>);

impl RoutePrefix {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Application-wide state shared across all routes.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Lazily connected store, one per process.
    pub store: Arc<StoreHandle>,
    pub prefix: RoutePrefix,
    pub start_time: Instant,
}

impl AppState {
    pub fn new(store: Arc<StoreHandle>, prefix: &str) -> Self {
        Self {
            store,
            prefix: RoutePrefix(Arc::from(prefix)),
            start_time: Instant::now(),
        }
    }
}

macro_rules! impl_from_ref {
    ($type:ty, $field:ident) => {
        impl FromRef<AppState> for $type {
            fn from_ref(state: &AppState) -> Self {
                state.$field.clone()
            }
        }
    };
}

impl_from_ref!(Arc<StoreHandle>, store);
impl_from_ref!(RoutePrefix, prefix);
impl_from_ref!(Instant, start_time);
