//! Calorie Test Utilities
//!
//! Shared test infrastructure for the workspace:
//! - Fixtures for common store contents
//! - Connectors that fail, or fail a fixed number of times
//! - Proptest generators for food payloads

pub use calorie_core::{fallback, Envelope, FoodId, FoodItem, NewFoodItem, Source, Sourced};
pub use calorie_storage::{
    ConnectionState, FoodStore, InMemoryFoodStore, MemoryConnector, StoreConnector, StoreError,
    StoreHandle, StoreResult,
};

use async_trait::async_trait;
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// FIXTURES
// ============================================================================

/// Food item without macro values.
pub fn food(id: FoodId, name: &str, calories: i32) -> FoodItem {
    FoodItem {
        id,
        name: name.to_string(),
        calories,
        protein: None,
        carbs: None,
        fat: None,
    }
}

/// Apple, Pineapple and Banana, ids 1..=3.
pub fn fruit_rows() -> Vec<FoodItem> {
    vec![
        food(1, "Apple", 52),
        food(2, "Pineapple", 50),
        food(3, "Banana", 89),
    ]
}

/// In-memory store holding [`fruit_rows`].
pub fn fruit_store() -> Arc<InMemoryFoodStore> {
    Arc::new(InMemoryFoodStore::with_items(fruit_rows()))
}

/// Handle over an in-memory store that connects on first use.
pub fn memory_handle(store: Arc<InMemoryFoodStore>) -> Arc<StoreHandle> {
    Arc::new(StoreHandle::new(Arc::new(MemoryConnector::new(store))))
}

/// Handle whose every connection attempt fails.
pub fn unreachable_handle() -> Arc<StoreHandle> {
    Arc::new(StoreHandle::new(Arc::new(FailingConnector::default())))
}

// ============================================================================
// CONNECTORS
// ============================================================================

/// Connector that never succeeds, counting attempts.
///
/// With a delay, each attempt waits before failing, like a connect timeout.
#[derive(Debug, Default)]
pub struct FailingConnector {
    attempts: AtomicUsize,
    delay: Option<Duration>,
}

impl FailingConnector {
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            attempts: AtomicUsize::new(0),
            delay: Some(delay),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for FailingConnector {
    async fn connect(&self) -> StoreResult<Arc<dyn FoodStore>> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
            return Err(StoreError::unavailable("connect timeout"));
        }
        Err(StoreError::unavailable("connection refused"))
    }
}

/// Connector that fails `failures` times before handing out `store`.
#[derive(Debug)]
pub struct FlakyConnector {
    store: Arc<InMemoryFoodStore>,
    failures: usize,
    attempts: AtomicUsize,
}

impl FlakyConnector {
    pub fn new(store: Arc<InMemoryFoodStore>, failures: usize) -> Self {
        Self {
            store,
            failures,
            attempts: AtomicUsize::new(0),
        }
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl StoreConnector for FlakyConnector {
    async fn connect(&self) -> StoreResult<Arc<dyn FoodStore>> {
        let n = self.attempts.fetch_add(1, Ordering::SeqCst);
        if n < self.failures {
            return Err(StoreError::unavailable("connection timed out"));
        }
        let store: Arc<dyn FoodStore> = self.store.clone();
        Ok(store)
    }
}

// ============================================================================
// GENERATORS
// ============================================================================

/// Non-blank food names.
pub fn arb_food_name() -> impl Strategy<Value = String> {
    "[A-Za-z][A-Za-z ]{0,24}"
}

/// Valid create payloads.
pub fn arb_new_food() -> impl Strategy<Value = NewFoodItem> {
    (
        arb_food_name(),
        0i32..1000,
        prop::option::of(0.0f64..100.0),
        prop::option::of(0.0f64..100.0),
        prop::option::of(0.0f64..100.0),
    )
        .prop_map(|(name, calories, protein, carbs, fat)| NewFoodItem {
            name,
            calories,
            protein,
            carbs,
            fat,
        })
}
