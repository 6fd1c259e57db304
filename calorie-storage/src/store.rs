//! Async storage traits.

use async_trait::async_trait;
use calorie_core::{FoodId, FoodItem, NewFoodItem};
use std::sync::Arc;

use crate::error::StoreResult;

/// Food item storage.
///
/// Every method is a single logical statement against the backing store.
/// Ordering contract: `list_all` and `search_by_name` return rows ordered
/// by `id` ascending.
#[async_trait]
pub trait FoodStore: Send + Sync {
    /// All items, ordered by id ascending.
    async fn list_all(&self) -> StoreResult<Vec<FoodItem>>;

    /// Exact id lookup.
    async fn get_by_id(&self, id: FoodId) -> StoreResult<Option<FoodItem>>;

    /// Case-insensitive substring match on the name, ordered by id ascending.
    ///
    /// `term` is matched literally: `%` and `_` carry no wildcard meaning.
    async fn search_by_name(&self, term: &str) -> StoreResult<Vec<FoodItem>>;

    /// Insert a new item. The store assigns `id` as the current max id + 1.
    async fn create(&self, item: &NewFoodItem) -> StoreResult<FoodItem>;

    /// Replace name, calories and macros of an existing item.
    ///
    /// Returns `Ok(None)` when no item has the given id.
    async fn update(&self, id: FoodId, item: &NewFoodItem) -> StoreResult<Option<FoodItem>>;

    /// Cheap liveness probe.
    async fn ping(&self) -> StoreResult<()>;
}

/// Establishes a store connection.
///
/// Called by [`crate::StoreHandle`] whenever no live connection is cached.
#[async_trait]
pub trait StoreConnector: Send + Sync {
    async fn connect(&self) -> StoreResult<Arc<dyn FoodStore>>;
}
