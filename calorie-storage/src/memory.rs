//! In-memory food store.
//!
//! Honors the full [`FoodStore`] contract and is used by tests and by the
//! `memory` store backend for local runs without PostgreSQL.

use async_trait::async_trait;
use calorie_core::{fallback, FoodId, FoodItem, NewFoodItem};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::error::{StoreError, StoreResult};
use crate::store::{FoodStore, StoreConnector};

/// Vec-backed store kept sorted by id.
#[derive(Debug, Default)]
pub struct InMemoryFoodStore {
    items: RwLock<Vec<FoodItem>>,
}

impl InMemoryFoodStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `items`.
    pub fn with_items(items: impl IntoIterator<Item = FoodItem>) -> Self {
        let mut items: Vec<FoodItem> = items.into_iter().collect();
        items.sort_by_key(|i| i.id);
        Self {
            items: RwLock::new(items),
        }
    }

    /// Store seeded with a copy of the fallback catalog.
    pub fn seeded() -> Self {
        Self::with_items(fallback::catalog())
    }

    pub fn len(&self) -> usize {
        self.read().map(|items| items.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn read(&self) -> StoreResult<RwLockReadGuard<'_, Vec<FoodItem>>> {
        self.items
            .read()
            .map_err(|_| StoreError::query("storage lock poisoned"))
    }

    fn write(&self) -> StoreResult<RwLockWriteGuard<'_, Vec<FoodItem>>> {
        self.items
            .write()
            .map_err(|_| StoreError::query("storage lock poisoned"))
    }
}

#[async_trait]
impl FoodStore for InMemoryFoodStore {
    async fn list_all(&self) -> StoreResult<Vec<FoodItem>> {
        Ok(self.read()?.clone())
    }

    async fn get_by_id(&self, id: FoodId) -> StoreResult<Option<FoodItem>> {
        Ok(self.read()?.iter().find(|i| i.id == id).cloned())
    }

    async fn search_by_name(&self, term: &str) -> StoreResult<Vec<FoodItem>> {
        Ok(self
            .read()?
            .iter()
            .filter(|i| i.name_contains(term))
            .cloned()
            .collect())
    }

    async fn create(&self, item: &NewFoodItem) -> StoreResult<FoodItem> {
        let mut items = self.write()?;
        let next_id = items
            .iter()
            .map(|i| i.id)
            .max()
            .unwrap_or(0)
            .checked_add(1)
            .ok_or_else(|| StoreError::query("food item id space exhausted"))?;
        let created = FoodItem::from_new(next_id, item);
        items.push(created.clone());
        Ok(created)
    }

    async fn update(&self, id: FoodId, item: &NewFoodItem) -> StoreResult<Option<FoodItem>> {
        let mut items = self.write()?;
        match items.iter_mut().find(|i| i.id == id) {
            Some(existing) => {
                *existing = FoodItem::from_new(id, item);
                Ok(Some(existing.clone()))
            }
            None => Ok(None),
        }
    }

    async fn ping(&self) -> StoreResult<()> {
        self.read().map(|_| ())
    }
}

/// Connector that always hands out the same in-memory store.
#[derive(Debug, Clone)]
pub struct MemoryConnector {
    store: Arc<InMemoryFoodStore>,
}

impl MemoryConnector {
    pub fn new(store: Arc<InMemoryFoodStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<InMemoryFoodStore> {
        &self.store
    }
}

#[async_trait]
impl StoreConnector for MemoryConnector {
    async fn connect(&self) -> StoreResult<Arc<dyn FoodStore>> {
        let store: Arc<dyn FoodStore> = self.store.clone();
        Ok(store)
    }
}
