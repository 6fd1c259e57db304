//! Calorie Storage - Storage Traits, Connection Handle and Mock Store
//!
//! Defines the storage abstraction the query handler runs against. The
//! PostgreSQL implementation lives in calorie-api; this crate carries the
//! traits, the lazily connected [`StoreHandle`] and an in-memory store.

pub mod error;
pub mod handle;
pub mod memory;
pub mod store;

pub use error::{StoreError, StoreResult};
pub use handle::{ConnectionState, StoreHandle};
pub use memory::{InMemoryFoodStore, MemoryConnector};
pub use store::{FoodStore, StoreConnector};
