//! Calorie Core - Entity Types
//!
//! Pure data structures shared by the query handler and the gateway client.
//! This crate contains no I/O: food items, the response envelope, the
//! provenance tag, and the fixed fallback catalog.

pub mod envelope;
pub mod error;
pub mod fallback;
pub mod food;

pub use envelope::{Envelope, Source, Sourced};
pub use error::ValidationError;
pub use food::{FoodId, FoodItem, NewFoodItem};
