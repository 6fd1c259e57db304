//! Fallback catalog.
//!
//! A fixed, read-only set of food items served when the relational store
//! cannot be reached. Nothing here is ever written; records synthesized by
//! [`synthesize`] are returned to the caller and then forgotten.

use crate::food::{FoodId, FoodItem, NewFoodItem};

struct Entry {
    id: FoodId,
    name: &'static str,
    calories: i32,
    protein: f64,
    carbs: f64,
    fat: f64,
}

const CATALOG: [Entry; 10] = [
    Entry { id: 1, name: "Apple", calories: 52, protein: 0.3, carbs: 14.0, fat: 0.2 },
    Entry { id: 2, name: "Banana", calories: 89, protein: 1.1, carbs: 23.0, fat: 0.3 },
    Entry { id: 3, name: "Chicken Breast", calories: 165, protein: 31.0, carbs: 0.0, fat: 3.6 },
    Entry { id: 4, name: "Brown Rice", calories: 111, protein: 2.6, carbs: 23.0, fat: 0.9 },
    Entry { id: 5, name: "Broccoli", calories: 34, protein: 2.8, carbs: 7.0, fat: 0.4 },
    Entry { id: 6, name: "Salmon", calories: 208, protein: 20.0, carbs: 0.0, fat: 13.0 },
    Entry { id: 7, name: "Egg", calories: 155, protein: 13.0, carbs: 1.1, fat: 11.0 },
    Entry { id: 8, name: "Greek Yogurt", calories: 59, protein: 10.0, carbs: 3.6, fat: 0.4 },
    Entry { id: 9, name: "Almonds", calories: 579, protein: 21.0, carbs: 22.0, fat: 50.0 },
    Entry { id: 10, name: "Oatmeal", calories: 68, protein: 2.4, carbs: 12.0, fat: 1.4 },
];

fn to_item(entry: &Entry) -> FoodItem {
    FoodItem {
        id: entry.id,
        name: entry.name.to_string(),
        calories: entry.calories,
        protein: Some(entry.protein),
        carbs: Some(entry.carbs),
        fat: Some(entry.fat),
    }
}

/// Number of entries in the catalog.
pub const CATALOG_LEN: usize = CATALOG.len();

/// All catalog entries ordered by id ascending.
pub fn catalog() -> Vec<FoodItem> {
    CATALOG.iter().map(to_item).collect()
}

/// Look up a catalog entry by exact id.
pub fn find(id: FoodId) -> Option<FoodItem> {
    CATALOG.iter().find(|e| e.id == id).map(to_item)
}

/// Case-insensitive substring filter over the catalog, ordered by id.
pub fn search(term: &str) -> Vec<FoodItem> {
    let needle = term.to_lowercase();
    CATALOG
        .iter()
        .filter(|e| e.name.to_lowercase().contains(&needle))
        .map(to_item)
        .collect()
}

/// Id a synthesized record receives: the catalog's max id plus one.
pub fn next_id() -> FoodId {
    CATALOG.iter().map(|e| e.id).max().unwrap_or(0) + 1
}

/// Build a non-persistent record for a create that could not reach the store.
pub fn synthesize(item: &NewFoodItem) -> FoodItem {
    FoodItem::from_new(next_id(), item)
}
