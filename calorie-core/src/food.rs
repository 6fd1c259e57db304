//! Food item entity.
//!
//! Nutritional values are expressed per 100 grams. `protein`, `carbs` and
//! `fat` are optional because rows written under the original schema carry
//! only a name and a calorie count.

use serde::{Deserialize, Serialize};

use crate::error::ValidationError;

/// Food item identifier, assigned by the store.
pub type FoodId = i32;

/// A persisted food item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FoodItem {
    pub id: FoodId,
    pub name: String,
    pub calories: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<f64>,
}

impl FoodItem {
    /// Build a stored item from an id and a validated payload.
    pub fn from_new(id: FoodId, item: &NewFoodItem) -> Self {
        Self {
            id,
            name: item.name.clone(),
            calories: item.calories,
            protein: item.protein,
            carbs: item.carbs,
            fat: item.fat,
        }
    }

    /// Case-insensitive substring match on the name.
    ///
    /// An empty needle matches everything; callers reject empty search terms
    /// before reaching this point.
    pub fn name_contains(&self, needle: &str) -> bool {
        self.name.to_lowercase().contains(&needle.to_lowercase())
    }
}

/// Payload for creating a food item or replacing an existing one.
///
/// Replacement is whole-record: every field here overwrites the stored value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewFoodItem {
    pub name: String,
    pub calories: i32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbs: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<f64>,
}

impl NewFoodItem {
    /// Create a validated payload with no macro-nutrient values.
    pub fn new(name: impl Into<String>, calories: i32) -> Result<Self, ValidationError> {
        let item = Self {
            name: name.into(),
            calories,
            protein: None,
            carbs: None,
            fat: None,
        };
        item.validate()?;
        Ok(item)
    }

    /// Attach macro-nutrient values (grams per 100 g).
    pub fn with_macros(
        mut self,
        protein: Option<f64>,
        carbs: Option<f64>,
        fat: Option<f64>,
    ) -> Result<Self, ValidationError> {
        self.protein = protein;
        self.carbs = carbs;
        self.fat = fat;
        self.validate()?;
        Ok(self)
    }

    /// Validate field invariants.
    ///
    /// - `name` must contain a non-whitespace character
    /// - `calories` must be >= 0
    /// - macro values, when present, must be finite and >= 0
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.name.trim().is_empty() {
            return Err(ValidationError::RequiredFieldMissing { field: "name" });
        }
        if self.calories < 0 {
            return Err(ValidationError::InvalidValue {
                field: "calories",
                reason: "must be >= 0".to_string(),
            });
        }
        for (field, value) in [("protein", self.protein), ("carbs", self.carbs), ("fat", self.fat)] {
            if let Some(v) = value {
                if !v.is_finite() || v < 0.0 {
                    return Err(ValidationError::InvalidValue {
                        field,
                        reason: "must be a non-negative number".to_string(),
                    });
                }
            }
        }
        Ok(())
    }
}
