//! Food Collection Routes
//!
//! Each handler acquires the store, runs one statement and matches on the
//! result. `Ok` answers come from the database; `Err` answers come from the
//! fallback catalog, or become an error when the catalog cannot stand in.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Json,
};
use calorie_core::{fallback, Envelope, FoodId, FoodItem, NewFoodItem, Source};
use calorie_storage::StoreHandle;
use serde::Deserialize;
use tracing::warn;

use crate::error::{ApiError, ApiResult};
use crate::state::RoutePrefix;

type EnvelopeResponse<T> = (StatusCode, Json<Envelope<T>>);

pub const NOT_PERSISTED_MESSAGE: &str =
    "Database unavailable: item was created in fallback mode and was not persisted";

// ============================================================================
// REQUEST TYPES
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub name: Option<String>,
}

/// Body of a create or replace request, before validation.
#[derive(Debug, Default, Deserialize)]
pub struct FoodPayload {
    pub name: Option<String>,
    pub calories: Option<f64>,
    pub protein: Option<f64>,
    pub carbs: Option<f64>,
    pub fat: Option<f64>,
}

impl FoodPayload {
    pub fn parse(body: &[u8]) -> ApiResult<Self> {
        Ok(serde_json::from_slice(body)?)
    }

    /// Parse a buffered request body; a body that could not be read (too
    /// large, interrupted) is bad input like malformed JSON.
    pub fn from_body(body: Result<Bytes, BytesRejection>) -> ApiResult<Self> {
        let body = body.map_err(|rejection| {
            warn!(error = %rejection, "Request body rejected");
            ApiError::bad_input("Request body could not be read")
        })?;
        Self::parse(&body)
    }

    pub fn into_new_item(self) -> ApiResult<NewFoodItem> {
        let (name, calories) = match (self.name, self.calories) {
            (Some(name), Some(calories)) if !name.trim().is_empty() => (name, calories),
            _ => return Err(ApiError::bad_input("Name and calories are required")),
        };
        if calories.fract() != 0.0 || calories < 0.0 || calories > f64::from(i32::MAX) {
            return Err(ApiError::bad_input(
                "Calories must be a non-negative whole number",
            ));
        }
        let item = NewFoodItem::new(name, calories as i32)?
            .with_macros(self.protein, self.carbs, self.fat)?;
        Ok(item)
    }
}

/// Parse an id path segment. Anything that is not a plain decimal number,
/// including a segment that does not decode, is a routing miss, not a
/// lookup miss.
pub fn parse_id(
    segment: Result<Path<String>, PathRejection>,
    prefix: &RoutePrefix,
) -> ApiResult<FoodId> {
    let Path(segment) = segment.map_err(|_| ApiError::route_not_found(prefix.as_str()))?;
    parse_id_segment(&segment, prefix)
}

fn parse_id_segment(segment: &str, prefix: &RoutePrefix) -> ApiResult<FoodId> {
    if segment.is_empty() || !segment.bytes().all(|b| b.is_ascii_digit()) {
        return Err(ApiError::route_not_found(prefix.as_str()));
    }
    segment
        .parse()
        .map_err(|_| ApiError::route_not_found(prefix.as_str()))
}

// ============================================================================
// HANDLERS
// ============================================================================

/// GET {prefix} - All items, ordered by id.
pub async fn list_foods(
    State(store): State<Arc<StoreHandle>>,
) -> EnvelopeResponse<Vec<FoodItem>> {
    let envelope = match store.run(|s| async move { s.list_all().await }).await {
        Ok(items) => Envelope::ok(items, Source::Database),
        Err(err) => {
            warn!(error = %err, "Serving fallback catalog for list");
            Envelope::ok(fallback::catalog(), Source::Fallback)
        }
    };
    (StatusCode::OK, Json(envelope))
}

/// GET {prefix}/search?name=<term> - Case-insensitive substring match.
pub async fn search_foods(
    State(store): State<Arc<StoreHandle>>,
    params: Result<Query<SearchParams>, QueryRejection>,
) -> ApiResult<EnvelopeResponse<Vec<FoodItem>>> {
    let term = params
        .ok()
        .and_then(|Query(p)| p.name)
        .filter(|name| !name.trim().is_empty())
        .ok_or_else(|| ApiError::bad_input("Search term 'name' is required"))?;

    let needle = term.as_str();
    let envelope = match store
        .run(|s| async move { s.search_by_name(needle).await })
        .await
    {
        Ok(items) => Envelope::ok(items, Source::Database),
        Err(err) => {
            warn!(error = %err, "Serving fallback catalog for search");
            Envelope::ok(fallback::search(needle), Source::Fallback)
        }
    };
    Ok((StatusCode::OK, Json(envelope.with_query(term))))
}

/// GET {prefix}/{id} - Exact lookup.
pub async fn get_food(
    State(store): State<Arc<StoreHandle>>,
    State(prefix): State<RoutePrefix>,
    segment: Result<Path<String>, PathRejection>,
) -> ApiResult<EnvelopeResponse<FoodItem>> {
    let id = parse_id(segment, &prefix)?;

    match store.run(|s| async move { s.get_by_id(id).await }).await {
        Ok(Some(item)) => Ok((StatusCode::OK, Json(Envelope::ok(item, Source::Database)))),
        Ok(None) => Err(ApiError::not_found(Source::Database)),
        Err(err) => {
            warn!(error = %err, id, "Serving fallback catalog for lookup");
            fallback::find(id)
                .map(|item| (StatusCode::OK, Json(Envelope::ok(item, Source::Fallback))))
                .ok_or_else(|| ApiError::not_found(Source::Fallback))
        }
    }
}

/// POST {prefix} - Create an item with id = max(id) + 1.
pub async fn create_food(
    State(store): State<Arc<StoreHandle>>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<EnvelopeResponse<FoodItem>> {
    let new_item = FoodPayload::from_body(body)?.into_new_item()?;

    let payload = &new_item;
    let envelope = match store.run(|s| async move { s.create(payload).await }).await {
        Ok(created) => {
            tracing::info!(id = created.id, "Created food item");
            Envelope::ok(created, Source::Database)
        }
        Err(err) => {
            warn!(error = %err, "Store unavailable, synthesizing unsaved item");
            Envelope::ok(fallback::synthesize(&new_item), Source::Fallback)
                .with_message(NOT_PERSISTED_MESSAGE)
        }
    };
    Ok((StatusCode::CREATED, Json(envelope)))
}

/// PUT {prefix}/{id} - Replace name, calories and macros.
pub async fn update_food(
    State(store): State<Arc<StoreHandle>>,
    State(prefix): State<RoutePrefix>,
    segment: Result<Path<String>, PathRejection>,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<EnvelopeResponse<FoodItem>> {
    let id = parse_id(segment, &prefix)?;
    let new_item = FoodPayload::from_body(body)?.into_new_item()?;

    let payload = &new_item;
    match store
        .run(|s| async move { s.update(id, payload).await })
        .await
    {
        Ok(Some(updated)) => Ok((StatusCode::OK, Json(Envelope::ok(updated, Source::Database)))),
        Ok(None) => Err(ApiError::not_found(Source::Database)),
        Err(err) => {
            warn!(error = %err, id, "Store unavailable, update not applied");
            Err(ApiError::store_unavailable("Database unavailable")
                .with_hint("The fallback catalog is read-only; the update was not applied"))
        }
    }
}

/// Fallback for anything no route handles.
pub async fn route_not_found(State(prefix): State<RoutePrefix>) -> ApiError {
    ApiError::route_not_found(prefix.as_str())
}
