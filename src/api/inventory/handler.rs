//! Inventory API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use rust_decimal::Decimal;
use serde::Deserialize;

use crate::auth::RequireAdmin;
use crate::core::ServerState;
use crate::db::models::{Ingredient, IngredientCreate};
use crate::services::inventory::InventoryDashboard;
use crate::utils::{AppError, AppResult};

/// GET /api/inventory/dashboard - ingredients plus precomputed stats
pub async fn dashboard(
    _admin: RequireAdmin,
    State(state): State<ServerState>,
) -> AppResult<Json<InventoryDashboard>> {
    Ok(Json(state.inventory.get_dashboard().await?))
}

/// GET /api/inventory/ingredients - all ingredients, name ascending
pub async fn list_ingredients(
    _admin: RequireAdmin,
    State(state): State<ServerState>,
) -> AppResult<Json<Vec<Ingredient>>> {
    Ok(Json(state.inventory.get_ingredients().await?))
}

/// GET /api/inventory/ingredients/{id} - one ingredient
pub async fn get_ingredient(
    _admin: RequireAdmin,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Ingredient>> {
    let ingredient = state
        .inventory
        .get_ingredient(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Ingredient {id} not found")))?;
    Ok(Json(ingredient))
}

/// POST /api/inventory/ingredients - register an ingredient
pub async fn create_ingredient(
    _admin: RequireAdmin,
    State(state): State<ServerState>,
    Json(payload): Json<IngredientCreate>,
) -> AppResult<Json<Ingredient>> {
    Ok(Json(state.inventory.create_ingredient(payload).await?))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SetQuantityRequest {
    pub quantity: Decimal,
}

/// PUT /api/inventory/ingredients/{id}/quantity - stock correction
pub async fn set_quantity(
    _admin: RequireAdmin,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<SetQuantityRequest>,
) -> AppResult<Json<Ingredient>> {
    let ingredient = state.inventory.set_quantity(&id, payload.quantity).await?;
    Ok(Json(ingredient))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuantityUpdate {
    pub id: String,
    pub quantity: Decimal,
}

/// PUT /api/inventory/ingredients - batch stock correction (transactional)
pub async fn batch_set_quantities(
    _admin: RequireAdmin,
    State(state): State<ServerState>,
    Json(payload): Json<Vec<QuantityUpdate>>,
) -> AppResult<Json<Vec<Ingredient>>> {
    let updates: Vec<(String, Decimal)> = payload
        .into_iter()
        .map(|u| (u.id, u.quantity))
        .collect();
    Ok(Json(state.inventory.batch_set_quantities(&updates).await?))
}

#[derive(Debug, Deserialize)]
pub struct NearExpiryQuery {
    #[serde(default = "default_window")]
    pub days: i64,
}

fn default_window() -> i64 {
    7
}

/// GET /api/inventory/near-expiry?days - expiring ingredients, soonest first
pub async fn near_expiry(
    _admin: RequireAdmin,
    State(state): State<ServerState>,
    Query(query): Query<NearExpiryQuery>,
) -> AppResult<Json<Vec<Ingredient>>> {
    Ok(Json(state.inventory.get_near_expiry(query.days).await?))
}
