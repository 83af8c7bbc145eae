//! Menu API Handlers

use axum::{
    Json,
    extract::{Path, State},
};

use crate::auth::RequireAdmin;
use crate::core::ServerState;
use crate::db::models::{FoodItem, FoodItemCreate, FoodItemUpdate};
use crate::utils::{AppError, AppResult};

/// GET /api/menu - full menu with ingredient requirements
pub async fn list(State(state): State<ServerState>) -> AppResult<Json<Vec<FoodItem>>> {
    let items = state.catalog.get_all().await?;
    Ok(Json(items))
}

/// GET /api/menu/{id} - one food item
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<FoodItem>> {
    let item = state
        .catalog
        .get_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Food item {id} not found")))?;
    Ok(Json(item))
}

/// POST /api/menu - create a food item (admin)
pub async fn create(
    _admin: RequireAdmin,
    State(state): State<ServerState>,
    Json(payload): Json<FoodItemCreate>,
) -> AppResult<Json<FoodItem>> {
    let item = state.catalog.create_food_item(payload).await?;
    Ok(Json(item))
}

/// PUT /api/menu/{id} - update a food item (admin)
pub async fn update(
    _admin: RequireAdmin,
    State(state): State<ServerState>,
    Path(id): Path<String>,
    Json(payload): Json<FoodItemUpdate>,
) -> AppResult<Json<FoodItem>> {
    let item = state.catalog.update_food_item(&id, payload).await?;
    Ok(Json(item))
}
