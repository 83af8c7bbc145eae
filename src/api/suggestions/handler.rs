//! Suggestions API Handlers
//!
//! These endpoints never fail: the gateway degrades to deterministic
//! fallbacks internally, so the handlers only shape the response.

use axum::{
    Json,
    extract::{Path, State},
};
use serde::Deserialize;

use crate::ai::Suggestion;
use crate::core::ServerState;
use crate::utils::AppResult;

/// GET /api/suggestions/menu - time-of-day menu recommendations
pub async fn menu(State(state): State<ServerState>) -> AppResult<Json<Vec<Suggestion>>> {
    Ok(Json(state.suggestions.suggest_menu().await))
}

/// GET /api/suggestions/pairing/{food_id} - one pairing suggestion
pub async fn pairing(
    State(state): State<ServerState>,
    Path(food_id): Path<String>,
) -> AppResult<Json<Option<Suggestion>>> {
    Ok(Json(state.suggestions.suggest_pairing(&food_id).await))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpsellRequest {
    pub food_ids: Vec<String>,
}

/// POST /api/suggestions/upsell - cart upsell suggestions
pub async fn upsell(
    State(state): State<ServerState>,
    Json(payload): Json<UpsellRequest>,
) -> AppResult<Json<Vec<Suggestion>>> {
    Ok(Json(state.suggestions.suggest_upsells(&payload.food_ids).await))
}

/// GET /api/suggestions/next-order/{order_id} - post-order recommendations
pub async fn next_order(
    State(state): State<ServerState>,
    Path(order_id): Path<String>,
) -> AppResult<Json<Vec<Suggestion>>> {
    Ok(Json(state.suggestions.suggest_next_order(&order_id).await))
}
