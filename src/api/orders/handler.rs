//! Orders API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use crate::auth::RequireAdmin;
use crate::core::ServerState;
use crate::db::models::{CartLine, Order, OrderPage};
use crate::utils::{AppError, AppResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    pub items: Vec<CartLine>,
    /// Optional caller-supplied token; retries carrying the same key
    /// resolve to the original order instead of a duplicate
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderResponse {
    pub order_id: String,
    pub success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub page: Option<u32>,
    #[serde(default)]
    pub page_size: Option<u32>,
}

/// POST /api/orders - checkout
pub async fn create(
    State(state): State<ServerState>,
    Json(payload): Json<CreateOrderRequest>,
) -> AppResult<Json<CreateOrderResponse>> {
    let order_id = state
        .orders
        .create_order(&payload.items, payload.idempotency_key.as_deref())
        .await?;
    Ok(Json(CreateOrderResponse {
        order_id,
        success: true,
    }))
}

/// GET /api/orders?page&pageSize - paginated listing (admin)
pub async fn list(
    _admin: RequireAdmin,
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<OrderPage>> {
    let page = state
        .orders
        .get_orders(query.page.unwrap_or(1), query.page_size.unwrap_or(10))
        .await?;
    Ok(Json(page))
}

/// GET /api/orders/{id} - one order with its items (order success page)
pub async fn get_by_id(
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<Order>> {
    let order = state
        .orders
        .get_order_by_id(&id)
        .await?
        .ok_or_else(|| AppError::not_found(format!("Order {id} not found")))?;
    Ok(Json(order))
}
