//! Alerts API Handlers

use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::{Deserialize, Serialize};

use crate::auth::RequireAdmin;
use crate::core::ServerState;
use crate::db::models::AiAlert;
use crate::utils::{AppResponse, AppResult};

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    #[serde(default)]
    pub is_read: bool,
}

/// GET /api/alerts?isRead - alerts by read state, newest first, capped at 50
pub async fn list(
    _admin: RequireAdmin,
    State(state): State<ServerState>,
    Query(query): Query<ListQuery>,
) -> AppResult<Json<Vec<AiAlert>>> {
    Ok(Json(state.inventory.get_alerts(query.is_read).await?))
}

/// POST /api/alerts/{id}/read - dismiss an alert (idempotent)
pub async fn mark_read(
    _admin: RequireAdmin,
    State(state): State<ServerState>,
    Path(id): Path<String>,
) -> AppResult<Json<AppResponse<bool>>> {
    state.inventory.mark_alert_read(&id).await?;
    Ok(Json(AppResponse::success(true)))
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AnalyzeResponse {
    pub success: bool,
    pub alerts_created: u64,
}

/// POST /api/alerts/analyze - on-demand inventory analysis
pub async fn analyze(
    _admin: RequireAdmin,
    State(state): State<ServerState>,
) -> AppResult<Json<AnalyzeResponse>> {
    let alerts_created = state.inventory.analyze_inventory().await?;
    Ok(Json(AnalyzeResponse {
        success: true,
        alerts_created,
    }))
}
