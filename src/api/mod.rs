//! API routing module
//!
//! # Structure
//!
//! - [`health`] - liveness check
//! - [`menu`] - public menu browsing + admin food item management
//! - [`orders`] - checkout, order lookup, admin order listing
//! - [`inventory`] - admin inventory dashboard and corrections
//! - [`alerts`] - admin alert listing, dismissal, on-demand analysis
//! - [`suggestions`] - customer-facing suggestion endpoints

pub mod alerts;
pub mod health;
pub mod inventory;
pub mod menu;
pub mod orders;
pub mod suggestions;

use crate::core::ServerState;
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

// Re-export common types for handlers
pub use crate::utils::{AppResponse, AppResult};

/// Assemble the full application router
pub fn router(state: ServerState) -> Router {
    Router::new()
        .merge(health::router())
        .merge(menu::router())
        .merge(orders::router())
        .merge(inventory::router())
        .merge(alerts::router())
        .merge(suggestions::router())
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
