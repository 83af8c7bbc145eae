//! Suggestions API module

mod handler;

use axum::{
    Router,
    routing::{get, post},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/suggestions", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/menu", get(handler::menu))
        .route("/pairing/{food_id}", get(handler::pairing))
        .route("/upsell", post(handler::upsell))
        .route("/next-order/{order_id}", get(handler::next_order))
}
