//! Inventory API module (admin)

mod handler;

use axum::{
    Router,
    routing::{get, put},
};

use crate::core::ServerState;

pub fn router() -> Router<ServerState> {
    Router::new().nest("/api/inventory", routes())
}

fn routes() -> Router<ServerState> {
    Router::new()
        .route("/dashboard", get(handler::dashboard))
        .route(
            "/ingredients",
            get(handler::list_ingredients)
                .post(handler::create_ingredient)
                .put(handler::batch_set_quantities),
        )
        .route("/ingredients/{id}", get(handler::get_ingredient))
        .route("/ingredients/{id}/quantity", put(handler::set_quantity))
        .route("/near-expiry", get(handler::near_expiry))
}
