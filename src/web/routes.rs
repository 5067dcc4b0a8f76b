use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use super::handlers;
use super::state::AppState;

// API Routes - REST API consumed by the chat client
pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new().nest(
        "/api",
        Router::new()
            // Chat pipeline
            .route("/query", post(handlers::api::chat))
            // Alias kept for clients still posting to the original path
            .route("/chat", post(handlers::api::chat))

            // Schema disclosure
            .route("/schema", get(handlers::api::get_schema))

            // System status
            .route("/status", get(handlers::api::system_status)),
    )
}
