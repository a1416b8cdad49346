//! Route table for the relay HTTP API.

use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post},
};

use super::AppState;
use super::handlers;

pub fn api_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route(
            "/messages",
            get(handlers::wait_for_message).post(handlers::post_message),
        )
        .route("/users", post(handlers::register_user))
        .route("/users/:name", delete(handlers::remove_user))
        .route("/history", get(handlers::history))
        .route("/history/:sender", delete(handlers::delete_history))
        .route("/stats", get(handlers::stats))
        .route("/health", get(handlers::health))
}
