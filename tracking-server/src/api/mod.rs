use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use crate::core::ServerState;

pub mod fleet;
pub mod health;
pub mod inventory;
pub mod orders;
pub mod ws;

/// Build a router with all routes registered (no middleware, no state)
pub fn build_router() -> Router<ServerState> {
    Router::new()
        // Order lifecycle + tracking bootstrap
        .merge(orders::router())
        // Inventory broadcast entry point
        .merge(inventory::router())
        // Admin fleet map
        .merge(fleet::router())
        // Realtime subscriptions
        .merge(ws::router())
        // Health API - public route
        .merge(health::router())
}

/// Build a fully configured application with all middleware and state
pub fn build_app(state: &ServerState) -> Router {
    build_router()
        // ========== Tower HTTP Middleware ==========
        // CORS - Handle cross-origin requests
        .layer(CorsLayer::permissive())
        // Request logging
        .layer(TraceLayer::new_for_http())
        .with_state(state.clone())
}
