//! Fleet API Module
//!
//! Last-known rider positions for the admin fleet map. Read-only;
//! positions are fed exclusively by validated pings.

use axum::{Json, Router, extract::State, routing::get};
use shared::models::RiderPosition;

use crate::core::ServerState;
use crate::utils::{ApiResponse, ApiResult};

/// Fleet router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/fleet", get(fleet_positions))
}

async fn fleet_positions(State(state): State<ServerState>) -> ApiResult<Vec<RiderPosition>> {
    Ok(Json(ApiResponse::success(state.ingest.fleet())))
}
