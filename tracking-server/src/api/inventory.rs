//! Inventory API Module
//!
//! Staff stock mutations enter here and fan out to the store room.
//! The authoritative stock rows live in the catalog service; this
//! endpoint only broadcasts the delta.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::post,
};
use serde::Deserialize;

use crate::core::ServerState;
use crate::utils::{ApiResponse, ApiResult};

/// Inventory router
pub fn router() -> Router<ServerState> {
    Router::new().route("/api/inventory/{store_id}", post(publish_change))
}

/// 库存变更请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryChangeRequest {
    pub product_id: i64,
    pub new_quantity: i64,
}

async fn publish_change(
    State(state): State<ServerState>,
    Path(store_id): Path<i64>,
    Json(req): Json<InventoryChangeRequest>,
) -> ApiResult<()> {
    state
        .inventory
        .publish_change(store_id, req.product_id, req.new_quantity);
    Ok(Json(ApiResponse::ok()))
}
