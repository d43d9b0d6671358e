//! Order API Module
//!
//! Entry points for the collaborating services: checkout registers
//! orders, staff/driver UIs request lifecycle transitions, and the
//! customer tracking page bootstraps from the tracking snapshot.
//! Location history is never served here - buffer contents reach
//! clients only via replay-on-join and live pushes.

use axum::{
    Json, Router,
    extract::{Path, State},
    routing::{get, post},
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use shared::models::{Actor, Order, OrderStatus, PaymentStatus};
use uuid::Uuid;

use crate::core::ServerState;
use crate::orders::TransitionCommand;
use crate::sla::{self, SlaSnapshot};
use crate::utils::{ApiResponse, ApiResult};

/// Order router
pub fn router() -> Router<ServerState> {
    Router::new()
        // Checkout write-through into the engine registry
        .route("/api/orders", post(register_order))
        // Staff/driver transition request
        .route("/api/orders/{id}/status", post(transition_order))
        // Customer tracking page bootstrap
        .route("/api/orders/{id}/tracking", get(order_tracking))
}

/// 注册请求 - 结账流程写入引擎
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterOrderRequest {
    pub id: i64,
    pub public_code: String,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub paid_at: Option<DateTime<Utc>>,
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    pub delivery_latitude: f64,
    pub delivery_longitude: f64,
    pub store_id: i64,
    pub customer_id: i64,
}

async fn register_order(
    State(state): State<ServerState>,
    Json(req): Json<RegisterOrderRequest>,
) -> ApiResult<Order> {
    let order = Order {
        id: req.id,
        public_code: req.public_code,
        status: OrderStatus::Created,
        payment_status: req.payment_status,
        created_at: Utc::now(),
        paid_at: req.paid_at,
        accepted_at: None,
        preparing_at: None,
        ready_at: None,
        assigned_at: None,
        picked_up_at: None,
        delivered_at: None,
        cancelled_at: None,
        subtotal: req.subtotal,
        delivery_fee: req.delivery_fee,
        tax: req.tax,
        total: req.total,
        delivery_latitude: req.delivery_latitude,
        delivery_longitude: req.delivery_longitude,
        store_id: req.store_id,
        customer_id: req.customer_id,
        assigned_rider_id: None,
    };
    state.orders.register(order.clone()).await?;
    Ok(Json(ApiResponse::success(order)))
}

/// 状态转换请求
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitionRequest {
    pub status: OrderStatus,
    pub actor_id: i64,
    pub actor_name: String,
    /// Idempotency key of the triggering event (at-least-once guard)
    #[serde(default)]
    pub command_id: Option<Uuid>,
    /// Rider taking the delivery (ASSIGNED only)
    #[serde(default)]
    pub rider_id: Option<i64>,
}

async fn transition_order(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
    Json(req): Json<TransitionRequest>,
) -> ApiResult<Order> {
    let order = state
        .orders
        .transition(TransitionCommand {
            order_id: id,
            target: req.status,
            actor: Actor {
                id: req.actor_id,
                name: req.actor_name,
            },
            command_id: req.command_id,
            rider_id: req.rider_id,
        })
        .await?;
    Ok(Json(ApiResponse::success(order)))
}

/// 追踪页引导响应 - 状态 + 时间戳 + SLA 快照
///
/// 不含位置点：缓冲内容只经由 join 回放和实时推送到达客户端。
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TrackingBootstrap {
    pub order: Order,
    pub sla: SlaSnapshot,
    /// Whether pings are currently buffered for this order
    pub trackable: bool,
}

async fn order_tracking(
    State(state): State<ServerState>,
    Path(id): Path<i64>,
) -> ApiResult<TrackingBootstrap> {
    let order = state.orders.get(id).await?;
    let settings = state.settings.current().await;

    // Delivered orders get the one-shot final evaluation; everything
    // else gets the live countdown.
    let sla = sla::evaluate_final(&order, &settings)
        .unwrap_or_else(|| sla::evaluate_live(&order, Utc::now(), &settings));

    Ok(Json(ApiResponse::success(TrackingBootstrap {
        trackable: state.hub.is_trackable(id),
        order,
        sla,
    })))
}
