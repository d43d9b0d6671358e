//! OrdersManager - lifecycle transitions and event emission
//!
//! This module handles:
//! - Transition validation against the status table
//! - Per-order serialization of concurrent transition attempts
//! - Idempotency for at-least-once delivery of triggering events
//! - Transition timestamp stamping (once, never overwritten)
//! - Broadcasting `status-changed` via the SubscriptionHub
//!
//! # Transition Flow
//!
//! ```text
//! transition(cmd)
//!     ├─ 1. Acquire per-order lock (cross-order stays parallel)
//!     ├─ 2. Idempotency check (command_id)
//!     ├─ 3. Validate target against current status
//!     ├─ 4. Stamp timestamp + persist
//!     ├─ 5. Open/close the order's tracking window
//!     └─ 6. Broadcast status-changed (order / store / customer rooms)
//! ```

use std::sync::Arc;

use chrono::Utc;
use dashmap::DashMap;
use shared::models::{Actor, Order, OrderStatus};
use shared::{HubError, HubResult};
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::geo::GeoPoint;
use crate::hub::{HubEvent, RoomKey, SubscriptionHub};

use super::store::OrderStore;

/// One transition request, as triggered by a staff or driver action.
///
/// `command_id` identifies the triggering event so a redelivery of the
/// same command is a no-op instead of a spurious `InvalidTransition`.
#[derive(Debug, Clone)]
pub struct TransitionCommand {
    pub order_id: i64,
    pub target: OrderStatus,
    pub actor: Actor,
    pub command_id: Option<Uuid>,
    /// Rider taking the delivery; only meaningful for `ASSIGNED`.
    pub rider_id: Option<i64>,
}

fn dropoff_of(order: &Order) -> GeoPoint {
    GeoPoint::new(order.delivery_latitude, order.delivery_longitude)
}

pub struct OrdersManager {
    store: Arc<dyn OrderStore>,
    hub: Arc<SubscriptionHub>,
    /// Per-order transition locks. Two simultaneous requests for the
    /// same order are strictly ordered; unrelated orders never contend.
    locks: DashMap<i64, Arc<Mutex<()>>>,
    /// Already-applied command ids (at-least-once delivery guard).
    processed: DashMap<Uuid, i64>,
}

impl OrdersManager {
    pub fn new(store: Arc<dyn OrderStore>, hub: Arc<SubscriptionHub>) -> Self {
        Self {
            store,
            hub,
            locks: DashMap::new(),
            processed: DashMap::new(),
        }
    }

    /// Register an order coming out of the checkout flow.
    pub async fn register(&self, order: Order) -> HubResult<()> {
        tracing::info!(order_id = order.id, code = %order.public_code, "order registered");
        if order.status.is_trackable() {
            self.hub.mark_trackable(order.id, dropoff_of(&order));
        }
        self.store.put(order).await
    }

    pub async fn get(&self, order_id: i64) -> HubResult<Order> {
        self.store
            .get(order_id)
            .await?
            .ok_or(HubError::OrderNotFound(order_id))
    }

    pub async fn active_orders(&self) -> HubResult<Vec<Order>> {
        self.store.list_active().await
    }

    /// Apply one lifecycle transition.
    ///
    /// Succeeds only for a forward step of exactly one, or a jump to
    /// `CANCELLED` from a non-terminal state. Anything else fails with
    /// [`HubError::InvalidTransition`], surfaced to the caller so staff
    /// UIs can flag the operator error - in particular, the loser of a
    /// concurrent race sees it because the state already moved.
    pub async fn transition(&self, cmd: TransitionCommand) -> HubResult<Order> {
        let lock = {
            let entry = self
                .locks
                .entry(cmd.order_id)
                .or_insert_with(|| Arc::new(Mutex::new(())));
            Arc::clone(entry.value())
        };
        let _guard = lock.lock().await;

        // Redelivered command: already applied, report success without
        // re-stamping anything.
        if let Some(command_id) = cmd.command_id
            && self.processed.contains_key(&command_id)
        {
            tracing::debug!(
                order_id = cmd.order_id,
                %command_id,
                "duplicate transition command ignored"
            );
            return self.get(cmd.order_id).await;
        }

        let mut order = self.get(cmd.order_id).await?;
        let from = order.status;

        if !from.can_transition_to(cmd.target) {
            tracing::warn!(
                order_id = cmd.order_id,
                %from,
                to = %cmd.target,
                actor = %cmd.actor,
                "invalid transition rejected"
            );
            return Err(HubError::InvalidTransition {
                from,
                to: cmd.target,
            });
        }

        let now = Utc::now();
        order.status = cmd.target;
        order.stamp(cmd.target, now);
        if cmd.target == OrderStatus::Assigned
            && let Some(rider_id) = cmd.rider_id
        {
            order.assigned_rider_id = Some(rider_id);
        }
        self.store.put(order.clone()).await?;

        if let Some(command_id) = cmd.command_id {
            self.processed.insert(command_id, cmd.order_id);
        }

        // Tracking window follows the status.
        if cmd.target.is_trackable() {
            self.hub.mark_trackable(cmd.order_id, dropoff_of(&order));
        } else if cmd.target.is_terminal() {
            self.hub.close_order_tracking(cmd.order_id);
        }

        tracing::info!(
            order_id = cmd.order_id,
            %from,
            to = %cmd.target,
            actor = %cmd.actor,
            "order status changed"
        );

        let event = HubEvent::StatusChanged {
            order_id: order.id,
            status: order.status,
            timestamp: now.timestamp_millis(),
        };
        self.hub.publish(RoomKey::Order(order.id), event.clone());
        self.hub
            .publish(RoomKey::Store(order.store_id), event.clone());
        self.hub
            .publish(RoomKey::Customer(order.customer_id), event);

        Ok(order)
    }
}
