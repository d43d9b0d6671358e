//! InventoryBroadcastHub - store-level stock change fan-out
//!
//! Simpler sibling of the order tracking flow: a stock mutation fans
//! out to every `store:<id>` subscriber. No buffering and no
//! replay-on-join - clients re-fetch stock levels through the catalog
//! read path when they join.

use std::sync::Arc;

use super::{HubEvent, RoomKey, SubscriptionHub};

#[derive(Clone)]
pub struct InventoryBroadcastHub {
    hub: Arc<SubscriptionHub>,
}

impl InventoryBroadcastHub {
    pub fn new(hub: Arc<SubscriptionHub>) -> Self {
        Self { hub }
    }

    /// Push a stock delta to everyone watching the store.
    pub fn publish_change(&self, store_id: i64, product_id: i64, quantity: i64) {
        tracing::debug!(store_id, product_id, quantity, "inventory change broadcast");
        self.hub.publish(
            RoomKey::Store(store_id),
            HubEvent::InventoryUpdated {
                product_id,
                store_id,
                quantity,
            },
        );
    }
}
