//! Order persistence seam
//!
//! The authoritative order rows live in the marketplace's relational
//! store, reached through the order-record service. The engine works
//! against this trait so the lifecycle logic stays testable; the
//! in-memory implementation doubles as the engine's working registry.

use async_trait::async_trait;
use dashmap::DashMap;
use shared::models::Order;
use shared::HubResult;

#[async_trait]
pub trait OrderStore: Send + Sync {
    async fn get(&self, id: i64) -> HubResult<Option<Order>>;
    async fn put(&self, order: Order) -> HubResult<()>;
    /// Orders not yet in a terminal status.
    async fn list_active(&self) -> HubResult<Vec<Order>>;
}

/// In-memory order registry.
#[derive(Default)]
pub struct MemoryOrderStore {
    orders: DashMap<i64, Order>,
}

impl MemoryOrderStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl OrderStore for MemoryOrderStore {
    async fn get(&self, id: i64) -> HubResult<Option<Order>> {
        Ok(self.orders.get(&id).map(|entry| entry.value().clone()))
    }

    async fn put(&self, order: Order) -> HubResult<()> {
        self.orders.insert(order.id, order);
        Ok(())
    }

    async fn list_active(&self) -> HubResult<Vec<Order>> {
        Ok(self
            .orders
            .iter()
            .filter(|entry| !entry.value().status.is_terminal())
            .map(|entry| entry.value().clone())
            .collect())
    }
}
