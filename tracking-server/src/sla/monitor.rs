//! SLA monitor - fixed-cadence re-evaluation of active orders
//!
//! Every interval (default 60 s) each active order's countdown is
//! re-derived and pushed to its room as an `sla-updated` event. Rooms
//! nobody watches swallow the push; delivered orders get their one-shot
//! final evaluation through the tracking bootstrap endpoint instead.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tokio_util::sync::CancellationToken;

use crate::clients::SettingsClient;
use crate::hub::{HubEvent, RoomKey, SubscriptionHub};
use crate::orders::OrdersManager;

use super::evaluate_live;

pub struct SlaMonitor {
    orders: Arc<OrdersManager>,
    hub: Arc<SubscriptionHub>,
    settings: Arc<SettingsClient>,
    interval: Duration,
}

impl SlaMonitor {
    pub fn new(
        orders: Arc<OrdersManager>,
        hub: Arc<SubscriptionHub>,
        settings: Arc<SettingsClient>,
        interval: Duration,
    ) -> Self {
        Self {
            orders,
            hub,
            settings,
            interval,
        }
    }

    /// 启动后台评估循环
    pub fn spawn(self, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(self.interval);
            ticker.tick().await; // skip immediate
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => self.evaluate_round().await,
                }
            }
            tracing::debug!("SLA monitor stopped");
        })
    }

    /// One evaluation pass over all active orders.
    pub async fn evaluate_round(&self) {
        let settings = self.settings.current().await;
        let orders = match self.orders.active_orders().await {
            Ok(orders) => orders,
            Err(e) => {
                tracing::warn!("SLA round skipped, order listing failed: {e}");
                return;
            }
        };

        let now = Utc::now();
        for order in orders {
            let snapshot = evaluate_live(&order, now, &settings);
            self.hub.publish(
                RoomKey::Order(order.id),
                HubEvent::SlaUpdated {
                    order_id: order.id,
                    color: snapshot.color,
                    elapsed_minutes: snapshot.elapsed_minutes,
                    remaining_minutes: snapshot.remaining_minutes,
                },
            );
        }
    }
}
