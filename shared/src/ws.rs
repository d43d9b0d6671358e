//! WebSocket wire protocol
//!
//! Client → Hub: [`ClientMessage`] (join/leave control + rider pings)
//! Hub → Client: [`ServerMessage`] (location, status, SLA and stock pushes)
//!
//! Frames are JSON envelopes tagged by event name:
//!
//! ```json
//! { "event": "join-order", "data": { "orderId": 42 } }
//! ```

use serde::{Deserialize, Serialize};

use crate::models::{LocationPing, OrderStatus, TrafficLight};

/// Client → Hub control and producer messages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ClientMessage {
    /// Watch one delivery (customer tracking page, admin order view).
    #[serde(rename_all = "camelCase")]
    JoinOrder { order_id: i64 },
    #[serde(rename_all = "camelCase")]
    LeaveOrder { order_id: i64 },

    /// Watch one store's fleet and stock (staff/admin dashboards).
    #[serde(rename_all = "camelCase")]
    JoinStore { store_id: i64 },
    #[serde(rename_all = "camelCase")]
    LeaveStore { store_id: i64 },

    /// Customer-scoped aggregate notifications.
    #[serde(rename_all = "camelCase")]
    JoinCustomer { user_id: i64 },

    /// A GPS fix from a rider session.
    ///
    /// `rider-location-update` is the event name the rider app emits;
    /// `submit-location` is accepted as an equivalent.
    #[serde(rename = "rider-location-update", alias = "submit-location")]
    SubmitLocation(LocationPing),
}

/// Hub → Client push events.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", content = "data", rename_all = "kebab-case")]
pub enum ServerMessage {
    /// Live rider position for a watched order, with the derived
    /// remaining distance and ETA when the trailing window allows.
    #[serde(rename_all = "camelCase")]
    RiderLocationUpdated {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        order_id: Option<i64>,
        latitude: f64,
        longitude: f64,
        timestamp: i64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        distance_meters: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        eta_minutes: Option<u32>,
    },

    /// Replay of the trailing buffer, sent once on join so a late
    /// joiner sees continuity instead of an empty map.
    #[serde(rename_all = "camelCase")]
    LocationHistory {
        order_id: i64,
        points: Vec<LocationPing>,
    },

    /// Order lifecycle advanced.
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        order_id: i64,
        status: OrderStatus,
        timestamp: i64,
    },

    /// Periodic SLA re-evaluation for an active order.
    #[serde(rename_all = "camelCase")]
    SlaUpdated {
        order_id: i64,
        color: TrafficLight,
        elapsed_minutes: i64,
        remaining_minutes: i64,
    },

    /// Stock quantity changed in a watched store.
    ///
    /// Field casing intentionally matches the store dashboard client,
    /// which consumes these keys verbatim.
    InventoryUpdated {
        product_id: i64,
        store_id: i64,
        quantity: i64,
    },
}

impl ServerMessage {
    /// Event name on the wire, for logging.
    pub fn event_name(&self) -> &'static str {
        match self {
            Self::RiderLocationUpdated { .. } => "rider-location-updated",
            Self::LocationHistory { .. } => "location-history",
            Self::StatusChanged { .. } => "status-changed",
            Self::SlaUpdated { .. } => "sla-updated",
            Self::InventoryUpdated { .. } => "inventory-updated",
        }
    }
}
