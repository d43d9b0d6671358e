//! Shared types for the delivery tracking engine
//!
//! Common types used by the tracking server and its clients: the order
//! model, location pings, SLA settings, the WebSocket wire protocol and
//! the domain error taxonomy.

pub mod error;
pub mod models;
pub mod util;
pub mod ws;

// Re-exports
pub use serde::{Deserialize, Serialize};

pub use error::{HubError, HubResult, PingRejection};
pub use models::{LocationPing, Order, OrderStatus, RiderPosition, SlaSettings, TrafficLight};
pub use ws::{ClientMessage, ServerMessage};
