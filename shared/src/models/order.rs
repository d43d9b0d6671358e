//! Order Model
//!
//! The engine's view of an order: identity, lifecycle status, one
//! timestamp per completed transition, and the monetary breakdown.
//! Orders are created by the checkout flow and mutated exclusively
//! through lifecycle transitions; cancellation is a terminal status,
//! never a row removal.

use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Order lifecycle status
///
/// Forward progression is strictly one step at a time:
/// `CREATED → ACCEPTED → PREPARING → READY → ASSIGNED → PICKED_UP → DELIVERED`,
/// with `CANCELLED` reachable from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderStatus {
    Created,
    Accepted,
    Preparing,
    Ready,
    Assigned,
    PickedUp,
    Delivered,
    Cancelled,
}

impl OrderStatus {
    /// 终态：不再接受任何转换
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Delivered | Self::Cancelled)
    }

    /// 可追踪状态：位置 ping 会被缓冲并广播
    pub fn is_trackable(self) -> bool {
        matches!(self, Self::Assigned | Self::PickedUp)
    }

    /// The immediate forward successor, if any.
    pub fn next(self) -> Option<Self> {
        match self {
            Self::Created => Some(Self::Accepted),
            Self::Accepted => Some(Self::Preparing),
            Self::Preparing => Some(Self::Ready),
            Self::Ready => Some(Self::Assigned),
            Self::Assigned => Some(Self::PickedUp),
            Self::PickedUp => Some(Self::Delivered),
            Self::Delivered | Self::Cancelled => None,
        }
    }

    /// Whether `target` is a legal transition from this status:
    /// forward by exactly one step, or a jump to `CANCELLED` from any
    /// non-terminal state.
    pub fn can_transition_to(self, target: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        if target == Self::Cancelled {
            return true;
        }
        self.next() == Some(target)
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Created => "CREATED",
            Self::Accepted => "ACCEPTED",
            Self::Preparing => "PREPARING",
            Self::Ready => "READY",
            Self::Assigned => "ASSIGNED",
            Self::PickedUp => "PICKED_UP",
            Self::Delivered => "DELIVERED",
            Self::Cancelled => "CANCELLED",
        };
        write!(f, "{}", s)
    }
}

/// Payment status (owned by the payment flow; the engine only reads it
/// to pick the SLA clock start).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Refunded,
}

/// Order entity
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    /// Numeric identity
    pub id: i64,
    /// Human-readable public code (shown to the customer)
    pub public_code: String,
    pub status: OrderStatus,
    pub payment_status: PaymentStatus,
    pub created_at: DateTime<Utc>,
    pub paid_at: Option<DateTime<Utc>>,
    // One timestamp per completed transition, set exactly once.
    pub accepted_at: Option<DateTime<Utc>>,
    pub preparing_at: Option<DateTime<Utc>>,
    pub ready_at: Option<DateTime<Utc>>,
    pub assigned_at: Option<DateTime<Utc>>,
    pub picked_up_at: Option<DateTime<Utc>>,
    pub delivered_at: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    /// Monetary breakdown - fixed-point, never floating-point
    pub subtotal: Decimal,
    pub delivery_fee: Decimal,
    pub tax: Decimal,
    pub total: Decimal,
    /// Destination, immutable after creation
    pub delivery_latitude: f64,
    pub delivery_longitude: f64,
    pub store_id: i64,
    pub customer_id: i64,
    /// Set when the order reaches ASSIGNED
    pub assigned_rider_id: Option<i64>,
}

impl Order {
    /// Stamp the transition timestamp for `status`, once.
    ///
    /// A repeated stamp for an already-stamped state is a no-op, never
    /// an overwrite - transition timestamps are monotonically
    /// non-decreasing and set exactly once.
    pub fn stamp(&mut self, status: OrderStatus, at: DateTime<Utc>) {
        let slot = match status {
            OrderStatus::Created => return, // created_at is set at construction
            OrderStatus::Accepted => &mut self.accepted_at,
            OrderStatus::Preparing => &mut self.preparing_at,
            OrderStatus::Ready => &mut self.ready_at,
            OrderStatus::Assigned => &mut self.assigned_at,
            OrderStatus::PickedUp => &mut self.picked_up_at,
            OrderStatus::Delivered => &mut self.delivered_at,
            OrderStatus::Cancelled => &mut self.cancelled_at,
        };
        if slot.is_none() {
            *slot = Some(at);
        }
    }

    /// The timestamp recorded for reaching `status`, if stamped.
    pub fn stamped_at(&self, status: OrderStatus) -> Option<DateTime<Utc>> {
        match status {
            OrderStatus::Created => Some(self.created_at),
            OrderStatus::Accepted => self.accepted_at,
            OrderStatus::Preparing => self.preparing_at,
            OrderStatus::Ready => self.ready_at,
            OrderStatus::Assigned => self.assigned_at,
            OrderStatus::PickedUp => self.picked_up_at,
            OrderStatus::Delivered => self.delivered_at,
            OrderStatus::Cancelled => self.cancelled_at,
        }
    }

    /// SLA 计时起点：已支付从支付时间算，未支付从创建时间算
    pub fn sla_clock_start(&self) -> DateTime<Utc> {
        self.paid_at.unwrap_or(self.created_at)
    }
}

/// Identity of the staff member or driver performing an action.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: i64,
    pub name: String,
}

impl fmt::Display for Actor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.name, self.id)
    }
}
