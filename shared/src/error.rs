//! 统一错误处理 - 跟踪引擎的领域错误分类
//!
//! | 变体 | 处理策略 |
//! |------|----------|
//! | `InvalidTransition` | 必须回传给操作者（员工/骑手 UI），绝不静默 |
//! | `InvalidPing` | 记日志后丢弃，骑手端不视为硬失败 |
//! | `RoomNotTrackable` | 合法的暂态，不是错误 |
//! | `SubscriberUnreachable` | 单个订阅者隔离处理，不影响其他订阅者 |
//!
//! 本子系统的任何失败都不应导致进程崩溃：畸形 ping 和断开的
//! 订阅者是常规状况，不是异常状况。

use std::fmt;

use crate::models::OrderStatus;

/// Why a ping was rejected.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PingRejection {
    /// Latitude or longitude outside the valid range (or non-finite).
    OutOfRange { lat: f64, lng: f64 },
    /// `captured_at` is further in the future than the skew tolerance.
    FutureTimestamp { captured_at: i64, now: i64 },
    /// Exact duplicate of the rider's previous coordinates.
    DuplicateCoordinates,
}

impl fmt::Display for PingRejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::OutOfRange { lat, lng } => {
                write!(f, "coordinates out of range: ({}, {})", lat, lng)
            }
            Self::FutureTimestamp { captured_at, now } => write!(
                f,
                "captured_at {} is in the future (now {})",
                captured_at, now
            ),
            Self::DuplicateCoordinates => write!(f, "duplicate consecutive coordinates"),
        }
    }
}

/// Domain errors of the tracking engine.
#[derive(Debug, thiserror::Error)]
pub enum HubError {
    /// State machine misuse - surfaced to the caller, never silent.
    #[error("invalid transition from {from} to {to}")]
    InvalidTransition { from: OrderStatus, to: OrderStatus },

    #[error("order not found: {0}")]
    OrderNotFound(i64),

    /// Dropped with a log line, not surfaced to the rider as a hard
    /// failure unless the input is clearly malformed.
    #[error("invalid ping: {0}")]
    InvalidPing(PingRejection),

    /// A join was accepted but the order has no tracking buffer yet.
    /// A legitimate transient state, not an operator error.
    #[error("order {0} is not in a trackable status")]
    RoomNotTrackable(i64),

    /// Push failed for one subscriber - isolated and logged, never
    /// fails the publish for the rest of the room.
    #[error("subscriber unreachable: {0}")]
    SubscriberUnreachable(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl HubError {
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }
}

pub type HubResult<T> = Result<T, HubError>;
