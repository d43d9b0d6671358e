//! Rider location types
//!
//! A ping is a value, not a persisted entity: the engine validates it,
//! folds it into the rider's last-known position and the order's
//! trailing buffer, and forgets it.

use serde::{Deserialize, Serialize};

/// One GPS fix from a rider's device.
///
/// `captured_at` is a Unix millisecond timestamp taken on the device.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationPing {
    pub rider_id: i64,
    /// The delivery this ping belongs to, when the rider is on one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_id: Option<i64>,
    #[serde(alias = "latitude")]
    pub lat: f64,
    #[serde(alias = "longitude")]
    pub lng: f64,
    pub captured_at: i64,
}

impl LocationPing {
    /// 坐标范围是否合法（纬度 ±90，经度 ±180，且为有限数）
    pub fn in_range(&self) -> bool {
        self.lat.is_finite()
            && self.lng.is_finite()
            && (-90.0..=90.0).contains(&self.lat)
            && (-180.0..=180.0).contains(&self.lng)
    }
}

/// Last-known position of a rider, kept for the admin fleet map.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RiderPosition {
    pub rider_id: i64,
    pub lat: f64,
    pub lng: f64,
    pub updated_at: i64,
}
