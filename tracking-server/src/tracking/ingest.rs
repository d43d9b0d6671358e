//! LocationIngest - validation and routing of rider GPS pings
//!
//! 接收骑手会话的 GPS ping：校验范围、拒绝未来时间戳与重复坐标，
//! 更新骑手最后已知位置（管理端车队地图），并将可追踪订单的 ping
//! 交给 SubscriptionHub 扇出。
//!
//! 失败一律本地恢复：骑手端只需发送下一个 ping。

use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use shared::models::{LocationPing, RiderPosition};
use shared::util::now_millis;
use shared::{HubError, HubResult, PingRejection};

use crate::hub::SubscriptionHub;

#[derive(Debug, Clone, Copy)]
pub struct IngestConfig {
    /// How far in the future `captured_at` may sit (device clock skew).
    pub clock_skew_tolerance_ms: i64,
    /// Consecutive coordinates closer than this are duplicates.
    pub duplicate_epsilon_deg: f64,
    /// Soft budget for validation plus fan-out. A stale fix has no
    /// value once superseded, so overruns are logged, never retried.
    pub submit_budget: Duration,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            clock_skew_tolerance_ms: 5_000,
            duplicate_epsilon_deg: 1e-6,
            submit_budget: Duration::from_secs(2),
        }
    }
}

pub struct LocationIngest {
    hub: Arc<SubscriptionHub>,
    /// rider_id → last-known position (fleet map)
    positions: DashMap<i64, RiderPosition>,
    config: IngestConfig,
}

impl LocationIngest {
    pub fn new(hub: Arc<SubscriptionHub>, config: IngestConfig) -> Self {
        Self {
            hub,
            positions: DashMap::new(),
            config,
        }
    }

    /// Validate and route one ping.
    ///
    /// Rejections come back as [`HubError::InvalidPing`]; pings for
    /// orders outside their trackable window are dropped silently
    /// (that's a routine state, not a rider error).
    pub fn submit(&self, ping: LocationPing) -> HubResult<()> {
        let started = Instant::now();

        if let Err(rejection) = self.validate(&ping) {
            tracing::debug!(
                rider_id = ping.rider_id,
                order_id = ping.order_id,
                reason = %rejection,
                "ping rejected"
            );
            return Err(HubError::InvalidPing(rejection));
        }

        self.positions.insert(
            ping.rider_id,
            RiderPosition {
                rider_id: ping.rider_id,
                lat: ping.lat,
                lng: ping.lng,
                updated_at: now_millis(),
            },
        );

        if let Some(order_id) = ping.order_id {
            match self.hub.ingest_ping(order_id, ping) {
                Ok(()) => {}
                Err(HubError::RoomNotTrackable(_)) => {
                    tracing::debug!(order_id, "ping outside trackable window dropped");
                }
                Err(e) => return Err(e),
            }
        }

        // Fan-out is lock-bound and non-blocking; an overrun here means
        // pathological room contention and is worth a loud line.
        if started.elapsed() > self.config.submit_budget {
            tracing::warn!(
                rider_id = ping.rider_id,
                elapsed_ms = started.elapsed().as_millis() as u64,
                "ping submission exceeded soft budget"
            );
        }
        Ok(())
    }

    fn validate(&self, ping: &LocationPing) -> Result<(), PingRejection> {
        if !ping.in_range() {
            return Err(PingRejection::OutOfRange {
                lat: ping.lat,
                lng: ping.lng,
            });
        }

        let now = now_millis();
        if ping.captured_at > now + self.config.clock_skew_tolerance_ms {
            return Err(PingRejection::FutureTimestamp {
                captured_at: ping.captured_at,
                now,
            });
        }

        if let Some(last) = self.positions.get(&ping.rider_id) {
            let eps = self.config.duplicate_epsilon_deg;
            if (ping.lat - last.lat).abs() < eps && (ping.lng - last.lng).abs() < eps {
                return Err(PingRejection::DuplicateCoordinates);
            }
        }

        Ok(())
    }

    /// Last-known position of every rider (admin fleet map).
    pub fn fleet(&self) -> Vec<RiderPosition> {
        self.positions
            .iter()
            .map(|entry| *entry.value())
            .collect()
    }

    /// Last-known position of one rider.
    pub fn rider_position(&self, rider_id: i64) -> Option<RiderPosition> {
        self.positions.get(&rider_id).map(|entry| *entry.value())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::geo::GeoPoint;
    use crate::hub::{HubConfig, HubEvent, RoomKey};

    fn dropoff() -> GeoPoint {
        GeoPoint::new(26.45, 50.10)
    }

    fn test_ingest() -> (LocationIngest, Arc<SubscriptionHub>) {
        let hub = Arc::new(SubscriptionHub::new(HubConfig::default()));
        (
            LocationIngest::new(Arc::clone(&hub), IngestConfig::default()),
            hub,
        )
    }

    fn ping(rider_id: i64, lat: f64, lng: f64) -> LocationPing {
        LocationPing {
            rider_id,
            order_id: None,
            lat,
            lng,
            captured_at: now_millis(),
        }
    }

    #[test]
    fn rejects_out_of_range_coordinates() {
        let (ingest, _) = test_ingest();
        let err = ingest.submit(ping(1, 91.0, 0.0)).unwrap_err();
        assert!(matches!(
            err,
            HubError::InvalidPing(PingRejection::OutOfRange { .. })
        ));
        // Rejected pings never touch the fleet map.
        assert!(ingest.fleet().is_empty());
    }

    #[test]
    fn rejects_future_timestamps_beyond_tolerance() {
        let (ingest, _) = test_ingest();
        let mut p = ping(1, 26.0, 50.0);
        p.captured_at = now_millis() + 60_000;
        let err = ingest.submit(p).unwrap_err();
        assert!(matches!(
            err,
            HubError::InvalidPing(PingRejection::FutureTimestamp { .. })
        ));

        // Small skew inside the tolerance is accepted.
        let mut p = ping(1, 26.0, 50.0);
        p.captured_at = now_millis() + 2_000;
        assert!(ingest.submit(p).is_ok());
    }

    #[test]
    fn rejects_duplicate_consecutive_coordinates() {
        let (ingest, _) = test_ingest();
        ingest.submit(ping(1, 26.0, 50.0)).unwrap();

        let err = ingest.submit(ping(1, 26.0, 50.0)).unwrap_err();
        assert!(matches!(
            err,
            HubError::InvalidPing(PingRejection::DuplicateCoordinates)
        ));

        // A different rider at the same spot is fine.
        assert!(ingest.submit(ping(2, 26.0, 50.0)).is_ok());
        // Movement past the epsilon is fine too.
        assert!(ingest.submit(ping(1, 26.0001, 50.0)).is_ok());
    }

    #[test]
    fn updates_fleet_positions() {
        let (ingest, _) = test_ingest();
        ingest.submit(ping(1, 26.0, 50.0)).unwrap();
        ingest.submit(ping(1, 26.001, 50.001)).unwrap();

        let pos = ingest.rider_position(1).unwrap();
        assert!((pos.lat - 26.001).abs() < 1e-9);
        assert_eq!(ingest.fleet().len(), 1);
    }

    #[tokio::test]
    async fn trackable_order_pings_reach_subscribers() {
        let (ingest, hub) = test_ingest();
        hub.mark_trackable(42, dropoff());
        let mut watcher = hub.join(RoomKey::Order(42));

        let mut p = ping(5, 26.0, 50.0);
        p.order_id = Some(42);
        ingest.submit(p).unwrap();

        match watcher.rx.recv().await.unwrap() {
            HubEvent::RiderLocation { order_id, .. } => assert_eq!(order_id, Some(42)),
            other => panic!("Expected RiderLocation, got {other:?}"),
        }
    }

    #[test]
    fn untracked_order_ping_still_updates_fleet() {
        let (ingest, _) = test_ingest();
        let mut p = ping(5, 26.0, 50.0);
        p.order_id = Some(42); // no trackable room exists
        ingest.submit(p).unwrap();
        assert!(ingest.rider_position(5).is_some());
    }
}
