//! SubscriptionHub — 按房间隔离的实时分发核心
//!
//! 管理 rider → hub → 订阅者 的事件推送。每个房间独立加锁，
//! 跨房间完全并行；绝不使用全局锁。
//!
//! ```text
//! LocationIngest ──ping──▶ SubscriptionHub
//!                              ├── rooms: RoomKey → Room
//!                              │     ├── broadcast::Sender<HubEvent> (fan-out)
//!                              │     └── TrackingBuffer (order 房间, 可追踪期内)
//!                              │           │
//!                              │           ▼
//!                              └── WS session (join → 回放 → 持续推送)
//! ```
//!
//! # 投递语义
//!
//! - 房间内事件按发布顺序投递给所有当前订阅者（单房间 FIFO）
//! - 每事件每订阅者至多一次，best-effort：慢订阅者 lag 后丢事件，
//!   绝不反压发布方
//! - 迟到的订阅者不追溯历史事件，但 order 房间在 join 时回放当前
//!   缓冲区快照（单个合成事件）

pub mod inventory;

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dashmap::DashMap;
use parking_lot::Mutex;
use shared::models::{LocationPing, OrderStatus, TrafficLight};
use shared::util::now_millis;
use shared::{HubError, HubResult};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::geo::{self, EtaTuning, GeoPoint};
use crate::tracking::TrackingBuffer;

pub use inventory::InventoryBroadcastHub;

/// Broadcast channel 容量 — 足以缓冲连接时突发
const BROADCAST_CAPACITY: usize = 256;

/// A named subscriber group used for targeted fan-out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RoomKey {
    /// Customer + admin watchers of one delivery.
    Order(i64),
    /// Staff/admin watchers of one store's fleet and inventory.
    Store(i64),
    /// Customer-scoped aggregate notifications.
    Customer(i64),
}

impl fmt::Display for RoomKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Order(id) => write!(f, "order:{}", id),
            Self::Store(id) => write!(f, "store:{}", id),
            Self::Customer(id) => write!(f, "customer:{}", id),
        }
    }
}

/// Hub 内部事件
#[derive(Debug, Clone)]
pub enum HubEvent {
    RiderLocation {
        order_id: Option<i64>,
        lat: f64,
        lng: f64,
        captured_at: i64,
        /// Remaining distance to the drop-off, when known
        distance_meters: Option<f64>,
        /// ETA projected from the trailing window, when known
        eta_minutes: Option<u32>,
    },
    /// 合成回放事件 — 仅在 join 时直接投递，不经过 broadcast
    LocationHistory {
        order_id: i64,
        points: Vec<LocationPing>,
    },
    StatusChanged {
        order_id: i64,
        status: OrderStatus,
        timestamp: i64,
    },
    SlaUpdated {
        order_id: i64,
        color: TrafficLight,
        elapsed_minutes: i64,
        remaining_minutes: i64,
    },
    InventoryUpdated {
        product_id: i64,
        store_id: i64,
        quantity: i64,
    },
}

/// Hub tuning, from [`Config`](crate::core::Config).
#[derive(Debug, Clone, Copy)]
pub struct HubConfig {
    /// Ring capacity of each order's trailing buffer.
    pub buffer_capacity: usize,
    /// Tracking stops after this long without a ping.
    pub inactivity_timeout_ms: i64,
    /// Empty, idle rooms are garbage-collected after this long.
    pub idle_room_ttl_ms: i64,
    /// Sweep cadence.
    pub sweep_interval: Duration,
    /// Bounds for the inline ETA derivation.
    pub eta: EtaTuning,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            buffer_capacity: 30,
            inactivity_timeout_ms: 30 * 60 * 1000,
            idle_room_ttl_ms: 10 * 60 * 1000,
            sweep_interval: Duration::from_secs(60),
            eta: EtaTuning::default(),
        }
    }
}

/// 单个房间的状态 — 仅在该房间的锁内修改
struct RoomInner {
    /// Order 房间在可追踪期内持有的尾随缓冲区
    buffer: Option<TrackingBuffer>,
    /// 配送目的地（进入可追踪状态时设置）
    destination: Option<GeoPoint>,
    /// 最近一次 ping 的接收时间（毫秒）
    last_ping_at: i64,
    /// 最近一次任何活动（join/publish）的时间（毫秒）
    last_activity: i64,
}

struct Room {
    tx: broadcast::Sender<HubEvent>,
    inner: Mutex<RoomInner>,
}

impl Room {
    fn new(now: i64) -> Self {
        let (tx, _) = broadcast::channel(BROADCAST_CAPACITY);
        Self {
            tx,
            inner: Mutex::new(RoomInner {
                buffer: None,
                destination: None,
                last_ping_at: now,
                last_activity: now,
            }),
        }
    }
}

/// A live subscription: the receiver plus the replay event a late
/// joiner must see before any live push.
pub struct JoinedRoom {
    pub rx: broadcast::Receiver<HubEvent>,
    pub replay: Option<HubEvent>,
}

/// 订阅中心 — 房间注册表 + 按房间的扇出
pub struct SubscriptionHub {
    rooms: DashMap<RoomKey, Room>,
    config: HubConfig,
}

impl SubscriptionHub {
    pub fn new(config: HubConfig) -> Self {
        Self {
            rooms: DashMap::new(),
            config,
        }
    }

    /// Join a room, creating it if needed. Idempotence is the
    /// caller's concern: joining twice yields two receivers.
    ///
    /// For order rooms with a non-empty buffer, the returned replay
    /// event carries the full snapshot; the caller must deliver it to
    /// the new subscriber before draining the receiver. Subscribing and
    /// snapshotting happen under the room lock, so no event can be both
    /// in the replay and in the receiver.
    pub fn join(&self, key: RoomKey) -> JoinedRoom {
        let now = now_millis();
        let room = self
            .rooms
            .entry(key)
            .or_insert_with(|| Room::new(now))
            .downgrade();

        let mut inner = room.inner.lock();
        inner.last_activity = now;
        let rx = room.tx.subscribe();
        let replay = match (&key, &inner.buffer) {
            (RoomKey::Order(order_id), Some(buffer)) if !buffer.is_empty() => {
                Some(HubEvent::LocationHistory {
                    order_id: *order_id,
                    points: buffer.snapshot(),
                })
            }
            _ => None,
        };
        drop(inner);

        tracing::debug!(room = %key, "subscriber joined");
        JoinedRoom { rx, replay }
    }

    /// Deliver an event to every current subscriber of `key`.
    ///
    /// Best-effort: a room nobody watches swallows the event, and a
    /// lagged subscriber skips ahead on its own receiver without
    /// slowing anyone else down.
    pub fn publish(&self, key: RoomKey, event: HubEvent) {
        let Some(room) = self.rooms.get(&key) else {
            tracing::trace!(room = %key, "publish to absent room dropped");
            return;
        };
        let mut inner = room.inner.lock();
        inner.last_activity = now_millis();
        let _ = room.tx.send(event);
    }

    /// Route a validated ping into its order room: append to the
    /// trailing buffer, derive speed/ETA from the trailing window and
    /// fan out to subscribers. The geo math is synchronous, so it runs
    /// inline here without stalling other rooms.
    ///
    /// Pings for orders outside their trackable window are dropped
    /// (`RoomNotTrackable`), not queued.
    pub fn ingest_ping(&self, order_id: i64, ping: LocationPing) -> HubResult<()> {
        let key = RoomKey::Order(order_id);
        let Some(room) = self.rooms.get(&key) else {
            return Err(HubError::RoomNotTrackable(order_id));
        };

        let mut inner = room.inner.lock();
        let destination = inner.destination;
        let Some(buffer) = inner.buffer.as_mut() else {
            return Err(HubError::RoomNotTrackable(order_id));
        };
        buffer.push(ping);

        let speed = geo::estimate_speed_mps(&buffer.recent(3), &self.config.eta);
        let distance = destination
            .map(|dest| geo::distance_meters(GeoPoint::new(ping.lat, ping.lng), dest));
        let eta = distance.map(|d| geo::estimate_eta_minutes(d, speed, &self.config.eta));

        let now = now_millis();
        inner.last_ping_at = now;
        inner.last_activity = now;

        let _ = room.tx.send(HubEvent::RiderLocation {
            order_id: ping.order_id,
            lat: ping.lat,
            lng: ping.lng,
            captured_at: ping.captured_at,
            distance_meters: distance,
            eta_minutes: eta,
        });
        Ok(())
    }

    /// The order entered its trackable window: make sure the room
    /// exists and has a buffer, and remember the drop-off point for
    /// the ETA derivation. Lazy and idempotent.
    pub fn mark_trackable(&self, order_id: i64, destination: GeoPoint) {
        let now = now_millis();
        let room = self
            .rooms
            .entry(RoomKey::Order(order_id))
            .or_insert_with(|| Room::new(now))
            .downgrade();

        let mut inner = room.inner.lock();
        inner.destination = Some(destination);
        if inner.buffer.is_none() {
            inner.buffer = Some(TrackingBuffer::new(self.config.buffer_capacity));
            inner.last_ping_at = now;
            tracing::debug!(order_id, "tracking buffer created");
        }
    }

    /// The order left its trackable window (delivered / cancelled):
    /// discard the buffer and stop accepting pings. The room itself
    /// stays alive while subscribers remain, so they still receive the
    /// final status events.
    pub fn close_order_tracking(&self, order_id: i64) {
        if let Some(room) = self.rooms.get(&RoomKey::Order(order_id)) {
            let mut inner = room.inner.lock();
            if inner.buffer.take().is_some() {
                tracing::debug!(order_id, "tracking buffer discarded");
            }
        }
    }

    /// Whether pings for this order are currently buffered.
    pub fn is_trackable(&self, order_id: i64) -> bool {
        self.rooms
            .get(&RoomKey::Order(order_id))
            .map(|room| room.inner.lock().buffer.is_some())
            .unwrap_or(false)
    }

    /// Order ids with a live tracking buffer (SLA monitor input).
    pub fn tracked_orders(&self) -> Vec<i64> {
        self.rooms
            .iter()
            .filter_map(|entry| match entry.key() {
                RoomKey::Order(id) if entry.value().inner.lock().buffer.is_some() => Some(*id),
                _ => None,
            })
            .collect()
    }

    /// Room count, for the health endpoint.
    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// One maintenance pass: tear down buffers with no pings inside
    /// the inactivity window, then drop rooms that are empty and idle.
    pub fn sweep(&self, now: i64) {
        let cfg = self.config;
        self.rooms.retain(|key, room| {
            let mut inner = room.inner.lock();

            if inner.buffer.is_some() && now - inner.last_ping_at > cfg.inactivity_timeout_ms {
                inner.buffer = None;
                tracing::info!(room = %key, "tracking stopped after ping inactivity");
            }

            let keep = room.tx.receiver_count() > 0
                || inner.buffer.is_some()
                || now - inner.last_activity < cfg.idle_room_ttl_ms;
            if !keep {
                tracing::debug!(room = %key, "idle room garbage-collected");
            }
            keep
        });
    }

    /// 启动后台清扫任务
    pub fn spawn_sweeper(self: Arc<Self>, shutdown: CancellationToken) -> tokio::task::JoinHandle<()> {
        let hub = self;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(hub.config.sweep_interval);
            ticker.tick().await; // skip immediate
            loop {
                tokio::select! {
                    _ = shutdown.cancelled() => break,
                    _ = ticker.tick() => hub.sweep(now_millis()),
                }
            }
            tracing::debug!("room sweeper stopped");
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_hub() -> SubscriptionHub {
        SubscriptionHub::new(HubConfig::default())
    }

    fn dropoff() -> GeoPoint {
        GeoPoint::new(26.45, 50.10)
    }

    fn ping(order_id: i64, captured_at: i64) -> LocationPing {
        LocationPing {
            rider_id: 5,
            order_id: Some(order_id),
            lat: 26.0 + captured_at as f64 * 1e-6,
            lng: 50.0,
            captured_at,
        }
    }

    #[test]
    fn ping_before_trackable_is_rejected() {
        let hub = test_hub();
        let err = hub.ingest_ping(42, ping(42, 1_000)).unwrap_err();
        assert!(matches!(err, HubError::RoomNotTrackable(42)));

        // A room without a buffer (plain join) still rejects pings.
        let _joined = hub.join(RoomKey::Order(42));
        let err = hub.ingest_ping(42, ping(42, 2_000)).unwrap_err();
        assert!(matches!(err, HubError::RoomNotTrackable(42)));
    }

    #[tokio::test]
    async fn live_pings_reach_subscribers_in_order() {
        let hub = test_hub();
        hub.mark_trackable(42, dropoff());

        let mut joined = hub.join(RoomKey::Order(42));
        assert!(joined.replay.is_none(), "no replay for an empty buffer");

        for t in [1_000, 2_000, 3_000] {
            hub.ingest_ping(42, ping(42, t)).unwrap();
        }

        for expected in [1_000, 2_000, 3_000] {
            match joined.rx.recv().await.unwrap() {
                HubEvent::RiderLocation { captured_at, .. } => assert_eq!(captured_at, expected),
                other => panic!("Expected RiderLocation, got {other:?}"),
            }
        }
    }

    #[tokio::test]
    async fn late_joiner_gets_replay_then_live() {
        let hub = test_hub();
        hub.mark_trackable(42, dropoff());

        for t in [1_000, 2_000, 3_000, 4_000, 5_000] {
            hub.ingest_ping(42, ping(42, t)).unwrap();
        }

        // Late joiner: single synthetic replay with all 5 points...
        let mut joined = hub.join(RoomKey::Order(42));
        match joined.replay.expect("replay expected") {
            HubEvent::LocationHistory { order_id, points } => {
                assert_eq!(order_id, 42);
                let times: Vec<i64> = points.iter().map(|p| p.captured_at).collect();
                assert_eq!(times, vec![1_000, 2_000, 3_000, 4_000, 5_000]);
            }
            other => panic!("Expected LocationHistory, got {other:?}"),
        }

        // ...then the 6th arrives as a live push.
        hub.ingest_ping(42, ping(42, 6_000)).unwrap();
        match joined.rx.recv().await.unwrap() {
            HubEvent::RiderLocation { captured_at, .. } => assert_eq!(captured_at, 6_000),
            other => panic!("Expected RiderLocation, got {other:?}"),
        }
        // Nothing older leaked into the live stream.
        assert!(matches!(
            joined.rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn closing_tracking_drops_late_pings() {
        let hub = test_hub();
        hub.mark_trackable(42, dropoff());
        hub.ingest_ping(42, ping(42, 1_000)).unwrap();

        hub.close_order_tracking(42);
        assert!(!hub.is_trackable(42));

        let err = hub.ingest_ping(42, ping(42, 2_000)).unwrap_err();
        assert!(matches!(err, HubError::RoomNotTrackable(42)));

        // Rejoining after teardown yields no replay.
        let joined = hub.join(RoomKey::Order(42));
        assert!(joined.replay.is_none());
    }

    #[tokio::test]
    async fn rooms_are_isolated() {
        let hub = test_hub();
        hub.mark_trackable(1, dropoff());
        hub.mark_trackable(2, dropoff());

        let mut watcher_one = hub.join(RoomKey::Order(1));
        let mut watcher_two = hub.join(RoomKey::Order(2));

        hub.ingest_ping(1, ping(1, 1_000)).unwrap();

        match watcher_one.rx.recv().await.unwrap() {
            HubEvent::RiderLocation { order_id, .. } => assert_eq!(order_id, Some(1)),
            other => panic!("Expected RiderLocation, got {other:?}"),
        }
        assert!(matches!(
            watcher_two.rx.try_recv(),
            Err(broadcast::error::TryRecvError::Empty)
        ));
    }

    #[tokio::test]
    async fn location_pushes_carry_distance_and_eta() {
        let hub = test_hub();
        // Drop-off ~300 m north of the rider's track.
        hub.mark_trackable(42, GeoPoint::new(26.0081, 50.0));
        let mut joined = hub.join(RoomKey::Order(42));

        // Two fixes 60 s apart moving ~300 m: ~5 m/s.
        let mut first = ping(42, 0);
        first.lat = 26.0000;
        let mut second = ping(42, 60_000);
        second.lat = 26.0027;
        hub.ingest_ping(42, first).unwrap();
        hub.ingest_ping(42, second).unwrap();

        let _ = joined.rx.recv().await.unwrap();
        match joined.rx.recv().await.unwrap() {
            HubEvent::RiderLocation {
                distance_meters,
                eta_minutes,
                ..
            } => {
                let distance = distance_meters.unwrap();
                assert!((distance - 600.0).abs() < 50.0, "got {distance}");
                // 600 m at ~5 m/s is 2 min, floored to the ETA minimum.
                assert_eq!(eta_minutes, Some(3));
            }
            other => panic!("Expected RiderLocation, got {other:?}"),
        }
    }

    #[test]
    fn sweep_tears_down_inactive_tracking() {
        let config = HubConfig {
            inactivity_timeout_ms: 1_000,
            idle_room_ttl_ms: 5_000,
            ..Default::default()
        };
        let hub = SubscriptionHub::new(config);
        hub.mark_trackable(42, dropoff());
        hub.ingest_ping(42, ping(42, 1_000)).unwrap();
        assert!(hub.is_trackable(42));

        hub.sweep(now_millis() + 2_000);
        assert!(!hub.is_trackable(42));

        // Past the idle TTL the empty room disappears entirely.
        hub.sweep(now_millis() + 10_000);
        assert_eq!(hub.room_count(), 0);
    }

    #[test]
    fn sweep_keeps_rooms_with_subscribers() {
        let config = HubConfig {
            inactivity_timeout_ms: 1_000,
            idle_room_ttl_ms: 1_000,
            ..Default::default()
        };
        let hub = SubscriptionHub::new(config);
        let joined = hub.join(RoomKey::Store(3));

        hub.sweep(now_millis() + 60_000);
        assert_eq!(hub.room_count(), 1);

        drop(joined);
        hub.sweep(now_millis() + 60_000);
        assert_eq!(hub.room_count(), 0);
    }
}
