//! 订阅中心端到端行为测试
//!
//! 覆盖迟到订阅者回放、慢消费者隔离与房间内投递顺序。

use std::sync::Arc;
use std::time::Duration;

use shared::LocationPing;
use tokio::sync::broadcast;
use tracking_server::geo::GeoPoint;
use tracking_server::hub::{HubConfig, HubEvent, RoomKey, SubscriptionHub};

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

#[tokio::test]
async fn late_joiner_sees_exactly_one_replay_plus_live_pushes() {
    let hub = SubscriptionHub::new(HubConfig::default());
    hub.mark_trackable(42, dropoff());

    for t in 1..=5 {
        hub.ingest_ping(42, ping(42, t * 1_000)).unwrap();
    }

    // The customer opens the tracking page mid-delivery.
    let mut joined = hub.join(RoomKey::Order(42));

    let mut observed = Vec::new();
    match joined.replay.expect("replay expected") {
        HubEvent::LocationHistory { points, .. } => {
            assert_eq!(points.len(), 5);
            observed.extend(points.iter().map(|p| p.captured_at));
        }
        other => panic!("Expected LocationHistory, got {other:?}"),
    }

    // The 6th ping arrives live.
    hub.ingest_ping(42, ping(42, 6_000)).unwrap();
    match joined.rx.recv().await.unwrap() {
        HubEvent::RiderLocation { captured_at, .. } => observed.push(captured_at),
        other => panic!("Expected RiderLocation, got {other:?}"),
    }

    // Exactly 6 points total, in original order, nothing duplicated.
    assert_eq!(observed, vec![1_000, 2_000, 3_000, 4_000, 5_000, 6_000]);
    assert!(matches!(
        joined.rx.try_recv(),
        Err(broadcast::error::TryRecvError::Empty)
    ));
}

#[tokio::test]
async fn slow_subscriber_never_blocks_the_rest_of_the_room() {
    let hub = Arc::new(SubscriptionHub::new(HubConfig::default()));
    hub.mark_trackable(42, dropoff());

    let mut healthy = hub.join(RoomKey::Order(42));
    // This subscriber never drains its receiver.
    let stuck = hub.join(RoomKey::Order(42));

    const EVENTS: i64 = 400; // more than the broadcast capacity

    // Drain concurrently, the way a live connection would.
    let drainer = tokio::spawn(async move {
        let mut seen = Vec::new();
        while seen.len() < EVENTS as usize {
            match healthy.rx.recv().await {
                Ok(HubEvent::RiderLocation { captured_at, .. }) => seen.push(captured_at),
                Ok(_) => {}
                Err(e) => panic!("healthy subscriber lost events: {e}"),
            }
        }
        seen
    });

    for t in 1..=EVENTS {
        hub.ingest_ping(42, ping(42, t * 1_000)).unwrap();
        // Yield now and then so the healthy drainer keeps pace, the
        // way a live connection task would between bursts.
        if t % 50 == 0 {
            tokio::task::yield_now().await;
        }
    }

    // The healthy subscriber got everything, in publish order, well
    // inside the fan-out budget.
    let seen = tokio::time::timeout(Duration::from_secs(2), drainer)
        .await
        .expect("fan-out exceeded budget")
        .unwrap();
    let expected: Vec<i64> = (1..=EVENTS).map(|t| t * 1_000).collect();
    assert_eq!(seen, expected);

    // The stuck subscriber lagged on its own receiver instead of
    // back-pressuring the room.
    let mut stuck_rx = stuck.rx;
    assert!(matches!(
        stuck_rx.try_recv(),
        Err(broadcast::error::TryRecvError::Lagged(_))
    ));
}

#[tokio::test]
async fn events_within_a_room_keep_publish_order_across_kinds() {
    let hub = SubscriptionHub::new(HubConfig::default());
    hub.mark_trackable(42, dropoff());
    let mut joined = hub.join(RoomKey::Order(42));

    hub.ingest_ping(42, ping(42, 1_000)).unwrap();
    hub.publish(
        RoomKey::Order(42),
        HubEvent::StatusChanged {
            order_id: 42,
            status: shared::models::OrderStatus::PickedUp,
            timestamp: 2_000,
        },
    );
    hub.ingest_ping(42, ping(42, 3_000)).unwrap();

    match joined.rx.recv().await.unwrap() {
        HubEvent::RiderLocation { captured_at, .. } => assert_eq!(captured_at, 1_000),
        other => panic!("unexpected event {other:?}"),
    }
    match joined.rx.recv().await.unwrap() {
        HubEvent::StatusChanged { timestamp, .. } => assert_eq!(timestamp, 2_000),
        other => panic!("unexpected event {other:?}"),
    }
    match joined.rx.recv().await.unwrap() {
        HubEvent::RiderLocation { captured_at, .. } => assert_eq!(captured_at, 3_000),
        other => panic!("unexpected event {other:?}"),
    }
}
