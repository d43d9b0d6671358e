//! 订单生命周期并发与广播测试
//!
//! 两个同时的状态转换必须严格串行：赢家成功，输家收到
//! InvalidTransition；整条生命周期的事件按发布顺序到达订阅者。

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use shared::models::{Actor, Order, OrderStatus, PaymentStatus};
use shared::{HubError, LocationPing};
use tracking_server::hub::{HubConfig, HubEvent, RoomKey, SubscriptionHub};
use tracking_server::orders::{MemoryOrderStore, OrdersManager, TransitionCommand};
use uuid::Uuid;

fn test_setup() -> (Arc<OrdersManager>, Arc<SubscriptionHub>) {
    let hub = Arc::new(SubscriptionHub::new(HubConfig::default()));
    let manager = Arc::new(OrdersManager::new(
        Arc::new(MemoryOrderStore::new()),
        Arc::clone(&hub),
    ));
    (manager, hub)
}

fn test_order(id: i64, status: OrderStatus) -> Order {
    Order {
        id,
        public_code: format!("TMO-{id:04}"),
        status,
        payment_status: PaymentStatus::Paid,
        created_at: Utc::now(),
        paid_at: Some(Utc::now()),
        accepted_at: None,
        preparing_at: None,
        ready_at: None,
        assigned_at: None,
        picked_up_at: None,
        delivered_at: None,
        cancelled_at: None,
        subtotal: Decimal::new(25_00, 2),
        delivery_fee: Decimal::new(3_00, 2),
        tax: Decimal::new(1_40, 2),
        total: Decimal::new(29_40, 2),
        delivery_latitude: 26.42,
        delivery_longitude: 50.09,
        store_id: 3,
        customer_id: 11,
        assigned_rider_id: None,
    }
}

fn cmd(order_id: i64, target: OrderStatus, actor_name: &str) -> TransitionCommand {
    TransitionCommand {
        order_id,
        target,
        actor: Actor {
            id: 1,
            name: actor_name.to_string(),
        },
        command_id: Some(Uuid::new_v4()),
        rider_id: None,
    }
}

#[tokio::test]
async fn concurrent_picked_up_race_has_exactly_one_winner() {
    let (manager, _hub) = test_setup();
    manager
        .register(test_order(7, OrderStatus::Assigned))
        .await
        .unwrap();

    // Two distinct commands race for the same step.
    let first = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            manager
                .transition(cmd(7, OrderStatus::PickedUp, "Rider A"))
                .await
        })
    };
    let second = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move {
            manager
                .transition(cmd(7, OrderStatus::PickedUp, "Rider B"))
                .await
        })
    };

    let results = [first.await.unwrap(), second.await.unwrap()];
    let wins = results.iter().filter(|r| r.is_ok()).count();
    let losses = results
        .iter()
        .filter(|r| matches!(r, Err(HubError::InvalidTransition { .. })))
        .count();

    assert_eq!(wins, 1, "exactly one transition must win");
    assert_eq!(losses, 1, "the loser must see InvalidTransition");

    let order = manager.get(7).await.unwrap();
    assert_eq!(order.status, OrderStatus::PickedUp);
    assert!(order.picked_up_at.is_some());
}

#[tokio::test]
async fn transitions_on_different_orders_run_in_parallel() {
    let (manager, _hub) = test_setup();
    for id in 1..=20 {
        manager
            .register(test_order(id, OrderStatus::Created))
            .await
            .unwrap();
    }

    let mut handles = Vec::new();
    for id in 1..=20 {
        let manager = Arc::clone(&manager);
        handles.push(tokio::spawn(async move {
            manager
                .transition(cmd(id, OrderStatus::Accepted, "Staff"))
                .await
        }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }
}

#[tokio::test]
async fn full_lifecycle_broadcasts_in_order_and_ends_tracking() {
    let (manager, hub) = test_setup();
    manager
        .register(test_order(7, OrderStatus::Created))
        .await
        .unwrap();

    let mut watcher = hub.join(RoomKey::Order(7));

    let steps = [
        OrderStatus::Accepted,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Assigned,
        OrderStatus::PickedUp,
        OrderStatus::Delivered,
    ];
    for target in steps {
        manager
            .transition(cmd(7, target, "Staff"))
            .await
            .unwrap();
    }

    for expected in steps {
        match watcher.rx.recv().await.unwrap() {
            HubEvent::StatusChanged { status, .. } => assert_eq!(status, expected),
            other => panic!("Expected StatusChanged, got {other:?}"),
        }
    }

    // Delivery tore the buffer down: late pings are dropped, not queued.
    let late = LocationPing {
        rider_id: 5,
        order_id: Some(7),
        lat: 26.0,
        lng: 50.0,
        captured_at: Utc::now().timestamp_millis(),
    };
    let err = hub.ingest_ping(7, late).unwrap_err();
    assert!(matches!(err, HubError::RoomNotTrackable(7)));
}

#[tokio::test]
async fn store_room_sees_status_changes_for_dashboards() {
    let (manager, hub) = test_setup();
    manager
        .register(test_order(7, OrderStatus::Created))
        .await
        .unwrap();

    let mut staff = hub.join(RoomKey::Store(3));
    let mut customer = hub.join(RoomKey::Customer(11));

    manager
        .transition(cmd(7, OrderStatus::Accepted, "Staff"))
        .await
        .unwrap();

    for watcher in [&mut staff, &mut customer] {
        match watcher.rx.recv().await.unwrap() {
            HubEvent::StatusChanged {
                order_id, status, ..
            } => {
                assert_eq!(order_id, 7);
                assert_eq!(status, OrderStatus::Accepted);
            }
            other => panic!("Expected StatusChanged, got {other:?}"),
        }
    }
}
