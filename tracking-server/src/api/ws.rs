//! WebSocket endpoint — 实时订阅会话
//!
//! GET /ws — upgrade to WebSocket
//!
//! 协议:
//! - Client → Hub: ClientMessage (join/leave 控制 + 骑手 ping)
//! - Hub → Client: ServerMessage (位置/状态/SLA/库存推送)
//!
//! 每个连接持有一条有界发送队列；每个已加入的房间由一个转发任务
//! 从 broadcast receiver 搬运到该队列。慢连接只会塞满自己的队列并
//! 在自己的 receiver 上 lag（跳过事件），绝不反压房间或其他订阅者。

use std::collections::HashMap;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::State;
use axum::response::IntoResponse;
use axum::{Router, routing::get};
use futures::{SinkExt, StreamExt};
use shared::ws::{ClientMessage, ServerMessage};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio::time::Duration;
use uuid::Uuid;

use crate::core::ServerState;
use crate::hub::{HubEvent, JoinedRoom, RoomKey};

/// Per-connection outbound queue depth.
const OUTBOUND_QUEUE: usize = 64;

/// WebSocket router
pub fn router() -> Router<ServerState> {
    Router::new().route("/ws", get(handle_ws))
}

/// GET /ws — upgrade to WebSocket
async fn handle_ws(State(state): State<ServerState>, ws: WebSocketUpgrade) -> impl IntoResponse {
    ws.on_upgrade(move |socket| ws_session(socket, state))
}

async fn ws_session(socket: WebSocket, state: ServerState) {
    let conn_id = Uuid::new_v4();
    let (mut sink, mut stream) = socket.split();

    tracing::info!(%conn_id, "WebSocket connected");

    // Outbound queue: room forwarders push, this loop drains.
    let (out_tx, mut out_rx) = mpsc::channel::<ServerMessage>(OUTBOUND_QUEUE);

    // roomKey → forwarder task of this connection's subscription
    let mut joined: HashMap<RoomKey, JoinHandle<()>> = HashMap::new();

    let mut ping_interval = tokio::time::interval(Duration::from_secs(30));
    ping_interval.tick().await; // skip immediate

    loop {
        tokio::select! {
            _ = ping_interval.tick() => {
                if sink.send(Message::Ping(vec![].into())).await.is_err() {
                    break;
                }
            }

            outbound = out_rx.recv() => {
                match outbound {
                    Some(msg) => {
                        if send_message(&mut sink, &msg).await.is_err() {
                            break;
                        }
                        // Older driver builds listen for the legacy
                        // event name; emit it alongside.
                        if let Some(frame) = legacy_alias_frame(&msg)
                            && sink.send(Message::Text(frame.into())).await.is_err()
                        {
                            break;
                        }
                    }
                    None => break,
                }
            }

            incoming = stream.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        handle_client_frame(&text, &state, conn_id, &out_tx, &mut joined);
                    }
                    Some(Ok(Message::Ping(data))) => {
                        let _ = sink.send(Message::Pong(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => {
                        tracing::info!(%conn_id, "WebSocket disconnected");
                        break;
                    }
                    Some(Err(e)) => {
                        tracing::warn!(%conn_id, "WebSocket error: {e}");
                        break;
                    }
                    _ => {} // Binary, Pong — ignore
                }
            }
        }
    }

    // Cleanup: leaving every room is just dropping our receivers.
    for (_, forwarder) in joined.drain() {
        forwarder.abort();
    }
    let _ = sink.close().await;

    tracing::info!(%conn_id, "WebSocket session cleaned up");
}

fn handle_client_frame(
    text: &str,
    state: &ServerState,
    conn_id: Uuid,
    out_tx: &mpsc::Sender<ServerMessage>,
    joined: &mut HashMap<RoomKey, JoinHandle<()>>,
) {
    let msg: ClientMessage = match serde_json::from_str(text) {
        Ok(m) => m,
        Err(e) => {
            tracing::warn!(%conn_id, "Invalid client frame: {e}");
            return;
        }
    };

    match msg {
        ClientMessage::JoinOrder { order_id } => {
            join_room(state, RoomKey::Order(order_id), conn_id, out_tx, joined);
        }
        ClientMessage::LeaveOrder { order_id } => {
            leave_room(RoomKey::Order(order_id), conn_id, joined);
        }
        ClientMessage::JoinStore { store_id } => {
            join_room(state, RoomKey::Store(store_id), conn_id, out_tx, joined);
        }
        ClientMessage::LeaveStore { store_id } => {
            leave_room(RoomKey::Store(store_id), conn_id, joined);
        }
        ClientMessage::JoinCustomer { user_id } => {
            join_room(state, RoomKey::Customer(user_id), conn_id, out_tx, joined);
        }
        ClientMessage::SubmitLocation(ping) => {
            // Rejections are logged inside; the rider session just
            // sends the next ping.
            let _ = state.ingest.submit(ping);
        }
    }
}

/// Join a room and start its forwarder. Idempotent per connection.
fn join_room(
    state: &ServerState,
    key: RoomKey,
    conn_id: Uuid,
    out_tx: &mpsc::Sender<ServerMessage>,
    joined: &mut HashMap<RoomKey, JoinHandle<()>>,
) {
    if joined.contains_key(&key) {
        return;
    }

    let JoinedRoom { mut rx, replay } = state.hub.join(key);
    let out = out_tx.clone();

    let forwarder = tokio::spawn(async move {
        // Replay first, so a late joiner sees continuity before any
        // live push.
        if let Some(event) = replay
            && out.send(convert_hub_event(event)).await.is_err()
        {
            return;
        }
        loop {
            match rx.recv().await {
                Ok(event) => {
                    if out.send(convert_hub_event(event)).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(%conn_id, room = %key, lagged = n, "slow subscriber skipped events");
                }
                Err(broadcast::error::RecvError::Closed) => break,
            }
        }
    });

    joined.insert(key, forwarder);
    tracing::debug!(%conn_id, room = %key, "room joined");
}

fn leave_room(key: RoomKey, conn_id: Uuid, joined: &mut HashMap<RoomKey, JoinHandle<()>>) {
    if let Some(forwarder) = joined.remove(&key) {
        forwarder.abort();
        tracing::debug!(%conn_id, room = %key, "room left");
    }
}

/// 将 HubEvent 转换为线上的 ServerMessage
fn convert_hub_event(event: HubEvent) -> ServerMessage {
    match event {
        HubEvent::RiderLocation {
            order_id,
            lat,
            lng,
            captured_at,
            distance_meters,
            eta_minutes,
        } => ServerMessage::RiderLocationUpdated {
            order_id,
            latitude: lat,
            longitude: lng,
            timestamp: captured_at,
            distance_meters,
            eta_minutes,
        },
        HubEvent::LocationHistory { order_id, points } => {
            ServerMessage::LocationHistory { order_id, points }
        }
        HubEvent::StatusChanged {
            order_id,
            status,
            timestamp,
        } => ServerMessage::StatusChanged {
            order_id,
            status,
            timestamp,
        },
        HubEvent::SlaUpdated {
            order_id,
            color,
            elapsed_minutes,
            remaining_minutes,
        } => ServerMessage::SlaUpdated {
            order_id,
            color,
            elapsed_minutes,
            remaining_minutes,
        },
        HubEvent::InventoryUpdated {
            product_id,
            store_id,
            quantity,
        } => ServerMessage::InventoryUpdated {
            product_id,
            store_id,
            quantity,
        },
    }
}

/// Duplicate location pushes under the legacy `driver-location-updated`
/// event name for older driver/admin builds.
fn legacy_alias_frame(msg: &ServerMessage) -> Option<String> {
    if !matches!(msg, ServerMessage::RiderLocationUpdated { .. }) {
        return None;
    }
    let mut value = serde_json::to_value(msg).ok()?;
    value["event"] = serde_json::Value::String("driver-location-updated".to_string());
    serde_json::to_string(&value).ok()
}

async fn send_message<S>(sink: &mut S, msg: &ServerMessage) -> Result<(), ()>
where
    S: futures::Sink<Message, Error = axum::Error> + Unpin,
{
    let json = serde_json::to_string(msg).map_err(|_| ())?;
    sink.send(Message::Text(json.into())).await.map_err(|_| ())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_alias_only_for_location_updates() {
        let location = ServerMessage::RiderLocationUpdated {
            order_id: Some(42),
            latitude: 26.3,
            longitude: 50.2,
            timestamp: 1_000,
            distance_meters: None,
            eta_minutes: Some(5),
        };
        let frame = legacy_alias_frame(&location).unwrap();
        assert!(frame.contains("\"driver-location-updated\""));
        assert!(frame.contains("\"orderId\":42"));

        let status = ServerMessage::StatusChanged {
            order_id: 42,
            status: shared::models::OrderStatus::Accepted,
            timestamp: 1_000,
        };
        assert!(legacy_alias_frame(&status).is_none());
    }
}
