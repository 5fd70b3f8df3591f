//! # Live Order Socket
//!
//! `GET /ws/orders[?order_id=...]` upgrades to a WebSocket that pushes an
//! [`OrderEvent`] JSON text frame for every order created or moved.
//!
//! ```text
//! ┌──────────────┐   broadcast    ┌──────────────┐   Text(json)   ┌──────────┐
//! │ OrderEvents  │───────────────►│ handle_socket│───────────────►│  client  │
//! └──────────────┘                │              │◄── Ping/Close ─│          │
//!                                 │   ping 30s   │──── Ping ─────►│          │
//!                                 └──────────────┘                └──────────┘
//! ```
//!
//! The kitchen display connects without a filter. A customer tracking page
//! passes its `order_id` and only sees that order.

use std::time::Duration;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Query, State};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use serde::Deserialize;
use tokio::sync::broadcast;
use tokio::time::interval;
use tracing::{debug, info, warn};

use crate::state::{AppState, OrderEvent};

/// Ping interval to keep idle connections open through proxies.
const PING_INTERVAL: Duration = Duration::from_secs(30);

/// Clients only send control frames; anything large is a mistake.
const MAX_MESSAGE_SIZE: usize = 64 * 1024;

#[derive(Debug, Default, Deserialize)]
pub struct SocketParams {
    pub order_id: Option<String>,
}

/// WebSocket upgrade handler.
#[tracing::instrument(name = "GET /ws/orders", skip(ws, state))]
pub async fn orders_socket(
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
    Query(params): Query<SocketParams>,
) -> impl IntoResponse {
    // subscribe before the upgrade so nothing published meanwhile is lost
    let rx = state.events.subscribe();
    let filter = params.order_id.filter(|id| !id.trim().is_empty());
    info!(order_id = ?filter, "Order socket opened");

    ws.max_message_size(MAX_MESSAGE_SIZE)
        .on_upgrade(move |socket| handle_socket(socket, rx, filter))
}

/// Serializes `event` for a socket, or `None` when the filter excludes it.
pub fn encode_event(event: &OrderEvent, order_filter: Option<&str>) -> Option<String> {
    if order_filter.is_some_and(|id| id != event.order_id) {
        return None;
    }
    match serde_json::to_string(event) {
        Ok(json) => Some(json),
        Err(e) => {
            warn!(order_id = %event.order_id, error = %e, "Order event could not be serialized");
            None
        }
    }
}

async fn handle_socket(socket: WebSocket, mut rx: broadcast::Receiver<OrderEvent>, filter: Option<String>) {
    let (mut sender, mut receiver) = socket.split();
    let mut ping = interval(PING_INTERVAL);
    // first tick fires immediately
    ping.tick().await;

    loop {
        tokio::select! {
            event = rx.recv() => match event {
                Ok(event) => {
                    let Some(json) = encode_event(&event, filter.as_deref()) else {
                        continue;
                    };
                    if sender.send(Message::Text(json.into())).await.is_err() {
                        break;
                    }
                }
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "Order socket lagged, skipping to newest events");
                    continue;
                }
                Err(broadcast::error::RecvError::Closed) => break,
            },
            incoming = receiver.next() => match incoming {
                Some(Ok(Message::Ping(data))) => {
                    if sender.send(Message::Pong(data)).await.is_err() {
                        break;
                    }
                }
                Some(Ok(Message::Close(_))) | None => break,
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    debug!(error = %e, "Order socket error");
                    break;
                }
            },
            _ = ping.tick() => {
                if sender.send(Message::Ping(axum::body::Bytes::new())).await.is_err() {
                    break;
                }
            }
        }
    }

    info!(order_id = ?filter, "Order socket closed");
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use kopi_core::{DiningType, OrderStatus};
    use crate::state::OrderEventKind;

    fn event(order_id: &str) -> OrderEvent {
        OrderEvent {
            kind: OrderEventKind::StatusChanged,
            order_id: order_id.to_string(),
            order_number: "261018-101500-0042".to_string(),
            dining_type: DiningType::DineIn,
            table_number: Some("4".to_string()),
            status: OrderStatus::Preparing,
            previous_status: Some(OrderStatus::Pending),
            progress_index: Some(2),
            label: "Preparing".to_string(),
            at: Utc::now(),
        }
    }

    #[test]
    fn test_unfiltered_socket_gets_every_event() {
        let json = encode_event(&event("o-1"), None).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["kind"], "status_changed");
        assert_eq!(value["status"], "preparing");
        assert_eq!(value["previous_status"], "pending");
        assert_eq!(value["progress_index"], 2);
    }

    #[test]
    fn test_filter_keeps_only_matching_order() {
        assert!(encode_event(&event("o-1"), Some("o-1")).is_some());
        assert!(encode_event(&event("o-2"), Some("o-1")).is_none());
    }
}
