//! # Order Events
//!
//! Live order updates for the kitchen display and customer tracking pages.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  submission / status route                                              │
//! │        │ publish(OrderEvent)                                            │
//! │        ▼                                                                │
//! │  broadcast::Sender<OrderEvent> (capacity 256)                           │
//! │        │                                                                │
//! │        ├──► /ws/orders socket (kitchen display)                         │
//! │        ├──► /ws/orders socket (tracking page, filters by order id)      │
//! │        └──► ...                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! A slow socket that falls behind skips the events it missed and picks up
//! from the newest; screens without a socket poll instead.

use chrono::{DateTime, Utc};
use kopi_core::status::TrackingView;
use kopi_core::{DiningType, Order, OrderStatus};
use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;
use tracing::debug;

const EVENT_CHANNEL_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderEventKind {
    Created,
    StatusChanged,
}

/// One change to one order, as pushed to subscribers.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderEvent {
    pub kind: OrderEventKind,
    pub order_id: String,
    pub order_number: String,
    pub dining_type: DiningType,
    pub table_number: Option<String>,
    pub status: OrderStatus,
    pub previous_status: Option<OrderStatus>,
    pub progress_index: Option<usize>,
    pub label: String,
    pub at: DateTime<Utc>,
}

impl OrderEvent {
    pub fn created(order: &Order) -> Self {
        Self::build(OrderEventKind::Created, order, None)
    }

    /// `order` must already carry the new status.
    pub fn status_changed(order: &Order, previous: OrderStatus) -> Self {
        Self::build(OrderEventKind::StatusChanged, order, Some(previous))
    }

    fn build(kind: OrderEventKind, order: &Order, previous_status: Option<OrderStatus>) -> Self {
        let view = TrackingView::for_order(order);
        OrderEvent {
            kind,
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            dining_type: order.dining_type,
            table_number: order.table_number.clone(),
            status: order.status,
            previous_status,
            progress_index: view.progress_index,
            label: view.label,
            at: order.updated_at,
        }
    }
}

/// Cloneable handle to the event channel.
#[derive(Debug, Clone)]
pub struct OrderEvents {
    tx: broadcast::Sender<OrderEvent>,
}

impl Default for OrderEvents {
    fn default() -> Self {
        Self::new()
    }
}

impl OrderEvents {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        OrderEvents { tx }
    }

    /// Sends to every current subscriber. Having none is not an error.
    pub fn publish(&self, event: OrderEvent) {
        let order_id = event.order_id.clone();
        match self.tx.send(event) {
            Ok(receivers) => debug!(order_id = %order_id, receivers, "Order event published"),
            Err(_) => debug!(order_id = %order_id, "Order event dropped, no subscribers"),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<OrderEvent> {
        self.tx.subscribe()
    }

    pub fn subscriber_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
