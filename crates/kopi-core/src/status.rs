//! # Order Status Machine
//!
//! One status vocabulary shared by the cashier screen, the kitchen display
//! and the customer tracking page.
//!
//! ## Flows
//! ```text
//!  progress        0               1              2                 3                  4
//!  ─────────────────────────────────────────────────────────────────────────────────────────
//!  customer QR     payment_verif → payment_verif'd → preparing     → ready             → completed
//!  counter         pending ─────────────────────→ preparing     → ready             → completed
//!  reservation     payment_verif → payment_verif'd → reservation_  → reservation_ready → completed
//!                                                   confirmed
//!
//!  any non-terminal state ──→ cancelled (terminal, no progress index)
//! ```
//!
//! Transitions are staff button presses; [`OrderStatus::transition_to`] refuses
//! anything not drawn above. The only time-based behaviour is the kitchen's
//! urgent highlight, see [`is_urgent`].

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::types::{DiningType, Order, OrderItemSnapshot, OrderSource, PaymentMethod};

/// Minutes after which a kitchen ticket is highlighted as urgent.
pub const DEFAULT_URGENT_AFTER_MINUTES: i64 = 15;

const STANDARD_STEPS: [&str; 5] = [
    "Payment Verification",
    "Payment Verified",
    "Preparing",
    "Ready",
    "Completed",
];

const RESERVATION_STEPS: [&str; 5] = [
    "Payment Verification",
    "Payment Verified",
    "Reservation Confirmed",
    "Reservation Ready",
    "Completed",
];

// =============================================================================
// Order Status
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderStatus {
    Pending,
    PaymentVerification,
    PaymentVerified,
    Preparing,
    Ready,
    Completed,
    Cancelled,
    ReservationConfirmed,
    ReservationReady,
}

impl OrderStatus {
    pub const ALL: [OrderStatus; 9] = [
        OrderStatus::Pending,
        OrderStatus::PaymentVerification,
        OrderStatus::PaymentVerified,
        OrderStatus::Preparing,
        OrderStatus::Ready,
        OrderStatus::Completed,
        OrderStatus::Cancelled,
        OrderStatus::ReservationConfirmed,
        OrderStatus::ReservationReady,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            OrderStatus::Pending => "pending",
            OrderStatus::PaymentVerification => "payment_verification",
            OrderStatus::PaymentVerified => "payment_verified",
            OrderStatus::Preparing => "preparing",
            OrderStatus::Ready => "ready",
            OrderStatus::Completed => "completed",
            OrderStatus::Cancelled => "cancelled",
            OrderStatus::ReservationConfirmed => "reservation_confirmed",
            OrderStatus::ReservationReady => "reservation_ready",
        }
    }

    /// Position on the tracking page's progress bar.
    ///
    /// Reservation states share positions with the standard flow.
    /// `None` for cancelled orders.
    pub fn progress_index(&self) -> Option<usize> {
        match self {
            OrderStatus::Pending | OrderStatus::PaymentVerification => Some(0),
            OrderStatus::PaymentVerified => Some(1),
            OrderStatus::Preparing | OrderStatus::ReservationConfirmed => Some(2),
            OrderStatus::Ready | OrderStatus::ReservationReady => Some(3),
            OrderStatus::Completed => Some(4),
            OrderStatus::Cancelled => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, OrderStatus::Completed | OrderStatus::Cancelled)
    }

    /// States shown on the kitchen display.
    ///
    /// A `payment_verified` order joins the queue once staff move it to
    /// `preparing`.
    pub fn is_kitchen_visible(&self) -> bool {
        match self {
            OrderStatus::Pending | OrderStatus::Preparing | OrderStatus::ReservationConfirmed => true,
            OrderStatus::PaymentVerification
            | OrderStatus::PaymentVerified
            | OrderStatus::Ready
            | OrderStatus::Completed
            | OrderStatus::Cancelled
            | OrderStatus::ReservationReady => false,
        }
    }

    /// Statuses reachable from this one by a staff action.
    pub fn next_statuses(&self) -> &'static [OrderStatus] {
        use OrderStatus::*;
        match self {
            Pending => &[Preparing, Cancelled],
            PaymentVerification => &[PaymentVerified, ReservationConfirmed, Cancelled],
            PaymentVerified => &[Preparing, ReservationConfirmed, Cancelled],
            Preparing => &[Ready, Cancelled],
            Ready => &[Completed, Cancelled],
            ReservationConfirmed => &[ReservationReady, Cancelled],
            ReservationReady => &[Completed, Cancelled],
            Completed | Cancelled => &[],
        }
    }

    pub fn can_transition_to(&self, next: OrderStatus) -> bool {
        self.next_statuses().contains(&next)
    }

    /// Validates a staff-driven status change.
    pub fn transition_to(self, next: OrderStatus) -> CoreResult<OrderStatus> {
        if self.can_transition_to(next) {
            Ok(next)
        } else {
            Err(CoreError::InvalidStatusTransition {
                from: self,
                to: next,
            })
        }
    }

    /// Status a freshly submitted order starts in.
    ///
    /// Customer QR payments wait for a cashier to check the proof. Everything
    /// else was paid (or will be paid) at the counter and goes straight to
    /// the kitchen.
    pub fn initial(source: OrderSource, method: PaymentMethod, dining: DiningType) -> OrderStatus {
        let needs_verification = source == OrderSource::Customer && method == PaymentMethod::Qr;
        match (needs_verification, dining) {
            (true, _) => OrderStatus::PaymentVerification,
            (false, DiningType::Reservation) => OrderStatus::ReservationConfirmed,
            (false, DiningType::DineIn | DiningType::Takeaway) => OrderStatus::Pending,
        }
    }

    /// Where an order goes once the cashier accepts its payment proof.
    pub fn after_payment_verified(dining: DiningType) -> OrderStatus {
        match dining {
            DiningType::Reservation => OrderStatus::ReservationConfirmed,
            DiningType::DineIn | DiningType::Takeaway => OrderStatus::PaymentVerified,
        }
    }
}

impl fmt::Display for OrderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for OrderStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        OrderStatus::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: OrderStatus::ALL.iter().map(|s| s.as_str().to_string()).collect(),
            })
    }
}

// =============================================================================
// Tracking View
// =============================================================================

/// What the customer tracking page renders.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct TrackingView {
    pub order_id: String,
    pub order_number: String,
    pub status: OrderStatus,
    pub label: String,
    pub progress_index: Option<usize>,
    pub steps: Vec<String>,
    pub cancelled: bool,
}

impl TrackingView {
    pub fn for_order(order: &Order) -> Self {
        let steps = match order.dining_type {
            DiningType::Reservation => RESERVATION_STEPS,
            DiningType::DineIn | DiningType::Takeaway => STANDARD_STEPS,
        };
        let progress_index = order.status.progress_index();
        let label = match progress_index {
            Some(idx) => steps[idx].to_string(),
            None => "Cancelled".to_string(),
        };
        TrackingView {
            order_id: order.id.clone(),
            order_number: order.order_number.clone(),
            status: order.status,
            label,
            progress_index,
            steps: steps.iter().map(|s| s.to_string()).collect(),
            cancelled: order.status == OrderStatus::Cancelled,
        }
    }
}

// =============================================================================
// Kitchen Queue
// =============================================================================

/// An order as it appears on the kitchen display.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct KitchenTicket {
    pub order_id: String,
    pub order_number: String,
    pub table_number: Option<String>,
    pub dining_type: DiningType,
    pub customer_name: Option<String>,
    pub status: OrderStatus,
    pub items: Vec<OrderItemSnapshot>,
    pub minutes_waiting: i64,
    pub urgent: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

/// Whether an order placed at `created_at` is overdue at `now`.
pub fn is_urgent(created_at: DateTime<Utc>, now: DateTime<Utc>, urgent_after_minutes: i64) -> bool {
    now - created_at > Duration::minutes(urgent_after_minutes)
}

/// Builds the kitchen queue.
///
/// Keeps kitchen-visible orders of the requested dining type, trims each to the
/// lines whose product is flagged `show_in_kitchen`, and drops orders left with
/// no lines. Oldest first.
pub fn kitchen_queue(
    orders: &[Order],
    dining_filter: Option<DiningType>,
    kitchen_products: &HashSet<String>,
    now: DateTime<Utc>,
    urgent_after_minutes: i64,
) -> Vec<KitchenTicket> {
    let mut tickets: Vec<KitchenTicket> = orders
        .iter()
        .filter(|o| o.status.is_kitchen_visible())
        .filter(|o| dining_filter.map_or(true, |d| o.dining_type == d))
        .filter_map(|o| {
            let items: Vec<OrderItemSnapshot> = o
                .items
                .iter()
                .filter(|i| kitchen_products.contains(&i.product_id))
                .cloned()
                .collect();
            if items.is_empty() {
                return None;
            }
            Some(KitchenTicket {
                order_id: o.id.clone(),
                order_number: o.order_number.clone(),
                table_number: o.table_number.clone(),
                dining_type: o.dining_type,
                customer_name: o.customer_name.clone(),
                status: o.status,
                items,
                minutes_waiting: (now - o.created_at).num_minutes(),
                urgent: is_urgent(o.created_at, now, urgent_after_minutes),
                created_at: o.created_at,
            })
        })
        .collect();
    tickets.sort_by_key(|t| t.created_at);
    tickets
}

// =============================================================================
// Unit Tests
// =============================================================================
