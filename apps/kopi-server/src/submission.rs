//! # Order Submission
//!
//! Turns a priced cart and a checkout form into a stored order.
//!
//! ## Submission Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        submit(cart, request)                            │
//! │                                                                         │
//! │  1. Load active fees                                                    │
//! │  2. Re-check the discount code against current usage                    │
//! │  3. price() + build_order()  ── any failure: nothing is written         │
//! │  4. INSERT order                                                        │
//! │  ─────────────────────────── order exists from here on ──────────────── │
//! │  5. Deduct stock per tracked product  ─┐                                │
//! │  6. Accumulate customer totals         ├─ failures become warnings      │
//! │  7. Increment discount code usage     ─┘                                │
//! │  8. Publish OrderEvent::Created                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Steps 5 to 7 are separate writes after the insert and are never rolled
//! back; a failure there is logged and returned in `warnings` so the cashier
//! can reconcile by hand. Submitting the same cart twice creates two orders.

use chrono::Utc;
use kopi_core::cart::Cart;
use kopi_core::checkout::{build_order, CheckoutRequest};
use kopi_core::pricing::{check_discount_code, price, subtotal_with_fees};
use kopi_core::stock::demand_from_cart;
use kopi_core::{CoreError, Discount, DiscountRejection, Fee, Order, OrderSource};
use kopi_db::Database;
use serde::Serialize;
use tracing::{info, warn};

use crate::error::ApiResult;
use crate::state::{AppState, OrderEvent};

/// The stored order plus anything that went wrong after it was stored.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionResult {
    pub order: Order,
    pub warnings: Vec<String>,
}

/// Submits `cart` as a new order.
pub async fn submit(
    state: &AppState,
    cart: &Cart,
    request: &CheckoutRequest,
    source: OrderSource,
) -> ApiResult<SubmissionResult> {
    let db = &state.db;
    let now = Utc::now();

    let fees = db.fees().list_active().await?;
    let cart = refresh_discount(db, cart, &fees, now).await?;

    let summary = price(&cart, &fees);
    let order = build_order(&cart, &summary, request, source, now)?;

    db.orders().insert(&order).await?;
    info!(
        order_id = %order.id,
        order_number = %order.order_number,
        source = ?order.source,
        dining_type = %order.dining_type,
        status = %order.status,
        total = %order.total(),
        "Order created"
    );

    let mut warnings = Vec::new();

    for (product_id, quantity) in demand_from_cart(&cart) {
        if let Err(e) = db.stock().deduct_for_sale(&product_id, quantity, &order.id).await {
            warn!(order_id = %order.id, product_id = %product_id, error = %e, "Stock deduction failed");
            warnings.push(format!("Stock for product {} was not deducted: {}", product_id, e));
        }
    }

    if let Some(phone) = &order.customer_phone {
        let name = order.customer_name.as_deref().unwrap_or("Guest");
        if let Err(e) = db.customers().record_order(name, phone, order.total(), order.created_at).await {
            warn!(order_id = %order.id, error = %e, "Customer totals not updated");
            warnings.push(format!("Customer record was not updated: {}", e));
        }
    }

    if let Some(code) = &order.discount_code {
        if let Err(e) = db.discounts().increment_usage(code).await {
            warn!(order_id = %order.id, code = %code, error = %e, "Discount usage not incremented");
            warnings.push(format!("Usage of discount code {} was not recorded: {}", code, e));
        }
    }

    state.events.publish(OrderEvent::created(&order));

    Ok(SubmissionResult { order, warnings })
}

/// Reloads a coded discount so usage limits and expiry are checked against
/// the stored row rather than the copy taken when the code was applied.
async fn refresh_discount(db: &Database, cart: &Cart, fees: &[Fee], now: chrono::DateTime<Utc>) -> ApiResult<Cart> {
    let mut cart = cart.clone();
    let Some(Discount::Code { code }) = &cart.discount else {
        return Ok(cart);
    };

    let fresh = db
        .discounts()
        .get_by_code(&code.code)
        .await?
        .ok_or_else(|| CoreError::DiscountRejected {
            code: code.code.clone(),
            reason: DiscountRejection::Inactive,
        })?;

    let with_fees = subtotal_with_fees(cart.total(), fees, cart.dining_type);
    check_discount_code(&fresh, with_fees, cart.dining_type, now)?;
    cart.set_discount(Discount::Code { code: fresh });
    Ok(cart)
}
