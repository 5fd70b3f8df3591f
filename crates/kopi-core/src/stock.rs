//! # Stock Ledger Rules
//!
//! Every change to `products.stock_quantity` is paired with one append-only
//! [`StockHistory`] row. This module decides what that row looks like; the
//! database layer writes both in a single transaction.
//!
//! ## Sign Rules
//! ```text
//!   change type   quantity_change
//!   ───────────   ───────────────
//!   initial       >= 0
//!   restock       >  0
//!   return        >  0
//!   sale          <= 0   (floored, see sale_deduction)
//!   waste         <  0
//!   adjustment    != 0
//! ```
//! `new_quantity = previous_quantity + quantity_change` and never drops below
//! zero.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult};
use crate::types::{StockChangeType, StockHistory};

/// A planned stock change, not yet written.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockMovement {
    pub product_id: String,
    pub change_type: StockChangeType,
    pub quantity_change: i64,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub reason: Option<String>,
    pub reference_id: Option<String>,
}

impl StockMovement {
    /// The ledger row for this movement.
    pub fn into_history(self, id: String, created_at: DateTime<Utc>) -> StockHistory {
        StockHistory {
            id,
            product_id: self.product_id,
            change_type: self.change_type,
            quantity_change: self.quantity_change,
            previous_quantity: self.previous_quantity,
            new_quantity: self.new_quantity,
            reason: self.reason,
            reference_id: self.reference_id,
            created_at,
        }
    }
}

fn rejected(product_id: &str, reason: impl Into<String>) -> CoreError {
    CoreError::InvalidStockMovement {
        product_id: product_id.to_string(),
        reason: reason.into(),
    }
}

/// Plans a manual movement (restock, waste, adjustment, ...).
///
/// Sales go through [`sale_deduction`] instead, which floors rather than
/// rejecting.
pub fn movement(
    product_id: &str,
    previous_quantity: i64,
    quantity_change: i64,
    change_type: StockChangeType,
    reason: Option<String>,
) -> CoreResult<StockMovement> {
    let sign_ok = match change_type {
        StockChangeType::Initial => quantity_change >= 0,
        StockChangeType::Restock | StockChangeType::Return => quantity_change > 0,
        StockChangeType::Waste => quantity_change < 0,
        StockChangeType::Adjustment => quantity_change != 0,
        StockChangeType::Sale => {
            return Err(rejected(product_id, "sales are recorded by order submission"));
        }
    };
    if !sign_ok {
        return Err(rejected(
            product_id,
            format!("quantity change {} is not valid for {:?}", quantity_change, change_type),
        ));
    }

    let new_quantity = previous_quantity
        .checked_add(quantity_change)
        .ok_or_else(|| rejected(product_id, "quantity overflow"))?;
    if new_quantity < 0 {
        return Err(rejected(
            product_id,
            format!("only {} in stock, cannot remove {}", previous_quantity, -quantity_change),
        ));
    }

    Ok(StockMovement {
        product_id: product_id.to_string(),
        change_type,
        quantity_change,
        previous_quantity,
        new_quantity,
        reason,
        reference_id: None,
    })
}

/// Stock taken by an order. Never goes below zero: selling 5 with 3 on hand
/// records a change of -3.
pub fn sale_deduction(product_id: &str, previous_quantity: i64, sold: i64, order_id: &str) -> StockMovement {
    let on_hand = previous_quantity.max(0);
    let taken = sold.max(0).min(on_hand);
    StockMovement {
        product_id: product_id.to_string(),
        change_type: StockChangeType::Sale,
        quantity_change: -taken,
        previous_quantity,
        new_quantity: on_hand - taken,
        reason: None,
        reference_id: Some(order_id.to_string()),
    }
}

/// Units to deduct per stock-tracked product, summed across lines.
///
/// Ordered by product id so concurrent submissions touch rows in the same
/// order.
pub fn demand_from_cart(cart: &Cart) -> Vec<(String, i64)> {
    let mut demand: BTreeMap<&str, i64> = BTreeMap::new();
    for line in cart.lines.iter().filter(|l| l.track_stock) {
        *demand.entry(line.key.product_id.as_str()).or_default() += line.quantity;
    }
    demand
        .into_iter()
        .map(|(product_id, qty)| (product_id.to_string(), qty))
        .collect()
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cart::tests::{add_on, product};
    use crate::types::DiningType;

    #[test]
    fn test_sale_floors_at_zero() {
        let m = sale_deduction("kaya-toast", 3, 5, "order-1");
        assert_eq!(m.quantity_change, -3);
        assert_eq!(m.new_quantity, 0);
        assert_eq!(m.reference_id.as_deref(), Some("order-1"));

        let m = sale_deduction("kaya-toast", 10, 4, "order-2");
        assert_eq!(m.new_quantity, 6);
        assert_eq!(m.previous_quantity + m.quantity_change, m.new_quantity);
    }

    #[test]
    fn test_sale_with_nothing_on_hand() {
        let m = sale_deduction("kaya-toast", 0, 2, "order-3");
        assert_eq!(m.quantity_change, 0);
        assert_eq!(m.new_quantity, 0);
    }

    #[test]
    fn test_movement_sign_rules() {
        assert!(movement("p", 5, 10, StockChangeType::Restock, None).is_ok());
        assert!(movement("p", 5, -1, StockChangeType::Restock, None).is_err());
        assert!(movement("p", 5, -2, StockChangeType::Waste, None).is_ok());
        assert!(movement("p", 5, 2, StockChangeType::Waste, None).is_err());
        assert!(movement("p", 5, 0, StockChangeType::Adjustment, None).is_err());
        assert!(movement("p", 0, 0, StockChangeType::Initial, None).is_ok());
        assert!(movement("p", 5, -1, StockChangeType::Sale, None).is_err());
    }

    #[test]
    fn test_movement_never_negative() {
        let err = movement("p", 2, -3, StockChangeType::Adjustment, Some("count".to_string()));
        assert!(matches!(err, Err(CoreError::InvalidStockMovement { .. })));

        let m = movement("p", 2, -2, StockChangeType::Waste, Some("spilled".to_string())).unwrap();
        assert_eq!(m.new_quantity, 0);
        let history = m.into_history("h-1".to_string(), Utc::now());
        assert_eq!(history.change_type, StockChangeType::Waste);
        assert_eq!(history.reason.as_deref(), Some("spilled"));
    }

    #[test]
    fn test_demand_sums_lines_of_tracked_products() {
        let mut cart = Cart::new(DiningType::Takeaway);
        let croissant = product("croissant", 800);
        let mut latte = product("latte", 1000);
        latte.track_stock = false;

        cart.add(&croissant, None, &[], "", 2).unwrap();
        cart.add(&croissant, None, &[], "warm it up", 1).unwrap();
        cart.add(&latte, None, &[add_on("latte", "oat", 150)], "", 3).unwrap();

        assert_eq!(demand_from_cart(&cart), vec![("croissant".to_string(), 3)]);
    }
}
