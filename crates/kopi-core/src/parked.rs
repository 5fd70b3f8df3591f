//! # Parked Orders
//!
//! A cashier can set the current cart aside ("park" it), serve someone else,
//! then resume it. Parked carts belong to one terminal and keep their prices,
//! discount and dining type exactly as they were.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use uuid::Uuid;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult, ValidationError};
use crate::money::Money;

/// A cart set aside on a terminal.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ParkedOrder {
    pub id: String,
    pub label: String,
    pub cart: Cart,
    #[ts(as = "String")]
    pub parked_at: DateTime<Utc>,
}

impl ParkedOrder {
    pub fn total(&self) -> Money {
        self.cart.total()
    }
}

/// Parked carts of one terminal, oldest first.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ParkedOrders {
    orders: Vec<ParkedOrder>,
}

impl ParkedOrders {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parks `cart` under `label`. A blank label becomes "Order N".
    pub fn park(&mut self, label: &str, cart: Cart) -> CoreResult<&ParkedOrder> {
        if cart.is_empty() {
            return Err(CoreError::EmptyCart);
        }
        let label = label.trim();
        validate_label(label)?;
        let label = if label.is_empty() {
            format!("Order {}", self.orders.len() + 1)
        } else {
            label.to_string()
        };

        self.orders.push(ParkedOrder {
            id: Uuid::new_v4().to_string(),
            label,
            cart,
            parked_at: Utc::now(),
        });
        // just pushed
        Ok(&self.orders[self.orders.len() - 1])
    }

    pub fn list(&self) -> &[ParkedOrder] {
        &self.orders
    }

    pub fn len(&self) -> usize {
        self.orders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.orders.is_empty()
    }

    /// Removes and returns the parked cart.
    pub fn resume(&mut self, id: &str) -> CoreResult<Cart> {
        self.take(id).map(|parked| parked.cart)
    }

    /// Drops a parked cart without resuming it.
    pub fn discard(&mut self, id: &str) -> CoreResult<()> {
        self.take(id).map(|_| ())
    }

    fn take(&mut self, id: &str) -> CoreResult<ParkedOrder> {
        let idx = self
            .orders
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| CoreError::ParkedOrderNotFound(id.to_string()))?;
        Ok(self.orders.remove(idx))
    }

    /// Checks parked carts that came from an imported session.
    pub fn check_integrity(&self) -> CoreResult<()> {
        for (idx, parked) in self.orders.iter().enumerate() {
            validate_label(&parked.label)?;
            if parked.cart.is_empty() {
                return Err(CoreError::EmptyCart);
            }
            if self.orders[..idx].iter().any(|p| p.id == parked.id) {
                return Err(ValidationError::InvalidFormat {
                    field: "parked id".to_string(),
                    reason: format!("{} appears twice", parked.id),
                }
                .into());
            }
            parked.cart.check_integrity()?;
        }
        Ok(())
    }

    pub fn carts_mut(&mut self) -> impl Iterator<Item = &mut Cart> {
        self.orders.iter_mut().map(|p| &mut p.cart)
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }
}

fn validate_label(label: &str) -> CoreResult<()> {
    if label.trim().chars().count() > 50 {
        return Err(ValidationError::TooLong {
            field: "label".to_string(),
            max: 50,
        }
        .into());
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
