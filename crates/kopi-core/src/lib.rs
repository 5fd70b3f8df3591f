//! # kopi-core: Pure Business Logic for Kopi POS
//!
//! Everything the café counter and the customer menu agree on: how a cart is
//! priced, what an order must contain before it is accepted, and how an order
//! moves from the till to the kitchen pass.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Kopi POS Architecture                           │
//! │                                                                         │
//! │   POS terminal        Customer phone        Kitchen display             │
//! │        │                    │                     │                     │
//! │        └──────── HTTP / WebSocket (kopi-server) ──┘                     │
//! │                             │                                           │
//! │  ┌──────────────────────────▼──────────────────────────────────────┐   │
//! │  │               ★ kopi-core (THIS CRATE) ★                        │   │
//! │  │                                                                 │   │
//! │  │   cart ──► pricing ──► checkout ──► status                      │   │
//! │  │     │                      │                                    │   │
//! │  │   parked                 stock          table   validation      │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK                             │   │
//! │  └──────────────────────────┬──────────────────────────────────────┘   │
//! │                             │                                           │
//! │  ┌──────────────────────────▼──────────────────────────────────────┐   │
//! │  │                 kopi-db (SQLite repositories)                   │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`money`] - Ringgit amounts as integer sen
//! - [`types`] - Menu, fee, discount, order and ledger records
//! - [`cart`] - Cart engine: line merging, quantities, limits
//! - [`pricing`] - Fee compounding and discounts
//! - [`checkout`] - Customer and payment checks, order assembly
//! - [`status`] - Order status machine, tracking and kitchen queue
//! - [`stock`] - Stock ledger rules
//! - [`parked`] - Carts set aside on a terminal
//! - [`table`] - Table codes and QR scanner errors
//! - [`validation`] - Field rules
//!
//! ## Example Usage
//!
//! ```rust
//! use kopi_core::money::Money;
//! use kopi_core::types::Rate;
//!
//! let subtotal = Money::from_ringgit(100);
//! let service = subtotal.percentage(Rate::from_bps(1000)); // 10%
//!
//! assert_eq!(service.to_string(), "RM10.00");
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod cart;
pub mod checkout;
pub mod error;
pub mod money;
pub mod parked;
pub mod pricing;
pub mod status;
pub mod stock;
pub mod table;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use cart::{Cart, CartLine, LineKey};
pub use error::{CoreError, CoreResult, DiscountRejection, ValidationError};
pub use money::Money;
pub use pricing::{Discount, PriceSummary};
pub use status::OrderStatus;
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Maximum distinct lines in a single cart.
pub const MAX_CART_ITEMS: usize = 100;

/// Maximum quantity on one cart line.
///
/// Catches a mistyped 1000 where 10 was meant.
pub const MAX_ITEM_QUANTITY: i64 = 999;
