//! # Repository Module
//!
//! One repository per aggregate, each a thin wrapper around a cloned
//! `SqlitePool`.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  axum handler                                                           │
//! │       │   db.orders().list_by_status(&[Pending, Preparing])             │
//! │       ▼                                                                 │
//! │  OrderRepository                                                        │
//! │  ├── insert(&order)                                                     │
//! │  ├── get_by_id(id)                                                      │
//! │  └── update_status(id, from, to)                                        │
//! │       │   SQL (runtime query_as + FromRow)                              │
//! │       ▼                                                                 │
//! │  SQLite                                                                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`ProductRepository`](product::ProductRepository) - Menu, sizes, add-ons
//! - [`OrderRepository`](order::OrderRepository) - Orders and status updates
//! - [`StockRepository`](stock::StockRepository) - Stock ledger
//! - [`CustomerRepository`](customer::CustomerRepository) - Returning customers
//! - [`DiscountRepository`](discount::DiscountRepository) - Discount codes
//! - [`FeeRepository`](fee::FeeRepository) - Service charges and taxes
//! - [`PromoRepository`](promo::PromoRepository) - Menu banners
//! - [`StaffRepository`](staff::StaffRepository) - Staff accounts

pub mod customer;
pub mod discount;
pub mod fee;
pub mod order;
pub mod product;
pub mod promo;
pub mod staff;
pub mod stock;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::DbResult;

/// Encodes a list-valued column.
pub(crate) fn to_json<T: Serialize + ?Sized>(value: &T) -> DbResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decodes a list-valued column. Empty text reads as the default.
pub(crate) fn from_json<T: DeserializeOwned + Default>(text: &str) -> DbResult<T> {
    if text.trim().is_empty() {
        return Ok(T::default());
    }
    Ok(serde_json::from_str(text)?)
}

#[cfg(test)]
pub(crate) mod fixtures {
    use chrono::Utc;
    use kopi_core::{Product, ProductSize, SizeName};

    use crate::{Database, DbConfig};

    pub async fn db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    pub fn product(id: &str, price_sen: i64, stock_quantity: i64, track_stock: bool) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: id.replace('-', " "),
            description: None,
            price_sen,
            category_id: None,
            tags: vec!["signature".to_string()],
            allergens: vec![],
            stock_quantity,
            track_stock,
            show_in_kitchen: true,
            active: true,
            rating: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn size(product_id: &str, size_name: SizeName, bps: u32) -> ProductSize {
        ProductSize {
            id: format!("{}-{}", product_id, size_name),
            product_id: product_id.to_string(),
            size_name,
            price_multiplier_bps: bps,
            price_override_sen: None,
            active: true,
        }
    }
}
