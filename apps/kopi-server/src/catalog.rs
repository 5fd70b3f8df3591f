//! # Catalog Lookups
//!
//! Turns a menu selection (ids and a size name) into the catalog rows the
//! cart engine prices from. Shared by the POS cart routes and the customer
//! self-order route.

use kopi_core::cart::Cart;
use kopi_core::{AddOn, CoreError, DiningType, Product, ProductSize, SizeName};
use kopi_db::Database;
use serde::Deserialize;

use crate::error::ApiResult;

/// One menu selection as sent by a client.
#[derive(Debug, Clone, Deserialize)]
pub struct Selection {
    pub product_id: String,
    #[serde(default)]
    pub size: Option<SizeName>,
    #[serde(default)]
    pub add_on_ids: Vec<String>,
    #[serde(default)]
    pub notes: String,
    #[serde(default = "default_quantity")]
    pub quantity: i64,
}

fn default_quantity() -> i64 {
    1
}

/// Catalog rows behind a [`Selection`].
#[derive(Debug, Clone)]
pub struct Resolved {
    pub product: Product,
    pub size: Option<ProductSize>,
    pub add_ons: Vec<AddOn>,
}

/// Loads the product, size and add-ons a selection names.
///
/// Rows are returned even when inactive; `Cart::add` decides availability.
pub async fn resolve(db: &Database, selection: &Selection) -> ApiResult<Resolved> {
    let product = db
        .products()
        .get_by_id(&selection.product_id)
        .await?
        .ok_or_else(|| CoreError::ProductNotFound(selection.product_id.clone()))?;

    let size = match selection.size {
        Some(name) => {
            let size = db
                .products()
                .size_by_name(&product.id, name)
                .await?
                .ok_or_else(|| CoreError::SizeUnavailable {
                    product: product.name.clone(),
                    size: name.to_string(),
                })?;
            Some(size)
        }
        None => None,
    };

    let add_ons = if selection.add_on_ids.is_empty() {
        Vec::new()
    } else {
        let available = db.products().add_ons_for(&product.id).await?;
        let mut chosen = Vec::with_capacity(selection.add_on_ids.len());
        for id in &selection.add_on_ids {
            let add_on = available
                .iter()
                .find(|a| &a.id == id)
                .cloned()
                .ok_or_else(|| CoreError::AddOnUnavailable {
                    product: product.name.clone(),
                    add_on: id.clone(),
                })?;
            chosen.push(add_on);
        }
        chosen
    };

    Ok(Resolved { product, size, add_ons })
}

/// Prices a list of selections from the current catalog into a fresh cart.
pub async fn cart_from_selections(db: &Database, dining: DiningType, selections: &[Selection]) -> ApiResult<Cart> {
    let mut resolved = Vec::with_capacity(selections.len());
    for selection in selections {
        resolved.push(resolve(db, selection).await?);
    }

    let mut cart = Cart::new(dining);
    for (selection, rows) in selections.iter().zip(&resolved) {
        cart.add(
            &rows.product,
            rows.size.as_ref(),
            &rows.add_ons,
            &selection.notes,
            selection.quantity,
        )?;
    }
    Ok(cart)
}

/// Rebuilds `cart` line by line from the current catalog.
///
/// Keeps dining type, discount and creation time; every price comes from the
/// catalog rows, never from the incoming lines.
pub async fn reprice(db: &Database, cart: &Cart) -> ApiResult<Cart> {
    let selections: Vec<Selection> = cart
        .lines
        .iter()
        .map(|line| Selection {
            product_id: line.key.product_id.clone(),
            size: line.key.size,
            add_on_ids: line.key.add_on_ids.clone(),
            notes: line.key.notes.clone(),
            quantity: line.quantity,
        })
        .collect();

    let mut repriced = cart_from_selections(db, cart.dining_type, &selections).await?;
    repriced.discount = cart.discount.clone();
    repriced.created_at = cart.created_at;
    Ok(repriced)
}
