//! # Cart Engine
//!
//! Composes menu selections into priced cart lines.
//!
//! ## Line Identity
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  LineKey = (product_id, size, notes, sorted add-on ids)                 │
//! │                                                                         │
//! │  add(Latte, L, "less sugar", [oat])   ─┐                                │
//! │  add(Latte, L, "less sugar", [oat])   ─┴─► one line, quantity 2         │
//! │  add(Latte, L, "Less sugar", [oat])   ───► new line (notes are exact)   │
//! │  add(Latte, M, "less sugar", [oat])   ───► new line                     │
//! │                                                                         │
//! │  item price = base(size) + Σ add-on price                               │
//! │  base(size) = price_override, else product price × multiplier          │
//! │  item total = quantity × item price                                     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The cart also carries the order's dining type and its single discount
//! slot, so a parked cart resumes with everything the cashier had set.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::pricing::Discount;
use crate::types::{AddOn, AddOnSnapshot, DiningType, OrderItemSnapshot, Product, ProductSize, SizeName};
use crate::validation::validate_quantity;
use crate::{MAX_CART_ITEMS, MAX_ITEM_QUANTITY};

// =============================================================================
// Line Key
// =============================================================================

/// Identity of a cart line. Two selections with equal keys merge.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct LineKey {
    pub product_id: String,
    pub size: Option<SizeName>,
    pub notes: String,
    /// Sorted and de-duplicated so selection order never matters.
    pub add_on_ids: Vec<String>,
}

impl LineKey {
    pub fn new(
        product_id: impl Into<String>,
        size: Option<SizeName>,
        notes: impl Into<String>,
        add_on_ids: impl IntoIterator<Item = String>,
    ) -> Self {
        let mut add_on_ids: Vec<String> = add_on_ids.into_iter().collect();
        add_on_ids.sort();
        add_on_ids.dedup();
        LineKey {
            product_id: product_id.into(),
            size,
            notes: notes.into(),
            add_on_ids,
        }
    }
}

// =============================================================================
// Cart Line
// =============================================================================

/// A priced line in the cart. Prices are frozen when the line is created.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct CartLine {
    pub key: LineKey,
    pub product_name: String,
    /// Size price plus add-ons, per unit.
    pub unit_price_sen: i64,
    pub add_ons: Vec<AddOnSnapshot>,
    pub quantity: i64,
    pub item_total_sen: i64,
    pub track_stock: bool,
    #[ts(as = "String")]
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    pub fn unit_price(&self) -> Money {
        Money::from_sen(self.unit_price_sen)
    }

    pub fn item_total(&self) -> Money {
        Money::from_sen(self.item_total_sen)
    }

    fn set_quantity(&mut self, quantity: i64) {
        self.quantity = quantity;
        self.item_total_sen = self.unit_price().multiply_quantity(quantity).sen();
    }

    /// Frozen copy stored on the order.
    pub fn snapshot(&self) -> OrderItemSnapshot {
        OrderItemSnapshot {
            product_id: self.key.product_id.clone(),
            name: self.product_name.clone(),
            size: self.key.size,
            quantity: self.quantity,
            unit_price_sen: self.unit_price_sen,
            add_ons: self.add_ons.clone(),
            notes: self.key.notes.clone(),
            item_total_sen: self.item_total_sen,
        }
    }
}

/// Unit price of a selection: size base price plus every add-on.
pub fn item_price(product: &Product, size: Option<&ProductSize>, add_ons: &[AddOn]) -> Money {
    let base = match size {
        Some(size) => size.base_price(product),
        None => product.price(),
    };
    base + add_ons.iter().map(AddOn::price).sum::<Money>()
}

// =============================================================================
// Cart
// =============================================================================

/// The in-progress order on a POS terminal or a customer's phone.
///
/// ## Invariants
/// - Lines are unique by [`LineKey`]
/// - Every line has `1 <= quantity <= 999`
/// - At most 100 lines
/// - `item_total_sen == quantity * unit_price_sen` on every line
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Cart {
    pub lines: Vec<CartLine>,
    pub dining_type: DiningType,
    /// Coded or manual discount; setting one replaces the other.
    pub discount: Option<Discount>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Default for Cart {
    fn default() -> Self {
        Cart::new(DiningType::DineIn)
    }
}

impl Cart {
    pub fn new(dining_type: DiningType) -> Self {
        Cart {
            lines: Vec::new(),
            dining_type,
            discount: None,
            created_at: Utc::now(),
        }
    }

    /// Adds a selection, merging into an existing line with the same key.
    ///
    /// ## Checks
    /// - product is active
    /// - size and add-ons belong to the product and are active
    /// - resulting quantity stays within limits
    pub fn add(
        &mut self,
        product: &Product,
        size: Option<&ProductSize>,
        add_ons: &[AddOn],
        notes: &str,
        quantity: i64,
    ) -> CoreResult<LineKey> {
        validate_quantity(quantity)?;

        if !product.active {
            return Err(CoreError::ProductUnavailable(product.name.clone()));
        }
        if let Some(size) = size {
            if size.product_id != product.id || !size.active {
                return Err(CoreError::SizeUnavailable {
                    product: product.name.clone(),
                    size: size.size_name.to_string(),
                });
            }
        }
        if let Some(bad) = add_ons.iter().find(|a| a.product_id != product.id || !a.active) {
            return Err(CoreError::AddOnUnavailable {
                product: product.name.clone(),
                add_on: bad.name.clone(),
            });
        }

        let key = LineKey::new(
            product.id.clone(),
            size.map(|s| s.size_name),
            notes,
            add_ons.iter().map(|a| a.id.clone()),
        );

        if let Some(line) = self.lines.iter_mut().find(|l| l.key == key) {
            let new_qty = line.quantity + quantity;
            if new_qty > MAX_ITEM_QUANTITY {
                return Err(CoreError::QuantityTooLarge {
                    requested: new_qty,
                    max: MAX_ITEM_QUANTITY,
                });
            }
            line.set_quantity(new_qty);
            return Ok(key);
        }

        if self.lines.len() >= MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        let unit_price = item_price(product, size, add_ons);
        let mut snapshots: Vec<AddOnSnapshot> = add_ons
            .iter()
            .map(|a| AddOnSnapshot {
                id: a.id.clone(),
                name: a.name.clone(),
                price_sen: a.price_sen,
            })
            .collect();
        snapshots.sort_by(|a, b| a.id.cmp(&b.id));
        snapshots.dedup_by(|a, b| a.id == b.id);

        let mut line = CartLine {
            key: key.clone(),
            product_name: product.name.clone(),
            unit_price_sen: unit_price.sen(),
            add_ons: snapshots,
            quantity: 0,
            item_total_sen: 0,
            track_stock: product.track_stock,
            added_at: Utc::now(),
        };
        line.set_quantity(quantity);
        self.lines.push(line);
        Ok(key)
    }

    /// Sets a line's quantity. Zero or below removes the line.
    pub fn update_quantity(&mut self, key: &LineKey, quantity: i64) -> CoreResult<()> {
        if quantity <= 0 {
            return self.remove(key);
        }
        if quantity > MAX_ITEM_QUANTITY {
            return Err(CoreError::QuantityTooLarge {
                requested: quantity,
                max: MAX_ITEM_QUANTITY,
            });
        }
        let line = self
            .lines
            .iter_mut()
            .find(|l| &l.key == key)
            .ok_or(CoreError::LineNotInCart)?;
        line.set_quantity(quantity);
        Ok(())
    }

    /// Removes the line with exactly this key.
    pub fn remove(&mut self, key: &LineKey) -> CoreResult<()> {
        let before = self.lines.len();
        self.lines.retain(|l| &l.key != key);
        if self.lines.len() == before {
            return Err(CoreError::LineNotInCart);
        }
        Ok(())
    }

    /// Empties the cart and drops the discount. Dining type is kept.
    pub fn clear(&mut self) {
        self.lines.clear();
        self.discount = None;
        self.created_at = Utc::now();
    }

    /// Checks a cart that was not built through [`Cart::add`], such as one
    /// inside an imported terminal session.
    ///
    /// Line prices are only checked for internal consistency here; the caller
    /// reprices against the catalog.
    pub fn check_integrity(&self) -> CoreResult<()> {
        if self.lines.len() > MAX_CART_ITEMS {
            return Err(CoreError::CartTooLarge {
                max: MAX_CART_ITEMS,
            });
        }

        for (idx, line) in self.lines.iter().enumerate() {
            let invalid = |reason: &str| CoreError::InvalidCartLine {
                product_id: line.key.product_id.clone(),
                reason: reason.to_string(),
            };

            validate_quantity(line.quantity)?;
            if line.unit_price_sen < 0 {
                return Err(invalid("unit price is negative"));
            }
            if line.unit_price_sen.checked_mul(line.quantity) != Some(line.item_total_sen) {
                return Err(invalid("item total does not match quantity × unit price"));
            }
            let normalized = LineKey::new(
                line.key.product_id.clone(),
                line.key.size,
                line.key.notes.clone(),
                line.key.add_on_ids.iter().cloned(),
            );
            if normalized != line.key {
                return Err(invalid("add-on ids are not sorted and unique"));
            }
            let snapshot_ids: Vec<&str> = line.add_ons.iter().map(|a| a.id.as_str()).collect();
            if snapshot_ids != line.key.add_on_ids.iter().map(String::as_str).collect::<Vec<_>>() {
                return Err(invalid("add-ons do not match the line key"));
            }
            if self.lines[..idx].iter().any(|l| l.key == line.key) {
                return Err(invalid("duplicate line"));
            }
        }

        if let Some(Discount::Manual { amount_sen, reason }) = &self.discount {
            Discount::manual(Money::from_sen(*amount_sen), reason)?;
        }
        Ok(())
    }

    /// Takes a submitted copy of this cart back out of the live cart.
    ///
    /// Lines added while the copy was being submitted stay behind; submitted
    /// quantities are subtracted and the used discount is dropped. A cart
    /// that was cleared or replaced in the meantime is left alone.
    pub fn settle_submitted(&mut self, submitted: &Cart) {
        if self.created_at != submitted.created_at {
            return;
        }
        for sent in &submitted.lines {
            let Some(idx) = self.lines.iter().position(|l| l.key == sent.key) else {
                continue;
            };
            let remaining = self.lines[idx].quantity - sent.quantity;
            if remaining > 0 {
                self.lines[idx].set_quantity(remaining);
            } else {
                self.lines.remove(idx);
            }
        }
        if self.lines.is_empty() {
            self.clear();
        } else {
            self.discount = None;
        }
    }

    pub fn set_discount(&mut self, discount: Discount) {
        self.discount = Some(discount);
    }

    pub fn clear_discount(&mut self) {
        self.discount = None;
    }

    /// Sum of every line's item total (the base subtotal).
    pub fn total(&self) -> Money {
        self.lines.iter().map(CartLine::item_total).sum()
    }

    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Total units across all lines.
    pub fn item_count(&self) -> i64 {
        self.lines.iter().map(|l| l.quantity).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn line(&self, key: &LineKey) -> Option<&CartLine> {
        self.lines.iter().find(|l| &l.key == key)
    }

    pub fn snapshot_items(&self) -> Vec<OrderItemSnapshot> {
        self.lines.iter().map(CartLine::snapshot).collect()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn product(id: &str, price_sen: i64) -> Product {
        let now = Utc::now();
        Product {
            id: id.to_string(),
            name: id.to_string(),
            description: None,
            price_sen,
            category_id: None,
            tags: vec![],
            allergens: vec![],
            stock_quantity: 20,
            track_stock: true,
            show_in_kitchen: true,
            active: true,
            rating: None,
            image_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub(crate) fn size(product_id: &str, name: SizeName, bps: u32) -> ProductSize {
        ProductSize {
            id: format!("{product_id}-{name}"),
            product_id: product_id.to_string(),
            size_name: name,
            price_multiplier_bps: bps,
            price_override_sen: None,
            active: true,
        }
    }

    pub(crate) fn add_on(product_id: &str, id: &str, price_sen: i64) -> AddOn {
        AddOn {
            id: id.to_string(),
            product_id: product_id.to_string(),
            name: id.to_string(),
            price_sen,
            active: true,
        }
    }

    #[test]
    fn test_large_latte_with_add_on_is_fourteen_ringgit() {
        let latte = product("latte", 1000);
        let large = size("latte", SizeName::L, 12_000);
        let shot = add_on("latte", "extra-shot", 200);

        let mut cart = Cart::default();
        let key = cart.add(&latte, Some(&large), &[shot], "", 1).unwrap();

        let line = cart.line(&key).unwrap();
        assert_eq!(line.item_total().to_string(), "RM14.00");
        assert_eq!(cart.total().sen(), 1400);
    }

    #[test]
    fn test_identical_selection_merges() {
        let latte = product("latte", 1000);
        let oat = add_on("latte", "oat", 150);
        let vanilla = add_on("latte", "vanilla", 100);

        let mut cart = Cart::default();
        cart.add(&latte, None, &[oat.clone(), vanilla.clone()], "less sugar", 1).unwrap();
        cart.add(&latte, None, &[vanilla, oat], "less sugar", 2).unwrap();

        assert_eq!(cart.line_count(), 1);
        assert_eq!(cart.lines[0].quantity, 3);
        assert_eq!(cart.lines[0].item_total_sen, 3 * 1250);
    }

    #[test]
    fn test_note_casing_creates_distinct_lines() {
        let latte = product("latte", 1000);
        let mut cart = Cart::default();
        cart.add(&latte, None, &[], "less sugar", 1).unwrap();
        cart.add(&latte, None, &[], "Less sugar", 1).unwrap();
        assert_eq!(cart.line_count(), 2);
    }

    #[test]
    fn test_update_quantity_recomputes_and_zero_removes() {
        let latte = product("latte", 1000);
        let mut cart = Cart::default();
        let key = cart.add(&latte, None, &[], "", 1).unwrap();

        cart.update_quantity(&key, 4).unwrap();
        assert_eq!(cart.total().sen(), 4000);

        cart.update_quantity(&key, 0).unwrap();
        assert!(cart.is_empty());
    }

    #[test]
    fn test_remove_requires_exact_key() {
        let latte = product("latte", 1000);
        let mut cart = Cart::default();
        cart.add(&latte, None, &[], "hot", 1).unwrap();

        let other = LineKey::new("latte", None, "iced", Vec::new());
        assert!(matches!(cart.remove(&other), Err(CoreError::LineNotInCart)));
        assert_eq!(cart.line_count(), 1);
    }

    #[test]
    fn test_total_is_sum_of_item_totals() {
        let latte = product("latte", 1000);
        let croissant = product("croissant", 650);
        let large = size("latte", SizeName::L, 12_000);
        let mut cart = Cart::default();
        cart.add(&latte, Some(&large), &[], "", 2).unwrap();
        cart.add(&croissant, None, &[], "warm", 3).unwrap();

        let sum: i64 = cart.lines.iter().map(|l| l.item_total_sen).sum();
        assert_eq!(cart.total().sen(), sum);
        for line in &cart.lines {
            assert_eq!(line.item_total_sen, line.quantity * line.unit_price_sen);
        }
    }

    #[test]
    fn test_rejects_foreign_add_on_and_inactive_product() {
        let mut latte = product("latte", 1000);
        let foreign = add_on("mocha", "whipped-cream", 100);
        let mut cart = Cart::default();

        assert!(matches!(
            cart.add(&latte, None, &[foreign], "", 1),
            Err(CoreError::AddOnUnavailable { .. })
        ));

        latte.active = false;
        assert!(matches!(
            cart.add(&latte, None, &[], "", 1),
            Err(CoreError::ProductUnavailable(_))
        ));
    }

    #[test]
    fn test_integrity_rejects_tampered_lines() {
        let latte = product("latte", 1000);
        let oat = add_on("latte", "oat", 150);
        let mut cart = Cart::default();
        cart.add(&latte, None, &[oat], "", 5).unwrap();
        assert!(cart.check_integrity().is_ok());

        let mut cheap = cart.clone();
        cheap.lines[0].item_total_sen = 1;
        assert!(matches!(cheap.check_integrity(), Err(CoreError::InvalidCartLine { .. })));

        let mut huge = cart.clone();
        huge.lines[0].unit_price_sen = i64::MAX;
        huge.lines[0].item_total_sen = i64::MAX;
        assert!(matches!(huge.check_integrity(), Err(CoreError::InvalidCartLine { .. })));

        let mut over = cart.clone();
        over.lines[0].quantity = MAX_ITEM_QUANTITY + 1;
        over.lines[0].item_total_sen = over.lines[0].unit_price_sen * over.lines[0].quantity;
        assert!(over.check_integrity().is_err());

        let mut missing_add_on = cart.clone();
        missing_add_on.lines[0].add_ons.clear();
        assert!(missing_add_on.check_integrity().is_err());

        let mut doubled = cart.clone();
        doubled.lines.push(cart.lines[0].clone());
        assert!(matches!(doubled.check_integrity(), Err(CoreError::InvalidCartLine { .. })));

        let mut negative = cart;
        negative.discount = Some(Discount::Manual {
            amount_sen: -500,
            reason: "oops".to_string(),
        });
        assert!(matches!(
            negative.check_integrity(),
            Err(CoreError::InvalidManualDiscount { .. })
        ));
    }

    #[test]
    fn test_settle_keeps_lines_added_during_submit() {
        let latte = product("latte", 1000);
        let croissant = product("croissant", 650);
        let mut live = Cart::default();
        live.add(&latte, None, &[], "", 2).unwrap();
        live.set_discount(Discount::manual(Money::from_sen(100), "regular").unwrap());
        let submitted = live.clone();

        live.add(&latte, None, &[], "", 1).unwrap();
        live.add(&croissant, None, &[], "", 1).unwrap();
        live.settle_submitted(&submitted);

        assert_eq!(live.line_count(), 2);
        assert_eq!(live.lines[0].quantity, 1);
        assert_eq!(live.lines[1].key.product_id, "croissant");
        assert!(live.discount.is_none());

        let mut untouched = Cart::default();
        untouched.add(&latte, None, &[], "", 1).unwrap();
        let copy = untouched.clone();
        untouched.settle_submitted(&copy);
        assert!(untouched.is_empty());

        let mut replaced = Cart::default();
        replaced.created_at = submitted.created_at - chrono::Duration::seconds(5);
        replaced.add(&latte, None, &[], "", 2).unwrap();
        replaced.settle_submitted(&submitted);
        assert_eq!(replaced.item_count(), 2);
    }

    #[test]
    fn test_quantity_limit_on_merge() {
        let latte = product("latte", 1000);
        let mut cart = Cart::default();
        cart.add(&latte, None, &[], "", MAX_ITEM_QUANTITY).unwrap();
        assert!(matches!(
            cart.add(&latte, None, &[], "", 1),
            Err(CoreError::QuantityTooLarge { .. })
        ));
    }
}
