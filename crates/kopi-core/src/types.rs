//! # Domain Types
//!
//! Catalog, pricing, order and ledger types shared by every layer of Kopi POS.
//!
//! ## Type Map
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  Catalog                  Pricing                 Orders                │
//! │  ───────                  ───────                 ──────                │
//! │  Category                 Fee (fixed / %)         Order                 │
//! │  Product ──┬── ProductSize  FeeScope              OrderItemSnapshot     │
//! │            └── AddOn      DiscountCode            SplitPayment          │
//! │                           Rate (bps)              Customer              │
//! │  Multiplier (bps)                                                       │
//! │                                                                         │
//! │  Ledger                   Content / Staff                               │
//! │  ──────                   ───────────────                               │
//! │  StockHistory             MenuPromo                                     │
//! │  StockChangeType          StaffProfile, StaffRole                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Money fields are stored as `*_sen: i64` so rows map one-to-one onto these
//! structs; accessor methods hand out [`Money`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::money::Money;
use crate::status::OrderStatus;

// =============================================================================
// Rate & Multiplier
// =============================================================================

/// A percentage in basis points (1000 bps = 10%).
///
/// Used for percentage fees and percentage discount codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Rate(u32);

impl Rate {
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Rate(bps)
    }

    /// Rate from a signed bps column. Negatives become zero and values past
    /// `u32::MAX` saturate instead of wrapping.
    pub fn from_stored_bps(bps: i64) -> Self {
        Rate(u32::try_from(bps.max(0)).unwrap_or(u32::MAX))
    }

    /// Creates a rate from a percentage, e.g. `10.0` for 10%.
    pub fn from_percentage(pct: f64) -> Self {
        Rate((pct * 100.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Display-only percentage.
    #[inline]
    pub fn percentage(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

/// A size price multiplier in basis points (10 000 = 1.00×, 12 000 = 1.20×).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Multiplier(u32);

impl Multiplier {
    pub const ONE: Multiplier = Multiplier(10_000);

    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        Multiplier(bps)
    }

    /// Creates a multiplier from a decimal factor, e.g. `1.2`.
    pub fn from_factor(factor: f64) -> Self {
        Multiplier((factor * 10_000.0).round() as u32)
    }

    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }
}

impl Default for Multiplier {
    fn default() -> Self {
        Multiplier::ONE
    }
}

// =============================================================================
// Catalog
// =============================================================================

/// Drink and food sizes offered on the menu.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "UPPERCASE"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "UPPERCASE")]
pub enum SizeName {
    S,
    M,
    L,
    Xl,
}

impl SizeName {
    pub const ALL: [SizeName; 4] = [SizeName::S, SizeName::M, SizeName::L, SizeName::Xl];

    pub fn as_str(&self) -> &'static str {
        match self {
            SizeName::S => "S",
            SizeName::M => "M",
            SizeName::L => "L",
            SizeName::Xl => "XL",
        }
    }
}

impl fmt::Display for SizeName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A menu category ("Coffee", "Non-Coffee", "Pastries").
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Category {
    pub id: String,
    pub name: String,
    pub sort_order: i64,
    pub active: bool,
}

/// A product on the menu.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Product {
    pub id: String,
    pub name: String,
    pub description: Option<String>,

    /// Base price in sen, before size multiplier and add-ons.
    pub price_sen: i64,

    pub category_id: Option<String>,
    pub tags: Vec<String>,
    pub allergens: Vec<String>,

    pub stock_quantity: i64,

    /// Whether orders deduct from `stock_quantity`.
    pub track_stock: bool,

    /// Whether the kitchen display lists this product.
    pub show_in_kitchen: bool,

    pub active: bool,
    pub rating: Option<f64>,
    pub image_url: Option<String>,

    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Product {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_sen(self.price_sen)
    }
}

/// A size variant of a product.
///
/// `price_override_sen` wins over the multiplier when present.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductSize {
    pub id: String,
    pub product_id: String,
    pub size_name: SizeName,
    pub price_multiplier_bps: u32,
    pub price_override_sen: Option<i64>,
    pub active: bool,
}

impl ProductSize {
    pub fn multiplier(&self) -> Multiplier {
        Multiplier::from_bps(self.price_multiplier_bps)
    }

    /// Base price of `product` in this size, before add-ons.
    pub fn base_price(&self, product: &Product) -> Money {
        match self.price_override_sen {
            Some(sen) => Money::from_sen(sen),
            None => product.price().scale(self.multiplier()),
        }
    }
}

/// An optional extra for a product (extra shot, oat milk).
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AddOn {
    pub id: String,
    pub product_id: String,
    pub name: String,
    pub price_sen: i64,
    pub active: bool,
}

impl AddOn {
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_sen(self.price_sen)
    }
}

// =============================================================================
// Dining Type
// =============================================================================

/// How the customer will receive the order.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiningType {
    DineIn,
    Takeaway,
    Reservation,
}

impl DiningType {
    pub fn as_str(&self) -> &'static str {
        match self {
            DiningType::DineIn => "dine_in",
            DiningType::Takeaway => "takeaway",
            DiningType::Reservation => "reservation",
        }
    }

    /// Takeaway and reservation orders need a name and phone to call out.
    pub fn requires_contact(&self) -> bool {
        match self {
            DiningType::DineIn => false,
            DiningType::Takeaway | DiningType::Reservation => true,
        }
    }
}

impl fmt::Display for DiningType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for DiningType {
    type Err = crate::error::ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dine_in" => Ok(DiningType::DineIn),
            "takeaway" => Ok(DiningType::Takeaway),
            "reservation" => Ok(DiningType::Reservation),
            _ => Err(crate::error::ValidationError::NotAllowed {
                field: "dining_type".to_string(),
                allowed: vec![
                    "dine_in".to_string(),
                    "takeaway".to_string(),
                    "reservation".to_string(),
                ],
            }),
        }
    }
}

// =============================================================================
// Fees
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum FeeType {
    /// `amount` is sen.
    Fixed,
    /// `amount` is basis points of the running total.
    Percentage,
}

/// Which dining types a fee applies to.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum FeeScope {
    DineIn,
    Takeaway,
    Reservation,
    Both,
}

impl FeeScope {
    pub fn applies_to(&self, dining: DiningType) -> bool {
        match self {
            FeeScope::Both => true,
            FeeScope::DineIn => dining == DiningType::DineIn,
            FeeScope::Takeaway => dining == DiningType::Takeaway,
            FeeScope::Reservation => dining == DiningType::Reservation,
        }
    }
}

/// A service charge, tax or packaging fee.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Fee {
    pub id: String,
    pub name: String,
    pub fee_type: FeeType,
    pub amount: i64,
    pub applies_to: FeeScope,
    pub active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

impl Fee {
    /// The amount this fee adds on top of `running_total`.
    pub fn charge_on(&self, running_total: Money) -> Money {
        match self.fee_type {
            FeeType::Fixed => Money::from_sen(self.amount),
            FeeType::Percentage => running_total.percentage(Rate::from_stored_bps(self.amount)),
        }
    }
}

// =============================================================================
// Discount Codes
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum DiscountType {
    /// `value` is basis points of the base cart subtotal.
    Percentage,
    /// `value` is sen.
    Fixed,
}

/// A promotional code entered at checkout.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct DiscountCode {
    pub id: String,
    pub code: String,
    pub discount_type: DiscountType,
    pub value: i64,
    pub min_order_sen: i64,
    pub usage_limit: Option<i64>,
    pub usage_count: i64,
    #[ts(as = "Option<String>")]
    pub expires_at: Option<DateTime<Utc>>,
    /// Empty means every dining type.
    pub applies_to: Vec<DiningType>,
    pub active: bool,
}

impl DiscountCode {
    pub fn min_order(&self) -> Money {
        Money::from_sen(self.min_order_sen)
    }

    pub fn applies_to(&self, dining: DiningType) -> bool {
        self.applies_to.is_empty() || self.applies_to.contains(&dining)
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    pub fn is_exhausted(&self) -> bool {
        self.usage_limit.is_some_and(|limit| self.usage_count >= limit)
    }

    /// Discount amount against the base (pre-fee) cart subtotal.
    pub fn amount_for(&self, base_subtotal: Money) -> Money {
        match self.discount_type {
            DiscountType::Percentage => {
                base_subtotal.percentage(Rate::from_stored_bps(self.value))
            }
            DiscountType::Fixed => Money::from_sen(self.value.max(0)),
        }
    }
}

// =============================================================================
// Payments
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Notes and coins at the counter.
    Cash,
    /// DuitNow / e-wallet QR transfer, verified from an uploaded proof image.
    Qr,
    /// Card on an external terminal.
    Card,
    /// More than one tender; details in `split_payments`.
    Split,
}

/// One tender of a split payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SplitPayment {
    pub method: PaymentMethod,
    pub amount_sen: i64,
    /// Only for cash tenders; change is `cash_received - amount`.
    pub cash_received_sen: Option<i64>,
}

impl SplitPayment {
    pub fn amount(&self) -> Money {
        Money::from_sen(self.amount_sen)
    }
}

// =============================================================================
// Orders
// =============================================================================

/// Where the order was placed.
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum OrderSource {
    /// Cashier terminal.
    Pos,
    /// Customer's phone after scanning the table QR.
    Customer,
}

/// Add-on as it was priced when the order was placed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AddOnSnapshot {
    pub id: String,
    pub name: String,
    pub price_sen: i64,
}

/// Denormalized order line. Later catalog edits never touch it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct OrderItemSnapshot {
    pub product_id: String,
    pub name: String,
    pub size: Option<SizeName>,
    pub quantity: i64,
    /// Size price plus add-ons, per unit.
    pub unit_price_sen: i64,
    pub add_ons: Vec<AddOnSnapshot>,
    pub notes: String,
    pub item_total_sen: i64,
}

/// A persisted order.
///
/// Immutable once created apart from `status`, the payment reconciliation
/// fields and `updated_at`.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Order {
    pub id: String,
    pub order_number: String,
    pub source: OrderSource,
    pub table_number: Option<String>,
    pub dining_type: DiningType,
    pub customer_name: Option<String>,
    pub customer_phone: Option<String>,
    pub items: Vec<OrderItemSnapshot>,
    pub subtotal_sen: i64,
    pub fees_total_sen: i64,
    pub discount_sen: i64,
    pub discount_code: Option<String>,
    pub discount_reason: Option<String>,
    pub total_sen: i64,
    pub status: OrderStatus,
    pub payment_method: PaymentMethod,
    pub payment_proof_url: Option<String>,
    pub cash_received_sen: Option<i64>,
    pub change_sen: Option<i64>,
    pub split_payments: Vec<SplitPayment>,
    pub notes: Option<String>,
    #[ts(as = "Option<String>")]
    pub reservation_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl Order {
    pub fn total(&self) -> Money {
        Money::from_sen(self.total_sen)
    }

    /// Total number of units across all lines.
    pub fn item_count(&self) -> i64 {
        self.items.iter().map(|i| i.quantity).sum()
    }
}

/// A returning customer, keyed by phone number.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Customer {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub total_spent_sen: i64,
    pub total_orders: i64,
    #[ts(as = "Option<String>")]
    pub last_order_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Stock Ledger
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StockChangeType {
    Initial,
    Restock,
    Sale,
    Adjustment,
    Waste,
    Return,
}

/// One row of the append-only stock ledger.
///
/// `new_quantity == previous_quantity + quantity_change` and
/// `new_quantity >= 0` for every row.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockHistory {
    pub id: String,
    pub product_id: String,
    pub change_type: StockChangeType,
    pub quantity_change: i64,
    pub previous_quantity: i64,
    pub new_quantity: i64,
    pub reason: Option<String>,
    /// Order id for `sale` rows.
    pub reference_id: Option<String>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Menu Promos
// =============================================================================

/// A banner shown at the top of the customer menu.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct MenuPromo {
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub image_url: Option<String>,
    pub active: bool,
    pub sort_order: i64,
    #[ts(as = "Option<String>")]
    pub starts_at: Option<DateTime<Utc>>,
    #[ts(as = "Option<String>")]
    pub ends_at: Option<DateTime<Utc>>,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl MenuPromo {
    /// Whether the promo should be on screen at `now`.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.active
            && self.starts_at.map_or(true, |start| start <= now)
            && self.ends_at.map_or(true, |end| now < end)
    }
}

// =============================================================================
// Staff
// =============================================================================

#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum StaffRole {
    Admin,
    Cashier,
    Kitchen,
}

/// A staff account. The password hash never leaves the database layer.
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StaffProfile {
    pub id: String,
    pub email: String,
    pub full_name: String,
    pub role: StaffRole,
    pub active: bool,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================
