//! # Pricing Calculator
//!
//! Turns a cart into subtotal, fees, discount and final total.
//!
//! ## Calculation Order
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  subtotal            = Σ line item_total                     RM100.00   │
//! │                                                                         │
//! │  fees, in list order, each on the running total:                        │
//! │    Service 10%       = 10% × 100.00  → running 110.00        + RM10.00  │
//! │    Packaging RM2     = fixed         → running 112.00        +  RM2.00  │
//! │  subtotal_with_fees                                          RM112.00   │
//! │                                                                         │
//! │  discount is computed on the BASE subtotal (100.00), not 112.00         │
//! │    KOPI10 10%        = 10% × 100.00                          - RM10.00  │
//! │                                                                         │
//! │  total = max(0, subtotal_with_fees − discount)               RM102.00   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Fees compound while the discount does not. The two bases differ on
//! purpose and both are kept as they are; see DESIGN.md.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::cart::Cart;
use crate::error::{CoreError, CoreResult, DiscountRejection};
use crate::money::Money;
use crate::types::{DiningType, DiscountCode, Fee, FeeType};
use crate::validation::validate_discount_reason;

// =============================================================================
// Fees
// =============================================================================

/// A fee as charged on a particular order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct AppliedFee {
    pub fee_id: String,
    pub name: String,
    pub fee_type: FeeType,
    pub amount_sen: i64,
}

/// Applies every active fee in scope for `dining`, compounding in list order.
///
/// Each percentage fee is taken of the running total that already includes
/// the fees before it.
pub fn apply_fees(subtotal: Money, fees: &[Fee], dining: DiningType) -> Vec<AppliedFee> {
    let mut running = subtotal;
    fees.iter()
        .filter(|f| f.active && f.applies_to.applies_to(dining))
        .map(|fee| {
            let charge = fee.charge_on(running);
            running += charge;
            AppliedFee {
                fee_id: fee.id.clone(),
                name: fee.name.clone(),
                fee_type: fee.fee_type,
                amount_sen: charge.sen(),
            }
        })
        .collect()
}

/// Subtotal plus every applicable fee.
pub fn subtotal_with_fees(subtotal: Money, fees: &[Fee], dining: DiningType) -> Money {
    subtotal
        + apply_fees(subtotal, fees, dining)
            .iter()
            .map(|f| Money::from_sen(f.amount_sen))
            .sum::<Money>()
}

// =============================================================================
// Discounts
// =============================================================================

/// The cart's single discount slot.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Discount {
    /// A promotional code from `discount_codes`.
    Code { code: DiscountCode },
    /// A flat amount keyed in by staff, with a reason for the audit trail.
    Manual { amount_sen: i64, reason: String },
}

impl Discount {
    /// Builds a manual discount after checking the amount and reason.
    pub fn manual(amount: Money, reason: &str) -> CoreResult<Discount> {
        if amount.is_negative() {
            return Err(CoreError::InvalidManualDiscount {
                reason: "amount cannot be negative".to_string(),
            });
        }
        validate_discount_reason(reason)?;
        Ok(Discount::Manual {
            amount_sen: amount.sen(),
            reason: reason.trim().to_string(),
        })
    }

    /// Discount amount against the base (pre-fee) subtotal.
    ///
    /// Manual discounts are capped at the base subtotal.
    pub fn amount_for(&self, base_subtotal: Money) -> Money {
        match self {
            Discount::Code { code } => code.amount_for(base_subtotal),
            Discount::Manual { amount_sen, .. } => {
                Money::from_sen(*amount_sen).min(base_subtotal.floor_zero())
            }
        }
    }

    pub fn code(&self) -> Option<&str> {
        match self {
            Discount::Code { code } => Some(&code.code),
            Discount::Manual { .. } => None,
        }
    }

    pub fn reason(&self) -> Option<&str> {
        match self {
            Discount::Code { .. } => None,
            Discount::Manual { reason, .. } => Some(reason),
        }
    }
}

/// Checks that `code` can be used on an order.
///
/// ## Checks (in order)
/// 1. code is active
/// 2. not expired at `now`
/// 3. usage limit not reached
/// 4. valid for the dining type
/// 5. `subtotal_with_fees >= min_order`
pub fn check_discount_code(
    code: &DiscountCode,
    subtotal_with_fees: Money,
    dining: DiningType,
    now: DateTime<Utc>,
) -> CoreResult<()> {
    let reject = |reason| {
        Err(CoreError::DiscountRejected {
            code: code.code.clone(),
            reason,
        })
    };

    if !code.active {
        return reject(DiscountRejection::Inactive);
    }
    if code.is_expired(now) {
        return reject(DiscountRejection::Expired);
    }
    if code.is_exhausted() {
        return reject(DiscountRejection::UsageLimitReached);
    }
    if !code.applies_to(dining) {
        return reject(DiscountRejection::NotApplicable(dining));
    }
    if subtotal_with_fees < code.min_order() {
        return reject(DiscountRejection::MinimumOrderNotMet {
            required: code.min_order(),
            actual: subtotal_with_fees,
        });
    }
    Ok(())
}

/// Validates `code` against the cart and puts it in the discount slot,
/// replacing any manual discount.
pub fn apply_discount_code(
    cart: &mut Cart,
    code: DiscountCode,
    fees: &[Fee],
    now: DateTime<Utc>,
) -> CoreResult<()> {
    let with_fees = subtotal_with_fees(cart.total(), fees, cart.dining_type);
    check_discount_code(&code, with_fees, cart.dining_type, now)?;
    cart.set_discount(Discount::Code { code });
    Ok(())
}

// =============================================================================
// Price Summary
// =============================================================================

/// Everything the cashier screen and receipt show below the lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PriceSummary {
    pub subtotal_sen: i64,
    pub fees: Vec<AppliedFee>,
    pub fees_total_sen: i64,
    pub subtotal_with_fees_sen: i64,
    pub discount_sen: i64,
    pub discount_code: Option<String>,
    pub discount_reason: Option<String>,
    pub total_sen: i64,
}

impl PriceSummary {
    pub fn total(&self) -> Money {
        Money::from_sen(self.total_sen)
    }

    pub fn subtotal_with_fees(&self) -> Money {
        Money::from_sen(self.subtotal_with_fees_sen)
    }
}

/// Prices a cart with the given fee list.
pub fn price(cart: &Cart, fees: &[Fee]) -> PriceSummary {
    let subtotal = cart.total();
    let applied = apply_fees(subtotal, fees, cart.dining_type);
    let fees_total: Money = applied.iter().map(|f| Money::from_sen(f.amount_sen)).sum();
    let with_fees = subtotal + fees_total;

    let discount = cart
        .discount
        .as_ref()
        .map(|d| d.amount_for(subtotal))
        .unwrap_or_default();

    PriceSummary {
        subtotal_sen: subtotal.sen(),
        fees: applied,
        fees_total_sen: fees_total.sen(),
        subtotal_with_fees_sen: with_fees.sen(),
        discount_sen: discount.sen(),
        discount_code: cart.discount.as_ref().and_then(|d| d.code().map(str::to_string)),
        discount_reason: cart.discount.as_ref().and_then(|d| d.reason().map(str::to_string)),
        total_sen: (with_fees - discount).floor_zero().sen(),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::cart::tests::product;
    use crate::types::{DiscountType, FeeScope};

    pub(crate) fn fee(id: &str, fee_type: FeeType, amount: i64, scope: FeeScope) -> Fee {
        Fee {
            id: id.to_string(),
            name: id.to_string(),
            fee_type,
            amount,
            applies_to: scope,
            active: true,
            created_at: Utc::now(),
        }
    }

    pub(crate) fn code(value: i64, discount_type: DiscountType, min_order_sen: i64) -> DiscountCode {
        DiscountCode {
            id: "d-1".to_string(),
            code: "KOPI10".to_string(),
            discount_type,
            value,
            min_order_sen,
            usage_limit: None,
            usage_count: 0,
            expires_at: None,
            applies_to: vec![],
            active: true,
        }
    }

    fn cart_of(total_sen: i64, dining: DiningType) -> Cart {
        let mut cart = Cart::new(dining);
        cart.add(&product("set-lunch", total_sen), None, &[], "", 1).unwrap();
        cart
    }

    #[test]
    fn test_fees_compound_on_running_total() {
        let fees = vec![
            fee("service", FeeType::Percentage, 1000, FeeScope::DineIn),
            fee("packaging", FeeType::Fixed, 200, FeeScope::Both),
        ];
        let summary = price(&cart_of(10_000, DiningType::DineIn), &fees);

        assert_eq!(summary.fees_total_sen, 1200);
        assert_eq!(summary.subtotal_with_fees_sen, 11_200);
        assert_eq!(summary.total_sen, 11_200);
    }

    #[test]
    fn test_percentage_after_fixed_sees_fixed_fee() {
        let fees = vec![
            fee("packaging", FeeType::Fixed, 200, FeeScope::Both),
            fee("service", FeeType::Percentage, 1000, FeeScope::Both),
        ];
        let applied = apply_fees(Money::from_sen(10_000), &fees, DiningType::Takeaway);
        // 10% of 102.00, not of 100.00
        assert_eq!(applied[1].amount_sen, 1020);
    }

    #[test]
    fn test_out_of_scope_and_inactive_fees_skipped() {
        let mut inactive = fee("sst", FeeType::Percentage, 600, FeeScope::Both);
        inactive.active = false;
        let fees = vec![
            fee("service", FeeType::Percentage, 1000, FeeScope::DineIn),
            inactive,
        ];
        let applied = apply_fees(Money::from_sen(10_000), &fees, DiningType::Takeaway);
        assert!(applied.is_empty());
    }

    #[test]
    fn test_discount_is_taken_on_base_subtotal() {
        let fees = vec![fee("service", FeeType::Percentage, 1000, FeeScope::Both)];
        let mut cart = cart_of(10_000, DiningType::DineIn);
        apply_discount_code(&mut cart, code(1000, DiscountType::Percentage, 0), &fees, Utc::now())
            .unwrap();

        let summary = price(&cart, &fees);
        assert_eq!(summary.discount_sen, 1000);
        assert_eq!(summary.total_sen, 11_000 - 1000);
        assert_eq!(summary.discount_code.as_deref(), Some("KOPI10"));
    }

    #[test]
    fn test_minimum_order_rejects_small_cart() {
        let mut cart = cart_of(4000, DiningType::DineIn);
        let err = apply_discount_code(&mut cart, code(500, DiscountType::Fixed, 5000), &[], Utc::now())
            .unwrap_err();
        assert!(matches!(
            err,
            CoreError::DiscountRejected {
                reason: DiscountRejection::MinimumOrderNotMet { .. },
                ..
            }
        ));
        assert!(cart.discount.is_none());
    }

    #[test]
    fn test_minimum_order_counts_fees() {
        // RM46 + 10% = RM50.60 clears a RM50 minimum
        let fees = vec![fee("service", FeeType::Percentage, 1000, FeeScope::Both)];
        let mut cart = cart_of(4600, DiningType::DineIn);
        assert!(apply_discount_code(&mut cart, code(500, DiscountType::Fixed, 5000), &fees, Utc::now()).is_ok());
    }

    #[test]
    fn test_code_rejections() {
        let now = Utc::now();
        let with_fees = Money::from_sen(10_000);

        let mut inactive = code(500, DiscountType::Fixed, 0);
        inactive.active = false;
        assert!(check_discount_code(&inactive, with_fees, DiningType::DineIn, now).is_err());

        let mut used_up = code(500, DiscountType::Fixed, 0);
        used_up.usage_limit = Some(10);
        used_up.usage_count = 10;
        assert!(check_discount_code(&used_up, with_fees, DiningType::DineIn, now).is_err());

        let mut takeaway_only = code(500, DiscountType::Fixed, 0);
        takeaway_only.applies_to = vec![DiningType::Takeaway];
        assert!(check_discount_code(&takeaway_only, with_fees, DiningType::DineIn, now).is_err());
        assert!(check_discount_code(&takeaway_only, with_fees, DiningType::Takeaway, now).is_ok());
    }

    #[test]
    fn test_manual_discount_capped_at_base_and_replaces_code() {
        let mut cart = cart_of(3000, DiningType::DineIn);
        apply_discount_code(&mut cart, code(500, DiscountType::Fixed, 0), &[], Utc::now()).unwrap();

        cart.set_discount(Discount::manual(Money::from_sen(5000), "regular customer").unwrap());
        let summary = price(&cart, &[]);
        assert_eq!(summary.discount_sen, 3000);
        assert_eq!(summary.total_sen, 0);
        assert_eq!(summary.discount_code, None);
        assert_eq!(summary.discount_reason.as_deref(), Some("regular customer"));
    }

    #[test]
    fn test_final_total_never_negative() {
        let mut cart = cart_of(1000, DiningType::DineIn);
        cart.set_discount(Discount::Code {
            code: code(99_999, DiscountType::Fixed, 0),
        });
        assert_eq!(price(&cart, &[]).total_sen, 0);
    }

    #[test]
    fn test_manual_discount_requires_reason() {
        assert!(Discount::manual(Money::from_sen(100), "  ").is_err());
        assert!(Discount::manual(Money::from_sen(-1), "oops").is_err());
    }
}
