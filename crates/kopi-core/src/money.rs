//! # Money Module
//!
//! The `Money` type: an integer amount of sen (1/100 of a ringgit).
//!
//! ## Why Integer Sen?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A latte at RM10.00, size L (×1.2), one extra shot at RM2.00           │
//! │                                                                         │
//! │  Floating point:  10.0 * 1.2 + 2.0 = 14.000000000000002                │
//! │                                                                         │
//! │  Integer sen:     1000 × 12000 bps / 10000 = 1200                      │
//! │                   1200 + 200               = 1400  → "RM14.00"         │
//! │                                                                         │
//! │  Every price, fee, discount and payment in the system is sen.          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use kopi_core::money::Money;
//! use kopi_core::types::Rate;
//!
//! let subtotal = Money::from_sen(10_000);             // RM100.00
//! let service = subtotal.percentage(Rate::from_bps(1_000)); // 10%
//! assert_eq!(service, Money::from_sen(1_000));
//! assert_eq!((subtotal + service).to_string(), "RM110.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::{Multiplier, Rate};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in sen.
///
/// Signed so that intermediate results (subtotal minus discount) can be
/// inspected before being floored with [`Money::floor_zero`].
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from sen.
    ///
    /// ```rust
    /// use kopi_core::money::Money;
    ///
    /// assert_eq!(Money::from_sen(1450).sen(), 1450); // RM14.50
    /// ```
    #[inline]
    pub const fn from_sen(sen: i64) -> Self {
        Money(sen)
    }

    /// Creates a Money value from whole ringgit.
    #[inline]
    pub const fn from_ringgit(ringgit: i64) -> Self {
        Money(ringgit * 100)
    }

    /// Returns the value in sen.
    #[inline]
    pub const fn sen(&self) -> i64 {
        self.0
    }

    /// Whole ringgit portion (truncated toward zero).
    #[inline]
    pub const fn ringgit(&self) -> i64 {
        self.0 / 100
    }

    /// Sen portion, always 0-99.
    #[inline]
    pub const fn sen_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Clamps negative amounts to zero.
    ///
    /// The final order total is `max(0, subtotal_with_fees - discount)`.
    #[inline]
    pub const fn floor_zero(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            *self
        }
    }

    /// Returns the smaller of the two amounts.
    #[inline]
    pub fn min(self, other: Money) -> Money {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }

    /// Computes `rate` of this amount, rounding half up.
    ///
    /// ## Implementation
    /// Integer math: `(amount * bps + 5000) / 10000`, widened to i128 so a
    /// large running total cannot overflow.
    ///
    /// ```rust
    /// use kopi_core::money::Money;
    /// use kopi_core::types::Rate;
    ///
    /// // 6% SST on RM10.25 = 61.5 sen → 62 sen
    /// let tax = Money::from_sen(1025).percentage(Rate::from_bps(600));
    /// assert_eq!(tax.sen(), 62);
    /// ```
    pub fn percentage(&self, rate: Rate) -> Money {
        let sen = (self.0 as i128 * rate.bps() as i128 + 5000) / 10000;
        Money(sen as i64)
    }

    /// Scales this amount by a size multiplier, rounding half up.
    ///
    /// ```rust
    /// use kopi_core::money::Money;
    /// use kopi_core::types::Multiplier;
    ///
    /// let large = Money::from_sen(1000).scale(Multiplier::from_bps(12_000));
    /// assert_eq!(large.sen(), 1200);
    /// ```
    pub fn scale(&self, multiplier: Multiplier) -> Money {
        let sen = (self.0 as i128 * multiplier.bps() as i128 + 5000) / 10000;
        Money(sen as i64)
    }

    /// Multiplies a unit price by a line quantity.
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Receipt-style formatting: `RM14.00`, `-RM2.50`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}RM{}.{:02}", sign, self.ringgit().abs(), self.sen_part())
    }
}

impl Add for Money {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Money(self.0 - other.0)
    }
}

impl SubAssign for Money {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + *m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_sen_and_parts() {
        let money = Money::from_sen(1450);
        assert_eq!(money.sen(), 1450);
        assert_eq!(money.ringgit(), 14);
        assert_eq!(money.sen_part(), 50);
        assert_eq!(Money::from_ringgit(50).sen(), 5000);
    }

    #[test]
    fn test_display() {
        assert_eq!(Money::from_sen(1400).to_string(), "RM14.00");
        assert_eq!(Money::from_sen(5).to_string(), "RM0.05");
        assert_eq!(Money::from_sen(-250).to_string(), "-RM2.50");
        assert_eq!(Money::zero().to_string(), "RM0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_sen(1000);
        let b = Money::from_sen(450);
        assert_eq!((a + b).sen(), 1450);
        assert_eq!((a - b).sen(), 550);
        assert_eq!((a * 3).sen(), 3000);

        let total: Money = [a, b, b].iter().sum();
        assert_eq!(total.sen(), 1900);
    }

    #[test]
    fn test_percentage_rounds_half_up() {
        let amount = Money::from_sen(1000);
        assert_eq!(amount.percentage(Rate::from_bps(1000)).sen(), 100);
        // 8.25% of RM10.00 = 82.5 sen → 83
        assert_eq!(amount.percentage(Rate::from_bps(825)).sen(), 83);
    }

    #[test]
    fn test_scale_by_size_multiplier() {
        let base = Money::from_sen(1000);
        assert_eq!(base.scale(Multiplier::from_bps(12_000)).sen(), 1200);
        assert_eq!(base.scale(Multiplier::ONE).sen(), 1000);
        // RM4.50 × 1.15 = 517.5 → 518
        assert_eq!(Money::from_sen(450).scale(Multiplier::from_bps(11_500)).sen(), 518);
    }

    #[test]
    fn test_floor_zero_and_min() {
        assert_eq!(Money::from_sen(-300).floor_zero(), Money::zero());
        assert_eq!(Money::from_sen(300).floor_zero().sen(), 300);
        assert_eq!(Money::from_sen(300).min(Money::from_sen(200)).sen(), 200);
    }
}
