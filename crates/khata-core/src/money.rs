//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  In JavaScript/floating point:                                          │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A ledger replayed over thousands of transactions must reproduce the    │
//! │  stored balance EXACTLY, so drift is not an option.                     │
//! │                                                                         │
//! │  OUR SOLUTION: Integer minor units (paise)                              │
//! │    ₹10.99 is stored as 1099                                             │
//! │    Balances are sums of integers → replay is exact                      │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use khata_core::money::Money;
//!
//! let price = Money::from_cents(1099); // ₹10.99
//! let doubled = price * 2;             // ₹21.98
//! let total = price + Money::from_cents(500); // ₹15.99
//! assert_eq!(total.cents(), 1599);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};
use ts_rs::TS;

use crate::quantity::Quantity;
use crate::types::TaxRate;
use crate::MONEY_TOLERANCE_CENTS;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (paise for INR).
///
/// ## Design Decisions
/// - **i64 (signed)**: customer balances go negative when they hold an advance
/// - **Single field tuple struct**: Zero-cost abstraction over i64
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  Product.price_cents ──► InvoiceItem.unit_price ──► InvoiceItem.subtotal│
/// │                                                                         │
/// │  Invoice.subtotal ──► Tax ──► Invoice.total ──► Invoice.due_amount      │
/// │                                                    │                    │
/// │                                                    ▼                    │
/// │                              LedgerTransaction.amount ──► amount_due    │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from paise (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents ₹10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from major and minor units (rupees and paise).
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    ///
    /// assert_eq!(Money::from_major_minor(10, 99).cents(), 1099);
    /// assert_eq!(Money::from_major_minor(-5, 50).cents(), -550);
    /// ```
    #[inline]
    pub const fn from_major_minor(major: i64, minor: i64) -> Self {
        if major < 0 {
            Money(major * 100 - minor)
        } else {
            Money(major * 100 + minor)
        }
    }

    /// Returns the value in paise.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (rupees) portion.
    #[inline]
    pub const fn rupees(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit portion (always 0-99).
    #[inline]
    pub const fn cents_part(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Returns zero money value.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is positive (greater than zero).
    #[inline]
    pub const fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// Checks if the value is negative (less than zero).
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Returns the absolute value.
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Checks whether two amounts agree within the 0.01 tolerance.
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    ///
    /// assert!(Money::from_cents(8000).approx_eq(Money::from_cents(8001)));
    /// assert!(!Money::from_cents(8000).approx_eq(Money::from_cents(8002)));
    /// ```
    #[inline]
    pub const fn approx_eq(&self, other: Money) -> bool {
        self.0.abs_diff(other.0) <= MONEY_TOLERANCE_CENTS as u64
    }

    /// Addition that reports overflow instead of wrapping.
    #[inline]
    pub const fn checked_add(self, other: Money) -> Option<Money> {
        match self.0.checked_add(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Subtraction that reports overflow instead of wrapping.
    #[inline]
    pub const fn checked_sub(self, other: Money) -> Option<Money> {
        match self.0.checked_sub(other.0) {
            Some(cents) => Some(Money(cents)),
            None => None,
        }
    }

    /// Sums amounts, `None` on overflow.
    ///
    /// ```rust
    /// use khata_core::money::Money;
    ///
    /// let parts = [Money::from_cents(1000), Money::from_cents(500)];
    /// assert_eq!(Money::checked_sum(parts), Some(Money::from_cents(1500)));
    /// assert_eq!(Money::checked_sum([Money::from_cents(i64::MAX), Money::from_cents(1)]), None);
    /// ```
    pub fn checked_sum<I: IntoIterator<Item = Money>>(amounts: I) -> Option<Money> {
        amounts
            .into_iter()
            .try_fold(Money::zero(), |acc, m| acc.checked_add(m))
    }

    /// Calculates tax, rounding half away from zero.
    ///
    /// ## Implementation
    /// Integer math in basis points: `amount * bps / 10000`, rounded.
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    /// use khata_core::types::TaxRate;
    ///
    /// let subtotal = Money::from_cents(1000); // ₹10.00
    /// let rate = TaxRate::from_bps(1800);     // 18% GST
    /// assert_eq!(subtotal.calculate_tax(rate).unwrap().cents(), 180);
    /// ```
    ///
    /// `None` when the tax does not fit in `i64`.
    pub fn calculate_tax(&self, rate: TaxRate) -> Option<Money> {
        let tax = div_round(self.0 as i128 * rate.bps() as i128, 10_000);
        i64::try_from(tax).ok().map(Money::from_cents)
    }

    /// Multiplies a unit price by a fractional quantity.
    ///
    /// `Quantity` is stored in thousandths, so the product is divided back by
    /// 1000 and rounded half away from zero to the nearest paisa.
    ///
    /// ## Example
    /// ```rust
    /// use khata_core::money::Money;
    /// use khata_core::quantity::Quantity;
    ///
    /// let per_kg = Money::from_cents(5000);            // ₹50.00 / kg
    /// let line = per_kg.multiply_quantity(Quantity::from_milli(250)).unwrap(); // 250 g
    /// assert_eq!(line.cents(), 1250);                                      // ₹12.50
    /// ```
    ///
    /// `None` when the product does not fit in `i64`.
    pub fn multiply_quantity(&self, qty: Quantity) -> Option<Money> {
        let raw = self.0 as i128 * qty.milli() as i128;
        i64::try_from(div_round(raw, Quantity::SCALE as i128))
            .ok()
            .map(Money::from_cents)
    }
}

/// Integer division rounding half away from zero.
fn div_round(numerator: i128, denominator: i128) -> i128 {
    let half = denominator / 2;
    if numerator >= 0 {
        (numerator + half) / denominator
    } else {
        (numerator - half) / denominator
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
///
/// ## Note
/// This is for logs and receipts. Frontends do their own localized formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}₹{}.{:02}", sign, self.rupees().abs(), self.cents_part())
    }
}

impl Default for Money {
    fn default() -> Self {
        Money::zero()
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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

/// Multiplication by a whole count.
impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_cents() {
        let money = Money::from_cents(1099);
        assert_eq!(money.cents(), 1099);
        assert_eq!(money.rupees(), 10);
        assert_eq!(money.cents_part(), 99);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(8000)), "₹80.00");
        assert_eq!(format!("{}", Money::from_cents(-5000)), "-₹50.00");
        assert_eq!(format!("{}", Money::from_cents(5)), "₹0.05");
    }

    #[test]
    fn test_arithmetic() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3).cents(), 3000);
        assert_eq!((-a).cents(), -1000);

        let total = Money::checked_sum(vec![a, b, b]).unwrap();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_tax_rounding() {
        // ₹10.99 at 5% = 0.5495 → 0.55
        let tax = Money::from_cents(1099).calculate_tax(TaxRate::from_bps(500)).unwrap();
        assert_eq!(tax.cents(), 55);

        // zero rate
        let tax = Money::from_cents(1099).calculate_tax(TaxRate::zero()).unwrap();
        assert!(tax.is_zero());
    }

    #[test]
    fn test_multiply_fractional_quantity() {
        // ₹33.33 × 0.333 = 11.09889 → ₹11.10
        let line = Money::from_cents(3333).multiply_quantity(Quantity::from_milli(333)).unwrap();
        assert_eq!(line.cents(), 1110);

        // whole quantities are exact
        let line = Money::from_cents(1000).multiply_quantity(Quantity::from_whole(3)).unwrap();
        assert_eq!(line.cents(), 3000);
    }

    #[test]
    fn test_products_outside_i64_are_none() {
        let huge = Money::from_cents(i64::MAX);
        assert_eq!(huge.multiply_quantity(Quantity::from_whole(2)), None);
        assert_eq!(huge.calculate_tax(TaxRate::from_bps(10_000)), Some(huge));
        assert_eq!(Money::from_cents(i64::MIN).checked_sub(Money::from_cents(1)), None);
    }

    #[test]
    fn test_tolerance() {
        let a = Money::from_cents(10_000);
        assert!(a.approx_eq(Money::from_cents(9_999)));
        assert!(a.approx_eq(Money::from_cents(10_001)));
        assert!(!a.approx_eq(Money::from_cents(10_002)));

        // extremes compare without overflowing
        assert!(!a.approx_eq(Money::from_cents(i64::MIN)));
        assert!(!Money::from_cents(i64::MAX).approx_eq(Money::from_cents(i64::MIN)));
    }

    #[test]
    fn test_zero_and_checks() {
        let zero = Money::zero();
        assert!(zero.is_zero());
        assert!(!zero.is_positive());
        assert!(!zero.is_negative());

        let negative = Money::from_cents(-100);
        assert!(negative.is_negative());
        assert_eq!(negative.abs().cents(), 100);
    }
}
