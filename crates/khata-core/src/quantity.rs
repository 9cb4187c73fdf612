//! # Quantity Module
//!
//! Stock and line-item quantities, stored as integer thousandths of a unit.
//!
//! Products are sold by the piece, but also by the kilogram or litre, so a
//! quantity of `1.5` kg must be representable exactly. Like [`Money`], the
//! value is an integer at rest: `1.5` is stored as `1500`. JSON carries the
//! decimal form.
//!
//! ```text
//!   JSON          Rust                  SQLite
//!   ────          ────                  ──────
//!   1.5     ◄──►  Quantity(1500)  ◄──►  1500 (INTEGER)
//!   3       ◄──►  Quantity(3000)  ◄──►  3000
//! ```
//!
//! [`Money`]: crate::money::Money

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::{Add, AddAssign, Neg, Sub};
use ts_rs::TS;

/// A signed quantity in thousandths of a unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Quantity(#[ts(type = "number")] i64);

impl Quantity {
    /// Thousandths per whole unit.
    pub const SCALE: i64 = 1000;

    /// Creates a quantity from thousandths of a unit.
    #[inline]
    pub const fn from_milli(milli: i64) -> Self {
        Quantity(milli)
    }

    /// Creates a quantity of whole units.
    #[inline]
    pub const fn from_whole(units: i64) -> Self {
        Quantity(units * Self::SCALE)
    }

    /// Zero quantity.
    #[inline]
    pub const fn zero() -> Self {
        Quantity(0)
    }

    /// Raw value in thousandths.
    #[inline]
    pub const fn milli(&self) -> i64 {
        self.0
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

    #[inline]
    pub const fn abs(&self) -> Self {
        Quantity(self.0.abs())
    }

    /// True when this quantity is an exact multiple of `increment`.
    ///
    /// A non-positive increment accepts everything.
    ///
    /// ```rust
    /// use khata_core::quantity::Quantity;
    ///
    /// let half = Quantity::from_milli(500);
    /// assert!(Quantity::from_milli(1500).is_multiple_of(half));
    /// assert!(!Quantity::from_milli(1250).is_multiple_of(half));
    /// ```
    #[inline]
    pub const fn is_multiple_of(&self, increment: Quantity) -> bool {
        increment.0 <= 0 || self.0 % increment.0 == 0
    }

    /// Addition that reports overflow instead of wrapping.
    #[inline]
    pub fn checked_add(self, other: Quantity) -> Option<Quantity> {
        self.0.checked_add(other.0).map(Quantity)
    }

    /// Converts a decimal value, rounding to the nearest thousandth.
    ///
    /// Returns `None` for NaN, infinity, or values beyond the i64 range.
    pub fn from_decimal(value: f64) -> Option<Quantity> {
        if !value.is_finite() {
            return None;
        }
        let scaled = (value * Self::SCALE as f64).round();
        if scaled.abs() >= i64::MAX as f64 {
            return None;
        }
        Some(Quantity(scaled as i64))
    }

    /// Decimal form, for JSON and display only.
    pub fn to_decimal(&self) -> f64 {
        self.0 as f64 / Self::SCALE as f64
    }
}

/// Prints the shortest exact decimal: `2`, `1.5`, `0.125`.
impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.unsigned_abs();
        let whole = abs / Self::SCALE as u64;
        let frac = abs % Self::SCALE as u64;

        if frac == 0 {
            return write!(f, "{}{}", sign, whole);
        }

        let digits = format!("{:03}", frac);
        write!(f, "{}{}.{}", sign, whole, digits.trim_end_matches('0'))
    }
}

impl Serialize for Quantity {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_f64(self.to_decimal())
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = f64::deserialize(deserializer)?;
        Quantity::from_decimal(value)
            .ok_or_else(|| serde::de::Error::custom("quantity must be a finite number"))
    }
}

impl Add for Quantity {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Quantity(self.0 + other.0)
    }
}

impl AddAssign for Quantity {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Quantity {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Quantity(self.0 - other.0)
    }
}

impl Neg for Quantity {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Quantity(-self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display() {
        assert_eq!(Quantity::from_whole(3).to_string(), "3");
        assert_eq!(Quantity::from_milli(1500).to_string(), "1.5");
        assert_eq!(Quantity::from_milli(125).to_string(), "0.125");
        assert_eq!(Quantity::from_milli(-2050).to_string(), "-2.05");
        assert_eq!(Quantity::zero().to_string(), "0");
    }

    #[test]
    fn test_json_uses_decimal_form() {
        let json = serde_json::to_string(&Quantity::from_milli(1500)).unwrap();
        assert_eq!(json, "1.5");

        let parsed: Quantity = serde_json::from_str("0.25").unwrap();
        assert_eq!(parsed.milli(), 250);

        let parsed: Quantity = serde_json::from_str("4").unwrap();
        assert_eq!(parsed, Quantity::from_whole(4));
    }

    #[test]
    fn test_from_decimal_rounds_to_thousandths() {
        assert_eq!(Quantity::from_decimal(0.1 + 0.2).unwrap().milli(), 300);
        assert!(Quantity::from_decimal(f64::NAN).is_none());
        assert!(Quantity::from_decimal(f64::INFINITY).is_none());
    }

    #[test]
    fn test_granularity() {
        let one = Quantity::from_whole(1);
        assert!(Quantity::from_whole(12).is_multiple_of(one));
        assert!(!Quantity::from_milli(1500).is_multiple_of(one));
        assert!(Quantity::from_milli(-3000).is_multiple_of(one));
        assert!(Quantity::from_milli(1).is_multiple_of(Quantity::zero()));
    }
}
