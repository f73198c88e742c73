//! # Money Module
//!
//! Provides the `Money` type and the price normalizer that turns whatever a
//! menu collaborator hands us into integer cents.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  A cart merges quantities over and over. Summing float prices drifts.  │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Prices are normalized to cents ONCE, at the edge.                    │
//! │    Every total after that is integer arithmetic.                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Price Inputs
//! ```text
//!   priceCents: 999        ──────────────────────────► 999   (preferred)
//!   price: 9.99            ── × 100, round ──────────► 999
//!   price: "$9.99"         ── strip, exact decimal ──► 999
//!   price: "free"          ── unparsable ────────────► 0
//!   price: 10              ── × 100 (deprecated) ────► 1000  + warning
//! ```

use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul};
use std::str::FromStr;
use tracing::warn;

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in the smallest currency unit (cents).
///
/// Single-currency by construction; there is no currency tag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use lucha_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-currency portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the cents portion (always 0-99).
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

    /// Multiplies money by a quantity, saturating instead of overflowing.
    ///
    /// ## Example
    /// ```rust
    /// use lucha_core::money::Money;
    ///
    /// let unit_price = Money::from_cents(299);
    /// assert_eq!(unit_price.multiply_quantity(3).cents(), 897);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0.saturating_mul(qty))
    }

    /// Returns the value in whole currency units as a float.
    ///
    /// ## Note
    /// Display and wire only. Never feed this back into arithmetic.
    #[inline]
    pub fn to_major_units(&self) -> f64 {
        self.0 as f64 / 100.0
    }
}

/// Shows money as `$10.99`. UI layers do their own localized formatting.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(
            f,
            "{}${}.{:02}",
            sign,
            self.dollars().abs(),
            self.cents_part()
        )
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
        Money(self.0.saturating_add(other.0))
    }
}

impl AddAssign for Money {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 = self.0.saturating_add(other.0);
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        self.multiply_quantity(qty)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Price Normalizer
// =============================================================================

/// A price as supplied by a catalog collaborator, in whole currency units.
///
/// Deserializes untagged, so both `"price": 9.99` and `"price": "$9.99"`
/// are accepted from JSON.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PriceInput {
    /// A numeric amount such as `9.99`.
    Amount(f64),
    /// Text such as `"$9.99"` or `"9.99 USD"`.
    Text(String),
}

impl From<f64> for PriceInput {
    fn from(amount: f64) -> Self {
        PriceInput::Amount(amount)
    }
}

impl From<&str> for PriceInput {
    fn from(text: &str) -> Self {
        PriceInput::Text(text.to_string())
    }
}

impl From<String> for PriceInput {
    fn from(text: String) -> Self {
        PriceInput::Text(text)
    }
}

/// Converts a price in whole currency units to integer cents.
///
/// ## Rules
/// - Numbers are currency units: `9.99` → `999`, rounded half away from zero.
/// - Integral numbers take the same path but are logged as deprecated: an
///   integer price is ambiguous (cents or units?), callers should send
///   `priceCents` instead.
/// - Text is stripped of everything but digits, `.` and `-`, then parsed as
///   an exact decimal.
/// - Anything unparsable (or non-finite) yields `0`. Never panics.
///
/// ## Example
/// ```rust
/// use lucha_core::money::{to_cents, PriceInput};
///
/// assert_eq!(to_cents(&PriceInput::Amount(9.99)), 999);
/// assert_eq!(to_cents(&PriceInput::from("$1,234.50")), 123450);
/// assert_eq!(to_cents(&PriceInput::from("market price")), 0);
/// ```
pub fn to_cents(price: &PriceInput) -> i64 {
    match price {
        PriceInput::Amount(amount) => amount_to_cents(*amount),
        PriceInput::Text(text) => text_to_cents(text),
    }
}

fn amount_to_cents(amount: f64) -> i64 {
    if !amount.is_finite() {
        return 0;
    }
    if amount.fract() == 0.0 && amount != 0.0 {
        warn!(
            price = amount,
            "Integral price treated as currency units; pass priceCents instead"
        );
    }
    // `as` saturates at the i64 bounds
    (amount * 100.0).round() as i64
}

fn text_to_cents(text: &str) -> i64 {
    let cleaned: String = text
        .trim()
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect();

    if cleaned.is_empty() {
        return 0;
    }

    Decimal::from_str(&cleaned)
        .ok()
        .and_then(|units| units.checked_mul(Decimal::from(100)))
        .map(|cents| cents.round_dp_with_strategy(0, RoundingStrategy::MidpointAwayFromZero))
        .and_then(|cents| cents.to_i64())
        .unwrap_or(0)
}

// =============================================================================
// Unit Tests
// =============================================================================
