//! # Money Module
//!
//! Provides the `Money` type for handling monetary values safely.
//!
//! ## Why Integer Money?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Job earnings of $0.10 + $0.20 as floats:                               │
//! │    0.1 + 0.2 = 0.30000000000000004  ❌ WRONG!                           │
//! │                                                                         │
//! │  Summed across hundreds of payouts the drift shows up in the           │
//! │  dashboard totals and the invoice report no longer reconciles.         │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    Every stored amount is an i64 count of cents.                       │
//! │    Dollars exist only at the edges: input (`from_dollars`) and         │
//! │    display (`to_currency_string`, `to_decimal_string`).                │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use crewbook_core::money::Money;
//!
//! let earned = Money::from_cents(500_000);
//! let spent = Money::from_cents(150_000);
//! assert_eq!((earned - spent).to_currency_string(), "$3,500.00");
//!
//! // Dollars come in through the rounding contract only
//! assert_eq!(Money::from_dollars(10.995).unwrap().cents(), 1100);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::error::ValidationError;

/// Largest dollar magnitude accepted by [`Money::from_dollars`].
///
/// Above 2^53 cents an `f64` can no longer represent every cent.
const MAX_DOLLARS: f64 = 90_071_992_547_409.0;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in cents.
///
/// ## Design Decisions
/// - **i64 (signed)**: net profit can go below zero even though every
///   stored document amount is non-negative
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Serializes as a bare integer** so documents keep their `...Cents` shape
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize, TS,
)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents.
    ///
    /// ## Example
    /// ```rust
    /// use crewbook_core::money::Money;
    ///
    /// let price = Money::from_cents(1099);
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Converts a dollar amount to cents, rounding half away from zero.
    ///
    /// Binary float noise is snapped away before rounding, so `1.005`
    /// becomes 101 cents rather than 100.
    ///
    /// ## Errors
    /// NaN, infinities and magnitudes past 2^53 cents are rejected.
    ///
    /// ## Example
    /// ```rust
    /// use crewbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_dollars(12.345).unwrap().cents(), 1235);
    /// assert_eq!(Money::from_dollars(-0.005).unwrap().cents(), -1);
    /// assert!(Money::from_dollars(f64::NAN).is_err());
    /// ```
    pub fn from_dollars(dollars: f64) -> Result<Self, ValidationError> {
        if !dollars.is_finite() {
            return Err(ValidationError::InvalidFormat {
                field: "dollars".to_string(),
                reason: "must be a finite number".to_string(),
            });
        }

        if dollars.abs() > MAX_DOLLARS {
            return Err(ValidationError::OutOfRange {
                field: "dollars".to_string(),
                min: -(MAX_DOLLARS as i64),
                max: MAX_DOLLARS as i64,
            });
        }

        let scaled = dollars * 100.0;
        // 100.49999999999999 → 100.5 before the half-away-from-zero round
        let snapped = (scaled * 1e6).round() / 1e6;
        Ok(Money(snapped.round() as i64))
    }

    /// Returns the value in cents.
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the whole-dollar portion (truncated toward zero).
    ///
    /// ## Example
    /// ```rust
    /// use crewbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1099).dollars(), 10);
    /// assert_eq!(Money::from_cents(-550).dollars(), -5);
    /// ```
    #[inline]
    pub const fn dollars(&self) -> i64 {
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

    /// Divides by a count, rounding half away from zero.
    ///
    /// A zero count yields zero instead of a division error; this is what
    /// the dashboard shows as "average profit" when no jobs are in range.
    ///
    /// ## Example
    /// ```rust
    /// use crewbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(1000).div_round(3).cents(), 333);
    /// assert_eq!(Money::from_cents(1001).div_round(2).cents(), 501);
    /// assert_eq!(Money::from_cents(-1001).div_round(2).cents(), -501);
    /// assert_eq!(Money::from_cents(1000).div_round(0), Money::zero());
    /// ```
    pub fn div_round(&self, count: u64) -> Money {
        if count == 0 {
            return Money::zero();
        }

        let numerator = self.0 as i128;
        let divisor = count as i128;
        let magnitude = (numerator.abs() * 2 + divisor) / (divisor * 2);
        let signed = if numerator < 0 { -magnitude } else { magnitude };
        Money(signed as i64)
    }

    /// Formats as a display currency string with thousands separators.
    ///
    /// ## Example
    /// ```rust
    /// use crewbook_core::money::Money;
    ///
    /// assert_eq!(Money::from_cents(123_456).to_currency_string(), "$1,234.56");
    /// assert_eq!(Money::from_cents(-550).to_currency_string(), "-$5.50");
    /// ```
    pub fn to_currency_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        format!(
            "{}${}.{:02}",
            sign,
            group_thousands(magnitude / 100),
            magnitude % 100
        )
    }

    /// Formats as a plain two-decimal dollar amount (`1234.56`).
    ///
    /// Used for machine-readable exports where a currency symbol or
    /// grouping separator would break spreadsheet parsing.
    pub fn to_decimal_string(&self) -> String {
        let sign = if self.0 < 0 { "-" } else { "" };
        let magnitude = self.0.unsigned_abs();
        format!("{}{}.{:02}", sign, magnitude / 100, magnitude % 100)
    }
}

/// Converts dollars to integer cents (half away from zero).
pub fn to_cents(dollars: f64) -> Result<i64, ValidationError> {
    Money::from_dollars(dollars).map(|m| m.cents())
}

/// Sums cents, clamping at `i64::MIN`/`i64::MAX` instead of overflowing.
pub fn sum_cents(values: impl IntoIterator<Item = i64>) -> i64 {
    values.into_iter().fold(0, i64::saturating_add)
}

/// Formats a cents amount for display (`$1,234.56`).
pub fn format_cents(cents: i64) -> String {
    Money::from_cents(cents).to_currency_string()
}

fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(ch);
    }
    grouped
}

// =============================================================================
// Trait Implementations
// =============================================================================

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_currency_string())
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
        iter.fold(Money::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Money> for Money {
    fn sum<I: Iterator<Item = &'a Money>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

impl From<i64> for Money {
    fn from(cents: i64) -> Self {
        Money(cents)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
