//! # Money Module
//!
//! Monetary values as integer rupiah.
//!
//! ## Why Integer Money?
//! Floating point drifts (`0.1 + 0.2 != 0.3`), and drift in the totals used
//! for shift reconciliation means a phantom cash variance at close. Every
//! amount in the system is therefore an `i64` count of whole rupiah; the
//! only place a percentage appears is basis-point math with explicit
//! integer rounding.
//!
//! ## Usage
//! ```rust
//! use warung_core::money::Money;
//!
//! let price = Money::new(15_000);
//! let line = price * 3;
//! assert_eq!(line.amount(), 45_000);
//! assert_eq!(line.to_string(), "Rp45.000");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign};

// =============================================================================
// Money Type
// =============================================================================

/// A monetary value in whole rupiah.
///
/// ## Design Decisions
/// - **i64 (signed)**: negative values are legal for discounts, count
///   adjustments and cash variance (actual − expected)
/// - **Single-field tuple struct**: zero-cost wrapper, `Copy` everywhere
/// - **No float constructor**: there is deliberately no `from_f64`
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default,
)]
#[serde(transparent)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
pub struct Money(i64);

impl Money {
    /// Creates a money value from whole rupiah.
    #[inline]
    pub const fn new(amount: i64) -> Self {
        Money(amount)
    }

    /// Returns the raw amount in rupiah.
    #[inline]
    pub const fn amount(&self) -> i64 {
        self.0
    }

    /// Zero rupiah.
    #[inline]
    pub const fn zero() -> Self {
        Money(0)
    }

    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Absolute value (for rendering variances).
    #[inline]
    pub const fn abs(&self) -> Self {
        Money(self.0.abs())
    }

    /// Takes a percentage expressed in basis points (1000 bps = 10%).
    ///
    /// Integer math with round-half-up: `(amount * bps + 5000) / 10000`.
    /// Widens to i128 so a large subtotal cannot overflow mid-multiply.
    ///
    /// ```rust
    /// use warung_core::money::Money;
    ///
    /// let subtotal = Money::new(100_000);
    /// assert_eq!(subtotal.percentage(1000).amount(), 10_000); // 10%
    /// ```
    pub fn percentage(&self, bps: u32) -> Money {
        let part = (self.0 as i128 * bps as i128 + 5000) / 10000;
        Money(part as i64)
    }

    /// Multiplies by a quantity (line totals).
    #[inline]
    pub const fn times(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

// =============================================================================
// Formatting
// =============================================================================

/// Groups digits with `.` separators, Indonesian style: `1234567` → `1.234.567`.
fn group_thousands(mut n: u64) -> String {
    if n == 0 {
        return "0".to_string();
    }
    let mut groups: Vec<String> = Vec::new();
    while n > 0 {
        groups.push(format!("{:03}", n % 1000));
        n /= 1000;
    }
    // Strip the leading zeros of the most significant group.
    let last = groups.len() - 1;
    groups[last] = groups[last].trim_start_matches('0').to_string();
    groups.reverse();
    groups.join(".")
}

/// Renders as `Rp12.500`; negative amounts get a minus sign, never
/// parentheses: `-Rp12.500`.
impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}Rp{}", sign, group_thousands(self.0.unsigned_abs()))
    }
}

// =============================================================================
// Arithmetic
// =============================================================================

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

impl Neg for Money {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Money(-self.0)
    }
}

impl std::iter::Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Self {
        iter.fold(Money::zero(), |acc, m| acc + m)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
