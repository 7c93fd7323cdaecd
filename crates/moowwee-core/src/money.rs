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
//! │  Splitting a $100.00 tip across 7 movers:                               │
//! │    $100.00 / 7 = $14.29 (×7 = $100.03)  → Paid out 3 cents too much!   │
//! │                                                                         │
//! │  OUR SOLUTION: Integer Cents                                            │
//! │    10000 cents / 7 = 1428 cents (×7 = 9996 cents)                      │
//! │    We KNOW 4 cents are left over, and hand them to one share           │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Rounding
//! Every derived amount (labor for partial hours, transport per mile,
//! percentage tips) rounds **half-up** to the cent: 0.5 cent becomes 1 cent.
//!
//! ## Usage
//! ```rust
//! use moowwee_core::money::Money;
//!
//! let fee = Money::from_cents(12_500); // $125.00
//! let total: Money = fee * 3 + Money::from_cents(3_000);
//! assert_eq!(total.to_string(), "$405.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Mul, Sub, SubAssign};
use ts_rs::TS;

use crate::types::Percentage;

// =============================================================================
// Money Type
// =============================================================================

/// Represents a monetary value in the smallest currency unit (cents for USD).
///
/// ## Design Decisions
/// - **i64 (signed)**: A misconfigured negative rate must be representable so
///   the pricing engine can detect and clamp it
/// - **Single field tuple struct**: Zero-cost abstraction over i64
/// - **Derives**: Full serde support for JSON serialization
///
/// ## Where Money is Used
/// ```text
/// ┌─────────────────────────────────────────────────────────────────────────┐
/// │  RateConfiguration.hourly_rate ──┐                                      │
/// │  RateConfiguration.floor_fee ────┼──► PriceBreakdown lines ──► total   │
/// │  MaterialLine.unit_price ────────┘                              │       │
/// │                                                                 ▼       │
/// │                                    Job.price ──► checkout ──► tips     │
/// └─────────────────────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Money(i64);

impl Money {
    /// Creates a Money value from cents (the smallest currency unit).
    ///
    /// ## Example
    /// ```rust
    /// use moowwee_core::money::Money;
    ///
    /// let price = Money::from_cents(1099); // Represents $10.99
    /// assert_eq!(price.cents(), 1099);
    /// ```
    #[inline]
    pub const fn from_cents(cents: i64) -> Self {
        Money(cents)
    }

    /// Creates a Money value from whole dollars.
    #[inline]
    pub const fn from_dollars(dollars: i64) -> Self {
        Money(dollars * 100)
    }

    /// Creates a Money value from major and minor units (dollars and cents).
    ///
    /// ## Example
    /// ```rust
    /// use moowwee_core::money::Money;
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

    /// Returns the value in cents (smallest currency unit).
    #[inline]
    pub const fn cents(&self) -> i64 {
        self.0
    }

    /// Returns the major unit (dollars) portion.
    #[inline]
    pub const fn dollars(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the minor unit (cents) portion (always 0-99).
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

    /// Returns the value, or zero when it is negative.
    #[inline]
    pub const fn clamp_non_negative(&self) -> Self {
        if self.0 < 0 {
            Money(0)
        } else {
            Money(self.0)
        }
    }

    /// Multiplies money by a quantity.
    ///
    /// ## Example
    /// ```rust
    /// use moowwee_core::money::Money;
    ///
    /// let small_box = Money::from_cents(300);
    /// assert_eq!(small_box.multiply_quantity(10).cents(), 3000);
    /// ```
    #[inline]
    pub const fn multiply_quantity(&self, qty: i64) -> Self {
        Money(self.0 * qty)
    }

    /// Scales by the ratio `numerator / denominator`, rounding half-up.
    ///
    /// Used for partial hours (`rate × minutes / 60`) and distances
    /// (`fee × millimeters / 1_609_344`). Computed in i128 so large
    /// intermediate products cannot overflow.
    ///
    /// ## Example
    /// ```rust
    /// use moowwee_core::money::Money;
    ///
    /// // $125.00 for 1h10m = $145.833.. → $145.83
    /// let labor = Money::from_cents(12_500).scale(70, 60);
    /// assert_eq!(labor.cents(), 14_583);
    /// ```
    pub fn scale(&self, numerator: i64, denominator: i64) -> Money {
        let cents = div_round_half_up(
            self.0 as i128 * numerator as i128,
            denominator as i128,
        );
        Money::from_cents(cents as i64)
    }

    /// Returns `percentage` of this amount, rounding half-up to the cent.
    ///
    /// ## Example
    /// ```rust
    /// use moowwee_core::money::Money;
    /// use moowwee_core::types::Percentage;
    ///
    /// let price = Money::from_cents(20_000); // $200.00
    /// assert_eq!(price.percentage(Percentage::from_whole(15)).cents(), 3_000);
    ///
    /// // 12.5% of $0.99 = 12.375 cents → 12 cents
    /// let odd = Money::from_cents(99).percentage(Percentage::from_bps(1250));
    /// assert_eq!(odd.cents(), 12);
    /// ```
    pub fn percentage(&self, percentage: Percentage) -> Money {
        self.scale(percentage.bps() as i64, 10_000)
    }

    /// Expresses this amount as a percentage of `base`, rounded half-up to
    /// the basis point. Returns `None` when `base` is not positive.
    ///
    /// ## Example
    /// ```rust
    /// use moowwee_core::money::Money;
    ///
    /// let tip = Money::from_cents(2_500);
    /// let price = Money::from_cents(20_000);
    /// assert_eq!(tip.ratio_of(price).unwrap().bps(), 1_250); // 12.50%
    /// ```
    pub fn ratio_of(&self, base: Money) -> Option<Percentage> {
        if !base.is_positive() || self.is_negative() {
            return None;
        }
        let bps = div_round_half_up(self.0 as i128 * 10_000, base.0 as i128);
        u32::try_from(bps).ok().map(Percentage::from_bps)
    }

    /// Splits the amount into `parts` equal shares.
    ///
    /// ## Remainder Rule
    /// Every share gets `amount / parts` cents; the leftover cents
    /// (`amount % parts`, always fewer than `parts`) go to the **first**
    /// share. The shares therefore always sum to exactly the original amount.
    ///
    /// ```text
    /// $100.00 / 7 → [$14.32, $14.28, $14.28, $14.28, $14.28, $14.28, $14.28]
    ///                  ▲ absorbs 4 cents            Σ = $100.00
    /// ```
    ///
    /// Returns an empty vector when `parts` is zero.
    pub fn split_evenly(&self, parts: u32) -> Vec<Money> {
        if parts == 0 {
            return Vec::new();
        }
        let parts_i = parts as i64;
        let base = self.0 / parts_i;
        let remainder = self.0 - base * parts_i;

        let mut shares = vec![Money(base); parts as usize];
        shares[0] = Money(base + remainder);
        shares
    }
}

/// Integer division rounding half away from zero.
///
/// `denominator` must be positive.
fn div_round_half_up(numerator: i128, denominator: i128) -> i128 {
    debug_assert!(denominator > 0);
    if numerator >= 0 {
        (numerator * 2 + denominator) / (denominator * 2)
    } else {
        -((-numerator * 2 + denominator) / (denominator * 2))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Display implementation shows money in a human-readable format.
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

/// Default money is zero.
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

/// Multiplication by integer (for quantity calculations).
impl Mul<i32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i32) -> Self {
        Money(self.0 * qty as i64)
    }
}

impl Mul<i64> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: i64) -> Self {
        Money(self.0 * qty)
    }
}

impl Mul<u32> for Money {
    type Output = Self;

    #[inline]
    fn mul(self, qty: u32) -> Self {
        Money(self.0 * qty as i64)
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
        assert_eq!(money.dollars(), 10);
        assert_eq!(money.cents_part(), 99);
        assert_eq!(Money::from_dollars(125).cents(), 12_500);
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", Money::from_cents(1099)), "$10.99");
        assert_eq!(format!("{}", Money::from_cents(500)), "$5.00");
        assert_eq!(format!("{}", Money::from_cents(-550)), "-$5.50");
        assert_eq!(format!("{}", Money::from_cents(0)), "$0.00");
    }

    #[test]
    fn test_arithmetic_and_sum() {
        let a = Money::from_cents(1000);
        let b = Money::from_cents(500);

        assert_eq!((a + b).cents(), 1500);
        assert_eq!((a - b).cents(), 500);
        assert_eq!((a * 3u32).cents(), 3000);

        let total: Money = vec![a, b, b].into_iter().sum();
        assert_eq!(total.cents(), 2000);
    }

    #[test]
    fn test_scale_rounds_half_up() {
        // 1 cent × 1 / 2 = 0.5 → 1
        assert_eq!(Money::from_cents(1).scale(1, 2).cents(), 1);
        // 1 cent × 1 / 3 = 0.333 → 0
        assert_eq!(Money::from_cents(1).scale(1, 3).cents(), 0);
        // negative values round symmetrically
        assert_eq!(Money::from_cents(-1).scale(1, 2).cents(), -1);
    }

    #[test]
    fn test_percentage_and_ratio() {
        let price = Money::from_cents(20_000);
        assert_eq!(price.percentage(Percentage::from_whole(15)).cents(), 3_000);

        let ratio = Money::from_cents(3_000).ratio_of(price).unwrap();
        assert_eq!(ratio.bps(), 1_500);

        assert!(Money::from_cents(100).ratio_of(Money::zero()).is_none());
    }

    #[test]
    fn test_split_evenly_exact() {
        let shares = Money::from_cents(3_000).split_evenly(3);
        assert_eq!(shares, vec![Money::from_cents(1_000); 3]);
    }

    #[test]
    fn test_split_evenly_first_share_absorbs_remainder() {
        let total = Money::from_cents(10_000);
        let shares = total.split_evenly(7);

        assert_eq!(shares.len(), 7);
        assert_eq!(shares[0].cents(), 1_432);
        assert!(shares[1..].iter().all(|s| s.cents() == 1_428));
        assert_eq!(shares.iter().sum::<Money>(), total);
    }

    #[test]
    fn test_split_evenly_zero_parts() {
        assert!(Money::from_cents(100).split_evenly(0).is_empty());
    }

    #[test]
    fn test_clamp_non_negative() {
        assert_eq!(Money::from_cents(-5).clamp_non_negative(), Money::zero());
        assert_eq!(Money::from_cents(5).clamp_non_negative().cents(), 5);
    }
}
