//! Fixed-point money arithmetic
//!
//! All amounts in the workspace are integers in minor currency units
//! (e.g. won, cents). Floating point never touches a balance.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub};

/// Amount in minor currency units. Signed: negative values are debits.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct Money(i64);

impl Money {
    /// Zero amount
    pub const ZERO: Money = Money(0);

    /// Create from minor units
    pub const fn from_minor(amount: i64) -> Self {
        Self(amount)
    }

    /// Raw minor units
    pub const fn minor(&self) -> i64 {
        self.0
    }

    /// Checked addition
    pub fn checked_add(self, other: Money) -> Option<Money> {
        self.0.checked_add(other.0).map(Money)
    }

    /// Checked subtraction
    pub fn checked_sub(self, other: Money) -> Option<Money> {
        self.0.checked_sub(other.0).map(Money)
    }

    /// Absolute value
    pub fn abs(self) -> Money {
        Money(self.0.abs())
    }

    /// True for amounts below zero
    pub fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// True for amounts above zero
    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// True for exactly zero
    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Divide across `count` heads, rounding up.
    ///
    /// Collecting `div_ceil` per head over all heads never under-collects
    /// the total; the rounding surplus stays with the group.
    pub fn div_ceil(self, count: i64) -> Money {
        debug_assert!(count > 0);
        debug_assert!(self.0 >= 0);
        Money((self.0 + count - 1) / count)
    }

    /// Divide across `count` heads, rounding down.
    ///
    /// Refunding `div_floor` per head over all heads never over-refunds
    /// the total; the remainder is retained.
    pub fn div_floor(self, count: i64) -> Money {
        debug_assert!(count > 0);
        debug_assert!(self.0 >= 0);
        Money(self.0 / count)
    }
}

impl Add for Money {
    type Output = Money;

    fn add(self, other: Money) -> Money {
        Money(self.0 + other.0)
    }
}

impl AddAssign for Money {
    fn add_assign(&mut self, other: Money) {
        self.0 += other.0;
    }
}

impl Sub for Money {
    type Output = Money;

    fn sub(self, other: Money) -> Money {
        Money(self.0 - other.0)
    }
}

impl Neg for Money {
    type Output = Money;

    fn neg(self) -> Money {
        Money(-self.0)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Money>>(iter: I) -> Money {
        iter.fold(Money::ZERO, |acc, m| acc + m)
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for Money {
    fn from(amount: i64) -> Self {
        Money(amount)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arithmetic() {
        let a = Money::from_minor(3000);
        let b = Money::from_minor(-1000);
        assert_eq!(a + b, Money::from_minor(2000));
        assert_eq!(a - b, Money::from_minor(4000));
        assert_eq!(-b, Money::from_minor(1000));
        assert!(b.is_negative());
        assert_eq!(b.abs(), Money::from_minor(1000));
    }

    #[test]
    fn test_checked_add_overflow() {
        let max = Money::from_minor(i64::MAX);
        assert!(max.checked_add(Money::from_minor(1)).is_none());
        assert_eq!(
            Money::from_minor(1).checked_add(Money::from_minor(2)),
            Some(Money::from_minor(3))
        );
    }

    #[test]
    fn test_div_ceil_and_floor() {
        assert_eq!(Money::from_minor(100).div_ceil(3), Money::from_minor(34));
        assert_eq!(Money::from_minor(100).div_floor(3), Money::from_minor(33));
        assert_eq!(Money::from_minor(99).div_ceil(3), Money::from_minor(33));
        assert_eq!(Money::from_minor(99).div_floor(3), Money::from_minor(33));
    }

    #[test]
    fn test_sum() {
        let total: Money = [1000, 2000, 3000]
            .into_iter()
            .map(Money::from_minor)
            .sum();
        assert_eq!(total, Money::from_minor(6000));
    }
}
