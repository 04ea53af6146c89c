use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub, SubAssign},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

pub const PLATFORM_CURRENCY_CODE: &str = "USD";
pub const PLATFORM_CURRENCY_CODE_LOWER: &str = "usd";

//--------------------------------------       Money         ---------------------------------------------------------
/// A monetary amount in minor units (cents) of some currency. The currency itself travels in a
/// separate column/field; amounts in different currencies must never be compared directly.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Money(i64);

op!(binary Money, Add, add);
op!(binary Money, Sub, sub);
op!(inplace Money, AddAssign, add_assign);
op!(inplace Money, SubAssign, sub_assign);
op!(unary Money, Neg, neg);

impl Mul<i64> for Money {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Money {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented as a monetary amount: {0}")]
pub struct MoneyConversionError(String);

impl From<i64> for Money {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Money {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Money {}

impl TryFrom<u64> for Money {
    type Error = MoneyConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(MoneyConversionError(format!("Value {} is too large to convert to Money", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Money {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let units = self.0 / 100;
        let cents = (self.0 % 100).abs();
        write!(f, "{units}.{cents:02}")
    }
}

impl Money {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Construct an amount from whole currency units (e.g. dollars).
    pub fn from_units(units: i64) -> Self {
        Self(units * 100)
    }

    pub fn is_zero(&self) -> bool {
        self.0 == 0
    }

    pub fn is_positive(&self) -> bool {
        self.0 > 0
    }

    /// The smaller of `self` and `other`.
    pub fn min(self, other: Self) -> Self {
        if self.0 <= other.0 {
            self
        } else {
            other
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn money_arithmetic() {
        let a = Money::from_units(50);
        let b = Money::from(2_500);
        assert_eq!(a + b, Money::from(7_500));
        assert_eq!(a - b, Money::from(2_500));
        assert_eq!(-b, Money::from(-2_500));
        assert_eq!(b * 3, Money::from(7_500));
        let total: Money = [a, b, b].into_iter().sum();
        assert_eq!(total, Money::from(10_000));
    }

    #[test]
    fn money_display() {
        assert_eq!(format!("{}", Money::from(12_345)), "123.45");
        assert_eq!(format!("{}", Money::from(5)), "0.05");
        assert_eq!(format!("{}", Money::from(-150)), "-1.50");
    }

    #[test]
    fn money_min() {
        let a = Money::from(100);
        let b = Money::from(250);
        assert_eq!(a.min(b), a);
        assert_eq!(b.min(a), a);
    }
}
