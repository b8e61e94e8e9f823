use std::{
    fmt::Display,
    iter::Sum,
    ops::{Add, AddAssign, Mul, Neg, Sub},
};

use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

use crate::op;

//--------------------------------------        Cents        ---------------------------------------------------------

/// A monetary amount in minor currency units (cents). Sales totals are always integer cents; any
/// rounding happens before a value becomes a `Cents`.
#[derive(Debug, Clone, Copy, Default, Type, Ord, PartialOrd, Serialize, Deserialize)]
#[sqlx(transparent)]
pub struct Cents(i64);

op!(binary Cents, Add, add);
op!(binary Cents, Sub, sub);
op!(inplace Cents, AddAssign, add_assign);
op!(unary Cents, Neg, neg);

impl Mul<i64> for Cents {
    type Output = Self;

    fn mul(self, rhs: i64) -> Self::Output {
        Self::from(self.value() * rhs)
    }
}

impl Sum for Cents {
    fn sum<I: Iterator<Item = Self>>(iter: I) -> Self {
        iter.fold(Self::default(), Add::add)
    }
}

#[derive(Debug, Clone, Error)]
#[error("Value cannot be represented in cents: {0}")]
pub struct CentsConversionError(String);

impl From<i64> for Cents {
    fn from(value: i64) -> Self {
        Self(value)
    }
}

impl PartialEq for Cents {
    fn eq(&self, other: &Self) -> bool {
        self.0 == other.0
    }
}

impl Eq for Cents {}

impl TryFrom<u64> for Cents {
    type Error = CentsConversionError;

    fn try_from(value: u64) -> Result<Self, Self::Error> {
        if value > i64::MAX as u64 {
            Err(CentsConversionError(format!("Value {} is too large to convert to Cents", value)))
        } else {
            #[allow(clippy::cast_possible_wrap)]
            Ok(Self(value as i64))
        }
    }
}

impl Display for Cents {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        let abs = self.0.abs();
        write!(f, "{sign}${}.{:02}", abs / 100, abs % 100)
    }
}

impl Cents {
    pub fn value(&self) -> i64 {
        self.0
    }

    /// Converts whole currency units into cents.
    pub fn from_whole(units: i64) -> Self {
        Self(units * 100)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn arithmetic() {
        let a = Cents::from(1500);
        let b = Cents::from(250);
        assert_eq!(a + b, Cents::from(1750));
        assert_eq!(a - b, Cents::from(1250));
        assert_eq!(b * 4, Cents::from(1000));
        assert_eq!(-b, Cents::from(-250));
        assert_eq!(vec![a, b].into_iter().sum::<Cents>(), Cents::from(1750));
    }

    #[test]
    fn formatting() {
        assert_eq!(Cents::from(123456).to_string(), "$1234.56");
        assert_eq!(Cents::from(5).to_string(), "$0.05");
        assert_eq!(Cents::from(-1999).to_string(), "-$19.99");
        assert_eq!(Cents::from_whole(12).to_string(), "$12.00");
    }
}
