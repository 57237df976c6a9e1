//! Rational numbers for time bases, aspect ratios and frame rates.

use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use tmblock_common::error::TmblockError;

/// An exact `num/den` fraction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    /// `0/1`, used for "unknown" aspect ratios and frame rates.
    pub const UNSET: Rational = Rational { num: 0, den: 1 };

    /// Square pixels.
    pub const ONE: Rational = Rational { num: 1, den: 1 };

    pub const fn new(num: i32, den: i32) -> Self {
        Self { num, den }
    }

    pub fn is_unset(&self) -> bool {
        self.num == 0 || self.den == 0
    }

    /// Swap numerator and denominator (frame rate -> frame duration).
    pub fn invert(&self) -> Self {
        Self {
            num: self.den,
            den: self.num,
        }
    }

    /// Convert a timestamp counted in `from` units into `to` units,
    /// rounding to the nearest tick (halves away from zero).
    pub fn rescale(ts: i64, from: Rational, to: Rational) -> i64 {
        let num = ts as i128 * from.num as i128 * to.den as i128;
        let den = from.den as i128 * to.num as i128;
        if den == 0 {
            return ts;
        }
        let (num, den) = if den < 0 { (-num, -den) } else { (num, den) };
        let half = den / 2;
        let rounded = if num >= 0 {
            (num + half) / den
        } else {
            (num - half) / den
        };
        rounded.clamp(i64::MIN as i128, i64::MAX as i128) as i64
    }

    /// Compare two timestamps expressed in different time bases, exactly.
    pub fn compare_ts(a: i64, a_tb: Rational, b: i64, b_tb: Rational) -> Ordering {
        let lhs = a as i128 * a_tb.num as i128 * b_tb.den as i128;
        let rhs = b as i128 * b_tb.num as i128 * a_tb.den as i128;
        if (a_tb.den < 0) != (b_tb.den < 0) {
            rhs.cmp(&lhs)
        } else {
            lhs.cmp(&rhs)
        }
    }
}

impl Default for Rational {
    fn default() -> Self {
        Self::UNSET
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl FromStr for Rational {
    type Err = TmblockError;

    /// Accepts `N/D` or a bare integer `N` (meaning `N/1`).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || TmblockError::config(format!("invalid rational '{s}'"));
        match s.split_once('/') {
            Some((n, d)) => {
                let num = n.trim().parse().map_err(|_| invalid())?;
                let den: i32 = d.trim().parse().map_err(|_| invalid())?;
                if den == 0 {
                    return Err(invalid());
                }
                Ok(Self { num, den })
            }
            None => Ok(Self {
                num: s.trim().parse().map_err(|_| invalid())?,
                den: 1,
            }),
        }
    }
}
