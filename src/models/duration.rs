//! Exact rational durations
//!
//! Every time value in the tree (written durations, multipliers, offsets,
//! time-signature lengths) is an exact rational. `Duration` wraps
//! `Rational64` and adds the LilyPond-specific notions: assignability
//! (can a single note head with dots carry this value?) and the canonic
//! decomposition used to re-spell unassignable values as tied runs.

use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Sub};

use num_rational::Rational64;
use serde::{Deserialize, Serialize};

use crate::error::{ScoreError, ScoreResult};

/// Re-export Rational for multipliers and ratios
pub type Rational = Rational64;

/// Positive or zero time value, measured in whole notes
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Duration(Rational);

impl Duration {
    /// Create a duration of `numerator / denominator` whole notes
    pub fn new(numerator: i64, denominator: i64) -> Self {
        Duration(Rational::new(numerator, denominator))
    }

    pub fn zero() -> Self {
        Duration(Rational::from_integer(0))
    }

    pub fn from_rational(value: Rational) -> Self {
        Duration(value)
    }

    pub fn as_rational(&self) -> Rational {
        self.0
    }

    pub fn numerator(&self) -> i64 {
        *self.0.numer()
    }

    pub fn denominator(&self) -> i64 {
        *self.0.denom()
    }

    pub fn is_zero(&self) -> bool {
        *self.0.numer() == 0
    }

    /// Multiply by a (tuplet or LilyPond) multiplier
    pub fn scale(&self, factor: Rational) -> Duration {
        Duration(self.0 * factor)
    }

    /// Ratio of this duration to `other`
    pub fn ratio_to(&self, other: Duration) -> Rational {
        self.0 / other.0
    }

    /// True when the reduced denominator is a power of two
    pub fn is_dyadic(&self) -> bool {
        is_power_of_two(self.denominator())
    }

    /// True when a single note head (with dots) can carry this duration.
    ///
    /// The numerator's bits must form one run of ones (`1`, `11`, `110`
    /// for 0, 1, 1 dots), the denominator must be a power of two, and the
    /// value must stay under 16 whole notes.
    pub fn is_assignable(&self) -> bool {
        let n = self.numerator();
        n > 0
            && is_power_of_two(odd_part(n) + 1)
            && self.is_dyadic()
            && self.0 < Rational::from_integer(16)
    }

    /// Number of augmentation dots of an assignable duration
    pub fn dot_count(&self) -> ScoreResult<u32> {
        if !self.is_assignable() {
            return Err(ScoreError::Assignability(self.to_string()));
        }
        Ok((odd_part(self.numerator()) + 1).trailing_zeros() - 1)
    }

    /// LilyPond duration token: `4`, `8.`, `1`, `\breve`, `\longa..`
    pub fn lilypond_duration_string(&self) -> ScoreResult<String> {
        let dots = self.dot_count()?;
        // undotted head: highest bit of the numerator
        let base = Rational::new(
            greatest_power_of_two_at_most(self.numerator()),
            self.denominator(),
        );
        let body = if base < Rational::from_integer(1) {
            format!("{}", base.recip())
        } else {
            match base.to_integer() {
                1 => "1".to_string(),
                2 => "\\breve".to_string(),
                4 => "\\longa".to_string(),
                _ => "\\maxima".to_string(),
            }
        };
        Ok(format!("{}{}", body, ".".repeat(dots as usize)))
    }

    /// Decompose into assignable parts, largest first.
    ///
    /// Uses the canonic partition of the numerator over a power-of-two
    /// denominator: each leading run of one bits becomes one (dotted) part.
    /// `5/16` becomes `1/4 + 1/16`; `13/16` becomes `3/4 + 1/16`.
    pub fn canonic_parts(&self) -> ScoreResult<Vec<Duration>> {
        if self.numerator() <= 0 || !self.is_dyadic() {
            return Err(ScoreError::Assignability(self.to_string()));
        }
        let mut parts = Vec::new();
        let mut remaining = *self;
        let maxima = Duration::new(8, 1);
        while remaining.0 >= Rational::from_integer(16) {
            parts.push(maxima);
            remaining = remaining - maxima;
        }
        if remaining.is_zero() {
            return Ok(parts);
        }
        let denominator = remaining.denominator();
        for numerator in partition_into_canonic_parts(remaining.numerator()) {
            parts.push(Duration::new(numerator, denominator));
        }
        Ok(parts)
    }
}

/// Split an integer into parts whose binary forms are single runs of ones
fn partition_into_canonic_parts(n: i64) -> Vec<i64> {
    let mut parts = Vec::new();
    let mut bit = 63 - n.leading_zeros() as i64;
    let mut current = 0;
    while bit >= 0 {
        let mask = 1i64 << bit;
        if n & mask != 0 {
            current |= mask;
        } else if current != 0 {
            parts.push(current);
            current = 0;
        }
        bit -= 1;
    }
    if current != 0 {
        parts.push(current);
    }
    parts
}

/// `n` with trailing zero bits removed
fn odd_part(n: i64) -> i64 {
    if n == 0 { 0 } else { n >> n.trailing_zeros() }
}

pub fn is_power_of_two(n: i64) -> bool {
    n > 0 && (n & (n - 1)) == 0
}

/// Largest power of two less than or equal to `n`
pub fn greatest_power_of_two_at_most(n: i64) -> i64 {
    if n <= 0 {
        return 1;
    }
    1i64 << (63 - n.leading_zeros())
}

/// Scaling implied by a time-signature denominator: `1` for powers of two,
/// otherwise `2^k / denominator` (`1/12` implies `2/3`)
pub fn implied_prolation(denominator: i64) -> Rational {
    Rational::new(greatest_power_of_two_at_most(denominator), denominator)
}

/// Format a multiplier as `n/d`
pub fn rational_string(value: Rational) -> String {
    format!("{}/{}", value.numer(), value.denom())
}

impl fmt::Display for Duration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator() == 1 {
            write!(f, "{}", self.numerator())
        } else {
            write!(f, "{}/{}", self.numerator(), self.denominator())
        }
    }
}

impl Add for Duration {
    type Output = Duration;
    fn add(self, rhs: Duration) -> Duration {
        Duration(self.0 + rhs.0)
    }
}

impl AddAssign for Duration {
    fn add_assign(&mut self, rhs: Duration) {
        self.0 += rhs.0;
    }
}

impl Sub for Duration {
    type Output = Duration;
    fn sub(self, rhs: Duration) -> Duration {
        Duration(self.0 - rhs.0)
    }
}

impl Sum for Duration {
    fn sum<I: Iterator<Item = Duration>>(iter: I) -> Duration {
        iter.fold(Duration::zero(), |acc, d| acc + d)
    }
}

impl From<(i64, i64)> for Duration {
    fn from(pair: (i64, i64)) -> Self {
        Duration::new(pair.0, pair.1)
    }
}
