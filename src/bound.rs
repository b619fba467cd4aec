// SPDX-License-Identifier: MPL-2.0

//! Validation of range bounds.
//!
//! Bounds may come from loosely typed sources, so they are accepted as [`Number`]s that can be
//! absent, fractional or far outside the range of exactly representable integers. Validation
//! turns a pair of such bounds into a [`ValidatedRange`], reporting the first failing check in
//! this order:
//!
//! 1. `min` is present.
//! 2. `max` is present.
//! 3. `min` is an integer.
//! 4. `max` is an integer.
//! 5. `max > min`.
//! 6. `min` is a safe integer.
//! 7. `max` is a safe integer.
//! 8. `max - min` is a safe integer.

use crate::generator::SecureRandomError;
use std::{cmp::Ordering, fmt};

/// Largest integer `n` such that `n` and `n + 1` are both exactly representable as an `f64`.
pub const MAX_SAFE_INTEGER: i64 = (1 << 53) - 1;

/// Negation of [`MAX_SAFE_INTEGER`].
pub const MIN_SAFE_INTEGER: i64 = -MAX_SAFE_INTEGER;

/// 2^127, the first float magnitude that does not fit in an `i128`.
const I128_LIMIT: f64 = 170_141_183_460_469_231_731_687_303_715_884_105_728.0;

/// A numeric bound as supplied by a caller.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Number {
    /// An integer value.
    Int(i128),
    /// A floating point value, which may or may not be integral.
    Float(f64),
}

macro_rules! number_from_int {
    ($($t:ty),*) => {
        $(
            impl From<$t> for Number {
                fn from(value: $t) -> Self {
                    Number::Int(value.into())
                }
            }
        )*
    };
}

number_from_int!(i8, i16, i32, i64, i128, u8, u16, u32, u64);

impl From<isize> for Number {
    fn from(value: isize) -> Self {
        // isize is at most 64 bits wide on every supported target.
        Number::Int(value as i128)
    }
}

impl From<usize> for Number {
    fn from(value: usize) -> Self {
        Number::Int(value as i128)
    }
}

impl From<f32> for Number {
    fn from(value: f32) -> Self {
        Number::Float(value.into())
    }
}

impl From<f64> for Number {
    fn from(value: f64) -> Self {
        Number::Float(value)
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Number::Int(value) => write!(f, "{value}"),
            Number::Float(value) => write!(f, "{value}"),
        }
    }
}

/// An integral bound with an exact total order.
///
/// Integral floats of magnitude `2^127` or more can't be converted to `i128`, but they still need
/// to be ordered exactly against each other and against every `i128`.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Integral {
    Exact(i128),
    Huge(f64),
}

impl Integral {
    fn new(number: Number) -> Option<Self> {
        match number {
            Number::Int(value) => Some(Integral::Exact(value)),
            Number::Float(value) if !value.is_finite() || value.fract() != 0.0 => None,
            Number::Float(value) if (-I128_LIMIT..I128_LIMIT).contains(&value) => {
                Some(Integral::Exact(value as i128))
            }
            Number::Float(value) => Some(Integral::Huge(value)),
        }
    }

    /// The value as an `i64`, if it is a safe integer.
    fn safe(self) -> Option<i64> {
        match self {
            Integral::Exact(value) => i64::try_from(value)
                .ok()
                .filter(|value| (MIN_SAFE_INTEGER..=MAX_SAFE_INTEGER).contains(value)),
            Integral::Huge(_) => None,
        }
    }
}

impl PartialOrd for Integral {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        match (self, other) {
            (Integral::Exact(a), Integral::Exact(b)) => a.partial_cmp(b),
            (Integral::Huge(a), Integral::Huge(b)) => a.partial_cmp(b),
            (Integral::Huge(a), Integral::Exact(_)) => {
                0.0_f64.partial_cmp(a).map(Ordering::reverse)
            }
            (Integral::Exact(_), Integral::Huge(b)) => 0.0_f64.partial_cmp(b),
        }
    }
}

/// A pair of safe integer bounds with `min < max` and a safe span.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ValidatedRange {
    min: i64,
    max: i64,
}

impl ValidatedRange {
    /// Validate a pair of typed bounds.
    pub fn new(min: i64, max: i64) -> Result<Self, SecureRandomError> {
        validate(Some(min.into()), Some(max.into()))
    }

    /// The lower bound.
    pub fn min(&self) -> i64 {
        self.min
    }

    /// The upper bound. Results of sampling may be equal to it.
    pub fn max(&self) -> i64 {
        self.max
    }

    /// `max - min`, the largest candidate that is accepted.
    pub fn span(&self) -> u64 {
        self.max.abs_diff(self.min)
    }

    /// Map an accepted candidate into the range.
    pub(crate) fn offset(&self, candidate: u64) -> Option<i64> {
        if candidate > self.span() {
            return None;
        }
        // The span is at most MAX_SAFE_INTEGER, so this can't overflow.
        i64::try_from(candidate)
            .ok()
            .and_then(|candidate| self.min.checked_add(candidate))
    }
}

/// Check a pair of possibly missing bounds. The first failing check is reported.
pub fn validate(
    min: Option<Number>,
    max: Option<Number>,
) -> Result<ValidatedRange, SecureRandomError> {
    let min = min.ok_or(SecureRandomError::MinNotDefined)?;
    let max = max.ok_or(SecureRandomError::MaxNotDefined)?;

    let min_integral = Integral::new(min).ok_or(SecureRandomError::MinNotInteger(min))?;
    let max_integral = Integral::new(max).ok_or(SecureRandomError::MaxNotInteger(max))?;

    if max_integral <= min_integral {
        return Err(SecureRandomError::MaxNotGreaterThanMin { min, max });
    }

    let min = min_integral
        .safe()
        .ok_or(SecureRandomError::MinOutOfSafeRange(min))?;
    let max = max_integral
        .safe()
        .ok_or(SecureRandomError::MaxOutOfSafeRange(max))?;

    // Both bounds are at most 2^53 in magnitude, so the difference fits in an i64.
    if max - min > MAX_SAFE_INTEGER {
        return Err(SecureRandomError::RangeOutOfSafeRange { min, max });
    }

    Ok(ValidatedRange { min, max })
}
