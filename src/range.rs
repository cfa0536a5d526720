//! Closed numeric ranges and linear scaling between them.
//!
//! Devices that bridge host telemetry or controller inputs to machine words
//! use these to map, say, a throttle in `[0, 1]` onto `[0, 65535]`.

use std::fmt;

use crate::error::RangeError;

/// A closed interval `[min, max]` with `min < max`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Range {
    min: f64,
    max: f64,
}

impl Range {
    /// `[-32768, 32767]`
    pub const SIGNED_INT16: Range = Range::new_unchecked(i16::MIN as f64, i16::MAX as f64);
    /// `[0, 65535]`
    pub const UNSIGNED_INT16: Range = Range::new_unchecked(0.0, u16::MAX as f64);
    /// `[-1, 1]`
    pub const SIGNED_UNARY: Range = Range::new_unchecked(-1.0, 1.0);
    /// `[0, 1]`
    pub const UNSIGNED_UNARY: Range = Range::new_unchecked(0.0, 1.0);
    /// `[-180, 180]`
    pub const SIGNED_DEGREES_CIRCLE: Range = Range::new_unchecked(-180.0, 180.0);
    /// `[0, 360]`
    pub const UNSIGNED_DEGREES_CIRCLE: Range = Range::new_unchecked(0.0, 360.0);
    /// `[-90, 90]`
    pub const SIGNED_DEGREES_HALF_CIRCLE: Range = Range::new_unchecked(-90.0, 90.0);
    /// `[0, 180]`
    pub const UNSIGNED_DEGREES_HALF_CIRCLE: Range = Range::new_unchecked(0.0, 180.0);

    /// Creates a range, rejecting `min >= max` (and NaN bounds).
    pub fn new(min: f64, max: f64) -> Result<Self, RangeError> {
        if min < max {
            Ok(Self { min, max })
        } else {
            Err(RangeError::Inverted { min, max })
        }
    }

    const fn new_unchecked(min: f64, max: f64) -> Self {
        Self { min, max }
    }

    pub fn min(&self) -> f64 {
        self.min
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    pub fn magnitude(&self) -> f64 {
        self.max - self.min
    }

    /// Inclusive on both ends.
    pub fn contains(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    /// Wraps `value` back into the range as if the range repeated forever.
    ///
    /// ```
    /// use dcpu16::Range;
    ///
    /// let percent = Range::new(0.0, 100.0).unwrap();
    /// assert_eq!(percent.reduce(101.0), 1.0);
    /// assert_eq!(percent.reduce(-1.0), 99.0);
    /// assert_eq!(percent.reduce(42.0), 42.0);
    /// ```
    pub fn reduce(&self, value: f64) -> f64 {
        if value < self.min {
            self.max - ((self.min - value) % self.magnitude())
        } else if value > self.max {
            self.min + ((value - self.max) % self.magnitude())
        } else {
            value
        }
    }

    /// Linearly maps `value` from `from` onto `to`.
    pub fn scale(from: Range, to: Range, value: f64) -> Result<f64, RangeError> {
        if !from.contains(value) {
            return Err(RangeError::OutOfRange {
                value,
                min: from.min,
                max: from.max,
            });
        }
        Ok(Self::scale_unchecked(from, to, value))
    }

    fn scale_unchecked(from: Range, to: Range, value: f64) -> f64 {
        to.min + to.magnitude() * ((value - from.min) / from.magnitude())
    }

    /// Maps `value` from `from` into this range.
    pub fn scale_from(&self, from: Range, value: f64) -> Result<f64, RangeError> {
        Self::scale(from, *self, value)
    }

    /// Maps `value` from this range into `to`.
    pub fn scale_to(&self, to: Range, value: f64) -> Result<f64, RangeError> {
        Self::scale(*self, to, value)
    }
}

impl fmt::Display for Range {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}, {}]", self.min, self.max)
    }
}

pub fn signed_int16_to_signed_unary(value: i16) -> f32 {
    Range::scale_unchecked(Range::SIGNED_INT16, Range::SIGNED_UNARY, value as f64) as f32
}

pub fn unsigned_int16_to_unsigned_unary(value: u16) -> f32 {
    Range::scale_unchecked(Range::UNSIGNED_INT16, Range::UNSIGNED_UNARY, value as f64) as f32
}

/// Fractions truncate toward zero.
pub fn signed_unary_to_signed_int16(value: f32) -> Result<i16, RangeError> {
    Range::scale(Range::SIGNED_UNARY, Range::SIGNED_INT16, value as f64).map(|v| v as i16)
}

pub fn unsigned_unary_to_unsigned_int16(value: f32) -> Result<u16, RangeError> {
    Range::scale(Range::UNSIGNED_UNARY, Range::UNSIGNED_INT16, value as f64).map(|v| v as u16)
}
