//! Timestamp handling for media streams

use super::Rational;
use std::fmt;

/// Time base for timestamps (seconds per tick)
pub type TimeBase = Rational;

/// A timestamp in a media stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Timestamp {
    /// Timestamp value in time_base units
    pub value: i64,
}

impl Timestamp {
    /// Create a new timestamp
    pub fn new(value: i64) -> Self {
        Timestamp { value }
    }

    /// No timestamp / unknown timestamp
    pub fn none() -> Self {
        Timestamp { value: i64::MIN }
    }

    /// Check if timestamp is valid
    pub fn is_valid(&self) -> bool {
        self.value != i64::MIN
    }

    /// Convert timestamp to seconds
    pub fn to_seconds(&self, time_base: TimeBase) -> f64 {
        if !self.is_valid() {
            return 0.0;
        }
        self.value as f64 * time_base.to_f64()
    }

    /// Rescale timestamp from one time base to another, rounding down
    pub fn rescale(&self, from: TimeBase, to: TimeBase) -> Self {
        if !self.is_valid() || !from.is_valid_time_base() || !to.is_valid_time_base() {
            return *self;
        }

        // value * from / to
        let rescaled = (self.value as i128 * from.num as i128 * to.den as i128)
            .div_euclid(from.den as i128 * to.num as i128);

        Timestamp {
            value: rescaled as i64,
        }
    }

    /// Offset a valid timestamp by a number of ticks
    pub fn offset(&self, ticks: i64) -> Self {
        if self.is_valid() {
            Timestamp::new(self.value + ticks)
        } else {
            *self
        }
    }
}

impl Default for Timestamp {
    fn default() -> Self {
        Timestamp::none()
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_valid() {
            write!(f, "{}", self.value)
        } else {
            write!(f, "NOPTS")
        }
    }
}

impl From<i64> for Timestamp {
    fn from(value: i64) -> Self {
        Timestamp::new(value)
    }
}
