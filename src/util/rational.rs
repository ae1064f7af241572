//! Rational number representation for time bases

use std::fmt;

/// A rational number represented as numerator/denominator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    pub num: i64,
    pub den: i64,
}

impl Rational {
    /// Create a new rational number
    pub fn new(num: i64, den: i64) -> Self {
        let mut r = Rational { num, den };
        r.reduce();
        r
    }

    /// Time base with one tick per audio sample
    pub fn per_sample(sample_rate: u32) -> Self {
        Rational::new(1, sample_rate as i64)
    }

    /// Convert to floating point
    pub fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /// A zero denominator or numerator cannot be used as a time base
    pub fn is_valid_time_base(&self) -> bool {
        self.num > 0 && self.den > 0
    }

    fn reduce(&mut self) {
        if self.den == 0 {
            return;
        }

        let gcd = Self::gcd(self.num.abs(), self.den.abs());
        if gcd > 1 {
            self.num /= gcd;
            self.den /= gcd;
        }

        if self.den < 0 {
            self.num = -self.num;
            self.den = -self.den;
        }
    }

    fn gcd(mut a: i64, mut b: i64) -> i64 {
        while b != 0 {
            let t = b;
            b = a % b;
            a = t;
        }
        a
    }
}

impl Default for Rational {
    fn default() -> Self {
        Rational { num: 0, den: 1 }
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}
