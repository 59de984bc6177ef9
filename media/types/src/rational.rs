/*!
    Rational number type for time bases.
*/

use std::fmt;

/**
    A rational number represented as a numerator and denominator.

    Stream time bases (1/90000 for MPEG-TS, 1/48000 for audio) and the
    100-nanosecond tick base used for output samples are both rationals.
*/
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct Rational {
    pub num: i32,
    pub den: i32,
}

impl Rational {
    /// 100-nanosecond ticks, the unit output sample times are expressed in.
    pub const HNS: Rational = Rational {
        num: 1,
        den: 10_000_000,
    };

    /**
        Create a new rational number.

        # Panics

        Panics if `den` is zero.
    */
    #[inline]
    pub const fn new(num: i32, den: i32) -> Self {
        assert!(den != 0, "denominator cannot be zero");
        Self { num, den }
    }

    /**
        Convert to f64.
    */
    #[inline]
    pub fn to_f64(self) -> f64 {
        self.num as f64 / self.den as f64
    }

    /**
        Rescale `value` expressed in `self` units into `target` units,
        rounding to the nearest integer (halfway away from zero).

        Computed in 128-bit arithmetic so 90 kHz timestamps spanning days
        do not overflow.
    */
    pub fn rescale(self, value: i64, target: Rational) -> i64 {
        let num = value as i128 * self.num as i128 * target.den as i128;
        let den = self.den as i128 * target.num as i128;
        if den == 0 {
            return 0;
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
}

impl fmt::Debug for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

impl From<(i32, i32)> for Rational {
    fn from((num, den): (i32, i32)) -> Self {
        Self::new(num, den)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[should_panic(expected = "denominator cannot be zero")]
    fn zero_denominator_panics() {
        Rational::new(1, 0);
    }

    #[test]
    fn rescale_to_hns() {
        // 1 second at 90 kHz
        assert_eq!(Rational::new(1, 90000).rescale(90000, Rational::HNS), 10_000_000);
        // 1024 samples at 48 kHz
        assert_eq!(Rational::new(1, 48000).rescale(1024, Rational::HNS), 213_333);
    }

    #[test]
    fn rescale_rounds_to_nearest() {
        let tb = Rational::new(1, 3);
        assert_eq!(tb.rescale(1, Rational::new(1, 1)), 0);
        assert_eq!(tb.rescale(2, Rational::new(1, 1)), 1);
        assert_eq!(tb.rescale(-2, Rational::new(1, 1)), -1);
    }

    #[test]
    fn rescale_does_not_overflow() {
        let day_at_90k = 90_000i64 * 86_400 * 30;
        let hns = Rational::new(1, 90000).rescale(day_at_90k, Rational::HNS);
        assert_eq!(hns, 10_000_000i64 * 86_400 * 30);
    }

    #[test]
    fn display() {
        assert_eq!(format!("{}", Rational::new(1, 90000)), "1/90000");
    }
}
