// Deterministic Q32.32 fixed-point scalar

use std::fmt;
use std::ops::{Add, AddAssign, Div, DivAssign, Mul, MulAssign, Neg, Sub, SubAssign};

const FRAC_BITS: u32 = 32;

/// Signed fixed-point number with 32 integer and 32 fractional bits.
///
/// Every operation is integer arithmetic, so results are bit-identical on
/// every platform. Overflow saturates instead of wrapping. There is no
/// implicit conversion from floats: use [`Fix64::from_ratio`] or
/// [`Fix64::from_int`] inside the simulation and [`Fix64::from_f32`] only
/// at the host boundary.
#[repr(transparent)]
#[derive(
    Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, bytemuck::Pod, bytemuck::Zeroable,
)]
pub struct Fix64(i64);

impl Fix64 {
    pub const ZERO: Fix64 = Fix64(0);
    pub const ONE: Fix64 = Fix64(1 << FRAC_BITS);
    pub const HALF: Fix64 = Fix64(1 << (FRAC_BITS - 1));
    pub const TWO: Fix64 = Fix64(2 << FRAC_BITS);
    pub const MAX: Fix64 = Fix64(i64::MAX);
    pub const MIN: Fix64 = Fix64(i64::MIN);
    /// Smallest positive value (2^-32)
    pub const EPSILON: Fix64 = Fix64(1);

    pub const PI: Fix64 = Fix64(13_493_037_705);
    pub const HALF_PI: Fix64 = Fix64(6_746_518_852);
    pub const QUARTER_PI: Fix64 = Fix64(3_373_259_426);
    pub const TWO_PI: Fix64 = Fix64(26_986_075_409);

    /// Build from the raw Q32.32 bit pattern
    #[inline]
    pub const fn from_raw(raw: i64) -> Self {
        Fix64(raw)
    }

    /// Raw Q32.32 bit pattern
    #[inline]
    pub const fn raw(self) -> i64 {
        self.0
    }

    #[inline]
    pub const fn from_int(value: i32) -> Self {
        Fix64((value as i64) << FRAC_BITS)
    }

    /// Exact-as-possible `numerator / denominator`, used for constants such as
    /// `0.999 = from_ratio(999, 1000)`.
    pub const fn from_ratio(numerator: i64, denominator: i64) -> Self {
        if denominator == 0 {
            return if numerator < 0 { Fix64::MIN } else { Fix64::MAX };
        }
        let value = ((numerator as i128) << FRAC_BITS) / denominator as i128;
        Fix64(saturate(value))
    }

    /// Host-side conversion. Never call this inside the simulation.
    pub fn from_f32(value: f32) -> Self {
        Self::from_f64(value as f64)
    }

    /// Host-side conversion. Never call this inside the simulation.
    pub fn from_f64(value: f64) -> Self {
        let scaled = (value * (1u64 << FRAC_BITS) as f64).round();
        if scaled >= i64::MAX as f64 {
            Fix64::MAX
        } else if scaled <= i64::MIN as f64 {
            Fix64::MIN
        } else {
            Fix64(scaled as i64)
        }
    }

    pub fn to_f32(self) -> f32 {
        self.to_f64() as f32
    }

    pub fn to_f64(self) -> f64 {
        self.0 as f64 / (1u64 << FRAC_BITS) as f64
    }

    /// Integer part, rounded toward negative infinity
    pub const fn floor_int(self) -> i64 {
        self.0 >> FRAC_BITS
    }

    #[inline]
    pub const fn is_zero(self) -> bool {
        self.0 == 0
    }

    #[inline]
    pub const fn is_negative(self) -> bool {
        self.0 < 0
    }

    #[inline]
    pub const fn is_positive(self) -> bool {
        self.0 > 0
    }

    #[inline]
    pub fn abs(self) -> Self {
        Fix64(self.0.saturating_abs())
    }

    /// Divide by a plain integer without widening
    #[inline]
    pub fn div_int(self, divisor: i64) -> Self {
        if divisor == 0 {
            return self / Fix64::ZERO;
        }
        Fix64(self.0 / divisor)
    }

    /// Multiply by a plain integer, saturating
    #[inline]
    pub fn mul_int(self, factor: i64) -> Self {
        Fix64(self.0.saturating_mul(factor))
    }

    #[inline]
    pub fn square(self) -> Self {
        self * self
    }

    /// Deterministic square root. Negative inputs yield zero.
    pub fn sqrt(self) -> Self {
        if self.0 <= 0 {
            return Fix64::ZERO;
        }
        let root = isqrt((self.0 as u128) << FRAC_BITS);
        Fix64(root as i64)
    }

    /// Sine of an angle in radians
    pub fn sin(self) -> Self {
        // Reduce to [-PI, PI]
        let mut a = Fix64(self.0 % Fix64::TWO_PI.0);
        if a > Fix64::PI {
            a -= Fix64::TWO_PI;
        } else if a < -Fix64::PI {
            a += Fix64::TWO_PI;
        }

        // Fold to [-PI/2, PI/2] using sin(PI - a) = sin(a)
        if a > Fix64::HALF_PI {
            a = Fix64::PI - a;
        } else if a < -Fix64::HALF_PI {
            a = -Fix64::PI - a;
        }

        if a == Fix64::HALF_PI {
            return Fix64::ONE;
        }
        if a == -Fix64::HALF_PI {
            return -Fix64::ONE;
        }

        // Taylor series up to a^15 in Horner form
        let a2 = a * a;
        let mut acc = Fix64::ONE - (a2.div_int(210));
        for divisor in [156, 110, 72, 42, 20, 6] {
            acc = Fix64::ONE - (a2 * acc).div_int(divisor);
        }
        a * acc
    }

    /// Cosine of an angle in radians
    pub fn cos(self) -> Self {
        (self + Fix64::HALF_PI).sin()
    }

    /// Linear interpolation between `self` and `other`
    pub fn lerp(self, other: Fix64, weight: Fix64) -> Self {
        self + (other - self) * weight
    }
}

/// Integer square root of a u128, bit-by-bit
fn isqrt(n: u128) -> u128 {
    if n < 2 {
        return n;
    }
    let mut remainder = n;
    let mut result = 0u128;
    let mut bit = 1u128 << ((127 - n.leading_zeros()) & !1);
    while bit != 0 {
        if remainder >= result + bit {
            remainder -= result + bit;
            result = (result >> 1) + bit;
        } else {
            result >>= 1;
        }
        bit >>= 2;
    }
    result
}

#[inline]
const fn saturate(value: i128) -> i64 {
    if value > i64::MAX as i128 {
        i64::MAX
    } else if value < i64::MIN as i128 {
        i64::MIN
    } else {
        value as i64
    }
}

impl Add for Fix64 {
    type Output = Fix64;
    #[inline]
    fn add(self, rhs: Fix64) -> Fix64 {
        Fix64(self.0.saturating_add(rhs.0))
    }
}

impl Sub for Fix64 {
    type Output = Fix64;
    #[inline]
    fn sub(self, rhs: Fix64) -> Fix64 {
        Fix64(self.0.saturating_sub(rhs.0))
    }
}

impl Mul for Fix64 {
    type Output = Fix64;
    #[inline]
    fn mul(self, rhs: Fix64) -> Fix64 {
        Fix64(saturate((self.0 as i128 * rhs.0 as i128) >> FRAC_BITS))
    }
}

impl Div for Fix64 {
    type Output = Fix64;
    /// Division by zero saturates toward the numerator's sign; `0 / 0 == 0`.
    #[inline]
    fn div(self, rhs: Fix64) -> Fix64 {
        if rhs.0 == 0 {
            return match self.0 {
                0 => Fix64::ZERO,
                n if n > 0 => Fix64::MAX,
                _ => Fix64::MIN,
            };
        }
        Fix64(saturate(((self.0 as i128) << FRAC_BITS) / rhs.0 as i128))
    }
}

impl Neg for Fix64 {
    type Output = Fix64;
    #[inline]
    fn neg(self) -> Fix64 {
        Fix64(self.0.saturating_neg())
    }
}

impl AddAssign for Fix64 {
    #[inline]
    fn add_assign(&mut self, rhs: Fix64) {
        *self = *self + rhs;
    }
}

impl SubAssign for Fix64 {
    #[inline]
    fn sub_assign(&mut self, rhs: Fix64) {
        *self = *self - rhs;
    }
}

impl MulAssign for Fix64 {
    #[inline]
    fn mul_assign(&mut self, rhs: Fix64) {
        *self = *self * rhs;
    }
}

impl DivAssign for Fix64 {
    #[inline]
    fn div_assign(&mut self, rhs: Fix64) {
        *self = *self / rhs;
    }
}

impl From<i32> for Fix64 {
    fn from(value: i32) -> Self {
        Fix64::from_int(value)
    }
}

impl fmt::Debug for Fix64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Fix64({:.6})", self.to_f64())
    }
}

impl fmt::Display for Fix64 {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.6}", self.to_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn close(a: Fix64, b: f64, tolerance: f64) -> bool {
        (a.to_f64() - b).abs() <= tolerance
    }

    #[test]
    fn test_basic_arithmetic() {
        let a = Fix64::from_int(3);
        let b = Fix64::from_ratio(1, 2);
        assert_eq!(a + b, Fix64::from_ratio(7, 2));
        assert_eq!(a - b, Fix64::from_ratio(5, 2));
        assert_eq!(a * b, Fix64::from_ratio(3, 2));
        assert_eq!(a / b, Fix64::from_int(6));
        assert_eq!(-a, Fix64::from_int(-3));
    }

    #[test]
    fn test_division_by_zero_saturates() {
        assert_eq!(Fix64::ONE / Fix64::ZERO, Fix64::MAX);
        assert_eq!(-Fix64::ONE / Fix64::ZERO, Fix64::MIN);
        assert_eq!(Fix64::ZERO / Fix64::ZERO, Fix64::ZERO);
    }

    #[test]
    fn test_multiplication_saturates() {
        let big = Fix64::from_int(i32::MAX);
        assert_eq!(big * big, Fix64::MAX);
        assert_eq!(big * -big, Fix64::MIN);
    }

    #[test]
    fn test_sqrt() {
        assert_eq!(Fix64::from_int(4).sqrt(), Fix64::TWO);
        assert_eq!(Fix64::ONE.sqrt(), Fix64::ONE);
        assert_eq!(Fix64::from_int(-4).sqrt(), Fix64::ZERO);
        assert!(close(Fix64::TWO.sqrt(), std::f64::consts::SQRT_2, 1e-8));
        assert!(close(Fix64::from_ratio(1, 100).sqrt(), 0.1, 1e-8));
    }

    #[test]
    fn test_trig_matches_reference() {
        for step in -40..=40 {
            let angle = Fix64::from_ratio(step, 8);
            let expected = angle.to_f64();
            assert!(close(angle.sin(), expected.sin(), 1e-7), "sin({})", expected);
            assert!(close(angle.cos(), expected.cos(), 1e-7), "cos({})", expected);
        }
    }

    #[test]
    fn test_trig_exact_at_cardinal_angles() {
        assert_eq!(Fix64::ZERO.sin(), Fix64::ZERO);
        assert_eq!(Fix64::ZERO.cos(), Fix64::ONE);
        assert_eq!(Fix64::HALF_PI.sin(), Fix64::ONE);
    }

    #[test]
    fn test_constants() {
        assert_relative_eq!(Fix64::PI.to_f64(), std::f64::consts::PI, epsilon = 1e-9);
        assert_relative_eq!(Fix64::TWO_PI.to_f64(), std::f64::consts::TAU, epsilon = 1e-9);
        assert_relative_eq!(
            Fix64::from_ratio(999, 1000).to_f32(),
            0.999f32,
            epsilon = 1e-6
        );
    }

    #[test]
    fn test_lerp() {
        let a = Fix64::ZERO;
        let b = Fix64::from_int(10);
        assert_eq!(a.lerp(b, Fix64::HALF), Fix64::from_int(5));
        assert_eq!(a.lerp(b, Fix64::ONE), b);
    }
}
