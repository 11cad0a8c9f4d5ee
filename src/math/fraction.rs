// Exact rational arithmetic over BigInt
// -------------------------------------
// Fee calibration fits lines through on-chain balance deltas that easily exceed 10^18,
// so every intermediate value is kept as an exact numerator/denominator pair.
//
// Notes:
// - The denominator is always strictly positive. Constructing with a negative
//   denominator is an error ("missing normalization"); callers negate both parts.
// - Values are not reduced eagerly. `mul` always reduces, `add`/`sub` reduce only when
//   the denominators differ, and `optimize` can be called explicitly.
// - Equality and ordering compare values by cross-multiplication, so 1/2 == 2/4.

use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};
use std::str::FromStr;

use num_bigint::BigInt;
use num_integer::{Integer, Roots};
use num_traits::{One, Signed, ToPrimitive, Zero};
use rust_decimal::Decimal;

use super::error::MathError;

/// Newton's iteration stops once two successive estimates differ by at most 10^-18.
pub const SQRT_TOLERANCE_EXPONENT: u32 = 18;
pub const SQRT_MAX_ITERATIONS: usize = 64;
/// Widest term `to_f64` converts directly; f64 tops out just above 2^1023.
const F64_TERM_BITS: u64 = 1000;

#[derive(Clone, Debug)]
pub struct Fraction {
    num: BigInt,
    den: BigInt,
}

impl Fraction {
    pub fn new(num: impl Into<BigInt>, den: impl Into<BigInt>) -> Result<Self, MathError> {
        let num = num.into();
        let den = den.into();
        if den.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        if den.is_negative() {
            return Err(MathError::MissingNormalization(den.to_string()));
        }
        Ok(Fraction { num, den })
    }

    #[inline]
    pub fn from_integer(num: impl Into<BigInt>) -> Self {
        Fraction { num: num.into(), den: BigInt::one() }
    }

    #[inline]
    pub fn numer(&self) -> &BigInt { &self.num }

    #[inline]
    pub fn denom(&self) -> &BigInt { &self.den }

    #[inline]
    pub fn is_negative(&self) -> bool { self.num.is_negative() }

    pub fn abs(&self) -> Fraction {
        Fraction { num: self.num.abs(), den: self.den.clone() }
    }

    /// Reciprocal. The sign moves to the numerator so the denominator stays positive.
    pub fn inv(&self) -> Result<Fraction, MathError> {
        if self.num.is_zero() {
            return Err(MathError::DivisionByZero);
        }
        if self.num.is_negative() {
            Ok(Fraction { num: -&self.den, den: -&self.num })
        } else {
            Ok(Fraction { num: self.den.clone(), den: self.num.clone() })
        }
    }

    pub fn checked_div(&self, rhs: &Fraction) -> Result<Fraction, MathError> {
        Ok(self * &rhs.inv()?)
    }

    /// Reduce to lowest terms. `0/b` becomes `0/1`.
    pub fn optimize(&self) -> Fraction {
        let gcd = self.num.gcd(&self.den);
        if gcd.is_one() || gcd.is_zero() {
            return self.clone();
        }
        Fraction { num: &self.num / &gcd, den: &self.den / &gcd }
    }

    /// Integer part, truncated toward zero.
    #[inline]
    pub fn to_bigint(&self) -> BigInt {
        &self.num / &self.den
    }

    /// Lossy; meant for diagnostics only.
    ///
    /// Terms wider than [`F64_TERM_BITS`] are shifted down together first so that
    /// huge numerators and denominators do not both overflow to infinity.
    pub fn to_f64(&self) -> f64 {
        let reduced = self.optimize();
        let magnitude = reduced.num.abs();
        let shift = magnitude.bits().max(reduced.den.bits()).saturating_sub(F64_TERM_BITS);
        let num = (&magnitude >> shift).to_f64().unwrap_or(f64::INFINITY);
        let den = (&reduced.den >> shift).to_f64().unwrap_or(f64::INFINITY);
        let value = num / den;
        if reduced.num.is_negative() { -value } else { value }
    }

    /// Render with `scale` fractional digits (truncated), e.g. balances in whole tokens.
    pub fn to_decimal(&self, scale: u32) -> Result<Decimal, MathError> {
        let scaled = &self.num * BigInt::from(10u8).pow(scale) / &self.den;
        let mantissa = scaled
            .to_i128()
            .ok_or_else(|| MathError::DecimalOverflow(self.to_string()))?;
        Decimal::try_from_i128_with_scale(mantissa, scale)
            .map_err(|_| MathError::DecimalOverflow(self.to_string()))
    }

    pub fn sqrt(&self) -> Result<Fraction, MathError> {
        let tolerance = Fraction {
            num: BigInt::one(),
            den: BigInt::from(10u8).pow(SQRT_TOLERANCE_EXPONENT),
        };
        self.sqrt_with_tolerance(&tolerance)
    }

    /// Newton's method in exact arithmetic.
    ///
    /// Iterates live on the grid `1 / (den * 10^18)`: the seed is the integer square root
    /// of the value scaled onto that grid, and every step is floored back onto it, so the
    /// terms stay bounded however small or large the input is. Stops when two estimates
    /// are equal, differ by exactly one, differ by at most `tolerance`, or after
    /// [`SQRT_MAX_ITERATIONS`] steps.
    pub fn sqrt_with_tolerance(&self, tolerance: &Fraction) -> Result<Fraction, MathError> {
        if self.is_negative() {
            return Err(MathError::NegativeSquareRoot);
        }
        if self.is_zero() || self.is_one() {
            return Ok(self.optimize());
        }

        let value = self.optimize();
        let scale = BigInt::from(10u8).pow(SQRT_TOLERANCE_EXPONENT);
        let grid = &value.den * &scale;
        // sqrt(n/d) = sqrt(n*d) / d, so sqrt(n*d*scale^2) / grid is its floor on the grid
        let seed = Roots::sqrt(&(&value.num * &value.den * &scale * &scale));

        let two = Fraction::from(2);
        let one = Fraction::one();
        let mut x0 = Fraction { num: seed, den: grid.clone() }.optimize();

        for _ in 0..SQRT_MAX_ITERATIONS {
            let step = (&value.checked_div(&x0)? + &x0).checked_div(&two)?;
            let x1 = step.floor_to_grid(&grid);
            if x0 == x1 || x0 == &x1 + &one || (&x0 - &x1).abs() <= *tolerance {
                return Ok(x1);
            }
            x0 = x1;
        }
        Ok(x0)
    }

    /// Largest multiple of `1 / grid` not above the value, reduced.
    fn floor_to_grid(&self, grid: &BigInt) -> Fraction {
        Fraction { num: (&self.num * grid).div_floor(&self.den), den: grid.clone() }.optimize()
    }
}

// ------------------------------- Arithmetic ----------------------------------

impl Add<&Fraction> for &Fraction {
    type Output = Fraction;

    fn add(self, rhs: &Fraction) -> Fraction {
        if self.den == rhs.den {
            return Fraction { num: &self.num + &rhs.num, den: self.den.clone() };
        }
        Fraction {
            num: &self.num * &rhs.den + &rhs.num * &self.den,
            den: &self.den * &rhs.den,
        }
        .optimize()
    }
}

impl Sub<&Fraction> for &Fraction {
    type Output = Fraction;

    fn sub(self, rhs: &Fraction) -> Fraction {
        self + &(-rhs)
    }
}

impl Mul<&Fraction> for &Fraction {
    type Output = Fraction;

    fn mul(self, rhs: &Fraction) -> Fraction {
        Fraction { num: &self.num * &rhs.num, den: &self.den * &rhs.den }.optimize()
    }
}

impl Neg for &Fraction {
    type Output = Fraction;

    fn neg(self) -> Fraction {
        Fraction { num: -&self.num, den: self.den.clone() }
    }
}

impl Neg for Fraction {
    type Output = Fraction;

    fn neg(self) -> Fraction {
        Fraction { num: -self.num, den: self.den }
    }
}

macro_rules! forward_owned_binop {
    ($trait:ident, $method:ident) => {
        impl $trait<Fraction> for Fraction {
            type Output = Fraction;
            #[inline]
            fn $method(self, rhs: Fraction) -> Fraction {
                <&Fraction as $trait<&Fraction>>::$method(&self, &rhs)
            }
        }

        impl $trait<&Fraction> for Fraction {
            type Output = Fraction;
            #[inline]
            fn $method(self, rhs: &Fraction) -> Fraction {
                <&Fraction as $trait<&Fraction>>::$method(&self, rhs)
            }
        }

        impl $trait<Fraction> for &Fraction {
            type Output = Fraction;
            #[inline]
            fn $method(self, rhs: Fraction) -> Fraction {
                <&Fraction as $trait<&Fraction>>::$method(self, &rhs)
            }
        }
    };
}

forward_owned_binop!(Add, add);
forward_owned_binop!(Sub, sub);
forward_owned_binop!(Mul, mul);

impl Zero for Fraction {
    fn zero() -> Self {
        Fraction::from_integer(BigInt::zero())
    }

    fn is_zero(&self) -> bool {
        self.num.is_zero()
    }
}

impl Default for Fraction {
    fn default() -> Self {
        Fraction::zero()
    }
}

impl One for Fraction {
    fn one() -> Self {
        Fraction::from_integer(BigInt::one())
    }
}

// ------------------------------- Comparison ----------------------------------

impl PartialEq for Fraction {
    fn eq(&self, other: &Self) -> bool {
        &self.num * &other.den == &other.num * &self.den
    }
}

impl Eq for Fraction {}

impl PartialOrd for Fraction {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Fraction {
    // Cross-multiplication is order-preserving because both denominators are positive.
    fn cmp(&self, other: &Self) -> Ordering {
        (&self.num * &other.den).cmp(&(&other.num * &self.den))
    }
}

// ------------------------------- Conversions ---------------------------------

impl From<BigInt> for Fraction {
    fn from(v: BigInt) -> Self { Fraction::from_integer(v) }
}

impl From<i32> for Fraction {
    fn from(v: i32) -> Self { Fraction::from_integer(v) }
}

impl From<i64> for Fraction {
    fn from(v: i64) -> Self { Fraction::from_integer(v) }
}

impl From<u64> for Fraction {
    fn from(v: u64) -> Self { Fraction::from_integer(v) }
}

impl fmt::Display for Fraction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.num, self.den)
    }
}

/// Accepts `"n"` or `"n/d"`.
impl FromStr for Fraction {
    type Err = MathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let raw = s.trim();
        let parse = |part: &str| {
            BigInt::from_str(part.trim()).map_err(|_| MathError::Parse(raw.to_string()))
        };
        match raw.split_once('/') {
            Some((num, den)) => Fraction::new(parse(num)?, parse(den)?),
            None => Ok(Fraction::from_integer(parse(raw)?)),
        }
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for Fraction {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for Fraction {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <String as serde::Deserialize>::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

// ---------------------------------- Tests ------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn frac(n: i64, d: i64) -> Fraction {
        Fraction::new(n, d).unwrap()
    }

    fn is_coprime(f: &Fraction) -> bool {
        f.numer().gcd(f.denom()).is_one()
    }

    #[test]
    fn half_plus_third_is_five_sixths() {
        let sum = frac(1, 2) + frac(1, 3);
        assert_eq!(sum.numer(), &BigInt::from(5));
        assert_eq!(sum.denom(), &BigInt::from(6));
    }

    #[test]
    fn to_bigint_truncates_toward_zero() {
        let third = Fraction::from(10).checked_div(&Fraction::from(3)).unwrap();
        assert_eq!(third.to_bigint(), BigInt::from(3));
        assert_eq!((-third).to_bigint(), BigInt::from(-3));
    }

    #[test]
    fn constructor_rejects_zero_and_negative_denominators() {
        assert_eq!(Fraction::new(1, 0), Err(MathError::DivisionByZero));
        assert_eq!(Fraction::new(0, 0), Err(MathError::DivisionByZero));
        assert!(matches!(Fraction::new(3, -4), Err(MathError::MissingNormalization(_))));
        assert!(Fraction::new(-3, 4).is_ok());
    }

    #[test]
    fn add_then_subtract_is_exact() {
        for an in -6i64..=6 {
            for ad in 1i64..=5 {
                for bn in -4i64..=4 {
                    for bd in 1i64..=4 {
                        let a = frac(an, ad);
                        let b = frac(bn, bd);
                        assert_eq!(&(&a + &b) - &b, a, "{} + {} - {}", a, b, b);
                    }
                }
            }
        }
    }

    #[test]
    fn arithmetic_keeps_positive_coprime_denominator_after_optimize() {
        let samples = [frac(6, 4), frac(-9, 12), frac(0, 7), frac(35, 21)];
        for a in &samples {
            for b in &samples {
                for r in [a + b, a - b, a * b] {
                    let reduced = r.optimize();
                    assert!(reduced.denom() > &BigInt::zero());
                    assert!(is_coprime(&reduced), "{} not reduced", reduced);
                }
            }
        }
    }

    #[test]
    fn zero_over_anything_reduces_to_zero_over_one() {
        let z = frac(0, 42).optimize();
        assert_eq!(z.numer(), &BigInt::zero());
        assert_eq!(z.denom(), &BigInt::one());
    }

    #[test]
    fn inverse_of_inverse_is_identity() {
        for (n, d) in [(1, 2), (-3, 7), (22, 7), (-1, 1), (5, 1)] {
            let a = frac(n, d);
            assert_eq!(a.inv().unwrap().inv().unwrap(), a);
        }
        assert_eq!(Fraction::zero().inv(), Err(MathError::DivisionByZero));
    }

    #[test]
    fn inverse_of_negative_keeps_denominator_positive() {
        let inv = frac(-3, 4).inv().unwrap();
        assert_eq!(inv.numer(), &BigInt::from(-4));
        assert_eq!(inv.denom(), &BigInt::from(3));
    }

    #[test]
    fn multiplying_by_one_is_identity() {
        let a = frac(-17, 5);
        assert_eq!(&a * &Fraction::from(1), a);
    }

    #[test]
    fn equality_and_ordering_are_by_value() {
        assert_eq!(frac(1, 2), frac(2, 4));
        assert!(frac(1, 3) < frac(1, 2));
        assert!(frac(-1, 2) < frac(-1, 3));
        assert!(frac(3, 4) > frac(2, 3));
    }

    #[test]
    fn sqrt_of_perfect_square_is_exact() {
        assert_eq!(Fraction::from(4).sqrt().unwrap(), Fraction::from(2));
        assert_eq!(Fraction::from(1_000_000).sqrt().unwrap(), Fraction::from(1000));
    }

    #[test]
    fn sqrt_of_two_converges() {
        let root = Fraction::from(2).sqrt().unwrap();
        assert!((root.to_f64() - std::f64::consts::SQRT_2).abs() < 1e-12);
    }

    #[test]
    fn sqrt_handles_small_values_and_rejects_negatives() {
        assert_eq!(Fraction::zero().sqrt().unwrap(), Fraction::zero());
        assert_eq!(Fraction::one().sqrt().unwrap(), Fraction::one());
        let quarter = frac(1, 4).sqrt().unwrap();
        assert!((quarter.to_f64() - 0.5).abs() < 1e-12);
        assert_eq!(frac(-1, 2).sqrt(), Err(MathError::NegativeSquareRoot));
    }

    fn assert_close(actual: &Fraction, expected: f64) {
        let relative = ((actual.to_f64() - expected) / expected).abs();
        assert!(relative < 1e-12, "{} is not close to {}", actual.to_f64(), expected);
    }

    #[test]
    fn sqrt_of_tiny_values_stays_small_and_accurate() {
        let ten = BigInt::from(10u8);
        for exponent in [6u32, 12, 40] {
            let tiny = Fraction::new(1, ten.pow(exponent)).unwrap();
            let root = tiny.sqrt().unwrap();
            assert_close(&root, 10f64.powi(-(exponent as i32) / 2));
            // grid is den * 10^18, so the denominator never outgrows it
            assert!(root.denom().bits() <= (ten.pow(exponent) * ten.pow(18)).bits());
        }
        let odd = frac(3, 100_000_000).sqrt().unwrap();
        assert_close(&odd, (3e-8f64).sqrt());
    }

    #[test]
    fn sqrt_of_large_non_square() {
        let e36 = BigInt::from(10u8).pow(36);
        let just_above = Fraction::from(&e36 + BigInt::one());
        let root = just_above.sqrt().unwrap();
        assert_eq!(root.to_bigint(), BigInt::from(10u8).pow(18));
        assert!(&root * &root <= just_above);

        let twice = Fraction::from(&e36 * BigInt::from(2) + BigInt::one());
        let root = twice.sqrt().unwrap();
        assert_eq!(root.to_bigint(), "1414213562373095048".parse::<BigInt>().unwrap());
        assert_close(&root, 2f64.sqrt() * 1e18);
        assert_eq!(frac(1, 4).sqrt().unwrap(), frac(1, 2));
    }

    #[test]
    fn to_f64_survives_terms_beyond_f64_range() {
        let e400 = BigInt::from(10u8).pow(400);
        let third = Fraction::new(&e400 + BigInt::one(), BigInt::from(3) * &e400).unwrap();
        assert!((third.to_f64() - 1.0 / 3.0).abs() < 1e-15);
        let negative = Fraction::new(-(&e400 * BigInt::from(5)), e400.clone()).unwrap();
        assert_eq!(negative.to_f64(), -5.0);
        let huge = Fraction::new(&e400 * &e400, e400.clone()).unwrap();
        assert_eq!(huge.to_f64(), f64::INFINITY);
    }

    #[test]
    fn parses_and_displays() {
        assert_eq!("5/6".parse::<Fraction>().unwrap(), frac(5, 6));
        assert_eq!(" -12 ".parse::<Fraction>().unwrap(), Fraction::from(-12));
        assert!(matches!("1/-2".parse::<Fraction>(), Err(MathError::MissingNormalization(_))));
        assert!(matches!("dup".parse::<Fraction>(), Err(MathError::Parse(_))));
        assert_eq!(frac(6, 4).to_string(), "6/4");
    }

    #[test]
    fn decimal_rendering_truncates() {
        let d = frac(2, 3).to_decimal(4).unwrap();
        assert_eq!(d.to_string(), "0.6666");
        let tenth_token = frac(100_000_000_000_000_000, 1_000_000_000_000_000_000);
        assert_eq!(tenth_token.to_decimal(2).unwrap().to_string(), "0.10");
    }
}
