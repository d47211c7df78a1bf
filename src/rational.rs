//! Exact arbitrary-precision fractions
//!
//! Every coefficient and integer power in the engine is a [`Rational`]. The
//! representation is always fully reduced: `gcd(|numerator|, |denominator|)`
//! is 1, the denominator is strictly positive, and the sign rides on the
//! numerator. All arithmetic is value-returning; nothing mutates in place.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{One, Signed, ToPrimitive, Zero};
use std::cmp::Ordering;
use std::fmt;
use std::ops::{Add, Mul, Neg, Sub};

/// Tolerance used when approximating an `f64` by a fraction via continued
/// fractions. Inherited from the original engine; kept as a named constant
/// rather than re-derived.
pub const FLOAT_TOLERANCE: f64 = 1e-14;

/// Bound on continued-fraction expansion length for `from_f64`.
const MAX_CF_TERMS: usize = 64;

/// An exact fraction of two `BigInt`s, stored in lowest terms.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Rational {
    numerator: BigInt,
    denominator: BigInt,
}

impl Rational {
    /// Build a fraction from numerator and denominator, reducing to lowest
    /// terms. Returns `None` for a zero denominator.
    pub fn new(numerator: BigInt, denominator: BigInt) -> Option<Self> {
        if denominator.is_zero() {
            return None;
        }
        Some(Self::normalized(numerator, denominator))
    }

    fn normalized(mut numerator: BigInt, mut denominator: BigInt) -> Self {
        debug_assert!(!denominator.is_zero());
        if denominator.is_negative() {
            numerator = -numerator;
            denominator = -denominator;
        }
        if numerator.is_zero() {
            denominator = BigInt::one();
        } else {
            let g = numerator.gcd(&denominator);
            if !g.is_one() {
                numerator /= &g;
                denominator /= &g;
            }
        }
        Rational {
            numerator,
            denominator,
        }
    }

    /// Whole number `n/1`.
    pub fn integer(n: impl Into<BigInt>) -> Self {
        Rational {
            numerator: n.into(),
            denominator: BigInt::one(),
        }
    }

    pub fn zero() -> Self {
        Self::integer(0)
    }

    pub fn one() -> Self {
        Self::integer(1)
    }

    pub fn neg_one() -> Self {
        Self::integer(-1)
    }

    /// Parse an exact numeric literal: integers (`42`), terminating decimals
    /// (`3.14` → `157/50`), and exponent notation (`2.5e-3` → `1/400`).
    /// Returns `None` if the text is not a valid literal.
    pub fn from_decimal_str(text: &str) -> Option<Self> {
        let text = text.trim();
        if text.is_empty() {
            return None;
        }

        // Split off an exponent part if present.
        let (mantissa, exp) = match text.find(['e', 'E']) {
            Some(idx) => {
                let exp: i64 = text[idx + 1..].parse().ok()?;
                (&text[..idx], exp)
            }
            None => (text, 0),
        };

        let (int_part, frac_part) = match mantissa.find('.') {
            Some(idx) => (&mantissa[..idx], &mantissa[idx + 1..]),
            None => (mantissa, ""),
        };
        if int_part.is_empty() && frac_part.is_empty() {
            return None;
        }
        if !frac_part.is_empty() && !frac_part.bytes().all(|b| b.is_ascii_digit()) {
            return None;
        }

        let digits = format!("{}{}", int_part, frac_part);
        let numerator: BigInt = digits.parse().ok()?;
        let mut denominator = BigInt::one();
        for _ in 0..frac_part.len() {
            denominator *= 10;
        }

        let mut value = Self::normalized(numerator, denominator);
        match exp.cmp(&0) {
            Ordering::Greater => {
                let mut scale = BigInt::one();
                for _ in 0..exp {
                    scale *= 10;
                }
                value = value * Rational::integer(scale);
            }
            Ordering::Less => {
                let mut scale = BigInt::one();
                for _ in 0..(-exp) {
                    scale *= 10;
                }
                value = Self::normalized(value.numerator, value.denominator * scale);
            }
            Ordering::Equal => {}
        }
        Some(value)
    }

    /// Approximate a float as an exact fraction via continued fractions,
    /// stopping once the reconstruction is within [`FLOAT_TOLERANCE`].
    /// Returns `None` for non-finite input.
    pub fn from_f64(value: f64) -> Option<Self> {
        if !value.is_finite() {
            return None;
        }
        if value == 0.0 {
            return Some(Self::zero());
        }
        let negative = value < 0.0;
        let mut x = value.abs();

        // h/k track the convergents of the continued fraction of x.
        let mut h_prev = BigInt::zero();
        let mut h = BigInt::one();
        let mut k_prev = BigInt::one();
        let mut k = BigInt::zero();

        for _ in 0..MAX_CF_TERMS {
            let a = x.floor();
            let a_int = BigInt::from(a as i64);
            let h_next = &a_int * &h + &h_prev;
            let k_next = &a_int * &k + &k_prev;
            h_prev = h;
            k_prev = k;
            h = h_next;
            k = k_next;

            if let (Some(hn), Some(kn)) = (h.to_f64(), k.to_f64()) {
                if kn != 0.0 && (hn / kn - value.abs()).abs() < FLOAT_TOLERANCE {
                    break;
                }
            }

            let frac = x - a;
            if frac.abs() < FLOAT_TOLERANCE {
                break;
            }
            x = 1.0 / frac;
        }

        if k.is_zero() {
            return None;
        }
        let mut result = Self::normalized(h, k);
        if negative {
            result = -result;
        }
        Some(result)
    }

    pub fn numerator(&self) -> &BigInt {
        &self.numerator
    }

    pub fn denominator(&self) -> &BigInt {
        &self.denominator
    }

    pub fn is_zero(&self) -> bool {
        self.numerator.is_zero()
    }

    pub fn is_one(&self) -> bool {
        self.numerator.is_one() && self.denominator.is_one()
    }

    pub fn is_neg_one(&self) -> bool {
        self.denominator.is_one() && self.numerator == BigInt::from(-1)
    }

    pub fn is_integer(&self) -> bool {
        self.denominator.is_one()
    }

    pub fn is_negative(&self) -> bool {
        self.numerator.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.numerator.is_positive()
    }

    pub fn abs(&self) -> Self {
        Rational {
            numerator: self.numerator.abs(),
            denominator: self.denominator.clone(),
        }
    }

    /// Sign as an integer fraction: -1, 0, or 1.
    pub fn signum(&self) -> Self {
        Self::integer(self.numerator.signum())
    }

    /// Multiplicative inverse. `None` for zero.
    pub fn recip(&self) -> Option<Self> {
        if self.is_zero() {
            return None;
        }
        Some(Self::normalized(
            self.denominator.clone(),
            self.numerator.clone(),
        ))
    }

    /// Exact division. `None` when `other` is zero.
    pub fn checked_div(&self, other: &Self) -> Option<Self> {
        other.recip().map(|r| self.clone() * r)
    }

    /// Exact integer power by repeated squaring. `None` only for `0^negative`.
    pub fn pow_i(&self, exp: i64) -> Option<Self> {
        if exp == 0 {
            return Some(Self::one());
        }
        let base = if exp < 0 { self.recip()? } else { self.clone() };
        let mut result = Self::one();
        let mut acc = base;
        let mut e = exp.unsigned_abs();
        while e > 0 {
            if e & 1 == 1 {
                result = result * acc.clone();
            }
            e >>= 1;
            if e > 0 {
                acc = acc.clone() * acc;
            }
        }
        Some(result)
    }

    /// Largest integer ≤ self, as a fraction.
    pub fn floor(&self) -> Self {
        Self::integer(self.numerator.div_floor(&self.denominator))
    }

    /// Smallest integer ≥ self, as a fraction.
    pub fn ceil(&self) -> Self {
        Self::integer(self.numerator.div_ceil(&self.denominator))
    }

    /// The numerator when the value is a whole number that fits in `i64`.
    pub fn to_i64(&self) -> Option<i64> {
        if self.is_integer() {
            self.numerator.to_i64()
        } else {
            None
        }
    }

    /// Lossy conversion for numeric function evaluation.
    pub fn to_f64(&self) -> f64 {
        match (self.numerator.to_f64(), self.denominator.to_f64()) {
            (Some(n), Some(d)) if d != 0.0 => n / d,
            // Overflowing components: fall back to a quotient of approximations.
            _ => {
                let bits = self.numerator.bits().max(self.denominator.bits());
                let shift = bits.saturating_sub(52);
                let n = (&self.numerator >> shift).to_f64().unwrap_or(f64::NAN);
                let d = (&self.denominator >> shift).to_f64().unwrap_or(f64::NAN);
                n / d
            }
        }
    }
}

impl Add for Rational {
    type Output = Rational;

    fn add(self, rhs: Rational) -> Rational {
        Rational::normalized(
            &self.numerator * &rhs.denominator + &rhs.numerator * &self.denominator,
            self.denominator * rhs.denominator,
        )
    }
}

impl Sub for Rational {
    type Output = Rational;

    fn sub(self, rhs: Rational) -> Rational {
        self + (-rhs)
    }
}

impl Mul for Rational {
    type Output = Rational;

    fn mul(self, rhs: Rational) -> Rational {
        Rational::normalized(
            self.numerator * rhs.numerator,
            self.denominator * rhs.denominator,
        )
    }
}

impl Neg for Rational {
    type Output = Rational;

    fn neg(self) -> Rational {
        Rational {
            numerator: -self.numerator,
            denominator: self.denominator,
        }
    }
}

impl PartialOrd for Rational {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Rational {
    fn cmp(&self, other: &Self) -> Ordering {
        // Denominators are positive, so cross-multiplication preserves order.
        (&self.numerator * &other.denominator).cmp(&(&other.numerator * &self.denominator))
    }
}

impl fmt::Display for Rational {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.denominator.is_one() {
            write!(f, "{}", self.numerator)
        } else {
            write!(f, "{}/{}", self.numerator, self.denominator)
        }
    }
}

impl From<i64> for Rational {
    fn from(n: i64) -> Self {
        Rational::integer(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rat(n: i64, d: i64) -> Rational {
        Rational::new(BigInt::from(n), BigInt::from(d)).unwrap()
    }

    #[test]
    fn test_always_reduced() {
        let half = rat(2, 4);
        assert_eq!(half, rat(1, 2));
        assert_eq!(format!("{}", half), "1/2");
    }

    #[test]
    fn test_sign_on_numerator() {
        let r = rat(1, -3);
        assert!(r.is_negative());
        assert_eq!(format!("{}", r), "-1/3");
    }

    #[test]
    fn test_zero_denominator_rejected() {
        assert!(Rational::new(BigInt::from(1), BigInt::zero()).is_none());
    }

    #[test]
    fn test_field_roundtrip_exact() {
        // (a / b) * b == a, exactly
        let a = rat(22, 7);
        let b = rat(-3, 11);
        let roundtrip = a.checked_div(&b).unwrap() * b;
        assert_eq!(roundtrip, a);
    }

    #[test]
    fn test_decimal_parse_exact() {
        assert_eq!(Rational::from_decimal_str("3.14").unwrap(), rat(157, 50));
        assert_eq!(Rational::from_decimal_str("42").unwrap(), rat(42, 1));
        assert_eq!(Rational::from_decimal_str("2.5e-3").unwrap(), rat(1, 400));
        assert_eq!(Rational::from_decimal_str("1e3").unwrap(), rat(1000, 1));
        assert_eq!(Rational::from_decimal_str(".5").unwrap(), rat(1, 2));
        assert!(Rational::from_decimal_str("x").is_none());
        assert!(Rational::from_decimal_str("").is_none());
    }

    #[test]
    fn test_from_f64_continued_fraction() {
        assert_eq!(Rational::from_f64(0.5).unwrap(), rat(1, 2));
        assert_eq!(Rational::from_f64(-0.25).unwrap(), rat(-1, 4));
        // 1/3 is not representable in binary; the convergent should recover it.
        assert_eq!(Rational::from_f64(1.0 / 3.0).unwrap(), rat(1, 3));
        assert!(Rational::from_f64(f64::NAN).is_none());
    }

    #[test]
    fn test_pow_i() {
        assert_eq!(rat(2, 3).pow_i(3).unwrap(), rat(8, 27));
        assert_eq!(rat(2, 3).pow_i(-2).unwrap(), rat(9, 4));
        assert_eq!(rat(5, 1).pow_i(0).unwrap(), Rational::one());
        assert!(Rational::zero().pow_i(-1).is_none());
    }

    #[test]
    fn test_ordering() {
        assert!(rat(1, 3) < rat(1, 2));
        assert!(rat(-1, 2) < rat(1, 3));
        assert_eq!(rat(2, 4).cmp(&rat(1, 2)), Ordering::Equal);
    }

    #[test]
    fn test_floor_ceil() {
        assert_eq!(rat(7, 2).floor(), rat(3, 1));
        assert_eq!(rat(7, 2).ceil(), rat(4, 1));
        assert_eq!(rat(-7, 2).floor(), rat(-4, 1));
        assert_eq!(rat(-7, 2).ceil(), rat(-3, 1));
    }
}
