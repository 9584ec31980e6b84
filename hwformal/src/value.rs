//! Idealized values produced by decoding hardware bit patterns.
//!
//! A [`SpecValue`] is what a specification talks about: exact reals (every fixed-point
//! and finite float encoding is a dyadic rational, hence exactly representable as a
//! decimal), booleans, IEEE special values and tuples thereof.
use std::fmt;

use bigdecimal::{BigDecimal, ToPrimitive};
use num_bigint::BigInt;
use strum::{EnumIs, EnumTryAs};

/// An idealized mathematical value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs)]
pub enum SpecValue {
    Bool(bool),
    Real(BigDecimal),
    /// Signed infinity, produced by float encodings only.
    Infinite { negative: bool },
    NaN,
    Tuple(Vec<SpecValue>),
}

impl SpecValue {
    /// Build a real from anything convertible to a [`BigDecimal`].
    pub fn real(value: impl Into<BigDecimal>) -> Self {
        SpecValue::Real(value.into())
    }

    /// Build from a binary float. The conversion is exact for finite values.
    pub fn from_f64(value: f64) -> Self {
        if value.is_nan() {
            SpecValue::NaN
        } else if value.is_infinite() {
            SpecValue::Infinite {
                negative: value < 0.0,
            }
        } else {
            SpecValue::Real(exact_f64(value))
        }
    }

    /// Nearest binary float, if this is a scalar numeric value.
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            SpecValue::Real(v) => v.to_f64(),
            SpecValue::Infinite { negative: false } => Some(f64::INFINITY),
            SpecValue::Infinite { negative: true } => Some(f64::NEG_INFINITY),
            SpecValue::NaN => Some(f64::NAN),
            SpecValue::Bool(_) | SpecValue::Tuple(_) => None,
        }
    }

    pub fn as_real(&self) -> Option<&BigDecimal> {
        match self {
            SpecValue::Real(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            SpecValue::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&[SpecValue]> {
        match self {
            SpecValue::Tuple(items) => Some(items),
            _ => None,
        }
    }
}

impl From<bool> for SpecValue {
    fn from(value: bool) -> Self {
        SpecValue::Bool(value)
    }
}

impl From<i64> for SpecValue {
    fn from(value: i64) -> Self {
        SpecValue::Real(BigDecimal::from(value))
    }
}

impl From<f64> for SpecValue {
    fn from(value: f64) -> Self {
        SpecValue::from_f64(value)
    }
}

impl From<BigDecimal> for SpecValue {
    fn from(value: BigDecimal) -> Self {
        SpecValue::Real(value)
    }
}

impl From<Vec<SpecValue>> for SpecValue {
    fn from(value: Vec<SpecValue>) -> Self {
        SpecValue::Tuple(value)
    }
}

/// Render a real the way a human reads a datapath value: integers keep a trailing `.0`.
pub fn format_real(value: &BigDecimal) -> String {
    if value.is_integer() {
        format!("{}.0", value.with_scale(0))
    } else {
        value.normalized().to_string()
    }
}

impl fmt::Display for SpecValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SpecValue::Bool(b) => write!(f, "{}", b),
            SpecValue::Real(v) => f.write_str(&format_real(v)),
            SpecValue::Infinite { negative: false } => f.write_str("inf"),
            SpecValue::Infinite { negative: true } => f.write_str("-inf"),
            SpecValue::NaN => f.write_str("nan"),
            SpecValue::Tuple(items) => {
                write!(
                    f,
                    "({})",
                    items
                        .iter()
                        .map(|x| x.to_string())
                        .collect::<Vec<_>>()
                        .join(", ")
                )
            }
        }
    }
}

/// Exact power of two, `2^k`, for any (possibly negative) `k`.
///
/// Negative powers are computed as `5^|k| * 10^-|k|` so no rounding ever happens.
pub fn pow2(k: i64) -> BigDecimal {
    if k >= 0 {
        BigDecimal::new(BigInt::from(1u8) << (k as usize), 0)
    } else {
        let n = k.unsigned_abs() as u32;
        BigDecimal::new(BigInt::from(5u8).pow(n), n as i64)
    }
}

/// Exact decimal expansion of a finite binary64 value.
pub fn exact_f64(value: f64) -> BigDecimal {
    let bits = value.to_bits();
    let negative = bits >> 63 == 1;
    let exponent = ((bits >> 52) & 0x7ff) as i64;
    let fraction = bits & ((1u64 << 52) - 1);
    let (significand, exponent) = if exponent == 0 {
        (fraction, -1074)
    } else {
        (fraction | (1u64 << 52), exponent - 1075)
    };
    let magnitude = BigDecimal::from(significand) * pow2(exponent);
    if negative { -magnitude } else { magnitude }
}

/// Integer part of an integral [`BigDecimal`]; `None` when it has a fractional part.
pub fn to_integer(value: &BigDecimal) -> Option<BigInt> {
    if !value.is_integer() {
        return None;
    }
    let (digits, scale) = value.with_scale(0).into_bigint_and_exponent();
    debug_assert_eq!(scale, 0);
    Some(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_powers_of_two_are_exact() {
        assert_eq!(pow2(-2), "0.25".parse::<BigDecimal>().unwrap());
        assert_eq!(pow2(-10) * pow2(10), BigDecimal::from(1));
        assert_eq!(pow2(5), BigDecimal::from(32));
    }

    #[test]
    fn display_keeps_trailing_zero_for_integers() {
        assert_eq!(SpecValue::from(2.0).to_string(), "2.0");
        assert_eq!(SpecValue::from(3.75).to_string(), "3.75");
        assert_eq!(
            SpecValue::Tuple(vec![SpecValue::from(1i64), SpecValue::Bool(true)]).to_string(),
            "(1.0, true)"
        );
    }

    #[test]
    fn doubles_convert_exactly() {
        assert_eq!(exact_f64(0.75), "0.75".parse::<BigDecimal>().unwrap());
        assert_eq!(exact_f64(-3.0), BigDecimal::from(-3));
        assert_eq!(
            exact_f64(0.1),
            "0.1000000000000000055511151231257827021181583404541015625".parse::<BigDecimal>().unwrap()
        );
        assert_eq!(exact_f64(f64::from_bits(1)), pow2(-1074));
    }

    #[test]
    fn integer_extraction_rejects_fractions() {
        assert_eq!(to_integer(&BigDecimal::from(-7)), Some(BigInt::from(-7)));
        assert_eq!(to_integer(&"1.5".parse::<BigDecimal>().unwrap()), None);
    }
}
