//! Runtime values: concrete bit patterns tagged with their type.
use std::fmt;

use bigdecimal::{BigDecimal, ToPrimitive};
use hwformal::value::{SpecValue, pow2, to_integer};
use num_bigint::{BigInt, BigUint, Sign};
use strum::{EnumIs, EnumTryAs};

use crate::types::{FixedType, FloatFormat, TypeDesc};
use crate::utils::{Error, Result};

/// Sign, biased exponent and mantissa fields of a binary float.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FloatBits {
    pub sign: bool,
    pub exponent: u32,
    pub mantissa: u32,
}

impl FloatBits {
    pub const ZERO: Self = Self {
        sign: false,
        exponent: 0,
        mantissa: 0,
    };

    /// Decode the fields according to `format`.
    pub fn to_spec(&self, format: FloatFormat) -> SpecValue {
        let max_exponent = (1u32 << format.exponent_bits()) - 1;
        if self.exponent == max_exponent {
            return if self.mantissa == 0 {
                SpecValue::Infinite { negative: self.sign }
            } else {
                SpecValue::NaN
            };
        }
        let mbits = format.mantissa_bits() as i64;
        // Subnormals have no implicit leading one and the minimum exponent.
        let (significand, exponent) = if self.exponent == 0 {
            (self.mantissa as u64, 1 - format.bias() - mbits)
        } else {
            (
                (1u64 << mbits) | self.mantissa as u64,
                self.exponent as i64 - format.bias() - mbits,
            )
        };
        let magnitude = BigDecimal::from(significand) * pow2(exponent);
        SpecValue::Real(if self.sign { -magnitude } else { magnitude })
    }

    /// Packed encoding: sign, then exponent, then mantissa.
    pub fn to_bits(&self, format: FloatFormat) -> u32 {
        let mbits = format.mantissa_bits();
        ((self.sign as u32) << (format.exponent_bits() + mbits)) | (self.exponent << mbits) | self.mantissa
    }

    pub fn from_bits(format: FloatFormat, bits: u32) -> Self {
        let mbits = format.mantissa_bits();
        let ebits = format.exponent_bits();
        Self {
            sign: (bits >> (ebits + mbits)) & 1 == 1,
            exponent: (bits >> mbits) & ((1 << ebits) - 1),
            mantissa: bits & ((1 << mbits) - 1),
        }
    }
}

/// A concrete value. Fixed-point encodings are raw non-negative integers in
/// `[0, 2^total_bits)`; signed types use two's complement.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs)]
pub enum Value {
    Boolean(bool),
    SignedFixed { ty: FixedType, raw: BigUint },
    UnsignedFixed { ty: FixedType, raw: BigUint },
    Float32(FloatBits),
    BFloat16(FloatBits),
    Tuple(Vec<Value>),
}

impl Value {
    #[inline]
    pub fn boolean(value: bool) -> Self {
        Value::Boolean(value)
    }

    pub fn tuple(items: impl IntoIterator<Item = Value>) -> Self {
        Value::Tuple(items.into_iter().collect())
    }

    /// Fixed-point value from its raw encoding; fails when `raw` does not fit.
    pub fn fixed(desc: &TypeDesc, raw: impl Into<BigUint>) -> Result<Self> {
        let raw = raw.into();
        let (signed, ty) = desc
            .as_fixed()
            .ok_or_else(|| Error::signature(format!("`{}` is not a fixed-point type", desc)))?;
        if raw.bits() > ty.total_bits() as u64 {
            return Err(Error::ValueOutOfRange {
                ty: desc.clone(),
                raw: raw.to_string(),
            });
        }
        Ok(if signed {
            Value::SignedFixed { ty, raw }
        } else {
            Value::UnsignedFixed { ty, raw }
        })
    }

    /// Exact binary32 value of a Rust `f32`.
    pub fn float32(value: f32) -> Self {
        let bits = value.to_bits();
        Value::Float32(FloatBits {
            sign: bits >> 31 == 1,
            exponent: (bits >> 23) & 0xff,
            mantissa: bits & 0x7f_ffff,
        })
    }

    /// bfloat16 value from its 16-bit encoding.
    pub fn bfloat16_bits(bits: u16) -> Self {
        let bits = bits as u32;
        Value::BFloat16(FloatBits {
            sign: bits >> 15 == 1,
            exponent: (bits >> 7) & 0xff,
            mantissa: bits & 0x7f,
        })
    }

    /// Encode an idealized value exactly; fails when it is not representable.
    pub fn encode(desc: &TypeDesc, value: &SpecValue) -> Result<Self> {
        let fail = |reason: &str| Error::Encoding {
            ty: desc.clone(),
            value: value.clone(),
            reason: reason.to_string(),
        };
        match (desc, value) {
            (TypeDesc::Boolean, SpecValue::Bool(b)) => Ok(Value::Boolean(*b)),
            (TypeDesc::SignedFixed(ty) | TypeDesc::UnsignedFixed(ty), SpecValue::Real(v)) => {
                let signed = desc.is_signed_fixed();
                let scaled = to_integer(&(v * pow2(ty.frac_bits() as i64)))
                    .ok_or_else(|| fail("not a multiple of the resolution"))?;
                let total = ty.total_bits() as usize;
                let (lo, hi) = if signed {
                    (-(BigInt::from(1u8) << (total - 1)), BigInt::from(1u8) << (total - 1))
                } else {
                    (BigInt::ZERO, BigInt::from(1u8) << total)
                };
                if scaled < lo || scaled >= hi {
                    return Err(fail("out of range"));
                }
                // Two's complement wrap of negative values.
                let wrapped = if scaled.sign() == Sign::Minus {
                    scaled + (BigInt::from(1u8) << total)
                } else {
                    scaled
                };
                let raw = wrapped.to_biguint().ok_or_else(|| fail("out of range"))?;
                Value::fixed(desc, raw)
            }
            (TypeDesc::Float32 | TypeDesc::BFloat16, _) => {
                let single = match value {
                    SpecValue::NaN => f32::NAN,
                    SpecValue::Infinite { negative: false } => f32::INFINITY,
                    SpecValue::Infinite { negative: true } => f32::NEG_INFINITY,
                    SpecValue::Real(v) => {
                        let single = v.to_f64().ok_or_else(|| fail("out of range"))? as f32;
                        // Exact iff the value survives the round trip.
                        if Value::float32(single).to_spec() != *value {
                            return Err(fail("not exactly representable"));
                        }
                        single
                    }
                    _ => return Err(fail("not a number")),
                };
                if matches!(desc, TypeDesc::Float32) {
                    return Ok(Value::float32(single));
                }
                let bits = single.to_bits();
                if bits & 0xffff != 0 && !single.is_nan() {
                    return Err(fail("not exactly representable"));
                }
                let top = (bits >> 16) as u16;
                // Keep NaN a NaN when its payload lived in the low half.
                Ok(Value::bfloat16_bits(if single.is_nan() { top | 0x40 } else { top }))
            }
            (TypeDesc::Tuple(types), SpecValue::Tuple(items)) if types.len() == items.len() => types
                .iter()
                .zip(items)
                .map(|(t, v)| Value::encode(t, v))
                .collect::<Result<Vec<_>>>()
                .map(Value::Tuple),
            _ => Err(fail("shape mismatch")),
        }
    }

    /// Derived type descriptor; used by every dynamic type check.
    pub fn ty(&self) -> TypeDesc {
        match self {
            Value::Boolean(_) => TypeDesc::Boolean,
            Value::SignedFixed { ty, .. } => TypeDesc::SignedFixed(*ty),
            Value::UnsignedFixed { ty, .. } => TypeDesc::UnsignedFixed(*ty),
            Value::Float32(_) => TypeDesc::Float32,
            Value::BFloat16(_) => TypeDesc::BFloat16,
            Value::Tuple(items) => TypeDesc::Tuple(items.iter().map(Value::ty).collect()),
        }
    }

    /// Independent copy of this value.
    #[inline]
    pub fn copy(&self) -> Value {
        self.clone()
    }

    /// Raw encoding of a fixed-point value.
    pub fn raw(&self) -> Option<&BigUint> {
        match self {
            Value::SignedFixed { raw, .. } | Value::UnsignedFixed { raw, .. } => Some(raw),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Integer the raw encoding stands for: two's complement for signed types.
    pub fn signed_raw(&self) -> Option<BigInt> {
        match self {
            Value::UnsignedFixed { raw, .. } => Some(BigInt::from(raw.clone())),
            Value::SignedFixed { ty, raw } => {
                let total = ty.total_bits() as u64;
                let raw = BigInt::from(raw.clone());
                if total > 0 && raw.bit(total - 1) {
                    Some(raw - (BigInt::from(1u8) << total as usize))
                } else {
                    Some(raw)
                }
            }
            _ => None,
        }
    }

    /// Fixed-point value of type `desc` encoding `n` modulo `2^total_bits`.
    pub fn wrapping(desc: &TypeDesc, n: &BigInt) -> Result<Self> {
        let (_, ty) = desc
            .as_fixed()
            .ok_or_else(|| Error::implementation(format!("`{}` is not a fixed-point type", desc)))?;
        let modulus = BigInt::from(1u8) << ty.total_bits() as usize;
        let reduced = ((n % &modulus) + &modulus) % &modulus;
        let raw = reduced.to_biguint().ok_or_else(|| Error::ValueOutOfRange {
            ty: desc.clone(),
            raw: n.to_string(),
        })?;
        Value::fixed(desc, raw)
    }

    /// Bit pattern of the encoding. Tuples concatenate their slots, the first slot
    /// in the most significant bits.
    pub fn to_bits(&self) -> BigUint {
        match self {
            Value::Boolean(b) => BigUint::from(*b as u8),
            Value::SignedFixed { raw, .. } | Value::UnsignedFixed { raw, .. } => raw.clone(),
            Value::Float32(bits) => BigUint::from(bits.to_bits(FloatFormat::Float32)),
            Value::BFloat16(bits) => BigUint::from(bits.to_bits(FloatFormat::BFloat16)),
            Value::Tuple(items) => items.iter().fold(BigUint::ZERO, |acc, item| {
                (acc << item.ty().total_bits() as usize) | item.to_bits()
            }),
        }
    }

    /// Inverse of [`Value::to_bits`] for the layout of `desc`.
    pub fn from_bits(desc: &TypeDesc, bits: &BigUint) -> Result<Self> {
        if bits.bits() > desc.total_bits() {
            return Err(Error::ValueOutOfRange {
                ty: desc.clone(),
                raw: bits.to_string(),
            });
        }
        match desc {
            TypeDesc::Boolean => Ok(Value::Boolean(bits.bit(0))),
            TypeDesc::SignedFixed(_) | TypeDesc::UnsignedFixed(_) => Value::fixed(desc, bits.clone()),
            TypeDesc::Float32 | TypeDesc::BFloat16 => {
                let format = desc.float_format().unwrap_or(FloatFormat::Float32);
                let word = bits.to_u32().ok_or_else(|| Error::ValueOutOfRange {
                    ty: desc.clone(),
                    raw: bits.to_string(),
                })?;
                let fields = FloatBits::from_bits(format, word);
                Ok(match format {
                    FloatFormat::Float32 => Value::Float32(fields),
                    FloatFormat::BFloat16 => Value::BFloat16(fields),
                })
            }
            TypeDesc::Tuple(types) => {
                let mut rest = bits.clone();
                let mut items = Vec::with_capacity(types.len());
                // Least significant slot is the last one.
                for ty in types.iter().rev() {
                    let width = ty.total_bits();
                    let slot = &rest & ((BigUint::from(1u8) << width as usize) - 1u8);
                    items.push(Value::from_bits(ty, &slot)?);
                    rest >>= width as usize;
                }
                items.reverse();
                Ok(Value::Tuple(items))
            }
        }
    }

    /// Slot `index` of a tuple value.
    pub fn index(&self, index: usize) -> Result<&Value> {
        match self {
            Value::Tuple(items) => items.get(index).ok_or(Error::IndexOutOfRange {
                index,
                len: items.len(),
            }),
            other => Err(Error::signature(format!("`{}` is not a tuple", other.ty()))),
        }
    }

    /// Decode to the idealized value a specification talks about.
    pub fn to_spec(&self) -> SpecValue {
        match self {
            Value::Boolean(b) => SpecValue::Bool(*b),
            Value::SignedFixed { ty, .. } | Value::UnsignedFixed { ty, .. } => {
                let n = self.signed_raw().unwrap_or_default();
                SpecValue::Real(BigDecimal::from(n) * pow2(-(ty.frac_bits() as i64)))
            }
            Value::Float32(bits) => bits.to_spec(FloatFormat::Float32),
            Value::BFloat16(bits) => bits.to_spec(FloatFormat::BFloat16),
            Value::Tuple(items) => SpecValue::Tuple(items.iter().map(Value::to_spec).collect()),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
            scalar => write!(f, "{} {}", scalar.ty(), scalar.to_spec()),
        }
    }
}
