//! Static type descriptors.
//!
//! A [`TypeDesc`] is the shape of the value a node produces. Equality is structural
//! and there is no implicit widening: two fixed-point types are equal only when their
//! signedness and both bit counts agree.
use std::fmt;

use num_bigint::BigUint;
use strum::{EnumIs, EnumTryAs};

use crate::utils::{Error, Result};
use crate::value::{FloatBits, Value};

/// Bit split of a fixed-point number.
///
/// For signed types `int_bits` includes the sign bit, so a signed `FixedType{3, 2}`
/// ranges over `[-4, 3.75]` in steps of `0.25`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FixedType {
    int_bits: u32,
    frac_bits: u32,
}

impl FixedType {
    pub const MAX_BITS: u32 = 1 << 16;

    #[inline]
    const fn check_validity(int_bits: u32, frac_bits: u32) -> bool {
        let total = int_bits as u64 + frac_bits as u64;
        total >= 1 && total <= Self::MAX_BITS as u64
    }

    /// Creates a new `FixedType`, or `None` when the widths are illegal.
    #[inline]
    pub const fn new(int_bits: u32, frac_bits: u32) -> Option<Self> {
        if Self::check_validity(int_bits, frac_bits) {
            Some(Self { int_bits, frac_bits })
        } else {
            None
        }
    }

    /// Same as [`FixedType::new`], reporting a construction error.
    pub fn try_new(int_bits: u32, frac_bits: u32) -> Result<Self> {
        Self::new(int_bits, frac_bits).ok_or(Error::InvalidFixedType {
            int_bits,
            frac_bits,
            max: Self::MAX_BITS,
        })
    }

    #[inline]
    pub const fn int_bits(&self) -> u32 {
        self.int_bits
    }

    #[inline]
    pub const fn frac_bits(&self) -> u32 {
        self.frac_bits
    }

    #[inline]
    pub const fn total_bits(&self) -> u32 {
        self.int_bits + self.frac_bits
    }

    /// `2^total_bits - 1`, the mask of every representable raw encoding.
    pub fn mask(&self) -> BigUint {
        (BigUint::from(1u8) << self.total_bits()) - 1u8
    }
}

impl fmt::Display for FixedType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.int_bits, self.frac_bits)
    }
}

/// Binary floating-point layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FloatFormat {
    /// IEEE-754 binary32.
    Float32,
    /// 16-bit "brain" float: binary32's exponent range with a 7-bit mantissa.
    BFloat16,
}

impl FloatFormat {
    #[inline]
    pub const fn exponent_bits(&self) -> u32 {
        8
    }

    #[inline]
    pub const fn mantissa_bits(&self) -> u32 {
        match self {
            FloatFormat::Float32 => 23,
            FloatFormat::BFloat16 => 7,
        }
    }

    #[inline]
    pub const fn bias(&self) -> i64 {
        (1 << (self.exponent_bits() - 1)) - 1
    }

    #[inline]
    pub const fn total_bits(&self) -> u32 {
        1 + self.exponent_bits() + self.mantissa_bits()
    }
}

/// Static shape of a node's value.
#[derive(Debug, Clone, PartialEq, Eq, Hash, EnumIs, EnumTryAs)]
pub enum TypeDesc {
    Boolean,
    SignedFixed(FixedType),
    UnsignedFixed(FixedType),
    Float32,
    BFloat16,
    Tuple(Vec<TypeDesc>),
}

impl TypeDesc {
    /// Signed fixed-point type, `int_bits` including the sign bit.
    pub fn signed(int_bits: u32, frac_bits: u32) -> Result<Self> {
        FixedType::try_new(int_bits, frac_bits).map(TypeDesc::SignedFixed)
    }

    pub fn unsigned(int_bits: u32, frac_bits: u32) -> Result<Self> {
        FixedType::try_new(int_bits, frac_bits).map(TypeDesc::UnsignedFixed)
    }

    /// Fixed-point type of the given signedness.
    pub fn fixed(signed: bool, ty: FixedType) -> Self {
        if signed {
            TypeDesc::SignedFixed(ty)
        } else {
            TypeDesc::UnsignedFixed(ty)
        }
    }

    pub fn tuple(items: impl IntoIterator<Item = TypeDesc>) -> Self {
        TypeDesc::Tuple(items.into_iter().collect())
    }

    /// Signedness and bit split of a fixed-point type.
    pub fn as_fixed(&self) -> Option<(bool, FixedType)> {
        match self {
            TypeDesc::SignedFixed(t) => Some((true, *t)),
            TypeDesc::UnsignedFixed(t) => Some((false, *t)),
            _ => None,
        }
    }

    pub fn float_format(&self) -> Option<FloatFormat> {
        match self {
            TypeDesc::Float32 => Some(FloatFormat::Float32),
            TypeDesc::BFloat16 => Some(FloatFormat::BFloat16),
            _ => None,
        }
    }

    pub fn items(&self) -> Option<&[TypeDesc]> {
        match self {
            TypeDesc::Tuple(items) => Some(items),
            _ => None,
        }
    }

    /// Type of slot `index` of a tuple type.
    pub fn index(&self, index: usize) -> Result<&TypeDesc> {
        let items = self.items().ok_or_else(|| Error::signature(format!("`{}` is not a tuple", self)))?;
        items.get(index).ok_or(Error::IndexOutOfRange {
            index,
            len: items.len(),
        })
    }

    /// Number of bits of the encoding (sum over tuple slots).
    pub fn total_bits(&self) -> u64 {
        match self {
            TypeDesc::Boolean => 1,
            TypeDesc::SignedFixed(t) | TypeDesc::UnsignedFixed(t) => t.total_bits() as u64,
            TypeDesc::Float32 => FloatFormat::Float32.total_bits() as u64,
            TypeDesc::BFloat16 => FloatFormat::BFloat16.total_bits() as u64,
            TypeDesc::Tuple(items) => items.iter().map(TypeDesc::total_bits).sum(),
        }
    }

    /// Zero-valued placeholder of this shape.
    pub fn runtime_type(&self) -> Value {
        match self {
            TypeDesc::Boolean => Value::Boolean(false),
            TypeDesc::SignedFixed(ty) => Value::SignedFixed {
                ty: *ty,
                raw: BigUint::ZERO,
            },
            TypeDesc::UnsignedFixed(ty) => Value::UnsignedFixed {
                ty: *ty,
                raw: BigUint::ZERO,
            },
            TypeDesc::Float32 => Value::Float32(FloatBits::ZERO),
            TypeDesc::BFloat16 => Value::BFloat16(FloatBits::ZERO),
            TypeDesc::Tuple(items) => Value::Tuple(items.iter().map(TypeDesc::runtime_type).collect()),
        }
    }
}

impl fmt::Display for TypeDesc {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDesc::Boolean => f.write_str("bool"),
            TypeDesc::SignedFixed(t) => write!(f, "sfix<{}>", t),
            TypeDesc::UnsignedFixed(t) => write!(f, "ufix<{}>", t),
            TypeDesc::Float32 => f.write_str("f32"),
            TypeDesc::BFloat16 => f.write_str("bf16"),
            TypeDesc::Tuple(items) => {
                f.write_str("(")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str(")")
            }
        }
    }
}
