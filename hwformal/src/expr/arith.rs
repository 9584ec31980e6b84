//! Exact constant arithmetic used by the simplifier.
//!
//! Every folding function returns `None` instead of approximating: division folds
//! only when the quotient is exact, bitwise operators fold only on integers, and
//! exponents/shift amounts are bounded.
use bigdecimal::{BigDecimal, RoundingMode, ToPrimitive, Zero};
use num_bigint::BigInt;

use crate::expr::{BinaryOp, CmpOp, UnaryOp};
use crate::value::{pow2, to_integer};

/// Pure functions a spec relation may call. They fold when every argument is constant.
pub const BUILTINS: &[&str] = &["abs", "round", "int", "float", "max", "min"];

/// Nullary call standing for positive infinity.
pub const INFINITY: &str = "inf";
/// Nullary call standing for NaN.
pub const NAN: &str = "nan";

/// Largest exponent or shift amount folded eagerly.
pub const MAX_FOLD_EXPONENT: i64 = 1 << 16;

#[inline]
pub fn is_builtin(name: &str) -> bool {
    BUILTINS.contains(&name)
}

fn bounded_exponent(value: &BigDecimal) -> Option<i64> {
    let n = to_integer(value)?.to_i64()?;
    (n.abs() <= MAX_FOLD_EXPONENT).then_some(n)
}

fn from_int(value: BigInt) -> BigDecimal {
    BigDecimal::new(value, 0)
}

/// `a / b` when the quotient is exactly representable.
pub fn exact_div(a: &BigDecimal, b: &BigDecimal) -> Option<BigDecimal> {
    if b.is_zero() {
        return None;
    }
    let q = a / b;
    (&q * b == *a).then_some(q)
}

/// Python-style floor division (rounds toward negative infinity).
pub fn floor_div(a: &BigDecimal, b: &BigDecimal) -> Option<BigDecimal> {
    if b.is_zero() {
        return None;
    }
    if let (Some(x), Some(y)) = (to_integer(a), to_integer(b)) {
        let mut q = &x / &y;
        let r = &x % &y;
        if !r.is_zero() && ((r < BigInt::zero()) != (y < BigInt::zero())) {
            q -= 1;
        }
        return Some(from_int(q));
    }
    Some(exact_div(a, b)?.with_scale_round(0, RoundingMode::Floor))
}

fn pow(base: &BigDecimal, exponent: &BigDecimal) -> Option<BigDecimal> {
    let e = bounded_exponent(exponent)?;
    let mut acc = BigDecimal::from(1);
    let mut square = base.clone();
    let mut n = e.unsigned_abs();
    while n > 0 {
        if n & 1 == 1 {
            acc = &acc * &square;
        }
        square = &square * &square;
        n >>= 1;
    }
    if e < 0 {
        exact_div(&BigDecimal::from(1), &acc)
    } else {
        Some(acc)
    }
}

pub fn fold_binary(op: BinaryOp, a: &BigDecimal, b: &BigDecimal) -> Option<BigDecimal> {
    match op {
        BinaryOp::Add => Some(a + b),
        BinaryOp::Sub => Some(a - b),
        BinaryOp::Mul => Some(a * b),
        BinaryOp::Div => exact_div(a, b),
        BinaryOp::FloorDiv => floor_div(a, b),
        BinaryOp::Pow => pow(a, b),
        BinaryOp::Shl => {
            let n = bounded_exponent(b).filter(|n| *n >= 0)?;
            Some(a * pow2(n))
        }
        BinaryOp::Shr => {
            let n = bounded_exponent(b).filter(|n| *n >= 0)?;
            // BigInt shifts round toward negative infinity, like an arithmetic shift.
            Some(from_int(to_integer(a)? >> (n as usize)))
        }
        BinaryOp::BitAnd => Some(from_int(to_integer(a)? & to_integer(b)?)),
        BinaryOp::BitOr => Some(from_int(to_integer(a)? | to_integer(b)?)),
        BinaryOp::BitXor => Some(from_int(to_integer(a)? ^ to_integer(b)?)),
    }
}

pub fn fold_unary(op: UnaryOp, a: &BigDecimal) -> Option<BigDecimal> {
    match op {
        UnaryOp::Neg => Some(-a),
        UnaryOp::Invert => Some(from_int(-to_integer(a)? - 1)),
    }
}

pub fn fold_cmp(op: CmpOp, a: &BigDecimal, b: &BigDecimal) -> bool {
    match op {
        CmpOp::Lt => a < b,
        CmpOp::Le => a <= b,
        CmpOp::Gt => a > b,
        CmpOp::Ge => a >= b,
    }
}

/// Evaluate a builtin on constant arguments.
pub fn fold_builtin(name: &str, args: &[BigDecimal]) -> Option<BigDecimal> {
    match (name, args) {
        ("abs", [x]) => Some(x.abs()),
        // Round half to even, as binary floating point hardware does.
        ("round", [x]) => Some(x.with_scale_round(0, RoundingMode::HalfEven)),
        ("round", [x, digits]) => {
            let digits = bounded_exponent(digits)?;
            Some(x.with_scale_round(digits, RoundingMode::HalfEven))
        }
        ("int", [x]) => Some(x.with_scale_round(0, RoundingMode::Down)),
        ("float", [x]) => Some(x.clone()),
        ("max", [first, rest @ ..]) => Some(rest.iter().fold(first, |m, x| if x > m { x } else { m }).clone()),
        ("min", [first, rest @ ..]) => Some(rest.iter().fold(first, |m, x| if x < m { x } else { m }).clone()),
        _ => None,
    }
}
