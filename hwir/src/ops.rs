//! Bit-exact operators.
//!
//! These are the `Operator` nodes every implementation tree is made of. They carry no
//! specification: shifts truncate, raw arithmetic wraps around, slices drop bits.
//! Operators whose meaning is exact on idealized values render as the matching
//! symbolic expression; the others render as an uninterpreted call.
use hwformal::expr::Sym;
use hwformal::expr::func::{ite, tuple as sym_tuple};
use num_bigint::{BigInt, BigUint};

use crate::node::Node;
use crate::signature::{ParamConstraint, Signature};
use crate::types::TypeDesc;
use crate::utils::{Error, Result};
use crate::value::Value;

fn bit_operand(ty: &TypeDesc) -> Result<()> {
    if ty.is_boolean() || ty.as_fixed().is_some() {
        Ok(())
    } else {
        Err(Error::signature(format!(
            "`{}` is neither a boolean nor a fixed-point type",
            ty
        )))
    }
}

fn same_bit_type(types: &[TypeDesc]) -> Result<TypeDesc> {
    let first = &types[0];
    bit_operand(first)?;
    match types.iter().find(|t| *t != first) {
        Some(other) => Err(Error::signature(format!(
            "operands must share one type, got `{}` and `{}`",
            first, other
        ))),
        None => Ok(first.clone()),
    }
}

fn raw_of(value: &Value) -> Result<&BigUint> {
    value
        .raw()
        .ok_or_else(|| Error::implementation(format!("expected a fixed-point value, got `{}`", value.ty())))
}

fn with_args(args: &[Sym], extra: impl IntoIterator<Item = i64>) -> Vec<Sym> {
    args.iter().cloned().chain(extra.into_iter().map(Sym::from)).collect()
}

/// Logical negation of a boolean, bitwise complement of a fixed-point value.
pub fn not(a: &Node) -> Result<Node> {
    let signature = Signature::new([ParamConstraint::Any], same_bit_type);
    let logical = a.node_type().is_boolean();
    Node::operator_with_symbolic(
        "not",
        &signature,
        [a.clone()],
        |v| match &v[0] {
            Value::Boolean(b) => Ok(Value::boolean(!b)),
            fixed => {
                let ty = fixed.ty();
                let mask = ty.as_fixed().map(|(_, t)| t.mask()).unwrap_or_default();
                Value::fixed(&ty, mask ^ raw_of(fixed)?)
            }
        },
        move |args| {
            if logical {
                !args[0].clone()
            } else {
                Sym::Call("not".to_string(), args.to_vec())
            }
        },
    )
}

#[derive(Debug, Clone, Copy)]
enum Bitwise {
    And,
    Or,
    Xor,
}

impl Bitwise {
    fn name(&self) -> &'static str {
        match self {
            Bitwise::And => "and",
            Bitwise::Or => "or",
            Bitwise::Xor => "xor",
        }
    }

    fn on_bools(&self, a: bool, b: bool) -> bool {
        match self {
            Bitwise::And => a && b,
            Bitwise::Or => a || b,
            Bitwise::Xor => a ^ b,
        }
    }

    fn on_raws(&self, a: &BigUint, b: &BigUint) -> BigUint {
        match self {
            Bitwise::And => a & b,
            Bitwise::Or => a | b,
            Bitwise::Xor => a ^ b,
        }
    }

    fn build(self, a: &Node, b: &Node) -> Result<Node> {
        let signature = Signature::new([ParamConstraint::Any, ParamConstraint::Any], same_bit_type);
        let logical = a.node_type().is_boolean();
        Node::operator_with_symbolic(
            self.name(),
            &signature,
            [a.clone(), b.clone()],
            move |v| match (&v[0], &v[1]) {
                (Value::Boolean(x), Value::Boolean(y)) => Ok(Value::boolean(self.on_bools(*x, *y))),
                (x, y) => Value::fixed(&x.ty(), self.on_raws(raw_of(x)?, raw_of(y)?)),
            },
            move |args| {
                let (x, y) = (args[0].clone(), args[1].clone());
                match (logical, self) {
                    (true, Bitwise::And) => x.and(y),
                    (true, Bitwise::Or) => x.or(y),
                    (true, Bitwise::Xor) => !x.equals(y),
                    (false, _) => Sym::Call(self.name().to_string(), vec![x, y]),
                }
            },
        )
    }
}

pub fn and(a: &Node, b: &Node) -> Result<Node> {
    Bitwise::And.build(a, b)
}

pub fn or(a: &Node, b: &Node) -> Result<Node> {
    Bitwise::Or.build(a, b)
}

pub fn xor(a: &Node, b: &Node) -> Result<Node> {
    Bitwise::Xor.build(a, b)
}

/// Logical left shift of the raw encoding by a constant amount; bits shifted out of
/// the type are lost.
pub fn shl(a: &Node, amount: u32) -> Result<Node> {
    let signature = Signature::new([ParamConstraint::Fixed], |types| Ok(types[0].clone()));
    Node::operator_with_symbolic(
        "shl",
        &signature,
        [a.clone()],
        move |v| {
            let ty = v[0].ty();
            let mask = ty.as_fixed().map(|(_, t)| t.mask()).unwrap_or_default();
            Value::fixed(&ty, (raw_of(&v[0])? << amount as usize) & mask)
        },
        move |args| Sym::Call("shl".to_string(), with_args(args, [amount as i64])),
    )
}

/// Logical right shift of the raw encoding by a constant amount.
pub fn shr(a: &Node, amount: u32) -> Result<Node> {
    let signature = Signature::new([ParamConstraint::Fixed], |types| Ok(types[0].clone()));
    Node::operator_with_symbolic(
        "shr",
        &signature,
        [a.clone()],
        move |v| Value::fixed(&v[0].ty(), raw_of(&v[0])? >> amount as usize),
        move |args| Sym::Call("shr".to_string(), with_args(args, [amount as i64])),
    )
}

/// Bits `[lo, lo + width)` of the raw encoding, as an unsigned integer.
pub fn slice(a: &Node, lo: u32, width: u32) -> Result<Node> {
    let signature = Signature::new([ParamConstraint::Fixed], move |types| {
        let total = types[0].total_bits();
        if width == 0 || lo as u64 + width as u64 > total {
            return Err(Error::signature(format!(
                "bits [{}, {}) do not lie inside the {} bits of `{}`",
                lo,
                lo as u64 + width as u64,
                total,
                types[0]
            )));
        }
        TypeDesc::unsigned(width, 0)
    });
    Node::operator_with_symbolic(
        "slice",
        &signature,
        [a.clone()],
        move |v| {
            let out = TypeDesc::unsigned(width, 0)?;
            let mask = (BigUint::from(1u8) << width as usize) - 1u8;
            Value::fixed(&out, (raw_of(&v[0])? >> lo as usize) & mask)
        },
        move |args| Sym::Call("slice".to_string(), with_args(args, [lo as i64, width as i64])),
    )
}

/// Single bit of the raw encoding as a boolean.
pub fn select(a: &Node, bit: u32) -> Result<Node> {
    let signature = Signature::new([ParamConstraint::Fixed], move |types| {
        if bit as u64 >= types[0].total_bits() {
            return Err(Error::IndexOutOfRange {
                index: bit as usize,
                len: types[0].total_bits() as usize,
            });
        }
        Ok(TypeDesc::Boolean)
    });
    Node::operator_with_symbolic(
        "select",
        &signature,
        [a.clone()],
        move |v| Ok(Value::boolean(raw_of(&v[0])?.bit(bit as u64))),
        move |args| Sym::Call("select".to_string(), with_args(args, [bit as i64])),
    )
}

/// Concatenation of raw encodings, first argument in the most significant bits.
pub fn concat(parts: &[Node]) -> Result<Node> {
    let signature = Signature::new([ParamConstraint::Any], |types| {
        let mut total = 0u64;
        for ty in types {
            bit_operand(ty)?;
            total += ty.total_bits();
        }
        let total = u32::try_from(total).map_err(|_| Error::signature("concatenation is too wide"))?;
        TypeDesc::unsigned(total, 0)
    })
    .variadic(ParamConstraint::Any);
    Node::operator("concat", &signature, parts.iter().cloned(), |v| {
        let packed = Value::tuple(v.iter().cloned());
        let total = packed.ty().total_bits() as u32;
        Value::fixed(&TypeDesc::unsigned(total, 0)?, packed.to_bits())
    })
}

/// `a` when `cond` holds, `b` otherwise.
pub fn mux(cond: &Node, a: &Node, b: &Node) -> Result<Node> {
    let signature = Signature::new(
        [ParamConstraint::Boolean, ParamConstraint::Any, ParamConstraint::Any],
        |types| {
            if types[1] != types[2] {
                return Err(Error::signature(format!(
                    "both branches must share one type, got `{}` and `{}`",
                    types[1], types[2]
                )));
            }
            Ok(types[1].clone())
        },
    );
    Node::operator_with_symbolic(
        "mux",
        &signature,
        [cond.clone(), a.clone(), b.clone()],
        |v| match v[0] {
            Value::Boolean(true) => Ok(v[1].copy()),
            _ => Ok(v[2].copy()),
        },
        |args| ite(args[0].clone(), args[1].clone(), args[2].clone()),
    )
}

/// Re-align a fixed-point value to `target` without changing it. Only widenings
/// that can represent every source value are accepted.
pub fn resize(a: &Node, target: TypeDesc) -> Result<Node> {
    let out = target.clone();
    let signature = Signature::new([ParamConstraint::Fixed], move |types| {
        let (src_signed, src) = types[0].as_fixed().ok_or_else(|| Error::signature("expected a fixed-point type"))?;
        let (dst_signed, dst) = out
            .as_fixed()
            .ok_or_else(|| Error::signature(format!("cannot resize to `{}`", out)))?;
        // An unsigned source needs one extra integer bit to become signed.
        let needed = src.int_bits() + (!src_signed && dst_signed) as u32;
        if (src_signed && !dst_signed) || dst.int_bits() < needed || dst.frac_bits() < src.frac_bits() {
            return Err(Error::signature(format!(
                "resizing `{}` to `{}` would lose information",
                types[0], out
            )));
        }
        Ok(out.clone())
    });
    Node::operator_with_symbolic(
        "resize",
        &signature,
        [a.clone()],
        move |v| Value::encode(&target, &v[0].to_spec()),
        |args| args[0].clone(),
    )
}

/// View the raw bits of `a` as a value of `target`, which must have the same width.
pub fn reinterpret(a: &Node, target: TypeDesc) -> Result<Node> {
    let out = target.clone();
    let signature = Signature::new([ParamConstraint::Any], move |types| {
        if types[0].total_bits() != out.total_bits() {
            return Err(Error::signature(format!(
                "`{}` has {} bits but `{}` has {}",
                types[0],
                types[0].total_bits(),
                out,
                out.total_bits()
            )));
        }
        Ok(out.clone())
    });
    Node::operator("reinterpret", &signature, [a.clone()], move |v| {
        Value::from_bits(&target, &v[0].to_bits())
    })
}

fn raw_arith(
    name: &'static str,
    a: &Node,
    b: &Node,
    target: TypeDesc,
    frac_bits: fn(u32, u32) -> Option<u32>,
    op: fn(BigInt, BigInt) -> BigInt,
) -> Result<Node> {
    let out = target.clone();
    let signature = Signature::new([ParamConstraint::Fixed, ParamConstraint::Fixed], move |types| {
        let fa = types[0].as_fixed().map(|(_, t)| t.frac_bits()).unwrap_or_default();
        let fb = types[1].as_fixed().map(|(_, t)| t.frac_bits()).unwrap_or_default();
        let expected = frac_bits(fa, fb)
            .ok_or_else(|| Error::signature(format!("operands `{}` and `{}` are not aligned", types[0], types[1])))?;
        match out.as_fixed() {
            Some((_, t)) if t.frac_bits() == expected => Ok(out.clone()),
            _ => Err(Error::signature(format!(
                "the result must be fixed-point with {} fractional bits, got `{}`",
                expected, out
            ))),
        }
    });
    Node::operator(name, &signature, [a.clone(), b.clone()], move |v| {
        let x = v[0].signed_raw().ok_or_else(|| Error::implementation("expected fixed-point operands"))?;
        let y = v[1].signed_raw().ok_or_else(|| Error::implementation("expected fixed-point operands"))?;
        Value::wrapping(&target, &op(x, y))
    })
}

fn aligned(a: u32, b: u32) -> Option<u32> {
    (a == b).then_some(a)
}

/// Two's complement addition of the integer encodings, wrapped to `target`.
pub fn raw_add(a: &Node, b: &Node, target: TypeDesc) -> Result<Node> {
    raw_arith("raw_add", a, b, target, aligned, |x, y| x + y)
}

pub fn raw_sub(a: &Node, b: &Node, target: TypeDesc) -> Result<Node> {
    raw_arith("raw_sub", a, b, target, aligned, |x, y| x - y)
}

/// Integer product of the encodings; the result scale is the sum of both scales.
pub fn raw_mul(a: &Node, b: &Node, target: TypeDesc) -> Result<Node> {
    raw_arith("raw_mul", a, b, target, |a, b| Some(a + b), |x, y| x * y)
}

/// Equality of the idealized values of two nodes, whatever their encodings.
pub fn eq(a: &Node, b: &Node) -> Result<Node> {
    let signature = Signature::new([ParamConstraint::Any, ParamConstraint::Any], |_| Ok(TypeDesc::Boolean));
    Node::operator_with_symbolic(
        "eq",
        &signature,
        [a.clone(), b.clone()],
        |v| Ok(Value::boolean(v[0].to_spec() == v[1].to_spec())),
        |args| args[0].clone().equals(args[1].clone()),
    )
}

/// Tuple of the given nodes.
pub fn tuple(items: &[Node]) -> Result<Node> {
    let signature = Signature::new([], |types| Ok(TypeDesc::tuple(types.iter().cloned()))).variadic(ParamConstraint::Any);
    Node::operator_with_symbolic(
        "tuple",
        &signature,
        items.iter().cloned(),
        |v| Ok(Value::tuple(v.iter().cloned())),
        |args| sym_tuple(args.iter().cloned()),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwformal::value::SpecValue;

    fn ufix(i: u32, f: u32) -> TypeDesc {
        TypeDesc::unsigned(i, f).unwrap()
    }

    fn sfix(i: u32, f: u32) -> TypeDesc {
        TypeDesc::signed(i, f).unwrap()
    }

    fn raw(ty: &TypeDesc, raw: u32) -> Node {
        Node::constant(Value::fixed(ty, raw).unwrap())
    }

    fn real(node: &Node) -> SpecValue {
        node.evaluate().unwrap().to_spec()
    }

    #[test]
    fn bitwise_on_fixed_and_bool() {
        let t = ufix(4, 0);
        let a = raw(&t, 0b1100);
        let b = raw(&t, 0b1010);
        assert_eq!(and(&a, &b).unwrap().evaluate().unwrap().raw(), Some(&BigUint::from(0b1000u32)));
        assert_eq!(or(&a, &b).unwrap().evaluate().unwrap().raw(), Some(&BigUint::from(0b1110u32)));
        assert_eq!(xor(&a, &b).unwrap().evaluate().unwrap().raw(), Some(&BigUint::from(0b0110u32)));
        assert_eq!(not(&a).unwrap().evaluate().unwrap().raw(), Some(&BigUint::from(0b0011u32)));

        let t = Node::constant(Value::boolean(true));
        let f = Node::constant(Value::boolean(false));
        assert_eq!(xor(&t, &f).unwrap().evaluate().unwrap(), Value::boolean(true));
        assert!(and(&t, &a).unwrap_err().is_signature());
    }

    #[test]
    fn shifts_truncate() {
        let t = ufix(4, 0);
        let a = raw(&t, 0b1011);
        assert_eq!(shl(&a, 1).unwrap().evaluate().unwrap().raw(), Some(&BigUint::from(0b0110u32)));
        assert_eq!(shr(&a, 2).unwrap().evaluate().unwrap().raw(), Some(&BigUint::from(0b0010u32)));
    }

    #[test]
    fn slice_select_concat() {
        let t = ufix(3, 2);
        let a = raw(&t, 0b10110);
        let s = slice(&a, 1, 3).unwrap();
        assert_eq!(s.node_type(), &ufix(3, 0));
        assert_eq!(real(&s), SpecValue::from(3i64));
        assert!(slice(&a, 3, 3).unwrap_err().is_signature());

        assert_eq!(select(&a, 4).unwrap().evaluate().unwrap(), Value::boolean(true));
        assert!(select(&a, 5).unwrap_err().is_index_out_of_range());

        let flag = Node::constant(Value::boolean(true));
        let c = concat(&[flag, s]).unwrap();
        assert_eq!(c.node_type(), &ufix(4, 0));
        assert_eq!(real(&c), SpecValue::from(0b1011i64));
    }

    #[test]
    fn mux_picks_a_branch() {
        let t = sfix(3, 0);
        let c = Node::variable("c", TypeDesc::Boolean);
        let m = mux(&c, &raw(&t, 1), &raw(&t, 2)).unwrap();
        c.bind(Value::boolean(false)).unwrap();
        assert_eq!(real(&m), SpecValue::from(2i64));
        assert!(mux(&c, &raw(&t, 1), &raw(&ufix(3, 0), 2)).unwrap_err().is_signature());
    }

    #[test]
    fn resize_is_exact() {
        let a = raw(&sfix(2, 1), 0b101); // -1.5
        let r = resize(&a, sfix(4, 3)).unwrap();
        assert_eq!(real(&r), SpecValue::from(-1.5));
        assert!(resize(&a, sfix(1, 3)).unwrap_err().is_signature());
        assert!(resize(&a, ufix(4, 3)).unwrap_err().is_signature());
        // unsigned 3.0 needs four signed integer bits
        assert!(resize(&raw(&ufix(3, 0), 7), sfix(3, 0)).is_err());
        assert_eq!(real(&resize(&raw(&ufix(3, 0), 7), sfix(4, 0)).unwrap()), SpecValue::from(7i64));
    }

    #[test]
    fn reinterpret_keeps_bits() {
        let a = raw(&ufix(4, 0), 0b1111);
        assert_eq!(real(&reinterpret(&a, sfix(4, 0)).unwrap()), SpecValue::from(-1i64));
        assert!(reinterpret(&a, sfix(5, 0)).unwrap_err().is_signature());
    }

    #[test]
    fn raw_arithmetic_wraps() {
        let t = sfix(3, 1);
        let a = raw(&t, 0b0111); // 3.5
        let b = raw(&t, 0b0001); // 0.5
        assert_eq!(real(&raw_add(&a, &b, sfix(4, 1)).unwrap()), SpecValue::from(4i64));
        // 4.0 does not fit in sfix<3.1>
        assert_eq!(real(&raw_add(&a, &b, t.clone()).unwrap()), SpecValue::from(-4i64));
        assert_eq!(real(&raw_sub(&b, &a, t.clone()).unwrap()), SpecValue::from(-3i64));
        assert_eq!(real(&raw_mul(&a, &b, sfix(6, 2)).unwrap()), SpecValue::from(1.75));
        assert!(raw_mul(&a, &b, sfix(6, 1)).unwrap_err().is_signature());
        assert!(raw_add(&a, &raw(&sfix(3, 0), 1), t).unwrap_err().is_signature());
    }

    #[test]
    fn tuple_and_index() {
        let t = tuple(&[Node::constant(Value::boolean(true)), raw(&ufix(2, 0), 3)]).unwrap();
        assert_eq!(t.node_type().to_string(), "(bool, ufix<2.0>)");
        assert_eq!(real(&t.index(1).unwrap()), SpecValue::from(3i64));
    }
}
