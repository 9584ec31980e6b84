//! Primitive arithmetic blocks.
//!
//! Each primitive pairs a closed-form spec relation with an implementation tree made
//! of [`ops`](crate::ops) operators. Output widths are chosen so that no primitive
//! here overflows: the spec holds exactly for every representable input.
use hwformal::expr::Sym;
use hwformal::expr::func::{cst, tuple, var};
use hwformal::spec::SpecRelation;
use hwformal::value::pow2;

use crate::node::Node;
use crate::ops;
use crate::signature::{ParamConstraint, Signature};
use crate::types::{FixedType, TypeDesc};
use crate::utils::{Error, Result};

fn fixed_pair(types: &[TypeDesc]) -> Result<(bool, FixedType, FixedType)> {
    match (types[0].as_fixed(), types[1].as_fixed()) {
        (Some((sa, a)), Some((sb, b))) if sa == sb => Ok((sa, a, b)),
        _ => Err(Error::signature(format!(
            "operands `{}` and `{}` must be fixed-point of the same signedness",
            types[0], types[1]
        ))),
    }
}

/// Type of `x + y` (and `x - y`): one more integer bit than the widest operand.
fn sum_type(types: &[TypeDesc]) -> Result<TypeDesc> {
    let (signed, a, b) = fixed_pair(types)?;
    let ty = FixedType::try_new(
        a.int_bits().max(b.int_bits()) + 1,
        a.frac_bits().max(b.frac_bits()),
    )?;
    Ok(TypeDesc::fixed(signed, ty))
}

fn product_type(types: &[TypeDesc]) -> Result<TypeDesc> {
    let (signed, a, b) = fixed_pair(types)?;
    let ty = FixedType::try_new(a.int_bits() + b.int_bits(), a.frac_bits() + b.frac_bits())?;
    Ok(TypeDesc::fixed(signed, ty))
}

fn binary_spec(relation: Sym) -> SpecRelation {
    SpecRelation::builder(["x", "y"], "out").relation(relation)
}

fn types_of(nodes: &[Node]) -> Vec<TypeDesc> {
    nodes.iter().map(|n| n.node_type().clone()).collect()
}

/// Exact addition of two fixed-point values of the same signedness.
pub fn add(x: &Node, y: &Node) -> Result<Node> {
    let signature = Signature::new([ParamConstraint::Fixed, ParamConstraint::Fixed], sum_type);
    let spec = binary_spec(var("out").equals(var("x") + var("y")));
    Node::primitive("add", spec, &signature, [x.clone(), y.clone()], |p| {
        let out = sum_type(&types_of(p))?;
        let a = ops::resize(&p[0], out.clone())?;
        let b = ops::resize(&p[1], out.clone())?;
        ops::raw_add(&a, &b, out)
    })
}

/// Exact subtraction of two signed fixed-point values.
pub fn sub(x: &Node, y: &Node) -> Result<Node> {
    let signature = Signature::new([ParamConstraint::Signed, ParamConstraint::Signed], sum_type);
    let spec = binary_spec(var("out").equals(var("x") - var("y")));
    Node::primitive("sub", spec, &signature, [x.clone(), y.clone()], |p| {
        let out = sum_type(&types_of(p))?;
        let a = ops::resize(&p[0], out.clone())?;
        let b = ops::resize(&p[1], out.clone())?;
        ops::raw_sub(&a, &b, out)
    })
}

/// Exact product; integer and fractional widths add up.
pub fn mul(x: &Node, y: &Node) -> Result<Node> {
    let signature = Signature::new([ParamConstraint::Fixed, ParamConstraint::Fixed], product_type);
    let spec = binary_spec(var("out").equals(var("x") * var("y")));
    Node::primitive("mul", spec, &signature, [x.clone(), y.clone()], |p| {
        let out = product_type(&types_of(p))?;
        ops::raw_mul(&p[0], &p[1], out)
    })
}

/// Sum and carry types of a 3:2 compressor over `types`.
fn csa_types(types: &[TypeDesc]) -> Result<(TypeDesc, TypeDesc)> {
    let mut int_bits = 0;
    let mut frac_bits = None;
    for ty in types {
        let (_, t) = ty
            .as_fixed()
            .ok_or_else(|| Error::signature(format!("`{}` is not fixed-point", ty)))?;
        if *frac_bits.get_or_insert(t.frac_bits()) != t.frac_bits() {
            return Err(Error::signature("all operands need the same number of fractional bits"));
        }
        int_bits = int_bits.max(t.int_bits());
    }
    let frac_bits = frac_bits.unwrap_or_default();
    Ok((
        TypeDesc::unsigned(int_bits, frac_bits)?,
        TypeDesc::unsigned(int_bits + 1, frac_bits)?,
    ))
}

/// Declared behavior of a 3:2 compressor with `frac_bits` fractional bits:
/// the carry is the bitwise majority shifted left once, the sum takes the rest.
pub fn csa_spec(frac_bits: u32) -> SpecRelation {
    SpecRelation::builder(["x", "y", "z"], "out")
        .capture("scale", cst(pow2(frac_bits as i64)))
        .bind("xs", var("x") * var("scale"))
        .bind("ys", var("y") * var("scale"))
        .bind("zs", var("z") * var("scale"))
        .bind(
            "carry",
            (((var("xs") & var("ys")) | (var("xs") & var("zs")) | (var("ys") & var("zs"))) << cst(1)) / var("scale"),
        )
        .relation(var("out").equals(tuple([
            var("x") + var("y") + var("z") - var("carry"),
            var("carry"),
        ])))
}

/// Carry-save adder: compresses three unsigned operands into `(sum, carry)` with
/// `sum + carry == x + y + z`, without propagating carries.
pub fn csa(x: &Node, y: &Node, z: &Node) -> Result<Node> {
    let signature = Signature::new(
        [ParamConstraint::Unsigned, ParamConstraint::Unsigned, ParamConstraint::Unsigned],
        |types| csa_types(types).map(|(sum, carry)| TypeDesc::tuple([sum, carry])),
    );
    let frac_bits = x.node_type().as_fixed().map(|(_, t)| t.frac_bits()).unwrap_or_default();
    Node::primitive("csa", csa_spec(frac_bits), &signature, [x.clone(), y.clone(), z.clone()], |p| {
        let (sum_ty, carry_ty) = csa_types(&types_of(p))?;
        let a = ops::resize(&p[0], sum_ty.clone())?;
        let b = ops::resize(&p[1], sum_ty.clone())?;
        let c = ops::resize(&p[2], sum_ty)?;

        let sum = ops::xor(&ops::xor(&a, &b)?, &c)?;
        let majority = ops::or(&ops::or(&ops::and(&a, &b)?, &ops::and(&a, &c)?)?, &ops::and(&b, &c)?)?;
        let carry = ops::shl(&ops::resize(&majority, carry_ty)?, 1)?;
        ops::tuple(&[sum, carry])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;
    use hwformal::value::SpecValue;

    fn fixed(signed: bool, int_bits: u32, frac_bits: u32, value: f64) -> Node {
        let ty = TypeDesc::fixed(signed, FixedType::new(int_bits, frac_bits).unwrap());
        Node::constant(Value::encode(&ty, &SpecValue::from(value)).unwrap())
    }

    #[test]
    fn add_widens() {
        let n = add(&fixed(true, 2, 2, 1.5), &fixed(true, 3, 2, 2.25)).unwrap();
        assert_eq!(n.node_type(), &TypeDesc::signed(4, 2).unwrap());
        assert_eq!(n.evaluate().unwrap().to_spec(), SpecValue::from(3.75));
    }

    #[test]
    fn add_rejects_mixed_signedness() {
        let err = add(&fixed(true, 2, 2, 1.5), &fixed(false, 3, 2, 2.25)).unwrap_err();
        assert!(err.is_signature());
    }

    #[test]
    fn sub_and_mul() {
        let a = fixed(true, 3, 1, -2.5);
        let b = fixed(true, 2, 2, 1.75);
        assert_eq!(sub(&a, &b).unwrap().evaluate().unwrap().to_spec(), SpecValue::from(-4.25));
        let p = mul(&a, &b).unwrap();
        assert_eq!(p.node_type(), &TypeDesc::signed(5, 3).unwrap());
        assert_eq!(p.evaluate().unwrap().to_spec(), SpecValue::from(-4.375));
        assert!(sub(&fixed(false, 2, 0, 1.0), &fixed(false, 2, 0, 1.0)).is_err());
    }

    #[test]
    fn csa_preserves_the_sum() {
        let x = fixed(false, 3, 1, 6.5);
        let y = fixed(false, 3, 1, 3.0);
        let z = fixed(false, 2, 1, 2.5);
        let n = csa(&x, &y, &z).unwrap();
        assert_eq!(n.node_type().to_string(), "(ufix<3.1>, ufix<4.1>)");
        let v = n.evaluate().unwrap().to_spec();
        let items = v.items().unwrap();
        let total = items[0].as_real().unwrap() + items[1].as_real().unwrap();
        assert_eq!(SpecValue::Real(total), SpecValue::from(12.0));
    }
}
