//! Sample designs for tests.
use hwformal::expr::func::{cst, var};
use hwformal::spec::{SpecRelation, Stmt};
use hwir::prelude::*;

pub fn ufix(int_bits: u32, frac_bits: u32) -> TypeDesc {
    TypeDesc::unsigned(int_bits, frac_bits).unwrap()
}

pub fn sfix(int_bits: u32, frac_bits: u32) -> TypeDesc {
    TypeDesc::signed(int_bits, frac_bits).unwrap()
}

/// Unbound variables of type `ty`.
pub fn variables<const N: usize>(names: [&str; N], ty: &TypeDesc) -> [Node; N] {
    names.map(|name| Node::variable(name, ty.clone()))
}

/// Same signedness everywhere; returns it with every operand's split.
fn fixed_operands(types: &[TypeDesc]) -> Result<(bool, Vec<FixedType>)> {
    let mut signed = None;
    let mut splits = Vec::with_capacity(types.len());
    for ty in types {
        let (s, t) = ty
            .as_fixed()
            .ok_or_else(|| Error::signature(format!("`{}` is not fixed-point", ty)))?;
        if *signed.get_or_insert(s) != s {
            return Err(Error::signature("operands mix signed and unsigned types"));
        }
        splits.push(t);
    }
    Ok((signed.unwrap_or_default(), splits))
}

/// Output type of `library::add` on two operands.
fn add_type(signed: bool, a: FixedType, b: FixedType) -> Result<(bool, FixedType)> {
    let t = FixedType::try_new(
        a.int_bits().max(b.int_bits()) + 1,
        a.frac_bits().max(b.frac_bits()),
    )?;
    Ok((signed, t))
}

fn binary_add_signature() -> Signature {
    Signature::new([ParamConstraint::Fixed, ParamConstraint::Fixed], |types| {
        let (signed, t) = fixed_operands(types)?;
        let (_, out) = add_type(signed, t[0], t[1])?;
        Ok(TypeDesc::fixed(signed, out))
    })
}

/// `out == x + y + z`, implemented as two chained adders.
pub fn add3(x: &Node, y: &Node, z: &Node) -> Result<Node> {
    let spec = SpecRelation::builder(["x", "y", "z"], "out")
        .relation(var("out").equals(var("x") + var("y") + var("z")));
    let signature = Signature::new(std::iter::repeat_n(ParamConstraint::Fixed, 3), |types| {
        let (signed, t) = fixed_operands(types)?;
        let (_, xy) = add_type(signed, t[0], t[1])?;
        let (_, out) = add_type(signed, xy, t[2])?;
        Ok(TypeDesc::fixed(signed, out))
    });
    Node::composite("add3", spec, &signature, [x.clone(), y.clone(), z.clone()], |p| {
        library::add(&library::add(&p[0], &p[1])?, &p[2])
    })
}

/// `out == w + x + y + z` through two carry-save stages and a final adder.
pub fn csa_tree4(w: &Node, x: &Node, y: &Node, z: &Node) -> Result<Node> {
    let spec = SpecRelation::builder(["w", "x", "y", "z"], "out")
        .relation(var("out").equals(var("w") + var("x") + var("y") + var("z")));
    let signature = Signature::new(std::iter::repeat_n(ParamConstraint::Unsigned, 4), |types| {
        let (_, t) = fixed_operands(types)?;
        let frac_bits = t[0].frac_bits();
        if t.iter().any(|s| s.frac_bits() != frac_bits) {
            return Err(Error::signature("all operands need the same number of fractional bits"));
        }
        let first = t[..3].iter().map(FixedType::int_bits).max().unwrap_or_default();
        let second = (first + 1).max(t[3].int_bits());
        TypeDesc::unsigned(second + 2, frac_bits)
    });
    Node::composite(
        "csa_tree4",
        spec,
        &signature,
        [w.clone(), x.clone(), y.clone(), z.clone()],
        |p| {
            let first = library::csa(&p[0], &p[1], &p[2])?;
            let second = library::csa(&first.index(0)?, &first.index(1)?, &p[3])?;
            library::add(&second.index(0)?, &second.index(1)?)
        },
    )
}

/// Plain adder whose spec is wrong by one.
pub fn add_off_by_one(x: &Node, y: &Node) -> Result<Node> {
    let spec = SpecRelation::builder(["x", "y"], "out")
        .relation(var("out").equals(var("x") + var("y") + cst(1)));
    Node::composite(
        "add_off_by_one",
        spec,
        &binary_add_signature(),
        [x.clone(), y.clone()],
        |p| library::add(&p[0], &p[1]),
    )
}

/// Spec branching on the sign of `x - y`, which is only known for concrete inputs.
pub fn abs_diff(x: &Node, y: &Node) -> Result<Node> {
    let spec = SpecRelation::builder(["x", "y"], "out")
        .branch(
            var("x").ge(var("y")),
            vec![Stmt::bind("d", var("x") - var("y"))],
            vec![Stmt::bind("d", var("y") - var("x"))],
        )
        .relation(var("out").equals(var("d")));
    let signature = Signature::new([ParamConstraint::Signed, ParamConstraint::Signed], |types| {
        let (signed, t) = fixed_operands(types)?;
        let (_, out) = add_type(signed, t[0], t[1])?;
        Ok(TypeDesc::fixed(signed, out))
    });
    Node::composite("abs_diff", spec, &signature, [x.clone(), y.clone()], |p| {
        let diff = library::sub(&p[0], &p[1])?;
        let flipped = library::sub(&p[1], &p[0])?;
        let negative = ops::select(&diff, diff.node_type().total_bits() as u32 - 1)?;
        ops::mux(&negative, &flipped, &diff)
    })
}

/// Adder whose spec refers to a name it never defines.
pub fn add_with_unresolved_name(x: &Node, y: &Node) -> Result<Node> {
    let spec = SpecRelation::builder(["x", "y"], "out")
        .relation(var("out").equals(var("x") + var("y") + var("width")));
    Node::composite(
        "add_with_unresolved_name",
        spec,
        &binary_add_signature(),
        [x.clone(), y.clone()],
        |p| library::add(&p[0], &p[1]),
    )
}

/// `out == w + x + y + z` reusing the [`add3`] composite.
pub fn add4(w: &Node, x: &Node, y: &Node, z: &Node) -> Result<Node> {
    let spec = SpecRelation::builder(["w", "x", "y", "z"], "out")
        .relation(var("out").equals(var("w") + var("x") + var("y") + var("z")));
    let signature = Signature::new(std::iter::repeat_n(ParamConstraint::Fixed, 4), |types| {
        let (signed, t) = fixed_operands(types)?;
        let (_, wx) = add_type(signed, t[0], t[1])?;
        let (_, wxy) = add_type(signed, wx, t[2])?;
        let (_, out) = add_type(signed, wxy, t[3])?;
        Ok(TypeDesc::fixed(signed, out))
    });
    Node::composite("add4", spec, &signature, [w.clone(), x.clone(), y.clone(), z.clone()], |p| {
        library::add(&add3(&p[0], &p[1], &p[2])?, &p[3])
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use hwformal::value::SpecValue;

    #[test]
    fn declared_types_match_the_implementations() {
        let [a, b, c, d] = variables(["a", "b", "c", "d"], &ufix(3, 1));
        assert_eq!(add3(&a, &b, &c).unwrap().node_type(), &ufix(5, 1));
        assert_eq!(add4(&a, &b, &c, &d).unwrap().node_type(), &ufix(6, 1));
        assert_eq!(csa_tree4(&a, &b, &c, &d).unwrap().node_type(), &ufix(6, 1));
        assert!(csa_tree4(&a, &b, &c, &Node::variable("e", ufix(3, 2))).is_err());
    }

    #[test]
    fn abs_diff_evaluates_both_branches() {
        let t = sfix(4, 0);
        let [x, y] = variables(["x", "y"], &t);
        let node = abs_diff(&x, &y).unwrap();
        for (a, b) in [(3.0, 5.0), (5.0, 3.0), (-8.0, 7.0)] {
            x.bind(Value::encode(&t, &SpecValue::from(a)).unwrap()).unwrap();
            y.bind(Value::encode(&t, &SpecValue::from(b)).unwrap()).unwrap();
            assert_eq!(node.evaluate().unwrap().to_spec(), SpecValue::from(f64::abs(a - b)));
        }
    }
}
