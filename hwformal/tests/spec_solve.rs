use hwformal::prelude::*;

fn adder() -> SpecRelation {
    SpecRelation::builder(["x", "y"], "out").relation(var("out").equals(var("x") + var("y")))
}

/// 3:2 compressor on integers: `(sum, carry)` with `sum + carry == x + y + z`.
fn compressor() -> SpecRelation {
    SpecRelation::builder(["x", "y", "z"], "out")
        .bind(
            "carry",
            ((var("x") & var("y")) | (var("x") & var("z")) | (var("y") & var("z"))) << cst(1),
        )
        .relation(var("out").equals(tuple([
            var("x") + var("y") + var("z") - var("carry"),
            var("carry"),
        ])))
}

#[test]
fn solve_direct_equality() {
    let solved = adder().solve(&[var("a"), var("b")], "o").unwrap();
    assert_eq!(solved, var("a") + var("b"));
}

#[test]
fn solve_flipped_equality() {
    let spec = SpecRelation::builder(["x"], "out").relation((var("x") * cst(2)).equals(var("out")));
    assert_eq!(spec.solve(&[cst(3)], "o").unwrap(), cst(6));
}

#[test]
fn solve_per_slot_conjunction() {
    let spec = SpecRelation::builder(["x", "y"], "out").relation(and([
        var("out").index(1).equals(var("x") - var("y")),
        var("out").index(0).equals(var("x") + var("y")),
    ]));
    let solved = spec.solve(&[var("p"), var("q")], "o").unwrap();
    assert_eq!(solved, tuple([var("p") + var("q"), var("p") - var("q")]));
}

#[test]
fn missing_slot_is_not_closed_form() {
    let spec = SpecRelation::builder(["x"], "out").relation(and([
        var("out").index(1).equals(var("x")),
        var("x").ge(cst(0)),
    ]));
    let err = spec.solve(&[var("p")], "o").unwrap_err();
    assert!(err.is_not_closed_form());
}

#[test]
fn output_on_both_sides_is_not_closed_form() {
    let spec = SpecRelation::builder(["x"], "out").relation(var("out").equals(var("out") * var("x")));
    match spec.solve(&[var("p")], "o") {
        Err(Error::NotClosedForm { output, residual }) => {
            assert_eq!(output, "o");
            assert!(residual.mentions("o"));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn evaluate_concrete_inputs() {
    let v = adder().evaluate(&[SpecValue::from(1.5), SpecValue::from(2.25)]).unwrap();
    assert_eq!(v, SpecValue::from(3.75));

    let v = compressor()
        .evaluate(&[SpecValue::from(3i64), SpecValue::from(5i64), SpecValue::from(6i64)])
        .unwrap();
    // carry = ((3&5)|(3&6)|(5&6)) << 1 = 7 << 1
    assert_eq!(v, SpecValue::Tuple(vec![SpecValue::from(0i64), SpecValue::from(14i64)]));
}

#[test]
fn check_with_concrete_output() {
    let spec = adder();
    let inputs = [SpecValue::from(3.0), SpecValue::from(1.0)];
    assert!(spec.check(&inputs, &SpecValue::from(4.0)).unwrap().is_true());
    assert_eq!(spec.check(&inputs, &SpecValue::from(2.0)).unwrap(), boolean(false));
}

#[test]
fn compressor_symbolic_sum_is_preserved() {
    let spec = compressor();
    let solved = spec.solve(&[var("a"), var("b"), var("c")], "o").unwrap();
    let total = (solved.clone().index(0) + solved.index(1)).simplify();
    assert_eq!(total, (var("a") + var("b") + var("c")).simplify());
}

#[test]
fn concrete_branches_are_taken() {
    let spec = SpecRelation::builder(["x"], "out")
        .capture("signed", true)
        .branch(
            var("signed"),
            vec![Stmt::bind("bias", cst(-1))],
            vec![Stmt::bind("bias", cst(0))],
        )
        .relation(var("out").equals(var("x") + var("bias")));
    assert_eq!(spec.solve(&[var("a")], "o").unwrap(), (var("a") - cst(1)).simplify());
}

#[test]
fn symbolic_branch_is_unsupported() {
    let spec = SpecRelation::builder(["x"], "out")
        .branch(
            var("x").gt(cst(0)),
            vec![Stmt::bind("y", var("x"))],
            vec![Stmt::bind("y", -var("x"))],
        )
        .relation(var("out").equals(var("y")));
    let err = spec.solve(&[var("a")], "o").unwrap_err();
    assert!(err.is_unsupported_construct());
    // The same relation is fine once the input is concrete.
    assert_eq!(spec.evaluate(&[SpecValue::from(-2i64)]).unwrap(), SpecValue::from(2i64));
}

#[test]
fn unresolved_names_are_reported() {
    let spec = SpecRelation::builder(["x"], "out").relation(var("out").equals(var("x") + var("width")));
    assert_eq!(
        spec.solve(&[var("a")], "o"),
        Err(Error::UnresolvedName {
            name: "width".to_string()
        })
    );
}

#[test]
fn only_builtin_calls_are_accepted() {
    let ok = SpecRelation::builder(["x"], "out").relation(var("out").equals(call("abs", [var("x")])));
    assert_eq!(ok.evaluate(&[SpecValue::from(-2.5)]).unwrap(), SpecValue::from(2.5));

    let bad = SpecRelation::builder(["x"], "out").relation(var("out").equals(call("sqrt", [var("x")])));
    assert!(bad.solve(&[var("a")], "o").unwrap_err().is_unsupported_construct());
}

#[test]
fn special_values_flow_through_relations() {
    let spec = SpecRelation::builder(["x"], "out").relation(var("out").equals(var("x")));
    let neg_inf = SpecValue::Infinite { negative: true };
    assert_eq!(spec.evaluate(&[neg_inf.clone()]).unwrap(), neg_inf);
    assert_eq!(spec.evaluate(&[SpecValue::NaN]).unwrap(), SpecValue::NaN);
}
