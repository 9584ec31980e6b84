use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use hwformal::prelude::{var, Sym};
use hwformal::spec::SpecRelation;
use hwformal::value::SpecValue;
use hwir::prelude::*;

fn sfix(i: u32, f: u32) -> TypeDesc {
    TypeDesc::signed(i, f).unwrap()
}

fn ufix(i: u32, f: u32) -> TypeDesc {
    TypeDesc::unsigned(i, f).unwrap()
}

fn encode(ty: &TypeDesc, value: f64) -> Value {
    Value::encode(ty, &SpecValue::from(value)).unwrap()
}

/// Composite declaring `out == x + y` whose implementation subtracts.
fn bad_add(x: &Node, y: &Node) -> Result<Node> {
    let spec = SpecRelation::builder(["x", "y"], "out").relation(var("out").equals(var("x") + var("y")));
    let signature = Signature::new([ParamConstraint::Signed, ParamConstraint::Signed], |_| Ok(sfix(4, 0)));
    Node::composite("bad_add", spec, &signature, [x.clone(), y.clone()], |p| {
        library::sub(&p[0], &p[1])
    })
}

/// Composite whose spec relation does not isolate its output.
fn widen_with_spec(x: &Node, relation: Sym) -> Result<Node> {
    let spec = SpecRelation::builder(["x"], "out").relation(relation);
    let signature = Signature::new([ParamConstraint::Exact(sfix(3, 0))], |_| Ok(sfix(5, 0)));
    Node::composite("widen", spec, &signature, [x.clone()], |p| ops::resize(&p[0], sfix(5, 0)))
}

#[test]
fn scenario_constant_addition() {
    let a = Node::constant(encode(&sfix(2, 2), 1.5));
    let b = Node::constant(encode(&sfix(3, 2), 2.25));
    let sum = library::add(&a, &b).unwrap();

    let (signed, ty) = sum.node_type().as_fixed().unwrap();
    assert!(signed);
    assert_eq!((ty.int_bits(), ty.frac_bits()), (4, 2));
    assert_eq!(sum.evaluate().unwrap().to_spec(), SpecValue::from(3.75));
}

#[test]
fn scenario_unbound_variable() {
    let x = Node::variable("x", sfix(2, 2));
    let err = x.evaluate().unwrap_err();
    assert_eq!(err, Error::UnboundVariable { name: "x".to_string() });
    assert_eq!(err.kind(), ErrorKind::UnboundVariable);
    assert!(!err.is_recoverable());
}

#[test]
fn scenario_spec_mismatch() {
    let x = Node::variable("x", sfix(3, 0));
    let y = Node::variable("y", sfix(3, 0));
    let node = bad_add(&x, &y).unwrap();
    x.bind(encode(&sfix(3, 0), 3.0)).unwrap();
    y.bind(encode(&sfix(3, 0), 1.0)).unwrap();

    let err = node.evaluate().unwrap_err();
    assert_eq!(
        err,
        Error::SpecMismatch {
            node: "bad_add".to_string(),
            implementation: SpecValue::from(2.0),
            specification: SpecValue::from(4.0),
        }
    );
    assert!(err.is_recoverable());

    // Same inputs as constants: the folded value is still checked.
    let folded = bad_add(
        &Node::constant(encode(&sfix(3, 0), 3.0)),
        &Node::constant(encode(&sfix(3, 0), 1.0)),
    )
    .unwrap();
    assert!(folded.is_folded());
    assert!(folded.evaluate().unwrap_err().is_spec_mismatch());
}

#[test]
fn spec_checks_can_be_disabled_or_excluded() {
    let x = Node::constant(encode(&sfix(3, 0), 3.0));
    let y = Node::constant(encode(&sfix(3, 0), 1.0));
    let node = bad_add(&x, &y).unwrap();

    let mut session = Session::new(EvalOptions::unchecked());
    assert_eq!(session.evaluate(&node).unwrap().to_spec(), SpecValue::from(2.0));
    assert_eq!(session.stats().spec_checks, 0);

    let mut session = Session::new(EvalOptions::default().exclude("bad_add", "known divergence"));
    assert!(session.evaluate(&node).is_ok());
    assert_eq!(session.stats().excluded, 1);
}

#[test]
fn relations_without_closed_form_are_checked_with_the_output() {
    let x = Node::variable("x", sfix(3, 0));
    x.bind(encode(&sfix(3, 0), -2.0)).unwrap();

    let ok = widen_with_spec(&x, var("out").ge(var("x"))).unwrap();
    assert!(ok.evaluate().is_ok());

    let bad = widen_with_spec(&x, var("out").gt(var("x"))).unwrap();
    match bad.evaluate() {
        Err(Error::SpecViolated { node, output, residual }) => {
            assert_eq!(node, "widen");
            assert_eq!(output, SpecValue::from(-2.0));
            assert_eq!(residual, Sym::Bool(false));
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn shared_nodes_are_computed_once_per_evaluation() {
    let calls = Arc::new(AtomicUsize::new(0));
    let counter = calls.clone();
    let t = ufix(4, 0);
    let x = Node::variable("x", t.clone());
    let shared = Node::operator(
        "count",
        &Signature::new([ParamConstraint::Any], |types| Ok(types[0].clone())),
        [x.clone()],
        move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(v[0].copy())
        },
    )
    .unwrap();
    let root = ops::tuple(&[ops::not(&shared).unwrap(), ops::shl(&shared, 1).unwrap()]).unwrap();
    x.bind(Value::fixed(&t, 3u8).unwrap()).unwrap();

    let mut session = Session::default();
    session.evaluate(&root).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert!(session.stats().cache_hits >= 1);

    // A fresh top-level evaluation recomputes.
    root.evaluate().unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 2);
}

#[test]
fn evaluations_do_not_share_caches() {
    let x = Node::variable("x", sfix(3, 0));
    let y = Node::constant(encode(&sfix(3, 0), 1.0));
    let sum = library::add(&x, &y).unwrap();

    x.bind(encode(&sfix(3, 0), 2.0)).unwrap();
    assert_eq!(sum.evaluate().unwrap().to_spec(), SpecValue::from(3.0));
    x.bind(encode(&sfix(3, 0), -4.0)).unwrap();
    assert_eq!(sum.evaluate().unwrap().to_spec(), SpecValue::from(-3.0));
}

#[test]
fn type_check_cannot_be_bypassed() {
    let x = Node::variable("x", ufix(2, 0));
    let liar = Node::operator(
        "liar",
        &Signature::new([ParamConstraint::Any], |_| Ok(TypeDesc::Boolean)),
        [x.clone()],
        |v| Ok(v[0].copy()),
    )
    .unwrap();
    x.bind(Value::fixed(&ufix(2, 0), 1u8).unwrap()).unwrap();

    let err = liar.evaluate().unwrap_err();
    assert_eq!(
        err,
        Error::TypeMismatch {
            node: "liar".to_string(),
            expected: TypeDesc::Boolean,
            found: ufix(2, 0),
        }
    );
    assert_eq!(err.kind(), ErrorKind::TypeMismatch);
}

#[test]
fn tuple_round_trip() {
    let types = [sfix(2, 1), ufix(3, 0), TypeDesc::Boolean, TypeDesc::Float32];
    let values = [
        encode(&types[0], -1.5),
        encode(&types[1], 6.0),
        Value::boolean(true),
        Value::float32(0.375),
    ];
    let args: Vec<Node> = types
        .iter()
        .zip(&values)
        .enumerate()
        .map(|(i, (ty, value))| {
            let v = Node::variable(format!("v{}", i), ty.clone());
            v.bind(value.clone()).unwrap();
            v
        })
        .collect();
    let packed = ops::tuple(&args).unwrap();

    for (i, arg) in args.iter().enumerate() {
        let slot = packed.index(i).unwrap();
        assert_eq!(slot.node_type(), arg.node_type());
        assert_eq!(slot.evaluate().unwrap(), arg.evaluate().unwrap());
    }
    assert!(packed.index(args.len()).unwrap_err().is_index_out_of_range());
}

#[test]
fn folding_is_sound() {
    let inputs = [(sfix(3, 1), 2.5), (sfix(2, 2), -1.25), (sfix(4, 0), 5.0)];
    let build = |leaves: &[Node]| {
        let product = library::mul(&leaves[0], &leaves[1]).unwrap();
        library::add(&product, &leaves[2]).unwrap()
    };

    let constants: Vec<Node> = inputs.iter().map(|(t, v)| Node::constant(encode(t, *v))).collect();
    let folded = build(&constants);
    let folded_value = folded.folded().cloned().unwrap();
    assert_eq!(folded.evaluate().unwrap(), folded_value);

    let variables: Vec<Node> = inputs
        .iter()
        .enumerate()
        .map(|(i, (t, v))| {
            let n = Node::variable(format!("v{}", i), t.clone());
            n.bind(encode(t, *v)).unwrap();
            n
        })
        .collect();
    let live = build(&variables);
    assert!(!live.is_folded());
    assert_eq!(live.evaluate().unwrap(), folded_value);
    assert_eq!(folded_value.to_spec(), SpecValue::from(1.875));
}

/// Pass-through operator counting its invocations.
fn counting(x: &Node, calls: &Arc<AtomicUsize>) -> Node {
    let counter = calls.clone();
    Node::operator(
        "count",
        &Signature::new([ParamConstraint::Any], |types| Ok(types[0].clone())),
        [x.clone()],
        move |v| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(v[0].copy())
        },
    )
    .unwrap()
}

#[test]
fn assertions_run_on_every_evaluation() {
    let t = ufix(3, 0);
    let x = Node::variable("x", t.clone());
    let mut assertions = Assertions::new();
    // x must be odd
    assertions.check(&x, ops::select(&x, 0).unwrap()).unwrap();
    let mut session = Session::default().with_assertions(assertions.clone());

    x.bind(Value::fixed(&t, 5u8).unwrap()).unwrap();
    assert!(session.evaluate(&x).is_ok());

    x.bind(Value::fixed(&t, 4u8).unwrap()).unwrap();
    let err = session.evaluate(&x).unwrap_err();
    assert_eq!(
        err,
        Error::AssertionFailure {
            node: "x".to_string(),
            assertion: "select".to_string(),
        }
    );
    assert!(err.is_recoverable());

    // Nodes evaluate without a table as well.
    assert!(x.evaluate().is_ok());

    let options = EvalOptions {
        check_assertions: false,
        ..Default::default()
    };
    let mut session = Session::new(options).with_assertions(assertions);
    assert!(session.evaluate(&x).is_ok());
}

#[test]
fn assertions_reuse_values_of_nodes_being_computed() {
    let calls = Arc::new(AtomicUsize::new(0));
    let t = ufix(3, 0);
    let x = Node::variable("x", t.clone());
    let copy = counting(&x, &calls);
    let mut assertions = Assertions::new();
    assertions.check(&x, ops::eq(&copy, &x).unwrap()).unwrap();
    x.bind(Value::fixed(&t, 6u8).unwrap()).unwrap();

    let mut session = Session::default().with_assertions(assertions);
    session.evaluate(&copy).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn sessions_observe_rebound_variables() {
    let x = Node::variable("x", sfix(3, 0));
    let sum = library::add(&x, &Node::constant(encode(&sfix(3, 0), 1.0))).unwrap();
    let mut session = Session::default();

    x.bind(encode(&sfix(3, 0), 2.0)).unwrap();
    assert_eq!(session.evaluate(&sum).unwrap().to_spec(), SpecValue::from(3.0));
    x.bind(encode(&sfix(3, 0), -4.0)).unwrap();
    assert_eq!(session.evaluate(&sum).unwrap().to_spec(), SpecValue::from(-3.0));
}

#[test]
fn roots_evaluated_together_share_the_cache() {
    let calls = Arc::new(AtomicUsize::new(0));
    let t = ufix(2, 0);
    let x = Node::variable("x", t.clone());
    let shared = counting(&x, &calls);
    let roots = [ops::not(&shared).unwrap(), ops::shl(&shared, 1).unwrap()];
    x.bind(Value::fixed(&t, 1u8).unwrap()).unwrap();

    let values = Session::default().evaluate_many(&roots).unwrap();
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(values[0], Value::fixed(&t, 2u8).unwrap());
    assert_eq!(values[1], Value::fixed(&t, 2u8).unwrap());
}

#[test]
fn checked_designs_are_freed() {
    let marker = Arc::new(());
    let held = marker.clone();
    let t = ufix(2, 0);
    let x = Node::variable("x", t.clone());
    let host = Node::operator(
        "keep",
        &Signature::new([ParamConstraint::Any], |types| Ok(types[0].clone())),
        [x.clone()],
        move |v| {
            let _ = &held;
            Ok(v[0].copy())
        },
    )
    .unwrap();
    let mut assertions = Assertions::new();
    assertions.check(&host, ops::eq(&host, &x).unwrap()).unwrap();
    x.bind(Value::fixed(&t, 3u8).unwrap()).unwrap();
    assert!(Session::default().with_assertions(assertions).evaluate(&host).is_ok());

    drop(host);
    drop(x);
    assert_eq!(Arc::strong_count(&marker), 1);
}

#[test]
fn carry_save_cross_check() {
    let t = ufix(3, 1);
    let [x, y, z] = ["x", "y", "z"].map(|name| Node::variable(name, t.clone()));
    let compressed = library::csa(&x, &y, &z).unwrap();
    let sum = compressed.index(0).unwrap();
    let carry = compressed.index(1).unwrap();
    let direct = library::add(&library::add(&x, &y).unwrap(), &z).unwrap();
    let both = library::add(&sum, &carry).unwrap();
    let mut assertions = Assertions::new();
    assertions.check(&compressed, ops::eq(&both, &direct).unwrap()).unwrap();
    let mut session = Session::default().with_assertions(assertions);

    for (a, b, c) in [(0.0, 0.0, 0.0), (7.5, 7.5, 7.5), (3.5, 1.0, 6.5), (0.5, 2.0, 4.5)] {
        x.bind(encode(&t, a)).unwrap();
        y.bind(encode(&t, b)).unwrap();
        z.bind(encode(&t, c)).unwrap();
        let values = session.evaluate_many(&[compressed.clone(), both.clone()]).unwrap();
        assert_eq!(values[1].to_spec(), SpecValue::from(a + b + c));
    }
}

#[test]
fn tree_rendering() {
    let x = Node::variable("x", sfix(3, 0));
    let y = Node::variable("y", sfix(3, 0));
    let node = bad_add(&x, &y).unwrap();

    let short = node.tree(false).to_string();
    assert!(short.starts_with("composite bad_add#"));
    assert!(short.contains("\n  variable x#"));
    assert!(!short.contains("primitive sub"));

    let expanded = node.tree(true).to_string();
    assert!(expanded.contains("| spec spec(x, y) -> out: out == x + y"));
    assert!(expanded.contains("primitive sub#"));
    assert!(expanded.contains("variable bad_add.x#"));
}
