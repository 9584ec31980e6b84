//! Bottom-up algebraic simplification.
//!
//! Every rule below maps an expression whose children are already simplified to
//! an expression that is a fixpoint of the same rules, which is what makes
//! [`Sym::simplify`] idempotent.
use std::convert::Infallible;

use bigdecimal::{BigDecimal, One, Zero};

use super::arith::{fold_binary, fold_builtin, fold_cmp, fold_unary, is_builtin};
use super::{BinaryOp, CmpOp, LogicOp, Sym, UnaryOp};

impl Sym {
    /// Simplify this expression.
    ///
    /// The rewriting is conservative: constants are folded exactly, `+`/`-` and `*`
    /// chains are put in a canonical order, and equalities between syntactically
    /// identical operands reduce to `true`. Nothing else is assumed, so an expression
    /// that does not reduce is returned (partially simplified) rather than guessed.
    pub fn simplify(&self) -> Sym {
        let node = match self.try_map_children(&mut |child| Ok::<_, Infallible>(child.simplify())) {
            Ok(node) => node,
            Err(never) => match never {},
        };
        node.reduce()
    }

    /// Apply the top-level rules to a node whose children are simplified.
    fn reduce(self) -> Sym {
        match self {
            Sym::Binary(BinaryOp::Add | BinaryOp::Sub, _, _) | Sym::Unary(UnaryOp::Neg, _) => {
                SignedSum::collect(self).rebuild()
            }
            Sym::Binary(BinaryOp::Mul, _, _) => Product::collect(self).rebuild(),
            Sym::Binary(op, a, b) => reduce_binary(op, *a, *b),
            Sym::Unary(op, a) => match a.as_const().and_then(|v| fold_unary(op, v)) {
                Some(v) => Sym::Const(v),
                None => Sym::Unary(op, a),
            },
            Sym::Index(base, i) => match *base {
                Sym::Tuple(mut items) if i < items.len() => items.swap_remove(i),
                base => Sym::Index(Box::new(base), i),
            },
            Sym::Eq(a, b) => reduce_eq(*a, *b),
            Sym::Cmp(op, a, b) => reduce_cmp(op, *a, *b),
            Sym::Logic(op, items) => reduce_logic(op, items),
            Sym::Not(inner) => match *inner {
                Sym::Bool(b) => Sym::Bool(!b),
                Sym::Not(x) => *x,
                inner => Sym::Not(Box::new(inner)),
            },
            Sym::If(cond, then_branch, else_branch) => match *cond {
                Sym::Bool(true) => *then_branch,
                Sym::Bool(false) => *else_branch,
                _ if then_branch == else_branch => *then_branch,
                cond => Sym::If(Box::new(cond), then_branch, else_branch),
            },
            Sym::Call(name, args) => {
                if is_builtin(&name) {
                    let consts: Option<Vec<BigDecimal>> = args.iter().map(|a| a.as_const().cloned()).collect();
                    if let Some(v) = consts.and_then(|c| fold_builtin(&name, &c)) {
                        return Sym::Const(v);
                    }
                }
                Sym::Call(name, args)
            }
            leaf @ (Sym::Const(_) | Sym::Var(_) | Sym::Bool(_) | Sym::Tuple(_)) => leaf,
        }
    }
}

fn reduce_binary(op: BinaryOp, a: Sym, b: Sym) -> Sym {
    if let (Sym::Const(x), Sym::Const(y)) = (&a, &b) {
        if let Some(v) = fold_binary(op, x, y) {
            return Sym::Const(v);
        }
    }
    match (op, b.as_const()) {
        (BinaryOp::Div, Some(one)) if one.is_one() => a,
        // `>>` floors, so `x >> 0` is only `x` on integers.
        (BinaryOp::Shl, Some(zero)) if zero.is_zero() => a,
        _ => Sym::Binary(op, Box::new(a), Box::new(b)),
    }
}

fn reduce_eq(a: Sym, b: Sym) -> Sym {
    if a == b {
        return Sym::Bool(true);
    }
    match (a, b) {
        (Sym::Const(x), Sym::Const(y)) => Sym::Bool(x == y),
        (Sym::Bool(x), Sym::Bool(y)) => Sym::Bool(x == y),
        (Sym::Tuple(xs), Sym::Tuple(ys)) => {
            if xs.len() != ys.len() {
                return Sym::Bool(false);
            }
            let parts = xs.into_iter().zip(ys).map(|(x, y)| reduce_eq(x, y)).collect();
            reduce_logic(LogicOp::And, parts)
        }
        (a, b) => Sym::Eq(Box::new(a), Box::new(b)),
    }
}

fn reduce_cmp(op: CmpOp, a: Sym, b: Sym) -> Sym {
    if let (Sym::Const(x), Sym::Const(y)) = (&a, &b) {
        return Sym::Bool(fold_cmp(op, x, y));
    }
    if a == b {
        return Sym::Bool(matches!(op, CmpOp::Le | CmpOp::Ge));
    }
    Sym::Cmp(op, Box::new(a), Box::new(b))
}

fn reduce_logic(op: LogicOp, items: Vec<Sym>) -> Sym {
    fn push(item: Sym, flat: &mut Vec<Sym>) {
        if !flat.contains(&item) {
            flat.push(item);
        }
    }

    let mut flat: Vec<Sym> = Vec::with_capacity(items.len());
    for item in items {
        match item {
            Sym::Logic(inner, nested) if inner == op => {
                for x in nested {
                    push(x, &mut flat);
                }
            }
            other => push(other, &mut flat),
        }
    }

    let mut kept = Vec::with_capacity(flat.len());
    for item in flat {
        match item {
            Sym::Bool(b) if b == op.absorbing() => return Sym::Bool(b),
            Sym::Bool(b) if b == op.identity() => {}
            other => kept.push(other),
        }
    }

    match kept.len() {
        0 => Sym::Bool(op.identity()),
        1 => kept.swap_remove(0),
        _ => Sym::Logic(op, kept),
    }
}

/// `constant + Σ positive - Σ negative` over non-constant, non-sum terms.
struct SignedSum {
    constant: BigDecimal,
    positive: Vec<Sym>,
    negative: Vec<Sym>,
}

impl SignedSum {
    fn collect(expr: Sym) -> Self {
        let mut sum = SignedSum {
            constant: BigDecimal::zero(),
            positive: vec![],
            negative: vec![],
        };
        sum.add(expr, true);
        sum
    }

    fn add(&mut self, expr: Sym, positive: bool) {
        match expr {
            Sym::Const(v) if positive => self.constant += v,
            Sym::Const(v) => self.constant -= v,
            Sym::Binary(BinaryOp::Add, a, b) => {
                self.add(*a, positive);
                self.add(*b, positive);
            }
            Sym::Binary(BinaryOp::Sub, a, b) => {
                self.add(*a, positive);
                self.add(*b, !positive);
            }
            Sym::Unary(UnaryOp::Neg, a) => self.add(*a, !positive),
            term if positive => self.positive.push(term),
            term => self.negative.push(term),
        }
    }

    fn rebuild(mut self) -> Sym {
        // Cancel syntactically identical opposite terms.
        let mut negative = Vec::with_capacity(self.negative.len());
        for term in self.negative {
            match self.positive.iter().position(|p| *p == term) {
                Some(at) => {
                    self.positive.remove(at);
                }
                None => negative.push(term),
            }
        }
        self.positive.sort();
        negative.sort();

        let mut acc = self.positive.into_iter().reduce(|acc, term| acc + term);
        if !self.constant.is_zero() {
            acc = Some(match acc {
                Some(acc) => acc + Sym::Const(self.constant),
                None => Sym::Const(self.constant),
            });
        }
        for term in negative {
            acc = Some(match acc {
                Some(acc) => acc - term,
                None => -term,
            });
        }
        acc.unwrap_or_else(|| Sym::Const(BigDecimal::zero()))
    }
}

/// `constant * Π factors` over non-constant, non-product factors.
struct Product {
    constant: BigDecimal,
    factors: Vec<Sym>,
}

impl Product {
    fn collect(expr: Sym) -> Self {
        let mut product = Product {
            constant: BigDecimal::one(),
            factors: vec![],
        };
        product.mul(expr);
        product
    }

    fn mul(&mut self, expr: Sym) {
        match expr {
            Sym::Const(v) => self.constant *= v,
            Sym::Binary(BinaryOp::Mul, a, b) => {
                self.mul(*a);
                self.mul(*b);
            }
            factor => self.factors.push(factor),
        }
    }

    fn rebuild(mut self) -> Sym {
        if self.constant.is_zero() || self.factors.is_empty() {
            return Sym::Const(self.constant);
        }
        self.factors.sort();
        let mut acc = (!self.constant.is_one()).then(|| Sym::Const(self.constant));
        for factor in self.factors {
            acc = Some(match acc {
                Some(acc) => acc * factor,
                None => factor,
            });
        }
        acc.unwrap_or_else(|| Sym::Const(BigDecimal::one()))
    }
}

#[cfg(test)]
mod tests {
    use super::super::func::*;
    use super::*;

    #[test]
    fn sums_are_canonical() {
        let a = var("b") + var("a") - cst(1) + cst(4);
        let b = cst(3) + var("a") + var("b");
        assert_eq!(a.simplify(), b.simplify());
        assert_eq!(a.simplify(), var("a") + var("b") + cst(3));
    }

    #[test]
    fn opposite_terms_cancel() {
        let k = (var("x") & var("y")) << cst(1);
        let e = var("x") + var("y") - k.clone() + k;
        assert_eq!(e.simplify(), var("x") + var("y"));
        assert_eq!((var("x") - var("x")).simplify(), cst(0));
        assert_eq!((-(-var("x"))).simplify(), var("x"));
        assert_eq!((cst(0) - var("x")).simplify(), -var("x"));
    }

    #[test]
    fn shifting_by_zero() {
        assert_eq!((var("x") << cst(0)).simplify(), var("x"));
        let floor = var("x") >> cst(0);
        assert_eq!(floor.clone().simplify(), floor);
        assert_eq!((cst(-5) >> cst(0)).simplify(), cst(-5));
    }

    #[test]
    fn products_fold_constants() {
        assert_eq!((cst(2) * var("x") * cst(3)).simplify(), cst(6) * var("x"));
        assert_eq!((var("x") * cst(0)).simplify(), cst(0));
        assert_eq!((var("x") * cst(1)).simplify(), var("x"));
    }

    #[test]
    fn division_only_folds_when_exact() {
        assert_eq!((cst(3) / cst(4)).simplify(), cst(BigDecimal::new(75.into(), 2)));
        let third = cst(1) / cst(3);
        assert_eq!(third.simplify(), third);
    }

    #[test]
    fn logic_laws() {
        let p = var("p").lt(var("q"));
        assert_eq!(and([p.clone(), boolean(true)]).simplify(), p);
        assert_eq!(and([p.clone(), boolean(false)]).simplify(), boolean(false));
        assert_eq!(or([p.clone(), boolean(true)]).simplify(), boolean(true));
        assert_eq!(and(std::iter::empty()).simplify(), boolean(true));
        assert_eq!(or(std::iter::empty()).simplify(), boolean(false));
        assert_eq!(
            and([and([p.clone(), var("r")]), p.clone()]).simplify(),
            and([p, var("r")])
        );
    }

    #[test]
    fn equality_of_identical_operands() {
        let e = (var("a") + var("b")).equals(var("b") + var("a"));
        assert!(e.simplify().is_true());
        let wrong = (var("a") + var("b") + cst(1)).equals(var("b") + var("a"));
        assert!(!wrong.simplify().is_true());
        let tuples = tuple([var("x"), cst(2)]).equals(tuple([var("x"), cst(1) + cst(1)]));
        assert!(tuples.simplify().is_true());
    }

    #[test]
    fn conditionals_and_projections() {
        assert_eq!(ite(boolean(true), var("a"), var("b")).simplify(), var("a"));
        assert_eq!(ite(var("c"), var("a"), var("a")).simplify(), var("a"));
        assert_eq!(not(not(var("c"))).simplify(), var("c"));
        assert_eq!(tuple([var("a"), var("b")]).index(1).simplify(), var("b"));
    }

    #[test]
    fn builtins_fold_on_constants() {
        assert_eq!(call("max", [cst(1), cst(5)]).simplify(), cst(5));
        let opaque = call("max", [var("x"), cst(5)]);
        assert_eq!(opaque.simplify(), opaque);
        let unknown = call("sqrt", [cst(4)]);
        assert_eq!(unknown.simplify(), unknown);
    }
}
