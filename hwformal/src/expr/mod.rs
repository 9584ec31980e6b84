//! Symbolic expressions: the data form of spec relations.
//!
//! Role
//! - [`Sym`] is a small tagged expression forest covering arithmetic over exact reals,
//!   bitwise operations on integers, comparisons, boolean connectives, conditionals,
//!   tuples and named calls.
//! - Expressions are immutable values; [`Sym::simplify`] returns a new expression.
//! - Builders: std operator overloading (`a + b`, `x << 2`, `-y`), helper methods such as
//!   [`Sym::equals`] and the free functions in [`func`].
//!
//! Equality semantics
//! - `Sym` compares structurally. Variables are equal iff their names are equal; there is
//!   no alpha-renaming.
//!
//! Example
//! ```
//! use hwformal::expr::func::{var, cst};
//!
//! let e = (var("a") + cst(2)) + cst(3);
//! assert_eq!(e.simplify(), var("a") + cst(5));
//! ```
pub mod arith;
pub mod func;
pub mod pretty;
mod simplify;

use std::collections::BTreeSet;

use bigdecimal::BigDecimal;
use strum::{EnumIter, IntoStaticStr};

use crate::value::SpecValue;

/// Arithmetic and bitwise binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    FloorDiv,
    Pow,
    Shl,
    Shr,
    BitAnd,
    BitOr,
    BitXor,
}

impl BinaryOp {
    /// Infix symbol used by the pretty printer.
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::FloorDiv => "//",
            BinaryOp::Pow => "**",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::BitAnd => "&",
            BinaryOp::BitOr => "|",
            BinaryOp::BitXor => "^",
        }
    }
}

/// Unary arithmetic operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum UnaryOp {
    /// Arithmetic negation `-x`.
    Neg,
    /// Bitwise complement `~x` (integers only, `~x == -x - 1`).
    Invert,
}

/// Ordering comparisons. Equality has its own variant, [`Sym::Eq`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum CmpOp {
    Lt,
    Le,
    Gt,
    Ge,
}

impl CmpOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            CmpOp::Lt => "<",
            CmpOp::Le => "<=",
            CmpOp::Gt => ">",
            CmpOp::Ge => ">=",
        }
    }
}

/// N-ary associative boolean connectives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, EnumIter, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum LogicOp {
    And,
    Or,
}

impl LogicOp {
    /// Element absorbing the whole connective (`false` for and, `true` for or).
    pub fn absorbing(&self) -> bool {
        matches!(self, LogicOp::Or)
    }

    /// Neutral element (`true` for and, `false` for or).
    pub fn identity(&self) -> bool {
        matches!(self, LogicOp::And)
    }
}

/// A symbolic expression.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Sym {
    /// Exact real constant.
    Const(BigDecimal),
    /// Free variable, compared by name.
    Var(String),
    /// Projection `base[i]` out of a tuple.
    Index(Box<Sym>, usize),
    Tuple(Vec<Sym>),
    Binary(BinaryOp, Box<Sym>, Box<Sym>),
    Unary(UnaryOp, Box<Sym>),
    Eq(Box<Sym>, Box<Sym>),
    Cmp(CmpOp, Box<Sym>, Box<Sym>),
    Bool(bool),
    Logic(LogicOp, Vec<Sym>),
    Not(Box<Sym>),
    If(Box<Sym>, Box<Sym>, Box<Sym>),
    /// Named call. Names in [`arith::BUILTINS`] fold on constants, anything else is opaque.
    Call(String, Vec<Sym>),
}

impl Sym {
    pub fn as_const(&self) -> Option<&BigDecimal> {
        match self {
            Sym::Const(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Sym::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// `true` once simplification reduced this expression to the literal `true`.
    pub fn is_true(&self) -> bool {
        matches!(self, Sym::Bool(true))
    }

    /// Direct children, in evaluation order.
    pub fn children(&self) -> Vec<&Sym> {
        match self {
            Sym::Const(_) | Sym::Var(_) | Sym::Bool(_) => vec![],
            Sym::Index(base, _) => vec![&**base],
            Sym::Unary(_, e) | Sym::Not(e) => vec![&**e],
            Sym::Binary(_, a, b) | Sym::Eq(a, b) | Sym::Cmp(_, a, b) => vec![&**a, &**b],
            Sym::If(c, t, e) => vec![&**c, &**t, &**e],
            Sym::Tuple(items) | Sym::Logic(_, items) | Sym::Call(_, items) => items.iter().collect(),
        }
    }

    /// Whether the variable `name` occurs anywhere in this expression.
    pub fn mentions(&self, name: &str) -> bool {
        match self {
            Sym::Var(v) => v == name,
            _ => self.children().into_iter().any(|c| c.mentions(name)),
        }
    }

    /// Names of all variables occurring in this expression.
    pub fn free_vars(&self) -> BTreeSet<String> {
        let mut out = BTreeSet::new();
        let mut stack = vec![self];
        while let Some(e) = stack.pop() {
            if let Sym::Var(v) = e {
                out.insert(v.clone());
            }
            stack.extend(e.children());
        }
        out
    }

    /// Number of nodes in this expression.
    pub fn size(&self) -> usize {
        1 + self.children().into_iter().map(Sym::size).sum::<usize>()
    }

    /// Replace variables in a single pass; expressions returned by `lookup` are not
    /// revisited.
    pub fn substitute<E>(
        &self,
        lookup: &mut impl FnMut(&str) -> Result<Option<Sym>, E>,
    ) -> Result<Sym, E> {
        if let Sym::Var(name) = self {
            return Ok(lookup(name)?.unwrap_or_else(|| self.clone()));
        }
        self.try_map_children(&mut |child| child.substitute(lookup))
    }

    /// Rebuild this node with every direct child transformed by `f`.
    pub fn try_map_children<E>(
        &self,
        f: &mut impl FnMut(&Sym) -> Result<Sym, E>,
    ) -> Result<Sym, E> {
        fn list<E>(
            items: &[Sym],
            f: &mut impl FnMut(&Sym) -> Result<Sym, E>,
        ) -> Result<Vec<Sym>, E> {
            items.iter().map(|x| f(x)).collect()
        }

        Ok(match self {
            Sym::Const(_) | Sym::Var(_) | Sym::Bool(_) => self.clone(),
            Sym::Tuple(items) => Sym::Tuple(list(items, f)?),
            Sym::Logic(op, items) => Sym::Logic(*op, list(items, f)?),
            Sym::Call(name, args) => Sym::Call(name.clone(), list(args, f)?),
            Sym::Index(base, i) => Sym::Index(Box::new(f(base)?), *i),
            Sym::Binary(op, a, b) => Sym::Binary(*op, Box::new(f(a)?), Box::new(f(b)?)),
            Sym::Unary(op, a) => Sym::Unary(*op, Box::new(f(a)?)),
            Sym::Eq(a, b) => Sym::Eq(Box::new(f(a)?), Box::new(f(b)?)),
            Sym::Cmp(op, a, b) => Sym::Cmp(*op, Box::new(f(a)?), Box::new(f(b)?)),
            Sym::Not(a) => Sym::Not(Box::new(f(a)?)),
            Sym::If(c, t, e) => Sym::If(Box::new(f(c)?), Box::new(f(t)?), Box::new(f(e)?)),
        })
    }

    /// Convert a fully reduced expression back into a concrete value.
    ///
    /// Returns `None` as soon as a symbolic leaf remains.
    pub fn to_spec_value(&self) -> Option<SpecValue> {
        match self {
            Sym::Const(v) => Some(SpecValue::Real(v.clone())),
            Sym::Bool(b) => Some(SpecValue::Bool(*b)),
            Sym::Tuple(items) => items
                .iter()
                .map(Sym::to_spec_value)
                .collect::<Option<Vec<_>>>()
                .map(SpecValue::Tuple),
            Sym::Call(name, args) if args.is_empty() && name == arith::INFINITY => {
                Some(SpecValue::Infinite { negative: false })
            }
            Sym::Call(name, args) if args.is_empty() && name == arith::NAN => Some(SpecValue::NaN),
            Sym::Unary(UnaryOp::Neg, inner) => match inner.to_spec_value()? {
                SpecValue::Infinite { negative } => Some(SpecValue::Infinite {
                    negative: !negative,
                }),
                SpecValue::Real(v) => Some(SpecValue::Real(-v)),
                _ => None,
            },
            _ => None,
        }
    }

    // ---- builder helpers ----

    pub fn equals(self, other: impl Into<Sym>) -> Sym {
        Sym::Eq(Box::new(self), Box::new(other.into()))
    }

    pub fn lt(self, other: impl Into<Sym>) -> Sym {
        Sym::Cmp(CmpOp::Lt, Box::new(self), Box::new(other.into()))
    }

    pub fn le(self, other: impl Into<Sym>) -> Sym {
        Sym::Cmp(CmpOp::Le, Box::new(self), Box::new(other.into()))
    }

    pub fn gt(self, other: impl Into<Sym>) -> Sym {
        Sym::Cmp(CmpOp::Gt, Box::new(self), Box::new(other.into()))
    }

    pub fn ge(self, other: impl Into<Sym>) -> Sym {
        Sym::Cmp(CmpOp::Ge, Box::new(self), Box::new(other.into()))
    }

    pub fn and(self, other: impl Into<Sym>) -> Sym {
        Sym::Logic(LogicOp::And, vec![self, other.into()])
    }

    pub fn or(self, other: impl Into<Sym>) -> Sym {
        Sym::Logic(LogicOp::Or, vec![self, other.into()])
    }

    pub fn invert(self) -> Sym {
        Sym::Unary(UnaryOp::Invert, Box::new(self))
    }

    pub fn floor_div(self, other: impl Into<Sym>) -> Sym {
        Sym::Binary(BinaryOp::FloorDiv, Box::new(self), Box::new(other.into()))
    }

    pub fn pow(self, other: impl Into<Sym>) -> Sym {
        Sym::Binary(BinaryOp::Pow, Box::new(self), Box::new(other.into()))
    }

    pub fn index(self, i: usize) -> Sym {
        Sym::Index(Box::new(self), i)
    }
}

impl From<SpecValue> for Sym {
    fn from(value: SpecValue) -> Self {
        match value {
            SpecValue::Bool(b) => Sym::Bool(b),
            SpecValue::Real(v) => Sym::Const(v),
            SpecValue::Infinite { negative } => {
                let inf = Sym::Call(arith::INFINITY.to_string(), vec![]);
                if negative { -inf } else { inf }
            }
            SpecValue::NaN => Sym::Call(arith::NAN.to_string(), vec![]),
            SpecValue::Tuple(items) => Sym::Tuple(items.into_iter().map(Sym::from).collect()),
        }
    }
}

impl From<&SpecValue> for Sym {
    fn from(value: &SpecValue) -> Self {
        Sym::from(value.clone())
    }
}

impl From<BigDecimal> for Sym {
    fn from(value: BigDecimal) -> Self {
        Sym::Const(value)
    }
}

impl From<i64> for Sym {
    fn from(value: i64) -> Self {
        Sym::Const(BigDecimal::from(value))
    }
}

impl From<i32> for Sym {
    fn from(value: i32) -> Self {
        Sym::Const(BigDecimal::from(value))
    }
}

impl From<bool> for Sym {
    fn from(value: bool) -> Self {
        Sym::Bool(value)
    }
}

macro_rules! sym_binary_op {
    ($trait:ident, $method:ident, $op:ident) => {
        impl<R: Into<Sym>> std::ops::$trait<R> for Sym {
            type Output = Sym;

            fn $method(self, rhs: R) -> Sym {
                Sym::Binary(BinaryOp::$op, Box::new(self), Box::new(rhs.into()))
            }
        }
    };
}

sym_binary_op! { Add, add, Add }
sym_binary_op! { Sub, sub, Sub }
sym_binary_op! { Mul, mul, Mul }
sym_binary_op! { Div, div, Div }
sym_binary_op! { Shl, shl, Shl }
sym_binary_op! { Shr, shr, Shr }
sym_binary_op! { BitAnd, bitand, BitAnd }
sym_binary_op! { BitOr, bitor, BitOr }
sym_binary_op! { BitXor, bitxor, BitXor }

impl std::ops::Neg for Sym {
    type Output = Sym;

    fn neg(self) -> Sym {
        Sym::Unary(UnaryOp::Neg, Box::new(self))
    }
}

/// Logical negation. Use [`Sym::invert`] for the bitwise complement.
impl std::ops::Not for Sym {
    type Output = Sym;

    fn not(self) -> Sym {
        Sym::Not(Box::new(self))
    }
}
