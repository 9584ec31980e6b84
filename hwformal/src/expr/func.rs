//! Free-function builders for [`Sym`].
use bigdecimal::BigDecimal;

use crate::expr::{LogicOp, Sym};

/// A free variable.
#[inline]
pub fn var(name: impl Into<String>) -> Sym {
    Sym::Var(name.into())
}

/// A real constant.
#[inline]
pub fn cst(value: impl Into<BigDecimal>) -> Sym {
    Sym::Const(value.into())
}

/// A boolean literal.
#[inline]
pub fn boolean(value: bool) -> Sym {
    Sym::Bool(value)
}

#[inline]
pub fn tuple(items: impl IntoIterator<Item = Sym>) -> Sym {
    Sym::Tuple(items.into_iter().collect())
}

#[inline]
pub fn call(name: impl Into<String>, args: impl IntoIterator<Item = Sym>) -> Sym {
    Sym::Call(name.into(), args.into_iter().collect())
}

/// Conditional expression `if cond then a else b`.
#[inline]
pub fn ite(cond: Sym, then_branch: Sym, else_branch: Sym) -> Sym {
    Sym::If(Box::new(cond), Box::new(then_branch), Box::new(else_branch))
}

#[inline]
pub fn equals(lhs: impl Into<Sym>, rhs: impl Into<Sym>) -> Sym {
    Sym::Eq(Box::new(lhs.into()), Box::new(rhs.into()))
}

pub fn and(items: impl IntoIterator<Item = Sym>) -> Sym {
    Sym::Logic(LogicOp::And, items.into_iter().collect())
}

pub fn or(items: impl IntoIterator<Item = Sym>) -> Sym {
    Sym::Logic(LogicOp::Or, items.into_iter().collect())
}

#[inline]
pub fn not(inner: Sym) -> Sym {
    Sym::Not(Box::new(inner))
}
