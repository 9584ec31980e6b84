//! Spec relations: the declared behavior of a primitive or composite node.
//!
//! A relation is a small straight-line program over symbolic expressions. It names its
//! formal parameters and its output, may capture constants fixed when the node was
//! built, binds locals with `let`, branches with `if` on conditions that must become
//! concrete once the inputs are known, and ends in a boolean relation between the
//! inputs and the output.
//!
//! ```
//! use hwformal::prelude::*;
//!
//! let spec = SpecRelation::builder(["x", "y"], "out").relation(var("out").equals(var("x") + var("y")));
//! let solved = spec.solve(&[var("a"), cst(1)], "sum").unwrap();
//! assert_eq!(solved, var("a") + cst(1));
//! ```
use std::collections::HashMap;
use std::fmt;

use log::trace;

use crate::error::{Error, Result};
use crate::expr::{LogicOp, Sym, arith};
use crate::value::SpecValue;

/// A statement executed before the relation is interpreted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stmt {
    /// `let name = expr`; later statements and the relation see `name`.
    Let(String, Sym),
    /// Branch on a condition that must reduce to a boolean literal.
    If {
        cond: Sym,
        then_body: Vec<Stmt>,
        else_body: Vec<Stmt>,
    },
}

impl Stmt {
    pub fn bind(name: impl Into<String>, expr: Sym) -> Self {
        Stmt::Let(name.into(), expr)
    }

    pub fn branch(cond: Sym, then_body: Vec<Stmt>, else_body: Vec<Stmt>) -> Self {
        Stmt::If {
            cond,
            then_body,
            else_body,
        }
    }
}

/// Declared behavior of a node, see the module documentation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpecRelation {
    params: Vec<String>,
    output: String,
    captures: Vec<(String, Sym)>,
    body: Vec<Stmt>,
    relation: Sym,
}

/// Incremental construction of a [`SpecRelation`].
#[derive(Debug, Clone)]
pub struct SpecBuilder {
    params: Vec<String>,
    output: String,
    captures: Vec<(String, Sym)>,
    body: Vec<Stmt>,
}

impl SpecBuilder {
    /// Make a value fixed at construction time visible under `name`.
    pub fn capture(mut self, name: impl Into<String>, value: impl Into<Sym>) -> Self {
        self.captures.push((name.into(), value.into()));
        self
    }

    pub fn bind(mut self, name: impl Into<String>, expr: Sym) -> Self {
        self.body.push(Stmt::bind(name, expr));
        self
    }

    pub fn branch(mut self, cond: Sym, then_body: Vec<Stmt>, else_body: Vec<Stmt>) -> Self {
        self.body.push(Stmt::branch(cond, then_body, else_body));
        self
    }

    /// Finish with the boolean relation between inputs and output.
    pub fn relation(self, relation: Sym) -> SpecRelation {
        SpecRelation {
            params: self.params,
            output: self.output,
            captures: self.captures,
            body: self.body,
            relation,
        }
    }
}

/// Name lookup while interpreting a relation: locals, then parameters, then the
/// output, then captured values.
struct Scope<'a> {
    spec: &'a SpecRelation,
    inputs: &'a [Sym],
    output: &'a Sym,
    locals: HashMap<String, Sym>,
}

impl Scope<'_> {
    fn lookup(&self, name: &str) -> Result<Sym> {
        if let Some(v) = self.locals.get(name) {
            return Ok(v.clone());
        }
        if let Some(i) = self.spec.params.iter().position(|p| p == name) {
            return Ok(self.inputs[i].clone());
        }
        if name == self.spec.output {
            return Ok(self.output.clone());
        }
        if let Some((_, v)) = self.spec.captures.iter().find(|(n, _)| n == name) {
            return Ok(v.clone());
        }
        Err(Error::UnresolvedName {
            name: name.to_string(),
        })
    }

    /// Substitute every name of `expr` in a single pass.
    fn resolve(&self, expr: &Sym) -> Result<Sym> {
        check_calls(expr)?;
        expr.substitute(&mut |name| self.lookup(name).map(Some))
    }

    fn run(&mut self, body: &[Stmt]) -> Result<()> {
        for stmt in body {
            match stmt {
                Stmt::Let(name, expr) => {
                    let value = self.resolve(expr)?.simplify();
                    self.locals.insert(name.clone(), value);
                }
                Stmt::If {
                    cond,
                    then_body,
                    else_body,
                } => match self.resolve(cond)?.simplify() {
                    Sym::Bool(true) => self.run(then_body)?,
                    Sym::Bool(false) => self.run(else_body)?,
                    residual => {
                        return Err(Error::UnsupportedConstruct {
                            reason: format!("branch on symbolic condition `{}`", residual),
                        });
                    }
                },
            }
        }
        Ok(())
    }
}

/// Only builtins and the special-value markers may be called from a relation.
fn check_calls(expr: &Sym) -> Result<()> {
    if let Sym::Call(name, args) = expr {
        let special = args.is_empty() && (name == arith::INFINITY || name == arith::NAN);
        if !special && !arith::is_builtin(name) {
            return Err(Error::UnsupportedConstruct {
                reason: format!("call to `{}`, which is not a pure builtin", name),
            });
        }
    }
    expr.children().into_iter().try_for_each(check_calls)
}

impl SpecRelation {
    pub fn builder<I, S>(params: I, output: impl Into<String>) -> SpecBuilder
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        SpecBuilder {
            params: params.into_iter().map(Into::into).collect(),
            output: output.into(),
            captures: vec![],
            body: vec![],
        }
    }

    pub fn params(&self) -> &[String] {
        &self.params
    }

    #[inline]
    pub fn arity(&self) -> usize {
        self.params.len()
    }

    pub fn output(&self) -> &str {
        &self.output
    }

    pub fn captures(&self) -> &[(String, Sym)] {
        &self.captures
    }

    pub fn body(&self) -> &[Stmt] {
        &self.body
    }

    pub fn relation(&self) -> &Sym {
        &self.relation
    }

    /// Interpret the relation with `inputs` bound to the parameters and `output` bound
    /// to the output name. The returned relation is not simplified.
    ///
    /// Substitution is single pass: names occurring inside `inputs` or `output` are
    /// never looked up again, so callers may use any naming scheme for them.
    pub fn instantiate(&self, inputs: &[Sym], output: &Sym) -> Result<Sym> {
        if inputs.len() != self.params.len() {
            return Err(Error::ArityMismatch {
                expected: self.params.len(),
                found: inputs.len(),
            });
        }
        let mut scope = Scope {
            spec: self,
            inputs,
            output,
            locals: HashMap::new(),
        };
        scope.run(&self.body)?;
        scope.resolve(&self.relation)
    }

    /// Isolate the output: returns the expression `e` such that the relation states
    /// `output == e`, with the output bound to the fresh variable `output_var`.
    ///
    /// Two shapes are recognized after simplification: a direct equality with the
    /// output alone on one side, and a conjunction of one equality per tuple slot
    /// `output[i] == e_i`. Anything else is [`Error::NotClosedForm`].
    pub fn solve(&self, inputs: &[Sym], output_var: &str) -> Result<Sym> {
        let out = Sym::Var(output_var.to_string());
        let relation = self.instantiate(inputs, &out)?.simplify();
        trace!("solving `{}` for `{}`", relation, output_var);
        isolate(&relation, output_var)
            .map(|e| e.simplify())
            .ok_or_else(|| Error::NotClosedForm {
                output: output_var.to_string(),
                residual: relation,
            })
    }

    /// Value the relation prescribes for the given concrete inputs.
    pub fn evaluate(&self, inputs: &[SpecValue]) -> Result<SpecValue> {
        let inputs: Vec<Sym> = inputs.iter().map(Sym::from).collect();
        let solved = self.solve(&inputs, &self.output)?;
        solved.to_spec_value().ok_or_else(|| Error::NotClosedForm {
            output: self.output.clone(),
            residual: solved,
        })
    }

    /// Relation with concrete inputs and output, simplified. `true` means satisfied.
    pub fn check(&self, inputs: &[SpecValue], output: &SpecValue) -> Result<Sym> {
        let inputs: Vec<Sym> = inputs.iter().map(Sym::from).collect();
        Ok(self.instantiate(&inputs, &Sym::from(output))?.simplify())
    }
}

fn isolate(relation: &Sym, out: &str) -> Option<Sym> {
    match relation {
        Sym::Eq(..) => isolate_eq(relation, out),
        Sym::Logic(LogicOp::And, items) => {
            let mut slots: Vec<Option<Sym>> = vec![];
            for item in items {
                let (i, e) = tuple_slot(item, out)?;
                if slots.len() <= i {
                    slots.resize(i + 1, None);
                }
                match &slots[i] {
                    Some(prev) if *prev != e => return None,
                    _ => slots[i] = Some(e),
                }
            }
            // Every slot must be pinned down.
            slots.into_iter().collect::<Option<Vec<_>>>().map(Sym::Tuple)
        }
        _ => None,
    }
}

fn tuple_slot(item: &Sym, out: &str) -> Option<(usize, Sym)> {
    let Sym::Eq(a, b) = item else {
        return None;
    };
    let slot = |s: &Sym| match s {
        Sym::Index(base, i) if matches!(&**base, Sym::Var(v) if v == out) => Some(*i),
        _ => None,
    };
    match (slot(a), slot(b)) {
        (Some(i), _) if !b.mentions(out) => Some((i, (**b).clone())),
        (_, Some(i)) if !a.mentions(out) => Some((i, (**a).clone())),
        _ => None,
    }
}

fn isolate_eq(relation: &Sym, out: &str) -> Option<Sym> {
    let Sym::Eq(a, b) = relation else {
        return None;
    };
    let is_out = |s: &Sym| matches!(s, Sym::Var(v) if v == out);
    if is_out(a) && !b.mentions(out) {
        Some((**b).clone())
    } else if is_out(b) && !a.mentions(out) {
        Some((**a).clone())
    } else {
        None
    }
}

impl fmt::Display for Stmt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stmt::Let(name, expr) => write!(f, "let {} = {}", name, expr),
            Stmt::If {
                cond,
                then_body,
                else_body,
            } => {
                let block = |body: &[Stmt]| body.iter().map(|s| s.to_string()).collect::<Vec<_>>().join("; ");
                write!(f, "if {} {{ {} }} else {{ {} }}", cond, block(then_body), block(else_body))
            }
        }
    }
}

impl fmt::Display for SpecRelation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "spec({}) -> {}:", self.params.join(", "), self.output)?;
        for stmt in &self.body {
            write!(f, " {};", stmt)?;
        }
        write!(f, " {}", self.relation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expr::func::*;

    #[test]
    fn lookup_prefers_locals_then_params() {
        let spec = SpecRelation::builder(["x"], "out")
            .capture("k", 10i64)
            .bind("y", var("x") + var("k"))
            .relation(var("out").equals(var("y")));
        assert_eq!(spec.solve(&[cst(1)], "o").unwrap(), cst(11));
        assert_eq!(spec.solve(&[var("a")], "o").unwrap(), var("a") + cst(10));
    }

    #[test]
    fn arity_is_checked() {
        let spec = SpecRelation::builder(["x", "y"], "out").relation(var("out").equals(var("x")));
        assert_eq!(
            spec.instantiate(&[cst(1)], &var("o")),
            Err(Error::ArityMismatch { expected: 2, found: 1 })
        );
    }

    #[test]
    fn display_lists_statements() {
        let spec = SpecRelation::builder(["x"], "out")
            .bind("t", var("x") * cst(2))
            .relation(var("out").equals(var("t")));
        assert_eq!(spec.to_string(), "spec(x) -> out: let t = x * 2.0; out == t");
    }
}
