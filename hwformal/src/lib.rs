//! Hwformal: the symbolic side of hardware arithmetic verification.
//!
//! This crate knows nothing about bits. It provides
//!  - [`value::SpecValue`], the idealized values a datapath is supposed to compute
//!    (exact reals, booleans, IEEE special values and tuples),
//!  - [`expr::Sym`], a small expression language with an exact, conservative
//!    simplifier,
//!  - [`spec::SpecRelation`], the declared behavior of a node, which can be solved for
//!    its output symbolically or evaluated on concrete inputs.
//!
//! Example
//! ```
//! use hwformal::prelude::*;
//!
//! // out == x + y, solved with symbolic inputs
//! let spec = SpecRelation::builder(["x", "y"], "out").relation(var("out").equals(var("x") + var("y")));
//! let sum = spec.solve(&[var("a"), var("b")], "s").unwrap();
//! assert!(spec.instantiate(&[var("b"), var("a")], &sum).unwrap().simplify().is_true());
//!
//! // and with concrete ones
//! let v = spec.evaluate(&[SpecValue::from(1.5), SpecValue::from(2.25)]).unwrap();
//! assert_eq!(v.to_string(), "3.75");
//! ```

/// Error type for spec interpretation and solving.
pub mod error;
/// Symbolic expressions, builders, simplification and pretty printing.
pub mod expr;
/// Spec relations and their interpretation.
pub mod spec;
/// Idealized values and exact numeric helpers.
pub mod value;

pub use error::{Error, Result};

pub mod prelude {
    //! Convenient re-exports for end users.
    pub use crate::error::{Error, Result};
    pub use crate::expr::func::*;
    pub use crate::expr::{BinaryOp, CmpOp, LogicOp, Sym, UnaryOp};
    pub use crate::spec::{SpecBuilder, SpecRelation, Stmt};
    pub use crate::value::SpecValue;
}
