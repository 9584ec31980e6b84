use strum::EnumIs;
use thiserror::Error;

use crate::expr::Sym;

/// Failures raised while interpreting or solving a spec relation.
#[derive(Debug, Clone, PartialEq, Eq, EnumIs, Error)]
pub enum Error {
    /// A name used inside a relation is neither a parameter, the output, a captured
    /// value nor a local binding.
    #[error(
        "Unresolved name `{name}` in spec relation. Names must be parameters, the output, captured values or local bindings."
    )]
    UnresolvedName { name: String },

    /// The relation uses a shape the interpreter refuses to approximate.
    #[error("Unsupported construct in spec relation: {reason}")]
    UnsupportedConstruct { reason: String },

    /// The relation could not be rearranged into `output == <expression>`.
    #[error("Spec relation is not in closed form for output `{output}`; residual relation: {residual}")]
    NotClosedForm { output: String, residual: Sym },

    /// The relation was instantiated with the wrong number of inputs.
    #[error("Spec relation expects {expected} inputs, got {found}.")]
    ArityMismatch { expected: usize, found: usize },
}

pub type Result<T> = std::result::Result<T, Error>;
