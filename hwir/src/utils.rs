use hwformal::expr::Sym;
use hwformal::value::SpecValue;
use strum::{EnumIs, EnumTryAs, IntoStaticStr};
use thiserror::Error;

use crate::types::TypeDesc;

#[derive(Debug, Clone, PartialEq, Eq, EnumIs, EnumTryAs, Error)]
pub enum Error {
    /// Fixed-point widths violate `int_bits + frac_bits >= 1` or the width limit.
    #[error(
        "Invalid fixed-point type with {int_bits} integer bits and {frac_bits} fractional bits. A fixed-point type needs at least one bit and at most {max} bits in total."
    )]
    InvalidFixedType {
        int_bits: u32,
        frac_bits: u32,
        max: u32,
    },

    /// A signature rejected the types of the arguments of a node.
    #[error("Node `{node}` cannot be built from its arguments: {reason}")]
    Signature { node: String, reason: String },

    /// Wrong number of arguments for a node.
    #[error("Node `{node}` expects {expected} arguments, got {found}.")]
    ArityMismatch {
        node: String,
        expected: String,
        found: usize,
    },

    /// A raw encoding does not fit in the bit width of its type.
    #[error("Raw encoding {raw} does not fit in type `{ty}`.")]
    ValueOutOfRange { ty: TypeDesc, raw: String },

    /// Tuple projection out of range (static or dynamic).
    #[error("Index {index} is out of range for a tuple of {len} elements.")]
    IndexOutOfRange { index: usize, len: usize },

    /// `check()` was given an assertion that cannot fail.
    #[error("Assertion `{assertion}` attached to `{node}` is rejected: {reason}")]
    TrivialAssertion {
        node: String,
        assertion: String,
        reason: String,
    },

    /// Only variables can be bound.
    #[error("Node `{node}` is not a variable and cannot be bound.")]
    NotAVariable { node: String },

    /// A variable was reached by evaluation before being bound.
    #[error("Variable `{name}` was evaluated before being bound.")]
    UnboundVariable { name: String },

    /// A value's type disagrees with the type recorded at construction.
    #[error(
        "Node `{node}` carries a value of type `{found}` but its recorded type is `{expected}`. This is an implementation bug."
    )]
    TypeMismatch {
        node: String,
        expected: TypeDesc,
        found: TypeDesc,
    },

    /// An attached assertion evaluated to false.
    #[error("Assertion `{assertion}` attached to `{node}` failed.")]
    AssertionFailure { node: String, assertion: String },

    /// The implementation and the closed-form spec disagree on concrete values.
    #[error(
        "Spec mismatch in `{node}`: the implementation produced {implementation} but the specification requires {specification}."
    )]
    SpecMismatch {
        node: String,
        implementation: SpecValue,
        specification: SpecValue,
    },

    /// The implementation output does not satisfy a spec that is not in closed form.
    #[error("Output {output} of `{node}` violates its specification; the relation reduced to `{residual}`.")]
    SpecViolated {
        node: String,
        output: SpecValue,
        residual: Sym,
    },

    /// Interpreting a spec relation failed.
    #[error(transparent)]
    Spec(#[from] hwformal::Error),

    /// An operator implementation was handed values it cannot process.
    #[error("Implementation of `{node}` failed: {reason}")]
    Implementation { node: String, reason: String },

    /// An idealized value cannot be encoded exactly in a type.
    #[error("Cannot encode {value} as `{ty}`: {reason}")]
    Encoding {
        ty: TypeDesc,
        value: SpecValue,
        reason: String,
    },
}

/// Coarse classification of [`Error`], one row per failure category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, EnumIs, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    /// Illegal type parameters or signature contract violated at build time.
    Construction,
    UnboundVariable,
    TypeMismatch,
    AssertionFailure,
    SpecMismatch,
    /// Value or index out of range, or an inexact encoding.
    Range,
    /// An operator implementation rejected its inputs.
    Implementation,
    /// A spec relation could not be reduced to a closed form or a verdict.
    VerificationInconclusive,
    /// A spec relation uses a construct the interpreter refuses to approximate.
    UnsupportedConstruct,
}

impl ErrorKind {
    /// Failures an outer per-vector harness may catch and continue from.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, ErrorKind::AssertionFailure | ErrorKind::SpecMismatch)
    }
}

impl Error {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Error::InvalidFixedType { .. }
            | Error::Signature { .. }
            | Error::ArityMismatch { .. }
            | Error::TrivialAssertion { .. }
            | Error::NotAVariable { .. } => ErrorKind::Construction,
            Error::ValueOutOfRange { .. } | Error::IndexOutOfRange { .. } | Error::Encoding { .. } => {
                ErrorKind::Range
            }
            Error::UnboundVariable { .. } => ErrorKind::UnboundVariable,
            Error::TypeMismatch { .. } => ErrorKind::TypeMismatch,
            Error::AssertionFailure { .. } => ErrorKind::AssertionFailure,
            Error::SpecMismatch { .. } | Error::SpecViolated { .. } => ErrorKind::SpecMismatch,
            Error::Implementation { .. } => ErrorKind::Implementation,
            Error::Spec(inner) => spec_error_kind(inner),
        }
    }

    #[inline]
    pub fn is_recoverable(&self) -> bool {
        self.kind().is_recoverable()
    }

    /// Signature failure raised from inside a derive function; the node name is
    /// filled in by [`crate::signature::Signature::apply`].
    pub fn signature(reason: impl Into<String>) -> Self {
        Error::Signature {
            node: String::new(),
            reason: reason.into(),
        }
    }

    /// Failure raised from inside an operator implementation; the evaluator fills
    /// in the node name.
    pub fn implementation(reason: impl Into<String>) -> Self {
        Error::Implementation {
            node: String::new(),
            reason: reason.into(),
        }
    }

    /// Attach `node` to errors raised without one.
    pub(crate) fn at_node(self, node: &str) -> Self {
        match self {
            Error::Signature { node: n, reason } if n.is_empty() => Error::Signature {
                node: node.to_string(),
                reason,
            },
            Error::Implementation { node: n, reason } if n.is_empty() => Error::Implementation {
                node: node.to_string(),
                reason,
            },
            other => other,
        }
    }
}

/// Classification of spec interpretation failures.
pub fn spec_error_kind(error: &hwformal::Error) -> ErrorKind {
    match error {
        hwformal::Error::UnresolvedName { .. } | hwformal::Error::ArityMismatch { .. } => ErrorKind::Construction,
        hwformal::Error::UnsupportedConstruct { .. } => ErrorKind::UnsupportedConstruct,
        hwformal::Error::NotClosedForm { .. } => ErrorKind::VerificationInconclusive,
    }
}

pub type Result<T> = std::result::Result<T, Error>;
