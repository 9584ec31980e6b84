//! Explicit signature descriptors.
//!
//! Each factory function declares the shape of the arguments it accepts and how the
//! output type derives from them. Signatures run once, at construction time, which is
//! the only place static typing contracts are enforced.
use std::fmt;
use std::sync::Arc;

use crate::types::TypeDesc;
use crate::utils::{Error, Result};

/// Constraint on a single argument type.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParamConstraint {
    Any,
    Boolean,
    /// Signed or unsigned fixed-point.
    Fixed,
    Signed,
    Unsigned,
    /// `f32` or `bf16`.
    Float,
    Tuple,
    Exact(TypeDesc),
}

impl ParamConstraint {
    pub fn accepts(&self, ty: &TypeDesc) -> bool {
        match self {
            ParamConstraint::Any => true,
            ParamConstraint::Boolean => ty.is_boolean(),
            ParamConstraint::Fixed => ty.as_fixed().is_some(),
            ParamConstraint::Signed => ty.is_signed_fixed(),
            ParamConstraint::Unsigned => ty.is_unsigned_fixed(),
            ParamConstraint::Float => ty.float_format().is_some(),
            ParamConstraint::Tuple => ty.is_tuple(),
            ParamConstraint::Exact(expected) => expected == ty,
        }
    }
}

impl fmt::Display for ParamConstraint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParamConstraint::Any => f.write_str("any type"),
            ParamConstraint::Boolean => f.write_str("a boolean"),
            ParamConstraint::Fixed => f.write_str("a fixed-point type"),
            ParamConstraint::Signed => f.write_str("a signed fixed-point type"),
            ParamConstraint::Unsigned => f.write_str("an unsigned fixed-point type"),
            ParamConstraint::Float => f.write_str("a float type"),
            ParamConstraint::Tuple => f.write_str("a tuple"),
            ParamConstraint::Exact(ty) => write!(f, "`{}`", ty),
        }
    }
}

pub type DeriveFn = Arc<dyn Fn(&[TypeDesc]) -> Result<TypeDesc> + Send + Sync>;

/// Ordered parameter constraints, an optional variadic tail and the output type
/// derivation.
#[derive(Clone)]
pub struct Signature {
    params: Vec<ParamConstraint>,
    rest: Option<ParamConstraint>,
    derive: DeriveFn,
}

impl Signature {
    pub fn new<F>(params: impl IntoIterator<Item = ParamConstraint>, derive: F) -> Self
    where
        F: Fn(&[TypeDesc]) -> Result<TypeDesc> + Send + Sync + 'static,
    {
        Self {
            params: params.into_iter().collect(),
            rest: None,
            derive: Arc::new(derive),
        }
    }

    /// Accept any number of extra arguments satisfying `constraint` after the fixed ones.
    pub fn variadic(mut self, constraint: ParamConstraint) -> Self {
        self.rest = Some(constraint);
        self
    }

    /// Nullary signature producing `ty`.
    pub fn nullary(ty: TypeDesc) -> Self {
        Self::new([], move |_| Ok(ty.clone()))
    }

    pub fn params(&self) -> &[ParamConstraint] {
        &self.params
    }

    pub fn is_variadic(&self) -> bool {
        self.rest.is_some()
    }

    /// Check `types` against the declared constraints and derive the output type.
    ///
    /// Every failure names `node`.
    pub fn apply(&self, node: &str, types: &[TypeDesc]) -> Result<TypeDesc> {
        let arity_ok = match self.rest {
            Some(_) => types.len() >= self.params.len(),
            None => types.len() == self.params.len(),
        };
        if !arity_ok {
            return Err(Error::ArityMismatch {
                node: node.to_string(),
                expected: match self.rest {
                    Some(_) => format!("at least {}", self.params.len()),
                    None => self.params.len().to_string(),
                },
                found: types.len(),
            });
        }

        for (i, ty) in types.iter().enumerate() {
            let Some(constraint) = self.params.get(i).or(self.rest.as_ref()) else {
                continue;
            };
            if !constraint.accepts(ty) {
                return Err(Error::Signature {
                    node: node.to_string(),
                    reason: format!("argument {} has type `{}` but {} is required", i, ty, constraint),
                });
            }
        }

        (self.derive)(types).map_err(|err| err.at_node(node))
    }
}

impl fmt::Debug for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Signature")
            .field("params", &self.params)
            .field("rest", &self.rest)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn same_type() -> Signature {
        Signature::new([ParamConstraint::Fixed, ParamConstraint::Fixed], |types| {
            if types[0] != types[1] {
                return Err(Error::signature("operands must have the same type"));
            }
            Ok(types[0].clone())
        })
    }

    #[test]
    fn arity_is_checked() {
        let err = same_type().apply("xor", &[TypeDesc::Boolean]).unwrap_err();
        assert_eq!(
            err,
            Error::ArityMismatch {
                node: "xor".to_string(),
                expected: "2".to_string(),
                found: 1
            }
        );
    }

    #[test]
    fn constraints_are_checked_before_deriving() {
        let s = TypeDesc::signed(2, 2).unwrap();
        let err = same_type().apply("xor", &[s, TypeDesc::Float32]).unwrap_err();
        assert!(err.is_signature());
        assert!(err.to_string().contains("argument 1 has type `f32`"));
    }

    #[test]
    fn derive_errors_name_the_node() {
        let a = TypeDesc::signed(2, 2).unwrap();
        let b = TypeDesc::signed(3, 2).unwrap();
        match same_type().apply("xor", &[a, b]) {
            Err(Error::Signature { node, .. }) => assert_eq!(node, "xor"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn variadic_tail() {
        let sig = Signature::new([ParamConstraint::Boolean], |types| Ok(TypeDesc::tuple(types.to_vec())))
            .variadic(ParamConstraint::Any);
        let out = sig
            .apply("pack", &[TypeDesc::Boolean, TypeDesc::Float32, TypeDesc::BFloat16])
            .unwrap();
        assert_eq!(out.to_string(), "(bool, f32, bf16)");

        let err = sig.apply("pack", &[]).unwrap_err();
        assert!(err.to_string().contains("at least 1"));
    }
}
