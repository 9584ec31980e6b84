//! Hwir: a typed IR for bit-exact hardware arithmetic.
//!
//! Every computational node carries a bit-exact implementation and, for primitives
//! and composites, the idealized relation it is supposed to satisfy. Evaluating a
//! tree checks both against each other on concrete inputs; the verifier in `hwcore`
//! proves them equivalent symbolically.
//!
//! Example
//! ```
//! use hwir::prelude::*;
//! use hwformal::value::SpecValue;
//!
//! let q22 = TypeDesc::signed(2, 2).unwrap();
//! let q32 = TypeDesc::signed(3, 2).unwrap();
//! let a = Node::constant(Value::encode(&q22, &SpecValue::from(1.5)).unwrap());
//! let b = Node::variable("b", q32.clone());
//! let sum = library::add(&a, &b).unwrap();
//! assert_eq!(sum.node_type().to_string(), "sfix<4.2>");
//!
//! b.bind(Value::encode(&q32, &SpecValue::from(2.25)).unwrap()).unwrap();
//! assert_eq!(sum.evaluate().unwrap().to_spec(), SpecValue::from(3.75));
//! ```

pub mod library;
pub mod node;
pub mod ops;
pub mod signature;
pub mod types;
pub mod utils;
pub mod value;

pub use node::{Assertions, EvalOptions, EvalStats, Microcode, Node, NodeId, NodeKind, Session};
pub use utils::{Error, ErrorKind, Result};

pub mod prelude {
    //! Convenient re-exports for design authors.
    pub use crate::library;
    pub use crate::node::{Assertions, EvalOptions, Node, NodeKind, Session};
    pub use crate::ops;
    pub use crate::signature::{ParamConstraint, Signature};
    pub use crate::types::{FixedType, FloatFormat, TypeDesc};
    pub use crate::utils::{Error, ErrorKind, Result};
    pub use crate::value::Value;
}
