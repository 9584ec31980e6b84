//! Hwcore: proving hwir designs correct.
//!
//! [`formal::verify`] proves a Primitive or Composite equivalent to its declared
//! spec symbolically. [`Checker`] bundles it with concrete evaluation under a
//! [`CheckConfig`], usually loaded from TOML.

pub mod checker;
pub mod formal;
#[cfg(any(test, feature = "test-utils"))]
pub mod tests_utils;
pub mod utils;

pub use checker::{Checker, Report};
pub use formal::{Proof, verify};
pub use utils::conf::CheckConfig;
pub use utils::error::{HwError, HwResult};
