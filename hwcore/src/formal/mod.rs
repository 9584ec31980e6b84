//! Symbolic equivalence verification.
//!
//! The verifier proves that the declared spec of a Primitive or Composite follows from
//! the declared specs of the nodes its implementation tree is made of, without
//! evaluating a single concrete vector:
//!
//! 1. every argument becomes a symbolic variable named after the spec parameter
//!    (or a constant, when the argument was folded);
//! 2. the implementation tree is rendered bottom-up. Operators use their symbolic
//!    rendering, nested Primitives/Composites are replaced by their spec solved for
//!    a fresh output symbol;
//! 3. the node's own spec is instantiated with that rendering as output and simplified.
//!
//! The proof holds only when step 3 reduces to `true`. Anything else is reported with
//! the residual relation.
use std::collections::HashMap;

use hwformal::expr::Sym;
use hwir::{Node, NodeId, NodeKind};
use log::{debug, info};

use crate::utils::error::{HwError, HwResult};

/// A successful equivalence proof.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Proof {
    pub node: String,
    /// Inputs the proof was carried out over.
    pub inputs: Vec<Sym>,
    /// Symbolic value of the implementation tree.
    pub implementation: Sym,
}

/// Prove that `node`'s implementation satisfies its declared spec for all inputs.
pub fn verify(node: &Node) -> HwResult<Proof> {
    let microcode = node.microcode().ok_or_else(|| HwError::NotSpecified {
        node: node.name().to_string(),
        kind: node.kind().name(),
    })?;
    let spec = microcode.spec();

    let inputs: Vec<Sym> = spec
        .params()
        .iter()
        .zip(microcode.placeholders())
        .map(|(param, placeholder)| match placeholder.folded() {
            Some(value) => Sym::from(value.to_spec()),
            None => Sym::Var(param.clone()),
        })
        .collect();

    let mut walker = Walker::default();
    for (placeholder, input) in microcode.placeholders().iter().zip(&inputs) {
        walker.memo.insert(placeholder.id(), input.clone());
    }
    let implementation = walker.render(microcode.root())?;
    debug!("`{}` implements {}", node.name(), implementation);

    let relation = spec
        .instantiate(&inputs, &implementation)
        .map_err(|e| HwError::from_spec(node.name(), e))?
        .simplify();

    if relation.is_true() {
        info!("proved `{}`: {}", node.name(), spec);
        Ok(Proof {
            node: node.name().to_string(),
            inputs,
            implementation,
        })
    } else {
        info!("could not prove `{}`: residual {}", node.name(), relation);
        Err(HwError::VerificationInconclusive {
            node: node.name().to_string(),
            residual: relation,
        })
    }
}

#[derive(Default)]
struct Walker {
    memo: HashMap<NodeId, Sym>,
}

impl Walker {
    fn render(&mut self, node: &Node) -> HwResult<Sym> {
        if let Some(sym) = self.memo.get(&node.id()) {
            return Ok(sym.clone());
        }

        let sym = match node.kind() {
            NodeKind::Constant(value) => Sym::from(value.to_spec()),
            // A free variable of the enclosing design.
            NodeKind::Variable(_) => Sym::Var(format!("{}{}", node.name(), node.id())),
            NodeKind::Operator { .. } => match node.folded() {
                Some(value) => Sym::from(value.to_spec()),
                None => {
                    let args = self.render_args(node)?;
                    node.symbolic(&args).simplify()
                }
            },
            NodeKind::Primitive(mc) | NodeKind::Composite(mc) => {
                let args = self.render_args(node)?;
                let output = format!("{}.out{}", node.name(), node.id());
                let solved = mc
                    .spec()
                    .solve(&args, &output)
                    .map_err(|e| HwError::from_spec(node.name(), e))?;
                debug!("solved `{}` as {}", node.name(), solved);
                solved
            }
        };

        self.memo.insert(node.id(), sym.clone());
        Ok(sym)
    }

    fn render_args(&mut self, node: &Node) -> HwResult<Vec<Sym>> {
        node.args().iter().map(|arg| self.render(arg)).collect()
    }
}
