//! Invariants guarding nodes.
//!
//! An assertion usually mentions the node it guards (a carry-save adder checked
//! against a plain addition of its own inputs), so assertions are not stored in
//! the node. [`Assertions`] keys them by host id, which keeps the node graph acyclic
//! and lets every handle be freed once the table is dropped.
use std::collections::HashMap;

use crate::node::{Node, NodeId};
use crate::utils::{Error, Result};

#[derive(Debug, Clone, Default)]
pub struct Assertions {
    by_host: HashMap<NodeId, Vec<Node>>,
}

impl Assertions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach `assertion` to `host`. It is evaluated in every session that computes
    /// `host` and must produce `true`.
    pub fn check(&mut self, host: &Node, assertion: Node) -> Result<()> {
        if assertion.args().is_empty() {
            return Err(Error::TrivialAssertion {
                node: host.name().to_string(),
                assertion: assertion.name().to_string(),
                reason: "an assertion needs at least one argument".to_string(),
            });
        }
        if !assertion.node_type().is_boolean() {
            return Err(Error::TrivialAssertion {
                node: host.name().to_string(),
                assertion: assertion.name().to_string(),
                reason: format!("an assertion must produce `bool`, not `{}`", assertion.node_type()),
            });
        }
        self.by_host.entry(host.id()).or_default().push(assertion);
        Ok(())
    }

    /// Assertions attached to `host`.
    pub fn of(&self, host: &Node) -> &[Node] {
        self.by_host.get(&host.id()).map_or(&[], Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.by_host.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.by_host.is_empty()
    }
}
