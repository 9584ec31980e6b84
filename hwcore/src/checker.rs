//! Configured entry point combining evaluation and verification.
use std::collections::HashSet;

use hwir::{Assertions, Node, NodeId, Session, value::Value};
use log::{debug, warn};

use crate::formal::{self, Proof};
use crate::utils::conf::CheckConfig;
use crate::utils::error::HwResult;

/// Outcome of verifying one composite.
#[derive(Debug)]
pub struct Report {
    pub node: Node,
    pub outcome: HwResult<Proof>,
}

impl Report {
    pub fn is_proved(&self) -> bool {
        self.outcome.is_ok()
    }
}

#[derive(Debug, Clone, Default)]
pub struct Checker {
    config: CheckConfig,
    assertions: Assertions,
}

impl Checker {
    pub fn new(config: CheckConfig) -> Self {
        Self {
            config,
            assertions: Assertions::default(),
        }
    }

    /// Run `assertions` in every session of this checker.
    pub fn with_assertions(mut self, assertions: Assertions) -> Self {
        self.assertions = assertions;
        self
    }

    pub fn config(&self) -> &CheckConfig {
        &self.config
    }

    /// Fresh evaluation session with the configured checks.
    pub fn session(&self) -> Session {
        Session::new(self.config.eval_options()).with_assertions(self.assertions.clone())
    }

    /// Evaluate `node` in a fresh session.
    pub fn evaluate(&self, node: &Node) -> HwResult<Value> {
        Ok(self.session().evaluate(node)?)
    }

    /// Prove `node` equivalent to its spec; `None` when symbolic verification is
    /// disabled.
    pub fn verify(&self, node: &Node) -> HwResult<Option<Proof>> {
        if !self.config.symbolic_verification {
            debug!("symbolic verification disabled, skipping `{}`", node.name());
            return Ok(None);
        }
        formal::verify(node).map(Some)
    }

    /// Verify every Composite reachable from `root`, including those nested in
    /// implementation trees, in post-order. Excluded nodes are skipped.
    pub fn verify_tree(&self, root: &Node) -> Vec<Report> {
        if !self.config.symbolic_verification {
            return Vec::new();
        }

        let mut seen: HashSet<NodeId> = HashSet::new();
        let mut composites = Vec::new();
        collect_composites(root, &mut seen, &mut composites);

        composites
            .into_iter()
            .filter(|node| match self.config.exclusion(node.name()) {
                Some(reason) => {
                    warn!("not verifying excluded `{}`: {}", node.name(), reason);
                    false
                }
                None => true,
            })
            .map(|node| {
                let outcome = formal::verify(&node);
                Report { node, outcome }
            })
            .collect()
    }
}

fn collect_composites(node: &Node, seen: &mut HashSet<NodeId>, out: &mut Vec<Node>) {
    if !seen.insert(node.id()) {
        return;
    }
    for arg in node.args() {
        collect_composites(arg, seen, out);
    }
    if let Some(mc) = node.microcode() {
        collect_composites(mc.root(), seen, out);
    }
    if node.kind().is_composite() {
        out.push(node.clone());
    }
}
