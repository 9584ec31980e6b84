//! Evaluation sessions.
//!
//! A [`Session`] owns the memoization cache of one top-level evaluation and the
//! placeholder bindings of every Primitive/Composite it unwinds. Both are reset when
//! the next top-level call starts. Nothing in the tree is mutated, so several
//! sessions may walk the same tree at once.
//!
//! Assertions run once the requested roots are computed, so an assertion that reads
//! a node still being computed finds it in the cache instead of recomputing it.
use std::collections::HashMap;

use hwformal::value::SpecValue;
use log::{trace, warn};

use crate::node::{Assertions, Microcode, Node, NodeId, NodeKind};
use crate::utils::{Error, Result};
use crate::value::Value;

/// Which consistency checks an evaluation performs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EvalOptions {
    /// Compare every Primitive/Composite against its declared spec.
    pub check_specs: bool,
    /// Run `check()` assertions.
    pub check_assertions: bool,
    /// Nodes (by name) whose spec mismatches are tolerated, with the reason.
    pub spec_exclusions: HashMap<String, String>,
}

impl Default for EvalOptions {
    fn default() -> Self {
        Self {
            check_specs: true,
            check_assertions: true,
            spec_exclusions: HashMap::new(),
        }
    }
}

impl EvalOptions {
    /// Options with both check paths disabled.
    pub fn unchecked() -> Self {
        Self {
            check_specs: false,
            check_assertions: false,
            spec_exclusions: HashMap::new(),
        }
    }

    pub fn exclude(mut self, node: impl Into<String>, reason: impl Into<String>) -> Self {
        self.spec_exclusions.insert(node.into(), reason.into());
        self
    }
}

/// Counters accumulated over every call on a session.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EvalStats {
    /// Distinct nodes computed.
    pub evaluated: usize,
    pub cache_hits: usize,
    /// Operator implementations and Primitive/Composite inner trees run.
    pub invocations: usize,
    pub spec_checks: usize,
    /// Spec mismatches tolerated by the exclusion list.
    pub excluded: usize,
}

#[derive(Debug, Default)]
pub struct Session {
    options: EvalOptions,
    assertions: Assertions,
    cache: HashMap<NodeId, Value>,
    bindings: HashMap<NodeId, Value>,
    /// Hosts computed in the current call whose assertions have yet to run.
    pending: Vec<Node>,
    stats: EvalStats,
}

impl Session {
    pub fn new(options: EvalOptions) -> Self {
        Self {
            options,
            ..Default::default()
        }
    }

    /// Check `assertions` whenever their hosts are computed.
    pub fn with_assertions(mut self, assertions: Assertions) -> Self {
        self.assertions = assertions;
        self
    }

    pub fn options(&self) -> &EvalOptions {
        &self.options
    }

    pub fn stats(&self) -> &EvalStats {
        &self.stats
    }

    /// Evaluate `node`, computing each node reachable from it at most once. Values
    /// from earlier calls are never reused, so rebinding a variable between two calls
    /// is always observed.
    pub fn evaluate(&mut self, node: &Node) -> Result<Value> {
        self.begin();
        let value = self.evaluate_node(node)?;
        self.finish()?;
        Ok(value)
    }

    /// Evaluate several roots in one call, sharing the cache between them.
    pub fn evaluate_many(&mut self, nodes: &[Node]) -> Result<Vec<Value>> {
        self.begin();
        let values = nodes
            .iter()
            .map(|node| self.evaluate_node(node))
            .collect::<Result<Vec<_>>>()?;
        self.finish()?;
        Ok(values)
    }

    fn begin(&mut self) {
        self.cache.clear();
        self.bindings.clear();
        self.pending.clear();
    }

    /// Run the assertions of every host computed in this call, including hosts first
    /// computed by an assertion.
    fn finish(&mut self) -> Result<()> {
        if !self.options.check_assertions {
            return Ok(());
        }
        let mut next = 0;
        while let Some(host) = self.pending.get(next).cloned() {
            next += 1;
            for assertion in self.assertions.of(&host).to_vec() {
                let verdict = self.evaluate_node(&assertion)?;
                if verdict.as_bool() != Some(true) {
                    return Err(Error::AssertionFailure {
                        node: host.name().to_string(),
                        assertion: assertion.name().to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Returns a copy of the cached value.
    fn evaluate_node(&mut self, node: &Node) -> Result<Value> {
        if let Some(value) = self.cache.get(&node.id()) {
            trace!("cache hit for `{}`{}", node.name(), node.id());
            self.stats.cache_hits += 1;
            return Ok(value.copy());
        }
        trace!("cache miss for `{}`{}", node.name(), node.id());

        let value = self.compute(node)?;
        self.cache.insert(node.id(), value.copy());
        self.stats.evaluated += 1;

        if !self.assertions.of(node).is_empty() {
            self.pending.push(node.clone());
        }
        Ok(value)
    }

    fn compute(&mut self, node: &Node) -> Result<Value> {
        match node.kind() {
            NodeKind::Constant(value) => Ok(value.copy()),
            NodeKind::Variable(cell) => {
                let value = match self.bindings.get(&node.id()) {
                    Some(value) => value.copy(),
                    None => cell.read().clone().ok_or_else(|| Error::UnboundVariable {
                        name: node.name().to_string(),
                    })?,
                };
                expect_type(node, &value)?;
                Ok(value)
            }
            NodeKind::Operator { imp, .. } => {
                if let Some(value) = node.folded() {
                    return Ok(value.copy());
                }
                let args = self.evaluate_args(node)?;
                self.stats.invocations += 1;
                let value = imp(&args).map_err(|e| e.at_node(node.name()))?;
                expect_type(node, &value)?;
                Ok(value)
            }
            NodeKind::Primitive(mc) | NodeKind::Composite(mc) => {
                let args = self.evaluate_args(node)?;
                let value = match node.folded() {
                    Some(value) => value.copy(),
                    None => {
                        for (placeholder, value) in mc.placeholders().iter().zip(&args) {
                            if placeholder.kind().is_variable() {
                                self.bindings.insert(placeholder.id(), value.copy());
                            }
                        }
                        self.stats.invocations += 1;
                        let value = self.evaluate_node(mc.root())?;
                        expect_type(node, &value)?;
                        value
                    }
                };
                if self.options.check_specs {
                    self.check_spec(node, mc, &args, &value)?;
                }
                Ok(value)
            }
        }
    }

    fn evaluate_args(&mut self, node: &Node) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(node.args().len());
        for arg in node.args() {
            let value = self.evaluate_node(arg)?;
            if value.ty() != *arg.node_type() {
                return Err(Error::TypeMismatch {
                    node: node.name().to_string(),
                    expected: arg.node_type().clone(),
                    found: value.ty(),
                });
            }
            values.push(value);
        }
        Ok(values)
    }

    /// Compare the implementation's output with the declared relation.
    fn check_spec(&mut self, node: &Node, mc: &Microcode, args: &[Value], output: &Value) -> Result<()> {
        let inputs: Vec<SpecValue> = args.iter().map(Value::to_spec).collect();
        let actual = output.to_spec();
        self.stats.spec_checks += 1;

        let failure = match mc.spec().evaluate(&inputs) {
            Ok(expected) if expected == actual => None,
            Ok(expected) => Some(Error::SpecMismatch {
                node: node.name().to_string(),
                implementation: actual,
                specification: expected,
            }),
            // The relation does not isolate the output: check it with the output given.
            Err(hwformal::Error::NotClosedForm { .. }) => {
                let residual = mc.spec().check(&inputs, &actual)?;
                (!residual.is_true()).then(|| Error::SpecViolated {
                    node: node.name().to_string(),
                    output: actual,
                    residual,
                })
            }
            Err(err) => return Err(err.into()),
        };

        match failure {
            None => Ok(()),
            Some(err) => match self.options.spec_exclusions.get(node.name()) {
                Some(reason) => {
                    warn!("tolerating excluded spec mismatch ({}): {}", reason, err);
                    self.stats.excluded += 1;
                    Ok(())
                }
                None => Err(err),
            },
        }
    }
}

fn expect_type(node: &Node, value: &Value) -> Result<()> {
    if value.ty() == *node.node_type() {
        Ok(())
    } else {
        Err(Error::TypeMismatch {
            node: node.name().to_string(),
            expected: node.node_type().clone(),
            found: value.ty(),
        })
    }
}
