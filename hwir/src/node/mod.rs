//! IR nodes.
//!
//! A [`Node`] is an immutable handle on a tree of computations. Every node records a
//! name, its ordered arguments and the static type derived by its signature at
//! construction. The five variants are
//!  - `Constant`: a value baked in at construction,
//!  - `Variable`: a value bound by the caller before evaluation,
//!  - `Operator`: a bit-level implementation without a declared specification,
//!  - `Primitive` and `Composite`: a declared [`SpecRelation`] together with a
//!    self-contained implementation tree built over placeholder nodes.
//!
//! When all arguments of a node are known at construction, the node is folded: its
//! implementation runs immediately and the result is recorded. Folded results go
//! through the same type check as ordinary evaluation.
use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use hwformal::expr::Sym;
use hwformal::spec::SpecRelation;
use log::debug;
use parking_lot::RwLock;
use smallvec::SmallVec;
use strum::{EnumIs, IntoStaticStr};

use crate::signature::{ParamConstraint, Signature};
use crate::types::TypeDesc;
use crate::utils::{Error, Result};
use crate::value::Value;

pub mod check;
pub mod eval;
pub mod tree;

pub use check::Assertions;
pub use eval::{EvalOptions, EvalStats, Session};

/// Process-unique node identity. Memoization and verification key on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(u64);

impl NodeId {
    fn fresh() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(0);
        NodeId(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    #[inline]
    pub fn index(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

pub type ImplFn = Arc<dyn Fn(&[Value]) -> Result<Value> + Send + Sync>;
pub type SymbolicFn = Arc<dyn Fn(&[Sym]) -> Sym + Send + Sync>;

/// Implementation of a Primitive or Composite: its declared relation, the
/// placeholders standing in for its arguments and the root of the inner tree.
pub struct Microcode {
    spec: Arc<SpecRelation>,
    placeholders: Vec<Node>,
    root: Node,
}

impl Microcode {
    pub fn spec(&self) -> &SpecRelation {
        &self.spec
    }

    /// One placeholder per argument, in order. A placeholder is a Constant when the
    /// argument was already folded and a Variable otherwise.
    pub fn placeholders(&self) -> &[Node] {
        &self.placeholders
    }

    pub fn root(&self) -> &Node {
        &self.root
    }
}

#[derive(EnumIs, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub enum NodeKind {
    Constant(Value),
    /// Binding cell set by [`Node::bind`].
    Variable(RwLock<Option<Value>>),
    Operator {
        imp: ImplFn,
        /// How the verifier renders this operator; an opaque call when absent.
        symbolic: Option<SymbolicFn>,
    },
    Primitive(Microcode),
    Composite(Microcode),
}

impl NodeKind {
    pub fn name(&self) -> &'static str {
        self.into()
    }

    pub fn microcode(&self) -> Option<&Microcode> {
        match self {
            NodeKind::Primitive(mc) | NodeKind::Composite(mc) => Some(mc),
            _ => None,
        }
    }
}

struct NodeData {
    id: NodeId,
    name: String,
    kind: NodeKind,
    args: SmallVec<[Node; 4]>,
    node_type: TypeDesc,
    folded: Option<Value>,
}

/// Cheap, clonable handle on an IR node. Equality is identity.
#[derive(Clone)]
pub struct Node(Arc<NodeData>);

impl Node {
    fn new(
        name: String,
        kind: NodeKind,
        args: SmallVec<[Node; 4]>,
        node_type: TypeDesc,
        folded: Option<Value>,
    ) -> Node {
        let node = Node(Arc::new(NodeData {
            id: NodeId::fresh(),
            name,
            kind,
            args,
            node_type,
            folded,
        }));
        debug!(
            "built {} `{}`{}: {}{}",
            node.kind().name(),
            node.name(),
            node.id(),
            node.node_type(),
            if node.is_folded() { " (folded)" } else { "" }
        );
        node
    }

    /// Constant node carrying `value`.
    pub fn constant(value: Value) -> Node {
        Self::named_constant("const", value)
    }

    pub fn named_constant(name: impl Into<String>, value: Value) -> Node {
        let ty = value.ty();
        Self::new(
            name.into(),
            NodeKind::Constant(value.copy()),
            SmallVec::new(),
            ty,
            Some(value),
        )
    }

    /// Unbound variable of type `ty`.
    pub fn variable(name: impl Into<String>, ty: TypeDesc) -> Node {
        Self::new(
            name.into(),
            NodeKind::Variable(RwLock::new(None)),
            SmallVec::new(),
            ty,
            None,
        )
    }

    /// Operator node. The signature derives the output type; the node is folded when
    /// every argument is.
    pub fn operator<F>(
        name: impl Into<String>,
        signature: &Signature,
        args: impl IntoIterator<Item = Node>,
        imp: F,
    ) -> Result<Node>
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
    {
        Self::build_operator(name.into(), signature, args.into_iter().collect(), Arc::new(imp), None)
    }

    /// Operator node with a custom symbolic rendering.
    pub fn operator_with_symbolic<F, S>(
        name: impl Into<String>,
        signature: &Signature,
        args: impl IntoIterator<Item = Node>,
        imp: F,
        symbolic: S,
    ) -> Result<Node>
    where
        F: Fn(&[Value]) -> Result<Value> + Send + Sync + 'static,
        S: Fn(&[Sym]) -> Sym + Send + Sync + 'static,
    {
        Self::build_operator(
            name.into(),
            signature,
            args.into_iter().collect(),
            Arc::new(imp),
            Some(Arc::new(symbolic)),
        )
    }

    fn build_operator(
        name: String,
        signature: &Signature,
        args: SmallVec<[Node; 4]>,
        imp: ImplFn,
        symbolic: Option<SymbolicFn>,
    ) -> Result<Node> {
        let types: Vec<TypeDesc> = args.iter().map(|a| a.node_type().clone()).collect();
        let node_type = signature.apply(&name, &types)?;

        let folded = match args.iter().map(|a| a.folded().cloned()).collect::<Option<Vec<_>>>() {
            Some(values) => {
                let value = imp(&values).map_err(|e| e.at_node(&name))?;
                if value.ty() != node_type {
                    return Err(Error::TypeMismatch {
                        node: name,
                        expected: node_type,
                        found: value.ty(),
                    });
                }
                debug!("folded `{}` to {}", name, value);
                Some(value)
            }
            None => None,
        };

        Ok(Self::new(
            name,
            NodeKind::Operator { imp, symbolic },
            args,
            node_type,
            folded,
        ))
    }

    /// Primitive node: a declared spec plus an implementation tree materialized by
    /// `build` over fresh placeholders.
    pub fn primitive<F>(
        name: impl Into<String>,
        spec: SpecRelation,
        signature: &Signature,
        args: impl IntoIterator<Item = Node>,
        build: F,
    ) -> Result<Node>
    where
        F: FnOnce(&[Node]) -> Result<Node>,
    {
        Self::build_microcoded(name.into(), spec, signature, args.into_iter().collect(), build, false)
    }

    /// Composite node. Same contract as [`Node::primitive`]; used for blocks assembled
    /// from other primitives and operators, and the unit the verifier proves.
    pub fn composite<F>(
        name: impl Into<String>,
        spec: SpecRelation,
        signature: &Signature,
        args: impl IntoIterator<Item = Node>,
        build: F,
    ) -> Result<Node>
    where
        F: FnOnce(&[Node]) -> Result<Node>,
    {
        Self::build_microcoded(name.into(), spec, signature, args.into_iter().collect(), build, true)
    }

    fn build_microcoded<F>(
        name: String,
        spec: SpecRelation,
        signature: &Signature,
        args: SmallVec<[Node; 4]>,
        build: F,
        composite: bool,
    ) -> Result<Node>
    where
        F: FnOnce(&[Node]) -> Result<Node>,
    {
        let types: Vec<TypeDesc> = args.iter().map(|a| a.node_type().clone()).collect();
        let node_type = signature.apply(&name, &types)?;
        if spec.arity() != args.len() {
            return Err(Error::ArityMismatch {
                node: name,
                expected: format!("{} (from its spec)", spec.arity()),
                found: args.len(),
            });
        }

        let placeholders: Vec<Node> = spec
            .params()
            .iter()
            .zip(&args)
            .map(|(param, arg)| {
                let label = format!("{}.{}", name, param);
                match arg.folded() {
                    Some(value) => Node::named_constant(label, value.copy()),
                    None => Node::variable(label, arg.node_type().clone()),
                }
            })
            .collect();

        let root = build(&placeholders).map_err(|e| e.at_node(&name))?;
        if *root.node_type() != node_type {
            return Err(Error::TypeMismatch {
                node: name,
                expected: node_type,
                found: root.node_type().clone(),
            });
        }

        let folded = root.folded().cloned();
        let microcode = Microcode {
            spec: Arc::new(spec),
            placeholders,
            root,
        };
        let kind = if composite {
            NodeKind::Composite(microcode)
        } else {
            NodeKind::Primitive(microcode)
        };
        Ok(Self::new(name, kind, args, node_type, folded))
    }

    /// Projection of slot `index` of a tuple-typed node. The bound is checked here
    /// against the static type and again on the evaluated value.
    pub fn index(&self, index: usize) -> Result<Node> {
        let signature = Signature::new([ParamConstraint::Tuple], move |types| types[0].index(index).cloned());
        Self::operator_with_symbolic(
            "index",
            &signature,
            [self.clone()],
            move |values| values[0].index(index).map(Value::copy),
            move |args| args[0].clone().index(index),
        )
    }

    /// Bind a variable for subsequent evaluations.
    pub fn bind(&self, value: Value) -> Result<()> {
        let NodeKind::Variable(cell) = self.kind() else {
            return Err(Error::NotAVariable {
                node: self.name().to_string(),
            });
        };
        if value.ty() != *self.node_type() {
            return Err(Error::TypeMismatch {
                node: self.name().to_string(),
                expected: self.node_type().clone(),
                found: value.ty(),
            });
        }
        *cell.write() = Some(value);
        Ok(())
    }

    pub fn unbind(&self) -> Result<()> {
        match self.kind() {
            NodeKind::Variable(cell) => {
                *cell.write() = None;
                Ok(())
            }
            _ => Err(Error::NotAVariable {
                node: self.name().to_string(),
            }),
        }
    }

    /// Value currently bound to a variable.
    pub fn binding(&self) -> Option<Value> {
        match self.kind() {
            NodeKind::Variable(cell) => cell.read().clone(),
            _ => None,
        }
    }

    /// Evaluate in a fresh session with every check enabled.
    pub fn evaluate(&self) -> Result<Value> {
        Session::default().evaluate(self)
    }

    /// Symbolic rendering of an operator applied to `args`.
    ///
    /// Without a hook the node is an uninterpreted call named after its identity
    /// (`name#id`). Two such nodes are never assumed equal, and the name cannot be
    /// mistaken for a builtin.
    pub fn symbolic(&self, args: &[Sym]) -> Sym {
        match self.kind() {
            NodeKind::Operator {
                symbolic: Some(hook), ..
            } => hook(args),
            _ => Sym::Call(format!("{}{}", self.name(), self.id()), args.to_vec()),
        }
    }

    #[inline]
    pub fn id(&self) -> NodeId {
        self.0.id
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.0.name
    }

    #[inline]
    pub fn kind(&self) -> &NodeKind {
        &self.0.kind
    }

    #[inline]
    pub fn args(&self) -> &[Node] {
        &self.0.args
    }

    /// Static type, fixed at construction.
    #[inline]
    pub fn node_type(&self) -> &TypeDesc {
        &self.0.node_type
    }

    /// Compile-time value, when the node was folded.
    #[inline]
    pub fn folded(&self) -> Option<&Value> {
        self.0.folded.as_ref()
    }

    #[inline]
    pub fn is_folded(&self) -> bool {
        self.0.folded.is_some()
    }

    pub fn microcode(&self) -> Option<&Microcode> {
        self.kind().microcode()
    }
}

impl PartialEq for Node {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl Eq for Node {}

impl std::hash::Hash for Node {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.id().hash(state)
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("id", &self.id())
            .field("name", &self.name())
            .field("kind", &self.kind().name())
            .field("node_type", self.node_type())
            .field("args", &self.args().iter().map(Node::id).collect::<Vec<_>>())
            .finish()
    }
}

impl fmt::Display for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}: {}", self.name(), self.id(), self.node_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sfix(i: u32, f: u32) -> TypeDesc {
        TypeDesc::signed(i, f).unwrap()
    }

    fn pass_through() -> Signature {
        Signature::new([ParamConstraint::Any], |types| Ok(types[0].clone()))
    }

    #[test]
    fn folding_runs_at_construction() {
        let c = Node::constant(Value::boolean(true));
        let n = Node::operator("id", &pass_through(), [c], |v| Ok(v[0].copy())).unwrap();
        assert_eq!(n.folded(), Some(&Value::boolean(true)));

        let v = Node::variable("v", TypeDesc::Boolean);
        let n = Node::operator("id", &pass_through(), [v], |v| Ok(v[0].copy())).unwrap();
        assert!(!n.is_folded());
    }

    #[test]
    fn folded_values_are_type_checked() {
        let c = Node::constant(Value::boolean(true));
        let err = Node::operator("liar", &pass_through(), [c], |_| Ok(Value::float32(1.0))).unwrap_err();
        assert!(err.is_type_mismatch());
    }

    #[test]
    fn binding_is_type_checked() {
        let v = Node::variable("x", sfix(2, 2));
        assert!(v.bind(Value::boolean(false)).unwrap_err().is_type_mismatch());
        v.bind(Value::fixed(&sfix(2, 2), 3u8).unwrap()).unwrap();
        assert!(v.binding().is_some());
        v.unbind().unwrap();
        assert!(v.binding().is_none());

        let c = Node::constant(Value::boolean(true));
        assert!(c.bind(Value::boolean(true)).unwrap_err().is_not_a_variable());
    }

    #[test]
    fn operators_without_hook_are_opaque() {
        let x = Sym::Var("x".to_string());
        let v = Node::variable("v", TypeDesc::Boolean);
        let a = Node::operator("max", &pass_through(), [v.clone()], |v| Ok(v[0].copy())).unwrap();
        let b = Node::operator("max", &pass_through(), [v], |v| Ok(v[0].copy())).unwrap();

        let sa = a.symbolic(std::slice::from_ref(&x));
        assert_eq!(sa, Sym::Call(format!("max{}", a.id()), vec![x.clone()]));
        assert_ne!(sa, b.symbolic(std::slice::from_ref(&x)));
    }

    #[test]
    fn static_index_bound() {
        let t = Node::constant(Value::tuple([Value::boolean(true), Value::boolean(false)]));
        assert_eq!(t.index(1).unwrap().folded(), Some(&Value::boolean(false)));
        assert_eq!(t.index(2).unwrap_err(), Error::IndexOutOfRange { index: 2, len: 2 });
    }

    #[test]
    fn identity_equality() {
        let a = Node::variable("x", TypeDesc::Boolean);
        let b = Node::variable("x", TypeDesc::Boolean);
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert!(a.id() < b.id());
        assert!(a.to_string().starts_with("x#"));
    }
}
