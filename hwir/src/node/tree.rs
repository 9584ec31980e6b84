//! Textual tree rendering of IR nodes.
use std::fmt;

use crate::node::{Node, NodeKind};

impl Node {
    /// Build a formatting helper that renders this node and its arguments as an
    /// indented tree. With `expand`, each Primitive/Composite also shows one level of
    /// its implementation tree.
    pub fn tree(&self, expand: bool) -> impl fmt::Display + '_ {
        pub struct Tree<'a> {
            node: &'a Node,
            expand: bool,
        }

        impl fmt::Display for Tree<'_> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write_node(f, self.node, 0, self.expand)
            }
        }

        Tree { node: self, expand }
    }
}

fn write_node(f: &mut fmt::Formatter<'_>, node: &Node, depth: usize, expand: bool) -> fmt::Result {
    write!(f, "{:indent$}{} {}", "", node.kind().name(), node, indent = depth * 2)?;
    match node.folded() {
        Some(value) if !node.kind().is_constant() => write!(f, " = {}", value)?,
        _ => {}
    }
    match node.kind() {
        NodeKind::Constant(value) => write!(f, " = {}", value)?,
        NodeKind::Variable(cell) => {
            if let Some(value) = cell.read().as_ref() {
                write!(f, " <- {}", value)?;
            }
        }
        _ => {}
    }
    writeln!(f)?;

    for arg in node.args() {
        write_node(f, arg, depth + 1, expand)?;
    }

    if let Some(mc) = node.microcode().filter(|_| expand) {
        writeln!(f, "{:indent$}| spec {}", "", mc.spec(), indent = (depth + 1) * 2)?;
        writeln!(f, "{:indent$}| impl", "", indent = (depth + 1) * 2)?;
        // One level only: the inner tree is not expanded further.
        write_node(f, mc.root(), depth + 2, false)?;
    }
    Ok(())
}
