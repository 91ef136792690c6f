//! The executable grammar: an arena of nodes.
//!
//! Nodes reference each other by [`NodeId`] index into the grammar-owned
//! arena, so parent back-references are plain numbers rather than ownership
//! cycles. A node's flags stay in scope for its whole subtree; flag lookup
//! walks the active node stack innermost first.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use arg_grammar_core::{DefaultMode, FieldSpec, Passthrough};

use crate::decode::Decode;
use crate::hooks::{ActionFn, Bus, HookFn, HookPhase};
use crate::resolve::Resolver;

/// Index of a node in the grammar arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct NodeId(pub(crate) usize);

/// What kind of scope a node opens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NodeKind {
    /// The root application node.
    Application,
    /// A named subcommand.
    Command,
    /// A branching argument: entered by decoding its key positional.
    Branch,
}

/// A flag local to a node, visible in the node's whole subtree.
pub struct Flag {
    pub spec: FieldSpec,
    /// Dotted binding path (e.g. `user.create.force`).
    pub path: String,
    pub(crate) decoder: Arc<dyn Decode>,
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flag")
            .field("name", &self.spec.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// One slot in a node's positional schedule.
pub struct Positional {
    pub spec: FieldSpec,
    pub path: String,
    pub(crate) decoder: Arc<dyn Decode>,
}

impl fmt::Debug for Positional {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Positional")
            .field("name", &self.spec.name)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

/// A point in the command tree.
#[derive(Debug)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    /// Display name; for a branch node, the key positional's name.
    pub name: String,
    pub aliases: Vec<String>,
    pub help: String,
    pub hidden: bool,
    pub parent: Option<NodeId>,
    /// Child command and branch nodes, in declaration order.
    pub children: Vec<NodeId>,
    pub flags: Vec<Flag>,
    /// Positional schedule; a branch node's key occupies slot 0.
    pub positionals: Vec<Positional>,
    /// Default child and its selection mode.
    pub default_child: Option<(NodeId, DefaultMode)>,
    /// Whether any positional of this node captures passthrough tokens.
    pub passthrough: bool,
    /// Dotted registration path; empty for the root.
    pub path: String,
}

impl Node {
    /// Display form used in paths and error prefixes.
    pub fn display(&self) -> String {
        match self.kind {
            NodeKind::Branch => format!("<{}>", self.name),
            _ => self.name.clone(),
        }
    }

    /// Whether the node's pending positional (if any) is in the given
    /// passthrough mode or stronger.
    pub(crate) fn passthrough_at(&self, index: usize) -> Passthrough {
        self.positionals
            .get(index)
            .map(|p| p.spec.passthrough)
            .unwrap_or(Passthrough::Off)
    }
}

/// A flag resolved against the scope chain.
#[derive(Debug, Clone, Copy)]
pub(crate) struct FlagRef {
    pub node: NodeId,
    pub index: usize,
    /// Matched via the negation name.
    pub negated: bool,
}

/// A compiled, immutable grammar ready for parsing.
pub struct Grammar {
    pub(crate) nodes: Vec<Node>,
    pub(crate) root: NodeId,
    pub(crate) observers: Vec<HookFn>,
    pub(crate) field_hooks: HashMap<(String, HookPhase), Vec<HookFn>>,
    pub(crate) validators: HashMap<NodeId, Vec<HookFn>>,
    pub(crate) actions: HashMap<NodeId, ActionFn>,
    pub(crate) after_run: HashMap<NodeId, Vec<HookFn>>,
    pub(crate) resolvers: Vec<Box<dyn Resolver>>,
    /// Build-time bus bindings, applied to every parse's fresh bus.
    pub(crate) binders: Vec<Box<dyn Fn(&mut Bus)>>,
    pub(crate) allow_hyphen_values: bool,
}

impl fmt::Debug for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Grammar")
            .field("nodes", &self.nodes.len())
            .field("observers", &self.observers.len())
            .finish_non_exhaustive()
    }
}

impl Grammar {
    pub fn root(&self) -> &Node {
        &self.nodes[self.root.0]
    }

    pub fn node(&self, id: NodeId) -> &Node {
        &self.nodes[id.0]
    }

    /// All nodes in creation (pre-order) order.
    pub fn nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.iter()
    }

    /// Space-joined command path of a node, excluding the application name.
    pub fn command_path(&self, id: NodeId) -> String {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(node_id) = current {
            let node = self.node(node_id);
            if node.kind != NodeKind::Application {
                names.push(node.display());
            }
            current = node.parent;
        }
        names.reverse();
        names.join(" ")
    }

    /// Resolves a long name against the scope chain, innermost first.
    /// Negation names and aliases participate.
    pub(crate) fn lookup_long(&self, stack: &[NodeId], name: &str) -> Option<FlagRef> {
        for &node_id in stack.iter().rev() {
            let node = self.node(node_id);
            for (index, flag) in node.flags.iter().enumerate() {
                if flag.spec.name == name || flag.spec.aliases.iter().any(|a| a == name) {
                    return Some(FlagRef {
                        node: node_id,
                        index,
                        negated: false,
                    });
                }
                if flag.spec.negation.as_deref() == Some(name) {
                    return Some(FlagRef {
                        node: node_id,
                        index,
                        negated: true,
                    });
                }
            }
        }
        None
    }

    /// Resolves a short letter against the scope chain, innermost first.
    pub(crate) fn lookup_short(&self, stack: &[NodeId], letter: char) -> Option<FlagRef> {
        for &node_id in stack.iter().rev() {
            let node = self.node(node_id);
            for (index, flag) in node.flags.iter().enumerate() {
                if flag.spec.short == Some(letter) {
                    return Some(FlagRef {
                        node: node_id,
                        index,
                        negated: false,
                    });
                }
            }
        }
        None
    }

    /// Finds a node by its dotted registration path.
    pub(crate) fn node_by_path(&self, path: &str) -> Option<NodeId> {
        self.nodes.iter().find(|n| n.path == path).map(|n| n.id)
    }
}
