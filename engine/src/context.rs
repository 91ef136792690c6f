//! The parse context: selected path, bound values, and dispatch.
//!
//! A [`Context`] is created per parse. The trace walker fills in the path
//! and the raw decoded values; [`Context::apply`] then drives the hook
//! pipeline node by node along the path — BeforeReset and reset, per-field
//! BeforeResolve / resolver chain / default, enum validation, BeforeApply,
//! binding, AfterApply, node Validate — and finally the cross-field
//! constraint checks. [`Context::run`] dispatches the deepest node's action
//! with binding-bus injection and fires AfterRun hooks ascending.

use std::any::Any;
use std::collections::{BTreeMap, HashMap, HashSet};

use arg_grammar_core::{FieldSpec, Value};

use crate::decode::{Decode, decode_literal};
use crate::error::{HookError, ParseError, RunError};
use crate::hooks::{ActionScope, Bus, ElementKind, ElementView, HookPhase, HookScope};
use crate::node::{Grammar, Node, NodeId, NodeKind};
use crate::validate;

/// One step of the selected path.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathElement {
    App { node: NodeId },
    Command { node: NodeId },
    Branch { node: NodeId },
    Positional { node: NodeId, index: usize },
    Flag { node: NodeId, index: usize },
}

impl PathElement {
    /// The node this element belongs to.
    pub fn node_id(&self) -> NodeId {
        match *self {
            PathElement::App { node }
            | PathElement::Command { node }
            | PathElement::Branch { node }
            | PathElement::Positional { node, .. }
            | PathElement::Flag { node, .. } => node,
        }
    }

    /// Whether this element opens a node scope.
    pub fn is_node(&self) -> bool {
        matches!(
            self,
            PathElement::App { .. } | PathElement::Command { .. } | PathElement::Branch { .. }
        )
    }
}

/// A path element plus the residual tokens from the point it was entered.
#[derive(Debug, Clone)]
pub struct TracedElement {
    pub element: PathElement,
    pub remainder: Vec<String>,
}

/// The result of one parse.
pub struct Context<'g> {
    grammar: &'g Grammar,
    /// Selected path from the root to the deepest visited element.
    pub path: Vec<TracedElement>,
    /// The first user error, when tracing; `parse` promotes it instead.
    pub error: Option<ParseError>,
    parsed: HashMap<String, Value>,
    bindings: BTreeMap<String, Value>,
    /// Fields set by tokens or resolvers (group logic counts these).
    explicit: HashSet<String>,
    /// Fields with any final value (parse, resolver, or default).
    satisfied: HashSet<String>,
    bus: Bus,
}

impl std::fmt::Debug for Context<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Context")
            .field("grammar", &self.grammar)
            .field("path", &self.path)
            .field("error", &self.error)
            .field("parsed", &self.parsed)
            .field("bindings", &self.bindings)
            .field("explicit", &self.explicit)
            .field("satisfied", &self.satisfied)
            .finish_non_exhaustive()
    }
}

impl<'g> Context<'g> {
    pub(crate) fn from_trace(
        grammar: &'g Grammar,
        path: Vec<TracedElement>,
        parsed: HashMap<String, Value>,
        error: Option<ParseError>,
    ) -> Self {
        let mut bus = Bus::new();
        for binder in &grammar.binders {
            binder(&mut bus);
        }
        Context {
            grammar,
            path,
            error,
            parsed,
            bindings: BTreeMap::new(),
            explicit: HashSet::new(),
            satisfied: HashSet::new(),
            bus,
        }
    }

    pub fn grammar(&self) -> &'g Grammar {
        self.grammar
    }

    /// The deepest node on the selected path.
    pub fn selected(&self) -> &'g Node {
        let id = self
            .path_nodes()
            .last()
            .copied()
            .unwrap_or(self.grammar.root);
        self.grammar.node(id)
    }

    /// Display form of the selected path, e.g. `user create <id>`.
    pub fn command_line(&self) -> String {
        let mut parts: Vec<String> = Vec::new();
        for traced in &self.path {
            match traced.element {
                PathElement::App { .. } | PathElement::Flag { .. } => {}
                PathElement::Command { node } => {
                    parts.push(self.grammar.node(node).name.clone());
                }
                PathElement::Branch { node } => {
                    parts.push(format!("<{}>", self.grammar.node(node).name));
                }
                PathElement::Positional { node, index } => {
                    let name =
                        format!("<{}>", self.grammar.node(node).positionals[index].spec.name);
                    // Cumulative positionals appear once per consumed token.
                    if parts.last() != Some(&name) {
                        parts.push(name);
                    }
                }
            }
        }
        parts.join(" ")
    }

    /// The bound value for a dotted field path, if any.
    pub fn value(&self, path: &str) -> Option<&Value> {
        self.bindings.get(path)
    }

    /// All bound values by dotted field path.
    pub fn values(&self) -> &BTreeMap<String, Value> {
        &self.bindings
    }

    /// Provides a binding for hook and action injection.
    pub fn provide<T: Any>(&mut self, value: T) {
        self.bus.provide(value);
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Node ids of the path's scope chain, root first.
    pub fn path_nodes(&self) -> Vec<NodeId> {
        self.path
            .iter()
            .filter(|t| t.element.is_node())
            .map(|t| t.element.node_id())
            .collect()
    }

    /// Applies resolvers, defaults, hooks, and constraint validation along
    /// the traced path.
    pub(crate) fn apply(&mut self) -> Result<(), ParseError> {
        let grammar = self.grammar;
        let nodes = self.path_nodes();

        // BeforeReset: observers see every traced element in order, then
        // every reachable field's own hooks fire, set or not.
        for i in 0..self.path.len() {
            let element = self.path[i].element;
            let (kind, display, fpath) = self.element_info(element);
            let view = ElementView {
                kind,
                name: &display,
                path: fpath,
            };
            self.fire_observers(HookPhase::BeforeReset, view, None, &display)?;
        }
        for &node_id in &nodes {
            let node = grammar.node(node_id);
            for (spec, fpath) in node_fields(node) {
                let display = spec.display();
                let view = ElementView {
                    kind: field_element_kind(spec),
                    name: &display,
                    path: fpath,
                };
                self.fire_field_hooks(HookPhase::BeforeReset, view, None, &display)?;
            }
        }

        // Reset: non-optional fields go to their zero values, optional
        // fields to absent.
        for &node_id in &nodes {
            let node = grammar.node(node_id);
            for (spec, path) in node_fields(node) {
                if spec.optional {
                    self.bindings.remove(path);
                } else {
                    self.bindings
                        .insert(path.to_string(), Value::zero_of(&spec.ty));
                }
            }
        }

        // Apply values node by node, then fire the node's Validate hooks.
        for &node_id in &nodes {
            let node = grammar.node(node_id);
            for index in 0..node.flags.len() {
                let flag = &node.flags[index];
                self.apply_field(
                    ElementKind::Flag,
                    &flag.spec,
                    &flag.path,
                    flag.decoder.as_ref(),
                )?;
            }
            for index in 0..node.positionals.len() {
                let pos = &node.positionals[index];
                self.apply_field(
                    ElementKind::Positional,
                    &pos.spec,
                    &pos.path,
                    pos.decoder.as_ref(),
                )?;
            }
            if let Some(hooks) = grammar.validators.get(&node_id) {
                let display = node.display();
                for hook in hooks {
                    let mut scope = HookScope {
                        phase: HookPhase::Validate,
                        element: ElementView {
                            kind: node_element_kind(node),
                            name: &display,
                            path: &node.path,
                        },
                        value: None,
                        bus: &mut self.bus,
                    };
                    hook(&mut scope).map_err(|err| ParseError::Hook {
                        path: display.clone(),
                        source: HookError::Callback(err),
                    })?;
                }
            }
        }

        let deepest = *nodes.last().expect("path always contains the root");
        validate::check_positionals(grammar, &nodes, &self.satisfied)?;
        validate::check_selection(grammar, deepest)?;
        validate::check_groups(grammar, &nodes, &self.explicit)?;
        validate::check_required(grammar, &nodes, &self.satisfied)?;
        Ok(())
    }

    fn apply_field(
        &mut self,
        kind: ElementKind,
        spec: &'g FieldSpec,
        fpath: &'g str,
        decoder: &dyn Decode,
    ) -> Result<(), ParseError> {
        let grammar = self.grammar;
        let display = spec.display();
        let view = ElementView {
            kind,
            name: &display,
            path: fpath,
        };

        self.fire(HookPhase::BeforeResolve, view, None, &display)?;

        let mut explicit = false;
        let value = if let Some(value) = self.parsed.get(fpath) {
            explicit = true;
            Some(value.clone())
        } else {
            let mut raw = None;
            for resolver in &grammar.resolvers {
                match resolver.resolve(spec) {
                    Err(err) => {
                        return Err(ParseError::Resolver {
                            field: display.clone(),
                            message: err.0,
                        });
                    }
                    Ok(Some(found)) => {
                        raw = Some(found);
                        break;
                    }
                    Ok(None) => {}
                }
            }
            let decode = |raw: &str| {
                decode_literal(decoder, raw, spec.sep, spec.mapsep).map_err(|err| {
                    ParseError::Decode {
                        context: display.clone(),
                        message: err.0,
                    }
                })
            };
            if let Some(raw) = raw {
                explicit = true;
                Some(decode(&raw)?)
            } else if let Some(default) = &spec.default {
                Some(decode(default)?)
            } else {
                None
            }
        };

        let Some(value) = value else { return Ok(()) };

        // Enum validation covers parsed, resolved, and defaulted values.
        check_enum(spec, &value)?;

        self.fire(HookPhase::BeforeApply, view, Some(&value), &display)?;
        self.bindings.insert(fpath.to_string(), value.clone());
        self.satisfied.insert(fpath.to_string());
        if explicit {
            self.explicit.insert(fpath.to_string());
        }
        self.fire(HookPhase::AfterApply, view, Some(&value), &display)?;
        Ok(())
    }

    /// Fires global observers and the per-field hooks for one element at
    /// one phase, in registration order.
    fn fire(
        &mut self,
        phase: HookPhase,
        view: ElementView<'_>,
        value: Option<&Value>,
        error_path: &str,
    ) -> Result<(), ParseError> {
        self.fire_observers(phase, view, value, error_path)?;
        self.fire_field_hooks(phase, view, value, error_path)
    }

    fn fire_observers(
        &mut self,
        phase: HookPhase,
        view: ElementView<'_>,
        value: Option<&Value>,
        error_path: &str,
    ) -> Result<(), ParseError> {
        let grammar = self.grammar;
        for observer in &grammar.observers {
            let mut scope = HookScope {
                phase,
                element: view,
                value,
                bus: &mut self.bus,
            };
            observer(&mut scope).map_err(|err| ParseError::Hook {
                path: error_path.to_string(),
                source: HookError::Callback(err),
            })?;
        }
        Ok(())
    }

    fn fire_field_hooks(
        &mut self,
        phase: HookPhase,
        view: ElementView<'_>,
        value: Option<&Value>,
        error_path: &str,
    ) -> Result<(), ParseError> {
        let grammar = self.grammar;
        if let Some(hooks) = grammar.field_hooks.get(&(view.path.to_string(), phase)) {
            for hook in hooks {
                let mut scope = HookScope {
                    phase,
                    element: view,
                    value,
                    bus: &mut self.bus,
                };
                hook(&mut scope).map_err(|err| ParseError::Hook {
                    path: error_path.to_string(),
                    source: HookError::Callback(err),
                })?;
            }
        }
        Ok(())
    }

    fn element_info(&self, element: PathElement) -> (ElementKind, String, &'g str) {
        let grammar = self.grammar;
        match element {
            PathElement::App { node } => {
                let node = grammar.node(node);
                (ElementKind::App, node.name.clone(), node.path.as_str())
            }
            PathElement::Command { node } => {
                let node = grammar.node(node);
                (ElementKind::Command, node.name.clone(), node.path.as_str())
            }
            PathElement::Branch { node } => {
                let node = grammar.node(node);
                (ElementKind::Branch, node.display(), node.path.as_str())
            }
            PathElement::Positional { node, index } => {
                let pos = &grammar.node(node).positionals[index];
                (ElementKind::Positional, pos.spec.display(), pos.path.as_str())
            }
            PathElement::Flag { node, index } => {
                let flag = &grammar.node(node).flags[index];
                (ElementKind::Flag, flag.spec.display(), flag.path.as_str())
            }
        }
    }

    /// Dispatches the deepest node's action with bus injection, then fires
    /// AfterRun hooks ascending back up the path.
    pub fn run(&mut self) -> Result<(), RunError> {
        let grammar = self.grammar;
        let nodes = self.path_nodes();
        let deepest = nodes.last().copied().ok_or(RunError::NoCommandSelected)?;
        let action = grammar
            .actions
            .get(&deepest)
            .ok_or(RunError::NoCommandSelected)?;

        let scope = ActionScope::new(&self.bus, &self.bindings);
        action(&scope).map_err(RunError::Action)?;

        for &node_id in nodes.iter().rev() {
            let Some(hooks) = grammar.after_run.get(&node_id) else {
                continue;
            };
            let node = grammar.node(node_id);
            let display = node.display();
            for hook in hooks {
                let mut scope = HookScope {
                    phase: HookPhase::AfterRun,
                    element: ElementView {
                        kind: node_element_kind(node),
                        name: &display,
                        path: &node.path,
                    },
                    value: None,
                    bus: &mut self.bus,
                };
                hook(&mut scope).map_err(|err| RunError::Hook {
                    path: display.clone(),
                    source: HookError::Callback(err),
                })?;
            }
        }
        Ok(())
    }
}

fn field_element_kind(spec: &FieldSpec) -> ElementKind {
    match spec.kind {
        arg_grammar_core::FieldKind::Positional => ElementKind::Positional,
        _ => ElementKind::Flag,
    }
}

fn node_element_kind(node: &Node) -> ElementKind {
    match node.kind {
        NodeKind::Application => ElementKind::App,
        NodeKind::Command => ElementKind::Command,
        NodeKind::Branch => ElementKind::Branch,
    }
}

fn node_fields<'n>(node: &'n Node) -> impl Iterator<Item = (&'n FieldSpec, &'n str)> {
    node.flags
        .iter()
        .map(|f| (&f.spec, f.path.as_str()))
        .chain(node.positionals.iter().map(|p| (&p.spec, p.path.as_str())))
}

fn check_enum(spec: &FieldSpec, value: &Value) -> Result<(), ParseError> {
    if spec.enum_values.is_empty() {
        return Ok(());
    }
    let accepts = |literal: &str| spec.enum_values.iter().any(|v| v == literal);
    let offending = match value {
        Value::List(items) => items
            .iter()
            .map(Value::literal)
            .find(|literal| !accepts(literal)),
        Value::Map(entries) => entries
            .values()
            .map(Value::literal)
            .find(|literal| !accepts(literal)),
        scalar => {
            let literal = scalar.literal();
            if accepts(&literal) { None } else { Some(literal) }
        }
    };
    match offending {
        None => Ok(()),
        Some(value) => Err(ParseError::Enum {
            field: spec.display(),
            allowed: spec
                .enum_values
                .iter()
                .map(|v| format!("\"{v}\""))
                .collect::<Vec<_>>()
                .join(","),
            value,
        }),
    }
}
