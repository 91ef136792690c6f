//! Grammar builder: from a schema description to an executable node tree.
//!
//! The builder introspects the schema, interpolates `${var}` references in
//! tag values, assembles the node arena, and enforces the node-level
//! structural rules: no mixing of positionals and subcommands, a single
//! default command per node, fallback default commands staying leaf-like, no
//! duplicate names anywhere in a scope chain, and no ambiguous xor/and group
//! overlap. Hooks, actions, resolvers, and custom decoders are registered
//! here by dotted path and resolved against the finished tree.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tracing::debug;

use arg_grammar_core::{
    DefaultMode, FieldKind, FieldSpec, Passthrough, Schema, has_variables, interpolate,
    introspect,
};

use crate::decode::{Decode, DecoderRegistry};
use crate::error::{BuildError, BuildResult};
use crate::hooks::{ActionFn, ActionScope, Bus, HookFn, HookPhase, HookResult, HookScope};
use crate::node::{Flag, Grammar, Node, NodeId, NodeKind, Positional};
use crate::resolve::{EnvResolver, Resolver};

/// Fluent builder for a [`Grammar`].
///
/// # Example
///
/// ```
/// use arg_grammar_core::{Field, Schema, TypeSpec};
/// use arg_grammar_engine::GrammarBuilder;
///
/// let schema = Schema::new("tool")
///     .field(Field::new("verbose", TypeSpec::Bool).tagged(r#"short:"v""#).unwrap())
///     .field(Field::command("run", vec![
///         Field::new("script", TypeSpec::String).tagged("arg").unwrap(),
///     ]));
///
/// let grammar = GrammarBuilder::new(schema).build().unwrap();
/// let ctx = grammar.parse(["run", "build.sh", "-v"]).unwrap();
/// assert_eq!(ctx.command_line(), "run <script>");
/// ```
pub struct GrammarBuilder {
    schema: Schema,
    vars: HashMap<String, String>,
    registry: DecoderRegistry,
    resolvers: Vec<Box<dyn Resolver>>,
    observers: Vec<HookFn>,
    field_hooks: Vec<(String, HookPhase, HookFn)>,
    validators: Vec<(String, HookFn)>,
    actions: Vec<(String, ActionFn)>,
    after_run: Vec<(String, HookFn)>,
    binders: Vec<Box<dyn Fn(&mut Bus)>>,
    allow_hyphen_values: bool,
}

impl GrammarBuilder {
    /// Starts a builder; the resolver chain is seeded with [`EnvResolver`].
    pub fn new(schema: Schema) -> Self {
        Self {
            schema,
            vars: HashMap::new(),
            registry: DecoderRegistry::new(),
            resolvers: vec![Box::new(EnvResolver)],
            observers: Vec::new(),
            field_hooks: Vec::new(),
            validators: Vec::new(),
            actions: Vec::new(),
            after_run: Vec::new(),
            binders: Vec::new(),
            allow_hyphen_values: false,
        }
    }

    /// Provides a value on every parse's binding bus, for hook and action
    /// injection by type identity.
    pub fn bind<T>(mut self, value: T) -> Self
    where
        T: std::any::Any + Clone,
    {
        self.binders
            .push(Box::new(move |bus| bus.provide(value.clone())));
        self
    }

    /// Defines an interpolation variable for `${name}` references.
    pub fn var(mut self, name: &str, value: &str) -> Self {
        self.vars.insert(name.to_string(), value.to_string());
        self
    }

    /// Registers a named decoder for `type:"key"` tags and `Custom` types.
    pub fn decoder(mut self, key: &str, decoder: Arc<dyn Decode>) -> Self {
        self.registry.register(key, decoder);
        self
    }

    /// Appends a resolver to the chain (after the env resolver).
    pub fn resolver(mut self, resolver: Box<dyn Resolver>) -> Self {
        self.resolvers.push(resolver);
        self
    }

    /// Registers a global observer fired for every traversed element, in
    /// registration order.
    pub fn observer<F>(mut self, observer: F) -> Self
    where
        F: Fn(&mut HookScope<'_>) -> HookResult + 'static,
    {
        self.observers.push(Box::new(observer));
        self
    }

    /// Registers a hook for the field at `path` (dotted, e.g.
    /// `"user.create.id"`) at the given phase.
    pub fn hook<F>(mut self, path: &str, phase: HookPhase, hook: F) -> Self
    where
        F: Fn(&mut HookScope<'_>) -> HookResult + 'static,
    {
        self.field_hooks
            .push((path.to_string(), phase, Box::new(hook)));
        self
    }

    /// Registers a node-level validation hook, fired after the node's
    /// AfterApply hooks complete.
    pub fn validator<F>(mut self, path: &str, hook: F) -> Self
    where
        F: Fn(&mut HookScope<'_>) -> HookResult + 'static,
    {
        self.validators.push((path.to_string(), Box::new(hook)));
        self
    }

    /// Attaches the action dispatched when the node at `path` is the
    /// deepest selected node. The root is addressed by the empty path.
    pub fn action<F>(mut self, path: &str, action: F) -> Self
    where
        F: Fn(&ActionScope<'_>) -> HookResult + 'static,
    {
        self.actions.push((path.to_string(), Box::new(action)));
        self
    }

    /// Registers an AfterRun hook on the node at `path`; AfterRun hooks fire
    /// ascending from the selected node after the action returns.
    pub fn on_after_run<F>(mut self, path: &str, hook: F) -> Self
    where
        F: Fn(&mut HookScope<'_>) -> HookResult + 'static,
    {
        self.after_run.push((path.to_string(), Box::new(hook)));
        self
    }

    /// Accepts hyphen-prefixed tokens as values for flags awaiting one.
    pub fn allow_hyphen_values(mut self, allow: bool) -> Self {
        self.allow_hyphen_values = allow;
        self
    }

    /// Assembles and validates the grammar.
    pub fn build(self) -> BuildResult<Grammar> {
        let mut specs = introspect(&self.schema)?;
        interpolate_specs(&mut specs, &self.vars)?;

        let mut assembler = Assembler {
            nodes: Vec::new(),
            registry: &self.registry,
        };
        let root = assembler.add_node(
            NodeKind::Application,
            self.schema.name.clone(),
            "",
            Vec::new(),
            self.schema.help.clone().unwrap_or_default(),
            false,
            None,
            "",
            specs,
        )?;
        let nodes = assembler.nodes;

        check_scope_chain(&nodes, root, &HashMap::new(), &HashMap::new())?;
        check_group_overlap(&nodes)?;

        let mut grammar = Grammar {
            nodes,
            root,
            observers: self.observers,
            field_hooks: HashMap::new(),
            validators: HashMap::new(),
            actions: HashMap::new(),
            after_run: HashMap::new(),
            resolvers: self.resolvers,
            binders: self.binders,
            allow_hyphen_values: self.allow_hyphen_values,
        };

        let field_paths: HashSet<String> = grammar
            .nodes
            .iter()
            .flat_map(|node| {
                node.flags
                    .iter()
                    .map(|f| f.path.clone())
                    .chain(node.positionals.iter().map(|p| p.path.clone()))
            })
            .collect();

        for (path, phase, hook) in self.field_hooks {
            if !field_paths.contains(&path) {
                return Err(BuildError::UnknownPath { path });
            }
            grammar
                .field_hooks
                .entry((path, phase))
                .or_default()
                .push(hook);
        }
        for (path, hook) in self.validators {
            let id = grammar
                .node_by_path(&path)
                .ok_or(BuildError::UnknownPath { path })?;
            grammar.validators.entry(id).or_default().push(hook);
        }
        for (path, action) in self.actions {
            let id = grammar
                .node_by_path(&path)
                .ok_or(BuildError::UnknownPath { path })?;
            grammar.actions.insert(id, action);
        }
        for (path, hook) in self.after_run {
            let id = grammar
                .node_by_path(&path)
                .ok_or(BuildError::UnknownPath { path })?;
            grammar.after_run.entry(id).or_default().push(hook);
        }

        debug!(
            nodes = grammar.nodes.len(),
            flags = grammar.nodes.iter().map(|n| n.flags.len()).sum::<usize>(),
            "grammar finalized"
        );
        Ok(grammar)
    }
}

struct Assembler<'a> {
    nodes: Vec<Node>,
    registry: &'a DecoderRegistry,
}

impl Assembler<'_> {
    #[allow(clippy::too_many_arguments)]
    fn add_node(
        &mut self,
        kind: NodeKind,
        name: String,
        path_segment: &str,
        aliases: Vec<String>,
        help: String,
        hidden: bool,
        parent: Option<NodeId>,
        parent_path: &str,
        specs: Vec<FieldSpec>,
    ) -> BuildResult<NodeId> {
        let id = NodeId(self.nodes.len());
        let path = join_path(parent_path, path_segment);
        self.nodes.push(Node {
            id,
            kind,
            name,
            aliases,
            help,
            hidden,
            parent,
            children: Vec::new(),
            flags: Vec::new(),
            positionals: Vec::new(),
            default_child: None,
            passthrough: false,
            path: path.clone(),
        });

        let mut default: Option<(NodeId, DefaultMode)> = None;
        for spec in specs {
            match spec.kind {
                FieldKind::Flag => {
                    let decoder = self.decoder_for(&spec, &path)?;
                    let field_path = join_path(&path, &spec.name);
                    self.nodes[id.0].flags.push(Flag {
                        path: field_path,
                        spec,
                        decoder,
                    });
                }
                FieldKind::Positional => {
                    let decoder = self.decoder_for(&spec, &path)?;
                    let field_path = join_path(&path, &spec.name);
                    if spec.passthrough != Passthrough::Off {
                        self.nodes[id.0].passthrough = true;
                    }
                    self.nodes[id.0].positionals.push(Positional {
                        path: field_path,
                        spec,
                        decoder,
                    });
                }
                FieldKind::Command => {
                    let default_command = spec.default_command;
                    let child = self.add_node(
                        NodeKind::Command,
                        spec.name.clone(),
                        &spec.name,
                        spec.aliases,
                        spec.help,
                        spec.hidden,
                        Some(id),
                        &path,
                        spec.children,
                    )?;
                    if let Some(mode) = default_command {
                        if default.is_some() {
                            return Err(BuildError::MultipleDefaults {
                                node: self.display(id),
                            });
                        }
                        default = Some((child, mode));
                    }
                    self.nodes[id.0].children.push(child);
                }
                FieldKind::Branch => {
                    // The branch displays as its key positional; the
                    // registration path keeps the branch field's own name.
                    let key_name = spec.children[0].name.clone();
                    let child = self.add_node(
                        NodeKind::Branch,
                        key_name,
                        &spec.name,
                        Vec::new(),
                        spec.help,
                        spec.hidden,
                        Some(id),
                        &path,
                        spec.children,
                    )?;
                    self.nodes[id.0].children.push(child);
                }
            }
        }

        if kind != NodeKind::Branch
            && !self.nodes[id.0].positionals.is_empty()
            && !self.nodes[id.0].children.is_empty()
        {
            return Err(BuildError::MixedChildren {
                node: self.display(id),
            });
        }

        if let Some((child, mode)) = default {
            if mode == DefaultMode::Fallback {
                let child_node = &self.nodes[child.0];
                if !child_node.positionals.is_empty() || !child_node.children.is_empty() {
                    return Err(BuildError::DefaultNotLeaf {
                        node: self.display(child),
                    });
                }
            }
            self.nodes[id.0].default_child = Some((child, mode));
        }

        Ok(id)
    }

    fn decoder_for(&self, spec: &FieldSpec, node_path: &str) -> BuildResult<Arc<dyn Decode>> {
        self.registry
            .lookup(spec)
            .ok_or_else(|| BuildError::DecoderMissing {
                field: join_path(node_path, &spec.name),
                ty: spec
                    .decoder
                    .clone()
                    .unwrap_or_else(|| spec.ty.display_name()),
            })
    }

    fn display(&self, id: NodeId) -> String {
        let node = &self.nodes[id.0];
        if node.path.is_empty() {
            node.name.clone()
        } else {
            node.path.replace('.', " ")
        }
    }
}

fn join_path(parent: &str, segment: &str) -> String {
    if parent.is_empty() {
        segment.to_string()
    } else if segment.is_empty() {
        parent.to_string()
    } else {
        format!("{parent}.{segment}")
    }
}

/// Interpolates `${var}` references in tag values; defaults first, then
/// help/placeholder/enum/env with `${default}` available.
fn interpolate_specs(
    specs: &mut [FieldSpec],
    vars: &HashMap<String, String>,
) -> BuildResult<()> {
    for spec in specs {
        if let Some(default) = spec.default.take() {
            spec.default = Some(interp(&default, vars, &spec.name)?);
        }
        let needs_default_var = spec.help.contains("${")
            || spec.placeholder.as_deref().is_some_and(|p| p.contains("${"));
        let extended;
        let active = if needs_default_var {
            let mut map = vars.clone();
            if let Some(default) = &spec.default {
                map.insert("default".to_string(), default.clone());
            }
            extended = map;
            &extended
        } else {
            vars
        };
        spec.help = interp(&spec.help, active, &spec.name)?;
        if let Some(placeholder) = spec.placeholder.take() {
            spec.placeholder = Some(interp(&placeholder, active, &spec.name)?);
        }
        for value in &mut spec.enum_values {
            *value = interp(value, vars, &spec.name)?;
        }
        for var in &mut spec.env {
            *var = interp(var, vars, &spec.name)?;
        }
        interpolate_specs(&mut spec.children, vars)?;
    }
    Ok(())
}

fn interp(input: &str, vars: &HashMap<String, String>, field: &str) -> BuildResult<String> {
    if !has_variables(input) {
        return Ok(input.to_string());
    }
    interpolate(input, vars).map_err(|err| BuildError::UnresolvedVariable {
        field: field.to_string(),
        variable: err.0,
    })
}

/// DFS enforcing name uniqueness along every scope chain: long names,
/// aliases, and negation names share one namespace; shorts another; sibling
/// command names a third.
fn check_scope_chain(
    nodes: &[Node],
    id: NodeId,
    inherited_long: &HashMap<String, NodeId>,
    inherited_short: &HashMap<char, NodeId>,
) -> BuildResult<()> {
    let node = &nodes[id.0];
    let mut longs = inherited_long.clone();
    let mut shorts = inherited_short.clone();

    for flag in &node.flags {
        for name in flag.spec.long_names() {
            if longs.insert(name.to_string(), id).is_some() {
                return Err(BuildError::DuplicateFlag {
                    node: scope_display(nodes, id),
                    name: name.to_string(),
                });
            }
        }
        if let Some(letter) = flag.spec.short {
            if shorts.insert(letter, id).is_some() {
                return Err(BuildError::DuplicateShort {
                    node: scope_display(nodes, id),
                    letter,
                });
            }
        }
    }

    let mut sibling_names: HashSet<&str> = HashSet::new();
    for &child in &node.children {
        let child_node = &nodes[child.0];
        if child_node.kind == NodeKind::Command {
            for name in std::iter::once(child_node.name.as_str())
                .chain(child_node.aliases.iter().map(String::as_str))
            {
                if !sibling_names.insert(name) {
                    return Err(BuildError::DuplicateCommand {
                        node: scope_display(nodes, id),
                        name: name.to_string(),
                    });
                }
            }
        }
    }

    for &child in &node.children {
        check_scope_chain(nodes, child, &longs, &shorts)?;
    }
    Ok(())
}

fn scope_display(nodes: &[Node], id: NodeId) -> String {
    let node = &nodes[id.0];
    if node.path.is_empty() {
        node.name.clone()
    } else {
        node.path.replace('.', " ")
    }
}

/// A single (xor tag, and tag) pair may not co-occur in more than one field;
/// overlapping constraint groups would be ambiguous. Flags and positionals
/// both participate.
fn check_group_overlap(nodes: &[Node]) -> BuildResult<()> {
    let mut seen: HashMap<(String, String), String> = HashMap::new();
    for node in nodes {
        let fields = node
            .flags
            .iter()
            .map(|f| &f.spec)
            .chain(node.positionals.iter().map(|p| &p.spec));
        for spec in fields {
            for xor in &spec.xor {
                for and in &spec.and {
                    let key = (xor.clone(), and.clone());
                    if let Some(first) = seen.get(&key) {
                        return Err(BuildError::GroupOverlap {
                            xor: xor.clone(),
                            and: and.clone(),
                            first: first.clone(),
                            second: spec.display(),
                        });
                    }
                    seen.insert(key, spec.display());
                }
            }
        }
    }
    Ok(())
}
