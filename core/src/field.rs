//! Canonical field specs and the schema introspector.
//!
//! [`introspect`] walks a [`Schema`]'s nested fields and interprets each
//! field's tags into a [`FieldSpec`], deciding for every field whether it is
//! a flag, a positional argument, a subcommand, or a branching argument.
//! Embedded records are flattened into their parent with `prefix`,
//! `envprefix`, and `xorprefix` applied; `-`-tagged fields are dropped.
//!
//! The introspector enforces the field-level structural rules: branching
//! arguments start with exactly one positional key, required positionals
//! never follow optional ones, and cumulative positionals close their node's
//! schedule. Node-level rules (duplicate names, default-command restrictions)
//! belong to the grammar builder.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::schema::{Field, Schema, TypeSpec};
use crate::tags::{DefaultMode, Negation, Passthrough, Sep, TagError};

/// What a field turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FieldKind {
    /// A named flag (`--name`, optional `-s`).
    Flag,
    /// A positional argument bound by declaration order.
    Positional,
    /// A named subcommand owning its own subtree.
    Command,
    /// A branching argument: a positional key that opens a subtree.
    Branch,
}

/// Canonical, fully-interpreted description of one grammar field.
///
/// Produced by [`introspect`]; immutable thereafter. For `Command` and
/// `Branch` kinds, `children` holds the introspected subtree (for a branch,
/// the key positional is `children[0]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    pub kind: FieldKind,
    /// Effective kebab-case name, with any embed prefix applied.
    pub name: String,
    /// Original source identifier.
    pub ident: String,
    pub ty: TypeSpec,
    pub help: String,
    pub placeholder: Option<String>,
    pub short: Option<char>,
    pub aliases: Vec<String>,
    /// Environment variables consulted by the env resolver, in order.
    pub env: Vec<String>,
    /// Default literal (value fields) — already split from the
    /// default-command marker, which lands in `default_command`.
    pub default: Option<String>,
    pub enum_values: Vec<String>,
    pub required: bool,
    pub optional: bool,
    pub hidden: bool,
    /// Resolved negation long name for negatable booleans.
    pub negation: Option<String>,
    pub passthrough: Passthrough,
    pub sep: Sep,
    pub mapsep: Sep,
    /// Whether the field accumulates across occurrences.
    pub cumulative: bool,
    /// Named decoder override from the `type` tag.
    pub decoder: Option<String>,
    pub group: Option<String>,
    pub xor: Vec<String>,
    pub and: Vec<String>,
    /// Default-command marker for `Command` kinds.
    pub default_command: Option<DefaultMode>,
    pub children: Vec<FieldSpec>,
}

impl FieldSpec {
    /// Whether this field binds a value (flag or positional).
    pub fn is_value_field(&self) -> bool {
        matches!(self.kind, FieldKind::Flag | FieldKind::Positional)
    }

    /// Display form used in error messages: `--name` for flags, `<name>`
    /// for positionals, the bare name otherwise.
    pub fn display(&self) -> String {
        match self.kind {
            FieldKind::Flag => format!("--{}", self.name),
            FieldKind::Positional => format!("<{}>", self.name),
            FieldKind::Command | FieldKind::Branch => self.name.clone(),
        }
    }

    /// All long names this flag answers to, negation included.
    pub fn long_names(&self) -> Vec<&str> {
        let mut names = vec![self.name.as_str()];
        names.extend(self.aliases.iter().map(String::as_str));
        if let Some(negation) = &self.negation {
            names.push(negation.as_str());
        }
        names
    }
}

/// Converts a source identifier to kebab case.
///
/// Handles snake_case, camelCase, and acronym boundaries:
///
/// ```
/// use arg_grammar_core::kebab_case;
///
/// assert_eq!(kebab_case("output_file"), "output-file");
/// assert_eq!(kebab_case("outputFile"), "output-file");
/// assert_eq!(kebab_case("HTTPServer"), "http-server");
/// assert_eq!(kebab_case("v2"), "v2");
/// ```
pub fn kebab_case(ident: &str) -> String {
    let chars: Vec<char> = ident.chars().collect();
    let mut out = String::with_capacity(ident.len() + 4);
    for (i, &ch) in chars.iter().enumerate() {
        if ch == '_' {
            out.push('-');
        } else if ch.is_ascii_uppercase() {
            let next_is_lower = chars.get(i + 1).is_some_and(|c| c.is_ascii_lowercase());
            let boundary = i > 0
                && (chars[i - 1].is_ascii_lowercase()
                    || chars[i - 1].is_ascii_digit()
                    || (chars[i - 1].is_ascii_uppercase() && next_is_lower));
            if boundary {
                out.push('-');
            }
            out.push(ch.to_ascii_lowercase());
        } else {
            out.push(ch);
        }
    }
    out
}

#[derive(Debug, Clone, Default)]
struct EmbedContext {
    prefix: String,
    envprefix: String,
    xorprefix: String,
}

impl EmbedContext {
    fn extend(&self, field: &Field) -> EmbedContext {
        let mut next = self.clone();
        if let Some(prefix) = &field.tags.prefix {
            next.prefix.push_str(prefix);
        }
        if let Some(envprefix) = &field.tags.envprefix {
            next.envprefix.push_str(envprefix);
        }
        if let Some(xorprefix) = &field.tags.xorprefix {
            next.xorprefix.push_str(xorprefix);
        }
        next
    }
}

/// Walks a schema and produces the canonical field specs for its root node.
pub fn introspect(schema: &Schema) -> Result<Vec<FieldSpec>> {
    introspect_fields(&schema.fields, &EmbedContext::default())
}

fn introspect_fields(fields: &[Field], ctx: &EmbedContext) -> Result<Vec<FieldSpec>> {
    let mut specs = Vec::with_capacity(fields.len());
    for field in fields {
        if field.tags.skip {
            continue;
        }
        if field.tags.embed {
            let TypeSpec::Record(children) = field.ty.unwrapped() else {
                return Err(SchemaError::EmbedNotRecord {
                    field: field.ident.clone(),
                });
            };
            specs.extend(introspect_fields(children, &ctx.extend(field))?);
            continue;
        }
        specs.push(introspect_field(field, ctx)?);
    }
    check_positional_schedule(&specs)?;
    Ok(specs)
}

fn introspect_field(field: &Field, ctx: &EmbedContext) -> Result<FieldSpec> {
    if field.tags.cmd {
        return introspect_command(field);
    }
    if field.tags.arg {
        return match field.ty.unwrapped() {
            TypeSpec::Record(_) => introspect_branch(field),
            _ => introspect_positional(field, ctx),
        };
    }
    if field.ty.is_record() {
        return Err(SchemaError::UntaggedRecord {
            field: field.ident.clone(),
        });
    }
    introspect_flag(field, ctx)
}

fn introspect_command(field: &Field) -> Result<FieldSpec> {
    let TypeSpec::Record(children) = field.ty.unwrapped() else {
        return Err(SchemaError::CommandNotRecord {
            field: field.ident.clone(),
        });
    };
    let name = effective_name(field)?;
    let default_command = match field.tags.default.as_deref() {
        None => None,
        Some("1") | Some("true") | Some("") => Some(DefaultMode::Fallback),
        Some("withargs") => Some(DefaultMode::WithArgs),
        Some(other) => {
            return Err(SchemaError::Tag {
                field: field.ident.clone(),
                source: TagError::InvalidValue {
                    key: "default".to_string(),
                    value: other.to_string(),
                    reason: "expected `1` or `withargs` on a subcommand".to_string(),
                },
            });
        }
    };
    Ok(FieldSpec {
        kind: FieldKind::Command,
        name,
        ident: field.ident.clone(),
        ty: field.ty.clone(),
        help: field.tags.help.clone().unwrap_or_default(),
        placeholder: None,
        short: None,
        aliases: field.tags.aliases.clone(),
        env: Vec::new(),
        default: None,
        enum_values: Vec::new(),
        required: false,
        optional: false,
        hidden: field.tags.hidden,
        negation: None,
        passthrough: Passthrough::Off,
        sep: Sep::list_default(),
        mapsep: Sep::map_default(),
        cumulative: false,
        decoder: None,
        group: field.tags.group.clone(),
        xor: Vec::new(),
        and: Vec::new(),
        default_command,
        children: introspect_fields(children, &EmbedContext::default())?,
    })
}

fn introspect_branch(field: &Field) -> Result<FieldSpec> {
    let TypeSpec::Record(record) = field.ty.unwrapped() else {
        unreachable!("caller matched a record type");
    };
    let name = effective_name(field)?;
    let children = introspect_fields(record, &EmbedContext::default())?;

    let mut positionals = children
        .iter()
        .filter(|spec| spec.kind == FieldKind::Positional);
    match positionals.next() {
        Some(key) if children.first().map(|c| c.kind) == Some(FieldKind::Positional) => {
            if key.name == name {
                return Err(SchemaError::BranchKeyConflict {
                    field: field.ident.clone(),
                });
            }
        }
        _ => {
            return Err(SchemaError::BranchMissingKey {
                field: field.ident.clone(),
            });
        }
    }
    if let Some(extra) = positionals.next() {
        return Err(SchemaError::BranchExtraPositional {
            field: field.ident.clone(),
            positional: extra.name.clone(),
        });
    }

    Ok(FieldSpec {
        kind: FieldKind::Branch,
        name,
        ident: field.ident.clone(),
        ty: field.ty.clone(),
        help: field.tags.help.clone().unwrap_or_default(),
        placeholder: field.tags.placeholder.clone(),
        short: None,
        aliases: Vec::new(),
        env: Vec::new(),
        default: None,
        enum_values: Vec::new(),
        required: false,
        optional: false,
        hidden: field.tags.hidden,
        negation: None,
        passthrough: Passthrough::Off,
        sep: Sep::list_default(),
        mapsep: Sep::map_default(),
        cumulative: false,
        decoder: None,
        group: field.tags.group.clone(),
        xor: Vec::new(),
        and: Vec::new(),
        default_command: None,
        children,
    })
}

fn introspect_positional(field: &Field, ctx: &EmbedContext) -> Result<FieldSpec> {
    let tags = &field.tags;
    if tags.short.is_some() {
        return Err(SchemaError::ShortOnNonFlag {
            field: field.ident.clone(),
        });
    }
    if tags.negation.is_some() {
        return Err(SchemaError::NegatableNotBool {
            field: field.ident.clone(),
        });
    }
    let cumulative = field.ty.is_cumulative();
    if tags.passthrough != Passthrough::Off && !cumulative {
        return Err(SchemaError::PassthroughNotList {
            field: field.ident.clone(),
        });
    }
    let name = effective_name(field)?;
    // A default makes a positional implicitly optional, as does an
    // optional (pointer-like) type.
    let optional = tags.optional
        || tags.default.is_some()
        || matches!(field.ty, TypeSpec::Optional(_))
        || cumulative && !tags.required;
    let xor = tags
        .xor
        .iter()
        .map(|tag| format!("{}{}", ctx.xorprefix, tag))
        .collect();
    let and = tags
        .and
        .iter()
        .map(|tag| format!("{}{}", ctx.xorprefix, tag))
        .collect();
    let env = tags
        .env
        .iter()
        .map(|var| format!("{}{}", ctx.envprefix, var))
        .collect();
    Ok(FieldSpec {
        kind: FieldKind::Positional,
        name,
        ident: field.ident.clone(),
        ty: field.ty.clone(),
        help: tags.help.clone().unwrap_or_default(),
        placeholder: tags.placeholder.clone(),
        short: None,
        aliases: Vec::new(),
        env,
        default: tags.default.clone(),
        enum_values: tags.enum_values.clone(),
        required: !optional,
        optional,
        hidden: tags.hidden,
        negation: None,
        passthrough: tags.passthrough,
        sep: tags.sep.unwrap_or_else(Sep::list_default),
        mapsep: tags.mapsep.unwrap_or_else(Sep::map_default),
        cumulative,
        decoder: tags.decoder.clone(),
        group: tags.group.clone(),
        xor,
        and,
        default_command: None,
        children: Vec::new(),
    })
}

fn introspect_flag(field: &Field, ctx: &EmbedContext) -> Result<FieldSpec> {
    let tags = &field.tags;
    if tags.passthrough != Passthrough::Off {
        return Err(SchemaError::PassthroughNotList {
            field: field.ident.clone(),
        });
    }
    let base = effective_name(field)?;
    let name = format!("{}{}", ctx.prefix, base);
    let negation = match &tags.negation {
        None => None,
        Some(_) if !field.ty.is_bool() => {
            return Err(SchemaError::NegatableNotBool {
                field: field.ident.clone(),
            });
        }
        Some(Negation::Default) => Some(format!("no-{name}")),
        Some(Negation::Named(custom)) => Some(format!("{}{}", ctx.prefix, custom)),
    };
    let aliases = tags
        .aliases
        .iter()
        .map(|alias| format!("{}{}", ctx.prefix, alias))
        .collect();
    let env = tags
        .env
        .iter()
        .map(|var| format!("{}{}", ctx.envprefix, var))
        .collect();
    let xor = tags
        .xor
        .iter()
        .map(|tag| format!("{}{}", ctx.xorprefix, tag))
        .collect();
    let and = tags
        .and
        .iter()
        .map(|tag| format!("{}{}", ctx.xorprefix, tag))
        .collect();
    let optional = tags.optional || matches!(field.ty, TypeSpec::Optional(_));
    Ok(FieldSpec {
        kind: FieldKind::Flag,
        name,
        ident: field.ident.clone(),
        ty: field.ty.clone(),
        help: tags.help.clone().unwrap_or_default(),
        placeholder: tags.placeholder.clone(),
        short: tags.short,
        aliases,
        env,
        default: tags.default.clone(),
        enum_values: tags.enum_values.clone(),
        required: tags.required,
        optional,
        hidden: tags.hidden,
        negation,
        passthrough: Passthrough::Off,
        sep: tags.sep.unwrap_or_else(Sep::list_default),
        mapsep: tags.mapsep.unwrap_or_else(Sep::map_default),
        cumulative: field.ty.is_cumulative(),
        decoder: tags.decoder.clone(),
        group: tags.group.clone(),
        xor,
        and,
        default_command: None,
        children: Vec::new(),
    })
}

fn effective_name(field: &Field) -> Result<String> {
    let name = match &field.tags.name {
        Some(name) => name.clone(),
        None => kebab_case(&field.ident),
    };
    if name.is_empty() {
        return Err(SchemaError::EmptyName);
    }
    Ok(name)
}

/// Enforces positional ordering within one node's schedule: no required
/// positional after an optional one, and a cumulative positional only in
/// last position.
fn check_positional_schedule(specs: &[FieldSpec]) -> Result<()> {
    let mut last_optional: Option<&FieldSpec> = None;
    let mut cumulative: Option<&FieldSpec> = None;
    for spec in specs.iter().filter(|s| s.kind == FieldKind::Positional) {
        if let Some(cumulative) = cumulative {
            return Err(SchemaError::CumulativeNotLast {
                field: cumulative.display(),
            });
        }
        if spec.required {
            if let Some(optional) = last_optional {
                return Err(SchemaError::RequiredAfterOptional {
                    field: spec.display(),
                    previous: optional.display(),
                });
            }
        } else {
            last_optional = Some(spec);
        }
        if spec.cumulative {
            cumulative = Some(spec);
        }
    }
    Ok(())
}
