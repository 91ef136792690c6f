//! The nested schema description.
//!
//! A [`Schema`] is the hand-constructed replacement for an annotated record
//! tree: an ordered list of [`Field`]s, each with a source identifier, a
//! semantic [`TypeSpec`], and a [`TagSet`]. The introspector
//! ([`introspect`](crate::introspect)) interprets this description into
//! canonical [`FieldSpec`](crate::FieldSpec)s.
//!
//! # Example
//!
//! ```
//! use arg_grammar_core::{Field, Schema, TypeSpec};
//!
//! let schema = Schema::new("greet")
//!     .with_help("A tiny greeter.")
//!     .field(Field::new("verbose", TypeSpec::Bool).tagged(r#"short:"v" negatable"#).unwrap())
//!     .field(Field::command("hello", vec![
//!         Field::new("name", TypeSpec::String).tagged("arg").unwrap(),
//!     ]));
//!
//! assert_eq!(schema.fields.len(), 2);
//! ```

use serde::{Deserialize, Serialize};

use crate::tags::{TagError, TagSet};

/// Semantic type of a schema field.
///
/// `Optional` mirrors a pointer-typed source field: presence or absence of a
/// binding distinguishes "unset" from "explicitly set", including the empty
/// string. `Record` carries nested fields and is only meaningful on fields
/// tagged `cmd`, `arg` (branching argument), or `embed`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TypeSpec {
    Bool,
    String,
    Int,
    Float,
    /// Cumulative list of the element type.
    List(Box<TypeSpec>),
    /// Cumulative string-keyed map of the value type.
    Map(Box<TypeSpec>),
    /// Optional (pointer-like) wrapper.
    Optional(Box<TypeSpec>),
    /// A user type handled by a named decoder.
    Custom(String),
    /// A nested record (subcommand, branching argument, or embed).
    Record(Vec<Field>),
}

impl TypeSpec {
    /// Strips any `Optional` wrapper.
    pub fn unwrapped(&self) -> &TypeSpec {
        match self {
            TypeSpec::Optional(inner) => inner.unwrapped(),
            other => other,
        }
    }

    /// Whether the field accumulates across occurrences (list or map).
    pub fn is_cumulative(&self) -> bool {
        matches!(self.unwrapped(), TypeSpec::List(_) | TypeSpec::Map(_))
    }

    /// Whether this is a nested record.
    pub fn is_record(&self) -> bool {
        matches!(self.unwrapped(), TypeSpec::Record(_))
    }

    /// Whether this is a bare or optional bool.
    pub fn is_bool(&self) -> bool {
        matches!(self.unwrapped(), TypeSpec::Bool)
    }

    /// Display name used in error messages.
    pub fn display_name(&self) -> String {
        match self {
            TypeSpec::Bool => "bool".to_string(),
            TypeSpec::String => "string".to_string(),
            TypeSpec::Int => "int".to_string(),
            TypeSpec::Float => "float".to_string(),
            TypeSpec::List(inner) => format!("list<{}>", inner.display_name()),
            TypeSpec::Map(value) => format!("map<string,{}>", value.display_name()),
            TypeSpec::Optional(inner) => format!("optional<{}>", inner.display_name()),
            TypeSpec::Custom(key) => key.clone(),
            TypeSpec::Record(_) => "record".to_string(),
        }
    }
}

/// One field of a schema record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Field {
    /// Source identifier (snake or camel case); kebab-cased for the grammar
    /// unless overridden by `name:"..."`.
    pub ident: String,
    /// Semantic type.
    pub ty: TypeSpec,
    /// Parsed tag metadata.
    pub tags: TagSet,
}

impl Field {
    /// Creates an untagged field (introspected as a flag).
    pub fn new(ident: &str, ty: TypeSpec) -> Self {
        Self {
            ident: ident.to_string(),
            ty,
            tags: TagSet::default(),
        }
    }

    /// Attaches a parsed tag string.
    ///
    /// # Examples
    ///
    /// ```
    /// use arg_grammar_core::{Field, TypeSpec};
    ///
    /// let field = Field::new("level", TypeSpec::String)
    ///     .tagged(r#"enum:"debug,info,warn" default:"info""#)
    ///     .unwrap();
    /// assert_eq!(field.tags.default.as_deref(), Some("info"));
    /// ```
    pub fn tagged(mut self, tags: &str) -> Result<Self, TagError> {
        self.tags = TagSet::parse(tags)?;
        Ok(self)
    }

    /// Attaches an already-built tag set.
    pub fn with_tags(mut self, tags: TagSet) -> Self {
        self.tags = tags;
        self
    }

    /// Creates a subcommand field from nested fields.
    pub fn command(ident: &str, fields: Vec<Field>) -> Self {
        Self {
            ident: ident.to_string(),
            ty: TypeSpec::Record(fields),
            tags: TagSet::default().command(),
        }
    }

    /// Creates a branching-argument field: the first nested field must be the
    /// positional key whose decoded value selects this subtree.
    pub fn branch(ident: &str, fields: Vec<Field>) -> Self {
        Self {
            ident: ident.to_string(),
            ty: TypeSpec::Record(fields),
            tags: TagSet::default().argument(),
        }
    }

    /// Creates an embedded group whose children merge into the parent node.
    pub fn embed(ident: &str, fields: Vec<Field>) -> Self {
        Self {
            ident: ident.to_string(),
            ty: TypeSpec::Record(fields),
            tags: TagSet::default().embedded(),
        }
    }
}

/// The root description of an application grammar.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// Application name (root node display name).
    pub name: String,
    /// Application help text.
    pub help: Option<String>,
    /// Root fields: flags, positionals, subcommands, embeds.
    pub fields: Vec<Field>,
}

impl Schema {
    /// Creates an empty schema.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            help: None,
            fields: Vec::new(),
        }
    }

    /// Adds application help text.
    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    /// Appends a field.
    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }
}
