//! Schema description and field introspection for the arg-grammar engine.
//!
//! This crate defines the declarative half of the system:
//!
//! - [`Schema`] / [`Field`] / [`TypeSpec`] — the nested description of an
//!   application grammar, built by hand in place of source-language
//!   reflection.
//! - [`TagSet`] — per-field metadata, parseable from compact tag strings.
//! - [`FieldSpec`] and [`introspect`] — the canonical interpretation of a
//!   description: every field classified as flag, positional, subcommand, or
//!   branching argument, with embeds flattened and field-level rules
//!   enforced.
//! - [`Value`] — the runtime value model decoders produce.
//! - [`interpolate`] — `${var}` substitution inside tag values.
//!
//! The executable grammar (node tree, token scanner, parse state machine,
//! hooks) lives in `arg-grammar-engine`, which consumes the specs produced
//! here.
//!
//! # Example
//!
//! ```
//! use arg_grammar_core::{Field, FieldKind, Schema, TypeSpec, introspect};
//!
//! let schema = Schema::new("backup")
//!     .field(Field::new("verbose", TypeSpec::Bool).tagged(r#"short:"v""#).unwrap())
//!     .field(Field::command("snapshot", vec![
//!         Field::new("target", TypeSpec::String).tagged("arg").unwrap(),
//!     ]));
//!
//! let specs = introspect(&schema).unwrap();
//! assert_eq!(specs[0].kind, FieldKind::Flag);
//! assert_eq!(specs[1].kind, FieldKind::Command);
//! ```

mod error;
mod field;
mod interpolate;
mod schema;
mod tags;
mod value;

pub use error::{Result, SchemaError};
pub use field::{FieldKind, FieldSpec, introspect, kebab_case};
pub use interpolate::{UnresolvedVariable, has_variables, interpolate};
pub use schema::{Field, Schema, TypeSpec};
pub use tags::{DefaultMode, Negation, Passthrough, Sep, TagError, TagSet};
pub use value::Value;
