//! The arg-grammar engine: executable grammars for declarative CLIs.
//!
//! This crate turns a schema description from `arg-grammar-core` into an
//! executable [`Grammar`] and parses argument vectors against it:
//!
//! - [`GrammarBuilder`] — assembles and validates the node tree, resolves
//!   decoders, interpolates `${var}` references, and registers hooks,
//!   actions, and resolvers.
//! - [`Grammar::parse`] / [`Grammar::trace`] — the recursive-descent state
//!   machine over the token stream and the command tree.
//! - [`Context`] — the parse result: selected path, per-element residual
//!   tokens, bound values, and the [`Context::run`] dispatcher.
//! - [`Decode`] / [`DecoderRegistry`] — pluggable token-to-value decoding.
//! - [`Resolver`] — external value sources consulted for unset fields.
//! - [`Bus`] and the hook pipeline — typed dependency injection for
//!   lifecycle callbacks.
//!
//! # Example
//!
//! ```
//! use arg_grammar_core::{Field, Schema, TypeSpec};
//! use arg_grammar_engine::GrammarBuilder;
//!
//! let schema = Schema::new("files")
//!     .field(Field::new("verbose", TypeSpec::Bool).tagged(r#"short:"v""#).unwrap())
//!     .field(Field::command("copy", vec![
//!         Field::new("src", TypeSpec::String).tagged("arg").unwrap(),
//!         Field::new("dest", TypeSpec::String).tagged("arg").unwrap(),
//!     ]));
//!
//! let grammar = GrammarBuilder::new(schema).build().unwrap();
//! let ctx = grammar.parse(["copy", "-v", "a.txt", "b.txt"]).unwrap();
//! assert_eq!(ctx.command_line(), "copy <src> <dest>");
//! assert_eq!(ctx.value("verbose").and_then(|v| v.as_bool()), Some(true));
//! assert_eq!(ctx.value("copy.src").and_then(|v| v.as_str()), Some("a.txt"));
//! ```

mod build;
mod context;
mod decode;
mod error;
mod hooks;
mod node;
mod resolve;
mod scan;
mod validate;
mod walk;

pub use build::GrammarBuilder;
pub use context::{Context, PathElement, TracedElement};
pub use decode::{Decode, DecodeContext, DecodeError, DecoderRegistry, decode_literal};
pub use error::{BoxedError, BuildError, BuildResult, HookError, ParseError, RunError};
pub use hooks::{
    ActionFn, ActionScope, Bus, ElementKind, ElementView, HookFn, HookPhase, HookResult,
    HookScope,
};
pub use node::{Flag, Grammar, Node, NodeId, NodeKind, Positional};
pub use resolve::{EnvResolver, ResolveError, Resolver};
pub use scan::{Scanner, Token, TokenKind};
