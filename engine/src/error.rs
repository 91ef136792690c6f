//! Error types for grammar construction, parsing, hooks, and dispatch.
//!
//! The four error kinds mirror the phases of the engine: [`BuildError`]
//! surfaces from the builder and means no grammar was produced;
//! [`ParseError`] is a user-input error from the state machine or the
//! constraint layer; [`HookError`] wraps a failing user callback;
//! [`RunError`] carries a command action's error through unchanged.

use thiserror::Error;

use arg_grammar_core::SchemaError;

/// Boxed error type returned by user callbacks (hooks and actions).
pub type BoxedError = Box<dyn std::error::Error + Send + Sync>;

/// Errors raised while assembling a grammar from a schema.
#[derive(Debug, Error)]
pub enum BuildError {
    /// The schema description itself was invalid.
    #[error(transparent)]
    Schema(#[from] SchemaError),
    /// Two flags visible in one scope chain share a long name or alias.
    #[error("{node}: duplicate flag --{name} in scope")]
    DuplicateFlag { node: String, name: String },
    /// Two flags visible in one scope chain share a short letter.
    #[error("{node}: duplicate short flag -{letter} in scope")]
    DuplicateShort { node: String, letter: char },
    /// Two sibling commands share a name or alias.
    #[error("{node}: duplicate command {name}")]
    DuplicateCommand { node: String, name: String },
    /// A node declares both positional arguments and subcommands.
    #[error("{node}: cannot mix positional arguments with subcommands")]
    MixedChildren { node: String },
    /// More than one child of a node is marked as the default command.
    #[error("{node}: only one default command is allowed")]
    MultipleDefaults { node: String },
    /// A fallback default command owns positionals or subcommands.
    #[error("{node}: default command cannot have positional arguments or subcommands")]
    DefaultNotLeaf { node: String },
    /// The same (xor, and) tag pair occurs in more than one field.
    #[error("fields {first} and {second} overlap in both xor group {xor} and and group {and}")]
    GroupOverlap {
        xor: String,
        and: String,
        first: String,
        second: String,
    },
    /// No decoder is available for a field's semantic type.
    #[error("{field}: no decoder for type {ty}")]
    DecoderMissing { field: String, ty: String },
    /// A `${var}` reference had no entry in the variable map.
    #[error("{field}: undefined variable ${{{variable}}}")]
    UnresolvedVariable { field: String, variable: String },
    /// A hook, action, or resolver was registered against a path that does
    /// not exist in the grammar.
    #[error("unknown registration path {path}")]
    UnknownPath { path: String },
}

/// Errors raised while parsing a token stream against a grammar.
#[derive(Debug, Error)]
pub enum ParseError {
    /// A flag-shaped token matched nothing in the scope chain.
    #[error("unknown flag {0}")]
    UnknownFlag(String),
    /// A plain token matched no positional, command, or branch.
    #[error("unexpected argument {0}")]
    UnexpectedArgument(String),
    /// Input ran out at a node that still needed a command or branch.
    #[error("expected {0}")]
    ExpectedChild(String),
    /// A value failed to decode; `context` names the flag or positional.
    #[error("{context}: {message}")]
    Decode { context: String, message: String },
    /// Required positionals were left unbound.
    #[error("missing positional arguments {0}")]
    MissingPositionals(String),
    /// A final value was outside the field's enum set.
    #[error("{field} must be one of {allowed} but got \"{value}\"")]
    Enum {
        field: String,
        allowed: String,
        value: String,
    },
    /// Two members of one xor group were both set; names are in display
    /// form (`--flag`, `<positional>`).
    #[error("{first} and {second} can't be used together")]
    XorConflict { first: String, second: String },
    /// An and group was only partially set; names are in display form.
    #[error("{present} and {missing} must be used together")]
    AndMissing { present: String, missing: String },
    /// Required flags were left unset; the message groups them by their
    /// xor/and relationships.
    #[error("missing flags: {0}")]
    MissingFlags(String),
    /// A resolver failed while looking up a field.
    #[error("{field}: {message}")]
    Resolver { field: String, message: String },
    /// A user hook failed; `path` names the traversed element.
    #[error("{path}: {source}")]
    Hook {
        path: String,
        #[source]
        source: HookError,
    },
}

/// Errors produced by user callbacks in the hook pipeline.
#[derive(Debug, Error)]
pub enum HookError {
    /// The callback returned an error.
    #[error("{0}")]
    Callback(BoxedError),
    /// The callback asked the binding bus for a type nobody provided.
    #[error("no binding of type {type_name} available")]
    MissingBinding { type_name: &'static str },
}

/// Errors surfaced by [`Context::run`](crate::Context::run).
#[derive(Debug, Error)]
pub enum RunError {
    /// The selected node has no action attached.
    #[error("no command selected")]
    NoCommandSelected,
    /// The command action returned an error; propagated unchanged.
    #[error("{0}")]
    Action(BoxedError),
    /// An AfterRun hook failed.
    #[error("{path}: {source}")]
    Hook {
        path: String,
        #[source]
        source: HookError,
    },
}

/// Convenience alias for build results.
pub type BuildResult<T> = std::result::Result<T, BuildError>;
