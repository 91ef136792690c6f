//! Error types for schema introspection.
//!
//! Covers every structural rule the introspector enforces while turning a
//! nested description into canonical field specs. Grammar-level rules
//! (duplicate names, default-command restrictions, decoder lookup) are
//! enforced by the engine's builder and carry their own error type.

use thiserror::Error;

use crate::tags::TagError;

/// Errors raised while interpreting a schema description.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SchemaError {
    /// A tag string failed to parse or validate.
    #[error("{field}: {source}")]
    Tag {
        field: String,
        #[source]
        source: TagError,
    },
    /// A nested record without a `cmd`, `arg`, or `embed` tag.
    #[error("{field}: nested record must be tagged cmd, arg, or embed")]
    UntaggedRecord { field: String },
    /// `cmd` on a field whose type is not a record.
    #[error("{field}: cmd field must be a record")]
    CommandNotRecord { field: String },
    /// `embed` on a field whose type is not a record.
    #[error("{field}: embed field must be a record")]
    EmbedNotRecord { field: String },
    /// A branching argument whose record does not begin with a positional key.
    #[error("{field}: branching argument must start with exactly one positional key field")]
    BranchMissingKey { field: String },
    /// A branching argument with more than one positional.
    #[error("{field}: branching argument may not declare a second positional {positional}")]
    BranchExtraPositional { field: String, positional: String },
    /// The branch key positional repeats the branch's own name.
    #[error("{field}: branch key duplicates the branch name")]
    BranchKeyConflict { field: String },
    /// `negatable` on a non-boolean field.
    #[error("{field}: negatable requires a bool field")]
    NegatableNotBool { field: String },
    /// `short` on something other than a flag.
    #[error("{field}: short names are only valid on flags")]
    ShortOnNonFlag { field: String },
    /// A required positional declared after an optional one.
    #[error("{field}: required positional cannot follow optional positional {previous}")]
    RequiredAfterOptional { field: String, previous: String },
    /// A cumulative positional that is not the last positional of its node.
    #[error("{field}: cumulative positional must be the last positional")]
    CumulativeNotLast { field: String },
    /// `passthrough` on a field that is not a list positional.
    #[error("{field}: passthrough requires a cumulative positional")]
    PassthroughNotList { field: String },
    /// A field name that comes out empty after kebab-casing.
    #[error("field name cannot be empty")]
    EmptyName,
}

/// Convenience alias for results with [`SchemaError`].
pub type Result<T> = std::result::Result<T, SchemaError>;
