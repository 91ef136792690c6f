//! Resolvers: external value sources consulted for unset fields.
//!
//! After the token stream is consumed, every reachable field that got no
//! parse-time value is offered to the resolver chain in registration order;
//! the first resolver that returns a raw string wins and the string is
//! decoded through the field's decoder. Only after the whole chain declines
//! does the literal default apply.
//!
//! The chain is seeded with [`EnvResolver`], which consults the field's
//! `env` tag variables in declaration order.

use thiserror::Error;

use arg_grammar_core::FieldSpec;

/// A resolver failure, surfaced with the field attached by the caller.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct ResolveError(pub String);

impl ResolveError {
    pub fn new(message: impl Into<String>) -> Self {
        ResolveError(message.into())
    }
}

/// An external source of raw field values (environment, config file, ...).
pub trait Resolver {
    /// Returns the raw value for `field`, or `None` to decline.
    fn resolve(&self, field: &FieldSpec) -> Result<Option<String>, ResolveError>;
}

/// Resolves fields from process environment variables named by their `env`
/// tags, first hit wins. Unset and empty variables both count as set; an
/// empty value decodes like any other.
pub struct EnvResolver;

impl Resolver for EnvResolver {
    fn resolve(&self, field: &FieldSpec) -> Result<Option<String>, ResolveError> {
        for var in &field.env {
            if let Ok(value) = std::env::var(var) {
                return Ok(Some(value));
            }
        }
        Ok(None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arg_grammar_core::{Field, Schema, TypeSpec, introspect};

    fn field_with_env(vars: &str) -> FieldSpec {
        let schema = Schema::new("app").field(
            Field::new("token", TypeSpec::String)
                .tagged(&format!(r#"env:"{vars}""#))
                .unwrap(),
        );
        introspect(&schema).unwrap().remove(0)
    }

    #[test]
    fn test_env_resolver_first_hit_wins() {
        let field = field_with_env("ARG_GRAMMAR_TEST_A,ARG_GRAMMAR_TEST_B");
        // SAFETY: test-only env mutation; tests touching the environment use
        // unique variable names.
        unsafe {
            std::env::set_var("ARG_GRAMMAR_TEST_A", "alpha");
            std::env::set_var("ARG_GRAMMAR_TEST_B", "beta");
        }
        let got = EnvResolver.resolve(&field).unwrap();
        assert_eq!(got.as_deref(), Some("alpha"));
        unsafe {
            std::env::remove_var("ARG_GRAMMAR_TEST_A");
        }
        let got = EnvResolver.resolve(&field).unwrap();
        assert_eq!(got.as_deref(), Some("beta"));
        unsafe {
            std::env::remove_var("ARG_GRAMMAR_TEST_B");
        }
    }

    #[test]
    fn test_env_resolver_declines_when_unset() {
        let field = field_with_env("ARG_GRAMMAR_TEST_UNSET");
        assert_eq!(EnvResolver.resolve(&field).unwrap(), None);
    }
}
