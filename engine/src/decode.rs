//! Decoders: from tokens to typed values.
//!
//! A [`Decode`] implementation consumes value tokens from the scanner and
//! yields a [`Value`]. The registry maps semantic types to built-in decoders
//! and holds user-registered decoders selected by the `type` tag or by a
//! `Custom` type spec.
//!
//! List and map decoders split a single value token on the configured
//! separator (backslash escapes it) and accumulate across repeated flag
//! occurrences; `sep:"none"` disables splitting so each token contributes
//! one element.

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use thiserror::Error;
use tracing::debug;

use arg_grammar_core::{FieldSpec, Sep, TypeSpec, Value};

use crate::scan::{Scanner, Token, TokenKind};

/// A value-level decode failure; the state machine attaches the flag or
/// positional context.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{0}")]
pub struct DecodeError(pub String);

impl DecodeError {
    pub fn new(message: impl Into<String>) -> Self {
        DecodeError(message.into())
    }
}

/// Everything a decoder may touch while decoding one occurrence.
pub struct DecodeContext<'a> {
    pub scanner: &'a mut Scanner,
    /// List separator for this field.
    pub sep: Sep,
    /// Map entry separator for this field.
    pub mapsep: Sep,
    /// Previously accumulated value for cumulative fields.
    pub existing: Option<Value>,
    /// Accept hyphen-prefixed tokens as values.
    pub allow_hyphen: bool,
}

impl DecodeContext<'_> {
    /// Pops the next token as a value, rejecting flag-shaped tokens unless
    /// they came from `--k=v` splitting or hyphen values are allowed.
    pub fn take_value(&mut self) -> Result<String, DecodeError> {
        match self.scanner.peek() {
            None => Err(DecodeError::new("missing value")),
            Some(token) => {
                let acceptable = match token.kind {
                    TokenKind::Value | TokenKind::Literal => true,
                    TokenKind::Untyped => !token.is_flag_like() || self.allow_hyphen,
                };
                if acceptable {
                    Ok(self.scanner.pop().expect("peeked token").text)
                } else {
                    Err(DecodeError::new(format!(
                        "expected a value but got flag {}",
                        token.text
                    )))
                }
            }
        }
    }

    /// Whether an explicit `=`-supplied value is queued next.
    pub fn has_explicit_value(&self) -> bool {
        self.scanner
            .peek()
            .is_some_and(|t| t.kind == TokenKind::Value)
    }
}

/// Decodes tokens into values for one field occurrence.
pub trait Decode {
    fn decode(&self, ctx: &mut DecodeContext<'_>) -> Result<Value, DecodeError>;

    /// Advisory: whether repeated occurrences accumulate instead of
    /// overwriting.
    fn is_cumulative(&self) -> bool {
        false
    }
}

/// Decodes a bare string literal through a decoder, outside any scanner.
///
/// Used for default literals and resolver-produced values, so they take the
/// same path (and the same separator splitting) as command-line input.
pub fn decode_literal(
    decoder: &dyn Decode,
    raw: &str,
    sep: Sep,
    mapsep: Sep,
) -> Result<Value, DecodeError> {
    let mut scanner = Scanner::default();
    scanner.push(Token::value(raw));
    let mut ctx = DecodeContext {
        scanner: &mut scanner,
        sep,
        mapsep,
        existing: None,
        allow_hyphen: true,
    };
    decoder.decode(&mut ctx)
}

/// Splits `input` on `sep`, honoring backslash escapes of the separator.
pub(crate) fn split_escaped(input: &str, sep: char) -> Vec<String> {
    let mut pieces = Vec::new();
    let mut current = String::new();
    let mut chars = input.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '\\' && chars.peek() == Some(&sep) {
            current.push(sep);
            chars.next();
        } else if ch == sep {
            pieces.push(std::mem::take(&mut current));
        } else {
            current.push(ch);
        }
    }
    pieces.push(current);
    pieces
}

struct BoolDecoder;

impl Decode for BoolDecoder {
    fn decode(&self, ctx: &mut DecodeContext<'_>) -> Result<Value, DecodeError> {
        if !ctx.has_explicit_value() {
            // A bare boolean flag never consumes the following token.
            return Ok(Value::Bool(true));
        }
        let raw = ctx.take_value()?;
        match raw.as_str() {
            "true" | "1" | "yes" => Ok(Value::Bool(true)),
            "false" | "0" | "no" => Ok(Value::Bool(false)),
            other => Err(DecodeError::new(format!("invalid boolean \"{other}\""))),
        }
    }
}

struct IntDecoder;

impl Decode for IntDecoder {
    fn decode(&self, ctx: &mut DecodeContext<'_>) -> Result<Value, DecodeError> {
        let raw = ctx.take_value()?;
        raw.parse::<i64>()
            .map(Value::Int)
            .map_err(|_| DecodeError::new(format!("invalid integer \"{raw}\"")))
    }
}

struct FloatDecoder;

impl Decode for FloatDecoder {
    fn decode(&self, ctx: &mut DecodeContext<'_>) -> Result<Value, DecodeError> {
        let raw = ctx.take_value()?;
        raw.parse::<f64>()
            .map(Value::Float)
            .map_err(|_| DecodeError::new(format!("invalid number \"{raw}\"")))
    }
}

struct StringDecoder;

impl Decode for StringDecoder {
    fn decode(&self, ctx: &mut DecodeContext<'_>) -> Result<Value, DecodeError> {
        ctx.take_value().map(Value::Str)
    }
}

struct ListDecoder {
    inner: Arc<dyn Decode>,
}

impl Decode for ListDecoder {
    fn decode(&self, ctx: &mut DecodeContext<'_>) -> Result<Value, DecodeError> {
        let raw = ctx.take_value()?;
        let pieces = match ctx.sep {
            Sep::Disabled => vec![raw],
            Sep::Char(sep) => split_escaped(&raw, sep),
        };
        let mut items = match ctx.existing.take() {
            Some(Value::List(items)) => items,
            _ => Vec::new(),
        };
        for piece in pieces {
            items.push(decode_literal(
                self.inner.as_ref(),
                &piece,
                Sep::Disabled,
                ctx.mapsep,
            )?);
        }
        Ok(Value::List(items))
    }

    fn is_cumulative(&self) -> bool {
        true
    }
}

struct MapDecoder {
    inner: Arc<dyn Decode>,
}

impl Decode for MapDecoder {
    fn decode(&self, ctx: &mut DecodeContext<'_>) -> Result<Value, DecodeError> {
        let raw = ctx.take_value()?;
        let entries = match ctx.mapsep {
            Sep::Disabled => vec![raw],
            Sep::Char(sep) => split_escaped(&raw, sep),
        };
        let mut map = match ctx.existing.take() {
            Some(Value::Map(map)) => map,
            _ => BTreeMap::new(),
        };
        for entry in entries {
            let Some((key, value)) = entry.split_once('=') else {
                return Err(DecodeError::new(format!(
                    "expected key=value but got \"{entry}\""
                )));
            };
            map.insert(
                key.to_string(),
                decode_literal(self.inner.as_ref(), value, Sep::Disabled, ctx.mapsep)?,
            );
        }
        Ok(Value::Map(map))
    }

    fn is_cumulative(&self) -> bool {
        true
    }
}

/// Maps semantic types and `type`-tag keys to decoders.
#[derive(Default)]
pub struct DecoderRegistry {
    custom: HashMap<String, Arc<dyn Decode>>,
}

impl DecoderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a named decoder, selectable via `type:"key"` tags or
    /// `TypeSpec::Custom` fields.
    pub fn register(&mut self, key: impl Into<String>, decoder: Arc<dyn Decode>) {
        let key = key.into();
        debug!(key = %key, "registered custom decoder");
        self.custom.insert(key, decoder);
    }

    /// Looks up the decoder for a field, honoring a `type` tag override.
    pub fn lookup(&self, spec: &FieldSpec) -> Option<Arc<dyn Decode>> {
        if let Some(key) = &spec.decoder {
            return self.custom.get(key).cloned();
        }
        self.for_type(&spec.ty)
    }

    /// Type-shape-driven decoder lookup.
    pub fn for_type(&self, ty: &TypeSpec) -> Option<Arc<dyn Decode>> {
        match ty.unwrapped() {
            TypeSpec::Bool => Some(Arc::new(BoolDecoder)),
            TypeSpec::Int => Some(Arc::new(IntDecoder)),
            TypeSpec::Float => Some(Arc::new(FloatDecoder)),
            TypeSpec::String => Some(Arc::new(StringDecoder)),
            TypeSpec::List(inner) => Some(Arc::new(ListDecoder {
                inner: self.for_type(inner)?,
            })),
            TypeSpec::Map(value) => Some(Arc::new(MapDecoder {
                inner: self.for_type(value)?,
            })),
            TypeSpec::Custom(key) => self.custom.get(key).cloned(),
            TypeSpec::Record(_) => None,
            TypeSpec::Optional(_) => unreachable!("unwrapped() strips Optional"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> DecoderRegistry {
        DecoderRegistry::new()
    }

    #[test]
    fn test_split_escaped() {
        assert_eq!(split_escaped("a,b,c", ','), vec!["a", "b", "c"]);
        assert_eq!(split_escaped(r"a\,b,c", ','), vec!["a,b", "c"]);
        assert_eq!(split_escaped("", ','), vec![""]);
        assert_eq!(split_escaped(r"x\;y", ';'), vec!["x;y"]);
    }

    #[test]
    fn test_scalar_decoders() {
        let registry = registry();
        let int = registry.for_type(&TypeSpec::Int).unwrap();
        assert_eq!(
            decode_literal(int.as_ref(), "42", Sep::list_default(), Sep::map_default()).unwrap(),
            Value::Int(42)
        );
        assert!(
            decode_literal(int.as_ref(), "forty", Sep::list_default(), Sep::map_default())
                .is_err()
        );

        let boolean = registry.for_type(&TypeSpec::Bool).unwrap();
        assert_eq!(
            decode_literal(boolean.as_ref(), "false", Sep::list_default(), Sep::map_default())
                .unwrap(),
            Value::Bool(false)
        );
    }

    #[test]
    fn test_list_decoder_splits_and_accumulates() {
        let registry = registry();
        let list = registry
            .for_type(&TypeSpec::List(Box::new(TypeSpec::String)))
            .unwrap();

        let mut scanner = Scanner::default();
        scanner.push(Token::value("a,b"));
        let mut ctx = DecodeContext {
            scanner: &mut scanner,
            sep: Sep::list_default(),
            mapsep: Sep::map_default(),
            existing: Some(Value::List(vec![Value::Str("z".into())])),
            allow_hyphen: false,
        };
        let value = list.decode(&mut ctx).unwrap();
        assert_eq!(
            value,
            Value::List(vec![
                Value::Str("z".into()),
                Value::Str("a".into()),
                Value::Str("b".into()),
            ])
        );
        assert!(list.is_cumulative());
    }

    #[test]
    fn test_list_decoder_sep_none() {
        let registry = registry();
        let list = registry
            .for_type(&TypeSpec::List(Box::new(TypeSpec::String)))
            .unwrap();
        let value =
            decode_literal(list.as_ref(), "a,b", Sep::Disabled, Sep::map_default()).unwrap();
        assert_eq!(value, Value::List(vec![Value::Str("a,b".into())]));
    }

    #[test]
    fn test_map_decoder() {
        let registry = registry();
        let map = registry
            .for_type(&TypeSpec::Map(Box::new(TypeSpec::Int)))
            .unwrap();
        let value =
            decode_literal(map.as_ref(), "a=1;b=2", Sep::list_default(), Sep::map_default())
                .unwrap();
        let entries = value.as_map().unwrap();
        assert_eq!(entries["a"], Value::Int(1));
        assert_eq!(entries["b"], Value::Int(2));

        assert!(
            decode_literal(map.as_ref(), "nokey", Sep::list_default(), Sep::map_default())
                .is_err()
        );
    }

    #[test]
    fn test_bool_does_not_consume_untyped_token() {
        let registry = registry();
        let boolean = registry.for_type(&TypeSpec::Bool).unwrap();
        let mut scanner = Scanner::new(["next-positional"]);
        let mut ctx = DecodeContext {
            scanner: &mut scanner,
            sep: Sep::list_default(),
            mapsep: Sep::map_default(),
            existing: None,
            allow_hyphen: false,
        };
        assert_eq!(boolean.decode(&mut ctx).unwrap(), Value::Bool(true));
        assert_eq!(scanner.len(), 1);
    }

    #[test]
    fn test_custom_decoder_registration() {
        struct Upper;
        impl Decode for Upper {
            fn decode(&self, ctx: &mut DecodeContext<'_>) -> Result<Value, DecodeError> {
                Ok(Value::Str(ctx.take_value()?.to_uppercase()))
            }
        }
        let mut registry = registry();
        registry.register("upper", Arc::new(Upper));
        let dec = registry
            .for_type(&TypeSpec::Custom("upper".to_string()))
            .unwrap();
        assert_eq!(
            decode_literal(dec.as_ref(), "abc", Sep::list_default(), Sep::map_default()).unwrap(),
            Value::Str("ABC".into())
        );
    }

    #[test]
    fn test_take_value_rejects_flags() {
        let mut scanner = Scanner::new(["--next"]);
        let mut ctx = DecodeContext {
            scanner: &mut scanner,
            sep: Sep::list_default(),
            mapsep: Sep::map_default(),
            existing: None,
            allow_hyphen: false,
        };
        assert!(ctx.take_value().is_err());
        ctx.allow_hyphen = true;
        assert_eq!(ctx.take_value().unwrap(), "--next");
    }
}
