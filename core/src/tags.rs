//! Tag metadata attached to schema fields.
//!
//! Every field in a [`Schema`](crate::Schema) carries a [`TagSet`] describing
//! how the field participates in the grammar: whether it is a flag, a
//! positional argument, a subcommand, or an embedded group, plus naming,
//! defaults, environment variables, constraint groups, and separator
//! configuration.
//!
//! Tag sets can be built programmatically with the `with_*` methods, or parsed
//! from a compact tag string with [`TagSet::parse`]:
//!
//! ```
//! use arg_grammar_core::TagSet;
//!
//! let tags = TagSet::parse(r#"short:"v" help:"Enable verbose output." default:"false""#).unwrap();
//! assert_eq!(tags.short, Some('v'));
//! assert_eq!(tags.default.as_deref(), Some("false"));
//! ```
//!
//! The recognized key set is closed: `cmd`, `arg`, `embed`, `prefix`,
//! `envprefix`, `xorprefix`, `name`, `help`, `default`, `required`,
//! `optional`, `short`, `aliases`, `env`, `enum`, `negatable`, `hidden`,
//! `passthrough`, `sep`, `mapsep`, `placeholder`, `group`, `xor`, `and`,
//! `type`, and the exclusion marker `-`. Keys either stand alone (`required`)
//! or take a double-quoted value (`help:"..."`, with `\"` and `\\` escapes).
//! Unknown keys and malformed values are rejected.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised while parsing or validating a tag string.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TagError {
    /// A key outside the recognized tag vocabulary.
    #[error("unknown tag key: {0}")]
    UnknownKey(String),
    /// A key that requires a value appeared bare (e.g. `help`).
    #[error("tag `{0}` requires a value")]
    MissingValue(String),
    /// A key that must stand alone was given a value (e.g. `-:"x"`).
    #[error("tag `{0}` does not take a value")]
    UnexpectedValue(String),
    /// A value failed key-specific validation.
    #[error("tag `{key}` has invalid value `{value}`: {reason}")]
    InvalidValue {
        key: String,
        value: String,
        reason: String,
    },
    /// A quoted value was not terminated before the end of the string.
    #[error("unterminated quoted value in tag string")]
    UnterminatedQuote,
    /// Two tags that cannot coexist on one field (e.g. `cmd` and `arg`).
    #[error("tags `{0}` and `{1}` cannot be combined")]
    Conflict(&'static str, &'static str),
}

/// Passthrough capture mode for a list positional.
///
/// In `All` mode unknown flags are captured verbatim instead of reported,
/// and once the positional has captured its first token, flag parsing stops
/// entirely. `Partial` keeps the default validation rules: the positional's
/// schedule captures plain tokens exactly as an untagged list positional
/// would, and unknown flags are still errors. The mode is accepted for
/// schema compatibility and carried on the field spec; it does not change
/// parse behavior relative to `Off`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Passthrough {
    /// Normal validation; unknown flags are errors.
    #[default]
    Off,
    /// Same parse behavior as `Off`; marks the positional as a deliberate
    /// capture sink for plain tokens.
    Partial,
    /// Capture everything verbatim; flag parsing stops once capture begins.
    All,
}

/// How a boolean flag can be negated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Negation {
    /// Negated by `--no-<name>`.
    Default,
    /// Negated by a custom long name (e.g. `--standard` negating `--custom`).
    Named(String),
}

/// Separator discipline for list and map values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Sep {
    /// No splitting; each token is a single element.
    Disabled,
    /// Split on the given character (escapable with backslash).
    Char(char),
}

impl Sep {
    /// Default list separator (`,`).
    pub fn list_default() -> Self {
        Sep::Char(',')
    }

    /// Default map entry separator (`;`).
    pub fn map_default() -> Self {
        Sep::Char(';')
    }
}

/// Default-command marker on a subcommand field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DefaultMode {
    /// Selected when no sibling matches; may not own positionals or
    /// subcommands of its own.
    Fallback,
    /// Selected when no sibling matches and allowed to consume the
    /// unmatched token as its own flag or argument.
    WithArgs,
}

/// Parsed metadata for a single schema field.
///
/// All members are public so the introspector can interpret them directly;
/// construction goes through [`TagSet::parse`] or the builder methods.
///
/// # Examples
///
/// ```
/// use arg_grammar_core::{Passthrough, TagSet};
///
/// let tags = TagSet::default()
///     .with_short('o')
///     .with_help("Output file.")
///     .required();
/// assert!(tags.required);
///
/// let parsed = TagSet::parse(r#"arg passthrough:"all""#).unwrap();
/// assert!(parsed.arg);
/// assert_eq!(parsed.passthrough, Passthrough::All);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TagSet {
    /// Field is a subcommand (`cmd`).
    pub cmd: bool,
    /// Field is a positional argument or branching argument (`arg`).
    pub arg: bool,
    /// Field's record children are merged into the current node (`embed`).
    pub embed: bool,
    /// Field is excluded from the grammar (`-`).
    pub skip: bool,
    /// Override the kebab-cased name (`name`).
    pub name: Option<String>,
    /// Help text (`help`).
    pub help: Option<String>,
    /// Default literal for value fields, or the default-command marker for
    /// subcommands: `default:"1"` selects fallback mode, `default:"withargs"`
    /// allows the default command to consume arguments (`default`).
    pub default: Option<String>,
    /// Field must be set (`required`).
    pub required: bool,
    /// Field may be left unset (`optional`); positionals are required unless
    /// marked optional or given a default.
    pub optional: bool,
    /// Single-letter short flag (`short`).
    pub short: Option<char>,
    /// Additional long names (`aliases`, comma-separated).
    pub aliases: Vec<String>,
    /// Environment variable names consulted by the env resolver (`env`,
    /// comma-separated, in priority order).
    pub env: Vec<String>,
    /// Accepted values (`enum`, comma-separated).
    pub enum_values: Vec<String>,
    /// Boolean negation: bare `negatable` gives `--no-<name>`, a value gives
    /// a custom negation name.
    pub negation: Option<Negation>,
    /// Hidden from generated output (`hidden`).
    pub hidden: bool,
    /// Passthrough capture mode (`passthrough`, bare or `"partial"`/`"all"`).
    pub passthrough: Passthrough,
    /// List separator override (`sep`; `"none"` disables splitting).
    pub sep: Option<Sep>,
    /// Map entry separator override (`mapsep`; `"none"` disables splitting).
    pub mapsep: Option<Sep>,
    /// Placeholder shown in value position (`placeholder`).
    pub placeholder: Option<String>,
    /// Presentational group label (`group`).
    pub group: Option<String>,
    /// Mutual-exclusion group tags (`xor`, comma-separated).
    pub xor: Vec<String>,
    /// All-or-none group tags (`and`, comma-separated).
    pub and: Vec<String>,
    /// Flag-name prefix applied to embedded children (`prefix`).
    pub prefix: Option<String>,
    /// Env-name prefix applied to embedded children (`envprefix`).
    pub envprefix: Option<String>,
    /// Xor/and tag prefix applied to embedded children (`xorprefix`).
    pub xorprefix: Option<String>,
    /// Named decoder key overriding the type-driven lookup (`type`).
    pub decoder: Option<String>,
}

impl TagSet {
    /// Parses a tag string into a `TagSet`.
    ///
    /// The accepted forms are `key` for bare tags and `key:"value"` for
    /// valued tags, separated by whitespace. Inside quotes, `\"` and `\\`
    /// escape the quote and backslash.
    ///
    /// # Examples
    ///
    /// ```
    /// use arg_grammar_core::TagSet;
    ///
    /// let tags = TagSet::parse(r#"env:"HOME,USERPROFILE" enum:"json,yaml""#).unwrap();
    /// assert_eq!(tags.env, vec!["HOME".to_string(), "USERPROFILE".to_string()]);
    /// assert_eq!(tags.enum_values.len(), 2);
    ///
    /// assert!(TagSet::parse(r#"bogus:"x""#).is_err());
    /// ```
    pub fn parse(input: &str) -> Result<Self, TagError> {
        let mut tags = TagSet::default();
        for (key, value) in scan_pairs(input)? {
            tags.apply(&key, value)?;
        }
        tags.check_conflicts()?;
        Ok(tags)
    }

    fn apply(&mut self, key: &str, value: Option<String>) -> Result<(), TagError> {
        match key {
            "cmd" => self.set_bare(key, value, |t| t.cmd = true),
            "arg" => self.set_bare(key, value, |t| t.arg = true),
            "embed" => self.set_bare(key, value, |t| t.embed = true),
            "-" => self.set_bare(key, value, |t| t.skip = true),
            "required" => self.set_bare(key, value, |t| t.required = true),
            "optional" => self.set_bare(key, value, |t| t.optional = true),
            "hidden" => self.set_bare(key, value, |t| t.hidden = true),
            "name" => self.set_value(key, value, |t, v| t.name = Some(v)),
            "help" => self.set_value(key, value, |t, v| t.help = Some(v)),
            "default" => {
                // Bare `default` is allowed on subcommands as shorthand for
                // the fallback marker.
                self.default = Some(value.unwrap_or_else(|| "1".to_string()));
                Ok(())
            }
            "placeholder" => self.set_value(key, value, |t, v| t.placeholder = Some(v)),
            "group" => self.set_value(key, value, |t, v| t.group = Some(v)),
            "prefix" => self.set_value(key, value, |t, v| t.prefix = Some(v)),
            "envprefix" => self.set_value(key, value, |t, v| t.envprefix = Some(v)),
            "xorprefix" => self.set_value(key, value, |t, v| t.xorprefix = Some(v)),
            "type" => self.set_value(key, value, |t, v| t.decoder = Some(v)),
            "aliases" => self.set_list(key, value, |t, v| t.aliases = v),
            "env" => self.set_list(key, value, |t, v| t.env = v),
            "enum" => self.set_list(key, value, |t, v| t.enum_values = v),
            "xor" => self.set_list(key, value, |t, v| t.xor = v),
            "and" => self.set_list(key, value, |t, v| t.and = v),
            "short" => {
                let value = value.ok_or_else(|| TagError::MissingValue(key.to_string()))?;
                let mut chars = value.chars();
                match (chars.next(), chars.next()) {
                    (Some(c), None) => {
                        self.short = Some(c);
                        Ok(())
                    }
                    _ => Err(TagError::InvalidValue {
                        key: key.to_string(),
                        value,
                        reason: "expected a single character".to_string(),
                    }),
                }
            }
            "negatable" => {
                self.negation = Some(match value {
                    Some(custom) if !custom.is_empty() => Negation::Named(custom),
                    _ => Negation::Default,
                });
                Ok(())
            }
            "passthrough" => {
                self.passthrough = match value.as_deref() {
                    None | Some("") | Some("all") => Passthrough::All,
                    Some("partial") => Passthrough::Partial,
                    Some(other) => {
                        return Err(TagError::InvalidValue {
                            key: key.to_string(),
                            value: other.to_string(),
                            reason: "expected `partial` or `all`".to_string(),
                        });
                    }
                };
                Ok(())
            }
            "sep" => {
                let value = value.ok_or_else(|| TagError::MissingValue(key.to_string()))?;
                self.sep = Some(parse_sep(key, &value)?);
                Ok(())
            }
            "mapsep" => {
                let value = value.ok_or_else(|| TagError::MissingValue(key.to_string()))?;
                self.mapsep = Some(parse_sep(key, &value)?);
                Ok(())
            }
            other => Err(TagError::UnknownKey(other.to_string())),
        }
    }

    fn set_bare(
        &mut self,
        key: &str,
        value: Option<String>,
        set: impl FnOnce(&mut Self),
    ) -> Result<(), TagError> {
        match value {
            Some(v) if !v.is_empty() => Err(TagError::UnexpectedValue(format!("{key}:\"{v}\""))),
            _ => {
                set(self);
                Ok(())
            }
        }
    }

    fn set_value(
        &mut self,
        key: &str,
        value: Option<String>,
        set: impl FnOnce(&mut Self, String),
    ) -> Result<(), TagError> {
        let value = value.ok_or_else(|| TagError::MissingValue(key.to_string()))?;
        set(self, value);
        Ok(())
    }

    fn set_list(
        &mut self,
        key: &str,
        value: Option<String>,
        set: impl FnOnce(&mut Self, Vec<String>),
    ) -> Result<(), TagError> {
        let value = value.ok_or_else(|| TagError::MissingValue(key.to_string()))?;
        let items = value
            .split(',')
            .map(|item| item.trim().to_string())
            .filter(|item| !item.is_empty())
            .collect();
        set(self, items);
        Ok(())
    }

    fn check_conflicts(&self) -> Result<(), TagError> {
        if self.cmd && self.arg {
            return Err(TagError::Conflict("cmd", "arg"));
        }
        if self.cmd && self.embed {
            return Err(TagError::Conflict("cmd", "embed"));
        }
        if self.arg && self.embed {
            return Err(TagError::Conflict("arg", "embed"));
        }
        if self.required && self.optional {
            return Err(TagError::Conflict("required", "optional"));
        }
        Ok(())
    }

    /// Marks the field as a subcommand.
    pub fn command(mut self) -> Self {
        self.cmd = true;
        self
    }

    /// Marks the field as a positional (or branching) argument.
    pub fn argument(mut self) -> Self {
        self.arg = true;
        self
    }

    /// Merges the field's record children into the enclosing node.
    pub fn embedded(mut self) -> Self {
        self.embed = true;
        self
    }

    /// Excludes the field from the grammar.
    pub fn skipped(mut self) -> Self {
        self.skip = true;
        self
    }

    /// Overrides the derived kebab-case name.
    pub fn with_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }

    /// Adds help text.
    pub fn with_help(mut self, help: &str) -> Self {
        self.help = Some(help.to_string());
        self
    }

    /// Sets the default literal (or default-command marker).
    pub fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }

    /// Sets the single-letter short flag.
    pub fn with_short(mut self, short: char) -> Self {
        self.short = Some(short);
        self
    }

    /// Adds a long-name alias.
    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    /// Adds an environment variable consulted by the env resolver.
    pub fn with_env(mut self, var: &str) -> Self {
        self.env.push(var.to_string());
        self
    }

    /// Restricts the accepted values.
    pub fn with_enum<I, S>(mut self, values: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.enum_values = values.into_iter().map(Into::into).collect();
        self
    }

    /// Marks the field required.
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Marks the field optional.
    pub fn optional(mut self) -> Self {
        self.optional = true;
        self
    }

    /// Hides the field from generated output.
    pub fn hidden(mut self) -> Self {
        self.hidden = true;
        self
    }

    /// Makes a boolean flag negatable via `--no-<name>`.
    pub fn negatable(mut self) -> Self {
        self.negation = Some(Negation::Default);
        self
    }

    /// Makes a boolean flag negatable via a custom long name.
    pub fn negatable_as(mut self, name: &str) -> Self {
        self.negation = Some(Negation::Named(name.to_string()));
        self
    }

    /// Sets the passthrough capture mode.
    pub fn with_passthrough(mut self, mode: Passthrough) -> Self {
        self.passthrough = mode;
        self
    }

    /// Overrides the list separator.
    pub fn with_sep(mut self, sep: Sep) -> Self {
        self.sep = Some(sep);
        self
    }

    /// Overrides the map entry separator.
    pub fn with_mapsep(mut self, sep: Sep) -> Self {
        self.mapsep = Some(sep);
        self
    }

    /// Sets the value placeholder.
    pub fn with_placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = Some(placeholder.to_string());
        self
    }

    /// Sets the presentational group label.
    pub fn with_group(mut self, group: &str) -> Self {
        self.group = Some(group.to_string());
        self
    }

    /// Adds a mutual-exclusion group tag.
    pub fn with_xor(mut self, tag: &str) -> Self {
        self.xor.push(tag.to_string());
        self
    }

    /// Adds an all-or-none group tag.
    pub fn with_and(mut self, tag: &str) -> Self {
        self.and.push(tag.to_string());
        self
    }

    /// Selects a named decoder instead of the type-driven one.
    pub fn with_decoder(mut self, key: &str) -> Self {
        self.decoder = Some(key.to_string());
        self
    }

    /// Prefixes applied when this field is embedded.
    pub fn with_prefix(mut self, prefix: &str) -> Self {
        self.prefix = Some(prefix.to_string());
        self
    }

    /// Env-name prefix applied when this field is embedded.
    pub fn with_envprefix(mut self, prefix: &str) -> Self {
        self.envprefix = Some(prefix.to_string());
        self
    }

    /// Xor/and tag prefix applied when this field is embedded.
    pub fn with_xorprefix(mut self, prefix: &str) -> Self {
        self.xorprefix = Some(prefix.to_string());
        self
    }
}

fn parse_sep(key: &str, value: &str) -> Result<Sep, TagError> {
    if value == "none" {
        return Ok(Sep::Disabled);
    }
    let mut chars = value.chars();
    match (chars.next(), chars.next()) {
        (Some(c), None) => Ok(Sep::Char(c)),
        _ => Err(TagError::InvalidValue {
            key: key.to_string(),
            value: value.to_string(),
            reason: "expected a single character or `none`".to_string(),
        }),
    }
}

/// Splits a tag string into `(key, optional value)` pairs.
fn scan_pairs(input: &str) -> Result<Vec<(String, Option<String>)>, TagError> {
    let mut pairs = Vec::new();
    let mut chars = input.chars().peekable();

    loop {
        while matches!(chars.peek(), Some(c) if c.is_whitespace()) {
            chars.next();
        }
        let Some(&first) = chars.peek() else { break };

        let mut key = String::new();
        if first == '-' {
            key.push('-');
            chars.next();
        } else {
            while let Some(&c) = chars.peek() {
                if c.is_whitespace() || c == ':' {
                    break;
                }
                key.push(c);
                chars.next();
            }
        }

        if chars.peek() == Some(&':') {
            chars.next();
            if chars.next() != Some('"') {
                return Err(TagError::InvalidValue {
                    key: key.clone(),
                    value: String::new(),
                    reason: "expected a double-quoted value after `:`".to_string(),
                });
            }
            let mut value = String::new();
            loop {
                match chars.next() {
                    Some('\\') => match chars.next() {
                        Some('"') => value.push('"'),
                        Some('\\') => value.push('\\'),
                        Some(other) => {
                            value.push('\\');
                            value.push(other);
                        }
                        None => return Err(TagError::UnterminatedQuote),
                    },
                    Some('"') => break,
                    Some(c) => value.push(c),
                    None => return Err(TagError::UnterminatedQuote),
                }
            }
            pairs.push((key, Some(value)));
        } else {
            pairs.push((key, None));
        }
    }

    Ok(pairs)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_bare_and_valued_tags() {
        let tags = TagSet::parse(r#"arg required help:"An input file." short:"f""#).unwrap();
        assert!(tags.arg);
        assert!(tags.required);
        assert_eq!(tags.help.as_deref(), Some("An input file."));
        assert_eq!(tags.short, Some('f'));
    }

    #[test]
    fn test_parse_escaped_quotes() {
        let tags = TagSet::parse(r#"help:"say \"hi\" \\ bye""#).unwrap();
        assert_eq!(tags.help.as_deref(), Some(r#"say "hi" \ bye"#));
    }

    #[test]
    fn test_parse_comma_lists() {
        let tags = TagSet::parse(r#"enum:"red, green ,blue" xor:"a,b""#).unwrap();
        assert_eq!(tags.enum_values, vec!["red", "green", "blue"]);
        assert_eq!(tags.xor, vec!["a", "b"]);
    }

    #[test]
    fn test_parse_exclusion_marker() {
        let tags = TagSet::parse("-").unwrap();
        assert!(tags.skip);
    }

    #[test]
    fn test_parse_negatable_forms() {
        assert_eq!(
            TagSet::parse("negatable").unwrap().negation,
            Some(Negation::Default)
        );
        assert_eq!(
            TagSet::parse(r#"negatable:"standard""#).unwrap().negation,
            Some(Negation::Named("standard".to_string()))
        );
    }

    #[test]
    fn test_parse_passthrough_modes() {
        assert_eq!(
            TagSet::parse("passthrough").unwrap().passthrough,
            Passthrough::All
        );
        assert_eq!(
            TagSet::parse(r#"passthrough:"partial""#).unwrap().passthrough,
            Passthrough::Partial
        );
        assert!(TagSet::parse(r#"passthrough:"sometimes""#).is_err());
    }

    #[test]
    fn test_parse_sep_none() {
        let tags = TagSet::parse(r#"sep:"none" mapsep:"=""#).unwrap();
        assert_eq!(tags.sep, Some(Sep::Disabled));
        assert_eq!(tags.mapsep, Some(Sep::Char('=')));
    }

    #[test]
    fn test_unknown_key_rejected() {
        assert_eq!(
            TagSet::parse(r#"flagset:"arg""#),
            Err(TagError::UnknownKey("flagset".to_string()))
        );
    }

    #[test]
    fn test_conflicting_kinds_rejected() {
        assert_eq!(
            TagSet::parse("cmd arg"),
            Err(TagError::Conflict("cmd", "arg"))
        );
        assert_eq!(
            TagSet::parse("required optional"),
            Err(TagError::Conflict("required", "optional"))
        );
    }

    #[test]
    fn test_unterminated_quote() {
        assert_eq!(
            TagSet::parse(r#"help:"oops"#),
            Err(TagError::UnterminatedQuote)
        );
    }

    #[test]
    fn test_short_must_be_single_char() {
        assert!(TagSet::parse(r#"short:"vv""#).is_err());
    }
}
