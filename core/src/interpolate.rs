//! `${var}` interpolation inside tag values.
//!
//! Recognized tag values (help, default, env, enum, placeholder) may contain
//! `${name}` references that are substituted from a caller-supplied variable
//! map before the grammar is finalized. An unresolved reference is an error;
//! the builder surfaces it with the offending field attached.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

static VAR_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_][A-Za-z0-9_-]*)\}").expect("static regex must compile")
});

/// A `${name}` reference with no entry in the variable map.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("undefined variable ${{{0}}}")]
pub struct UnresolvedVariable(pub String);

/// Substitutes every `${name}` in `input` from `vars`.
///
/// # Examples
///
/// ```
/// use std::collections::HashMap;
/// use arg_grammar_core::interpolate;
///
/// let vars = HashMap::from([("version".to_string(), "1.2.3".to_string())]);
/// assert_eq!(
///     interpolate("release ${version}", &vars).unwrap(),
///     "release 1.2.3"
/// );
/// assert!(interpolate("${missing}", &vars).is_err());
/// ```
pub fn interpolate(
    input: &str,
    vars: &HashMap<String, String>,
) -> Result<String, UnresolvedVariable> {
    let mut out = String::with_capacity(input.len());
    let mut last = 0;
    for captures in VAR_RE.captures_iter(input) {
        let whole = captures.get(0).expect("regex match has group 0");
        let name = &captures[1];
        let Some(replacement) = vars.get(name) else {
            return Err(UnresolvedVariable(name.to_string()));
        };
        out.push_str(&input[last..whole.start()]);
        out.push_str(replacement);
        last = whole.end();
    }
    out.push_str(&input[last..]);
    Ok(out)
}

/// Whether `input` contains any `${name}` reference.
pub fn has_variables(input: &str) -> bool {
    VAR_RE.is_match(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_interpolate_multiple_references() {
        let vars = vars(&[("a", "1"), ("b", "2")]);
        assert_eq!(interpolate("${a}+${b}=${a}${b}", &vars).unwrap(), "1+2=12");
    }

    #[test]
    fn test_interpolate_passes_through_plain_text() {
        assert_eq!(
            interpolate("no variables here", &HashMap::new()).unwrap(),
            "no variables here"
        );
    }

    #[test]
    fn test_unresolved_reference_fails() {
        assert_eq!(
            interpolate("${nope}", &HashMap::new()),
            Err(UnresolvedVariable("nope".to_string()))
        );
    }

    #[test]
    fn test_has_variables() {
        assert!(has_variables("x ${y} z"));
        assert!(!has_variables("x $y z"));
        assert!(!has_variables("${}"));
    }
}
