//! Hook pipeline primitives: phases, the binding bus, and callback scopes.
//!
//! Hooks fire along the selected path as the context applies values:
//! `BeforeReset` before fields are zeroed, `BeforeResolve` before the
//! resolver chain runs for a field, `BeforeApply` just before a value is
//! bound, `AfterApply` just after (exactly once per field per parse), a
//! node-level `Validate` once a node's fields are applied, and `AfterRun`
//! ascending the path after the command action returns.
//!
//! Callbacks receive a [`HookScope`] and pull any dependencies from the
//! [`Bus`] by type identity; a missing binding fails at invocation time.

use std::any::{Any, TypeId, type_name};
use std::collections::HashMap;

use arg_grammar_core::Value;

use crate::error::{BoxedError, HookError};

/// Lifecycle phase of a hook invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HookPhase {
    BeforeReset,
    BeforeResolve,
    BeforeApply,
    AfterApply,
    Validate,
    AfterRun,
}

/// Kind of the path element a hook observes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    App,
    Command,
    Branch,
    Positional,
    Flag,
}

/// Borrowed view of the element a hook fires for.
#[derive(Debug, Clone, Copy)]
pub struct ElementView<'a> {
    pub kind: ElementKind,
    /// Display name: `--flag`, `<positional>`, or the command name.
    pub name: &'a str,
    /// Dotted registration path of the element.
    pub path: &'a str,
}

/// Per-parse typed value store used for dependency injection.
///
/// Values are keyed by their `TypeId`; providing a second value of the same
/// type replaces the first. The bus lives for one parse+run cycle.
///
/// # Examples
///
/// ```
/// use arg_grammar_engine::Bus;
///
/// #[derive(Debug, PartialEq)]
/// struct Config(u32);
///
/// let mut bus = Bus::new();
/// bus.provide(Config(7));
/// assert_eq!(bus.get::<Config>(), Some(&Config(7)));
/// assert!(bus.resolve::<String>().is_err());
/// ```
#[derive(Default)]
pub struct Bus {
    entries: HashMap<TypeId, Box<dyn Any>>,
}

impl Bus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores a value, replacing any previous value of the same type.
    pub fn provide<T: Any>(&mut self, value: T) {
        self.entries.insert(TypeId::of::<T>(), Box::new(value));
    }

    /// Fetches a value by type, if provided.
    pub fn get<T: Any>(&self) -> Option<&T> {
        self.entries
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Fetches a value by type, failing the hook when absent.
    pub fn resolve<T: Any>(&self) -> Result<&T, HookError> {
        self.get::<T>().ok_or(HookError::MissingBinding {
            type_name: type_name::<T>(),
        })
    }
}

/// What a hook callback sees when it fires.
pub struct HookScope<'a> {
    pub phase: HookPhase,
    pub element: ElementView<'a>,
    /// The value being applied, for `BeforeApply`/`AfterApply`.
    pub value: Option<&'a Value>,
    pub bus: &'a mut Bus,
}

/// Result type for hooks, observers, and actions.
pub type HookResult = Result<(), BoxedError>;

/// A field- or node-level hook, or a global observer.
pub type HookFn = Box<dyn Fn(&mut HookScope<'_>) -> HookResult>;

/// What a command action sees when dispatched.
pub struct ActionScope<'a> {
    pub bus: &'a Bus,
    values: &'a std::collections::BTreeMap<String, Value>,
}

impl<'a> ActionScope<'a> {
    pub(crate) fn new(
        bus: &'a Bus,
        values: &'a std::collections::BTreeMap<String, Value>,
    ) -> Self {
        Self { bus, values }
    }

    /// Bound value for a dotted field path.
    pub fn value(&self, path: &str) -> Option<&Value> {
        self.values.get(path)
    }

    /// Injects a binding by type, failing when absent.
    pub fn resolve<T: Any>(&self) -> Result<&T, HookError> {
        self.bus.resolve::<T>()
    }
}

/// The deepest selected node's callable.
pub type ActionFn = Box<dyn Fn(&ActionScope<'_>) -> HookResult>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bus_round_trip() {
        let mut bus = Bus::new();
        bus.provide(42u32);
        bus.provide("hello".to_string());
        assert_eq!(bus.get::<u32>(), Some(&42));
        assert_eq!(bus.get::<String>().map(String::as_str), Some("hello"));
        assert_eq!(bus.get::<i64>(), None);
    }

    #[test]
    fn test_bus_replaces_same_type() {
        let mut bus = Bus::new();
        bus.provide(1u8);
        bus.provide(2u8);
        assert_eq!(bus.get::<u8>(), Some(&2));
    }

    #[test]
    fn test_resolve_missing_binding_is_error() {
        let bus = Bus::new();
        let err = bus.resolve::<Vec<u8>>().unwrap_err();
        assert!(err.to_string().contains("no binding of type"));
    }
}
