// src/core/collection.rs

use crate::{
    core::{
        condition::Condition,
        flags::Flag,
        value::{Cast, Value, ValueType},
    },
    error::Result,
};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Produces a default value on demand.
pub type Provider = Rc<dyn Fn() -> Value>;

struct CollectionState {
    name: String,
    values: Vec<Value>,
    limit: Option<usize>,
    cast: Option<Cast>,
    default: Option<Provider>,
    conditional_defaults: Vec<(Condition, Provider)>,
}

/// Ordered, optionally bounded storage for resolved values.
///
/// `Collection` is a shared handle: cloning it yields another reference to the same
/// storage, which is how two flags (or a flag and a parameter) funnel into a single
/// list. Within one parse the last writer wins; the engine is single-threaded so
/// there are never concurrent writers.
#[derive(Clone)]
pub struct Collection {
    inner: Rc<RefCell<CollectionState>>,
}

impl Collection {
    /// An anonymous collection; `None` means unbounded.
    pub fn new(limit: Option<usize>) -> Self {
        Self::named("", limit)
    }

    pub fn named(name: impl Into<String>, limit: Option<usize>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(CollectionState {
                name: name.into(),
                values: Vec::new(),
                limit,
                cast: None,
                default: None,
                conditional_defaults: Vec::new(),
            })),
        }
    }

    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    pub fn limit(&self) -> Option<usize> {
        self.inner.borrow().limit
    }

    pub fn set_limit(&self, limit: Option<usize>) {
        self.inner.borrow_mut().limit = limit;
    }

    pub fn len(&self) -> usize {
        self.inner.borrow().values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.borrow().values.is_empty()
    }

    /// Whether further writes would be rejected.
    pub fn is_full(&self) -> bool {
        let state = self.inner.borrow();
        state.limit.is_some_and(|limit| state.values.len() >= limit)
    }

    pub fn set_type(&self, value_type: ValueType) {
        self.inner.borrow_mut().cast = Some(value_type.into_cast());
    }

    /// Installs a custom per-element coercion.
    pub fn set_cast(&self, cast: impl Fn(&str) -> Result<Value> + 'static) {
        self.inner.borrow_mut().cast = Some(Rc::new(cast));
    }

    pub fn clear_type(&self) {
        self.inner.borrow_mut().cast = None;
    }

    /// Stores one token, coercing it first. Returns `false` when the collection is full.
    pub fn append(&self, token: &str) -> Result<bool> {
        if self.is_full() {
            return Ok(false);
        }
        let value = self.coerce(token)?;
        self.inner.borrow_mut().values.push(value);
        Ok(true)
    }

    /// Stores an already resolved value without coercion.
    pub fn push_value(&self, value: impl Into<Value>) -> bool {
        if self.is_full() {
            return false;
        }
        self.inner.borrow_mut().values.push(value.into());
        true
    }

    /// Stores tokens in order until the limit is reached and hands back the rest.
    pub fn extend<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<String>> {
        let mut overflow = Vec::new();
        for token in tokens {
            let token: &str = token.as_ref();
            if !overflow.is_empty() || !self.append(token)? {
                overflow.push(token.to_string());
            }
        }
        Ok(overflow)
    }

    pub fn contains(&self, value: &Value) -> bool {
        self.inner.borrow().values.iter().any(|v| v == value)
    }

    pub fn contains_str(&self, token: &str) -> bool {
        self.inner
            .borrow()
            .values
            .iter()
            .any(|v| v.as_str() == Some(token))
    }

    /// True when any of the flag's names has been stored.
    pub fn contains_flag(&self, flag: &Flag) -> bool {
        flag.names().iter().any(|name| self.contains_str(name))
    }

    pub fn clear(&self) {
        self.inner.borrow_mut().values.clear();
    }

    /// The stored values, ignoring defaults.
    pub fn values(&self) -> Vec<Value> {
        self.inner.borrow().values.clone()
    }

    /// Makes each flag record its primary name here when it gets activated.
    pub fn add_names_of(&self, flags: &[&Flag]) {
        for flag in flags {
            flag.when_active_add_name_to(self);
        }
    }

    // --- Defaults ---

    pub fn set_default(&self, value: impl Into<Value>) {
        let value = value.into();
        self.set_default_with(move || value.clone());
    }

    /// A plain default computed lazily on every read.
    pub fn set_default_with(&self, provider: impl Fn() -> Value + 'static) {
        self.inner.borrow_mut().default = Some(Rc::new(provider));
    }

    pub fn add_default_if(&self, provider: impl Fn() -> Value + 'static, condition: Condition) {
        self.inner
            .borrow_mut()
            .conditional_defaults
            .push((condition, Rc::new(provider)));
    }

    pub fn add_default_if_all(
        &self,
        provider: impl Fn() -> Value + 'static,
        conditions: impl IntoIterator<Item = Condition>,
    ) {
        self.add_default_if(provider, Condition::all(conditions));
    }

    pub fn add_default_if_any(
        &self,
        provider: impl Fn() -> Value + 'static,
        conditions: impl IntoIterator<Item = Condition>,
    ) {
        self.add_default_if(provider, Condition::any(conditions));
    }

    pub fn is_default_set(&self) -> bool {
        let state = self.inner.borrow();
        state.default.is_some() || !state.conditional_defaults.is_empty()
    }

    /// Resolves the current value.
    ///
    /// Stored values win. An empty collection falls back to the first conditional
    /// provider whose condition holds, then to the plain default. One-element results
    /// are unwrapped to the scalar.
    pub fn get(&self) -> Option<Value> {
        let stored = self.values();
        let resolved = if stored.is_empty() {
            self.resolve_default()?
        } else {
            Value::List(stored)
        };
        Some(unwrap_single(resolved))
    }

    fn resolve_default(&self) -> Option<Value> {
        // Release the borrow before running user closures.
        let (conditional, plain) = {
            let state = self.inner.borrow();
            (state.conditional_defaults.clone(), state.default.clone())
        };
        conditional
            .iter()
            .find(|(condition, _)| condition.evaluate())
            .map(|(_, provider)| provider())
            .or_else(|| plain.map(|provider| provider()))
    }

    fn coerce(&self, token: &str) -> Result<Value> {
        let cast = self.inner.borrow().cast.clone();
        match cast {
            Some(cast) => cast(token),
            None => Ok(Value::Str(token.to_string())),
        }
    }

    /// True when both handles point at the same storage.
    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

fn unwrap_single(value: Value) -> Value {
    match value {
        Value::List(mut items) if items.len() == 1 => items.remove(0),
        other => other,
    }
}

impl Default for Collection {
    fn default() -> Self {
        Self::new(None)
    }
}

impl fmt::Debug for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Collection")
            .field("name", &state.name)
            .field("values", &state.values)
            .field("limit", &state.limit)
            .field("typed", &state.cast.is_some())
            .field("default", &state.default.is_some())
            .field("conditional_defaults", &state.conditional_defaults.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CliError;

    #[test]
    fn test_extend_returns_overflow_in_order() {
        let collection = Collection::new(Some(2));
        let overflow = collection.extend(&["a", "b", "c", "d"]).unwrap();
        assert_eq!(overflow, vec!["c", "d"]);
        assert_eq!(collection.get(), Some(Value::from(vec!["a", "b"])));
        assert!(collection.is_full());
    }

    #[test]
    fn test_zero_limit_rejects_everything() {
        let collection = Collection::new(Some(0));
        assert!(!collection.append("x").unwrap());
        assert!(collection.is_empty());
    }

    #[test]
    fn test_single_element_is_unwrapped() {
        let collection = Collection::new(None);
        collection.append("pl").unwrap();
        assert_eq!(collection.get(), Some(Value::from("pl")));
    }

    #[test]
    fn test_typed_collection_coerces_and_propagates_errors() {
        let collection = Collection::new(None);
        collection.set_type(ValueType::Float);
        collection.extend(&["1.5", "2"]).unwrap();
        assert_eq!(
            collection.values(),
            vec![Value::Float(1.5), Value::Float(2.0)]
        );
        let err = collection.append("two").unwrap_err();
        assert!(matches!(err, CliError::InvalidValue { .. }));
    }

    #[test]
    fn test_custom_cast_normalizes_language_codes() {
        let collection = Collection::named("to_langs", None);
        collection.set_cast(|token| {
            if token.len() == 2 && token.chars().all(|c| c.is_ascii_alphabetic()) {
                Ok(Value::from(token.to_ascii_uppercase()))
            } else {
                Err(CliError::InvalidValue {
                    value: token.to_string(),
                    reason: "expected a two-letter language code".to_string(),
                })
            }
        });

        let overflow = collection.extend(&["en", "De"]).unwrap();
        assert!(overflow.is_empty());
        assert_eq!(collection.get(), Some(Value::from(vec!["EN", "DE"])));

        let err = collection.append("english").unwrap_err();
        assert!(matches!(err, CliError::InvalidValue { ref value, .. } if value == "english"));
        assert_eq!(collection.len(), 2);

        collection.clear_type();
        collection.append("fr").unwrap();
        assert!(collection.contains_str("fr"));
    }

    #[test]
    fn test_default_chain_picks_first_true_condition() {
        let collection = Collection::new(None);
        collection.add_default_if(|| Value::from("A"), Condition::constant(false));
        collection.add_default_if(|| Value::from("B"), Condition::constant(true));
        assert_eq!(collection.get(), Some(Value::from("B")));
    }

    #[test]
    fn test_default_chain_falls_back_to_plain_default() {
        let collection = Collection::new(None);
        collection.add_default_if(|| Value::from("A"), Condition::constant(false));
        assert!(collection.is_default_set());
        assert_eq!(collection.get(), None);

        collection.set_default("plain");
        assert_eq!(collection.get(), Some(Value::from("plain")));
    }

    #[test]
    fn test_stored_values_win_over_defaults() {
        let collection = Collection::new(None);
        collection.set_default(vec![1_i64]);
        assert_eq!(collection.get(), Some(Value::Int(1)));
        collection.append("7").unwrap();
        assert_eq!(collection.get(), Some(Value::from("7")));
        collection.clear();
        assert_eq!(collection.get(), Some(Value::Int(1)));
    }

    #[test]
    fn test_lazy_default_is_reevaluated() {
        let mode = Rc::new(RefCell::new("before".to_string()));
        let observed = mode.clone();
        let collection = Collection::named("modes", None);
        collection.set_default_with(move || Value::from(observed.borrow().clone()));
        assert_eq!(collection.get(), Some(Value::from("before")));
        *mode.borrow_mut() = "after".to_string();
        assert_eq!(collection.get(), Some(Value::from("after")));
    }

    #[test]
    fn test_clones_share_storage() {
        let words = Collection::named("words", None);
        let alias = words.clone();
        alias.append("test").unwrap();
        assert!(words.contains_str("test"));
        assert!(words.ptr_eq(&alias));
        assert!(!words.ptr_eq(&Collection::new(None)));
    }
}
