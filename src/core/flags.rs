// src/core/flags.rs

use crate::{
    core::{
        collection::Collection,
        condition::Condition,
        value::{Value, ValueType},
    },
    error::{CliError, ElementKind, Result},
};
use log::{debug, trace};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

type Hook = Rc<dyn Fn()>;

struct FlagState {
    name: String,
    aliases: Vec<String>,
    active: bool,
    limit: Option<usize>,
    storage: Collection,
    on_activation: Vec<Hook>,
}

/// An order-independent switch that may consume the tokens following it.
///
/// Like `Collection`, a `Flag` is a shared handle so activation predicates and
/// hooks can observe it while the registry owns it.
#[derive(Clone)]
pub struct Flag {
    inner: Rc<RefCell<FlagState>>,
}

impl Flag {
    /// A pure switch: its storage accepts no tokens.
    pub fn new(name: impl Into<String>) -> Self {
        Self::with_storage(name, Collection::new(Some(0)), None)
    }

    fn with_storage(name: impl Into<String>, storage: Collection, limit: Option<usize>) -> Self {
        Self {
            inner: Rc::new(RefCell::new(FlagState {
                name: name.into(),
                aliases: Vec::new(),
                active: false,
                limit,
                storage,
                on_activation: Vec::new(),
            })),
        }
    }

    pub fn name(&self) -> String {
        self.inner.borrow().name.clone()
    }

    /// Primary name first, then aliases in registration order.
    pub fn names(&self) -> Vec<String> {
        let state = self.inner.borrow();
        std::iter::once(state.name.clone())
            .chain(state.aliases.iter().cloned())
            .collect()
    }

    pub fn has_name(&self, name: &str) -> bool {
        let state = self.inner.borrow();
        state.name == name || state.aliases.iter().any(|alias| alias == name)
    }

    /// Unchecked; public callers go through `FlagRegistry::add_aliases`.
    pub(crate) fn add_aliases(&self, aliases: &[&str]) {
        let mut state = self.inner.borrow_mut();
        for alias in aliases {
            if state.name != *alias && !state.aliases.iter().any(|a| a == *alias) {
                state.aliases.push((*alias).to_string());
            }
        }
    }

    // --- Activation ---

    pub fn is_active(&self) -> bool {
        self.inner.borrow().active
    }

    /// Turns the flag on and runs its activation hooks in registration order.
    ///
    /// Hooks only run on the off-to-on transition, so flags that turn each other on
    /// settle after one round.
    pub fn activate(&self) {
        let hooks = {
            let mut state = self.inner.borrow_mut();
            if state.active {
                return;
            }
            state.active = true;
            state.on_activation.clone()
        };
        for hook in hooks {
            hook();
        }
    }

    pub fn deactivate(&self) {
        self.inner.borrow_mut().active = false;
    }

    pub fn when_active(&self, hook: impl Fn() + 'static) {
        self.inner.borrow_mut().on_activation.push(Rc::new(hook));
    }

    /// Records the primary name in `collection` every time the flag is activated.
    pub fn when_active_add_name_to(&self, collection: &Collection) {
        let collection = collection.clone();
        let name = self.name();
        self.when_active(move || {
            if !collection.push_value(name.as_str()) {
                debug!("Collection '{}' is full, flag '{}' not recorded", collection.name(), name);
            }
        });
    }

    pub fn when_active_turn_on(&self, others: &[&Flag]) {
        let others: Vec<Flag> = others.iter().map(|f| (*f).clone()).collect();
        self.when_active(move || others.iter().for_each(Flag::activate));
    }

    pub fn when_active_turn_off(&self, others: &[&Flag]) {
        let others: Vec<Flag> = others.iter().map(|f| (*f).clone()).collect();
        self.when_active(move || others.iter().for_each(Flag::deactivate));
    }

    pub fn condition(&self) -> Condition {
        Condition::flag(self)
    }

    // --- Limits and storage ---

    /// Maximum number of tokens this flag may consume; `None` is unbounded.
    pub fn limit(&self) -> Option<usize> {
        self.inner.borrow().limit
    }

    pub fn set_limit(&self, limit: Option<usize>) {
        self.inner.borrow_mut().limit = limit;
    }

    /// Sets the limit and re-points the flag to an external storage.
    pub fn set_limit_with_storage(&self, limit: Option<usize>, storage: &Collection) {
        let mut state = self.inner.borrow_mut();
        state.limit = limit;
        state.storage = storage.clone();
    }

    pub fn storage(&self) -> Collection {
        self.inner.borrow().storage.clone()
    }

    pub fn set_storage(&self, storage: &Collection) {
        self.inner.borrow_mut().storage = storage.clone();
    }

    pub fn storage_limit(&self) -> Option<usize> {
        self.storage().limit()
    }

    pub fn set_storage_limit(&self, limit: Option<usize>) {
        self.storage().set_limit(limit);
    }

    pub fn set_type(&self, value_type: ValueType) {
        self.storage().set_type(value_type);
    }

    pub fn set_default(&self, value: impl Into<Value>) {
        self.storage().set_default(value);
    }

    pub fn add_default_if(&self, provider: impl Fn() -> Value + 'static, condition: Condition) {
        self.storage().add_default_if(provider, condition);
    }

    pub fn is_default_set(&self) -> bool {
        self.storage().is_default_set()
    }

    /// Offers the chunk to the storage and returns the tokens it did not take.
    ///
    /// At most `limit` tokens are offered; storage overflow comes back first, then
    /// the tokens past the limit, so encounter order is preserved.
    pub fn consume(&self, tokens: &[String]) -> Result<Vec<String>> {
        let offered = self.limit().map_or(tokens.len(), |l| l.min(tokens.len()));
        let (taken, beyond) = tokens.split_at(offered);
        let mut rest = self.storage().extend(taken)?;
        rest.extend(beyond.iter().cloned());
        trace!(
            "Flag '{}' consumed {} token(s), returned {}",
            self.name(),
            tokens.len() - rest.len(),
            rest.len()
        );
        Ok(rest)
    }

    /// The storage value, truncated to the flag's own limit.
    pub fn get(&self) -> Option<Value> {
        truncate_to_limit(self.storage().get(), self.limit())
    }

    pub fn reset(&self) {
        self.deactivate();
        self.storage().clear();
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

/// Applies a per-element limit to a storage read, unwrapping single values.
pub(crate) fn truncate_to_limit(value: Option<Value>, limit: Option<usize>) -> Option<Value> {
    match (value?, limit) {
        (Value::List(mut items), Some(limit)) if limit < items.len() => {
            items.truncate(limit);
            match items.len() {
                0 => None,
                1 => items.pop(),
                _ => Some(Value::List(items)),
            }
        }
        (value, _) => Some(value),
    }
}

impl fmt::Debug for Flag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Flag")
            .field("name", &state.name)
            .field("aliases", &state.aliases)
            .field("active", &state.active)
            .field("limit", &state.limit)
            .field("storage", &state.storage)
            .finish()
    }
}

/// Registration options for `FlagRegistry::register`.
///
/// Without options a flag is a pure switch. Supplying an external `storage` together
/// with a `storage_limit` or a `default` is rejected, since those belong to the
/// storage's owner.
#[derive(Debug, Clone, Default)]
pub struct FlagOptions {
    storage: Option<Collection>,
    storage_limit: Option<Option<usize>>,
    flag_limit: Option<usize>,
    default: Option<Value>,
}

impl FlagOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// A flag with its own unbounded storage that takes every following token.
    pub fn unbounded() -> Self {
        Self::new().storage_limit(None)
    }

    pub fn storage(mut self, storage: &Collection) -> Self {
        self.storage = Some(storage.clone());
        self
    }

    pub fn storage_limit(mut self, limit: Option<usize>) -> Self {
        self.storage_limit = Some(limit);
        self
    }

    pub fn flag_limit(mut self, limit: Option<usize>) -> Self {
        self.flag_limit = limit;
        self
    }

    pub fn default_value(mut self, value: impl Into<Value>) -> Self {
        self.default = Some(value.into());
        self
    }

    fn build(self, name: &str, aliases: &[&str]) -> Result<Flag> {
        let storage = match self.storage {
            Some(storage) => {
                if self.storage_limit.is_some() || self.default.is_some() {
                    return Err(CliError::Configuration(format!(
                        "flag '{}' was given an external storage together with a storage limit or default",
                        name
                    )));
                }
                storage
            }
            None => {
                let storage = Collection::named(name, self.storage_limit.unwrap_or(Some(0)));
                if let Some(default) = self.default {
                    storage.set_default(default);
                }
                storage
            }
        };
        let flag = Flag::with_storage(name, storage, self.flag_limit);
        flag.add_aliases(aliases);
        Ok(flag)
    }
}

/// A flag-owned run of tokens: the flag token itself and what follows it up to
/// the next flag token.
#[derive(Debug, Clone)]
pub struct FlagChunk {
    pub flag: Flag,
    pub token: String,
    pub args: Vec<String>,
}

/// Per-node set of flags, looked up by primary name or alias.
#[derive(Debug, Default)]
pub struct FlagRegistry {
    flags: Vec<Flag>,
}

impl FlagRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str, aliases: &[&str], options: FlagOptions) -> Result<Flag> {
        let flag = options.build(name, aliases)?;
        self.add(flag)
    }

    /// Registers a flag built elsewhere (e.g. one shared with another node).
    pub fn add(&mut self, flag: Flag) -> Result<Flag> {
        if let Some(taken) = flag.names().into_iter().find(|n| self.contains(n)) {
            return Err(CliError::collision(ElementKind::Flag, taken));
        }
        debug!("Registered flag {:?}", flag.names());
        self.flags.push(flag.clone());
        Ok(flag)
    }

    /// Gives a registered flag more names, rejecting any that another flag uses.
    pub fn add_aliases(&self, name: &str, aliases: &[&str]) -> Result<Flag> {
        let flag = self.get(name)?;
        if let Some(taken) = aliases
            .iter()
            .find(|alias| self.find(alias).is_some_and(|owner| !owner.ptr_eq(&flag)))
        {
            return Err(CliError::collision(ElementKind::Flag, *taken));
        }
        flag.add_aliases(aliases);
        Ok(flag)
    }

    pub fn find(&self, name: &str) -> Option<&Flag> {
        self.flags.iter().find(|flag| flag.has_name(name))
    }

    pub fn get(&self, name: &str) -> Result<Flag> {
        self.find(name)
            .cloned()
            .ok_or_else(|| CliError::unknown(ElementKind::Flag, name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.flags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Flag> {
        self.flags.iter()
    }

    /// Splits `tokens` into the leading positional run and one chunk per flag token.
    pub fn chunk<S: AsRef<str>>(&self, tokens: &[S]) -> (Vec<String>, Vec<FlagChunk>) {
        let mut leading = Vec::new();
        let mut chunks: Vec<FlagChunk> = Vec::new();
        for token in tokens {
            let token: &str = token.as_ref();
            if let Some(flag) = self.find(token) {
                chunks.push(FlagChunk {
                    flag: flag.clone(),
                    token: token.to_string(),
                    args: Vec::new(),
                });
            } else if let Some(current) = chunks.last_mut() {
                current.args.push(token.to_string());
            } else {
                leading.push(token.to_string());
            }
        }
        (leading, chunks)
    }

    /// Activates every flag found in `tokens`, lets it consume its chunk, and returns
    /// the positional tokens: the leading run followed by each chunk's carry-over.
    pub fn segment_and_strip<S: AsRef<str>>(&self, tokens: &[S]) -> Result<Vec<String>> {
        let (mut positional, chunks) = self.chunk(tokens);
        for chunk in chunks {
            debug!("Flag '{}' found with {} argument(s)", chunk.token, chunk.args.len());
            chunk.flag.activate();
            positional.extend(chunk.flag.consume(&chunk.args)?);
        }
        Ok(positional)
    }

    pub fn reset(&self) {
        self.flags.iter().for_each(Flag::reset);
    }
}
