// src/core/parameters.rs

use crate::{
    core::{
        collection::Collection,
        condition::Condition,
        flags::truncate_to_limit,
        value::{Value, ValueType},
    },
    error::{CliError, ElementKind, Result},
};
use log::{debug, trace};
use std::borrow::Cow;
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::fmt;
use std::rc::Rc;

// --- DATA STRUCTS ---

struct ParameterState {
    name: String,
    limit: Option<usize>,
    storage: Collection,
    active: bool,
}

/// A named positional slot, filled by matching an arity template.
///
/// Parameters start active and stay active unless deactivated explicitly; an
/// inactive parameter is the first candidate to be skipped when too few tokens are
/// supplied.
#[derive(Clone)]
pub struct Parameter {
    inner: Rc<RefCell<ParameterState>>,
}

impl Parameter {
    /// A scalar parameter with its own one-element storage.
    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        let storage = Collection::named(name.clone(), Some(1));
        Self::with_storage(name, &storage)
    }

    pub fn with_storage(name: impl Into<String>, storage: &Collection) -> Self {
        Self {
            inner: Rc::new(RefCell::new(ParameterState {
                name: name.into(),
                limit: Some(1),
                storage: storage.clone(),
                active: true,
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

    /// Lifts both limits so the parameter reads and stores a whole list.
    pub fn to_list(&self) {
        self.set_limit(None);
        self.set_storage_limit(None);
    }

    pub fn is_active(&self) -> bool {
        self.inner.borrow().active
    }

    pub fn activate(&self) {
        self.inner.borrow_mut().active = true;
    }

    pub fn deactivate(&self) {
        self.inner.borrow_mut().active = false;
    }

    pub fn set_type(&self, value_type: ValueType) {
        self.storage().set_type(value_type);
    }

    pub fn set_default(&self, value: impl Into<Value>) {
        self.storage().set_default(value);
    }

    pub fn set_default_with(&self, provider: impl Fn() -> Value + 'static) {
        self.storage().set_default_with(provider);
    }

    pub fn add_default_if(&self, provider: impl Fn() -> Value + 'static, condition: Condition) {
        self.storage().add_default_if(provider, condition);
    }

    pub fn add_default_if_any(
        &self,
        provider: impl Fn() -> Value + 'static,
        conditions: impl IntoIterator<Item = Condition>,
    ) {
        self.storage().add_default_if_any(provider, conditions);
    }

    pub fn is_default_set(&self) -> bool {
        self.storage().is_default_set()
    }

    /// Optional parameters may be skipped: they have a default or were deactivated.
    pub fn is_optional(&self) -> bool {
        self.is_default_set() || !self.is_active()
    }

    /// Stores tokens, returning whatever the storage rejected.
    pub fn add_to_values(&self, tokens: &[String]) -> Result<Vec<String>> {
        self.storage().extend(tokens)
    }

    /// The storage value, truncated to the parameter's own limit.
    pub fn get(&self) -> Option<Value> {
        truncate_to_limit(self.storage().get(), self.limit())
    }

    pub fn reset(&self) {
        self.activate();
        self.storage().clear();
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let state = self.inner.borrow();
        f.debug_struct("Parameter")
            .field("name", &state.name)
            .field("limit", &state.limit)
            .field("active", &state.active)
            .field("storage", &state.storage)
            .finish()
    }
}

/// The parameters of a node plus the arity templates that order them.
#[derive(Debug, Default)]
pub struct ParamRegistry {
    params: Vec<Parameter>,
    /// Template arity (number of names) to the ordered parameter names.
    orders: BTreeMap<usize, Vec<String>>,
    /// Parameters skipped first when fewer tokens than a template needs are given.
    default_order: Vec<String>,
}

// --- REGISTRATION ---

impl ParamRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, name: &str) -> Result<Parameter> {
        self.add(Parameter::new(name))
    }

    pub fn register_with_storage(&mut self, name: &str, storage: &Collection) -> Result<Parameter> {
        self.add(Parameter::with_storage(name, storage))
    }

    /// Registers a parameter built elsewhere, e.g. one shared between sibling nodes.
    pub fn add(&mut self, param: Parameter) -> Result<Parameter> {
        let name = param.name();
        if self.contains(&name) {
            return Err(CliError::collision(ElementKind::Parameter, name));
        }
        self.params.push(param.clone());
        Ok(param)
    }

    pub fn find(&self, name: &str) -> Option<&Parameter> {
        self.params.iter().find(|p| p.inner.borrow().name == name)
    }

    pub fn get(&self, name: &str) -> Result<Parameter> {
        self.find(name)
            .cloned()
            .ok_or_else(|| CliError::unknown(ElementKind::Parameter, name))
    }

    pub fn contains(&self, name: &str) -> bool {
        self.find(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameters in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter()
    }

    /// Registers an arity template from a space separated list of names.
    ///
    /// Names without a matching parameter register one. An empty line is the
    /// zero-arity template.
    pub fn set_params_order(&mut self, line: &str) -> Result<()> {
        let names: Vec<String> = line.split_whitespace().map(String::from).collect();
        let arity = names.len();
        if self.orders.contains_key(&arity) {
            return Err(CliError::Configuration(format!(
                "an order with {} parameter(s) is already registered",
                arity
            )));
        }
        for (i, name) in names.iter().enumerate() {
            if names.iter().skip(i + 1).any(|other| other == name) {
                return Err(CliError::Configuration(format!(
                    "parameter '{}' appears twice in order '{}'",
                    name, line
                )));
            }
        }
        for name in &names {
            if !self.contains(name) {
                self.register(name)?;
            }
        }
        self.orders.insert(arity, names);
        Ok(())
    }

    pub fn orders(&self) -> &BTreeMap<usize, Vec<String>> {
        &self.orders
    }

    /// Appends to the default-order list, optionally setting defaults pairwise.
    pub fn set_default_order(&mut self, names: &[&str], defaults: Vec<Value>) -> Result<()> {
        let mut defaults = defaults.into_iter();
        for name in names {
            let param = self.get(name)?;
            if let Some(default) = defaults.next() {
                param.set_default(default);
            }
            self.default_order.push((*name).to_string());
        }
        Ok(())
    }

    pub fn default_order(&self) -> &[String] {
        &self.default_order
    }

    pub fn optional_params(&self) -> impl Iterator<Item = &Parameter> {
        self.params.iter().filter(|p| p.is_optional())
    }

    pub fn obligatory_count(&self) -> usize {
        self.params.len() - self.optional_params().count()
    }

    /// Resolved values in declaration order.
    pub fn values(&self) -> Vec<Option<Value>> {
        self.params.iter().map(Parameter::get).collect()
    }

    pub fn reset(&self) {
        self.params.iter().for_each(Parameter::reset);
    }
}

// --- RESOLUTION ---

impl ParamRegistry {
    /// Assigns positional tokens to parameters.
    ///
    /// The template with the smallest arity not below the token count is chosen; the
    /// gap is closed by skipping parameters (see `params_to_skip`). Remaining names
    /// take one token each, and any tokens left over go to the last of them.
    pub fn resolve(&self, node: &str, tokens: &[String]) -> Result<()> {
        let count = tokens.len().min(self.params.len());
        if count == 0 {
            if tokens.is_empty() {
                return Ok(());
            }
            return Err(CliError::arity(node, tokens, "no parameters are declared"));
        }

        let obligatory = self.obligatory_count();
        if !self.orders.contains_key(&count) && count < obligatory {
            return Err(CliError::arity(
                node,
                tokens,
                format!("{} argument(s) given but {} are required", count, obligatory),
            ));
        }

        let orders = self.effective_orders();
        let (arity, order) = orders.range(count..).next().ok_or_else(|| {
            CliError::arity(
                node,
                tokens,
                format!("no order accepts {} argument(s)", count),
            )
        })?;

        let skip = self.params_to_skip(arity - count);
        debug!(
            "Node '{}': {} argument(s) matched to order {:?}, skipping {:?}",
            node, count, order, skip
        );

        let to_use = order
            .iter()
            .filter(|name| !skip.contains(name))
            .map(|name| self.get(name))
            .collect::<Result<Vec<_>>>()?;

        let Some(last) = to_use.last() else {
            return Err(CliError::arity(
                node,
                tokens,
                "every parameter of the order was skipped",
            ));
        };

        for (param, token) in to_use.iter().zip(tokens) {
            trace!("'{}' <- '{}'", param.name(), token);
            self.store(node, tokens, param, std::slice::from_ref(token))?;
        }
        if let Some(rest) = tokens.get(to_use.len()..).filter(|rest| !rest.is_empty()) {
            trace!("'{}' <- {:?}", last.name(), rest);
            self.store(node, tokens, last, rest)?;
        }
        Ok(())
    }

    /// Registered templates, or one covering every parameter in declaration order
    /// when none was registered.
    fn effective_orders(&self) -> Cow<'_, BTreeMap<usize, Vec<String>>> {
        if self.orders.is_empty() {
            let names = self.params.iter().map(Parameter::name).collect::<Vec<_>>();
            Cow::Owned(BTreeMap::from([(names.len(), names)]))
        } else {
            Cow::Borrowed(&self.orders)
        }
    }

    /// Picks `needed` parameter names to leave at their defaults.
    ///
    /// The default-order list is used first. If it is too short, optional parameters
    /// (with a default, or deactivated) not already chosen are taken in declaration
    /// order.
    pub fn params_to_skip(&self, needed: usize) -> Vec<String> {
        let mut skip: Vec<String> = self.default_order.iter().take(needed).cloned().collect();
        let lacking = needed - skip.len();
        let fallback: Vec<String> = self
            .optional_params()
            .map(Parameter::name)
            .filter(|name| !skip.contains(name))
            .take(lacking)
            .collect();
        skip.extend(fallback);
        skip
    }

    fn store(&self, node: &str, tokens: &[String], param: &Parameter, values: &[String]) -> Result<()> {
        let rejected = param.add_to_values(values)?;
        if rejected.is_empty() {
            Ok(())
        } else {
            Err(CliError::arity(
                node,
                tokens,
                format!(
                    "parameter '{}' cannot take [{}]",
                    param.name(),
                    rejected.join(" ")
                ),
            ))
        }
    }
}

// MARK: --- UNIT TESTS ---
