// src/core/node.rs

use crate::{
    core::{
        collection::Collection,
        condition::Activation,
        flags::{Flag, FlagOptions, FlagRegistry},
        parameters::{ParamRegistry, Parameter},
        value::Value,
    },
    error::{CliError, ElementKind, Result},
};
use log::debug;
use std::fmt;

/// A callback run on the terminal node after parameters are resolved.
///
/// It receives every parameter value of the node in declaration order and takes
/// what it needs from the slice.
pub type Action = Box<dyn FnMut(&[Option<Value>]) -> anyhow::Result<Option<Value>>>;

/// A named point in the command tree.
///
/// A node owns its visible children (reached by literal token match), its hidden
/// children (reached when their activation rules hold), its flags, parameters and
/// free-standing collections, and the callbacks to run when it ends a parse.
pub struct Node {
    name: String,
    nodes: Vec<Node>,
    hidden_nodes: Vec<Node>,
    activation: Option<Activation>,
    flags: FlagRegistry,
    params: ParamRegistry,
    collections: Vec<Collection>,
    actions: Vec<Action>,
    action_results: Vec<Option<Value>>,
    only_hidden: bool,
}

/// A borrowed view of anything a node can hold, returned by `Node::get`.
#[derive(Debug)]
pub enum Element<'a> {
    Node(&'a Node),
    HiddenNode(&'a Node),
    Flag(Flag),
    Parameter(Parameter),
    Collection(Collection),
}

impl Node {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nodes: Vec::new(),
            hidden_nodes: Vec::new(),
            activation: None,
            flags: FlagRegistry::new(),
            params: ParamRegistry::new(),
            collections: Vec::new(),
            actions: Vec::new(),
            action_results: Vec::new(),
            only_hidden: false,
        }
    }

    /// A node governed by activation rules, to be added with `add_hidden_node_with`.
    pub fn hidden(name: impl Into<String>, activation: Activation) -> Self {
        let mut node = Self::new(name);
        node.activation = Some(activation);
        node
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_hidden(&self) -> bool {
        self.activation.is_some()
    }

    /// The activation handle of a hidden node.
    pub fn activation(&self) -> Option<&Activation> {
        self.activation.as_ref()
    }

    /// Visible nodes are always active; hidden ones evaluate their rules.
    pub fn is_active(&self) -> bool {
        self.activation.as_ref().is_none_or(Activation::is_active)
    }

    // --- Generic lookup ---

    /// Looks `name` up in every namespace: visible nodes, hidden nodes, flags,
    /// parameters and collections, in that order.
    pub fn get(&self, name: &str) -> Result<Element<'_>> {
        if let Some(node) = self.find_node(name) {
            return Ok(Element::Node(node));
        }
        if let Some(node) = self.find_hidden_node(name) {
            return Ok(Element::HiddenNode(node));
        }
        if let Some(flag) = self.flags.find(name) {
            return Ok(Element::Flag(flag.clone()));
        }
        if let Some(param) = self.params.find(name) {
            return Ok(Element::Parameter(param.clone()));
        }
        self.collections
            .iter()
            .find(|c| c.name() == name)
            .map(|c| Element::Collection(c.clone()))
            .ok_or_else(|| CliError::unknown(ElementKind::Any, name))
    }

    pub fn has(&self, name: &str) -> bool {
        self.get(name).is_ok()
    }

    // --- Visible nodes ---

    pub fn add_node(&mut self, name: &str) -> Result<&mut Node> {
        self.add_node_with(Node::new(name))
    }

    /// Attaches a pre-built subtree.
    pub fn add_node_with(&mut self, node: Node) -> Result<&mut Node> {
        if node.is_hidden() {
            return Err(CliError::Configuration(format!(
                "node '{}' has activation rules, add it as a hidden node",
                node.name
            )));
        }
        if self.has_node(&node.name) {
            return Err(CliError::collision(ElementKind::Node, node.name));
        }
        let name = node.name.clone();
        self.nodes.push(node);
        self.nodes
            .last_mut()
            .ok_or_else(|| CliError::unknown(ElementKind::Node, name))
    }

    pub fn find_node(&self, name: &str) -> Option<&Node> {
        self.nodes.iter().find(|n| n.name == name)
    }

    pub fn get_node(&self, name: &str) -> Result<&Node> {
        self.find_node(name)
            .ok_or_else(|| CliError::unknown(ElementKind::Node, name))
    }

    pub fn get_node_mut(&mut self, name: &str) -> Result<&mut Node> {
        self.nodes
            .iter_mut()
            .find(|n| n.name == name)
            .ok_or_else(|| CliError::unknown(ElementKind::Node, name))
    }

    pub fn has_node(&self, name: &str) -> bool {
        self.find_node(name).is_some()
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    // --- Hidden nodes ---

    pub fn add_hidden_node(&mut self, name: &str, activation: Activation) -> Result<&mut Node> {
        self.add_hidden_node_with(Node::hidden(name, activation))
    }

    pub fn add_hidden_node_with(&mut self, mut node: Node) -> Result<&mut Node> {
        if self.has_hidden_node(&node.name) {
            return Err(CliError::collision(ElementKind::HiddenNode, node.name));
        }
        node.activation.get_or_insert_with(Activation::new);
        let name = node.name.clone();
        self.hidden_nodes.push(node);
        self.hidden_nodes
            .last_mut()
            .ok_or_else(|| CliError::unknown(ElementKind::HiddenNode, name))
    }

    pub fn find_hidden_node(&self, name: &str) -> Option<&Node> {
        self.hidden_nodes.iter().find(|n| n.name == name)
    }

    pub fn get_hidden_node(&self, name: &str) -> Result<&Node> {
        self.find_hidden_node(name)
            .ok_or_else(|| CliError::unknown(ElementKind::HiddenNode, name))
    }

    pub fn get_hidden_node_mut(&mut self, name: &str) -> Result<&mut Node> {
        self.hidden_nodes
            .iter_mut()
            .find(|n| n.name == name)
            .ok_or_else(|| CliError::unknown(ElementKind::HiddenNode, name))
    }

    pub fn has_hidden_node(&self, name: &str) -> bool {
        self.find_hidden_node(name).is_some()
    }

    pub fn hidden_nodes(&self) -> &[Node] {
        &self.hidden_nodes
    }

    /// Requires one hidden child to be active whenever this node ends the descent.
    pub fn set_only_hidden_nodes(&mut self) {
        self.only_hidden = true;
    }

    pub fn only_hidden(&self) -> bool {
        self.only_hidden
    }

    /// The single active hidden child, if any.
    ///
    /// More than one active child is an error, and so is none when the node only
    /// accepts hidden children.
    pub fn active_hidden_node(&self) -> Result<Option<&Node>> {
        let active: Vec<&Node> = self.hidden_nodes.iter().filter(|n| n.is_active()).collect();
        match active.as_slice() {
            [] if self.only_hidden => Err(CliError::AmbiguousActivation {
                node: self.name.clone(),
                active: Vec::new(),
            }),
            [] => Ok(None),
            [single] => Ok(Some(*single)),
            many => Err(CliError::AmbiguousActivation {
                node: self.name.clone(),
                active: many.iter().map(|n| n.name.clone()).collect(),
            }),
        }
    }

    // --- Flags ---

    pub fn add_flag(&mut self, name: &str, aliases: &[&str], options: FlagOptions) -> Result<Flag> {
        self.flags.register(name, aliases, options)
    }

    /// Registers a flag created elsewhere, sharing its state.
    pub fn add_existing_flag(&mut self, flag: &Flag) -> Result<Flag> {
        self.flags.add(flag.clone())
    }

    pub fn get_flag(&self, name: &str) -> Result<Flag> {
        self.flags.get(name)
    }

    pub fn has_flag(&self, name: &str) -> bool {
        self.flags.contains(name)
    }

    pub fn flags(&self) -> &FlagRegistry {
        &self.flags
    }

    // --- Parameters ---

    pub fn add_param(&mut self, name: &str) -> Result<Parameter> {
        self.params.register(name)
    }

    pub fn add_param_with_storage(&mut self, name: &str, storage: &Collection) -> Result<Parameter> {
        self.params.register_with_storage(name, storage)
    }

    /// Registers a parameter created elsewhere, sharing its state.
    pub fn add_existing_param(&mut self, param: &Parameter) -> Result<Parameter> {
        self.params.add(param.clone())
    }

    /// Registers several parameters at once, pairing them with storages by position.
    pub fn set_params(&mut self, names: &[&str], storages: &[&Collection]) -> Result<Vec<Parameter>> {
        let mut storages = storages.iter();
        names
            .iter()
            .map(|name| match storages.next() {
                Some(storage) => self.add_param_with_storage(name, storage),
                None => self.add_param(name),
            })
            .collect()
    }

    pub fn get_param(&self, name: &str) -> Result<Parameter> {
        self.params.get(name)
    }

    pub fn has_param(&self, name: &str) -> bool {
        self.params.contains(name)
    }

    pub fn params(&self) -> &ParamRegistry {
        &self.params
    }

    pub fn set_params_order(&mut self, line: &str) -> Result<()> {
        self.params.set_params_order(line)
    }

    pub fn set_default_order(&mut self, names: &[&str], defaults: Vec<Value>) -> Result<()> {
        self.params.set_default_order(names, defaults)
    }

    // --- Collections ---

    pub fn add_collection(&mut self, name: &str, limit: Option<usize>) -> Result<Collection> {
        if self.collections.iter().any(|c| c.name() == name) {
            return Err(CliError::collision(ElementKind::Collection, name));
        }
        let collection = Collection::named(name, limit);
        self.collections.push(collection.clone());
        Ok(collection)
    }

    pub fn get_collection(&self, name: &str) -> Result<Collection> {
        self.collections
            .iter()
            .find(|c| c.name() == name)
            .cloned()
            .ok_or_else(|| CliError::unknown(ElementKind::Collection, name))
    }

    pub fn collections(&self) -> &[Collection] {
        &self.collections
    }

    // --- Actions ---

    pub fn add_action(
        &mut self,
        action: impl FnMut(&[Option<Value>]) -> anyhow::Result<Option<Value>> + 'static,
    ) {
        self.actions.push(Box::new(action));
    }

    pub fn action_count(&self) -> usize {
        self.actions.len()
    }

    /// Runs every action with the node's parameter values and records the results.
    /// Returns the index of this run's first result in the history.
    pub fn perform_all_actions(&mut self) -> Result<usize> {
        let start = self.action_results.len();
        let values = self.params.values();
        debug!("Running {} action(s) on '{}'", self.actions.len(), self.name);
        for action in &mut self.actions {
            let result = action(&values)?;
            self.action_results.push(result);
        }
        Ok(start)
    }

    pub fn get_action_results(&self) -> &[Option<Value>] {
        &self.action_results
    }

    /// The result of the first action, if one ran.
    pub fn get_result(&self) -> Option<&Value> {
        self.action_results.first().and_then(Option::as_ref)
    }

    // --- Reset ---

    /// Clears everything a parse wrote: flag activation, stored values, deactivated
    /// parameters and the action history, for this node and all descendants.
    pub fn reset(&mut self) {
        self.flags.reset();
        self.params.reset();
        self.collections.iter().for_each(Collection::clear);
        self.action_results.clear();
        self.nodes.iter_mut().for_each(Node::reset);
        self.hidden_nodes.iter_mut().for_each(Node::reset);
    }
}

impl fmt::Debug for Node {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("name", &self.name)
            .field("nodes", &self.nodes)
            .field("hidden_nodes", &self.hidden_nodes)
            .field("activation", &self.activation)
            .field("flags", &self.flags)
            .field("params", &self.params)
            .field("collections", &self.collections)
            .field("actions", &self.actions.len())
            .field("action_results", &self.action_results)
            .field("only_hidden", &self.only_hidden)
            .finish()
    }
}
