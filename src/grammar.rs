//! # Grammar Loader
//!
//! Reads a TOML grammar file into a `GrammarFile` and builds a live `Cli` from it.
//!
//! Names used inside a node (flag storages, `add_name_to` targets, activation rules)
//! are looked up in that node first and then in its ancestors, so a hidden node can
//! be gated on flags declared at the root.
use crate::{
    constants::{APP_DIR, DEFAULT_ROOT_NAME, GRAMMAR_FILENAME},
    core::{
        collection::Collection,
        condition::{Activation, Condition},
        flags::{Flag, FlagOptions},
        node::Node,
        parser::Cli,
        value::Value,
    },
    error::{CliError, ElementKind, Result},
    models::{GrammarFile, Limit, NodeDef},
};
use anyhow::Context;
use log::debug;
use std::{
    fs,
    path::{Path, PathBuf},
};

/// `<config_dir>/treeargs/grammar.toml`, if the platform has a config dir.
pub fn default_grammar_path() -> Option<PathBuf> {
    dirs::config_dir().map(|dir| dir.join(APP_DIR).join(GRAMMAR_FILENAME))
}

/// Reads and deserializes a grammar file.
pub fn load_grammar(path: &Path) -> anyhow::Result<GrammarFile> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("Failed to read grammar file '{}'", path.display()))?;
    parse_grammar(&content)
        .with_context(|| format!("Failed to parse grammar file '{}'", path.display()))
}

pub fn parse_grammar(content: &str) -> anyhow::Result<GrammarFile> {
    Ok(toml::from_str(content)?)
}

/// Builds the node tree a grammar describes.
pub fn build_cli(grammar: &GrammarFile) -> Result<Cli> {
    let def = &grammar.root;
    if def.has_activation_rules() {
        return Err(CliError::Configuration(
            "the root node cannot have activation rules".to_string(),
        ));
    }
    let mut root = Node::new(def.name.as_deref().unwrap_or(DEFAULT_ROOT_NAME));
    build_node(def, &mut root, &Scope::default())?;
    Ok(Cli::with_root(root))
}

/// Flags and collections visible from the node being built, innermost last.
#[derive(Clone, Default)]
struct Scope {
    flags: Vec<Flag>,
    collections: Vec<Collection>,
}

impl Scope {
    fn flag(&self, name: &str) -> Result<Flag> {
        self.flags
            .iter()
            .rev()
            .find(|flag| flag.has_name(name))
            .cloned()
            .ok_or_else(|| CliError::unknown(ElementKind::Flag, name))
    }

    fn collection(&self, name: &str) -> Result<Collection> {
        self.collections
            .iter()
            .rev()
            .find(|c| c.name() == name)
            .cloned()
            .ok_or_else(|| CliError::unknown(ElementKind::Collection, name))
    }

    fn conditions(&self, names: &[String]) -> Result<Vec<Condition>> {
        names
            .iter()
            .map(|name| self.flag(name).map(|flag| Condition::flag(&flag)))
            .collect()
    }
}

fn build_node(def: &NodeDef, node: &mut Node, outer: &Scope) -> Result<()> {
    debug!("Building node '{}'", node.name());
    let mut scope = outer.clone();

    for c in &def.collections {
        let collection = node.add_collection(&c.name, c.limit.and_then(Limit::get))?;
        if let Some(value_type) = c.value_type {
            collection.set_type(value_type);
        }
        if let Some(default) = &c.default {
            collection.set_default(to_value(default)?);
        }
        scope.collections.push(collection);
    }

    for f in &def.flags {
        let aliases: Vec<&str> = f.aliases.iter().map(String::as_str).collect();
        let mut options = FlagOptions::new().flag_limit(f.limit.and_then(Limit::get));
        if let Some(storage) = &f.storage {
            options = options.storage(&scope.collection(storage)?);
        }
        if let Some(limit) = f.storage_limit {
            options = options.storage_limit(limit.get());
        }
        if let Some(default) = &f.default {
            options = options.default_value(to_value(default)?);
        }
        let flag = node.add_flag(&f.name, &aliases, options)?;
        if let Some(value_type) = f.value_type {
            flag.set_type(value_type);
        }
        if let Some(target) = &f.add_name_to {
            flag.when_active_add_name_to(&scope.collection(target)?);
        }
        scope.flags.push(flag);
    }

    for p in &def.params {
        let param = match &p.storage {
            Some(storage) => node.add_param_with_storage(&p.name, &scope.collection(storage)?)?,
            None => node.add_param(&p.name)?,
        };
        if let Some(limit) = p.limit {
            param.set_limit(limit.get());
        }
        if let Some(limit) = p.storage_limit {
            param.set_storage_limit(limit.get());
        }
        if let Some(value_type) = p.value_type {
            param.set_type(value_type);
        }
        if let Some(default) = &p.default {
            param.set_default(to_value(default)?);
        }
    }

    for order in &def.orders {
        node.set_params_order(order)?;
    }
    if !def.default_order.is_empty() {
        let names: Vec<&str> = def.default_order.iter().map(String::as_str).collect();
        node.set_default_order(&names, Vec::new())?;
    }
    if def.only_hidden {
        node.set_only_hidden_nodes();
    }

    for child in &def.nodes {
        let name = child_name(child)?;
        if child.has_activation_rules() {
            return Err(CliError::Configuration(format!(
                "visible node '{}' cannot have activation rules, declare it under `hidden`",
                name
            )));
        }
        let sub = node.add_node(name)?;
        build_node(child, sub, &scope)?;
    }

    for child in &def.hidden {
        let name = child_name(child)?;
        let activation = Activation::new();
        activation.set_active_and(scope.conditions(&child.active_when)?);
        activation.set_active_or(scope.conditions(&child.active_any)?);
        activation.set_inactive_and(scope.conditions(&child.inactive_when)?);
        activation.set_inactive_or(scope.conditions(&child.inactive_any)?);
        let sub = node.add_hidden_node(name, activation)?;
        build_node(child, sub, &scope)?;
    }
    Ok(())
}

fn child_name(def: &NodeDef) -> Result<&str> {
    def.name
        .as_deref()
        .ok_or_else(|| CliError::Configuration("every child node needs a name".to_string()))
}

fn to_value(value: &toml::Value) -> Result<Value> {
    match value {
        toml::Value::String(s) => Ok(Value::Str(s.clone())),
        toml::Value::Integer(i) => Ok(Value::Int(*i)),
        toml::Value::Float(f) => Ok(Value::Float(*f)),
        toml::Value::Boolean(b) => Ok(Value::Bool(*b)),
        toml::Value::Array(items) => items
            .iter()
            .map(to_value)
            .collect::<Result<Vec<_>>>()
            .map(Value::List),
        other => Err(CliError::Configuration(format!(
            "unsupported default value {}",
            other
        ))),
    }
}
