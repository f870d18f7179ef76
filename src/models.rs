// src/models.rs

use crate::core::value::ValueType;
use serde::{Deserialize, Serialize};

// --- GRAMMAR FILE MODELS (FOR TOML) ---
// These are what the user writes in grammar.toml. `grammar::build_cli` turns
// them into a live node tree.

/// A whole grammar file: the root node's definition at the top level.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(transparent)]
pub struct GrammarFile {
    pub root: NodeDef,
}

/// A storage or repetition limit: a count, or the keyword `"unbounded"`.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(untagged)]
pub enum Limit {
    Count(usize),
    Keyword(LimitKeyword),
}

#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LimitKeyword {
    Unbounded,
}

impl Limit {
    pub fn get(self) -> Option<usize> {
        match self {
            Self::Count(n) => Some(n),
            Self::Keyword(LimitKeyword::Unbounded) => None,
        }
    }
}

/// A node, visible or hidden. The activation lists are only valid on hidden nodes.
#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct NodeDef {
    /// Required for children; the root falls back to `constants::DEFAULT_ROOT_NAME`.
    pub name: Option<String>,
    #[serde(default)]
    pub only_hidden: bool,
    #[serde(default)]
    pub collections: Vec<CollectionDef>,
    #[serde(default)]
    pub flags: Vec<FlagDef>,
    #[serde(default)]
    pub params: Vec<ParamDef>,
    /// Space separated arity templates, e.g. `"a b mult"`.
    #[serde(default)]
    pub orders: Vec<String>,
    #[serde(default)]
    pub default_order: Vec<String>,
    #[serde(default)]
    pub nodes: Vec<NodeDef>,
    #[serde(default)]
    pub hidden: Vec<NodeDef>,

    // Activation rules, as flag names visible from this node.
    #[serde(default)]
    pub active_when: Vec<String>,
    #[serde(default)]
    pub active_any: Vec<String>,
    #[serde(default)]
    pub inactive_when: Vec<String>,
    #[serde(default)]
    pub inactive_any: Vec<String>,
}

impl NodeDef {
    pub fn has_activation_rules(&self) -> bool {
        !(self.active_when.is_empty()
            && self.active_any.is_empty()
            && self.inactive_when.is_empty()
            && self.inactive_any.is_empty())
    }
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct CollectionDef {
    pub name: String,
    pub limit: Option<Limit>,
    pub default: Option<toml::Value>,
    #[serde(rename = "type")]
    pub value_type: Option<ValueType>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct FlagDef {
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
    /// How many following tokens the flag may take. Absent means unbounded.
    pub limit: Option<Limit>,
    /// Name of a collection to store into instead of the flag's own storage.
    pub storage: Option<String>,
    pub storage_limit: Option<Limit>,
    pub default: Option<toml::Value>,
    #[serde(rename = "type")]
    pub value_type: Option<ValueType>,
    /// Collection that records the flag's name when it gets activated.
    pub add_name_to: Option<String>,
}

#[derive(Deserialize, Serialize, Debug, Clone, Default)]
#[serde(deny_unknown_fields)]
pub struct ParamDef {
    pub name: String,
    pub storage: Option<String>,
    pub limit: Option<Limit>,
    pub storage_limit: Option<Limit>,
    pub default: Option<toml::Value>,
    #[serde(rename = "type")]
    pub value_type: Option<ValueType>,
}
