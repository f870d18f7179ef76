// src/error.rs

use std::fmt;
use thiserror::Error;

/// The namespace a name was looked up or registered in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    Node,
    HiddenNode,
    Flag,
    Parameter,
    Collection,
    /// Any namespace of a node (used by the generic `Node::get`).
    Any,
}

impl fmt::Display for ElementKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Node => "node",
            Self::HiddenNode => "hidden node",
            Self::Flag => "flag",
            Self::Parameter => "parameter",
            Self::Collection => "collection",
            Self::Any => "element",
        };
        f.write_str(name)
    }
}

/// Every failure the resolution engine can report.
///
/// Registration-time problems (`NameCollision`, `Configuration`) are raised by the
/// builder methods; everything else is raised by `Cli::parse`. A failed parse leaves
/// the tree partially mutated: call `Cli::reset` before parsing again.
#[derive(Error, Debug)]
pub enum CliError {
    #[error("A {kind} named '{name}' is already registered.")]
    NameCollision { kind: ElementKind, name: String },

    #[error("No {kind} named '{name}' exists.")]
    UnknownName { kind: ElementKind, name: String },

    #[error("Node '{node}' has {} active hidden nodes, exactly one was expected. Active: [{}]", active.len(), active.join(", "))]
    AmbiguousActivation { node: String, active: Vec<String> },

    #[error("Node '{node}' cannot accept the arguments [{}]: {reason}", tokens.join(" "))]
    ArityMismatch {
        node: String,
        tokens: Vec<String>,
        reason: String,
    },

    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Value '{value}' was rejected: {reason}")]
    InvalidValue { value: String, reason: String },

    #[error("Action failed: {0}")]
    Action(#[from] anyhow::Error),
}

impl CliError {
    pub(crate) fn collision(kind: ElementKind, name: impl Into<String>) -> Self {
        Self::NameCollision {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn unknown(kind: ElementKind, name: impl Into<String>) -> Self {
        Self::UnknownName {
            kind,
            name: name.into(),
        }
    }

    pub(crate) fn arity(node: &str, tokens: &[String], reason: impl Into<String>) -> Self {
        Self::ArityMismatch {
            node: node.to_string(),
            tokens: tokens.to_vec(),
            reason: reason.into(),
        }
    }
}

/// Result alias used throughout the engine.
pub type Result<T, E = CliError> = std::result::Result<T, E>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_arity_mismatch_message_lists_tokens() {
        let tokens = vec!["a".to_string(), "b".to_string()];
        let err = CliError::arity("root", &tokens, "too many");
        assert_eq!(
            err.to_string(),
            "Node 'root' cannot accept the arguments [a b]: too many"
        );
    }

    #[test]
    fn test_ambiguous_activation_message() {
        let err = CliError::AmbiguousActivation {
            node: "trans".to_string(),
            active: vec!["single".to_string(), "word".to_string()],
        };
        let msg = err.to_string();
        assert!(msg.contains("has 2 active hidden nodes"));
        assert!(msg.contains("single, word"));
    }
}
