// src/core/parser.rs

use crate::{
    constants::DEFAULT_ROOT_NAME,
    core::{node::Node, value::Value},
    error::{CliError, ElementKind, Result},
};
use log::debug;

/// One step of the path walked by a parse.
#[derive(Debug, Clone, PartialEq, Eq)]
enum Step {
    Visible(String),
    Hidden(String),
}

/// The entry point of the engine: a command tree and the parse driver over it.
#[derive(Debug)]
pub struct Cli {
    root: Node,
}

impl Default for Cli {
    fn default() -> Self {
        Self::new()
    }
}

impl Cli {
    pub fn new() -> Self {
        Self::with_root(Node::new(DEFAULT_ROOT_NAME))
    }

    pub fn with_root(root: Node) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Node {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Node {
        &mut self.root
    }

    /// Splits `line` on whitespace and parses the pieces.
    pub fn parse_line(&mut self, line: &str) -> Result<ParseResult<'_>> {
        let tokens: Vec<&str> = line.split_whitespace().collect();
        self.parse(&tokens)
    }

    /// Resolves one command line against the tree.
    ///
    /// The walk goes: literal descent through visible nodes, root flags, flags of the
    /// node the descent stopped at, hidden-node resolution, flags of the hidden node
    /// that was reached, positional parameters, and finally the actions of the
    /// terminal node.
    ///
    /// State written by a parse stays in the tree. Call `reset` between parses that
    /// must not see each other.
    pub fn parse<S: AsRef<str>>(&mut self, tokens: &[S]) -> Result<ParseResult<'_>> {
        let tokens: Vec<String> = tokens.iter().map(|t| t.as_ref().to_string()).collect();
        debug!("Parsing {:?}", tokens);

        let mut path = Vec::new();
        let mut node = &self.root;
        for token in &tokens {
            match node.find_node(token) {
                Some(child) => {
                    node = child;
                    path.push(Step::Visible(token.clone()));
                }
                None => break,
            }
        }
        let mut remaining = tokens.get(path.len()..).unwrap_or_default().to_vec();
        debug!("Descended to '{}', remaining {:?}", node.name(), remaining);

        remaining = self.root.flags().segment_and_strip(&remaining)?;
        if !path.is_empty() {
            remaining = node.flags().segment_and_strip(&remaining)?;
        }

        let descended = path.len();
        while let Some(hidden) = node.active_hidden_node()? {
            debug!("Hidden node '{}' is active under '{}'", hidden.name(), node.name());
            node = hidden;
            path.push(Step::Hidden(hidden.name().to_string()));
        }
        if path.len() > descended {
            remaining = node.flags().segment_and_strip(&remaining)?;
        }

        debug!("Resolving {:?} against the parameters of '{}'", remaining, node.name());
        node.params().resolve(node.name(), &remaining)?;

        let node = self.walk_mut(&path)?;
        let first_result = node.perform_all_actions()?;
        let path = path
            .into_iter()
            .map(|step| match step {
                Step::Visible(name) | Step::Hidden(name) => name,
            })
            .collect();
        Ok(ParseResult {
            node: &*node,
            path,
            first_result,
        })
    }

    /// Clears every value, flag activation and action result in the tree.
    pub fn reset(&mut self) {
        self.root.reset();
    }

    fn walk_mut(&mut self, path: &[Step]) -> Result<&mut Node> {
        path.iter().try_fold(&mut self.root, |node, step| match step {
            Step::Visible(name) => node.get_node_mut(name),
            Step::Hidden(name) => node.get_hidden_node_mut(name),
        })
    }
}

/// The outcome of a successful parse: the terminal node and what its actions returned.
#[derive(Debug)]
pub struct ParseResult<'a> {
    node: &'a Node,
    path: Vec<String>,
    first_result: usize,
}

impl ParseResult<'_> {
    /// Names of the visible and hidden nodes walked from the root, in order.
    pub fn path(&self) -> &[String] {
        &self.path
    }

    pub fn node(&self) -> &Node {
        self.node
    }

    pub fn node_name(&self) -> &str {
        self.node.name()
    }

    /// The resolved value of one parameter of the terminal node.
    pub fn get(&self, param: &str) -> Result<Option<Value>> {
        self.node
            .params()
            .find(param)
            .map(|p| p.get())
            .ok_or_else(|| CliError::unknown(ElementKind::Parameter, param))
    }

    /// Every parameter of the terminal node with its resolved value.
    pub fn params(&self) -> Vec<(String, Option<Value>)> {
        self.node
            .params()
            .iter()
            .map(|p| (p.name(), p.get()))
            .collect()
    }

    /// What the actions returned during this parse.
    pub fn results(&self) -> &[Option<Value>] {
        self.node
            .get_action_results()
            .get(self.first_result..)
            .unwrap_or_default()
    }

    /// The result of the first action run by this parse.
    pub fn result(&self) -> Option<&Value> {
        self.results().first().and_then(Option::as_ref)
    }
}
