// src/bin/treeargs.rs

use anyhow::{Context, Result, anyhow};
use clap::Parser;
use colored::*;
use serde::Serialize;
use std::path::PathBuf;
use treeargs::{
    ParseResult, Value,
    grammar::{self, build_cli, load_grammar},
};

/// treeargs: resolve a command line against a declarative grammar.
///
/// The grammar (TOML) describes a tree of nodes with flags, positional parameters
/// and arity templates. treeargs walks the tokens through that tree and prints the
/// node it ended at together with every parameter value.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Grammar file to load. Defaults to `<config_dir>/treeargs/grammar.toml`.
    #[arg(long, short)]
    grammar: Option<PathBuf>,

    /// Print the result as JSON instead of a colored listing.
    #[arg(long)]
    json: bool,

    /// A whole command line, split with shell quoting rules.
    #[arg(long, conflicts_with = "tokens")]
    line: Option<String>,

    /// The tokens to resolve.
    #[arg(trailing_var_arg = true, allow_hyphen_values = true)]
    tokens: Vec<String>,
}

#[derive(Serialize)]
struct Report<'a> {
    node: &'a str,
    path: &'a [String],
    params: Vec<ParamReport>,
}

#[derive(Serialize)]
struct ParamReport {
    name: String,
    value: Option<Value>,
}

fn main() {
    env_logger::init();

    if let Err(e) = run(Args::parse()) {
        eprintln!("\n{}: {:#}", "Error".red().bold(), e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> Result<()> {
    log::debug!("CLI args parsed: {:?}", args);

    let path = args
        .grammar
        .or_else(grammar::default_grammar_path)
        .context("No grammar file given and no config directory could be determined")?;
    let grammar = load_grammar(&path)?;
    let mut cli = build_cli(&grammar)
        .with_context(|| format!("Grammar '{}' could not be built", path.display()))?;

    let tokens = match args.line {
        Some(line) => shlex::split(&line).ok_or_else(|| anyhow!("Unbalanced quotes in --line"))?,
        None => args.tokens,
    };

    let result = cli.parse(tokens.as_slice())?;
    if args.json {
        print_json(&result)
    } else {
        print_listing(&result);
        Ok(())
    }
}

fn print_json(result: &ParseResult<'_>) -> Result<()> {
    let report = Report {
        node: result.node_name(),
        path: result.path(),
        params: result
            .params()
            .into_iter()
            .map(|(name, value)| ParamReport { name, value })
            .collect(),
    };
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}

fn print_listing(result: &ParseResult<'_>) {
    let path = if result.path().is_empty() {
        "(root)".to_string()
    } else {
        result.path().join(" > ")
    };
    println!("{} {}", "Node:".bold(), path.green());
    for (name, value) in result.params() {
        let shown = value.map_or_else(|| "-".dimmed().to_string(), |v| v.to_string());
        println!("  {} = {}", name.cyan(), shown);
    }
}
