// tests/grammar_file.rs

use std::fs;
use treeargs::{
    CliError, Value,
    grammar::{build_cli, load_grammar},
};

const GRAMMAR: &str = r#"
name = "tool"

[[flags]]
name = "--dry-run"
aliases = ["-n"]

[[nodes]]
name = "copy"
orders = ["src dst", "src dst mode"]
default_order = ["mode"]

[[nodes.params]]
name = "mode"
default = "0644"

[[nodes.flags]]
name = "--exclude"
aliases = ["-x"]
limit = 1
storage_limit = "unbounded"

[[nodes]]
name = "remote"
only_hidden = true

[[nodes.hidden]]
name = "push"
active_when = ["--dry-run"]
orders = ["target"]

[[nodes.hidden]]
name = "pull"
inactive_any = ["--dry-run"]
orders = ["source"]
"#;

fn write_grammar(content: &str) -> (tempfile::TempDir, std::path::PathBuf) {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("grammar.toml");
    fs::write(&path, content).unwrap();
    (dir, path)
}

#[test]
fn test_grammar_from_disk_drives_a_parse() {
    let (_dir, path) = write_grammar(GRAMMAR);
    let grammar = load_grammar(&path).unwrap();
    let mut cli = build_cli(&grammar).unwrap();

    let result = cli.parse_line("copy a.txt -x '*.tmp' b.txt").unwrap();
    assert_eq!(result.path(), ["copy"]);
    assert_eq!(result.get("src").unwrap(), Some(Value::from("a.txt")));
    assert_eq!(result.get("dst").unwrap(), Some(Value::from("b.txt")));
    assert_eq!(result.get("mode").unwrap(), Some(Value::from("0644")));

    let exclude = cli
        .root()
        .get_node("copy")
        .unwrap()
        .get_flag("--exclude")
        .unwrap();
    assert_eq!(exclude.get(), Some(Value::from("'*.tmp'")));
}

#[test]
fn test_only_hidden_node_picks_a_branch() {
    let (_dir, path) = write_grammar(GRAMMAR);
    let mut cli = build_cli(&load_grammar(&path).unwrap()).unwrap();

    let result = cli.parse_line("remote origin").unwrap();
    assert_eq!(result.path(), ["remote", "pull"]);
    assert_eq!(result.get("source").unwrap(), Some(Value::from("origin")));

    cli.reset();
    let result = cli.parse_line("remote -n origin").unwrap();
    assert_eq!(result.path(), ["remote", "push"]);
    assert_eq!(result.get("target").unwrap(), Some(Value::from("origin")));
}

#[test]
fn test_duplicate_flag_names_are_reported_at_build_time() {
    let (_dir, path) = write_grammar(
        "[[flags]]\nname = \"--all\"\naliases = [\"-a\"]\n[[flags]]\nname = \"-a\"\n",
    );
    let grammar = load_grammar(&path).unwrap();
    assert!(matches!(
        build_cli(&grammar),
        Err(CliError::NameCollision { ref name, .. }) if name == "-a"
    ));
}

#[test]
fn test_malformed_grammar_mentions_the_file() {
    let (_dir, path) = write_grammar("[[flags]]\nname = ");
    let err = load_grammar(&path).unwrap_err();
    assert!(format!("{:#}", err).contains("Failed to parse grammar file"));
}
