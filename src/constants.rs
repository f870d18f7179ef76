// src/constants.rs

/// The name given to the root node when a grammar does not name it.
pub const DEFAULT_ROOT_NAME: &str = "root";

/// The name of the directory holding treeargs configuration (inside the user's config dir).
pub const APP_DIR: &str = "treeargs";

/// The name of the grammar file looked up when `--grammar` is not given.
pub const GRAMMAR_FILENAME: &str = "grammar.toml";
