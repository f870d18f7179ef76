pub mod constants;
pub mod core;
pub mod error;
pub mod grammar;
pub mod models;

pub use crate::core::{
    collection::Collection,
    condition::{Activation, Condition},
    flags::{Flag, FlagOptions},
    node::{Element, Node},
    parameters::Parameter,
    parser::{Cli, ParseResult},
    value::{Value, ValueType},
};
pub use crate::error::{CliError, ElementKind, Result};
