// src/core/mod.rs

pub mod collection;
pub mod condition;
pub mod flags;
pub mod node;
pub mod parameters;
pub mod parser;
pub mod value;
