// src/core/value.rs

use crate::error::{CliError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// A resolved argument value.
///
/// Tokens enter the engine as strings; a collection with a coercion turns them into
/// one of the typed variants. Multi-element reads are returned as `List`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Value {
    Str(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    List(Vec<Value>),
}

impl Value {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integers widen to floats; everything else is `None`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            #[allow(clippy::cast_precision_loss)]
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Self::List(items) => Some(items),
            _ => None,
        }
    }

    /// Views a scalar as a one-element list so callers can iterate either shape.
    pub fn to_list(&self) -> Vec<Value> {
        match self {
            Self::List(items) => items.clone(),
            other => vec![other.clone()],
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Str(s) => f.write_str(s),
            Self::Int(i) => write!(f, "{}", i),
            Self::Float(x) => write!(f, "{}", x),
            Self::Bool(b) => write!(f, "{}", b),
            Self::List(items) => {
                let parts: Vec<String> = items.iter().map(ToString::to_string).collect();
                write!(f, "[{}]", parts.join(", "))
            }
        }
    }
}

impl From<&str> for Value {
    fn from(value: &str) -> Self {
        Self::Str(value.to_string())
    }
}

impl From<String> for Value {
    fn from(value: String) -> Self {
        Self::Str(value)
    }
}

impl From<i64> for Value {
    fn from(value: i64) -> Self {
        Self::Int(value)
    }
}

impl From<f64> for Value {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<bool> for Value {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl<T: Into<Value>> From<Vec<T>> for Value {
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

/// Per-element coercion applied by a collection when a token is stored.
pub type Cast = Rc<dyn Fn(&str) -> Result<Value>>;

/// The built-in coercions, selectable by name from grammar files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ValueType {
    #[default]
    String,
    Int,
    Float,
    Bool,
}

impl ValueType {
    pub fn cast(self, token: &str) -> Result<Value> {
        let invalid = |reason: &str| CliError::InvalidValue {
            value: token.to_string(),
            reason: reason.to_string(),
        };
        match self {
            Self::String => Ok(Value::Str(token.to_string())),
            Self::Int => token
                .parse::<i64>()
                .map(Value::Int)
                .map_err(|_| invalid("expected an integer")),
            Self::Float => token
                .parse::<f64>()
                .map(Value::Float)
                .map_err(|_| invalid("expected a number")),
            Self::Bool => match token.to_lowercase().as_str() {
                "true" | "yes" | "1" | "on" => Ok(Value::Bool(true)),
                "false" | "no" | "0" | "off" => Ok(Value::Bool(false)),
                _ => Err(invalid("expected a boolean")),
            },
        }
    }

    pub fn into_cast(self) -> Cast {
        Rc::new(move |token| self.cast(token))
    }
}
