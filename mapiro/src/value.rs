//! Decoded column value.
use std::fmt;

use crate::mapi::ProtocolError;

/// Literal the server sends for a missing value.
const NULL: &str = "NULL";

/// A value decoded from a tuple line.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

/// How text of a given column type is turned into a [`Value`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Coercion {
    /// `boolean`
    Bool,
    /// `tinyint`, `smallint`, `int`, `wrd`, `bigint`
    Int,
    /// `real`, `double`, `decimal`
    Float,
    /// anything else
    Text,
}

impl Coercion {
    /// Select coercion for a declared column type name.
    pub fn of(type_name: &str) -> Coercion {
        match type_name {
            "boolean" => Self::Bool,
            "tinyint" | "smallint" | "int" | "wrd" | "bigint" => Self::Int,
            "real" | "double" | "decimal" => Self::Float,
            _ => Self::Text,
        }
    }
}

impl Value {
    /// Coerce raw token text according to its column type.
    ///
    /// Empty token and `NULL` are [`Value::Null`] regardless of type.
    pub(crate) fn coerce(token: &str, type_name: &str) -> Result<Value, ProtocolError> {
        if token.is_empty() || token == NULL {
            return Ok(Value::Null);
        }

        let value = match Coercion::of(type_name) {
            Coercion::Bool => Value::Bool(token == "true"),
            Coercion::Int => Value::Int(
                token.parse().map_err(|_| ProtocolError::value(type_name, token))?,
            ),
            Coercion::Float => Value::Float(
                token.parse().map_err(|_| ProtocolError::value(type_name, token))?,
            ),
            Coercion::Text => Value::Text(token.into()),
        };

        Ok(value)
    }

    /// Return `true` if value is NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    pub const fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub const fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Integer values are widened.
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Consume self into the inner [`String`], if value is text.
    pub fn into_string(self) -> Option<String> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Null => f.write_str(NULL),
            Self::Bool(b) => fmt::Display::fmt(b, f),
            Self::Int(i) => fmt::Display::fmt(i, f),
            Self::Float(n) => fmt::Display::fmt(n, f),
            Self::Text(s) => f.write_str(s),
        }
    }
}
