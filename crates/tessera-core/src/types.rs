//! Shared type definitions.

use ciborium::value::Value;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Row identifier assigned by the backing store on insert.
///
/// Ids are monotonically increasing and never reused, so ordering by id is
/// ordering by insertion.
pub type RecordId = i64;

/// Coarse classification of a stored value.
///
/// The tag is persisted with each record and selects the decode path:
/// [`Datatype::Bin`] payloads are raw bytes, everything else went through the
/// CBOR codec. Only [`Datatype::Dict`] values get field pointers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Datatype {
    Bin = 1,
    Dict = 2,
    List = 3,
    Str = 4,
    Int = 5,
    Float = 6,
    Bool = 7,
}

impl Datatype {
    /// Classify a value. Returns `None` for values that cannot be stored:
    /// `Null` (absence) and tagged values.
    pub fn of(value: &Value) -> Option<Self> {
        match value {
            Value::Bytes(_) => Some(Self::Bin),
            Value::Map(_) => Some(Self::Dict),
            Value::Array(_) => Some(Self::List),
            Value::Text(_) => Some(Self::Str),
            Value::Integer(_) => Some(Self::Int),
            Value::Float(_) => Some(Self::Float),
            Value::Bool(_) => Some(Self::Bool),
            _ => None,
        }
    }

    /// Convert to the persisted integer form.
    pub fn to_u8(self) -> u8 {
        self as u8
    }

    /// Parse the persisted integer form.
    pub fn from_u8(n: u8) -> Option<Self> {
        match n {
            1 => Some(Self::Bin),
            2 => Some(Self::Dict),
            3 => Some(Self::List),
            4 => Some(Self::Str),
            5 => Some(Self::Int),
            6 => Some(Self::Float),
            7 => Some(Self::Bool),
            _ => None,
        }
    }

    /// Raw binary payload, stored without the codec.
    pub fn is_binary(self) -> bool {
        self == Self::Bin
    }

    /// Keyed payload whose top-level text fields get pointers.
    pub fn is_mapping(self) -> bool {
        self == Self::Dict
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Bin => "bin",
            Self::Dict => "dict",
            Self::List => "list",
            Self::Str => "str",
            Self::Int => "int",
            Self::Float => "float",
            Self::Bool => "bool",
        }
    }
}

impl fmt::Display for Datatype {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Short description of a value's kind, used in error messages.
pub fn describe(value: &Value) -> &'static str {
    match value {
        Value::Integer(_) => "integer",
        Value::Bytes(_) => "bytes",
        Value::Float(_) => "float",
        Value::Text(_) => "text",
        Value::Bool(_) => "bool",
        Value::Null => "null",
        Value::Tag(_, _) => "tagged value",
        Value::Array(_) => "array",
        Value::Map(_) => "map",
        _ => "unknown value",
    }
}

/// A key-value store key: an integer or a string, never both.
///
/// The derived ordering places every integer before every string, which is
/// the order the backing store returns them in.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Key {
    Int(i64),
    Str(String),
}

impl Key {
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Key::Int(n) => Some(*n),
            Key::Str(_) => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Key::Int(_) => None,
            Key::Str(s) => Some(s),
        }
    }
}

impl fmt::Display for Key {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Key::Int(n) => write!(f, "{}", n),
            Key::Str(s) => write!(f, "{:?}", s),
        }
    }
}

impl From<i64> for Key {
    fn from(n: i64) -> Self {
        Key::Int(n)
    }
}

impl From<i32> for Key {
    fn from(n: i32) -> Self {
        Key::Int(n.into())
    }
}

impl From<u32> for Key {
    fn from(n: u32) -> Self {
        Key::Int(n.into())
    }
}

impl From<&str> for Key {
    fn from(s: &str) -> Self {
        Key::Str(s.to_owned())
    }
}

impl From<String> for Key {
    fn from(s: String) -> Self {
        Key::Str(s)
    }
}

impl From<&String> for Key {
    fn from(s: &String) -> Self {
        Key::Str(s.clone())
    }
}
