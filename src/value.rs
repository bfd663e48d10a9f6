//! Parsed configuration values
//!
//! A single value tree serves both parse modes. Every node carries a metadata
//! payload `M`: plain parses use `()`, pedantic parses use [`Provenance`] to
//! remember where each value was defined and whether a variable reference
//! ever resolved through it.

use crate::error::Position;
use crate::number::format_timestamp;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::ser::{Serialize, SerializeMap, SerializeSeq, Serializer};
use smallvec::SmallVec;
use std::fmt::Debug;
use std::path::Path;
use std::sync::Arc;

/// Map type (preserves insertion order, keys unique)
pub type Map<M = ()> = IndexMap<String, Node<M>>;

/// Array type - SmallVec keeps short arrays (hosts, ports, tags) inline
pub type Array<M = ()> = SmallVec<[Node<M>; 4]>;

/// Metadata attached to every node of a parsed tree
pub trait Metadata: Clone + Debug + PartialEq {
    /// True when this payload records source positions
    const PEDANTIC: bool;

    /// Captures metadata for a value produced at `position`
    fn capture(position: Position, source_file: Option<&Arc<Path>>) -> Self;

    /// Moves the recorded position, used to point at a value's key
    fn relocate(&mut self, _position: Position) {}

    /// Records that a variable reference resolved through this value
    fn mark_used(&mut self) {}
}

impl Metadata for () {
    const PEDANTIC: bool = false;

    fn capture(_position: Position, _source_file: Option<&Arc<Path>>) -> Self {}
}

/// Where a value came from, recorded by pedantic parses
#[derive(Debug, Clone, PartialEq)]
pub struct Provenance {
    /// Line of the value's key (or of the value itself inside arrays)
    pub line: usize,
    /// Column of the value's key (or of the value itself inside arrays)
    pub column: usize,
    /// File the value was read from, `None` for in-memory text
    pub source_file: Option<Arc<Path>>,
    /// Set once a `$name` reference has resolved to this value
    pub used_variable: bool,
}

impl Metadata for Provenance {
    const PEDANTIC: bool = true;

    fn capture(position: Position, source_file: Option<&Arc<Path>>) -> Self {
        Self {
            line: position.line,
            column: position.column,
            source_file: source_file.cloned(),
            used_variable: false,
        }
    }

    fn relocate(&mut self, position: Position) {
        self.line = position.line;
        self.column = position.column;
    }

    fn mark_used(&mut self) {
        self.used_variable = true;
    }
}

/// Configuration value types
#[derive(Debug, Clone, PartialEq)]
pub enum Value<M = ()> {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Timestamp(DateTime<Utc>),
    /// Boxed to keep the enum small; see [`Array`]
    Array(Box<Array<M>>),
    Map(Map<M>),
}

/// A value together with its metadata
#[derive(Debug, Clone, PartialEq)]
pub struct Node<M = ()> {
    pub value: Value<M>,
    pub meta: M,
}

impl<M> Value<M> {
    /// Returns the name of the variant, for error messages
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::String(_) => "string",
            Value::Integer(_) => "integer",
            Value::Float(_) => "float",
            Value::Bool(_) => "boolean",
            Value::Timestamp(_) => "timestamp",
            Value::Array(_) => "array",
            Value::Map(_) => "map",
        }
    }

    /// Returns true if the value is a map
    pub fn is_map(&self) -> bool {
        matches!(self, Value::Map(_))
    }

    /// Returns true if the value is an array
    pub fn is_array(&self) -> bool {
        matches!(self, Value::Array(_))
    }

    /// Returns a reference to the map if this is a Map variant
    pub fn as_map(&self) -> Option<&Map<M>> {
        if let Value::Map(map) = self {
            Some(map)
        } else {
            None
        }
    }

    /// Returns a reference to the array if this is an Array variant
    pub fn as_array(&self) -> Option<&Array<M>> {
        if let Value::Array(array) = self {
            Some(array)
        } else {
            None
        }
    }

    /// Returns a reference to the string if this is a String variant
    pub fn as_str(&self) -> Option<&str> {
        if let Value::String(s) = self {
            Some(s.as_str())
        } else {
            None
        }
    }

    /// Returns the integer value if this is an Integer variant
    pub fn as_integer(&self) -> Option<i64> {
        if let Value::Integer(i) = self {
            Some(*i)
        } else {
            None
        }
    }

    /// Returns the float value if this is a Float variant
    pub fn as_float(&self) -> Option<f64> {
        if let Value::Float(f) = self {
            Some(*f)
        } else {
            None
        }
    }

    /// Returns the boolean value if this is a Bool variant
    pub fn as_bool(&self) -> Option<bool> {
        if let Value::Bool(b) = self {
            Some(*b)
        } else {
            None
        }
    }

    /// Returns the instant if this is a Timestamp variant
    pub fn as_timestamp(&self) -> Option<&DateTime<Utc>> {
        if let Value::Timestamp(ts) = self {
            Some(ts)
        } else {
            None
        }
    }

    /// Returns the node stored under `key` if this is a map
    pub fn get(&self, key: &str) -> Option<&Node<M>> {
        self.as_map().and_then(|map| map.get(key))
    }

    /// Follows a dotted path of map keys and array indices, e.g. `auth.users.0`
    pub fn lookup(&self, path: &str) -> Option<&Value<M>> {
        path.split('.').try_fold(self, |value, segment| match value {
            Value::Map(map) => map.get(segment).map(|node| &node.value),
            Value::Array(array) => segment
                .parse::<usize>()
                .ok()
                .and_then(|i| array.get(i))
                .map(|node| &node.value),
            _ => None,
        })
    }

    /// Drops all metadata, producing the plain form of this value
    pub fn strip(self) -> Value {
        match self {
            Value::String(s) => Value::String(s),
            Value::Integer(i) => Value::Integer(i),
            Value::Float(f) => Value::Float(f),
            Value::Bool(b) => Value::Bool(b),
            Value::Timestamp(ts) => Value::Timestamp(ts),
            Value::Array(array) => {
                Value::Array(Box::new((*array).into_iter().map(Node::strip).collect()))
            }
            Value::Map(map) => Value::Map(strip_map(map)),
        }
    }
}

impl<M> Node<M> {
    /// Wraps a value with its metadata
    pub fn new(value: Value<M>, meta: M) -> Self {
        Self { value, meta }
    }

    /// Returns the wrapped value
    pub fn value(&self) -> &Value<M> {
        &self.value
    }

    /// Unwraps the value, discarding this node's own metadata
    pub fn into_value(self) -> Value<M> {
        self.value
    }

    /// Drops all metadata in this subtree
    pub fn strip(self) -> Node {
        Node::plain(self.value.strip())
    }
}

impl Node {
    /// Wraps a value without metadata
    pub fn plain(value: Value) -> Self {
        Self { value, meta: () }
    }
}

impl Node<Provenance> {
    /// Line the value was defined on
    pub fn source_line(&self) -> usize {
        self.meta.line
    }

    /// Column the value was defined at
    pub fn source_column(&self) -> usize {
        self.meta.column
    }

    /// File the value was defined in, if it came from a file
    pub fn source_file(&self) -> Option<&Path> {
        self.meta.source_file.as_deref()
    }

    /// Returns true if a variable reference resolved through this value
    pub fn is_used_variable(&self) -> bool {
        self.meta.used_variable
    }
}

/// Drops all metadata from every node of a map
pub fn strip_map<M>(map: Map<M>) -> Map {
    map.into_iter().map(|(k, node)| (k, node.strip())).collect()
}

impl<M> Serialize for Value<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Value::String(s) => serializer.serialize_str(s),
            Value::Integer(i) => serializer.serialize_i64(*i),
            Value::Float(f) => serializer.serialize_f64(*f),
            Value::Bool(b) => serializer.serialize_bool(*b),
            Value::Timestamp(ts) => serializer.serialize_str(&format_timestamp(ts)),
            Value::Array(array) => {
                let mut seq = serializer.serialize_seq(Some(array.len()))?;
                for node in array.iter() {
                    seq.serialize_element(&node.value)?;
                }
                seq.end()
            }
            Value::Map(map) => {
                let mut out = serializer.serialize_map(Some(map.len()))?;
                for (key, node) in map {
                    out.serialize_entry(key, &node.value)?;
                }
                out.end()
            }
        }
    }
}

/// Nodes serialize as their value; metadata is never written out
impl<M> Serialize for Node<M> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.value.serialize(serializer)
    }
}
