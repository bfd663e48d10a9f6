//! Serde deserializer implementation
//!
//! Documents are parsed into a [`Value`] tree first (variables and includes
//! fully resolved), and the tree is then handed to serde, allowing
//! configuration to be read straight into `#[derive(Deserialize)]` types.
//! Timestamps deserialize as their `YYYY-MM-DDTHH:MM:SSZ` literal.

use crate::error::{ConfError, Result, SerdeError};
use crate::number::format_timestamp;
use crate::parser::ConfParser;
use crate::value::{Array, Map, Value};
use crate::variables::VariableHandler;
use serde::de::{self, DeserializeOwned, DeserializeSeed, IntoDeserializer, Visitor};
use std::path::Path;

/// Deserializer over a parsed value tree
pub struct ValueDeserializer {
    value: Value,
}

impl ValueDeserializer {
    /// Creates a deserializer for `value`
    pub fn new(value: Value) -> Self {
        Self { value }
    }
}

impl<'de> de::Deserializer<'de> for ValueDeserializer {
    type Error = ConfError;

    fn deserialize_any<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::String(s) => visitor.visit_string(s),
            Value::Integer(i) => visitor.visit_i64(i),
            Value::Float(f) => visitor.visit_f64(f),
            Value::Bool(b) => visitor.visit_bool(b),
            Value::Timestamp(ts) => visitor.visit_string(format_timestamp(&ts)),
            Value::Map(map) => visitor.visit_map(MapAccess::new(map)),
            Value::Array(array) => visitor.visit_seq(SeqAccess::new(*array)),
        }
    }

    /// The format has no null, so every present value is `Some`
    fn deserialize_option<V>(self, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_some(self)
    }

    fn deserialize_newtype_struct<V>(self, _name: &'static str, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        visitor.visit_newtype_struct(self)
    }

    fn deserialize_enum<V>(
        self,
        _name: &'static str,
        _variants: &'static [&'static str],
        visitor: V,
    ) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            // Unit variant
            Value::String(s) => visitor.visit_enum(s.into_deserializer()),
            // Data variant, written as a single-key map
            Value::Map(mut map) if map.len() == 1 => match map.shift_remove_index(0) {
                Some((variant, node)) => visitor.visit_enum(EnumAccess {
                    variant,
                    value: node.value,
                }),
                None => Err(type_mismatch("enum", "empty map")),
            },
            other => Err(type_mismatch(
                "enum (string or single-key map)",
                other.type_name(),
            )),
        }
    }

    serde::forward_to_deserialize_any! {
        bool i8 i16 i32 i64 i128 u8 u16 u32 u64 u128 f32 f64 char str string
        bytes byte_buf unit unit_struct seq tuple
        tuple_struct map struct identifier ignored_any
    }
}

fn type_mismatch(expected: &'static str, found: &'static str) -> ConfError {
    ConfError::Serde(SerdeError::TypeMismatch { expected, found })
}

/// Sequence access for arrays
struct SeqAccess {
    items: smallvec::IntoIter<[crate::value::Node; 4]>,
}

impl SeqAccess {
    fn new(array: Array) -> Self {
        Self {
            items: array.into_iter(),
        }
    }
}

impl<'de> de::SeqAccess<'de> for SeqAccess {
    type Error = ConfError;

    fn next_element_seed<T>(&mut self, seed: T) -> Result<Option<T::Value>>
    where
        T: DeserializeSeed<'de>,
    {
        match self.items.next() {
            Some(node) => seed.deserialize(ValueDeserializer::new(node.value)).map(Some),
            None => Ok(None),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.items.len())
    }
}

/// Map access for maps
struct MapAccess {
    entries: indexmap::map::IntoIter<String, crate::value::Node>,
    current_value: Option<Value>,
}

impl MapAccess {
    fn new(map: Map) -> Self {
        Self {
            entries: map.into_iter(),
            current_value: None,
        }
    }
}

impl<'de> de::MapAccess<'de> for MapAccess {
    type Error = ConfError;

    fn next_key_seed<K>(&mut self, seed: K) -> Result<Option<K::Value>>
    where
        K: DeserializeSeed<'de>,
    {
        match self.entries.next() {
            Some((key, node)) => {
                self.current_value = Some(node.value);
                seed.deserialize(ValueDeserializer::new(Value::String(key)))
                    .map(Some)
            }
            None => Ok(None),
        }
    }

    fn next_value_seed<V>(&mut self, seed: V) -> Result<V::Value>
    where
        V: DeserializeSeed<'de>,
    {
        match self.current_value.take() {
            Some(value) => seed.deserialize(ValueDeserializer::new(value)),
            None => Err(ConfError::Serde(SerdeError::Custom(
                "No value available for map entry".to_string(),
            ))),
        }
    }

    fn size_hint(&self) -> Option<usize> {
        Some(self.entries.len())
    }
}

/// Enum access for single-key map variants
struct EnumAccess {
    variant: String,
    value: Value,
}

impl<'de> de::EnumAccess<'de> for EnumAccess {
    type Error = ConfError;
    type Variant = VariantAccess;

    fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant)>
    where
        V: DeserializeSeed<'de>,
    {
        let variant = seed.deserialize(ValueDeserializer::new(Value::String(self.variant)))?;
        Ok((variant, VariantAccess { value: self.value }))
    }
}

/// Variant access for data-carrying enum variants
struct VariantAccess {
    value: Value,
}

impl<'de> de::VariantAccess<'de> for VariantAccess {
    type Error = ConfError;

    fn unit_variant(self) -> Result<()> {
        Err(type_mismatch("unit variant", self.value.type_name()))
    }

    fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value>
    where
        T: DeserializeSeed<'de>,
    {
        seed.deserialize(ValueDeserializer::new(self.value))
    }

    fn tuple_variant<V>(self, _len: usize, visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Array(array) => visitor.visit_seq(SeqAccess::new(*array)),
            other => Err(type_mismatch("array", other.type_name())),
        }
    }

    fn struct_variant<V>(self, _fields: &'static [&'static str], visitor: V) -> Result<V::Value>
    where
        V: Visitor<'de>,
    {
        match self.value {
            Value::Map(map) => visitor.visit_map(MapAccess::new(map)),
            other => Err(type_mismatch("map", other.type_name())),
        }
    }
}

/// Deserializes an already parsed value tree
pub fn from_value<T: DeserializeOwned>(value: Value) -> Result<T> {
    T::deserialize(ValueDeserializer::new(value))
}

/// Parses configuration text and deserializes it into `T`
///
/// Variables not defined in the text fall back to the process environment.
pub fn from_str<T: DeserializeOwned>(s: &str) -> Result<T> {
    from_value(Value::Map(ConfParser::new().parse(s)?))
}

/// Parses configuration text with a custom variable handler and deserializes it
pub fn from_str_with_variables<T: DeserializeOwned>(
    s: &str,
    handler: Box<dyn VariableHandler>,
) -> Result<T> {
    let parser = ConfParser::builder().with_variable_handler(handler).build();
    from_value(Value::Map(parser.parse(s)?))
}

/// Reads a configuration file and deserializes it into `T`
pub fn from_file<T: DeserializeOwned>(path: impl AsRef<Path>) -> Result<T> {
    from_value(Value::Map(ConfParser::new().parse_file(path)?))
}
