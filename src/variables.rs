//! Variable references and the handlers that resolve them
//!
//! A `$name` reference resolves, in order:
//!
//! 1. to itself when it is a bcrypt hash (`$2a$...`), which only looks like a
//!    variable;
//! 2. to the nearest enclosing map that defines `name`, innermost first, so
//!    inner definitions shadow outer ones;
//! 3. to the value the [`VariableHandler`] returns for `name`, parsed with the
//!    same rules as a document value (`8k`, `true` and `2.5` keep their types).
//!
//! Anything else is a [`ParseError::VariableNotFound`].

use crate::error::{ParseError, Position, Result};
use crate::parser::{Container, DocumentParser};
use crate::value::{Metadata, Node, Value};
use std::collections::HashMap;
use tracing::debug;

/// Prefix of bcrypt hashes, which are kept verbatim
const BCRYPT_PREFIX: &str = "2a$";

/// Key used for the one-entry document an environment value is parsed from
const ENV_VALUE_KEY: &str = "value";

/// Trait for resolving variables the document itself does not define
pub trait VariableHandler {
    /// Resolves a variable by name, returning its raw text
    fn resolve_variable(&self, name: &str) -> Option<String>;
}

/// Environment variable handler
pub struct EnvironmentVariableHandler;

impl VariableHandler for EnvironmentVariableHandler {
    fn resolve_variable(&self, name: &str) -> Option<String> {
        std::env::var(name).ok()
    }
}

/// Map-based variable handler
pub struct MapVariableHandler {
    variables: HashMap<String, String>,
}

impl MapVariableHandler {
    /// Creates a new map variable handler
    pub fn new() -> Self {
        Self {
            variables: HashMap::new(),
        }
    }

    /// Creates a handler from an existing map
    pub fn from_map(variables: HashMap<String, String>) -> Self {
        Self { variables }
    }

    /// Inserts a variable
    pub fn insert(&mut self, name: String, value: String) {
        self.variables.insert(name, value);
    }

    /// Gets a reference to the internal map
    pub fn variables(&self) -> &HashMap<String, String> {
        &self.variables
    }
}

impl Default for MapVariableHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableHandler for MapVariableHandler {
    fn resolve_variable(&self, name: &str) -> Option<String> {
        self.variables.get(name).cloned()
    }
}

/// Chained variable handler that tries multiple handlers in order
pub struct ChainedVariableHandler {
    handlers: Vec<Box<dyn VariableHandler>>,
}

impl ChainedVariableHandler {
    /// Creates a new chained handler
    pub fn new() -> Self {
        Self {
            handlers: Vec::new(),
        }
    }

    /// Adds a handler to the end of the chain
    pub fn add_handler(&mut self, handler: Box<dyn VariableHandler>) {
        self.handlers.push(handler);
    }

    /// Creates a chained handler from a vector of handlers
    pub fn from_handlers(handlers: Vec<Box<dyn VariableHandler>>) -> Self {
        Self { handlers }
    }
}

impl Default for ChainedVariableHandler {
    fn default() -> Self {
        Self::new()
    }
}

impl VariableHandler for ChainedVariableHandler {
    fn resolve_variable(&self, name: &str) -> Option<String> {
        self.handlers
            .iter()
            .find_map(|handler| handler.resolve_variable(name))
    }
}

impl<M: Metadata> DocumentParser<'_, M> {
    /// Resolves a `$name` reference found at `position`
    pub(crate) fn resolve_variable(&mut self, name: &str, position: Position) -> Result<Node<M>> {
        if name.starts_with(BCRYPT_PREFIX) {
            let literal = format!("${name}");
            return Ok(Node::new(Value::String(literal), self.capture(position)));
        }

        if let Some(value) = self.lookup_scope(name) {
            return Ok(Node::new(value, self.capture(position)));
        }

        let Some(raw) = self.parser.variable_handler.resolve_variable(name) else {
            return Err(ParseError::VariableNotFound {
                name: name.to_string(),
                position,
            }
            .into());
        };
        let value = self.expand_external(name, &raw, position)?;
        Ok(Node::new(value, self.capture(position)))
    }

    /// Searches open maps from innermost to outermost, marking the hit as used
    fn lookup_scope(&mut self, name: &str) -> Option<Value<M>> {
        self.state
            .contexts
            .iter_mut()
            .rev()
            .find_map(|context| match &mut context.container {
                Container::Map(map) => map.get_mut(name).map(|node| {
                    node.meta.mark_used();
                    node.value.clone()
                }),
                Container::Array(_) => None,
            })
    }

    /// Parses a handler-provided value as if it were written in the document
    fn expand_external(&self, name: &str, raw: &str, position: Position) -> Result<Value<M>> {
        if self.expansion_stack.iter().any(|active| active == name) {
            let mut chain = self.expansion_stack.clone();
            chain.push(name.to_string());
            return Err(ParseError::CircularReference {
                chain: chain.join(" -> "),
                position,
            }
            .into());
        }

        debug!(variable = name, "resolving variable from environment");
        let mut nested: DocumentParser<'_, M> =
            self.nested(self.source_file.clone(), self.base_dir.clone());
        nested.expansion_stack.push(name.to_string());

        let document = format!("{ENV_VALUE_KEY} = {raw}");
        match nested.parse_document(&document)? {
            Value::Map(mut map) => map
                .shift_remove(ENV_VALUE_KEY)
                .map(Node::into_value)
                .ok_or_else(|| {
                    ParseError::MalformedDocument {
                        message: format!("variable '{name}' did not produce a value"),
                        position,
                    }
                    .into()
                }),
            other => Err(ParseError::NotAMap {
                found: other.type_name(),
            }
            .into()),
        }
    }
}
