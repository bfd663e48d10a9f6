//! # flexconf
//!
//! A lexer and parser for a flexible server configuration format, with serde
//! integration.
//!
//! ## Overview
//!
//! The format is a superset of JSON meant to be written by hand. Keys need no
//! quotes, separators are optional, integers take unit suffixes, and values
//! can refer to each other and to the environment:
//!
//! ```text
//! # Server settings
//! listen: 0.0.0.0:4222
//! max_payload = 1MB
//!
//! limit = 64k
//! cluster {
//!   port: 6222
//!   routes [ nats://a:6222, nats://b:6222 ]
//!   max_pending = $limit
//! }
//!
//! started = 2016-05-04T18:53:41Z
//! include ./auth.conf
//! ```
//!
//! ## Key Features
//!
//! - **JSON compatible**: any JSON object is a valid document
//! - **Relaxed syntax**: bare keys, bare strings, `=`/`:`/nothing between key
//!   and value, optional `,`/`;` separators, `#` and `//` comments
//! - **Unit suffixes**: `8k` is 8000, `4kb` and `4ki` are 4096
//! - **Variables**: `$name` resolves through enclosing maps, then the
//!   environment (or a custom [`VariableHandler`])
//! - **Includes**: `include "file"` splices another file's entries in place
//! - **Pedantic mode**: every value remembers its line, column and file
//!
//! ## Basic Usage
//!
//! ```rust
//! use flexconf::{Value, parse};
//!
//! let config = parse("port = 4222\nmax_payload = 2mb")?;
//! assert_eq!(config["port"].value, Value::Integer(4222));
//! assert_eq!(config["max_payload"].value, Value::Integer(2 * 1024 * 1024));
//! # Ok::<(), flexconf::ConfError>(())
//! ```
//!
//! ## Serde Integration
//!
//! ```rust
//! use serde::Deserialize;
//! use flexconf::from_str;
//!
//! #[derive(Debug, Deserialize)]
//! struct ServerConfig {
//!     name: String,
//!     port: u16,
//!     debug: bool,
//! }
//!
//! let text = r#"
//!     name = "my-server"
//!     port = 8080
//!     debug = on
//! "#;
//!
//! let config: ServerConfig = from_str(text)?;
//! assert_eq!(config.port, 8080);
//! assert!(config.debug);
//! # Ok::<(), flexconf::ConfError>(())
//! ```
//!
//! ## Pedantic Mode
//!
//! ```rust
//! use flexconf::parse_pedantic;
//!
//! let config = parse_pedantic("a = 1\n\nb = $a")?;
//! assert_eq!(config["b"].source_line(), 3);
//! assert!(config["a"].is_used_variable());
//! # Ok::<(), flexconf::ConfError>(())
//! ```
//!
//! ## Error Handling
//!
//! Errors carry the position they were detected at:
//!
//! ```rust
//! use flexconf::{ConfError, LexError, parse};
//!
//! match parse("key = \"unterminated string") {
//!     Err(ConfError::Lex(LexError::UnterminatedString { position })) => {
//!         assert_eq!((position.line, position.column), (1, 7));
//!     }
//!     other => panic!("unexpected result: {other:?}"),
//! }
//! ```

pub mod deserializer;
pub mod error;
pub mod include;
pub mod lexer;
pub mod number;
pub mod parser;
pub mod value;
pub mod variables;

#[cfg(test)]
mod error_tests;

use std::path::Path;

// Re-export main types and functions
pub use deserializer::{ValueDeserializer, from_file, from_str, from_str_with_variables, from_value};
pub use error::{ConfError, LexError, ParseError, Position, Result, SerdeError};
pub use include::{FileSystemLoader, MemoryLoader, SourceLoader};
pub use lexer::{Item, ItemKind, Lexer, LexerConfig};
pub use parser::{ConfParser, ConfParserBuilder, ParserConfig};
pub use value::{Array, Map, Metadata, Node, Provenance, Value, strip_map};

// Re-export variable handler types
pub use variables::{
    ChainedVariableHandler, EnvironmentVariableHandler, MapVariableHandler, VariableHandler,
};

/// Parses a configuration document
pub fn parse(input: &str) -> Result<Map> {
    ConfParser::new().parse(input)
}

/// Parses a configuration document, recording where each value came from
pub fn parse_pedantic(input: &str) -> Result<Map<Provenance>> {
    ConfParser::new().parse_pedantic(input)
}

/// Reads and parses a configuration file
pub fn parse_file(path: impl AsRef<Path>) -> Result<Map> {
    ConfParser::new().parse_file(path)
}

/// Reads and parses a configuration file in pedantic mode
pub fn parse_file_pedantic(path: impl AsRef<Path>) -> Result<Map<Provenance>> {
    ConfParser::new().parse_file_pedantic(path)
}

/// Parses a document whose root may also be an array
pub fn parse_value(input: &str) -> Result<Value> {
    ConfParser::new().parse_value(input)
}

/// Parses a map- or array-rooted document in pedantic mode
pub fn parse_value_pedantic(input: &str) -> Result<Value<Provenance>> {
    ConfParser::new().parse_value_pedantic(input)
}
