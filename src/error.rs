//! Error types and position tracking for configuration parsing
//!
//! Every error carries the position it was detected at so callers can point
//! users at the offending line. Errors from included files are wrapped with
//! the name of the file that failed.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Represents a position in the source text
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Position {
    /// Line number (1-based)
    pub line: usize,
    /// Column number (1-based)
    pub column: usize,
    /// Byte offset from start of input (0-based)
    pub offset: usize,
}

impl Position {
    /// Creates a new position at the start of input
    pub fn new() -> Self {
        Self {
            line: 1,
            column: 1,
            offset: 0,
        }
    }

    /// Advances the position by one character
    pub fn advance(&mut self, c: char) {
        match c {
            '\n' => {
                self.line += 1;
                self.column = 1;
            }
            _ => {
                self.column += 1;
            }
        }
        self.offset += c.len_utf8();
    }
}

impl Default for Position {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for Position {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.line, self.column)
    }
}

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, ConfError>;

/// Main error type for configuration parsing operations
#[derive(Debug, Error)]
pub enum ConfError {
    /// Lexical analysis error
    #[error("Lexical error: {0}")]
    Lex(#[from] LexError),

    /// Parsing error
    #[error("Parse error: {0}")]
    Parse(#[from] ParseError),

    /// Serde deserialization error
    #[error("Serde error: {0}")]
    Serde(#[from] SerdeError),

    /// Failure reading a configuration source
    #[error("IO error reading '{}': {source}", .path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfError {
    /// Returns the innermost error, looking through include wrappers
    pub fn root_cause(&self) -> &ConfError {
        match self {
            ConfError::Parse(ParseError::Include { source, .. }) => source.root_cause(),
            other => other,
        }
    }

    /// Returns true if this error, or the error it wraps, is a missing variable
    pub fn is_variable_not_found(&self) -> bool {
        matches!(
            self.root_cause(),
            ConfError::Parse(ParseError::VariableNotFound { .. })
        )
    }
}

/// Lexical analysis errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LexError {
    /// Unexpected character encountered
    #[error("Unexpected character '{character}' at {position}")]
    UnexpectedCharacter { character: char, position: Position },

    /// Quoted string or key missing its closing quote
    #[error("Unterminated string at {position}")]
    UnterminatedString { position: Position },

    /// Invalid escape sequence in a double-quoted string
    #[error("Invalid escape sequence '\\{sequence}' at {position}")]
    InvalidEscape { sequence: String, position: Position },

    /// Input ended while a construct was still open
    #[error("Unexpected end of input at {position}, expected {expected}")]
    UnexpectedEof {
        expected: &'static str,
        position: Position,
    },

    /// Maps and arrays nested deeper than the configured limit
    #[error("Maximum nesting depth {max} exceeded at {position}")]
    NestingTooDeep { max: usize, position: Position },

    /// `include` directive without a path
    #[error("Include directive without a file path at {position}")]
    MissingIncludePath { position: Position },
}

impl LexError {
    /// Returns the position where the error was detected
    pub fn position(&self) -> Position {
        match self {
            LexError::UnexpectedCharacter { position, .. }
            | LexError::UnterminatedString { position }
            | LexError::InvalidEscape { position, .. }
            | LexError::UnexpectedEof { position, .. }
            | LexError::NestingTooDeep { position, .. }
            | LexError::MissingIncludePath { position } => *position,
        }
    }
}

/// Parsing errors
#[derive(Debug, Error)]
pub enum ParseError {
    /// The document's structure is incomplete or inconsistent
    #[error("Config is invalid at {position}: {message}")]
    MalformedDocument { message: String, position: Position },

    /// Integer literal that is not base-10 or overflows after scaling
    #[error("Invalid integer '{literal}' at {position}")]
    InvalidNumber { literal: String, position: Position },

    /// Float literal that failed to decode
    #[error("Expected float, but got '{literal}' at {position}")]
    InvalidFloat { literal: String, position: Position },

    /// Timestamp literal with a valid shape but impossible date or time
    #[error("Invalid timestamp '{literal}' at {position}")]
    InvalidTimestamp { literal: String, position: Position },

    /// Variable reference that resolves in no scope and no environment
    #[error("Variable reference for '{name}' on line {} can not be found", .position.line)]
    VariableNotFound { name: String, position: Position },

    /// Environment value that refers back to a variable being expanded
    #[error("Circular variable reference: {chain}")]
    CircularReference { chain: String, position: Position },

    /// Failure while parsing an included file
    #[error("Error parsing include file '{}' at {position}: {source}", .file.display())]
    Include {
        file: PathBuf,
        position: Position,
        #[source]
        source: Box<ConfError>,
    },

    /// An include chain that revisits a file
    #[error("Include cycle detected: '{}' is already being included", .file.display())]
    IncludeCycle { file: PathBuf, position: Position },

    /// Includes nested deeper than the configured limit
    #[error("Maximum include depth {max} exceeded at {position}")]
    IncludeDepthExceeded { max: usize, position: Position },

    /// A document (or included file) whose root is not a map
    #[error("Document root must be a map, found {found}")]
    NotAMap { found: &'static str },
}

/// Serde deserialization errors
#[derive(Debug, Error)]
pub enum SerdeError {
    /// Message produced by a `Deserialize` implementation
    #[error("{0}")]
    Custom(String),

    /// Value type did not match what the target type expected
    #[error("Type mismatch: expected {expected}, found {found}")]
    TypeMismatch {
        expected: &'static str,
        found: &'static str,
    },
}

impl serde::de::Error for ConfError {
    fn custom<T: fmt::Display>(msg: T) -> Self {
        ConfError::Serde(SerdeError::Custom(msg.to_string()))
    }
}
