//! Parser turning lexer items into value trees
//!
//! The parser is an iterative state machine: it pulls one item at a time from
//! the [`Lexer`], keeps a stack of open containers plus a stack of pending keys,
//! and stores every finished value into the container on top of the stack.
//! Variable references and include directives are resolved while parsing, so
//! the tree handed back is fully expanded.
//!
//! Trees are generic over their node metadata: `()` for plain parses and
//! [`Provenance`] for pedantic parses, which remember where each value came
//! from.

use crate::error::{ConfError, ParseError, Position, Result};
use crate::include::{FileSystemLoader, SourceLoader};
use crate::lexer::{ItemKind, Lexer, LexerConfig};
use crate::number::{parse_bool, parse_float, parse_integer, parse_timestamp};
use crate::value::{Array, Map, Metadata, Node, Provenance, Value};
use crate::variables::{EnvironmentVariableHandler, VariableHandler};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Configuration options for the parser
#[derive(Debug, Clone)]
pub struct ParserConfig {
    /// Maximum depth of nested `include` directives
    pub max_include_depth: usize,
}

impl ParserConfig {
    /// Creates a new parser configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the maximum include depth
    pub fn with_max_include_depth(mut self, depth: usize) -> Self {
        self.max_include_depth = depth;
        self
    }
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_include_depth: 32,
        }
    }
}

/// Container being populated
#[derive(Debug)]
pub(crate) enum Container<M> {
    Map(Map<M>),
    Array(Array<M>),
}

/// An open container and the position where it started
#[derive(Debug)]
pub(crate) struct Context<M> {
    pub(crate) container: Container<M>,
    pub(crate) position: Position,
}

impl<M: Metadata> Context<M> {
    fn map(position: Position) -> Self {
        Self {
            container: Container::Map(Map::new()),
            position,
        }
    }

    fn array(position: Position) -> Self {
        Self {
            container: Container::Array(Array::new()),
            position,
        }
    }

    fn into_value(self) -> Value<M> {
        match self.container {
            Container::Map(map) => Value::Map(map),
            Container::Array(items) => Value::Array(Box::new(items)),
        }
    }
}

/// Per-document parse state
#[derive(Debug)]
pub(crate) struct ParserState<M> {
    /// Open containers, root first
    pub(crate) contexts: Vec<Context<M>>,
    /// Keys waiting for their value
    pub(crate) keys: Vec<String>,
    /// Where each pending key was written
    pub(crate) key_positions: Vec<Position>,
}

impl<M: Metadata> ParserState<M> {
    fn new() -> Self {
        Self {
            contexts: vec![Context::map(Position::new())],
            keys: Vec::new(),
            key_positions: Vec::new(),
        }
    }
}

/// Configured parser for configuration documents
///
/// A `ConfParser` owns its variable handler and source loader and can parse
/// any number of documents. Each call is independent.
///
/// # Examples
///
/// ```rust
/// use flexconf::{ConfParser, MapVariableHandler};
///
/// let mut vars = MapVariableHandler::new();
/// vars.insert("PORT".to_string(), "4222".to_string());
///
/// let parser = ConfParser::builder()
///     .with_variable_handler(Box::new(vars))
///     .build();
/// let config = parser.parse("listen { port = $PORT }").unwrap();
/// assert_eq!(config["listen"].value.lookup("port").and_then(|v| v.as_integer()), Some(4222));
/// ```
pub struct ConfParser {
    pub(crate) lexer_config: LexerConfig,
    pub(crate) config: ParserConfig,
    pub(crate) variable_handler: Box<dyn VariableHandler>,
    pub(crate) loader: Box<dyn SourceLoader>,
    source_file: Option<Arc<Path>>,
    base_dir: PathBuf,
}

impl ConfParser {
    /// Creates a parser reading the process environment and the file system
    pub fn new() -> Self {
        Self {
            lexer_config: LexerConfig::default(),
            config: ParserConfig::default(),
            variable_handler: Box::new(EnvironmentVariableHandler),
            loader: Box::new(FileSystemLoader),
            source_file: None,
            base_dir: PathBuf::new(),
        }
    }

    /// Starts building a customized parser
    pub fn builder() -> ConfParserBuilder {
        ConfParserBuilder::new()
    }

    /// Returns the parser configuration
    pub fn config(&self) -> &ParserConfig {
        &self.config
    }

    /// Parses a map-rooted document
    pub fn parse(&self, input: &str) -> Result<Map> {
        into_map(self.parse_text(input)?)
    }

    /// Parses a map-rooted document, recording where every value came from
    pub fn parse_pedantic(&self, input: &str) -> Result<Map<Provenance>> {
        into_map(self.parse_text(input)?)
    }

    /// Parses a document whose root may be a map or an array
    pub fn parse_value(&self, input: &str) -> Result<Value> {
        self.parse_text(input)
    }

    /// Parses a map- or array-rooted document in pedantic mode
    pub fn parse_value_pedantic(&self, input: &str) -> Result<Value<Provenance>> {
        self.parse_text(input)
    }

    /// Reads and parses a file; includes resolve relative to its directory
    pub fn parse_file(&self, path: impl AsRef<Path>) -> Result<Map> {
        into_map(self.parse_path(path.as_ref())?)
    }

    /// Reads and parses a file in pedantic mode
    pub fn parse_file_pedantic(&self, path: impl AsRef<Path>) -> Result<Map<Provenance>> {
        into_map(self.parse_path(path.as_ref())?)
    }

    fn parse_text<M: Metadata>(&self, input: &str) -> Result<Value<M>> {
        let document = DocumentParser::new(self, self.source_file.clone(), self.base_dir.clone());
        document.parse_root(input)
    }

    fn parse_path<M: Metadata>(&self, path: &Path) -> Result<Value<M>> {
        let input = self.loader.load(path).map_err(|source| ConfError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut document = DocumentParser::new(self, Some(Arc::from(path)), parent_dir(path));
        document.include_chain.push(self.loader.canonical(path));
        document.parse_root(&input)
    }
}

impl Default for ConfParser {
    fn default() -> Self {
        Self::new()
    }
}

/// Directory that relative includes in `path` resolve against
pub(crate) fn parent_dir(path: &Path) -> PathBuf {
    path.parent().map(Path::to_path_buf).unwrap_or_default()
}

fn into_map<M>(value: Value<M>) -> Result<Map<M>> {
    match value {
        Value::Map(map) => Ok(map),
        other => Err(ParseError::NotAMap {
            found: other.type_name(),
        }
        .into()),
    }
}

/// Parser for a single document
///
/// Included files and environment values are parsed by nested instances that
/// inherit the include chain and the variable expansion stack.
pub(crate) struct DocumentParser<'p, M: Metadata> {
    pub(crate) parser: &'p ConfParser,
    pub(crate) source_file: Option<Arc<Path>>,
    pub(crate) base_dir: PathBuf,
    /// Files currently being parsed, outermost first
    pub(crate) include_chain: Vec<PathBuf>,
    pub(crate) include_depth: usize,
    /// Environment variables currently being expanded
    pub(crate) expansion_stack: Vec<String>,
    pub(crate) state: ParserState<M>,
}

impl<'p, M: Metadata> DocumentParser<'p, M> {
    pub(crate) fn new(
        parser: &'p ConfParser,
        source_file: Option<Arc<Path>>,
        base_dir: PathBuf,
    ) -> Self {
        Self {
            parser,
            source_file,
            base_dir,
            include_chain: Vec::new(),
            include_depth: 0,
            expansion_stack: Vec::new(),
            state: ParserState::new(),
        }
    }

    /// Creates a parser for a nested document sharing this one's guards
    pub(crate) fn nested<N: Metadata>(
        &self,
        source_file: Option<Arc<Path>>,
        base_dir: PathBuf,
    ) -> DocumentParser<'p, N> {
        let mut nested = DocumentParser::new(self.parser, source_file, base_dir);
        nested.include_chain = self.include_chain.clone();
        nested.include_depth = self.include_depth;
        nested.expansion_stack = self.expansion_stack.clone();
        nested
    }

    /// Parses a top-level document, logging its start and outcome
    fn parse_root(self, input: &str) -> Result<Value<M>> {
        let source = self
            .source_file
            .as_deref()
            .map(|path| path.display().to_string())
            .unwrap_or_else(|| "<string>".to_string());
        debug!(source = %source, pedantic = M::PEDANTIC, "parsing configuration");

        let value = self.parse_document(input)?;
        let entries = match &value {
            Value::Map(map) => map.len(),
            Value::Array(items) => items.len(),
            _ => 0,
        };
        debug!(source = %source, entries, "parsed configuration");
        Ok(value)
    }

    /// Metadata for a value produced at `position`
    pub(crate) fn capture(&self, position: Position) -> M {
        M::capture(position, self.source_file.as_ref())
    }

    /// Runs the parser over `input` and returns the root value
    pub(crate) fn parse_document(mut self, input: &str) -> Result<Value<M>> {
        let mut lexer = Lexer::with_config(input, self.parser.lexer_config.clone());
        let mut at_start = true;

        loop {
            let item = lexer.next_item();
            let position = item.position;
            let first = std::mem::replace(&mut at_start, false);

            match item.kind {
                ItemKind::Key(key) => {
                    self.state.keys.push(key);
                    self.state.key_positions.push(position);
                }
                ItemKind::MapStart => self.state.contexts.push(Context::map(position)),
                ItemKind::ArrayStart if first => {
                    self.state.contexts = vec![Context::array(position)];
                }
                ItemKind::ArrayStart => self.state.contexts.push(Context::array(position)),
                ItemKind::MapEnd | ItemKind::ArrayEnd => {
                    // Closing an array root leaves it in place as the result
                    if self.state.contexts.len() > 1 {
                        self.close_context(position)?;
                    }
                }
                ItemKind::String(s) => {
                    let node = Node::new(Value::String(s), self.capture(position));
                    self.store(node, position)?;
                }
                ItemKind::Integer(raw) => {
                    let value = Value::Integer(parse_integer(&raw, position)?);
                    self.store(Node::new(value, self.capture(position)), position)?;
                }
                ItemKind::Float(raw) => {
                    let value = Value::Float(parse_float(&raw, position)?);
                    self.store(Node::new(value, self.capture(position)), position)?;
                }
                ItemKind::Bool(raw) => {
                    let value = Value::Bool(parse_bool(&raw));
                    self.store(Node::new(value, self.capture(position)), position)?;
                }
                ItemKind::Timestamp(raw) => {
                    let value = Value::Timestamp(parse_timestamp(&raw, position)?);
                    self.store(Node::new(value, self.capture(position)), position)?;
                }
                ItemKind::Variable(name) => {
                    let node = self.resolve_variable(&name, position)?;
                    self.store(node, position)?;
                }
                ItemKind::Include(path) => self.include_file(&path, position)?,
                ItemKind::Error(error) => return Err(error.into()),
                ItemKind::Eof => break,
            }
        }

        if let Some(key) = self.state.keys.last() {
            return Err(ParseError::MalformedDocument {
                message: format!("key '{key}' has no value"),
                position: lexer.current_position(),
            }
            .into());
        }

        match self.state.contexts.pop() {
            Some(root) if self.state.contexts.is_empty() => Ok(root.into_value()),
            _ => Err(ParseError::MalformedDocument {
                message: "unbalanced containers at end of input".to_string(),
                position: lexer.current_position(),
            }
            .into()),
        }
    }

    fn close_context(&mut self, position: Position) -> Result<()> {
        let Some(context) = self.state.contexts.pop() else {
            return Err(ParseError::MalformedDocument {
                message: "closing delimiter without an open container".to_string(),
                position,
            }
            .into());
        };
        let meta = self.capture(context.position);
        self.store(Node::new(context.into_value(), meta), position)
    }

    /// Stores a finished value into the container on top of the stack
    ///
    /// Arrays append. Maps take the most recent pending key; a repeated key
    /// replaces the earlier value.
    pub(crate) fn store(&mut self, mut node: Node<M>, position: Position) -> Result<()> {
        let Some(context) = self.state.contexts.last_mut() else {
            return Err(ParseError::MalformedDocument {
                message: "value outside of any container".to_string(),
                position,
            }
            .into());
        };

        match &mut context.container {
            Container::Array(items) => items.push(node),
            Container::Map(map) => {
                let (Some(key), Some(key_position)) =
                    (self.state.keys.pop(), self.state.key_positions.pop())
                else {
                    return Err(ParseError::MalformedDocument {
                        message: "value without a key".to_string(),
                        position,
                    }
                    .into());
                };
                node.meta.relocate(key_position);
                map.insert(key, node);
            }
        }
        Ok(())
    }
}

/// Builder for creating a customized [`ConfParser`]
pub struct ConfParserBuilder {
    lexer_config: Option<LexerConfig>,
    parser_config: Option<ParserConfig>,
    variable_handler: Option<Box<dyn VariableHandler>>,
    loader: Option<Box<dyn SourceLoader>>,
    source_file: Option<PathBuf>,
    base_dir: Option<PathBuf>,
}

impl ConfParserBuilder {
    /// Creates a new parser builder
    pub fn new() -> Self {
        Self {
            lexer_config: None,
            parser_config: None,
            variable_handler: None,
            loader: None,
            source_file: None,
            base_dir: None,
        }
    }

    /// Sets the lexer configuration
    pub fn with_lexer_config(mut self, config: LexerConfig) -> Self {
        self.lexer_config = Some(config);
        self
    }

    /// Sets the parser configuration
    pub fn with_parser_config(mut self, config: ParserConfig) -> Self {
        self.parser_config = Some(config);
        self
    }

    /// Sets the handler consulted for variables not defined in the document
    pub fn with_variable_handler(mut self, handler: Box<dyn VariableHandler>) -> Self {
        self.variable_handler = Some(handler);
        self
    }

    /// Sets the loader used to read included files
    pub fn with_source_loader(mut self, loader: Box<dyn SourceLoader>) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Names the file text passed to `parse` came from
    ///
    /// Pedantic values report this file, and unless a base directory is set,
    /// includes resolve relative to its directory.
    pub fn with_source_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.source_file = Some(path.into());
        self
    }

    /// Sets the directory relative includes resolve against
    pub fn with_base_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.base_dir = Some(dir.into());
        self
    }

    /// Builds the parser
    pub fn build(self) -> ConfParser {
        let base_dir = match (self.base_dir, &self.source_file) {
            (Some(dir), _) => dir,
            (None, Some(file)) => parent_dir(file),
            (None, None) => PathBuf::new(),
        };

        ConfParser {
            lexer_config: self.lexer_config.unwrap_or_default(),
            config: self.parser_config.unwrap_or_default(),
            variable_handler: self
                .variable_handler
                .unwrap_or_else(|| Box::new(EnvironmentVariableHandler)),
            loader: self.loader.unwrap_or_else(|| Box::new(FileSystemLoader)),
            source_file: self.source_file.map(Arc::from),
            base_dir,
        }
    }
}

impl Default for ConfParserBuilder {
    fn default() -> Self {
        Self::new()
    }
}
