//! Lexical analyzer for configuration text
//!
//! The lexer turns input text into a lazy stream of [`Item`]s. It knows just
//! enough about nesting to decide whether the next bare word is a key or a
//! value; building the value tree is left to the parser.
//!
//! Separators are optional almost everywhere: `key = value`, `key: value`,
//! `key value` and `key { ... }` are all entries, and entries or array
//! elements may be separated by `,`, `;`, newlines or plain whitespace.

use crate::error::{LexError, Position};
use crate::number::{is_bool_literal, is_timestamp_shape};

/// Configuration options for the lexer
#[derive(Debug, Clone)]
pub struct LexerConfig {
    /// Maximum nesting depth of maps and arrays to prevent runaway input
    pub max_nesting_depth: usize,
}

impl LexerConfig {
    /// Sets the maximum nesting depth
    pub fn with_max_nesting_depth(mut self, depth: usize) -> Self {
        self.max_nesting_depth = depth;
        self
    }
}

impl Default for LexerConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: 128,
        }
    }
}

/// Kind of a lexical item, with its payload
#[derive(Debug, Clone, PartialEq)]
pub enum ItemKind {
    /// Map key, quotes removed
    Key(String),
    /// Quoted or bare string, escapes resolved
    String(String),
    /// Integer literal with optional unit suffix, undecoded
    Integer(String),
    /// Float literal, undecoded
    Float(String),
    /// Boolean word, undecoded
    Bool(String),
    /// `YYYY-MM-DDTHH:MM:SSZ` literal, undecoded
    Timestamp(String),
    /// Variable reference, `$` removed
    Variable(String),
    /// Path of an `include` directive
    Include(String),
    MapStart,
    MapEnd,
    ArrayStart,
    ArrayEnd,
    Error(LexError),
    Eof,
}

/// One lexical unit and where it starts
#[derive(Debug, Clone, PartialEq)]
pub struct Item {
    pub kind: ItemKind,
    pub position: Position,
}

impl Item {
    fn new(kind: ItemKind, position: Position) -> Self {
        Self { kind, position }
    }

    /// Returns the item's text: its payload, or the delimiter it stands for
    pub fn lexeme(&self) -> &str {
        match &self.kind {
            ItemKind::Key(s)
            | ItemKind::String(s)
            | ItemKind::Integer(s)
            | ItemKind::Float(s)
            | ItemKind::Bool(s)
            | ItemKind::Timestamp(s)
            | ItemKind::Variable(s)
            | ItemKind::Include(s) => s,
            ItemKind::MapStart => "{",
            ItemKind::MapEnd => "}",
            ItemKind::ArrayStart => "[",
            ItemKind::ArrayEnd => "]",
            ItemKind::Error(_) | ItemKind::Eof => "",
        }
    }
}

/// Container the lexer is currently inside
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Frame {
    Map,
    Array,
}

/// What the lexer expects next
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    /// Nothing read yet; the first character decides the root shape
    Start,
    /// A map key, an include directive, or the end of the map
    Key,
    /// An optional `=` or `:` after a key
    AfterKey,
    /// A value, or the end of an array
    Value,
    /// An optional separator after a value
    ValueEnd,
    /// The braced or bracketed root has been closed
    Done,
}

fn is_key_terminator(ch: char) -> bool {
    ch.is_whitespace()
        || matches!(
            ch,
            '=' | ':' | '{' | '}' | '[' | ']' | ',' | ';' | '#' | '"' | '\''
        )
}

fn is_value_terminator(ch: char) -> bool {
    ch.is_whitespace() || matches!(ch, ',' | ';' | '}' | ']')
}

/// Classifies a bare (unquoted) value word
fn classify_bare(word: String) -> ItemKind {
    let unsigned = word.strip_prefix(['+', '-']).unwrap_or(&word);
    let numeric_start = match unsigned.as_bytes() {
        [b'0'..=b'9', ..] => true,
        [b'.', b'0'..=b'9', ..] => true,
        _ => false,
    };

    if is_timestamp_shape(&word) {
        return ItemKind::Timestamp(word);
    }
    if numeric_start {
        let dots = unsigned.matches('.').count();
        let numeric_chars = unsigned
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '+' | '-'));
        if dots == 1 && numeric_chars {
            return ItemKind::Float(word);
        }
        if dots == 0 && unsigned.chars().all(|c| c.is_ascii_alphanumeric()) {
            return ItemKind::Integer(word);
        }
        // IP addresses, dates, host:port pairs
        return ItemKind::String(word);
    }
    if is_bool_literal(&word) {
        return ItemKind::Bool(word);
    }
    ItemKind::String(word)
}

/// Lexer producing configuration items from text
#[derive(Debug, Clone)]
pub struct Lexer<'a> {
    /// Input text being lexed
    input: &'a str,
    /// Line, column and byte offset of `current_char`
    cursor: Position,
    /// Cached current character
    current_char: Option<char>,
    config: LexerConfig,
    /// Containers opened so far, root included
    frames: Vec<Frame>,
    state: State,
    /// Root map was written with explicit braces (JSON style)
    root_braced: bool,
    /// An `Eof` or `Error` item has been produced
    terminated: bool,
}

impl<'a> Lexer<'a> {
    /// Creates a new lexer with default configuration
    pub fn new(input: &'a str) -> Self {
        Self::with_config(input, LexerConfig::default())
    }

    /// Creates a new lexer with custom configuration
    pub fn with_config(input: &'a str, config: LexerConfig) -> Self {
        let mut lexer = Self {
            input,
            cursor: Position::new(),
            current_char: None,
            config,
            frames: Vec::new(),
            state: State::Start,
            root_braced: false,
            terminated: false,
        };
        lexer.current_char = lexer.peek_char();
        lexer
    }

    /// Returns the current position in the input
    #[inline(always)]
    pub fn current_position(&self) -> Position {
        self.cursor
    }

    /// Returns the current nesting depth (the root container counts as zero)
    pub fn nesting_depth(&self) -> usize {
        self.frames.len().saturating_sub(1)
    }

    /// Peeks at the current character without advancing
    #[inline(always)]
    pub fn peek_char(&self) -> Option<char> {
        self.input[self.cursor.offset..].chars().next()
    }

    /// Peeks at the character at the given offset from current position
    #[inline(always)]
    pub fn peek_char_at(&self, offset: usize) -> Option<char> {
        self.input[self.cursor.offset..].chars().nth(offset)
    }

    /// Advances to the next character and returns the one consumed
    #[inline(always)]
    pub fn advance(&mut self) -> Option<char> {
        let ch = self.current_char?;
        self.cursor.advance(ch);
        self.current_char = self.peek_char();
        Some(ch)
    }

    /// Returns the next item. After `Eof` or an error item, keeps returning `Eof`.
    pub fn next_item(&mut self) -> Item {
        if self.terminated {
            return Item::new(ItemKind::Eof, self.current_position());
        }
        let item = self.lex_item();
        if matches!(item.kind, ItemKind::Eof | ItemKind::Error(_)) {
            self.terminated = true;
        }
        item
    }

    fn unexpected_char_error(&self, ch: char) -> LexError {
        LexError::UnexpectedCharacter {
            character: ch,
            position: self.current_position(),
        }
    }

    /// Skips whitespace, `#` comments and `//` comments
    fn skip_whitespace_and_comments(&mut self) {
        while let Some(ch) = self.current_char {
            match ch {
                ch if ch.is_whitespace() => {
                    self.advance();
                }
                '#' => self.skip_line(),
                '/' if self.peek_char_at(1) == Some('/') => self.skip_line(),
                _ => break,
            }
        }
    }

    fn skip_line(&mut self) {
        while let Some(ch) = self.current_char {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn take_while(&mut self, keep: impl Fn(char) -> bool) -> String {
        let start = self.cursor.offset;
        while let Some(ch) = self.current_char {
            if !keep(ch) {
                break;
            }
            self.advance();
        }
        self.input[start..self.cursor.offset].to_string()
    }

    fn lex_item(&mut self) -> Item {
        loop {
            self.skip_whitespace_and_comments();
            let start = self.current_position();
            let Some(ch) = self.current_char else {
                return self.lex_end_of_input(start);
            };

            let step = match self.state {
                State::Start => self.begin_document(ch),
                State::Key => self.lex_key(ch, start),
                State::AfterKey => {
                    if matches!(ch, '=' | ':') {
                        self.advance();
                    }
                    self.state = State::Value;
                    Ok(None)
                }
                State::Value => self.lex_value(ch, start),
                State::ValueEnd => {
                    if matches!(ch, ',' | ';') {
                        self.advance();
                    }
                    self.state = self.entry_state();
                    Ok(None)
                }
                State::Done => Err(self.unexpected_char_error(ch)),
            };

            match step {
                Ok(Some(kind)) => return Item::new(kind, start),
                Ok(None) => continue,
                Err(error) => {
                    let position = error.position();
                    return Item::new(ItemKind::Error(error), position);
                }
            }
        }
    }

    fn lex_end_of_input(&mut self, position: Position) -> Item {
        let kind = match (self.state, self.frames.as_slice()) {
            (State::Start | State::Done, _) => ItemKind::Eof,
            // An unbraced root map simply ends; a dangling key is the parser's call
            (_, [Frame::Map]) if !self.root_braced => ItemKind::Eof,
            (_, [.., Frame::Array]) => ItemKind::Error(LexError::UnexpectedEof {
                expected: "']'",
                position,
            }),
            _ => ItemKind::Error(LexError::UnexpectedEof {
                expected: "'}'",
                position,
            }),
        };
        Item::new(kind, position)
    }

    fn entry_state(&self) -> State {
        match self.frames.last() {
            Some(Frame::Array) => State::Value,
            _ => State::Key,
        }
    }

    fn begin_document(&mut self, ch: char) -> Result<Option<ItemKind>, LexError> {
        match ch {
            '{' => {
                self.advance();
                self.frames.push(Frame::Map);
                self.root_braced = true;
                self.state = State::Key;
                Ok(None)
            }
            '[' => {
                self.advance();
                self.frames.push(Frame::Array);
                self.state = State::Value;
                Ok(Some(ItemKind::ArrayStart))
            }
            _ => {
                self.frames.push(Frame::Map);
                self.state = State::Key;
                Ok(None)
            }
        }
    }

    fn open(&mut self, frame: Frame, start: Position) -> Result<(), LexError> {
        if self.frames.len() > self.config.max_nesting_depth {
            return Err(LexError::NestingTooDeep {
                max: self.config.max_nesting_depth,
                position: start,
            });
        }
        self.advance();
        self.frames.push(frame);
        self.state = match frame {
            Frame::Map => State::Key,
            Frame::Array => State::Value,
        };
        Ok(())
    }

    fn close(&mut self, frame: Frame) -> Result<Option<ItemKind>, LexError> {
        self.advance();
        self.frames.pop();
        if self.frames.is_empty() {
            self.state = State::Done;
            // The braces of a JSON-style root map produce no items
            return Ok(match frame {
                Frame::Map => None,
                Frame::Array => Some(ItemKind::ArrayEnd),
            });
        }
        self.state = State::ValueEnd;
        Ok(Some(match frame {
            Frame::Map => ItemKind::MapEnd,
            Frame::Array => ItemKind::ArrayEnd,
        }))
    }

    fn lex_key(&mut self, ch: char, start: Position) -> Result<Option<ItemKind>, LexError> {
        match ch {
            ',' | ';' => {
                self.advance();
                Ok(None)
            }
            '}' if self.frames.len() > 1 || self.root_braced => self.close(Frame::Map),
            '"' => {
                let key = self.lex_double_quoted(start)?;
                self.state = State::AfterKey;
                Ok(Some(ItemKind::Key(key)))
            }
            '\'' => {
                let key = self.lex_single_quoted(start)?;
                self.state = State::AfterKey;
                Ok(Some(ItemKind::Key(key)))
            }
            ch if is_key_terminator(ch) => Err(self.unexpected_char_error(ch)),
            _ => {
                let key = self.take_while(|c| !is_key_terminator(c));
                if key == "include" && self.at_include_path() {
                    return self.lex_include(start).map(Some);
                }
                self.state = State::AfterKey;
                Ok(Some(ItemKind::Key(key)))
            }
        }
    }

    /// After the word `include`, checks whether a path follows on the same line
    fn at_include_path(&mut self) -> bool {
        while matches!(self.current_char, Some(' ' | '\t')) {
            self.advance();
        }
        match self.current_char {
            Some(ch) => !matches!(
                ch,
                '=' | ':' | '{' | '[' | '}' | ',' | ';' | '#' | '\n' | '\r'
            ),
            None => false,
        }
    }

    fn lex_include(&mut self, start: Position) -> Result<ItemKind, LexError> {
        let path_start = self.current_position();
        let path = match self.current_char {
            Some('"') => self.lex_double_quoted(path_start)?,
            Some('\'') => self.lex_single_quoted(path_start)?,
            _ => self.take_while(|c| !is_value_terminator(c)),
        };
        if path.is_empty() {
            return Err(LexError::MissingIncludePath { position: start });
        }
        self.state = State::ValueEnd;
        Ok(ItemKind::Include(path))
    }

    fn lex_value(&mut self, ch: char, start: Position) -> Result<Option<ItemKind>, LexError> {
        match ch {
            '{' => {
                self.open(Frame::Map, start)?;
                Ok(Some(ItemKind::MapStart))
            }
            '[' => {
                self.open(Frame::Array, start)?;
                Ok(Some(ItemKind::ArrayStart))
            }
            ']' if self.frames.last() == Some(&Frame::Array) => self.close(Frame::Array),
            '"' => {
                let value = self.lex_double_quoted(start)?;
                self.state = State::ValueEnd;
                Ok(Some(ItemKind::String(value)))
            }
            '\'' => {
                let value = self.lex_single_quoted(start)?;
                self.state = State::ValueEnd;
                Ok(Some(ItemKind::String(value)))
            }
            '$' => {
                self.advance();
                let name = self.take_while(|c| !is_value_terminator(c));
                if name.is_empty() {
                    return Err(LexError::UnexpectedCharacter {
                        character: '$',
                        position: start,
                    });
                }
                self.state = State::ValueEnd;
                Ok(Some(ItemKind::Variable(name)))
            }
            '}' | ']' | ',' | ';' | '=' => Err(self.unexpected_char_error(ch)),
            _ => {
                let word = self.take_while(|c| !is_value_terminator(c));
                self.state = State::ValueEnd;
                Ok(Some(classify_bare(word)))
            }
        }
    }

    /// Lexes a single-quoted string; no escapes are processed
    fn lex_single_quoted(&mut self, start: Position) -> Result<String, LexError> {
        self.advance();
        let value = self.take_while(|c| c != '\'');
        if self.advance().is_none() {
            return Err(LexError::UnterminatedString { position: start });
        }
        Ok(value)
    }

    /// Lexes a JSON-style double-quoted string, resolving escapes
    fn lex_double_quoted(&mut self, start: Position) -> Result<String, LexError> {
        self.advance();
        let mut value = String::new();
        loop {
            match self.advance() {
                None => return Err(LexError::UnterminatedString { position: start }),
                Some('"') => return Ok(value),
                Some('\\') => {
                    let escape_pos = self.current_position();
                    let decoded = match self.advance() {
                        Some('n') => '\n',
                        Some('t') => '\t',
                        Some('r') => '\r',
                        Some('b') => '\u{0008}',
                        Some('f') => '\u{000C}',
                        Some('"') => '"',
                        Some('\\') => '\\',
                        Some('/') => '/',
                        Some('u') => self.lex_unicode_escape(escape_pos)?,
                        Some(other) => {
                            return Err(LexError::InvalidEscape {
                                sequence: other.to_string(),
                                position: escape_pos,
                            });
                        }
                        None => return Err(LexError::UnterminatedString { position: start }),
                    };
                    value.push(decoded);
                }
                Some(ch) => value.push(ch),
            }
        }
    }

    fn read_hex4(&mut self, position: Position) -> Result<u32, LexError> {
        let digits: String = (0..4).filter_map(|_| self.advance()).collect();
        if digits.len() != 4 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(LexError::InvalidEscape {
                sequence: format!("u{digits}"),
                position,
            });
        }
        u32::from_str_radix(&digits, 16).map_err(|_| LexError::InvalidEscape {
            sequence: format!("u{digits}"),
            position,
        })
    }

    /// Decodes the body of a `\u` escape, including UTF-16 surrogate pairs
    fn lex_unicode_escape(&mut self, position: Position) -> Result<char, LexError> {
        let high = self.read_hex4(position)?;
        let code_point = if (0xD800..0xDC00).contains(&high)
            && self.current_char == Some('\\')
            && self.peek_char_at(1) == Some('u')
        {
            self.advance();
            self.advance();
            let low = self.read_hex4(position)?;
            if !(0xDC00..0xE000).contains(&low) {
                return Err(LexError::InvalidEscape {
                    sequence: format!("u{high:04X}\\u{low:04X}"),
                    position,
                });
            }
            0x10000 + ((high - 0xD800) << 10) + (low - 0xDC00)
        } else {
            high
        };
        char::from_u32(code_point).ok_or(LexError::InvalidEscape {
            sequence: format!("u{code_point:04X}"),
            position,
        })
    }
}

impl Iterator for Lexer<'_> {
    type Item = Item;

    /// Yields items up to and including `Eof` or the first error
    fn next(&mut self) -> Option<Item> {
        if self.terminated {
            None
        } else {
            Some(self.next_item())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(input: &str) -> Vec<ItemKind> {
        Lexer::new(input).map(|item| item.kind).collect()
    }

    fn key(s: &str) -> ItemKind {
        ItemKind::Key(s.to_string())
    }

    fn string(s: &str) -> ItemKind {
        ItemKind::String(s.to_string())
    }

    #[test]
    fn test_lexer_creation() {
        let lexer = Lexer::new("test input");
        assert_eq!(lexer.current_position(), Position::new());
        assert_eq!(lexer.nesting_depth(), 0);
    }

    #[test]
    fn test_position_tracking() {
        let mut lexer = Lexer::new("hello\nworld");
        for _ in 0..5 {
            lexer.advance();
        }
        assert_eq!(lexer.current_position().column, 6);
        lexer.advance();
        let pos = lexer.current_position();
        assert_eq!((pos.line, pos.column, pos.offset), (2, 1, 6));
    }

    #[test]
    fn test_simple_entries() {
        assert_eq!(
            kinds("foo='1'; bar=2.2; baz=true; boo=22"),
            vec![
                key("foo"),
                string("1"),
                key("bar"),
                ItemKind::Float("2.2".to_string()),
                key("baz"),
                ItemKind::Bool("true".to_string()),
                key("boo"),
                ItemKind::Integer("22".to_string()),
                ItemKind::Eof,
            ]
        );
    }

    #[test]
    fn test_separators_are_interchangeable() {
        let expected = vec![key("a"), ItemKind::Integer("1".to_string()), ItemKind::Eof];
        assert_eq!(kinds("a = 1"), expected);
        assert_eq!(kinds("a: 1"), expected);
        assert_eq!(kinds("a 1"), expected);
        assert_eq!(kinds("a=1;"), expected);
        assert_eq!(kinds("\"a\": 1,"), expected);
    }

    #[test]
    fn test_nested_map_and_array() {
        assert_eq!(
            kinds("foo { servers = [ \"a.com\", b.com\n c.com ] }"),
            vec![
                key("foo"),
                ItemKind::MapStart,
                key("servers"),
                ItemKind::ArrayStart,
                string("a.com"),
                string("b.com"),
                string("c.com"),
                ItemKind::ArrayEnd,
                ItemKind::MapEnd,
                ItemKind::Eof,
            ]
        );
    }

    #[test]
    fn test_braced_root_is_transparent() {
        assert_eq!(kinds("{}"), vec![ItemKind::Eof]);
        assert_eq!(kinds("\n   {\n   }\n   "), vec![ItemKind::Eof]);
        assert_eq!(
            kinds(r#"{ "users": [ {"user": "foo"} ] }"#),
            vec![
                key("users"),
                ItemKind::ArrayStart,
                ItemKind::MapStart,
                key("user"),
                string("foo"),
                ItemKind::MapEnd,
                ItemKind::ArrayEnd,
                ItemKind::Eof,
            ]
        );
    }

    #[test]
    fn test_array_root() {
        assert_eq!(
            kinds("[1, 2,]"),
            vec![
                ItemKind::ArrayStart,
                ItemKind::Integer("1".to_string()),
                ItemKind::Integer("2".to_string()),
                ItemKind::ArrayEnd,
                ItemKind::Eof,
            ]
        );
    }

    #[test]
    fn test_comments_are_skipped() {
        assert_eq!(
            kinds("# leading\nport = 4222 # trailing\n// cpp style\nhost = localhost"),
            vec![
                key("port"),
                ItemKind::Integer("4222".to_string()),
                key("host"),
                string("localhost"),
                ItemKind::Eof,
            ]
        );
    }

    #[test]
    fn test_bare_value_classification() {
        assert_eq!(
            classify_bare("2016-05-04T18:53:41Z".to_string()),
            ItemKind::Timestamp("2016-05-04T18:53:41Z".to_string())
        );
        assert_eq!(
            classify_bare("4kb".to_string()),
            ItemKind::Integer("4kb".to_string())
        );
        assert_eq!(
            classify_bare("-10".to_string()),
            ItemKind::Integer("-10".to_string())
        );
        assert_eq!(
            classify_bare("2.5g".to_string()),
            ItemKind::Float("2.5g".to_string())
        );
        assert_eq!(
            classify_bare(".5".to_string()),
            ItemKind::Float(".5".to_string())
        );
        assert_eq!(classify_bare("127.0.0.1".to_string()), string("127.0.0.1"));
        assert_eq!(
            classify_bare("127.0.0.1:4222".to_string()),
            string("127.0.0.1:4222")
        );
        assert_eq!(classify_bare("2016-05-04".to_string()), string("2016-05-04"));
        assert_eq!(
            classify_bare("2016-05-04T18:53:41+01:00".to_string()),
            string("2016-05-04T18:53:41+01:00")
        );
        assert_eq!(
            classify_bare("OFF".to_string()),
            ItemKind::Bool("OFF".to_string())
        );
        assert_eq!(classify_bare("offline".to_string()), string("offline"));
    }

    #[test]
    fn test_variables() {
        assert_eq!(
            kinds("foo = $index; pass = $2a$10$abc/def.ghi"),
            vec![
                key("foo"),
                ItemKind::Variable("index".to_string()),
                key("pass"),
                ItemKind::Variable("2a$10$abc/def.ghi".to_string()),
                ItemKind::Eof,
            ]
        );
    }

    #[test]
    fn test_include_directive() {
        assert_eq!(
            kinds("foo { include 'foo.json' }\ninclude ./auth.conf"),
            vec![
                key("foo"),
                ItemKind::MapStart,
                ItemKind::Include("foo.json".to_string()),
                ItemKind::MapEnd,
                ItemKind::Include("./auth.conf".to_string()),
                ItemKind::Eof,
            ]
        );
        // `include` used as an ordinary key
        assert_eq!(
            kinds("include = yes"),
            vec![key("include"), ItemKind::Bool("yes".to_string()), ItemKind::Eof]
        );
    }

    #[test]
    fn test_string_escapes() {
        assert_eq!(
            kinds(r#"s = "tab\there \"q\" \u0041 \uD83D\uDE00""#),
            vec![key("s"), string("tab\there \"q\" A \u{1F600}"), ItemKind::Eof]
        );
        assert_eq!(
            kinds(r"s = 'raw\nstring'"),
            vec![key("s"), string("raw\\nstring"), ItemKind::Eof]
        );
    }

    #[test]
    fn test_item_positions() {
        let items: Vec<Item> = Lexer::new("a = 1\n  bb = two").collect();
        assert_eq!((items[0].position.line, items[0].position.column), (1, 1));
        assert_eq!((items[1].position.line, items[1].position.column), (1, 5));
        assert_eq!((items[2].position.line, items[2].position.column), (2, 3));
        assert_eq!(items[3].lexeme(), "two");
        assert_eq!((items[3].position.line, items[3].position.column), (2, 8));
    }

    #[test]
    fn test_unterminated_string() {
        let items = kinds("key = \"never closed");
        assert_eq!(items.len(), 2);
        assert!(matches!(
            items[1],
            ItemKind::Error(LexError::UnterminatedString { position }) if position.column == 7
        ));
    }

    #[test]
    fn test_invalid_escape() {
        let items = kinds(r#"key = "bad \q escape""#);
        assert!(matches!(
            items.last(),
            Some(ItemKind::Error(LexError::InvalidEscape { sequence, .. })) if sequence == "q"
        ));
    }

    #[test]
    fn test_unicode_escape_requires_hex_digits() {
        for (input, bad) in [
            (r#"s = "\u+041""#, "u+041"),
            (r#"s = "\u-041""#, "u-041"),
            (r#"s = "\u 041""#, "u 041"),
        ] {
            let items = kinds(input);
            let sequence = match items.last() {
                Some(ItemKind::Error(LexError::InvalidEscape { sequence, .. })) => sequence,
                other => panic!("{input}: expected invalid escape, got {other:?}"),
            };
            assert_eq!(sequence, bad);
        }
    }

    #[test]
    fn test_missing_value_separator_error() {
        let items = kinds("a,a,a");
        assert_eq!(items[0], key("a"));
        assert!(matches!(
            items[1],
            ItemKind::Error(LexError::UnexpectedCharacter { character: ',', .. })
        ));
        assert_eq!(items.len(), 2);
    }

    #[test]
    fn test_dangling_key_reaches_eof() {
        assert_eq!(kinds("aaaaaaaa"), vec![key("aaaaaaaa"), ItemKind::Eof]);
    }

    #[test]
    fn test_unclosed_containers() {
        assert!(matches!(
            kinds("a { b = 1").last(),
            Some(ItemKind::Error(LexError::UnexpectedEof { expected: "'}'", .. }))
        ));
        assert!(matches!(
            kinds("a = [1, 2").last(),
            Some(ItemKind::Error(LexError::UnexpectedEof { expected: "']'", .. }))
        ));
        assert!(matches!(
            kinds("{ a = 1").last(),
            Some(ItemKind::Error(LexError::UnexpectedEof { .. }))
        ));
    }

    #[test]
    fn test_stray_closers() {
        assert!(matches!(
            kinds("a = 1 }").last(),
            Some(ItemKind::Error(LexError::UnexpectedCharacter { character: '}', .. }))
        ));
        assert!(matches!(
            kinds("{} extra").last(),
            Some(ItemKind::Error(LexError::UnexpectedCharacter { character: 'e', .. }))
        ));
    }

    #[test]
    fn test_nesting_limit() {
        let config = LexerConfig::default().with_max_nesting_depth(2);
        let items: Vec<ItemKind> = Lexer::with_config("a { b { c { d = 1 } } }", config)
            .map(|item| item.kind)
            .collect();
        assert!(matches!(
            items.last(),
            Some(ItemKind::Error(LexError::NestingTooDeep { max: 2, .. }))
        ));
    }

    #[test]
    fn test_terminated_lexer_keeps_returning_eof() {
        let mut lexer = Lexer::new("a = \"oops");
        assert_eq!(lexer.next_item().kind, key("a"));
        assert!(matches!(lexer.next_item().kind, ItemKind::Error(_)));
        assert_eq!(lexer.next_item().kind, ItemKind::Eof);
        assert!(lexer.next().is_none());
    }
}
