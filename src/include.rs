//! File inclusion
//!
//! `include "path"` parses another file and splices its top-level entries
//! into the map the directive appears in. Paths are relative to the directory
//! of the including file. Files are read through a [`SourceLoader`], so
//! includes can be served from memory as well as from disk.

use crate::error::{ConfError, ParseError, Position, Result};
use crate::parser::{Container, DocumentParser, parent_dir};
use crate::value::{Map, Metadata, Value};
use std::collections::HashMap;
use std::io;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Source of configuration text for included files
pub trait SourceLoader {
    /// Reads the full contents of `path`
    fn load(&self, path: &Path) -> io::Result<String>;

    /// Returns the identity of `path` used to detect include cycles
    fn canonical(&self, path: &Path) -> PathBuf {
        std::fs::canonicalize(path).unwrap_or_else(|_| normalize(path))
    }
}

/// Loader reading from the file system
#[derive(Debug, Clone, Copy, Default)]
pub struct FileSystemLoader;

impl SourceLoader for FileSystemLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        std::fs::read_to_string(path)
    }
}

/// Loader serving files from memory
#[derive(Debug, Clone, Default)]
pub struct MemoryLoader {
    files: HashMap<PathBuf, String>,
}

impl MemoryLoader {
    /// Creates an empty loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a file
    pub fn insert(&mut self, path: impl AsRef<Path>, contents: impl Into<String>) {
        self.files.insert(normalize(path.as_ref()), contents.into());
    }

    /// Adds a file, builder style
    pub fn with_file(mut self, path: impl AsRef<Path>, contents: impl Into<String>) -> Self {
        self.insert(path, contents);
        self
    }
}

impl SourceLoader for MemoryLoader {
    fn load(&self, path: &Path) -> io::Result<String> {
        self.files.get(&normalize(path)).cloned().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("no such file: {}", path.display()),
            )
        })
    }

    fn canonical(&self, path: &Path) -> PathBuf {
        normalize(path)
    }
}

/// Drops `.` components so `./a.conf` and `a.conf` name the same file
fn normalize(path: &Path) -> PathBuf {
    path.components()
        .filter(|component| !matches!(component, Component::CurDir))
        .collect()
}

impl<M: Metadata> DocumentParser<'_, M> {
    /// Parses the file named by an include directive and splices its entries
    pub(crate) fn include_file(&mut self, path: &str, position: Position) -> Result<()> {
        let file = self.base_dir.join(path);
        let canonical = self.parser.loader.canonical(&file);

        if self.include_chain.contains(&canonical) {
            return Err(ParseError::IncludeCycle { file, position }.into());
        }
        let max = self.parser.config.max_include_depth;
        if self.include_depth >= max {
            return Err(ParseError::IncludeDepthExceeded { max, position }.into());
        }

        debug!(
            file = %file.display(),
            depth = self.include_depth + 1,
            "including configuration file"
        );
        let entries = self.parse_included(&file, canonical).map_err(|source| {
            debug!(file = %file.display(), error = %source, "include failed");
            ConfError::from(ParseError::Include {
                file: file.clone(),
                position,
                source: Box::new(source),
            })
        })?;

        self.splice(entries, position)
    }

    fn parse_included(&self, file: &Path, canonical: PathBuf) -> Result<Map<M>> {
        let input = self.parser.loader.load(file).map_err(|source| ConfError::Io {
            path: file.to_path_buf(),
            source,
        })?;

        let mut nested: DocumentParser<'_, M> =
            self.nested(Some(Arc::from(file)), parent_dir(file));
        nested.include_chain.push(canonical);
        nested.include_depth += 1;

        match nested.parse_document(&input)? {
            Value::Map(map) => Ok(map),
            other => Err(ParseError::NotAMap {
                found: other.type_name(),
            }
            .into()),
        }
    }

    /// Merges included entries into the current map, keeping their provenance
    fn splice(&mut self, entries: Map<M>, position: Position) -> Result<()> {
        match self.state.contexts.last_mut().map(|context| &mut context.container) {
            Some(Container::Map(map)) => {
                map.extend(entries);
                Ok(())
            }
            _ => Err(ParseError::MalformedDocument {
                message: "include directive outside of a map".to_string(),
                position,
            }
            .into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::{ConfParser, ParserConfig};

    fn parser(loader: MemoryLoader) -> ConfParser {
        ConfParser::builder()
            .with_source_loader(Box::new(loader))
            .with_base_dir("conf")
            .build()
    }

    #[test]
    fn test_memory_loader() {
        let loader = MemoryLoader::new().with_file("./conf/a.conf", "a = 1");
        assert_eq!(loader.load(Path::new("conf/a.conf")).unwrap(), "a = 1");
        let err = loader.load(Path::new("conf/b.conf")).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::NotFound);
        assert_eq!(
            loader.canonical(Path::new("./conf/./a.conf")),
            PathBuf::from("conf/a.conf")
        );
    }

    #[test]
    fn test_include_splices_entries() {
        let loader = MemoryLoader::new()
            .with_file("conf/foo.json", r#"{ "users": [ {"user": "foo"} ] }"#)
            .with_file("conf/bar.json", r#"{ "users": [ {"user": "bar"} ] }"#)
            .with_file("conf/quux.json", "{}");
        let map = parser(loader)
            .parse(
                "accounts {\n  foo { include 'foo.json' }\n  bar { include 'bar.json' }\n  quux { include 'quux.json' }\n}",
            )
            .unwrap();

        let accounts = &map["accounts"].value;
        assert_eq!(
            accounts
                .lookup("foo.users.0.user")
                .and_then(Value::as_str),
            Some("foo")
        );
        assert_eq!(
            accounts
                .lookup("bar.users.0.user")
                .and_then(Value::as_str),
            Some("bar")
        );
        assert!(accounts.lookup("quux").and_then(Value::as_map).unwrap().is_empty());
    }

    #[test]
    fn test_nested_includes_resolve_relative_to_including_file() {
        let loader = MemoryLoader::new()
            .with_file("conf/main.inc", "include sub/child.conf\nlevel = main")
            .with_file("conf/sub/child.conf", "include leaf.conf\nchild = true")
            .with_file("conf/sub/leaf.conf", "leaf = 1");
        let map = parser(loader).parse("include main.inc").unwrap();
        assert_eq!(map["leaf"].value, Value::Integer(1));
        assert_eq!(map["child"].value, Value::Bool(true));
        assert_eq!(map["level"].value.as_str(), Some("main"));
    }

    #[test]
    fn test_included_variables_are_in_scope() {
        let loader = MemoryLoader::new().with_file("conf/vars.conf", "base_port = 4000");
        let map = parser(loader)
            .parse("include vars.conf\nport = $base_port")
            .unwrap();
        assert_eq!(map["port"].value, Value::Integer(4000));
    }

    #[test]
    fn test_include_cycle_is_detected() {
        let loader = MemoryLoader::new()
            .with_file("conf/a.conf", "include b.conf")
            .with_file("conf/b.conf", "include a.conf");
        let err = parser(loader).parse("include a.conf").unwrap_err();
        match err.root_cause() {
            ConfError::Parse(ParseError::IncludeCycle { file, .. }) => {
                assert_eq!(file, Path::new("conf/a.conf"));
            }
            other => panic!("expected include cycle, got {other:?}"),
        }
    }

    #[test]
    fn test_sibling_includes_are_allowed() {
        let loader = MemoryLoader::new().with_file("conf/common.conf", "shared = yes");
        let map = parser(loader)
            .parse("a { include common.conf }\nb { include common.conf }")
            .unwrap();
        assert_eq!(map["a"].value.lookup("shared"), Some(&Value::Bool(true)));
        assert_eq!(map["b"].value.lookup("shared"), Some(&Value::Bool(true)));
    }

    #[test]
    fn test_include_depth_limit() {
        let loader = MemoryLoader::new()
            .with_file("conf/1.conf", "include 2.conf")
            .with_file("conf/2.conf", "include 3.conf")
            .with_file("conf/3.conf", "deep = true");
        let parser = ConfParser::builder()
            .with_source_loader(Box::new(loader))
            .with_base_dir("conf")
            .with_parser_config(ParserConfig::new().with_max_include_depth(2))
            .build();
        let err = parser.parse("include 1.conf").unwrap_err();
        assert!(matches!(
            err.root_cause(),
            ConfError::Parse(ParseError::IncludeDepthExceeded { max: 2, .. })
        ));
    }

    #[test]
    fn test_include_errors_name_the_file() {
        let loader = MemoryLoader::new().with_file("conf/bad.conf", "oops = $nowhere");
        let err = parser(loader).parse("include bad.conf").unwrap_err();
        let message = err.to_string();
        assert!(message.contains("bad.conf"), "{message}");
        assert!(err.is_variable_not_found());

        let err = parser(MemoryLoader::new()).parse("include missing.conf").unwrap_err();
        assert!(matches!(err.root_cause(), ConfError::Io { .. }));
    }

    #[test]
    fn test_included_document_must_be_a_map() {
        let loader = MemoryLoader::new().with_file("conf/list.conf", "[1, 2]");
        let err = parser(loader).parse("include list.conf").unwrap_err();
        assert!(matches!(
            err.root_cause(),
            ConfError::Parse(ParseError::NotAMap { found: "array" })
        ));
    }

    #[test]
    fn test_pedantic_include_reports_included_file() {
        let loader = MemoryLoader::new().with_file("conf/tls.conf", "\ncert = server.pem");
        let map = parser(loader)
            .parse_pedantic("port = 443\ninclude tls.conf")
            .unwrap();
        assert_eq!(map["cert"].source_file(), Some(Path::new("conf/tls.conf")));
        assert_eq!(map["cert"].source_line(), 2);
        assert!(map["port"].source_file().is_none());
    }
}
