//! Tests for error handling and diagnostics
//!
//! Covers position reporting, message wording and the error wrapping used
//! for included files.

#[cfg(test)]
mod tests {
    use crate::error::{ConfError, LexError, ParseError, Position};
    use crate::include::MemoryLoader;
    use crate::parser::ConfParser;
    use crate::variables::MapVariableHandler;

    fn parse_err(input: &str) -> ConfError {
        ConfParser::builder()
            .with_variable_handler(Box::new(MapVariableHandler::new()))
            .build()
            .parse(input)
            .unwrap_err()
    }

    #[test]
    fn test_position_tracking_accuracy() {
        let mut pos = Position::new();

        pos.advance('a');
        assert_eq!((pos.line, pos.column, pos.offset), (1, 2, 1));

        pos.advance('\n');
        assert_eq!((pos.line, pos.column, pos.offset), (2, 1, 2));

        // Multi-byte characters count as one column
        pos.advance('ü');
        assert_eq!((pos.line, pos.column, pos.offset), (2, 2, 4));

        assert_eq!(pos.to_string(), "2:2");
    }

    #[test]
    fn test_lone_surrogate_escape() {
        let err = parse_err(r#"s = "hello \uD800 world""#);
        assert!(matches!(
            err,
            ConfError::Lex(LexError::InvalidEscape { ref sequence, .. }) if sequence == "uD800"
        ));
    }

    #[test]
    fn test_lex_error_positions() {
        match parse_err("a = 1\nb = 2\nc = }") {
            ConfError::Lex(error) => {
                let position = error.position();
                assert_eq!((position.line, position.column), (3, 5));
            }
            other => panic!("expected lex error, got {other:?}"),
        }
    }

    #[test]
    fn test_unclosed_map_message() {
        let err = parse_err("server {\n  port = 80\n");
        let message = err.to_string();
        assert!(message.contains("Unexpected end of input"), "{message}");
        assert!(message.contains("'}'"), "{message}");
    }

    #[test]
    fn test_variable_not_found_message() {
        let err = parse_err("\n\nport = $PORT_THAT_IS_NOT_SET");
        assert_eq!(
            err.to_string(),
            "Parse error: Variable reference for 'PORT_THAT_IS_NOT_SET' on line 3 can not be found"
        );
    }

    #[test]
    fn test_malformed_documents_fail() {
        for input in ["aaaaaaaaaa", "a,a,a", "key =", "a { b }", "x = [1, 2", "{ a = 1"] {
            let result = ConfParser::new().parse(input);
            assert!(result.is_err(), "expected failure for {input:?}");
        }
    }

    #[test]
    fn test_invalid_float_message() {
        let err = parse_err("ratio = 2.5g");
        assert!(matches!(err, ConfError::Parse(ParseError::InvalidFloat { .. })));
        assert!(err.to_string().contains("2.5g"));
    }

    #[test]
    fn test_include_error_chain() {
        let loader = MemoryLoader::new()
            .with_file("outer.conf", "include inner.conf")
            .with_file("inner.conf", "broken = \"quote");
        let err = ConfParser::builder()
            .with_source_loader(Box::new(loader))
            .build()
            .parse("include outer.conf")
            .unwrap_err();

        match &err {
            ConfError::Parse(ParseError::Include { file, source, .. }) => {
                assert_eq!(file.to_str(), Some("outer.conf"));
                assert!(matches!(
                    source.as_ref(),
                    ConfError::Parse(ParseError::Include { .. })
                ));
            }
            other => panic!("expected include error, got {other:?}"),
        }
        assert!(matches!(
            err.root_cause(),
            ConfError::Lex(LexError::UnterminatedString { .. })
        ));
        assert!(!err.is_variable_not_found());
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_io_error_names_path() {
        let err = ConfParser::new()
            .parse_file("/definitely/not/here/server.conf")
            .unwrap_err();
        let message = err.to_string();
        assert!(matches!(err, ConfError::Io { .. }));
        assert!(message.contains("/definitely/not/here/server.conf"), "{message}");
    }
}
