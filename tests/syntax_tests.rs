use flexconf::{ConfError, LexError, from_str};
use serde_json::{Value, json};

#[cfg(test)]
mod syntax_tests {
    use super::*;

    #[test]
    fn test_comment_styles() {
        let config = r#"
            # Hash comment
            key1 = "value1"   # inline hash comment

            // C++ style comment
            key2 = 42         // inline C++ comment
            key3 = true
            // Comments can hold anything: {}[]=:;,$"'
            array = [1, 2, 3] # trailing
        "#;

        let result: Value = from_str(config).expect("Should parse comments");
        assert_eq!(result["key1"], "value1");
        assert_eq!(result["key2"], 42);
        assert_eq!(result["key3"], true);
        assert_eq!(result["array"], json!([1, 2, 3]));
    }

    #[test]
    fn test_slashes_inside_values_are_not_comments() {
        let config = r#"
            url = http://example.com/path
            quoted = "a // b"
        "#;

        let result: Value = from_str(config).expect("Should keep slashes in values");
        assert_eq!(result["url"], "http://example.com/path");
        assert_eq!(result["quoted"], "a // b");
    }

    #[test]
    fn test_key_value_separators() {
        let config = r#"
            equals = 1
            colon: 2
            space 3
            tight=4;packed:5,
            "quoted key": 6
            'single key' = 7
            nested { inner 8 }
            list [9]
        "#;

        let result: Value = from_str(config).expect("Should accept every separator");
        assert_eq!(
            result,
            json!({
                "equals": 1,
                "colon": 2,
                "space": 3,
                "tight": 4,
                "packed": 5,
                "quoted key": 6,
                "single key": 7,
                "nested": { "inner": 8 },
                "list": [9]
            })
        );
    }

    #[test]
    fn test_array_separators() {
        let config = r#"
            commas = [1, 2, 3,]
            newlines = [
                one
                two
            ]
            mixed = [ a; b, c ]
            nested = [[1, 2], [3], []]
        "#;

        let result: Value = from_str(config).expect("Should parse arrays");
        assert_eq!(result["commas"], json!([1, 2, 3]));
        assert_eq!(result["newlines"], json!(["one", "two"]));
        assert_eq!(result["mixed"], json!(["a", "b", "c"]));
        assert_eq!(result["nested"], json!([[1, 2], [3], []]));
    }

    #[test]
    fn test_string_forms() {
        let config = r#"
            double = "Hello\nWorld\t\"quoted\" \\ \/"
            single = 'Raw \n stays'
            bare = hello-world_1
            multiline = "first
second"
        "#;

        let result: Value = from_str(config).expect("Should parse strings");
        assert_eq!(result["double"], "Hello\nWorld\t\"quoted\" \\ /");
        assert_eq!(result["single"], "Raw \\n stays");
        assert_eq!(result["bare"], "hello-world_1");
        assert_eq!(result["multiline"], "first\nsecond");
    }

    #[test]
    fn test_unicode_escapes() {
        let config = r#"
            latin = "\u0041"
            greek = "\u03B1"
            emoji = "\uD83D\uDE00"
            literal = "día ✓"
        "#;

        let result: Value = from_str(config).expect("Should parse unicode escapes");
        assert_eq!(result["latin"], "A");
        assert_eq!(result["greek"], "\u{3B1}");
        assert_eq!(result["emoji"], "\u{1F600}");
        assert_eq!(result["literal"], "día ✓");
    }

    #[test]
    fn test_invalid_escapes() {
        for config in [
            r#"a = "\x41""#,
            r#"a = "\u12""#,
            r#"a = "\uZZZZ""#,
            r#"a = "\u+041""#,
        ] {
            let err = from_str::<Value>(config).unwrap_err();
            assert!(
                matches!(err, ConfError::Lex(LexError::InvalidEscape { .. })),
                "{config}: {err:?}"
            );
        }
    }

    #[test]
    fn test_boolean_words() {
        let config = "a = true\nb = YES\nc = on\nd = false\ne = No\nf = OFF";
        let result: Value = from_str(config).expect("Should parse booleans");
        assert_eq!(
            result,
            json!({ "a": true, "b": true, "c": true, "d": false, "e": false, "f": false })
        );
    }

    #[test]
    fn test_numbers() {
        let config = "int = -42\nplus = +7\nfloat = 3.25\nexp = 1.5e3\nneg = -0.5";
        let result: Value = from_str(config).expect("Should parse numbers");
        assert_eq!(result["int"], -42);
        assert_eq!(result["plus"], 7);
        assert_eq!(result["float"], 3.25);
        assert_eq!(result["exp"], 1500.0);
        assert_eq!(result["neg"], -0.5);
    }
}
