//! Scalar literal decoding
//!
//! Integer literals may carry a unit suffix (`8k`, `4kb`, `2Mi`). Decimal
//! suffixes scale by powers of 1000, binary ones (`kb`, `ki`, `kib`, ...) by
//! powers of 1024. Floats never take suffixes.

use crate::error::{ParseError, Position};
use chrono::{DateTime, NaiveDateTime, Utc};

/// Layout of the only accepted timestamp form
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%SZ";

/// Splits a literal such as `100k` into its numeric part and lowercased suffix
pub fn split_number_suffix(literal: &str) -> (&str, String) {
    let split = literal
        .char_indices()
        .rev()
        .take_while(|(_, c)| c.is_ascii_alphabetic())
        .last()
        .map_or(literal.len(), |(i, _)| i);
    let (number, suffix) = literal.split_at(split);
    (number, suffix.to_ascii_lowercase())
}

/// Returns the multiplier for a (lowercase) unit suffix
///
/// Unknown and empty suffixes leave the number unscaled.
pub fn suffix_multiplier(suffix: &str) -> i64 {
    const K: i64 = 1000;
    const KI: i64 = 1024;
    match suffix {
        "k" => K,
        "m" => K.pow(2),
        "g" => K.pow(3),
        "t" => K.pow(4),
        "p" => K.pow(5),
        "e" => K.pow(6),
        "kb" | "ki" | "kib" => KI,
        "mb" | "mi" | "mib" => KI.pow(2),
        "gb" | "gi" | "gib" => KI.pow(3),
        "tb" | "ti" | "tib" => KI.pow(4),
        "pb" | "pi" | "pib" => KI.pow(5),
        "eb" | "ei" | "eib" => KI.pow(6),
        _ => 1,
    }
}

/// Decodes a base-10 integer literal with an optional unit suffix
pub fn parse_integer(literal: &str, position: Position) -> Result<i64, ParseError> {
    let invalid = || ParseError::InvalidNumber {
        literal: literal.to_string(),
        position,
    };
    let (number, suffix) = split_number_suffix(literal);
    let number = number.strip_prefix('+').unwrap_or(number);
    let value: i64 = number.parse().map_err(|_| invalid())?;
    value
        .checked_mul(suffix_multiplier(&suffix))
        .ok_or_else(invalid)
}

/// Decodes a float literal
pub fn parse_float(literal: &str, position: Position) -> Result<f64, ParseError> {
    literal.parse().map_err(|_| ParseError::InvalidFloat {
        literal: literal.to_string(),
        position,
    })
}

/// Decodes a boolean literal
///
/// `true`, `yes` and `on` are true; everything else, including words that are
/// not booleans at all, is false.
pub fn parse_bool(literal: &str) -> bool {
    matches!(
        literal.to_ascii_lowercase().as_str(),
        "true" | "yes" | "on"
    )
}

/// Returns true for the bare words the lexer classifies as booleans
pub fn is_bool_literal(word: &str) -> bool {
    matches!(
        word.to_ascii_lowercase().as_str(),
        "true" | "false" | "yes" | "no" | "on" | "off"
    )
}

/// Returns true if `text` has exactly the shape `YYYY-MM-DDTHH:MM:SSZ`
pub fn is_timestamp_shape(text: &str) -> bool {
    const SHAPE: &[u8] = b"dddd-dd-ddTdd:dd:ddZ";
    let bytes = text.as_bytes();
    bytes.len() == SHAPE.len()
        && bytes.iter().zip(SHAPE).all(|(&b, &s)| match s {
            b'd' => b.is_ascii_digit(),
            _ => b == s,
        })
}

/// Decodes a UTC timestamp literal
pub fn parse_timestamp(literal: &str, position: Position) -> Result<DateTime<Utc>, ParseError> {
    NaiveDateTime::parse_from_str(literal, TIMESTAMP_FORMAT)
        .map(|naive| naive.and_utc())
        .map_err(|_| ParseError::InvalidTimestamp {
            literal: literal.to_string(),
            position,
        })
}

/// Formats a timestamp back into its literal form
pub fn format_timestamp(timestamp: &DateTime<Utc>) -> String {
    timestamp.format(TIMESTAMP_FORMAT).to_string()
}
