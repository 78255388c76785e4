//! Payload transform.
//!
//! A payload is UTF-8 text of the form `"<word> <digits>"`. The word is
//! uppercased and every digit is multiplied by ten on its own, so `"hello 12"`
//! becomes `"HELLO 1020"` rather than `"HELLO 120"`.

use std::fmt;
use std::str::FromStr;

use crate::error::TransformError;
use crate::types::OutputRow;

/// The two tokens of a payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRecord {
    /// Word token.
    pub word: String,
    /// Numeric token (ASCII digits only).
    pub digits: String,
}

/// Result of transforming a [`ParsedRecord`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransformedRecord {
    /// The word, uppercased.
    pub upper_word: String,
    /// Each digit times ten, concatenated.
    pub scaled_digits: String,
}

impl fmt::Display for TransformedRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.upper_word, self.scaled_digits)
    }
}

impl FromStr for TransformedRecord {
    type Err = TransformError;

    /// Split a stored `"<WORD> <scaled-digits>"` string back into its fields.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (upper_word, scaled_digits) = split_pair(s)?;
        Ok(Self {
            upper_word: upper_word.to_string(),
            scaled_digits: scaled_digits.to_string(),
        })
    }
}

/// Decode payload bytes as UTF-8.
pub fn decode_payload(data: &[u8]) -> Result<&str, TransformError> {
    std::str::from_utf8(data).map_err(|e| TransformError::InvalidUtf8(e.to_string()))
}

/// Parse decoded text into its word and numeric tokens.
pub fn parse_payload(text: &str) -> Result<ParsedRecord, TransformError> {
    let (word, digits) = split_pair(text)?;

    if let Some((position, ch)) = digits.chars().enumerate().find(|(_, c)| !c.is_ascii_digit()) {
        return Err(TransformError::NonDigit { ch, position });
    }

    Ok(ParsedRecord {
        word: word.to_string(),
        digits: digits.to_string(),
    })
}

/// Transform a parsed record.
pub fn transform_record(record: &ParsedRecord) -> TransformedRecord {
    TransformedRecord {
        upper_word: record.word.to_uppercase(),
        scaled_digits: scale_digits(&record.digits),
    }
}

/// Parse and transform decoded text.
pub fn transform(text: &str) -> Result<TransformedRecord, TransformError> {
    parse_payload(text).map(|record| transform_record(&record))
}

/// Build the output row for a decoded payload.
pub fn build_row(text: &str) -> Result<OutputRow, TransformError> {
    let transformed = transform(text)?;
    Ok(OutputRow::new(text, transformed.to_string()))
}

/// Multiply each digit by ten independently: `'3'` -> `"30"`, `'0'` -> `"0"`.
fn scale_digits(digits: &str) -> String {
    digits
        .chars()
        .filter_map(|c| c.to_digit(10))
        .map(|d| (d * 10).to_string())
        .collect()
}

/// Split on a single space into exactly two non-empty tokens.
fn split_pair(text: &str) -> Result<(&str, &str), TransformError> {
    let tokens: Vec<&str> = text.split(' ').collect();
    let &[first, second] = tokens.as_slice() else {
        return Err(TransformError::TokenCount {
            count: tokens.len(),
        });
    };

    if first.is_empty() {
        return Err(TransformError::EmptyToken("word"));
    }
    if second.is_empty() {
        return Err(TransformError::EmptyToken("numeric"));
    }

    Ok((first, second))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transform_scenarios() {
        let row = build_row("hello 12").unwrap();
        assert_eq!(row, OutputRow::new("hello 12", "HELLO 1020"));

        let row = build_row("Go 5").unwrap();
        assert_eq!(row, OutputRow::new("Go 5", "GO 50"));
    }

    #[test]
    fn test_digits_scale_individually() {
        // Pinned: each digit is scaled on its own, the token is never treated as one number.
        assert_eq!(transform("x 105").unwrap().scaled_digits, "10050");
        assert_eq!(transform("x 0").unwrap().scaled_digits, "0");
        assert_eq!(transform("x 999").unwrap().scaled_digits, "909090");
        assert_ne!(transform("x 12").unwrap().scaled_digits, "120");
    }

    #[test]
    fn test_uppercase_leaves_non_letters() {
        let out = transform("he-llo_9 1").unwrap();
        assert_eq!(out.upper_word, "HE-LLO_9");

        let out = transform("straße 1").unwrap();
        assert_eq!(out.upper_word, "STRASSE");
    }

    #[test]
    fn test_missing_space_is_malformed() {
        assert_eq!(
            transform("onlyoneword").unwrap_err(),
            TransformError::TokenCount { count: 1 }
        );
    }

    #[test]
    fn test_non_digit_is_malformed() {
        assert_eq!(
            transform("word 12a").unwrap_err(),
            TransformError::NonDigit {
                ch: 'a',
                position: 2
            }
        );
        assert!(matches!(
            transform("word -1"),
            Err(TransformError::NonDigit { ch: '-', .. })
        ));
        // Trailing newline is not a digit either.
        assert!(matches!(
            transform("word 12\n"),
            Err(TransformError::NonDigit { ch: '\n', .. })
        ));
    }

    #[test]
    fn test_wrong_token_counts() {
        assert_eq!(
            transform("a b c").unwrap_err(),
            TransformError::TokenCount { count: 3 }
        );
        // Double space yields an empty middle token.
        assert_eq!(
            transform("a  1").unwrap_err(),
            TransformError::TokenCount { count: 3 }
        );
        assert_eq!(transform("").unwrap_err(), TransformError::TokenCount { count: 1 });
    }

    #[test]
    fn test_empty_tokens() {
        assert_eq!(transform(" 12").unwrap_err(), TransformError::EmptyToken("word"));
        assert_eq!(
            transform("hello ").unwrap_err(),
            TransformError::EmptyToken("numeric")
        );
    }

    #[test]
    fn test_invalid_utf8() {
        assert!(matches!(
            decode_payload(&[0x68, 0xff, 0x20, 0x31]),
            Err(TransformError::InvalidUtf8(_))
        ));
        assert_eq!(decode_payload(b"hello 12").unwrap(), "hello 12");
    }

    #[test]
    fn test_transform_is_deterministic() {
        let first = transform("Determinism 4071").unwrap();
        for _ in 0..10 {
            assert_eq!(transform("Determinism 4071").unwrap(), first);
        }
    }

    #[test]
    fn test_reverse_parse_recovers_word() {
        let stored = build_row("hello 12").unwrap().transformed;
        let parsed: TransformedRecord = stored.parse().unwrap();
        assert_eq!(parsed.upper_word, "HELLO");
        assert_eq!(parsed.scaled_digits, "1020");

        // Uppercasing an already uppercased word is a no-op.
        let again = transform(&format!("{} 1", parsed.upper_word)).unwrap();
        assert_eq!(again.upper_word, parsed.upper_word);
    }
}
