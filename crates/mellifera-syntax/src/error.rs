//! Parse errors and the quoting helpers shared by lexer and parser messages.

use crate::token::SourceLocation;
use std::fmt;

/// Escape `\t`, `\n`, `"`, and `\` the way string values render them.
pub fn escape(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\t' => result.push_str("\\t"),
            '\n' => result.push_str("\\n"),
            '"' => result.push_str("\\\""),
            '\\' => result.push_str("\\\\"),
            _ => result.push(c),
        }
    }
    result
}

/// Quote text for an error message: backticks normally, double quotes when
/// the text itself contains a backtick.
pub fn quote(text: &str) -> String {
    if text.contains('`') {
        format!("\"{text}\"")
    } else {
        format!("`{text}`")
    }
}

/// Error produced by the lexer or the parser.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    /// Location of the offending source text, when known.
    pub location: Option<SourceLocation>,
    /// Human-readable description of the failure.
    pub message: String,
}

impl ParseError {
    pub fn new(location: Option<SourceLocation>, message: impl Into<String>) -> Self {
        Self {
            location,
            message: message.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "[{}] {}", location, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

impl std::error::Error for ParseError {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::rc::Rc;

    #[test]
    fn test_escape() {
        assert_eq!(escape("foo\t\n\"\\bar"), "foo\\t\\n\\\"\\\\bar");
        assert_eq!(escape("plain"), "plain");
    }

    #[test]
    fn test_quote() {
        assert_eq!(quote(";"), "`;`");
        assert_eq!(quote("a`b"), "\"a`b\"");
    }

    #[test]
    fn test_display_with_location() {
        let error = ParseError::new(
            Some(SourceLocation::new(Some(Rc::from("main.mf")), 3)),
            "unknown token `@`",
        );
        assert_eq!(error.to_string(), "[main.mf:3] unknown token `@`");
    }

    #[test]
    fn test_display_without_location() {
        let error = ParseError::new(None, "unknown token `@`");
        assert_eq!(error.to_string(), "unknown token `@`");
    }
}
