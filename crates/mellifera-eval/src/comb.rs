//! The comb serialization format: an almost-JSON with `Map{}`/`Set{}`
//! sentinels, used to dump values, tokens, and AST nodes.
//!
//! The encoder wraps an output sink and an optional indent string. Without
//! an indent, output is a single line with `", "` separators; with one,
//! every element starts on its own line indented by depth. Errors are
//! sticky: after the first failure every write short-circuits and reports
//! the same error.

use std::io::Write;
use thiserror::Error;

/// Comb encoding failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CombError {
    /// The value (regexp, reference, function, non-finite number, ...) has
    /// no comb representation.
    #[error("invalid comb value {0}")]
    InvalidValue(String),
    /// The underlying sink failed.
    #[error("{0}")]
    Io(String),
}

/// Streaming encoder for the comb format.
pub struct CombEncoder<W: Write> {
    writer: W,
    indent: Option<String>,
    level: usize,
    error: Option<CombError>,
}

impl<W: Write> CombEncoder<W> {
    /// Create an encoder. `indent` of `None` selects single-line output.
    pub fn new(writer: W, indent: Option<&str>) -> Self {
        Self {
            writer,
            indent: indent.map(str::to_string),
            level: 0,
            error: None,
        }
    }

    /// The sticky error, if any write has failed.
    pub fn error(&self) -> Option<&CombError> {
        self.error.as_ref()
    }

    pub(crate) fn has_indent(&self) -> bool {
        self.indent.is_some()
    }

    pub(crate) fn ascend(&mut self) {
        self.level += 1;
    }

    pub(crate) fn descend(&mut self) {
        self.level -= 1;
    }

    /// Record an unencodable value. Keeps an earlier sticky error if one is
    /// already set.
    pub(crate) fn fail_invalid(&mut self, value_string: String) -> CombError {
        if let Some(error) = &self.error {
            return error.clone();
        }
        let error = CombError::InvalidValue(value_string);
        self.error = Some(error.clone());
        error
    }

    pub(crate) fn write_str(&mut self, text: &str) -> Result<(), CombError> {
        if let Some(error) = &self.error {
            return Err(error.clone());
        }
        if let Err(io) = self.writer.write_all(text.as_bytes()) {
            let error = CombError::Io(io.to_string());
            self.error = Some(error.clone());
            return Err(error);
        }
        Ok(())
    }

    /// Write the current indentation followed by `text`. Indentation is only
    /// emitted in indent mode.
    pub(crate) fn write_indent(&mut self, text: &str) -> Result<(), CombError> {
        if let Some(indent) = self.indent.clone() {
            for _ in 0..self.level {
                self.write_str(&indent)?;
            }
        }
        self.write_str(text)
    }

    /// End an element: a newline in indent mode, a space otherwise.
    pub(crate) fn write_end_of_line(&mut self) -> Result<(), CombError> {
        if self.indent.is_some() {
            self.write_str("\n")
        } else {
            self.write_str(" ")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Value;

    fn encode(value: &Value, indent: Option<&str>) -> Result<String, CombError> {
        let mut buffer = Vec::new();
        let mut encoder = CombEncoder::new(&mut buffer, indent);
        value.comb_encode(&mut encoder)?;
        Ok(String::from_utf8(buffer).expect("comb output is UTF-8"))
    }

    #[test]
    fn test_atoms() {
        for indent in [None, Some("\t")] {
            assert_eq!(encode(&Value::Null, indent).unwrap(), "null");
            assert_eq!(encode(&Value::Boolean(true), indent).unwrap(), "true");
            assert_eq!(encode(&Value::Number(123.456), indent).unwrap(), "123.456");
            assert_eq!(
                encode(&Value::string("foo\nbar"), indent).unwrap(),
                "\"foo\\nbar\""
            );
        }
    }

    #[test]
    fn test_nonfinite_numbers_fail() {
        for (number, rendered) in [
            (f64::NAN, "NaN"),
            (f64::INFINITY, "Inf"),
            (f64::NEG_INFINITY, "-Inf"),
        ] {
            let error = encode(&Value::Number(number), Some("\t")).unwrap_err();
            assert_eq!(
                error.to_string(),
                format!("invalid comb value {rendered}")
            );
        }
    }

    #[test]
    fn test_regexp_fails_with_no_bytes_written() {
        let value = crate::context::Context::new()
            .new_regexp("^.*$")
            .expect("valid pattern");
        let mut buffer = Vec::new();
        let mut encoder = CombEncoder::new(&mut buffer, None);
        let error = value.comb_encode(&mut encoder).unwrap_err();
        assert_eq!(error.to_string(), "invalid comb value r\"^.*$\"");
        assert!(buffer.is_empty());
    }

    #[test]
    fn test_reference_fails() {
        let value = Value::reference(Value::Number(123.456));
        let error = encode(&value, None).unwrap_err();
        assert!(error
            .to_string()
            .starts_with("invalid comb value reference@"));
    }

    #[test]
    fn test_error_is_sticky() {
        let value = Value::vector(vec![
            Value::string("ok"),
            Value::Number(f64::NAN),
            Value::string("unreached"),
        ]);
        let mut buffer = Vec::new();
        let mut encoder = CombEncoder::new(&mut buffer, None);
        let error = value.comb_encode(&mut encoder).unwrap_err();
        assert_eq!(error.to_string(), "invalid comb value NaN");
        assert_eq!(encoder.error(), Some(&error));
        // Nothing is written after the failure point.
        assert_eq!(String::from_utf8(buffer).unwrap(), "[\"ok\", ");
    }

    #[test]
    fn test_vector_default_and_indented() {
        let empty = Value::vector(vec![]);
        assert_eq!(encode(&empty, None).unwrap(), "[]");
        assert_eq!(encode(&empty, Some("\t")).unwrap(), "[]");

        let value = Value::vector(vec![
            Value::Null,
            Value::Boolean(false),
            Value::Number(123.456),
            Value::string("foo"),
            Value::vector(vec![]),
            Value::vector(vec![
                Value::string("foo"),
                Value::string("bar"),
                Value::string("baz"),
            ]),
        ]);
        assert_eq!(
            encode(&value, None).unwrap(),
            "[null, false, 123.456, \"foo\", [], [\"foo\", \"bar\", \"baz\"]]"
        );
        assert_eq!(
            encode(&value, Some("\t")).unwrap(),
            "[\n\tnull,\n\tfalse,\n\t123.456,\n\t\"foo\",\n\t[],\n\t[\n\t\t\"foo\",\n\t\t\"bar\",\n\t\t\"baz\"\n\t]\n]"
        );
    }

    #[test]
    fn test_vector_deeply_nested() {
        let value = Value::vector(vec![Value::vector(vec![Value::vector(vec![
            Value::vector(vec![Value::string("foo")]),
        ])])]);
        assert_eq!(encode(&value, None).unwrap(), "[[[[\"foo\"]]]]");
        assert_eq!(
            encode(&value, Some("\t")).unwrap(),
            "[\n\t[\n\t\t[\n\t\t\t[\n\t\t\t\t\"foo\"\n\t\t\t]\n\t\t]\n\t]\n]"
        );
    }

    #[test]
    fn test_map_default_and_indented() {
        let empty = Value::map(vec![]);
        assert_eq!(encode(&empty, None).unwrap(), "Map{}");
        assert_eq!(encode(&empty, Some("\t")).unwrap(), "Map{}");

        let value = Value::map(vec![
            (Value::Null, Value::Null),
            (Value::Boolean(false), Value::Boolean(false)),
            (Value::Number(123.456), Value::Number(123.456)),
            (Value::string("foo"), Value::string("foo")),
            (Value::string("empty"), Value::map(vec![])),
            (
                Value::string("non-empty"),
                Value::map(vec![
                    (Value::string("abc"), Value::string("foo")),
                    (Value::string("def"), Value::string("bar")),
                    (Value::string("hij"), Value::string("baz")),
                ]),
            ),
        ]);
        assert_eq!(
            encode(&value, None).unwrap(),
            "{null: null, false: false, 123.456: 123.456, \"foo\": \"foo\", \
             \"empty\": Map{}, \"non-empty\": {\"abc\": \"foo\", \"def\": \"bar\", \"hij\": \"baz\"}}"
        );
        assert_eq!(
            encode(&value, Some("\t")).unwrap(),
            "{\n\tnull: null,\n\tfalse: false,\n\t123.456: 123.456,\n\t\"foo\": \"foo\",\n\t\
             \"empty\": Map{},\n\t\"non-empty\": {\n\t\t\"abc\": \"foo\",\n\t\t\"def\": \"bar\",\n\t\t\"hij\": \"baz\"\n\t}\n}"
        );
    }

    #[test]
    fn test_map_deeply_nested() {
        let value = Value::map(vec![(
            Value::string("foo"),
            Value::map(vec![(
                Value::string("bar"),
                Value::map(vec![(
                    Value::string("baz"),
                    Value::map(vec![(Value::string("qux"), Value::map(vec![]))]),
                )]),
            )]),
        )]);
        assert_eq!(
            encode(&value, None).unwrap(),
            "{\"foo\": {\"bar\": {\"baz\": {\"qux\": Map{}}}}}"
        );
        assert_eq!(
            encode(&value, Some("\t")).unwrap(),
            "{\n\t\"foo\": {\n\t\t\"bar\": {\n\t\t\t\"baz\": {\n\t\t\t\t\"qux\": Map{}\n\t\t\t}\n\t\t}\n\t}\n}"
        );
    }

    #[test]
    fn test_set_default_and_indented() {
        let empty = Value::set(vec![]);
        assert_eq!(encode(&empty, None).unwrap(), "Set{}");
        assert_eq!(encode(&empty, Some("\t")).unwrap(), "Set{}");

        let value = Value::set(vec![
            Value::Null,
            Value::Boolean(false),
            Value::Number(123.456),
            Value::string("foo"),
            Value::set(vec![]),
            Value::set(vec![
                Value::string("foo"),
                Value::string("bar"),
                Value::string("baz"),
            ]),
        ]);
        assert_eq!(
            encode(&value, None).unwrap(),
            "{null, false, 123.456, \"foo\", Set{}, {\"foo\", \"bar\", \"baz\"}}"
        );
        assert_eq!(
            encode(&value, Some("\t")).unwrap(),
            "{\n\tnull,\n\tfalse,\n\t123.456,\n\t\"foo\",\n\tSet{},\n\t{\n\t\t\"foo\",\n\t\t\"bar\",\n\t\t\"baz\"\n\t}\n}"
        );
    }
}
