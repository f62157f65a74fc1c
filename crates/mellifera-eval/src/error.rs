//! Runtime errors and control-flow signals.

use crate::value::Value;
use mellifera_syntax::token::SourceLocation;
use std::fmt;

/// One frame of the call trace attached to a runtime error, recorded as the
/// error unwinds through function calls.
#[derive(Debug, Clone)]
pub struct TraceFrame {
    /// Location of the call site.
    pub location: Option<SourceLocation>,
    /// The function or builtin that was being called.
    pub function: Value,
}

/// A runtime error: an arbitrary value payload, the location it was raised
/// at, and the call trace accumulated while unwinding.
#[derive(Debug, Clone)]
pub struct Error {
    pub location: Option<SourceLocation>,
    pub value: Value,
    pub trace: Vec<TraceFrame>,
}

impl Error {
    pub fn new(location: Option<SourceLocation>, value: Value) -> Self {
        Self {
            location,
            value,
            trace: Vec::new(),
        }
    }

    /// A runtime error carrying a string payload.
    pub fn message(location: Option<SourceLocation>, message: impl AsRef<str>) -> Self {
        Self::new(location, Value::string(message.as_ref()))
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // String payloads render their contents without quotes.
        match &self.value {
            Value::Str(bytes) => f.write_str(&String::from_utf8_lossy(bytes)),
            other => write!(f, "{other}"),
        }
    }
}

impl std::error::Error for Error {}

/// A non-error control-flow signal propagating out of statement evaluation.
#[derive(Debug, Clone)]
pub enum Flow {
    Return(Value),
    Break(Option<SourceLocation>),
    Continue(Option<SourceLocation>),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_string_payload_renders_unquoted() {
        let error = Error::message(None, "division by zero");
        assert_eq!(error.to_string(), "division by zero");
    }

    #[test]
    fn test_value_payload_renders_display_form() {
        let error = Error::new(None, Value::Number(123.456));
        assert_eq!(error.to_string(), "123.456");
    }
}
