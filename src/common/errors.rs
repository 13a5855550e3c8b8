use std::fmt;

use super::Span;

/// An error message anchored to a byte range of the source file. This is the
/// only error type the compilation pipeline surfaces; the driver resolves the
/// span to a line and column for display.
#[derive(Debug, PartialEq)]
pub struct SpanError {
    pub msg: String,
    pub span: Span,
}

impl SpanError {
    pub fn new(msg: String, span: Span) -> Self {
        SpanError { msg, span }
    }
}

impl fmt::Display for SpanError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.msg)
    }
}

impl std::error::Error for SpanError {}
