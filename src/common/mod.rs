mod cursor;
mod errors;
mod source_map;
mod span;

pub use cursor::{Cursor, EOF_CHAR};
pub use errors::SpanError;
pub use source_map::{Location, SourceMap};
pub use span::Span;
