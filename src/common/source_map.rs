/// A 1-based line and character position in a source buffer.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub struct Location {
    pub line: usize,
    pub column: usize,
}

/// Resolves byte offsets to line/column pairs and hands out the text of
/// individual lines, for rendering diagnostics against the source. Columns
/// count characters, not bytes.
pub struct SourceMap<'a> {
    src: &'a str,
    line_starts: Vec<usize>,
}

impl<'a> SourceMap<'a> {
    pub fn new(src: &'a str) -> Self {
        let mut line_starts = vec![0];
        for (pos, c) in src.char_indices() {
            if c == '\n' {
                line_starts.push(pos + 1);
            }
        }

        SourceMap { src, line_starts }
    }

    pub fn location(&self, pos: usize) -> Location {
        let line = self.line_starts.partition_point(|&start| start <= pos);
        let line_start = self.line_starts[line - 1];
        let column = self.src[line_start..pos].chars().count() + 1;
        Location { line, column }
    }

    /// The text of a 1-based line, without its terminator.
    pub fn line_text(&self, line: usize) -> &'a str {
        let start = self.line_starts[line - 1];
        let end = self
            .line_starts
            .get(line)
            .map_or(self.src.len(), |&next_start| next_start - 1);
        &self.src[start..end]
    }
}
