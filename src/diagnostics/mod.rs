//! Diagnostics projector: 1-based compiler locations to buffer offsets.
//!
//! Compiler locations refer to the source that was compiled, which may be a
//! few keystrokes behind the live buffer. Projection therefore clamps
//! instead of failing: the line into `[1, total_lines]`, the column into
//! `[1, line_len + 1]`. Offsets count chars, like the editor cursor.

use serde::Serialize;

use crate::core::{Diagnostic, Severity};

/// Line start table of one text.
#[derive(Debug, Clone)]
pub struct LineIndex {
    /// (start offset, length without separator) per line
    lines: Vec<(usize, usize)>,
}

impl LineIndex {
    /// Index `text`. Recognized breaks are `\n`, `\r\n` and a lone `\r`.
    pub fn new(text: &str) -> Self {
        let mut lines = Vec::new();
        let mut start = 0;
        let mut offset = 0;
        let mut chars = text.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '\r' if chars.peek() == Some(&'\n') => {
                    chars.next();
                    lines.push((start, offset - start));
                    offset += 2;
                    start = offset;
                }
                '\n' | '\r' => {
                    lines.push((start, offset - start));
                    offset += 1;
                    start = offset;
                }
                _ => offset += 1,
            }
        }
        lines.push((start, offset - start));

        Self { lines }
    }

    /// Always at least 1.
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }

    /// Offset of a 1-based `(line, column)`, clamped into the text.
    pub fn offset(&self, line: usize, column: usize) -> usize {
        let line = line.clamp(1, self.lines.len());
        let (start, len) = self.lines[line - 1];
        start + column.clamp(1, len + 1) - 1
    }
}

/// A diagnostic projected onto the live buffer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InlineMarker {
    pub start: usize,
    pub end: usize,
    pub severity: Severity,
    /// Message with hints appended, one `hint:` line each
    pub message: String,
}

impl InlineMarker {
    pub fn project(index: &LineIndex, diagnostic: &Diagnostic) -> Self {
        let loc = diagnostic.location;
        let start = index.offset(loc.line, loc.column);
        // A stale end may land before a clamped start
        let end = index.offset(loc.end_line, loc.end_column).max(start);

        let mut message = diagnostic.message.clone();
        for hint in &diagnostic.hints {
            message.push_str("\nhint: ");
            message.push_str(hint);
        }

        Self {
            start,
            end,
            severity: diagnostic.severity,
            message,
        }
    }
}

/// Project every diagnostic against `text`, preserving order.
pub fn project(text: &str, diagnostics: &[Diagnostic]) -> Vec<InlineMarker> {
    if diagnostics.is_empty() {
        return Vec::new();
    }
    let index = LineIndex::new(text);
    diagnostics
        .iter()
        .map(|d| InlineMarker::project(&index, d))
        .collect()
}
