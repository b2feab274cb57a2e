//! The editing buffer and the immutable snapshots handed to the engine.

use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Authoritative text of the file being edited.
///
/// Cursor offsets count Unicode scalar values, not bytes.
#[derive(Debug, Clone)]
pub struct SourceBuffer {
    path: PathBuf,
    content: String,
    dirty: bool,
    cursor: usize,
}

impl SourceBuffer {
    /// A freshly loaded, clean buffer with the cursor at the start.
    pub fn new(path: impl Into<PathBuf>, content: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            dirty: false,
            cursor: 0,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn is_dirty(&self) -> bool {
        self.dirty
    }

    /// Replace the whole text (an editor edit). Marks the buffer dirty.
    pub fn apply_edit(&mut self, content: impl Into<String>, cursor: usize) {
        self.content = content.into();
        self.dirty = true;
        self.set_cursor(cursor);
    }

    /// Move the cursor, clamped to the end of the text.
    pub fn set_cursor(&mut self, cursor: usize) {
        self.cursor = cursor.min(self.content.chars().count());
    }

    /// Mark the buffer as persisted to disk.
    pub fn mark_saved(&mut self) {
        self.dirty = false;
    }

    pub fn snapshot(&self) -> SourceSnapshot {
        SourceSnapshot {
            path: self.path.clone(),
            content: Arc::from(self.content.as_str()),
            cursor: self.cursor,
        }
    }
}

/// Read-only view of a buffer at one instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceSnapshot {
    pub path: PathBuf,
    pub content: Arc<str>,
    pub cursor: usize,
}

impl SourceSnapshot {
    pub fn new(path: impl Into<PathBuf>, content: &str, cursor: usize) -> Self {
        Self {
            path: path.into(),
            content: Arc::from(content),
            cursor,
        }
    }
}

/// Convert a byte position into a cursor offset.
///
/// Positions inside a multi-byte character snap to the start of that
/// character. Positions past the end clamp to the end.
pub fn byte_to_char_offset(text: &str, byte: usize) -> usize {
    let byte = byte.min(text.len());
    text.char_indices()
        .take_while(|(i, c)| i + c.len_utf8() <= byte)
        .count()
}
