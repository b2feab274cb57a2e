//! Visual positions in the preview and click resolutions.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// The current visual locus: a point on one page of the preview.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct PreviewPosition {
    pub page: usize,
    pub x: f64,
    pub y: f64,
}

impl PreviewPosition {
    pub const fn new(page: usize, x: f64, y: f64) -> Self {
        Self { page, x, y }
    }

    /// Clamp the page index into `[0, page_count)`.
    ///
    /// An empty preview clamps to page 0.
    pub fn clamped(self, page_count: usize) -> Self {
        Self {
            page: self.page.min(page_count.saturating_sub(1)),
            ..self
        }
    }
}

/// Outcome of resolving a click on a preview page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum ClickResolution {
    /// Jump to a byte position in a source file.
    FileJump { file: PathBuf, position: usize },
    /// Jump to another point in the preview (e.g. an internal link).
    PositionJump { page: usize, x: f64, y: f64 },
    /// Open an external link.
    UrlJump { url: String },
    /// Nothing under the click.
    NoJump,
}

impl ClickResolution {
    pub fn label(&self) -> &'static str {
        match self {
            Self::FileJump { .. } => "file",
            Self::PositionJump { .. } => "position",
            Self::UrlJump { .. } => "url",
            Self::NoJump => "none",
        }
    }
}
