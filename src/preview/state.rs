//! Engine state and the snapshots handed to the presentation layer.

use std::sync::Arc;

use serde::Serialize;

use crate::cache::{CacheStats, RenderCache};
use crate::core::{Diagnostic, PageImage, PreviewPosition};
use crate::diagnostics::InlineMarker;
use crate::fingerprint::PageKey;

use super::sequence::Ticket;

/// Phase of the compile/render cycle.
///
/// `Error` is transient: a failing cycle passes through it on its way back
/// to `Idle`, leaving the previous preview in place.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub enum Phase {
    #[default]
    Idle,
    Compiling,
    Rendering,
    Error,
}

impl Phase {
    pub fn label(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Compiling => "compiling",
            Self::Rendering => "rendering",
            Self::Error => "error",
        }
    }
}

/// One slot of the visible page list.
#[derive(Debug, Clone)]
pub struct DisplayedPage {
    pub key: PageKey,
    pub image: Arc<PageImage>,
}

impl DisplayedPage {
    pub fn width(&self) -> u32 {
        self.image.width
    }

    pub fn height(&self) -> u32 {
        self.image.height
    }
}

pub(super) struct State {
    pub(super) phase: Phase,
    pub(super) pages: Vec<DisplayedPage>,
    pub(super) diagnostics: Vec<Diagnostic>,
    pub(super) markers: Vec<InlineMarker>,
    pub(super) position: PreviewPosition,
    pub(super) cache: RenderCache,
    pub(super) last_error: Option<String>,
    /// Compile whose answer is still outstanding
    pub(super) pending_compile: Option<Ticket>,
}

impl State {
    pub(super) fn new(cache_capacity: usize) -> Self {
        Self {
            phase: Phase::Idle,
            pages: Vec::new(),
            diagnostics: Vec::new(),
            markers: Vec::new(),
            position: PreviewPosition::default(),
            cache: RenderCache::new(cache_capacity),
            last_error: None,
            pending_compile: None,
        }
    }

    pub(super) fn snapshot(&self) -> PreviewSnapshot {
        PreviewSnapshot {
            phase: self.phase,
            pages: self.pages.clone(),
            diagnostics: self.diagnostics.clone(),
            markers: self.markers.clone(),
            position: self.position,
            last_error: self.last_error.clone(),
            cache_entries: self.cache.len(),
            cache_stats: self.cache.stats(),
        }
    }
}

/// Immutable copy of the engine state. Page images are shared, not copied.
#[derive(Debug, Clone)]
pub struct PreviewSnapshot {
    pub phase: Phase,
    pub pages: Vec<DisplayedPage>,
    pub diagnostics: Vec<Diagnostic>,
    pub markers: Vec<InlineMarker>,
    pub position: PreviewPosition,
    /// Message of the most recent failure, kept until the next success
    pub last_error: Option<String>,
    pub cache_entries: usize,
    pub cache_stats: CacheStats,
}

impl PreviewSnapshot {
    pub fn page_count(&self) -> usize {
        self.pages.len()
    }
}
