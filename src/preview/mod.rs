//! Compile/render orchestrator.
//!
//! ```text
//! compile_and_render:  persist → compile → diagnostics → render
//! render:              cursor → page count → plan → fetch → cache → splice
//! ```
//!
//! Every `await` is a backend call and every resumption re-checks a
//! sequence ticket. A result that comes back after a newer cycle was issued
//! is dropped, so stale answers can never overwrite fresh ones. Failures
//! end the cycle with one notification and leave the last good preview.
//!
//! State lives behind a mutex that is never held across an `await`.

mod render;
mod sequence;
mod state;

#[cfg(test)]
pub(crate) mod testing;

use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;

use crate::backend::{Backend, timed};
use crate::core::{ClickResolution, Diagnostic, PreviewPosition, SourceSnapshot, tally};
use crate::diagnostics;
use crate::error::{ErrorKind, PreviewError};
use crate::event::{EventSink, Notification, PreviewEvent};
use crate::position::PositionMapper;

pub use render::RenderPlan;
pub use state::{DisplayedPage, Phase, PreviewSnapshot};

use sequence::{Sequencer, Ticket};
use state::State;

/// Default bound of every backend call.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default number of decoded pages kept in the render cache.
pub const DEFAULT_CACHE_CAPACITY: usize = 256;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreviewOptions {
    pub timeout: Duration,
    pub cache_capacity: usize,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            cache_capacity: DEFAULT_CACHE_CAPACITY,
        }
    }
}

/// How a cycle ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CycleOutcome {
    Rendered(RenderReport),
    /// Reported to the user; the previous preview is still shown.
    Failed(ErrorKind),
    /// A newer cycle was issued first; nothing was applied.
    Superseded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderReport {
    pub plan: RenderPlan,
    /// Length of the page list after the splice
    pub total: usize,
    pub changed: Vec<usize>,
    pub hits: usize,
    pub misses: usize,
}

/// Drives the backend and owns the preview state.
///
/// Cheap to clone; clones share the same state. Construct one per
/// application and pass it explicitly.
pub struct Orchestrator<B> {
    inner: Arc<Inner<B>>,
}

impl<B> Clone for Orchestrator<B> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct Inner<B> {
    backend: B,
    events: EventSink,
    timeout: Duration,
    state: Mutex<State>,
    compiles: Sequencer,
    renders: Sequencer,
    clicks: Sequencer,
}

impl<B: Backend> Orchestrator<B> {
    pub fn new(backend: B, events: EventSink, options: PreviewOptions) -> Self {
        Self {
            inner: Arc::new(Inner {
                backend,
                events,
                timeout: options.timeout,
                state: Mutex::new(State::new(options.cache_capacity)),
                compiles: Sequencer::default(),
                renders: Sequencer::default(),
                clicks: Sequencer::default(),
            }),
        }
    }

    pub fn backend(&self) -> &B {
        &self.inner.backend
    }

    pub fn events(&self) -> &EventSink {
        &self.inner.events
    }

    pub fn timeout(&self) -> Duration {
        self.inner.timeout
    }

    pub fn snapshot(&self) -> PreviewSnapshot {
        self.inner.state.lock().snapshot()
    }

    /// Diagnostics of the last compile, projected onto `text`.
    pub fn project_markers(&self, text: &str) -> Vec<diagnostics::InlineMarker> {
        let state = self.inner.state.lock();
        diagnostics::project(text, &state.diagnostics)
    }

    /// Persist, compile, and render one snapshot.
    pub async fn compile_and_render(&self, source: &SourceSnapshot) -> CycleOutcome {
        let inner = &*self.inner;
        let ticket = inner.compiles.issue();
        crate::debug!("compile"; "cycle #{} for {}", ticket.get(), source.path.display());
        {
            let mut state = inner.state.lock();
            state.pending_compile = Some(ticket);
        }
        self.set_phase(Phase::Compiling);

        let persisted = timed(
            "persist_source",
            inner.timeout,
            inner.backend.persist_source(&source.path, &source.content),
        )
        .await;
        if !inner.compiles.is_current(ticket) {
            return self.superseded("persist");
        }
        if let Err(e) = persisted {
            self.finish_compile(ticket);
            return self.fail(&e);
        }

        let compiled = timed("compile", inner.timeout, inner.backend.compile()).await;
        if !inner.compiles.is_current(ticket) {
            return self.superseded("compile");
        }
        self.finish_compile(ticket);

        match compiled {
            Ok(diagnostics) => {
                let (_, warnings) = tally(&diagnostics);
                if warnings > 0 {
                    crate::log!("warning"; "{} warning(s) in {}", warnings, source.path.display());
                }
                self.replace_diagnostics(source, diagnostics);
            }
            Err(e) => {
                // A rejected source still reports where it went wrong
                if let PreviewError::Compile { diagnostics } = &e {
                    self.replace_diagnostics(source, diagnostics.clone());
                }
                return self.fail(&e);
            }
        }

        self.render_cycle(source, Some(ticket)).await
    }

    /// Re-render for a cursor move; no compile.
    pub async fn render(&self, source: &SourceSnapshot) -> CycleOutcome {
        self.render_cycle(source, None).await
    }

    async fn render_cycle(&self, source: &SourceSnapshot, compile: Option<Ticket>) -> CycleOutcome {
        let inner = &*self.inner;
        let ticket = inner.renders.issue();
        let stale = || {
            !inner.renders.is_current(ticket)
                || compile.is_some_and(|t| !inner.compiles.is_current(t))
        };
        self.set_phase(Phase::Rendering);

        let mapper = PositionMapper::new(&inner.backend, inner.timeout);
        let mapped = mapper
            .cursor_to_preview_position(source.cursor, &source.content, &source.path)
            .await;
        if stale() {
            return self.superseded("cursor mapping");
        }
        let cursor = match mapped {
            Ok(pos) => Some(pos),
            Err(PreviewError::MappingNotFound) => {
                crate::debug!("render"; "cursor {} has no page, rendering all", source.cursor);
                None
            }
            Err(e) => {
                crate::log!("warning"; "cursor mapping failed: {}", e);
                None
            }
        };

        let count = timed("page_count", inner.timeout, inner.backend.page_count()).await;
        if stale() {
            return self.superseded("page count");
        }
        let count = match count {
            Ok(count) => count,
            Err(e) => return self.fail(&e),
        };

        let plan = RenderPlan::choose(inner.state.lock().pages.len(), count, cursor);
        crate::debug!("render"; "{} render, {} page(s)", plan.label(), count);

        let spliced = match plan {
            RenderPlan::Full => {
                let pages = timed(
                    "render_all_pages",
                    inner.timeout,
                    inner.backend.render_all_pages(),
                )
                .await;
                if stale() {
                    return self.superseded("pages");
                }
                match pages {
                    Ok(pages) => render::splice_all(&mut inner.state.lock(), &pages),
                    Err(e) => Err(e),
                }
            }
            RenderPlan::Single(index) => {
                let page = timed(
                    "render_page",
                    inner.timeout,
                    inner.backend.render_page(index),
                )
                .await;
                if stale() {
                    return self.superseded("page");
                }
                match page {
                    Ok(page) if page.index != index => Err(PreviewError::transport(
                        "render_page",
                        format!("asked for page {index}, got page {}", page.index),
                    )),
                    Ok(page) => render::splice_one(&mut inner.state.lock(), &page),
                    Err(e) => Err(e),
                }
            }
        };
        let spliced = match spliced {
            Ok(spliced) => spliced,
            Err(e) => return self.fail(&e),
        };

        let (total, position, moved) = {
            let mut state = inner.state.lock();
            let total = state.pages.len();
            let position = cursor.unwrap_or(state.position).clamped(total);
            let moved = position != state.position;
            state.position = position;
            state.last_error = None;
            (total, position, moved)
        };

        if plan == RenderPlan::Full || !spliced.changed.is_empty() {
            inner.events.emit(PreviewEvent::PagesChanged {
                indices: spliced.changed.clone(),
                total,
            });
        }
        if moved {
            inner.events.emit(PreviewEvent::PositionChanged(position));
        }
        self.settle_phase();

        crate::debug!(
            "cache";
            "{} hit(s), {} miss(es), {} page(s) shown",
            spliced.hits,
            spliced.misses,
            total
        );

        CycleOutcome::Rendered(RenderReport {
            plan,
            total,
            changed: spliced.changed,
            hits: spliced.hits,
            misses: spliced.misses,
        })
    }

    /// Resolve a click on the preview and act on it.
    ///
    /// `PositionJump`, `UrlJump` and `NoJump` are handled here. `FileJump`
    /// is returned untouched for the editing session to follow. Returns
    /// `None` on failure or when a newer click was issued meanwhile.
    pub async fn click(&self, text: &str, page: usize, x: f64, y: f64) -> Option<ClickResolution> {
        let inner = &*self.inner;
        let ticket = inner.clicks.issue();

        let mapper = PositionMapper::new(&inner.backend, inner.timeout);
        let resolved = mapper.click_to_target(text, page, x, y).await;
        if !inner.clicks.is_current(ticket) {
            crate::debug!("click"; "dropped stale click #{}", ticket.get());
            return None;
        }

        let resolution = match resolved {
            Ok(resolution) => resolution,
            Err(e) => {
                crate::debug!("click"; "page {} failed", page);
                inner.events.notify(Notification::error(e.to_string()));
                return None;
            }
        };
        crate::debug!("click"; "page {} ({:.1}, {:.1}) -> {}", page, x, y, resolution.label());

        match &resolution {
            ClickResolution::PositionJump { page, x, y } => {
                let position = {
                    let mut state = inner.state.lock();
                    let position = PreviewPosition::new(*page, *x, *y).clamped(state.pages.len());
                    state.position = position;
                    position
                };
                inner.events.emit(PreviewEvent::PositionChanged(position));
            }
            ClickResolution::UrlJump { url } => {
                inner.events.emit(PreviewEvent::OpenUrl(url.clone()));
            }
            ClickResolution::FileJump { .. } => {}
            ClickResolution::NoJump => {
                inner
                    .events
                    .notify(Notification::info("nothing to jump to here"));
            }
        }

        Some(resolution)
    }

    /// Forget everything tied to the current main document.
    ///
    /// In-flight cycles and clicks are invalidated and dropped on arrival.
    pub fn reset_for_document(&self) {
        let inner = &*self.inner;
        inner.compiles.invalidate();
        inner.renders.invalidate();
        inner.clicks.invalidate();
        {
            let mut state = inner.state.lock();
            state.cache.clear();
            state.pages.clear();
            state.diagnostics.clear();
            state.markers.clear();
            state.position = PreviewPosition::default();
            state.last_error = None;
            state.pending_compile = None;
        }
        crate::debug!("cache"; "cleared for new main document");
        inner.events.emit(PreviewEvent::PagesChanged {
            indices: Vec::new(),
            total: 0,
        });
        inner.events.emit(PreviewEvent::Diagnostics(Vec::new()));
        self.set_phase(Phase::Idle);
    }

    fn replace_diagnostics(&self, source: &SourceSnapshot, diagnostics: Vec<Diagnostic>) {
        let markers = diagnostics::project(&source.content, &diagnostics);
        {
            let mut state = self.inner.state.lock();
            state.diagnostics = diagnostics;
            state.markers = markers.clone();
        }
        self.inner.events.emit(PreviewEvent::Diagnostics(markers));
    }

    fn set_phase(&self, phase: Phase) {
        let changed = {
            let mut state = self.inner.state.lock();
            std::mem::replace(&mut state.phase, phase) != phase
        };
        if changed {
            self.inner.events.emit(PreviewEvent::Phase(phase));
        }
    }

    /// Back to `Idle`, or `Compiling` while a compile is still out.
    fn settle_phase(&self) {
        let pending = self.inner.state.lock().pending_compile.is_some();
        self.set_phase(if pending { Phase::Compiling } else { Phase::Idle });
    }

    fn finish_compile(&self, ticket: Ticket) {
        let mut state = self.inner.state.lock();
        if state.pending_compile == Some(ticket) {
            state.pending_compile = None;
        }
    }

    fn fail(&self, err: &PreviewError) -> CycleOutcome {
        let message = err.to_string();
        self.inner.state.lock().last_error = Some(message.clone());
        self.set_phase(Phase::Error);
        self.settle_phase();
        self.inner.events.notify(Notification::error(message));
        CycleOutcome::Failed(err.kind())
    }

    fn superseded(&self, stage: &str) -> CycleOutcome {
        crate::debug!("preview"; "dropped stale {} result", stage);
        CycleOutcome::Superseded
    }
}
