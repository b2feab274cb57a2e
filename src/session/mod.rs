//! Editing session: the open buffer and the workspace around it.
//!
//! The session owns the [`SourceBuffer`], knows which file is the main
//! document and hands immutable snapshots to the [`Orchestrator`]. It also
//! follows file jumps from the preview back into the editor.

use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use parking_lot::Mutex;

use crate::backend::{Backend, timed};
use crate::core::{
    ClickResolution, DocumentKind, ExportFormat, SourceBuffer, SourceSnapshot, byte_to_char_offset,
};
use crate::diagnostics::InlineMarker;
use crate::error::{ErrorKind, PreviewError, Result};
use crate::event::{Notification, PreviewEvent};
use crate::preview::{CycleOutcome, Orchestrator};

/// Result of a save request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveOutcome {
    Saved,
    /// Nothing open, or no unsaved changes
    Clean,
    /// Another save is still running
    InProgress,
    Failed(ErrorKind),
}

#[derive(Default)]
struct Workspace {
    root: Option<PathBuf>,
    main: Option<PathBuf>,
    buffer: Option<SourceBuffer>,
}

pub struct EditingSession<B> {
    preview: Orchestrator<B>,
    workspace: Mutex<Workspace>,
    saving: AtomicBool,
}

/// Clears the in-flight save flag when dropped.
struct SaveGuard<'a>(&'a AtomicBool);

impl Drop for SaveGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

impl<B: Backend> EditingSession<B> {
    pub fn new(preview: Orchestrator<B>) -> Self {
        Self {
            preview,
            workspace: Mutex::new(Workspace::default()),
            saving: AtomicBool::new(false),
        }
    }

    pub fn preview(&self) -> &Orchestrator<B> {
        &self.preview
    }

    pub fn root(&self) -> Option<PathBuf> {
        self.workspace.lock().root.clone()
    }

    pub fn main_document(&self) -> Option<PathBuf> {
        self.workspace.lock().main.clone()
    }

    /// Path of the file shown in the editor.
    pub fn current_file(&self) -> Option<PathBuf> {
        self.workspace
            .lock()
            .buffer
            .as_ref()
            .map(|b| b.path().to_path_buf())
    }

    pub fn is_dirty(&self) -> bool {
        self.workspace
            .lock()
            .buffer
            .as_ref()
            .is_some_and(SourceBuffer::is_dirty)
    }

    /// Immutable view of the buffer for a compile or render cycle.
    pub fn snapshot(&self) -> Option<SourceSnapshot> {
        self.workspace.lock().buffer.as_ref().map(SourceBuffer::snapshot)
    }

    /// Switch to another workspace. Forgets the main document and buffer.
    pub async fn open_workspace(&self, path: &Path) -> Result<()> {
        let backend = self.preview.backend();
        self.report(timed("open_workspace", self.preview.timeout(), backend.open_workspace(path)).await)?;

        {
            let mut workspace = self.workspace.lock();
            workspace.root = Some(path.to_path_buf());
            workspace.main = None;
            workspace.buffer = None;
        }
        self.preview.reset_for_document();
        crate::log!("session"; "workspace {}", path.display());
        Ok(())
    }

    /// Make `path` the document the preview compiles, then compile it.
    ///
    /// Returns `None` when nothing had to be done: the path is already the
    /// main document, or it is not a Typst source.
    pub async fn set_main_document(&self, path: &Path) -> Result<Option<CycleOutcome>> {
        if !DocumentKind::from_path(path).is_compilable() {
            self.preview.events().notify(Notification::info(format!(
                "only .typ files can be the main document, not {}",
                path.display()
            )));
            return Ok(None);
        }
        if self.main_document().as_deref() == Some(path) {
            return Ok(None);
        }

        let backend = self.preview.backend();
        self.report(
            timed("set_main_document", self.preview.timeout(), backend.set_main_document(path)).await,
        )?;
        self.workspace.lock().main = Some(path.to_path_buf());
        self.preview.reset_for_document();
        crate::log!("session"; "main document {}", path.display());

        if self.current_file().is_none() {
            self.open_file(path).await?;
        }
        Ok(self.compile().await)
    }

    /// Load `path` into the editor, replacing the buffer.
    pub async fn open_file(&self, path: &Path) -> Result<()> {
        let content = tokio::fs::read_to_string(path)
            .await
            .map_err(|e| PreviewError::io(path, e));
        let content = self.report(content)?;
        self.workspace.lock().buffer = Some(SourceBuffer::new(path, content));
        crate::debug!("session"; "opened {}", path.display());
        Ok(())
    }

    /// Editor content change. Returns `false` when no file is open.
    pub fn apply_edit(&self, content: impl Into<String>, cursor: usize) -> bool {
        match self.workspace.lock().buffer.as_mut() {
            Some(buffer) => {
                buffer.apply_edit(content, cursor);
                true
            }
            None => false,
        }
    }

    /// Editor cursor move. Returns `false` when no file is open.
    pub fn move_cursor(&self, offset: usize) -> bool {
        match self.workspace.lock().buffer.as_mut() {
            Some(buffer) => {
                buffer.set_cursor(offset);
                true
            }
            None => false,
        }
    }

    /// Compile and render the current buffer.
    pub async fn compile(&self) -> Option<CycleOutcome> {
        let snapshot = self.snapshot()?;
        Some(self.preview.compile_and_render(&snapshot).await)
    }

    /// Render for the current cursor, without compiling.
    pub async fn render(&self) -> Option<CycleOutcome> {
        let snapshot = self.snapshot()?;
        Some(self.preview.render(&snapshot).await)
    }

    /// Write the buffer to disk.
    ///
    /// `explicit` saves report success and "nothing to save"; auto-saves
    /// stay quiet. A save started while another runs is skipped.
    pub async fn save(&self, explicit: bool) -> SaveOutcome {
        if self.saving.swap(true, Ordering::SeqCst) {
            crate::debug!("session"; "save already in progress");
            return SaveOutcome::InProgress;
        }
        let _guard = SaveGuard(&self.saving);

        let pending = self
            .workspace
            .lock()
            .buffer
            .as_ref()
            .filter(|b| b.is_dirty())
            .map(|b| (b.path().to_path_buf(), b.content().to_string()));
        let Some((path, content)) = pending else {
            if explicit {
                self.preview
                    .events()
                    .notify(Notification::info("nothing to save"));
            }
            return SaveOutcome::Clean;
        };

        if let Err(e) = tokio::fs::write(&path, &content).await {
            let err = PreviewError::io(&path, e);
            let kind = err.kind();
            let _ = self.report::<()>(Err(err));
            return SaveOutcome::Failed(kind);
        }

        {
            let mut workspace = self.workspace.lock();
            // Edits made while writing keep the buffer dirty
            if let Some(buffer) = workspace.buffer.as_mut()
                && buffer.path() == path
                && buffer.content() == content
            {
                buffer.mark_saved();
            }
        }
        crate::debug!("session"; "saved {}", path.display());
        if explicit {
            self.preview
                .events()
                .notify(Notification::success(format!("saved {}", file_name(&path))));
        }
        SaveOutcome::Saved
    }

    /// Save every `interval` until `stop` resolves.
    pub async fn run_auto_save(&self, interval: Duration, stop: impl Future<Output = ()>) {
        tokio::pin!(stop);
        loop {
            tokio::select! {
                _ = &mut stop => break,
                _ = tokio::time::sleep(interval) => {
                    self.save(false).await;
                }
            }
        }
    }

    /// Create a file through the backend and open it.
    pub async fn create_file(&self, path: &Path, text: &str) -> Result<()> {
        let backend = self.preview.backend();
        self.report(timed("create_file", self.preview.timeout(), backend.create_file(path, text)).await)?;
        self.preview
            .events()
            .notify(Notification::success(format!("created {}", file_name(path))));
        self.open_file(path).await
    }

    /// Export the main document, writing the open buffer first when it
    /// shows the main document.
    pub async fn export(&self, format: &ExportFormat, output: &Path) -> Result<PathBuf> {
        let Some(main) = self.main_document() else {
            return self.report(Err(PreviewError::transport("export", "no main document selected")));
        };
        let backend = self.preview.backend();
        let timeout = self.preview.timeout();

        if let Some(snapshot) = self.snapshot().filter(|s| s.path == main) {
            let persist = backend.persist_source(&snapshot.path, &snapshot.content);
            self.report(timed("persist_source", timeout, persist).await)?;
        }
        let written = self.report(timed("export", timeout, backend.export(format, output)).await)?;

        crate::log!("session"; "exported {} as {}", main.display(), format.name());
        self.preview
            .events()
            .notify(Notification::success(format!("exported {}", file_name(&written))));
        Ok(written)
    }

    /// Resolve a preview click and follow it into the editor.
    pub async fn handle_click(&self, page: usize, x: f64, y: f64) -> Option<ClickResolution> {
        let text = self
            .workspace
            .lock()
            .buffer
            .as_ref()
            .map(|b| b.content().to_string())
            .unwrap_or_default();

        let resolution = self.preview.click(&text, page, x, y).await?;
        if let ClickResolution::FileJump { file, position } = &resolution {
            self.follow_file_jump(file, *position).await.ok()?;
        }
        Some(resolution)
    }

    async fn follow_file_jump(&self, file: &Path, position: usize) -> Result<()> {
        if self.current_file().as_deref() != Some(file) {
            self.open_file(file).await?;
        }

        let offset = {
            let mut workspace = self.workspace.lock();
            let Some(buffer) = workspace.buffer.as_mut() else {
                return Ok(());
            };
            let offset = byte_to_char_offset(buffer.content(), position);
            buffer.set_cursor(offset);
            offset
        };
        self.preview.events().emit(PreviewEvent::RevealCursor {
            file: file.to_path_buf(),
            offset,
        });
        Ok(())
    }

    /// Diagnostics markers against the live buffer, when it shows the main
    /// document.
    pub fn markers(&self) -> Vec<InlineMarker> {
        let workspace = self.workspace.lock();
        match (&workspace.buffer, &workspace.main) {
            (Some(buffer), Some(main)) if buffer.path() == main => {
                self.preview.project_markers(buffer.content())
            }
            _ => Vec::new(),
        }
    }

    /// Turn an error into a notification, passing the result on.
    fn report<T>(&self, result: Result<T>) -> Result<T> {
        if let Err(e) = &result {
            self.preview
                .events()
                .notify(Notification::error(e.to_string()));
        }
        result
    }
}

fn file_name(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}
