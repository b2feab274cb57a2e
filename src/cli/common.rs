//! Session setup shared by the CLI commands.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use owo_colors::OwoColorize;
use tokio::sync::mpsc::UnboundedReceiver;

use crate::backend::TypstCli;
use crate::cli::DocumentArgs;
use crate::config::FolioConfig;
use crate::core::DocumentKind;
use crate::event::{EventSink, NotifyLevel, PreviewEvent};
use crate::log;
use crate::preview::{CycleOutcome, Orchestrator};
use crate::session::EditingSession;

/// Workspace root and main document, both absolute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Document {
    pub root: PathBuf,
    pub main: PathBuf,
}

impl Document {
    pub fn resolve(args: &DocumentArgs) -> Result<Self> {
        let main = canonical(&args.file)?;
        if !DocumentKind::from_path(&main).is_compilable() {
            bail!("'{}' is not a Typst document", args.file.display());
        }
        let root = match &args.root {
            Some(root) => canonical(root)?,
            None => main
                .parent()
                .map(Path::to_path_buf)
                .context("document has no parent directory")?,
        };
        if !main.starts_with(&root) {
            bail!(
                "'{}' is outside the workspace root '{}'",
                main.display(),
                root.display()
            );
        }
        Ok(Self { root, main })
    }

    /// Path relative to the root, for display.
    pub fn relative<'a>(&self, path: &'a Path) -> &'a Path {
        path.strip_prefix(&self.root).unwrap_or(path)
    }
}

fn canonical(path: &Path) -> Result<PathBuf> {
    path.canonicalize()
        .with_context(|| format!("cannot access '{}'", path.display()))
}

/// A session over the typst CLI, plus the receiving end of its events.
pub fn build_session(
    config: &FolioConfig,
) -> Result<(EditingSession<TypstCli>, UnboundedReceiver<PreviewEvent>)> {
    let backend = TypstCli::locate(&config.backend.typst, config.backend.ppi)?;
    let (events, rx) = EventSink::channel();
    let preview = Orchestrator::new(backend, events, config.preview_options());
    Ok((EditingSession::new(preview), rx))
}

/// Open the workspace and run the first cycle with the cursor at `cursor`.
pub async fn open_document(
    session: &EditingSession<TypstCli>,
    document: &Document,
    cursor: usize,
) -> Result<CycleOutcome> {
    session.open_workspace(&document.root).await?;
    session.open_file(&document.main).await?;
    session.move_cursor(cursor);
    let outcome = session.set_main_document(&document.main).await?;
    outcome.context("main document was not compiled")
}

/// Print user-facing events. Everything else shows up in verbose output.
pub fn log_event(event: &PreviewEvent) {
    match event {
        PreviewEvent::Notify(notification) => match notification.level {
            NotifyLevel::Error => log!("error"; "{}", notification.message),
            NotifyLevel::Success => log!("session"; "{}", notification.message.green()),
            NotifyLevel::Info => log!("session"; "{}", notification.message),
        },
        PreviewEvent::Phase(phase) => crate::debug!("preview"; "phase {}", phase.label()),
        PreviewEvent::PagesChanged { indices, total } => {
            crate::debug!("render"; "pages {:?} of {} changed", indices, total)
        }
        PreviewEvent::OpenUrl(url) => log!("preview"; "link {}", url),
        PreviewEvent::Diagnostics(markers) => {
            crate::debug!("compile"; "{} marker(s)", markers.len())
        }
        PreviewEvent::PositionChanged(_) | PreviewEvent::RevealCursor { .. } => {}
    }
}

/// Drain everything emitted so far.
pub fn drain_events(rx: &mut UnboundedReceiver<PreviewEvent>) {
    while let Ok(event) = rx.try_recv() {
        log_event(&event);
    }
}
