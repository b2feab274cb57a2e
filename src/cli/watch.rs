//! `folio watch`: recompile whenever the workspace changes on disk.
//!
//! The notify watcher runs on its own thread and forwards relevant events
//! into the runtime. Changes pass through a [`Gate`] so a burst of writes
//! costs one compile.

use std::path::{Path, PathBuf};
use std::rc::Rc;

use anyhow::{Context, Result};
use notify::event::ModifyKind;
use notify::{EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc;

use super::common::{self, Document};
use crate::backend::TypstCli;
use crate::cli::DocumentArgs;
use crate::config::FolioConfig;
use crate::core::wait_for_shutdown;
use crate::event::{NotifyLevel, PreviewEvent};
use crate::gate::Gate;
use crate::log;
use crate::logger::{status_error, status_success, status_warning};
use crate::preview::CycleOutcome;
use crate::session::EditingSession;

pub async fn run_watch(config: &FolioConfig, args: &DocumentArgs) -> Result<()> {
    let document = Document::resolve(args)?;
    let cursor = args.cursor.unwrap_or(0);
    let (session, mut events) = common::build_session(config)?;
    let session = Rc::new(session);

    let outcome = common::open_document(&session, &document, cursor).await?;
    while let Ok(event) = events.try_recv() {
        show_event(&session, &event);
    }
    show_outcome(&session, &outcome);

    let (changes_tx, mut changes_rx) = mpsc::channel::<PathBuf>(64);
    let _watcher = spawn_watcher(&document.root, changes_tx)?;
    log!("watch"; "watching {}", document.root.display());

    let event_session = Rc::clone(&session);
    tokio::task::spawn_local(async move {
        while let Some(event) = events.recv().await {
            show_event(&event_session, &event);
        }
    });

    let (gate, gate_loop) = Gate::<()>::new(config.preview.gate());
    let fire_session = Rc::clone(&session);
    tokio::task::spawn_local(gate_loop.run(move |()| {
        let session = Rc::clone(&fire_session);
        tokio::task::spawn_local(async move {
            if let Some(outcome) = session.compile().await {
                show_outcome(&session, &outcome);
            }
        });
    }));

    loop {
        tokio::select! {
            _ = wait_for_shutdown() => break,
            Some(path) = changes_rx.recv() => {
                if reload(&session, &document, &path, cursor).await {
                    gate.trigger(());
                }
            }
        }
    }

    log!("watch"; "stopped");
    Ok(())
}

/// Bring the buffer in line with disk. Returns `true` when a compile is due.
///
/// Compiling writes the buffer back to the main document, so an event whose
/// content matches the buffer is our own write.
async fn reload(
    session: &EditingSession<TypstCli>,
    document: &Document,
    path: &Path,
    cursor: usize,
) -> bool {
    if path != document.main {
        crate::debug!("watch"; "changed {}", document.relative(path).display());
        return true;
    }

    let Ok(content) = tokio::fs::read_to_string(path).await else {
        // Mid-rename; the follow-up event carries the content
        return false;
    };
    if session
        .snapshot()
        .is_some_and(|snapshot| *snapshot.content == *content)
    {
        return false;
    }

    crate::debug!("watch"; "reloading {}", document.relative(path).display());
    if session.open_file(path).await.is_err() {
        return false;
    }
    session.move_cursor(cursor);
    true
}

fn marker_detail(session: &EditingSession<TypstCli>) -> String {
    session
        .markers()
        .iter()
        .map(|m| format!("{}: {}", m.severity.label(), m.message))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Errors get the status box with the current markers; the rest is logged.
fn show_event(session: &EditingSession<TypstCli>, event: &PreviewEvent) {
    match error_message(event) {
        Some(message) => status_error(message, &marker_detail(session)),
        None => common::log_event(event),
    }
}

fn error_message(event: &PreviewEvent) -> Option<&str> {
    match event {
        PreviewEvent::Notify(n) if n.level == NotifyLevel::Error => Some(n.message.as_str()),
        _ => None,
    }
}

fn show_outcome(session: &EditingSession<TypstCli>, outcome: &CycleOutcome) {
    // Failures arrive as error notifications
    let CycleOutcome::Rendered(report) = outcome else {
        return;
    };
    let summary = format!(
        "{} page(s), {} changed ({} render)",
        report.total,
        report.changed.len(),
        report.plan.label()
    );
    let detail = marker_detail(session);
    if detail.is_empty() {
        status_success(&summary);
    } else {
        status_warning(&format!("{summary}\n{detail}"));
    }
}

/// Start a recursive watcher on `root`, forwarding changed paths.
///
/// The returned watcher must be kept alive.
fn spawn_watcher(root: &Path, changes: mpsc::Sender<PathBuf>) -> Result<RecommendedWatcher> {
    let (notify_tx, notify_rx) = std::sync::mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res| {
        let _ = notify_tx.send(res);
    })
    .context("failed to create file watcher")?;
    watcher
        .watch(root, RecursiveMode::Recursive)
        .with_context(|| format!("failed to watch {}", root.display()))?;

    let root = root.to_path_buf();
    std::thread::spawn(move || {
        while let Ok(result) = notify_rx.recv() {
            let event: notify::Event = match result {
                Ok(event) => event,
                Err(e) => {
                    log!("watch"; "notify error: {}", e);
                    continue;
                }
            };
            if !is_content_change(&event.kind) {
                continue;
            }
            for path in event.paths {
                if is_relevant(&root, &path) && changes.blocking_send(path).is_err() {
                    return; // Receiver dropped
                }
            }
        }
    });

    Ok(watcher)
}

fn is_content_change(kind: &EventKind) -> bool {
    match kind {
        EventKind::Create(_) | EventKind::Remove(_) => true,
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(_) => true,
        _ => false,
    }
}

/// Skip hidden entries (`.git`, editor swap files) below the root.
fn is_relevant(root: &Path, path: &Path) -> bool {
    let Ok(relative) = path.strip_prefix(root) else {
        return false;
    };
    !relative.components().any(|c| {
        c.as_os_str()
            .to_str()
            .is_some_and(|name| name.starts_with('.') || name.ends_with('~'))
    })
}
