//! Messages pushed from the engine to the presentation layer.

use std::path::PathBuf;

use tokio::sync::mpsc;

use crate::core::PreviewPosition;
use crate::diagnostics::InlineMarker;
use crate::preview::Phase;

/// Severity of a user-facing notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotifyLevel {
    Info,
    Success,
    Error,
}

/// A single non-blocking, human-readable message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub level: NotifyLevel,
    pub message: String,
}

impl Notification {
    pub fn info(message: impl Into<String>) -> Self {
        Self {
            level: NotifyLevel::Info,
            message: message.into(),
        }
    }

    pub fn success(message: impl Into<String>) -> Self {
        Self {
            level: NotifyLevel::Success,
            message: message.into(),
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            level: NotifyLevel::Error,
            message: message.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum PreviewEvent {
    Phase(Phase),
    /// The diagnostics model was replaced.
    Diagnostics(Vec<InlineMarker>),
    /// Page slots at `indices` now hold new images. `total` is the list length.
    PagesChanged { indices: Vec<usize>, total: usize },
    PositionChanged(PreviewPosition),
    /// Move the editor cursor to `offset` (chars) in `file` and scroll to it.
    RevealCursor { file: PathBuf, offset: usize },
    OpenUrl(String),
    Notify(Notification),
}

/// Sending half of the event channel.
///
/// A dropped receiver is not an error; events are then discarded.
#[derive(Debug, Clone)]
pub struct EventSink {
    tx: mpsc::UnboundedSender<PreviewEvent>,
}

impl EventSink {
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<PreviewEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }

    pub fn emit(&self, event: PreviewEvent) {
        let _ = self.tx.send(event);
    }

    pub fn notify(&self, notification: Notification) {
        self.emit(PreviewEvent::Notify(notification));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_closed_receiver_is_ignored() {
        let (sink, rx) = EventSink::channel();
        drop(rx);
        sink.notify(Notification::info("nobody listens"));
    }

    #[test]
    fn test_events_arrive_in_order() {
        let (sink, mut rx) = EventSink::channel();
        sink.emit(PreviewEvent::OpenUrl("https://typst.app".into()));
        sink.notify(Notification::error("boom"));

        assert_eq!(
            rx.try_recv().unwrap(),
            PreviewEvent::OpenUrl("https://typst.app".into())
        );
        match rx.try_recv().unwrap() {
            PreviewEvent::Notify(n) => assert_eq!(n.level, NotifyLevel::Error),
            other => panic!("unexpected event {other:?}"),
        }
    }
}
