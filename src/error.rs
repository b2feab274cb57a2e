//! Error taxonomy of the preview engine.
//!
//! Every failure the orchestrator and the editing session can hit is one
//! [`PreviewError`]. None of them are fatal: they end the current cycle,
//! become a single notification and leave the last good state on screen.

use std::io;
use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::core::{Diagnostic, tally};

pub type Result<T, E = PreviewError> = std::result::Result<T, E>;

/// Errors raised by backend calls and local IO.
#[derive(Debug, Error)]
pub enum PreviewError {
    /// The backend call could not complete.
    #[error("backend `{op}` failed: {message}")]
    Transport { op: &'static str, message: String },

    /// The backend call did not answer in time.
    #[error("backend `{op}` timed out after {}ms", after.as_millis())]
    Timeout { op: &'static str, after: Duration },

    /// The source is invalid; carries what the compiler reported.
    #[error("compilation failed: {}", compile_summary(diagnostics))]
    Compile { diagnostics: Vec<Diagnostic> },

    /// Cursor or click has no visual counterpart.
    #[error("no preview position for this location")]
    MappingNotFound,

    #[error("IO error on `{}`", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    /// A page payload could not be decoded into an image.
    #[error("page {index} is not a valid image: {message}")]
    Decode { index: usize, message: String },
}

/// Coarse classification of a [`PreviewError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    Transport,
    Timeout,
    Compile,
    MappingNotFound,
    Io,
    Decode,
}

impl PreviewError {
    pub fn transport(op: &'static str, message: impl Into<String>) -> Self {
        Self::Transport {
            op,
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, source: io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::Transport { .. } => ErrorKind::Transport,
            Self::Timeout { .. } => ErrorKind::Timeout,
            Self::Compile { .. } => ErrorKind::Compile,
            Self::MappingNotFound => ErrorKind::MappingNotFound,
            Self::Io { .. } => ErrorKind::Io,
            Self::Decode { .. } => ErrorKind::Decode,
        }
    }

    /// Timeouts count as transport failures.
    pub fn is_transport(&self) -> bool {
        matches!(self.kind(), ErrorKind::Transport | ErrorKind::Timeout)
    }
}

fn compile_summary(diagnostics: &[Diagnostic]) -> String {
    let (errors, warnings) = tally(diagnostics);
    match (errors, warnings) {
        (0, 0) => "no diagnostics reported".to_string(),
        (e, 0) => format!("{e} error(s)"),
        (e, w) => format!("{e} error(s), {w} warning(s)"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Location, Severity};

    #[test]
    fn test_kind_and_transport() {
        let timeout = PreviewError::Timeout {
            op: "compile",
            after: Duration::from_millis(250),
        };
        assert_eq!(timeout.kind(), ErrorKind::Timeout);
        assert!(timeout.is_transport());
        assert_eq!(
            timeout.to_string(),
            "backend `compile` timed out after 250ms"
        );

        assert!(!PreviewError::MappingNotFound.is_transport());
        assert!(PreviewError::transport("page_count", "broken pipe").is_transport());
    }

    #[test]
    fn test_compile_display() {
        let err = PreviewError::Compile {
            diagnostics: vec![
                Diagnostic::new(Severity::Error, Location::point(1, 1), "unclosed"),
                Diagnostic::new(Severity::Warning, Location::point(2, 1), "unused"),
            ],
        };
        assert_eq!(
            err.to_string(),
            "compilation failed: 1 error(s), 1 warning(s)"
        );
    }

    #[test]
    fn test_io_display() {
        let err = PreviewError::io(
            "/w/main.typ",
            io::Error::new(io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), ErrorKind::Io);
        assert!(err.to_string().contains("/w/main.typ"));
    }
}
