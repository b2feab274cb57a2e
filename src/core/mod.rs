//! Core types - pure data shared by the engine, the backends and the CLI.

mod category;
mod diagnostic;
mod export;
mod page;
mod position;
mod source;
mod state;

pub use category::DocumentKind;
pub use diagnostic::{Diagnostic, Location, Severity, tally};
pub use export::{ExportFormat, PageRange};
pub use page::{Page, PageImage};
pub use position::{ClickResolution, PreviewPosition};
pub use source::{SourceBuffer, SourceSnapshot, byte_to_char_offset};
pub use state::{setup_shutdown_handler, wait_for_shutdown};

#[cfg(test)]
pub(crate) use page::encode_test_png;
