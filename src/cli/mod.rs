//! Command-line interface module.

mod args;
mod common;
pub mod export;
pub mod preview;
pub mod watch;

pub use args::{Cli, Commands, DEFAULT_CONFIG_NAME, DocumentArgs, ExportKind, OutputFormat};
