//! Command-line interface definitions.

use clap::{Args, ColorChoice, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::core::PageRange;

/// Default config file name, searched upward from the working directory.
pub const DEFAULT_CONFIG_NAME: &str = "folio.toml";

/// Folio live preview for Typst documents
#[derive(Parser, Debug, Clone)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
pub struct Cli {
    /// Control colored output (auto, always, never)
    #[arg(long, global = true, default_value = "auto")]
    pub color: ColorChoice,

    /// Print debug output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Config file path (default: folio.toml)
    #[arg(short = 'C', long, global = true, default_value = DEFAULT_CONFIG_NAME, value_hint = clap::ValueHint::FilePath)]
    pub config: PathBuf,

    /// subcommands
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Compile and render a document once
    #[command(visible_alias = "p")]
    Preview {
        #[command(flatten)]
        args: DocumentArgs,

        /// Output format of the report
        #[arg(short, long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },

    /// Recompile whenever the document changes on disk
    #[command(visible_alias = "w")]
    Watch {
        #[command(flatten)]
        args: DocumentArgs,

        /// Quiet period before a compile fires, in milliseconds
        #[arg(long)]
        debounce: Option<u64>,
    },

    /// Export the document to PDF, SVG or PNG
    #[command(visible_alias = "e")]
    Export {
        #[command(flatten)]
        args: DocumentArgs,

        /// Output file format
        #[arg(short, long, value_enum, default_value_t = ExportKind::Pdf)]
        format: ExportKind,

        /// Pages to export, `3` or `2-5` (svg and png only)
        #[arg(long)]
        pages: Option<PageRange>,

        /// Output path (default: the document with the format's extension)
        #[arg(short, long, value_hint = clap::ValueHint::FilePath)]
        output: Option<PathBuf>,
    },
}

/// Report format of `folio preview`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    /// Tagged log lines
    Text,
    /// One pretty-printed JSON object
    Json,
}

/// File format of `folio export`
#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportKind {
    Pdf,
    Svg,
    Png,
}

/// Document selection and backend overrides shared by all subcommands
#[derive(Args, Debug, Clone)]
pub struct DocumentArgs {
    /// Main Typst document
    #[arg(value_hint = clap::ValueHint::FilePath)]
    pub file: PathBuf,

    /// Workspace root (default: the document's directory)
    #[arg(short, long, value_hint = clap::ValueHint::DirPath)]
    pub root: Option<PathBuf>,

    /// Cursor offset in characters, picks the page to refresh
    #[arg(long)]
    pub cursor: Option<usize>,

    /// Typst compiler binary
    #[arg(long)]
    pub typst: Option<String>,

    /// Raster resolution in pixels per inch
    #[arg(long)]
    pub ppi: Option<u32>,

    /// Bound of every backend call, in milliseconds
    #[arg(long)]
    pub timeout: Option<u64>,
}

impl Commands {
    pub fn document(&self) -> &DocumentArgs {
        match self {
            Self::Preview { args, .. } | Self::Watch { args, .. } | Self::Export { args, .. } => args,
        }
    }
}
