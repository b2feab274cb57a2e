//! `folio` command-line host.

use anyhow::{Context, Result};
use clap::{ColorChoice, Parser};
use folio::cli::{self, Cli, Commands};
use folio::config::FolioConfig;
use folio::{core, logger};

fn main() -> Result<()> {
    // Setup global Ctrl+C handler (before any blocking operations)
    core::setup_shutdown_handler()?;

    let cli = Cli::parse();

    // Set global color override based on CLI option
    match cli.color {
        ColorChoice::Always => owo_colors::set_override(true),
        ColorChoice::Never => owo_colors::set_override(false),
        ColorChoice::Auto => {} // owo-colors auto-detects TTY
    }
    logger::set_verbose(cli.verbose);

    let config = FolioConfig::load(&cli)?;

    // The engine is single-threaded; sessions and tasks share state through Rc
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start runtime")?;
    let local = tokio::task::LocalSet::new();

    local.block_on(&runtime, async {
        match &cli.command {
            Commands::Preview { args, format } => cli::preview::run_preview(&config, args, *format).await,
            Commands::Watch { args, .. } => cli::watch::run_watch(&config, args).await,
            Commands::Export {
                args,
                format,
                pages,
                output,
            } => cli::export::run_export(&config, args, *format, *pages, output.as_deref()).await,
        }
    })
}
