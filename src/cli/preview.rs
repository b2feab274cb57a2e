//! `folio preview`: one compile and render cycle.

use std::path::PathBuf;

use anyhow::{Result, bail};
use serde::Serialize;

use super::common::{self, Document};
use crate::cli::{DocumentArgs, OutputFormat};
use crate::config::FolioConfig;
use crate::core::Diagnostic;
use crate::diagnostics::InlineMarker;
use crate::log;
use crate::preview::{CycleOutcome, Phase, PreviewSnapshot};

#[derive(Debug, Serialize)]
struct PreviewReport<'a> {
    document: PathBuf,
    phase: Phase,
    plan: Option<&'static str>,
    pages: Vec<PageSummary>,
    diagnostics: &'a [Diagnostic],
    markers: Vec<InlineMarker>,
    error: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct PageSummary {
    index: usize,
    width: u32,
    height: u32,
    fingerprint: String,
}

pub async fn run_preview(config: &FolioConfig, args: &DocumentArgs, format: OutputFormat) -> Result<()> {
    let document = Document::resolve(args)?;
    let (session, mut events) = common::build_session(config)?;
    let outcome = common::open_document(&session, &document, args.cursor.unwrap_or(0)).await?;

    let snapshot = session.preview().snapshot();
    let report = PreviewReport {
        document: document.relative(&document.main).to_path_buf(),
        phase: snapshot.phase,
        plan: match &outcome {
            CycleOutcome::Rendered(report) => Some(report.plan.label()),
            _ => None,
        },
        pages: summarize(&snapshot),
        diagnostics: &snapshot.diagnostics,
        markers: session.markers(),
        error: snapshot.last_error.as_deref(),
    };

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Text => {
            common::drain_events(&mut events);
            print_report(&report);
        }
    }

    match outcome {
        CycleOutcome::Failed(kind) => bail!("preview failed ({kind:?})"),
        _ => Ok(()),
    }
}

fn summarize(snapshot: &PreviewSnapshot) -> Vec<PageSummary> {
    snapshot
        .pages
        .iter()
        .enumerate()
        .map(|(index, page)| PageSummary {
            index,
            width: page.width(),
            height: page.height(),
            fingerprint: page.key.hash.to_string(),
        })
        .collect()
}

fn print_report(report: &PreviewReport<'_>) {
    let name = report.document.display();
    for (diagnostic, marker) in report.diagnostics.iter().zip(&report.markers) {
        let loc = diagnostic.location;
        log!(marker.severity.label(); "{}:{}:{} (chars {}..{}) {}",
            name, loc.line, loc.column, marker.start, marker.end, marker.message);
    }

    if let Some(plan) = report.plan {
        log!("render"; "{} page(s), {} render", report.pages.len(), plan);
    }
    crate::debug_do! {
        for page in &report.pages {
            crate::debug!("render"; "page {} {}x{} {}", page.index, page.width, page.height, page.fingerprint);
        }
    }
}
