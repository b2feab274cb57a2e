//! `folio export`: write the document as PDF, SVG or PNG.

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};

use super::common::{self, Document};
use crate::cli::{DocumentArgs, ExportKind};
use crate::config::FolioConfig;
use crate::core::{ExportFormat, PageRange};
use crate::preview::CycleOutcome;

pub async fn run_export(
    config: &FolioConfig,
    args: &DocumentArgs,
    kind: ExportKind,
    pages: Option<PageRange>,
    output: Option<&Path>,
) -> Result<()> {
    let format = export_format(kind, pages, config.backend.ppi)?;
    let document = Document::resolve(args)?;
    let (session, mut events) = common::build_session(config)?;

    let outcome = common::open_document(&session, &document, args.cursor.unwrap_or(0)).await?;
    if let CycleOutcome::Failed(kind) = outcome {
        common::drain_events(&mut events);
        bail!("nothing exported, the document does not compile ({kind:?})");
    }

    let target = default_output(&document, &format, output);
    let written = session.export(&format, &target).await;
    common::drain_events(&mut events);
    let written = written?;
    crate::debug!("export"; "wrote {}", written.display());
    Ok(())
}

fn export_format(kind: ExportKind, pages: Option<PageRange>, ppi: u32) -> Result<ExportFormat> {
    Ok(match kind {
        ExportKind::Pdf if pages.is_some() => bail!("--pages applies to svg and png exports"),
        ExportKind::Pdf => ExportFormat::Pdf,
        ExportKind::Svg => ExportFormat::Svg { pages },
        ExportKind::Png => ExportFormat::Png { pages, ppi },
    })
}

fn default_output(document: &Document, format: &ExportFormat, output: Option<&Path>) -> PathBuf {
    match output {
        Some(path) => path.to_path_buf(),
        None => document.main.with_extension(format.name()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_export_format_from_flags() {
        let range = PageRange::new(1, 2);
        assert_eq!(export_format(ExportKind::Pdf, None, 144).unwrap(), ExportFormat::Pdf);
        assert_eq!(
            export_format(ExportKind::Png, range, 300).unwrap(),
            ExportFormat::Png { pages: range, ppi: 300 }
        );
        assert!(export_format(ExportKind::Pdf, range, 144).is_err());
    }

    #[test]
    fn test_default_output_next_to_document() {
        let document = Document {
            root: PathBuf::from("/w"),
            main: PathBuf::from("/w/thesis.typ"),
        };
        let svg = ExportFormat::Svg { pages: None };
        assert_eq!(default_output(&document, &svg, None), PathBuf::from("/w/thesis.svg"));
        assert_eq!(
            default_output(&document, &svg, Some(Path::new("out.svg"))),
            PathBuf::from("out.svg")
        );
    }
}
