//! Export targets of the main document.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Inclusive 1-based page range, as `typst compile --pages` takes it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRange {
    pub start: usize,
    pub end: usize,
}

impl PageRange {
    /// `None` unless `1 <= start <= end`.
    pub fn new(start: usize, end: usize) -> Option<Self> {
        (start >= 1 && start <= end).then_some(Self { start, end })
    }

    pub fn is_single(self) -> bool {
        self.start == self.end
    }
}

impl fmt::Display for PageRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.start)
        } else {
            write!(f, "{}-{}", self.start, self.end)
        }
    }
}

impl FromStr for PageRange {
    type Err = String;

    /// `3` or `2-5`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let parse = |n: &str| {
            n.trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid page number `{}`", n.trim()))
        };
        let (start, end) = match s.split_once('-') {
            Some((start, end)) => (parse(start)?, parse(end)?),
            None => {
                let page = parse(s)?;
                (page, page)
            }
        };
        Self::new(start, end).ok_or_else(|| format!("invalid page range `{s}`"))
    }
}

/// Output of an export. PDF is one file; SVG and PNG are one file per page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "format", rename_all = "lowercase")]
pub enum ExportFormat {
    Pdf,
    Svg { pages: Option<PageRange> },
    Png { pages: Option<PageRange>, ppi: u32 },
}

/// Placeholders `typst compile` expands in per-page output names.
const PAGE_PLACEHOLDERS: [&str; 2] = ["{p}", "{0p}"];

impl ExportFormat {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Pdf => "pdf",
            Self::Svg { .. } => "svg",
            Self::Png { .. } => "png",
        }
    }

    pub fn pages(&self) -> Option<PageRange> {
        match *self {
            Self::Pdf => None,
            Self::Svg { pages } | Self::Png { pages, .. } => pages,
        }
    }

    /// Arguments after `typst compile` selecting this format.
    pub fn compile_args(&self) -> Vec<String> {
        let mut args = vec!["--format".to_string(), self.name().to_string()];
        if let Self::Png { ppi, .. } = self {
            args.extend(["--ppi".to_string(), ppi.to_string()]);
        }
        if let Some(pages) = self.pages() {
            args.extend(["--pages".to_string(), pages.to_string()]);
        }
        args
    }

    /// Output path for `requested`.
    ///
    /// The format's extension is added when missing. Per-page formats that
    /// may produce several files get a `-{p}` suffix unless the name
    /// already carries a page placeholder.
    pub fn output_path(&self, requested: &Path) -> PathBuf {
        let mut path = requested.to_path_buf();
        if path.extension().is_none() {
            path.set_extension(self.name());
        }

        let single = match self {
            Self::Pdf => true,
            _ => self.pages().is_some_and(PageRange::is_single),
        };
        let name = path.to_string_lossy();
        if single || PAGE_PLACEHOLDERS.iter().any(|p| name.contains(p)) {
            return path;
        }

        let stem = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let ext = self.name();
        path.with_file_name(format!("{stem}-{{p}}.{ext}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_range_parse() {
        assert_eq!("3".parse::<PageRange>().unwrap(), PageRange::new(3, 3).unwrap());
        assert_eq!(" 2 - 5".parse::<PageRange>().unwrap().to_string(), "2-5");
        assert!("0".parse::<PageRange>().is_err());
        assert!("5-2".parse::<PageRange>().is_err());
        assert!("two".parse::<PageRange>().is_err());
    }

    #[test]
    fn test_compile_args() {
        assert_eq!(ExportFormat::Pdf.compile_args(), ["--format", "pdf"]);
        let png = ExportFormat::Png {
            pages: PageRange::new(2, 4),
            ppi: 300,
        };
        assert_eq!(
            png.compile_args(),
            ["--format", "png", "--ppi", "300", "--pages", "2-4"]
        );
    }

    #[test]
    fn test_output_path() {
        let pdf = ExportFormat::Pdf;
        assert_eq!(pdf.output_path(Path::new("out/thesis")), PathBuf::from("out/thesis.pdf"));

        let svg = ExportFormat::Svg { pages: None };
        assert_eq!(svg.output_path(Path::new("out/thesis.svg")), PathBuf::from("out/thesis-{p}.svg"));
        assert_eq!(svg.output_path(Path::new("out/p{0p}.svg")), PathBuf::from("out/p{0p}.svg"));

        let one = ExportFormat::Png {
            pages: PageRange::new(2, 2),
            ppi: 144,
        };
        assert_eq!(one.output_path(Path::new("cover")), PathBuf::from("cover.png"));
    }

    #[test]
    fn test_serde_tagged_by_format() {
        let json = serde_json::to_value(ExportFormat::Svg {
            pages: PageRange::new(1, 2),
        })
        .unwrap();
        assert_eq!(json["format"], "svg");
        assert_eq!(json["pages"]["end"], 2);
    }
}
