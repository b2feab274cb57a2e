//! Document kind detection.

use std::path::Path;

/// Kind of an open document, decides whether it can drive the preview.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DocumentKind {
    /// Typst source (.typ) - can be the main document
    Typst,
    /// Plain text the editor can show (bibliographies, data files)
    Text,
    /// Anything else (images, fonts)
    Binary,
}

impl DocumentKind {
    /// Detect document kind from file extension.
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "typ" => Self::Typst,
            "yaml" | "yml" | "bib" | "toml" | "json" | "txt" | "csv" | "md" => Self::Text,
            _ => Self::Binary,
        }
    }

    /// Detect document kind from file path. Paths without extension are text.
    pub fn from_path(path: &Path) -> Self {
        path.extension()
            .and_then(|e| e.to_str())
            .map_or(Self::Text, Self::from_extension)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Typst => "typst",
            Self::Text => "text",
            Self::Binary => "binary",
        }
    }

    /// Only Typst sources are compiled.
    #[inline]
    pub fn is_compilable(self) -> bool {
        self == Self::Typst
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_from_extension() {
        assert_eq!(DocumentKind::from_extension("typ"), DocumentKind::Typst);
        assert_eq!(DocumentKind::from_extension("TYP"), DocumentKind::Typst);
        assert_eq!(DocumentKind::from_extension("bib"), DocumentKind::Text);
        assert_eq!(DocumentKind::from_extension("png"), DocumentKind::Binary);
    }

    #[test]
    fn test_from_path() {
        assert_eq!(
            DocumentKind::from_path(&PathBuf::from("/w/chapters/intro.typ")),
            DocumentKind::Typst
        );
        assert_eq!(
            DocumentKind::from_path(&PathBuf::from("refs.yml")),
            DocumentKind::Text
        );
        assert_eq!(
            DocumentKind::from_path(&PathBuf::from("LICENSE")),
            DocumentKind::Text
        );
        assert!(!DocumentKind::from_path(&PathBuf::from("logo.svg")).is_compilable());
    }
}
