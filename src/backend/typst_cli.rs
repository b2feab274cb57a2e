//! Backend driving the `typst` command-line compiler.
//!
//! Each compile rasterizes every page to PNG in its own generation
//! directory. Only the latest compile that succeeded is published; page
//! requests are served from the published files, so a failed or overtaken
//! compile never replaces them. The CLI exposes no layout introspection,
//! so cursor mapping always answers `None` and clicks resolve to
//! [`ClickResolution::NoJump`].

use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use anyhow::{Context, Result as AnyResult};
use parking_lot::Mutex;
use tokio::process::Command;

use super::Backend;
use super::short_diag;
use crate::core::{ClickResolution, Diagnostic, ExportFormat, Page, PreviewPosition};
use crate::error::{PreviewError, Result};

const PAGE_PREFIX: &str = "page-";
const PAGE_PATTERN: &str = "page-{0p}.png";

#[derive(Debug, Default)]
struct Project {
    root: Option<PathBuf>,
    main: Option<PathBuf>,
    /// Page files of the published compile, in index order
    pages: Vec<PathBuf>,
    /// Generation directory holding `pages`
    published: Option<PathBuf>,
    /// Previously published directory, removed on the next publish so
    /// in-flight page reads still find their files
    retired: Option<PathBuf>,
}

impl Project {
    /// Drop the published pages. Returns directories to remove.
    fn unpublish(&mut self) -> Vec<PathBuf> {
        self.pages.clear();
        self.published.take().into_iter().chain(self.retired.take()).collect()
    }
}

pub struct TypstCli {
    binary: PathBuf,
    ppi: u32,
    out_dir: PathBuf,
    project: Mutex<Project>,
    /// Latest issued compile generation
    generation: AtomicU64,
}

impl TypstCli {
    /// Locate `binary` (tilde expanded, then looked up in `PATH`).
    pub fn locate(binary: &str, ppi: u32) -> AnyResult<Self> {
        let expanded = shellexpand::tilde(binary);
        let path = which::which(expanded.as_ref())
            .with_context(|| format!("typst compiler `{binary}` not found"))?;
        crate::debug!("backend"; "using {}", path.display());
        Ok(Self::with_binary(path, ppi))
    }

    pub fn with_binary(binary: PathBuf, ppi: u32) -> Self {
        let out_dir = std::env::temp_dir().join(format!("folio-{}", std::process::id()));
        Self {
            binary,
            ppi,
            out_dir,
            project: Mutex::new(Project::default()),
            generation: AtomicU64::new(0),
        }
    }

    /// Write rasterized pages to `dir` instead of a temp directory.
    pub fn with_out_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.out_dir = dir.into();
        self
    }

    /// Compile root and main document, as selected so far.
    fn targets(&self) -> Result<(PathBuf, PathBuf)> {
        let project = self.project.lock();
        let main = project
            .main
            .clone()
            .ok_or_else(|| PreviewError::transport("compile", "no main document selected"))?;
        let root = project
            .root
            .clone()
            .or_else(|| main.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        Ok((root, main))
    }

    fn page_path(&self, op: &'static str, index: usize) -> Result<PathBuf> {
        let project = self.project.lock();
        project.pages.get(index).cloned().ok_or_else(|| {
            PreviewError::transport(
                op,
                format!("page {index} out of range ({} pages)", project.pages.len()),
            )
        })
    }

    /// Fresh output directory for a new compile generation.
    async fn scratch_dir(&self) -> Result<(u64, PathBuf)> {
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        let dir = self.out_dir.join(format!("gen-{generation}"));
        tokio::fs::create_dir_all(&dir)
            .await
            .map_err(|e| PreviewError::io(&dir, e))?;
        Ok((generation, dir))
    }

    /// Serve `pages` from `dir` if `generation` is still the latest.
    ///
    /// Returns the directories that are no longer needed: the scratch
    /// directory itself when it was overtaken, otherwise the one retired
    /// two publishes ago.
    fn publish(&self, generation: u64, dir: PathBuf, pages: Vec<PathBuf>) -> Option<PathBuf> {
        let mut project = self.project.lock();
        if self.generation.load(Ordering::SeqCst) != generation {
            crate::debug!("backend"; "compile #{} overtaken, discarding", generation);
            return Some(dir);
        }
        let stale = project.retired.take();
        project.retired = project.published.replace(dir);
        project.pages = pages;
        stale
    }

    /// Invalidate in-flight compiles and drop the published pages.
    async fn forget_pages(&self) {
        let stale = {
            let mut project = self.project.lock();
            self.generation.fetch_add(1, Ordering::SeqCst);
            project.unpublish()
        };
        for dir in stale {
            discard(&dir).await;
        }
    }

    /// Run `typst compile` with `format_args`, writing to `output`.
    async fn run(
        &self,
        op: &'static str,
        root: &Path,
        main: &Path,
        format_args: &[String],
        output: &Path,
    ) -> Result<std::process::Output> {
        Command::new(&self.binary)
            .arg("compile")
            .arg("--root")
            .arg(root)
            .args(["--diagnostic-format", "short"])
            .args(format_args)
            .arg(main)
            .arg(output)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| PreviewError::transport(op, e.to_string()))
    }
}

/// Map a failed run to `Compile` when the compiler reported something,
/// `Transport` otherwise.
fn failure(op: &'static str, root: &Path, main: &Path, output: &std::process::Output) -> PreviewError {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let relative = main.strip_prefix(root).unwrap_or(main);
    let parsed = short_diag::parse(&stderr, relative);
    if parsed.seen == 0 {
        let reason = stderr
            .lines()
            .find(|l| !l.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("typst exited with {}", output.status));
        return PreviewError::transport(op, reason);
    }
    PreviewError::Compile {
        diagnostics: parsed.diagnostics,
    }
}

async fn discard(dir: &Path) {
    if let Err(e) = tokio::fs::remove_dir_all(dir).await {
        crate::debug!("backend"; "failed to remove {}: {}", dir.display(), e);
    }
}

impl Drop for TypstCli {
    fn drop(&mut self) {
        let _ = std::fs::remove_dir_all(&self.out_dir);
    }
}

impl Backend for TypstCli {
    async fn persist_source(&self, path: &Path, text: &str) -> Result<()> {
        tokio::fs::write(path, text)
            .await
            .map_err(|e| PreviewError::io(path, e))
    }

    async fn compile(&self) -> Result<Vec<Diagnostic>> {
        let (root, main) = self.targets()?;
        let (generation, scratch) = self.scratch_dir().await?;
        let format_args = ["--format".to_string(), "png".into(), "--ppi".into(), self.ppi.to_string()];

        let output = self
            .run("compile", &root, &main, &format_args, &scratch.join(PAGE_PATTERN))
            .await;
        let output = match output {
            Ok(output) if output.status.success() => output,
            Ok(output) => {
                discard(&scratch).await;
                return Err(failure("compile", &root, &main, &output));
            }
            Err(e) => {
                discard(&scratch).await;
                return Err(e);
            }
        };

        let stderr = String::from_utf8_lossy(&output.stderr);
        let relative = main.strip_prefix(&root).unwrap_or(main.as_path());
        let diagnostics = short_diag::parse(&stderr, relative).diagnostics;

        let pages = match collect_pages(&scratch).await {
            Ok(pages) => pages,
            Err(e) => {
                discard(&scratch).await;
                return Err(PreviewError::io(&scratch, e));
            }
        };
        crate::debug!("backend"; "compile #{} of {}: {} page(s)", generation, main.display(), pages.len());
        if let Some(stale) = self.publish(generation, scratch, pages) {
            discard(&stale).await;
        }

        Ok(diagnostics)
    }

    async fn page_count(&self) -> Result<usize> {
        Ok(self.project.lock().pages.len())
    }

    async fn render_all_pages(&self) -> Result<Vec<Page>> {
        let paths = self.project.lock().pages.clone();
        let mut pages = Vec::with_capacity(paths.len());
        for (index, path) in paths.iter().enumerate() {
            pages.push(read_page(index, path).await?);
        }
        Ok(pages)
    }

    async fn render_page(&self, index: usize) -> Result<Page> {
        let path = self.page_path("render_page", index)?;
        read_page(index, &path).await
    }

    async fn resolve_cursor_position(
        &self,
        _offset: usize,
        _text: &str,
        _path: &Path,
    ) -> Result<Option<PreviewPosition>> {
        Ok(None)
    }

    async fn resolve_click(
        &self,
        _text: &str,
        _page: usize,
        _x: f64,
        _y: f64,
    ) -> Result<ClickResolution> {
        Ok(ClickResolution::NoJump)
    }

    async fn open_workspace(&self, path: &Path) -> Result<()> {
        let meta = tokio::fs::metadata(path)
            .await
            .map_err(|e| PreviewError::io(path, e))?;
        if !meta.is_dir() {
            return Err(PreviewError::transport(
                "open_workspace",
                format!("`{}` is not a directory", path.display()),
            ));
        }

        self.forget_pages().await;
        let mut project = self.project.lock();
        project.root = Some(path.to_path_buf());
        project.main = None;
        Ok(())
    }

    async fn set_main_document(&self, path: &Path) -> Result<()> {
        tokio::fs::metadata(path)
            .await
            .map_err(|e| PreviewError::io(path, e))?;

        self.forget_pages().await;
        self.project.lock().main = Some(path.to_path_buf());
        Ok(())
    }

    async fn create_file(&self, path: &Path, text: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PreviewError::io(parent, e))?;
        }
        tokio::fs::write(path, text)
            .await
            .map_err(|e| PreviewError::io(path, e))
    }

    async fn export(&self, format: &ExportFormat, output: &Path) -> Result<PathBuf> {
        let (root, main) = self.targets()?;
        let target = format.output_path(output);
        if let Some(parent) = target.parent()
            && !parent.as_os_str().is_empty()
        {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| PreviewError::io(parent, e))?;
        }

        let run = self
            .run("export", &root, &main, &format.compile_args(), &target)
            .await?;
        if !run.status.success() {
            return Err(failure("export", &root, &main, &run));
        }
        crate::debug!("backend"; "exported {} to {}", main.display(), target.display());
        Ok(target)
    }
}

/// Page files in `dir`, sorted by their page number.
async fn collect_pages(dir: &Path) -> std::io::Result<Vec<PathBuf>> {
    let mut numbered = Vec::new();
    let mut entries = tokio::fs::read_dir(dir).await?;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        let number = path
            .file_stem()
            .and_then(|s| s.to_str())
            .and_then(|s| s.strip_prefix(PAGE_PREFIX))
            .and_then(|n| n.parse::<usize>().ok());
        if let Some(number) = number
            && path.extension().is_some_and(|e| e == "png")
        {
            numbered.push((number, path));
        }
    }
    numbered.sort_unstable_by_key(|(n, _)| *n);
    Ok(numbered.into_iter().map(|(_, p)| p).collect())
}

async fn read_page(index: usize, path: &Path) -> Result<Page> {
    let data = tokio::fs::read(path)
        .await
        .map_err(|e| PreviewError::io(path, e))?;
    // Unknown sizes surface later as a decode error
    let (width, height) = image::ImageReader::new(Cursor::new(&data))
        .with_guessed_format()
        .ok()
        .and_then(|r| r.into_dimensions().ok())
        .unwrap_or((0, 0));
    Ok(Page::new(index, width, height, data))
}
