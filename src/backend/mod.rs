//! Compiler/renderer backend seam.
//!
//! The engine never compiles or rasterizes anything itself. It talks to a
//! [`Backend`] that owns the layout knowledge: compilation, pagination,
//! rasterization and source/preview position mapping.

mod short_diag;
pub mod typst_cli;

use std::future::Future;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::core::{ClickResolution, Diagnostic, ExportFormat, Page, PreviewPosition};
use crate::error::{PreviewError, Result};

pub use typst_cli::TypstCli;

/// Operations the engine consumes. All are asynchronous and fallible.
///
/// Futures returned here are awaited on a single-threaded runtime, so they
/// need not be `Send`.
#[allow(async_fn_in_trait)]
pub trait Backend {
    /// Write `text` through to `path` before it is compiled.
    async fn persist_source(&self, path: &Path, text: &str) -> Result<()>;

    /// Compile the most recently persisted main document.
    ///
    /// Invalid source yields [`PreviewError::Compile`] with the diagnostics.
    async fn compile(&self) -> Result<Vec<Diagnostic>>;

    async fn page_count(&self) -> Result<usize>;

    /// Every page in index order.
    async fn render_all_pages(&self) -> Result<Vec<Page>>;

    async fn render_page(&self, index: usize) -> Result<Page>;

    /// `None` when the cursor has no visual counterpart.
    async fn resolve_cursor_position(
        &self,
        offset: usize,
        text: &str,
        path: &Path,
    ) -> Result<Option<PreviewPosition>>;

    async fn resolve_click(
        &self,
        text: &str,
        page: usize,
        x: f64,
        y: f64,
    ) -> Result<ClickResolution>;

    async fn open_workspace(&self, path: &Path) -> Result<()>;

    async fn set_main_document(&self, path: &Path) -> Result<()>;

    async fn create_file(&self, path: &Path, text: &str) -> Result<()>;

    /// Export the persisted main document to `output`.
    ///
    /// Returns the path actually written; per-page formats may turn it
    /// into a page template (see [`ExportFormat::output_path`]).
    async fn export(&self, format: &ExportFormat, output: &Path) -> Result<PathBuf>;
}

/// Bound a backend call by `after`. Expiry becomes [`PreviewError::Timeout`].
///
/// The call itself is not cancelled on the backend side; its future is
/// dropped and any late answer is lost.
pub async fn timed<T>(
    op: &'static str,
    after: Duration,
    call: impl Future<Output = Result<T>>,
) -> Result<T> {
    match tokio::time::timeout(after, call).await {
        Ok(result) => result,
        Err(_) => {
            crate::debug!("backend"; "`{}` timed out after {:?}", op, after);
            Err(PreviewError::Timeout { op, after })
        }
    }
}
