//! Position mapper: marshals cursor and click lookups to the backend.
//!
//! The backend owns the layout. This layer only bounds the calls, turns a
//! missing cursor mapping into [`PreviewError::MappingNotFound`] and checks
//! the click answer before anyone acts on it.

use std::path::Path;
use std::time::Duration;

use crate::backend::{Backend, timed};
use crate::core::{ClickResolution, PreviewPosition};
use crate::error::{PreviewError, Result};

pub struct PositionMapper<'a, B> {
    backend: &'a B,
    timeout: Duration,
}

impl<'a, B: Backend> PositionMapper<'a, B> {
    pub fn new(backend: &'a B, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    /// Visual position of the cursor (`offset` in chars into `text`).
    pub async fn cursor_to_preview_position(
        &self,
        offset: usize,
        text: &str,
        path: &Path,
    ) -> Result<PreviewPosition> {
        let resolved = timed(
            "resolve_cursor_position",
            self.timeout,
            self.backend.resolve_cursor_position(offset, text, path),
        )
        .await?;
        resolved.ok_or(PreviewError::MappingNotFound)
    }

    /// What lies under a click at `(x, y)` on `page`.
    pub async fn click_to_target(
        &self,
        text: &str,
        page: usize,
        x: f64,
        y: f64,
    ) -> Result<ClickResolution> {
        let resolution = timed(
            "resolve_click",
            self.timeout,
            self.backend.resolve_click(text, page, x, y),
        )
        .await?;

        if let ClickResolution::UrlJump { url } = &resolution
            && let Err(e) = url::Url::parse(url)
        {
            return Err(PreviewError::transport(
                "resolve_click",
                format!("invalid link target `{url}`: {e}"),
            ));
        }
        Ok(resolution)
    }
}
