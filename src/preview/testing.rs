//! Scripted in-memory backend for engine tests.
//!
//! It "compiles" with a toy layout model:
//! - a line that is exactly `#pagebreak()` starts a new page
//! - a line containing `#error` yields an error at that spot
//! - a line containing `#warn` yields a warning
//!
//! Page payloads are real PNGs whose pixels spell out the page text, so
//! identical page text always produces identical bytes. Every call is
//! recorded; any operation can be delayed or made to fail once.

use std::collections::VecDeque;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::time::Duration;

use parking_lot::Mutex;
use rustc_hash::{FxHashMap, FxHashSet};

use crate::backend::Backend;
use crate::core::{
    ClickResolution, Diagnostic, ExportFormat, Location, Page, PreviewPosition, Severity,
};
use crate::error::{PreviewError, Result};

const PAGEBREAK: &str = "#pagebreak()";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Call {
    Persist { path: PathBuf, text: String },
    Compile,
    PageCount,
    RenderAll,
    RenderPage(usize),
    ResolveCursor(usize),
    ResolveClick { page: usize },
    OpenWorkspace(PathBuf),
    SetMain(PathBuf),
    CreateFile(PathBuf),
    Export { format: ExportFormat, output: PathBuf },
}

impl Call {
    pub(crate) fn is_page_request(&self) -> bool {
        matches!(self, Self::RenderAll | Self::RenderPage(_))
    }
}

struct Script {
    persisted: String,
    compiled: Option<String>,
    calls: Vec<Call>,
    delays: FxHashMap<&'static str, VecDeque<Duration>>,
    failures: FxHashSet<&'static str>,
    corrupt: FxHashSet<usize>,
    map_cursor: bool,
    clicks: VecDeque<ClickResolution>,
}

impl Script {
    /// Record the call and take its scheduled delay and failure.
    fn begin(&mut self, op: &'static str, call: Call) -> (Option<Duration>, bool) {
        self.calls.push(call);
        let delay = self.delays.get_mut(op).and_then(VecDeque::pop_front);
        (delay, self.failures.remove(op))
    }

    fn pages(&self) -> Vec<String> {
        self.compiled.as_deref().map(split_pages).unwrap_or_default()
    }

    fn page(&self, index: usize, text: &str) -> Page {
        let data = if self.corrupt.contains(&index) {
            b"corrupt".to_vec()
        } else {
            page_png(text)
        };
        Page::new(index, text.len().max(1) as u32, 1, data)
    }
}

pub(crate) struct ScriptedBackend {
    script: Mutex<Script>,
}

impl ScriptedBackend {
    pub(crate) fn new() -> Self {
        Self {
            script: Mutex::new(Script {
                persisted: String::new(),
                compiled: None,
                calls: Vec::new(),
                delays: FxHashMap::default(),
                failures: FxHashSet::default(),
                corrupt: FxHashSet::default(),
                map_cursor: true,
                clicks: VecDeque::new(),
            }),
        }
    }

    /// Delay the next call of `op` by `delay`.
    pub(crate) fn delay_next(&self, op: &'static str, delay: Duration) {
        self.script.lock().delays.entry(op).or_default().push_back(delay);
    }

    /// Make the next call of `op` fail.
    pub(crate) fn fail_next(&self, op: &'static str) {
        self.script.lock().failures.insert(op);
    }

    /// Serve garbage bytes for the page at `index`.
    pub(crate) fn corrupt_page(&self, index: usize) {
        self.script.lock().corrupt.insert(index);
    }

    pub(crate) fn set_cursor_mapping(&self, enabled: bool) {
        self.script.lock().map_cursor = enabled;
    }

    /// Queue the answer for the next click.
    pub(crate) fn answer_click(&self, resolution: ClickResolution) {
        self.script.lock().clicks.push_back(resolution);
    }

    pub(crate) fn calls(&self) -> Vec<Call> {
        self.script.lock().calls.clone()
    }

    pub(crate) fn take_calls(&self) -> Vec<Call> {
        std::mem::take(&mut self.script.lock().calls)
    }

    pub(crate) fn page_requests(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_page_request).collect()
    }
}

async fn pause(delay: Option<Duration>) {
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
}

fn scripted_failure(op: &'static str) -> PreviewError {
    PreviewError::transport(op, "scripted failure")
}

impl Backend for ScriptedBackend {
    async fn persist_source(&self, path: &Path, text: &str) -> Result<()> {
        let (delay, fail) = {
            let mut s = self.script.lock();
            let (delay, fail) = s.begin(
                "persist_source",
                Call::Persist {
                    path: path.to_path_buf(),
                    text: text.to_string(),
                },
            );
            if !fail {
                s.persisted = text.to_string();
            }
            (delay, fail)
        };
        pause(delay).await;
        if fail {
            return Err(PreviewError::io(path, std::io::Error::other("scripted failure")));
        }
        Ok(())
    }

    async fn compile(&self) -> Result<Vec<Diagnostic>> {
        let (delay, result) = {
            let mut s = self.script.lock();
            let (delay, fail) = s.begin("compile", Call::Compile);
            let result = if fail {
                Err(scripted_failure("compile"))
            } else {
                let text = s.persisted.clone();
                let diagnostics = scan_diagnostics(&text);
                if diagnostics.iter().any(Diagnostic::is_error) {
                    Err(PreviewError::Compile { diagnostics })
                } else {
                    s.compiled = Some(text);
                    Ok(diagnostics)
                }
            };
            (delay, result)
        };
        pause(delay).await;
        result
    }

    async fn page_count(&self) -> Result<usize> {
        let (delay, result) = {
            let mut s = self.script.lock();
            let (delay, fail) = s.begin("page_count", Call::PageCount);
            let result = if fail {
                Err(scripted_failure("page_count"))
            } else {
                Ok(s.pages().len())
            };
            (delay, result)
        };
        pause(delay).await;
        result
    }

    async fn render_all_pages(&self) -> Result<Vec<Page>> {
        let (delay, result) = {
            let mut s = self.script.lock();
            let (delay, fail) = s.begin("render_all_pages", Call::RenderAll);
            let result = if fail {
                Err(scripted_failure("render_all_pages"))
            } else {
                Ok(s.pages()
                    .iter()
                    .enumerate()
                    .map(|(i, text)| s.page(i, text))
                    .collect())
            };
            (delay, result)
        };
        pause(delay).await;
        result
    }

    async fn render_page(&self, index: usize) -> Result<Page> {
        let (delay, result) = {
            let mut s = self.script.lock();
            let (delay, fail) = s.begin("render_page", Call::RenderPage(index));
            let pages = s.pages();
            let result = match pages.get(index) {
                _ if fail => Err(scripted_failure("render_page")),
                Some(text) => Ok(s.page(index, text)),
                None => Err(PreviewError::transport("render_page", "page out of range")),
            };
            (delay, result)
        };
        pause(delay).await;
        result
    }

    async fn resolve_cursor_position(
        &self,
        offset: usize,
        text: &str,
        _path: &Path,
    ) -> Result<Option<PreviewPosition>> {
        let (delay, result) = {
            let mut s = self.script.lock();
            let (delay, fail) = s.begin("resolve_cursor_position", Call::ResolveCursor(offset));
            let result = if fail {
                Err(scripted_failure("resolve_cursor_position"))
            } else if s.map_cursor {
                let (page, line) = locate(text, offset);
                Ok(Some(PreviewPosition::new(page, 0.0, line as f64 * 10.0)))
            } else {
                Ok(None)
            };
            (delay, result)
        };
        pause(delay).await;
        result
    }

    async fn resolve_click(
        &self,
        _text: &str,
        page: usize,
        _x: f64,
        _y: f64,
    ) -> Result<ClickResolution> {
        let (delay, result) = {
            let mut s = self.script.lock();
            let (delay, fail) = s.begin("resolve_click", Call::ResolveClick { page });
            let result = if fail {
                Err(scripted_failure("resolve_click"))
            } else {
                Ok(s.clicks.pop_front().unwrap_or(ClickResolution::NoJump))
            };
            (delay, result)
        };
        pause(delay).await;
        result
    }

    async fn open_workspace(&self, path: &Path) -> Result<()> {
        let (delay, fail) = self
            .script
            .lock()
            .begin("open_workspace", Call::OpenWorkspace(path.to_path_buf()));
        pause(delay).await;
        if fail {
            return Err(scripted_failure("open_workspace"));
        }
        Ok(())
    }

    async fn set_main_document(&self, path: &Path) -> Result<()> {
        let (delay, fail) = {
            let mut s = self.script.lock();
            let begun = s.begin("set_main_document", Call::SetMain(path.to_path_buf()));
            if !begun.1 {
                s.compiled = None;
            }
            begun
        };
        pause(delay).await;
        if fail {
            return Err(scripted_failure("set_main_document"));
        }
        Ok(())
    }

    async fn create_file(&self, path: &Path, text: &str) -> Result<()> {
        let (delay, fail) = self
            .script
            .lock()
            .begin("create_file", Call::CreateFile(path.to_path_buf()));
        pause(delay).await;
        if fail {
            return Err(PreviewError::io(path, std::io::Error::other("scripted failure")));
        }
        tokio::fs::write(path, text)
            .await
            .map_err(|e| PreviewError::io(path, e))
    }

    /// Writes the persisted source to the target path.
    async fn export(&self, format: &ExportFormat, output: &Path) -> Result<PathBuf> {
        let (delay, fail, text) = {
            let mut s = self.script.lock();
            let call = Call::Export {
                format: *format,
                output: output.to_path_buf(),
            };
            let (delay, fail) = s.begin("export", call);
            (delay, fail, s.persisted.clone())
        };
        pause(delay).await;
        if fail {
            return Err(PreviewError::Compile {
                diagnostics: vec![Diagnostic::new(
                    Severity::Error,
                    Location::point(1, 1),
                    "scripted export failure",
                )],
            });
        }
        let target = format.output_path(output);
        tokio::fs::write(&target, text)
            .await
            .map_err(|e| PreviewError::io(&target, e))?;
        Ok(target)
    }
}

/// Page texts of a document.
pub(crate) fn split_pages(text: &str) -> Vec<String> {
    let mut pages = vec![String::new()];
    for line in text.split('\n') {
        if line.trim() == PAGEBREAK {
            pages.push(String::new());
            continue;
        }
        let page = pages.last_mut().unwrap();
        if !page.is_empty() {
            page.push('\n');
        }
        page.push_str(line);
    }
    pages
}

/// (page, line within page) of a char offset.
fn locate(text: &str, offset: usize) -> (usize, usize) {
    let (mut page, mut line_in_page, mut start) = (0, 0, 0);
    for line in text.split('\n') {
        let len = line.chars().count();
        if offset <= start + len {
            return (page, line_in_page);
        }
        if line.trim() == PAGEBREAK {
            page += 1;
            line_in_page = 0;
        } else {
            line_in_page += 1;
        }
        start += len + 1;
    }
    (page, line_in_page)
}

fn scan_diagnostics(text: &str) -> Vec<Diagnostic> {
    let mut diagnostics = Vec::new();
    for (i, line) in text.split('\n').enumerate() {
        for (marker, severity) in [("#error", Severity::Error), ("#warn", Severity::Warning)] {
            if let Some(byte) = line.find(marker) {
                let column = line[..byte].chars().count() + 1;
                let location = Location {
                    line: i + 1,
                    column,
                    end_line: i + 1,
                    end_column: column + marker.len(),
                };
                diagnostics.push(
                    Diagnostic::new(severity, location, format!("scripted {}", severity.label()))
                        .with_hint("remove the marker"),
                );
            }
        }
    }
    diagnostics
}

/// A PNG whose single pixel row spells out `text`.
pub(crate) fn page_png(text: &str) -> Vec<u8> {
    let bytes = text.as_bytes();
    let width = bytes.len().max(1) as u32;
    let image = image::RgbaImage::from_fn(width, 1, |x, _| {
        let b = bytes.get(x as usize).copied().unwrap_or(0);
        image::Rgba([b, b, b, 255])
    });
    let mut out = Cursor::new(Vec::new());
    image.write_to(&mut out, image::ImageFormat::Png).unwrap();
    out.into_inner()
}

#[test]
fn test_toy_layout() {
    let text = "one\n#pagebreak()\ntwo\nmore\n#pagebreak()\nthree";
    assert_eq!(split_pages(text), ["one", "two\nmore", "three"]);
    assert_eq!(locate(text, 0), (0, 0));
    assert_eq!(locate(text, 18), (1, 0));
    assert_eq!(locate(text, 23), (1, 1));
    assert_eq!(locate(text, 999), (2, 1));
    assert_eq!(page_png("same"), page_png("same"));
}
