//! Rendered pages: raw backend payloads and decoded display images.

use std::fmt;
use std::sync::Arc;

/// One rendered page as produced by the backend.
///
/// `data` is the encoded raster (PNG) exactly as the backend returned it.
#[derive(Clone, PartialEq, Eq)]
pub struct Page {
    pub index: usize,
    pub width: u32,
    pub height: u32,
    pub data: Arc<[u8]>,
}

impl Page {
    pub fn new(index: usize, width: u32, height: u32, data: impl Into<Arc<[u8]>>) -> Self {
        Self {
            index,
            width,
            height,
            data: data.into(),
        }
    }
}

impl fmt::Debug for Page {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Page")
            .field("index", &self.index)
            .field("width", &self.width)
            .field("height", &self.height)
            .field("bytes", &self.data.len())
            .finish()
    }
}

/// Decoded, display-ready page image.
pub struct PageImage {
    pub width: u32,
    pub height: u32,
    pub pixels: image::RgbaImage,
}

impl PageImage {
    /// Decode an encoded raster payload.
    pub fn decode(data: &[u8]) -> image::ImageResult<Self> {
        let pixels = image::load_from_memory(data)?.into_rgba8();
        Ok(Self {
            width: pixels.width(),
            height: pixels.height(),
            pixels,
        })
    }
}

impl fmt::Debug for PageImage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "PageImage({}x{})", self.width, self.height)
    }
}

#[cfg(test)]
pub(crate) fn encode_test_png(width: u32, height: u32, shade: u8) -> Vec<u8> {
    let mut out = std::io::Cursor::new(Vec::new());
    image::RgbaImage::from_pixel(width, height, image::Rgba([shade, shade, shade, 255]))
        .write_to(&mut out, image::ImageFormat::Png)
        .unwrap();
    out.into_inner()
}
