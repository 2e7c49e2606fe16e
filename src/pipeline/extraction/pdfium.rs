//! PDFium adapters. `PdfiumRenderer` rasterizes report pages for the vision
//! fallback; `PdfiumTextLayer` reads the per-page text layer as the secondary
//! text strategy.
//!
//! `Pdfium` is `!Send`, so each call binds the library again. Repeat binds hit
//! the loader's cache.

use std::io::Cursor;
use std::path::PathBuf;

use image::{DynamicImage, ImageOutputFormat, Rgb, RgbImage};
use pdfium_render::prelude::*;
use tracing::{debug, warn};

use super::types::{PdfExtractor, PdfPageRenderer};
use super::ExtractionError;

/// Longest edge, in pixels, of a rendered page.
const MAX_EDGE_PX: u32 = 4096;

const PDF_POINTS_PER_INCH: f32 = 72.0;

/// Env var naming an explicit PDFium shared library.
const PDFIUM_PATH_ENV: &str = "PDFIUM_DYNAMIC_LIB_PATH";

fn library_unavailable(reason: String) -> ExtractionError {
    ExtractionError::PdfRendering { page: 0, reason }
}

/// Directories next to the binary where a bundled PDFium may live.
fn bundled_library_dirs() -> Vec<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| {
            exe.parent()
                .map(|dir| vec![dir.to_path_buf(), dir.join("pdfium").join("lib")])
        })
        .unwrap_or_default()
}

/// Bind PDFium: explicit env path first, then next to the binary, then the
/// system search path.
fn bind_pdfium() -> Result<Pdfium, ExtractionError> {
    if let Ok(path) = std::env::var(PDFIUM_PATH_ENV) {
        let bindings = Pdfium::bind_to_library(&path)
            .map_err(|e| library_unavailable(format!("cannot bind PDFium at {path}: {e}")))?;
        debug!(%path, "PDFium bound from {PDFIUM_PATH_ENV}");
        return Ok(Pdfium::new(bindings));
    }

    for dir in bundled_library_dirs() {
        let candidate = Pdfium::pdfium_platform_library_name_at_path(dir.to_string_lossy().as_ref());
        if let Ok(bindings) = Pdfium::bind_to_library(&candidate) {
            debug!(dir = %dir.display(), "PDFium bound from bundled copy");
            return Ok(Pdfium::new(bindings));
        }
    }

    Pdfium::bind_to_system_library()
        .map(Pdfium::new)
        .map_err(|e| library_unavailable(format!("no PDFium library found (set {PDFIUM_PATH_ENV}): {e}")))
}

fn open_error(e: PdfiumError) -> ExtractionError {
    let text = e.to_string();
    let lower = text.to_lowercase();
    if lower.contains("password") || lower.contains("encrypt") {
        return ExtractionError::PdfEncrypted;
    }
    ExtractionError::PdfRendering {
        page: 0,
        reason: format!("PDFium could not open the report: {text}"),
    }
}

/// Target bitmap size for a page of `width_pt` x `height_pt` points at `dpi`.
/// Oversized pages are scaled down uniformly so the longest edge fits
/// `MAX_EDGE_PX`; neither edge drops below one pixel.
fn target_size(width_pt: f32, height_pt: f32, dpi: u32) -> (u32, u32) {
    let px_per_pt = dpi as f32 / PDF_POINTS_PER_INCH;
    let (w, h) = ((width_pt * px_per_pt).max(1.0), (height_pt * px_per_pt).max(1.0));
    let shrink = (MAX_EDGE_PX as f32 / w.max(h)).min(1.0);
    let fit = |edge: f32| ((edge * shrink) as u32).clamp(1, MAX_EDGE_PX);
    (fit(w), fit(h))
}

fn encode_png(image: &DynamicImage) -> Result<Vec<u8>, ExtractionError> {
    let mut buffer = Cursor::new(Vec::new());
    image
        .write_to(&mut buffer, ImageOutputFormat::Png)
        .map_err(|e| ExtractionError::ImageProcessing(format!("PNG encode: {e}")))?;
    Ok(buffer.into_inner())
}

/// Page rasterizer backed by PDFium.
pub struct PdfiumRenderer;

impl PdfiumRenderer {
    /// Fails when no PDFium library can be bound, so startup can disable the
    /// vision fallback instead of failing every request later.
    pub fn new() -> Result<Self, ExtractionError> {
        bind_pdfium()?;
        Ok(Self)
    }
}

impl PdfPageRenderer for PdfiumRenderer {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        let pdfium = bind_pdfium()?;
        let document = pdfium.load_pdf_from_byte_slice(pdf_bytes, None).map_err(open_error)?;
        Ok(document.pages().len() as usize)
    }

    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_number: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        let render_error = |reason: String| ExtractionError::PdfRendering {
            page: page_number,
            reason,
        };

        let pdfium = bind_pdfium()?;
        let document = pdfium.load_pdf_from_byte_slice(pdf_bytes, None).map_err(open_error)?;
        let pages = document.pages();
        let index = u16::try_from(page_number)
            .map_err(|_| render_error(format!("page {page_number} is beyond PDFium's index range")))?;
        let page = pages
            .get(index)
            .map_err(|_| render_error(format!("report has {} pages", pages.len())))?;

        let (width, height) = target_size(page.width().value, page.height().value, dpi);
        let config = PdfRenderConfig::new()
            .set_target_width(width as i32)
            .set_maximum_height(height as i32);
        let bitmap = page
            .render_with_config(&config)
            .map_err(|e| render_error(e.to_string()))?;

        let png = encode_png(&bitmap.as_image())?;
        debug!(page = page_number, width, height, bytes = png.len(), "Page rasterized");
        Ok(png)
    }
}

/// Secondary text strategy: PDFium's text layer for the first `max_pages`
/// pages. Handles CID fonts and custom encodings that pdf-extract garbles.
pub struct PdfiumTextLayer {
    max_pages: usize,
}

impl PdfiumTextLayer {
    pub fn new(max_pages: usize) -> Self {
        Self { max_pages }
    }
}

impl PdfExtractor for PdfiumTextLayer {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        let pdfium = bind_pdfium()?;
        let document = pdfium.load_pdf_from_byte_slice(pdf_bytes, None).map_err(open_error)?;

        let mut texts = Vec::new();
        for (index, page) in document.pages().iter().take(self.max_pages).enumerate() {
            match page.text() {
                Ok(layer) => texts.push(layer.all()),
                Err(e) => warn!(page = index, error = %e, "Skipping page without a text layer"),
            }
        }
        Ok(texts)
    }
}

/// Renderer stand-in for tests: every page in range becomes a blank PNG.
pub struct MockPdfPageRenderer {
    page_count: usize,
}

impl MockPdfPageRenderer {
    pub fn new(page_count: usize) -> Self {
        Self { page_count }
    }
}

impl PdfPageRenderer for MockPdfPageRenderer {
    fn page_count(&self, _pdf_bytes: &[u8]) -> Result<usize, ExtractionError> {
        Ok(self.page_count)
    }

    fn render_page(
        &self,
        _pdf_bytes: &[u8],
        page_number: usize,
        _dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError> {
        if page_number >= self.page_count {
            return Err(ExtractionError::PdfRendering {
                page: page_number,
                reason: format!("mock report has {} pages", self.page_count),
            });
        }
        encode_png(&DynamicImage::ImageRgb8(RgbImage::from_pixel(2, 2, Rgb([255, 255, 255]))))
    }
}
