use std::sync::Arc;

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use tracing::{info, info_span, warn};

use super::types::{PageImage, PdfPageRenderer};
use super::ExtractionError;

/// Rasterizes the leading pages of a document for vision extraction.
pub struct VisionFallbackRenderer {
    renderer: Arc<dyn PdfPageRenderer>,
    max_pages: usize,
    dpi: u32,
}

impl VisionFallbackRenderer {
    pub fn new(renderer: Arc<dyn PdfPageRenderer>, max_pages: usize, dpi: u32) -> Self {
        Self {
            renderer,
            max_pages,
            dpi,
        }
    }

    /// Render up to `max_pages` leading pages as PNG data URLs.
    ///
    /// Pages that fail to render are skipped; an error is returned only when
    /// the document itself cannot be opened.
    pub async fn render_pages(
        &self,
        pdf_bytes: Arc<[u8]>,
    ) -> Result<Vec<PageImage>, ExtractionError> {
        let renderer = self.renderer.clone();
        let max_pages = self.max_pages;
        let dpi = self.dpi;
        let span = info_span!("render_vision_pages", max_pages, dpi);

        tokio::task::spawn_blocking(move || {
            let _guard = span.enter();
            let page_count = renderer.page_count(&pdf_bytes)?;
            let to_render = page_count.min(max_pages);

            let mut images = Vec::with_capacity(to_render);
            for page_index in 0..to_render {
                match renderer.render_page(&pdf_bytes, page_index, dpi) {
                    Ok(png) => images.push(PageImage {
                        page_index,
                        data_url: png_data_url(&png),
                    }),
                    Err(e) => warn!(page = page_index, error = %e, "Skipping unrenderable page"),
                }
            }

            info!(page_count, rendered = images.len(), "Pages rendered for vision");
            Ok::<_, ExtractionError>(images)
        })
        .await?
    }
}

/// Encode PNG bytes as a `data:` URL.
pub fn png_data_url(png: &[u8]) -> String {
    format!("data:image/png;base64,{}", STANDARD.encode(png))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::MockPdfPageRenderer;

    fn bytes() -> Arc<[u8]> {
        Arc::from(&b"%PDF-1.4"[..])
    }

    #[tokio::test]
    async fn renders_at_most_max_pages() {
        let vision = VisionFallbackRenderer::new(Arc::new(MockPdfPageRenderer::new(5)), 3, 150);
        let images = vision.render_pages(bytes()).await.unwrap();
        assert_eq!(images.len(), 3);
        assert_eq!(images[2].page_index, 2);
        assert!(images[0].data_url.starts_with("data:image/png;base64,iVBORw0KGgo"));
    }

    #[tokio::test]
    async fn short_document_renders_every_page() {
        let vision = VisionFallbackRenderer::new(Arc::new(MockPdfPageRenderer::new(1)), 3, 150);
        assert_eq!(vision.render_pages(bytes()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn empty_document_renders_nothing() {
        let vision = VisionFallbackRenderer::new(Arc::new(MockPdfPageRenderer::new(0)), 3, 150);
        assert!(vision.render_pages(bytes()).await.unwrap().is_empty());
    }

    #[test]
    fn data_url_prefix() {
        assert_eq!(png_data_url(&[]), "data:image/png;base64,");
    }
}
