use serde::{Deserialize, Serialize};

use super::ExtractionError;

/// Which text strategy produced the document text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextSource {
    Primary,
    Secondary,
}

/// Plain text obtained from a document, already sanitized.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentText {
    pub text: String,
    pub method: TextSource,
}

impl DocumentText {
    /// Length in characters (not bytes).
    pub fn char_len(&self) -> usize {
        self.text.chars().count()
    }
}

/// A rendered page ready to send to a vision-capable model.
#[derive(Debug, Clone, PartialEq)]
pub struct PageImage {
    pub page_index: usize,
    /// `data:image/png;base64,...`
    pub data_url: String,
}

/// PDF text extraction abstraction. Returns one string per page read.
pub trait PdfExtractor: Send + Sync {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError>;
}

/// PDF page rasterization abstraction (allows mocking for tests).
pub trait PdfPageRenderer: Send + Sync {
    fn page_count(&self, pdf_bytes: &[u8]) -> Result<usize, ExtractionError>;

    /// Render a zero-based page to PNG bytes.
    fn render_page(
        &self,
        pdf_bytes: &[u8],
        page_number: usize,
        dpi: u32,
    ) -> Result<Vec<u8>, ExtractionError>;
}

// ── Mock for testing ──────────────────────────────────────

/// Extractor returning canned page texts, or failing with a parse error.
pub struct MockPdfExtractor {
    pages: Option<Vec<String>>,
}

impl MockPdfExtractor {
    pub fn with_pages(pages: &[&str]) -> Self {
        Self {
            pages: Some(pages.iter().map(|p| p.to_string()).collect()),
        }
    }

    pub fn failing() -> Self {
        Self { pages: None }
    }
}

impl PdfExtractor for MockPdfExtractor {
    fn extract_pages(&self, _pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        self.pages
            .clone()
            .ok_or_else(|| ExtractionError::PdfParsing("mock extractor failure".into()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn char_len_counts_characters() {
        let text = DocumentText {
            text: "µmol ↑".into(),
            method: TextSource::Primary,
        };
        assert_eq!(text.char_len(), 6);
        assert!(text.text.len() > 6);
    }

    #[test]
    fn mock_extractor_modes() {
        let ok = MockPdfExtractor::with_pages(&["a", "b"]);
        assert_eq!(ok.extract_pages(&[]).unwrap(), vec!["a", "b"]);
        let err = MockPdfExtractor::failing().extract_pages(&[]).unwrap_err();
        assert!(matches!(err, ExtractionError::PdfParsing(_)));
    }
}
