use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use super::sanitize::sanitize_document_text;
use super::types::{DocumentText, PdfExtractor, TextSource};
use super::ExtractionError;

/// Obtains plain text from a PDF, escalating from the cheap primary
/// extractor to the page-by-page secondary one when the first result is
/// short.
pub struct DocumentTextExtractor {
    primary: Arc<dyn PdfExtractor>,
    secondary: Arc<dyn PdfExtractor>,
    /// Below this many characters the secondary strategy runs.
    min_quality_chars: usize,
    /// Below this many characters after both strategies, extraction fails.
    floor_chars: usize,
}

impl DocumentTextExtractor {
    pub fn new(
        primary: Arc<dyn PdfExtractor>,
        secondary: Arc<dyn PdfExtractor>,
        min_quality_chars: usize,
        floor_chars: usize,
    ) -> Self {
        Self {
            primary,
            secondary,
            min_quality_chars,
            floor_chars,
        }
    }

    /// Extract and sanitize document text.
    ///
    /// Both strategies run on the blocking pool. A strategy that errors counts
    /// as producing no text; if both error, the primary's error is returned.
    pub async fn extract_text(
        &self,
        pdf_bytes: Arc<[u8]>,
    ) -> Result<DocumentText, ExtractionError> {
        let span = info_span!("extract_document_text", bytes = pdf_bytes.len());
        async move {
            let primary = run_extractor(self.primary.clone(), pdf_bytes.clone()).await;
            let primary_text = match &primary {
                Ok(text) => text.clone(),
                Err(e) => {
                    warn!(error = %e, "Primary text extraction failed");
                    String::new()
                }
            };
            let primary_len = primary_text.chars().count();
            debug!(chars = primary_len, "Primary extraction finished");

            if primary_len >= self.min_quality_chars {
                return Ok(DocumentText {
                    text: primary_text,
                    method: TextSource::Primary,
                });
            }

            info!(
                chars = primary_len,
                threshold = self.min_quality_chars,
                "Primary text below quality threshold, trying secondary extraction"
            );

            let secondary = run_extractor(self.secondary.clone(), pdf_bytes).await;
            let secondary_text = match &secondary {
                Ok(text) => text.clone(),
                Err(e) => {
                    warn!(error = %e, "Secondary text extraction failed");
                    String::new()
                }
            };
            let secondary_len = secondary_text.chars().count();

            let best = if secondary_len > primary_len {
                DocumentText {
                    text: secondary_text,
                    method: TextSource::Secondary,
                }
            } else {
                DocumentText {
                    text: primary_text,
                    method: TextSource::Primary,
                }
            };
            let best_len = best.char_len();

            if best_len >= self.floor_chars {
                info!(chars = best_len, method = ?best.method, "Document text extracted");
                return Ok(best);
            }

            match (primary, secondary) {
                (Err(e), Err(_)) => Err(e),
                _ => Err(ExtractionError::TextEmpty { length: best_len }),
            }
        }
        .instrument(span)
        .await
    }
}

async fn run_extractor(
    extractor: Arc<dyn PdfExtractor>,
    pdf_bytes: Arc<[u8]>,
) -> Result<String, ExtractionError> {
    let pages = tokio::task::spawn_blocking(move || extractor.extract_pages(&pdf_bytes)).await??;
    Ok(sanitize_document_text(&pages.join("\n")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::extraction::MockPdfExtractor;

    fn extractor(primary: MockPdfExtractor, secondary: MockPdfExtractor) -> DocumentTextExtractor {
        DocumentTextExtractor::new(Arc::new(primary), Arc::new(secondary), 200, 20)
    }

    fn bytes() -> Arc<[u8]> {
        Arc::from(&b"%PDF-1.4"[..])
    }

    #[tokio::test]
    async fn long_primary_text_skips_secondary() {
        let long = "Glucose 105 mg/dL 70-100 ".repeat(20);
        let ex = extractor(
            MockPdfExtractor::with_pages(&[&long]),
            MockPdfExtractor::failing(),
        );
        let result = ex.extract_text(bytes()).await.unwrap();
        assert_eq!(result.method, TextSource::Primary);
        assert!(result.char_len() >= 200);
    }

    #[tokio::test]
    async fn short_primary_prefers_longer_secondary() {
        let long = "LDL 145 mg/dL <100\n".repeat(20);
        let ex = extractor(
            MockPdfExtractor::with_pages(&["LDL 145"]),
            MockPdfExtractor::with_pages(&[&long, "HDL 42"]),
        );
        let result = ex.extract_text(bytes()).await.unwrap();
        assert_eq!(result.method, TextSource::Secondary);
        assert!(result.text.contains("HDL 42"));
    }

    #[tokio::test]
    async fn short_primary_kept_when_secondary_not_longer() {
        let text = "Hemoglobin 14.2 g/dL 13.5-17.5";
        let ex = extractor(
            MockPdfExtractor::with_pages(&[text]),
            MockPdfExtractor::with_pages(&["Hb"]),
        );
        let result = ex.extract_text(bytes()).await.unwrap();
        assert_eq!(result.method, TextSource::Primary);
        assert_eq!(result.text, text);
    }

    #[tokio::test]
    async fn primary_failure_falls_back_to_secondary() {
        let text = "Triglycerides 180 mg/dL <150";
        let ex = extractor(
            MockPdfExtractor::failing(),
            MockPdfExtractor::with_pages(&[text]),
        );
        let result = ex.extract_text(bytes()).await.unwrap();
        assert_eq!(result.method, TextSource::Secondary);
    }

    #[tokio::test]
    async fn both_below_floor_is_text_empty() {
        let ex = extractor(
            MockPdfExtractor::with_pages(&["   "]),
            MockPdfExtractor::with_pages(&["short"]),
        );
        let err = ex.extract_text(bytes()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::TextEmpty { length: 5 }));
    }

    struct PanickingExtractor;

    impl PdfExtractor for PanickingExtractor {
        fn extract_pages(&self, _pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
            panic!("Font");
        }
    }

    #[tokio::test]
    async fn panicking_primary_still_tries_secondary() {
        let text = "Creatinine 1.1 mg/dL 0.7-1.3";
        let ex = DocumentTextExtractor::new(
            Arc::new(PanickingExtractor),
            Arc::new(MockPdfExtractor::with_pages(&[text])),
            200,
            20,
        );
        let result = ex.extract_text(bytes()).await.unwrap();
        assert_eq!(result.method, TextSource::Secondary);
        assert_eq!(result.text, text);
    }

    #[tokio::test]
    async fn both_failing_returns_primary_error() {
        let ex = extractor(MockPdfExtractor::failing(), MockPdfExtractor::failing());
        let err = ex.extract_text(bytes()).await.unwrap_err();
        assert!(matches!(err, ExtractionError::PdfParsing(_)));
    }
}
