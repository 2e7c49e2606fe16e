use std::panic::{self, AssertUnwindSafe};

use super::types::PdfExtractor;
use super::ExtractionError;

/// Primary text extractor using the pdf-extract crate.
/// Handles digital PDFs with embedded text layers; pure Rust, no native library.
///
/// pdf-extract panics on some malformed documents (missing font resources,
/// broken content streams). Those panics are caught here and reported as
/// parse errors so the secondary strategy still gets its turn.
pub struct PdfTextExtractor;

impl PdfExtractor for PdfTextExtractor {
    fn extract_pages(&self, pdf_bytes: &[u8]) -> Result<Vec<String>, ExtractionError> {
        panic::catch_unwind(AssertUnwindSafe(|| {
            pdf_extract::extract_text_from_mem_by_pages(pdf_bytes)
        }))
        .map_err(|payload| ExtractionError::PdfParsing(panic_message(payload.as_ref())))?
        .map_err(|e| map_parse_error(&e))
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    let reason = payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown".into());
    format!("pdf-extract aborted: {reason}")
}

fn map_parse_error(e: &dyn std::fmt::Display) -> ExtractionError {
    let msg = e.to_string();
    if msg.to_lowercase().contains("encrypt") {
        ExtractionError::PdfEncrypted
    } else {
        ExtractionError::PdfParsing(msg)
    }
}
