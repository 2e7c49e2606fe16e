pub mod pdf;
pub mod pdfium;
pub mod sanitize;
pub mod text;
pub mod types;
pub mod vision;

pub use pdf::*;
pub use pdfium::*;
pub use sanitize::*;
pub use text::*;
pub use types::*;
pub use vision::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExtractionError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("PDF parsing failed: {0}")]
    PdfParsing(String),

    #[error("PDF rendering failed on page {page}: {reason}")]
    PdfRendering { page: usize, reason: String },

    #[error("PDF is password-protected")]
    PdfEncrypted,

    #[error("Image processing error: {0}")]
    ImageProcessing(String),

    #[error("Document text empty or too short ({length} characters)")]
    TextEmpty { length: usize },

    #[error("Extraction task failed: {0}")]
    TaskJoin(String),
}

impl From<tokio::task::JoinError> for ExtractionError {
    fn from(e: tokio::task::JoinError) -> Self {
        ExtractionError::TaskJoin(e.to_string())
    }
}
