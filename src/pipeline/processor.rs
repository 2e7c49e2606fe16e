//! Lab report pipeline: single entry point for one extraction request.
//!
//! upload validation → document text → orchestrated extraction →
//! post-processing, bounded by a wall-clock ceiling. All engines are
//! injected through traits so the pipeline is testable with mocks.

use std::future::Future;
use std::sync::Arc;

use tracing::{info, info_span, Instrument};

use crate::config::ExtractionConfig;
use crate::models::ExtractionOutcome;
use crate::pipeline::extraction::{
    sanitize_document_text, DocumentTextExtractor, ExtractionError, PdfExtractor, PdfPageRenderer,
    VisionFallbackRenderer,
};
use crate::pipeline::orchestrator::ExtractionOrchestrator;
use crate::pipeline::postprocess::ResultPostProcessor;
use crate::pipeline::structuring::{LlmClient, StructuredExtractor};

const PDF_MIME: &str = "application/pdf";

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Terminal failures of an extraction request.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("No file provided")]
    NoFile,

    #[error("Unsupported content type: {0}")]
    UnsupportedType(String),

    #[error("File too large: {size} bytes (max {max})")]
    TooLarge { size: usize, max: usize },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Document text empty or too short ({length} characters)")]
    DocumentTextEmpty { length: usize },

    #[error("Document could not be read: {0}")]
    Document(ExtractionError),

    #[error("Model backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Model returned no usable response")]
    ModelEmptyResponse { details: Option<String> },

    #[error("Request timed out after {0}s")]
    Timeout(u64),
}

impl From<ExtractionError> for PipelineError {
    fn from(e: ExtractionError) -> Self {
        match e {
            ExtractionError::TextEmpty { length } => PipelineError::DocumentTextEmpty { length },
            other => PipelineError::Document(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Pipeline
// ---------------------------------------------------------------------------

pub struct LabReportPipeline {
    text_extractor: DocumentTextExtractor,
    orchestrator: ExtractionOrchestrator,
    postprocessor: ResultPostProcessor,
    config: ExtractionConfig,
}

impl LabReportPipeline {
    /// Wire the pipeline from its engines. Without a renderer the vision
    /// fallback is disabled.
    pub fn new(
        llm: Arc<dyn LlmClient>,
        primary: Arc<dyn PdfExtractor>,
        secondary: Arc<dyn PdfExtractor>,
        renderer: Option<Arc<dyn PdfPageRenderer>>,
        config: ExtractionConfig,
    ) -> Self {
        let text_extractor = DocumentTextExtractor::new(
            primary,
            secondary,
            config.min_text_quality_chars,
            config.min_text_floor_chars,
        );
        let vision = renderer.map(|r| {
            Arc::new(VisionFallbackRenderer::new(
                r,
                config.vision_max_pages,
                config.vision_render_dpi,
            ))
        });
        let orchestrator = ExtractionOrchestrator::new(
            StructuredExtractor::new(llm, config.temperature),
            vision,
            config.clone(),
        );
        Self {
            text_extractor,
            orchestrator,
            postprocessor: ResultPostProcessor::new(&config),
            config,
        }
    }

    pub fn config(&self) -> &ExtractionConfig {
        &self.config
    }

    /// Check an upload before any work is done: present and non-empty,
    /// declared as PDF, within the size limit.
    pub fn validate_upload(
        &self,
        content_type: Option<&str>,
        bytes: Option<&[u8]>,
    ) -> Result<(), PipelineError> {
        let bytes = match bytes {
            Some(b) if !b.is_empty() => b,
            _ => return Err(PipelineError::NoFile),
        };

        let mime = content_type
            .and_then(|ct| ct.split(';').next())
            .map(|ct| ct.trim().to_ascii_lowercase())
            .unwrap_or_default();
        if mime != PDF_MIME {
            return Err(PipelineError::UnsupportedType(if mime.is_empty() {
                "unknown".into()
            } else {
                mime
            }));
        }

        if bytes.len() > self.config.max_upload_bytes {
            return Err(PipelineError::TooLarge {
                size: bytes.len(),
                max: self.config.max_upload_bytes,
            });
        }
        Ok(())
    }

    /// Extract analytes from a validated PDF.
    pub async fn process_pdf(&self, pdf_bytes: Arc<[u8]>) -> Result<ExtractionOutcome, PipelineError> {
        let span = info_span!("process_pdf", bytes = pdf_bytes.len());
        self.with_timeout(async {
            let document = self.text_extractor.extract_text(pdf_bytes.clone()).await?;
            let text_length = document.char_len();
            info!(chars = text_length, method = ?document.method, "Document text ready");

            let adopted = self.orchestrator.run(&document.text, Some(pdf_bytes)).await?;
            Ok(self
                .postprocessor
                .process(adopted.result, None, text_length, adopted.method))
        })
        .instrument(span)
        .await
    }

    /// Extract analytes from already-available report text (no vision fallback).
    pub async fn process_text(&self, text: &str) -> Result<ExtractionOutcome, PipelineError> {
        let text = sanitize_document_text(text);
        if text.is_empty() {
            return Err(PipelineError::InvalidRequest("Text content required".into()));
        }
        let text_length = text.chars().count();

        let span = info_span!("process_text", chars = text_length);
        self.with_timeout(async {
            let adopted = self.orchestrator.run(&text, None).await?;
            Ok(self
                .postprocessor
                .process(adopted.result, None, text_length, adopted.method))
        })
        .instrument(span)
        .await
    }

    /// Abandon `fut` once the request ceiling passes. Nothing is persisted
    /// by this layer, so no partial state survives a timeout.
    async fn with_timeout<T>(
        &self,
        fut: impl Future<Output = Result<T, PipelineError>>,
    ) -> Result<T, PipelineError> {
        tokio::time::timeout(self.config.request_timeout, fut)
            .await
            .map_err(|_| PipelineError::Timeout(self.config.request_timeout.as_secs()))?
    }
}
