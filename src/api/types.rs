//! Shared state for the HTTP layer.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::analysis::ReportAnalyzer;
use crate::models::ExtractionOutcome;
use crate::pipeline::processor::LabReportPipeline;
use crate::store::ReportRepository;

/// Shared context for all API routes. Cheap to clone.
#[derive(Clone)]
pub struct ApiContext {
    pub pipeline: Arc<LabReportPipeline>,
    pub analyzer: Arc<ReportAnalyzer>,
    pub store: Arc<dyn ReportRepository>,
    pub dev_mode: bool,
}

impl ApiContext {
    pub fn new(
        pipeline: Arc<LabReportPipeline>,
        analyzer: Arc<ReportAnalyzer>,
        store: Arc<dyn ReportRepository>,
        dev_mode: bool,
    ) -> Self {
        Self {
            pipeline,
            analyzer,
            store,
            dev_mode,
        }
    }
}

/// Body of `POST /api/test-extract`.
#[derive(Debug, Deserialize)]
pub struct TextExtractRequest {
    #[serde(default)]
    pub text: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TextExtractResponse {
    pub success: bool,
    pub extracted_data: ExtractionOutcome,
    pub text_length: usize,
}

#[derive(Debug, Serialize)]
pub struct AnalyzeResponse {
    pub success: bool,
    pub upload_id: Uuid,
    pub report_id: Uuid,
}
