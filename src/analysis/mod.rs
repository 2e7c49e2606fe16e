//! Educational report analysis for reviewed lab entries.
//!
//! validate → persist upload → model analysis → reconcile analytes
//! against the submitted entries → persist report.

pub mod validation;

pub use validation::validate_upload_request;

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, NaiveDate, Utc};
use serde_json::{json, Map, Value};
use tracing::{info, info_span, warn, Instrument};

use crate::config::ExtractionConfig;
use crate::models::{
    AnalysisResult, ChartSeries, ExtractionMethod, RawAnalyteCandidate, RawExtractionResult,
    RawValue, Report, UploadRequest,
};
use crate::pipeline::normalize::parse_numeric_value;
use crate::pipeline::postprocess::ResultPostProcessor;
use crate::pipeline::structuring::{
    build_analysis_prompt, parse_array_lenient, parse_json_object, CompletionRequest, LlmClient,
    StructuringError, UserContent, ANALYSIS_SYSTEM_PROMPT,
};
use crate::store::{run_blocking, ReportRepository, StoreError};

pub const ANALYSIS_TEMPERATURE: f32 = 0.2;

pub const DEFAULT_DISCLAIMER: &str = "This report is for educational purposes only and is not \
medical advice. Consult your healthcare provider about your results.";

#[derive(Debug, thiserror::Error)]
pub enum AnalysisError {
    #[error("Invalid input data")]
    Invalid(Vec<String>),

    #[error("Analysis model call failed: {0}")]
    Model(#[from] StructuringError),

    #[error("Storage error: {0}")]
    Store(#[from] StoreError),

    #[error("Analysis timed out after {0}s")]
    Timeout(u64),
}

pub struct ReportAnalyzer {
    client: Arc<dyn LlmClient>,
    store: Arc<dyn ReportRepository>,
    postprocessor: ResultPostProcessor,
    timeout: Duration,
}

impl ReportAnalyzer {
    pub fn new(
        client: Arc<dyn LlmClient>,
        store: Arc<dyn ReportRepository>,
        config: &ExtractionConfig,
    ) -> Self {
        Self {
            client,
            store,
            postprocessor: ResultPostProcessor::new(config),
            timeout: config.request_timeout,
        }
    }

    /// Analyze `request` as of today (UTC) and store the resulting report.
    pub async fn analyze(&self, request: UploadRequest) -> Result<Report, AnalysisError> {
        self.analyze_on(request, Utc::now().date_naive()).await
    }

    pub async fn analyze_on(
        &self,
        request: UploadRequest,
        today: NaiveDate,
    ) -> Result<Report, AnalysisError> {
        validate_upload_request(&request, today.year()).map_err(AnalysisError::Invalid)?;

        let span = info_span!("analyze_report", entries = request.lab_results.len());
        async {
            let (demographics, entries) = (request.demographics.clone(), request.lab_results.clone());
            let upload =
                run_blocking(&self.store, move |repo| repo.save_upload(demographics, entries)).await?;
            info!(upload_id = %upload.id, "Upload stored");

            let completion = build_analysis_request(&request, today);
            let response = tokio::time::timeout(self.timeout, self.client.complete(&completion))
                .await
                .map_err(|_| AnalysisError::Timeout(self.timeout.as_secs()))??;

            let result = self.reconcile(parse_json_object(&response)?, &request);
            info!(
                analytes = result.analytes.len(),
                score = result.overall_score,
                "Analysis parsed"
            );

            let upload_id = upload.id;
            let report =
                run_blocking(&self.store, move |repo| repo.save_report(&upload_id, result)).await?;
            info!(report_id = %report.id, "Report stored");
            Ok::<_, AnalysisError>(report)
        }
        .instrument(span)
        .await
    }

    /// Shape the model's object into an `AnalysisResult`, filling gaps from
    /// the submitted entries.
    fn reconcile(&self, object: Map<String, Value>, request: &UploadRequest) -> AnalysisResult {
        let analytes: Vec<RawAnalyteCandidate> = object
            .get("analytes")
            .and_then(Value::as_array)
            .map(|items| parse_array_lenient(items))
            .unwrap_or_default();
        let raw = RawExtractionResult {
            analytes,
            ..Default::default()
        };
        let outcome = self.postprocessor.process(
            raw,
            Some(&request.lab_results),
            0,
            ExtractionMethod::TextOnly,
        );

        let chart_series: Vec<ChartSeries> = object
            .get("chart_series")
            .and_then(Value::as_array)
            .map(|items| parse_array_lenient(items))
            .unwrap_or_default();

        let mut disclaimers = string_list(object.get("disclaimers"));
        if disclaimers.is_empty() {
            disclaimers.push(DEFAULT_DISCLAIMER.to_string());
        }

        AnalysisResult {
            overall_summary: object
                .get("overall_summary")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .trim()
                .to_string(),
            overall_score: score_from(object.get("overall_score")),
            flags: string_list(object.get("flags")),
            analytes: outcome.analytes,
            chart_series,
            disclaimers,
        }
    }
}

pub fn build_analysis_request(request: &UploadRequest, today: NaiveDate) -> CompletionRequest {
    let payload = json!({
        "demographics": request.demographics,
        "lab_results": request.lab_results,
        "date": today.format("%Y-%m-%d").to_string(),
    });
    CompletionRequest {
        system: ANALYSIS_SYSTEM_PROMPT.to_string(),
        user: UserContent::Text(build_analysis_prompt(&payload.to_string())),
        temperature: ANALYSIS_TEMPERATURE,
        seed: None,
        json_object: true,
    }
}

/// Score clamped to 0..=100; anything unparseable scores 0.
fn score_from(value: Option<&Value>) -> f64 {
    let raw = value.and_then(|v| serde_json::from_value::<RawValue>(v.clone()).ok());
    let score = parse_numeric_value(raw.as_ref());
    if score.is_finite() {
        score.clamp(0.0, 100.0)
    } else {
        warn!("Analysis score missing or not numeric");
        0.0
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}
