//! Extraction orchestration: best-of-N text attempts with early stop, then a
//! single vision attempt when text produced no analytes.
//!
//! Attempts run strictly one after another: whether attempt k+1 happens
//! depends on attempt k's analyte count.

use std::sync::Arc;

use tracing::{debug, info, info_span, warn, Instrument};

use crate::config::ExtractionConfig;
use crate::models::{ExtractionMethod, RawExtractionResult};
use crate::pipeline::extraction::VisionFallbackRenderer;
use crate::pipeline::processor::PipelineError;
use crate::pipeline::structuring::{ExtractionContent, StructuredExtractor, StructuringError};

/// Orchestration lifecycle, logged on every transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrchestrationState {
    NotStarted,
    TextAttempting { attempt: usize },
    TextSucceededComprehensive,
    TextSucceededPartial,
    TextExhausted,
    VisionAttempting,
    Done,
    Failed,
}

/// The candidate result the orchestrator settled on.
#[derive(Debug, Clone, PartialEq)]
pub struct AdoptedExtraction {
    pub result: RawExtractionResult,
    pub method: ExtractionMethod,
    /// Structured extraction calls issued, vision included.
    pub attempts: usize,
}

/// Best candidate seen so far. Candidates are replaced whole, never merged.
#[derive(Default)]
struct BestCandidate {
    result: Option<RawExtractionResult>,
    method: Option<ExtractionMethod>,
}

impl BestCandidate {
    fn count(&self) -> usize {
        self.result.as_ref().map_or(0, RawExtractionResult::analyte_count)
    }

    /// Adopt `candidate` only if it has strictly more analytes than the best
    /// so far. An empty candidate is never adopted.
    fn offer(&mut self, candidate: RawExtractionResult, method: ExtractionMethod) -> bool {
        if candidate.analyte_count() > self.count() {
            self.result = Some(candidate);
            self.method = Some(method);
            true
        } else {
            false
        }
    }
}

/// Failure bookkeeping across attempts.
#[derive(Default)]
struct AttemptFailures {
    backend: usize,
    parse: usize,
    /// Responses that parsed but carried no analytes.
    empty: usize,
    last_backend_error: Option<String>,
    last_parse_preview: Option<String>,
}

impl AttemptFailures {
    fn record(&mut self, attempt: usize, err: StructuringError) {
        if err.is_parse_error() {
            warn!(attempt, error = %err, "Extraction attempt returned unusable content");
            self.parse += 1;
            self.last_parse_preview = Some(match err {
                StructuringError::JsonParsing { reason, preview } => {
                    format!("{reason}; response starts: {preview}")
                }
                other => other.to_string(),
            });
        } else {
            warn!(attempt, error = %err, "Extraction attempt failed to reach the model");
            self.backend += 1;
            self.last_backend_error = Some(err.to_string());
        }
    }
}

pub struct ExtractionOrchestrator {
    extractor: StructuredExtractor,
    vision: Option<Arc<VisionFallbackRenderer>>,
    config: ExtractionConfig,
}

impl ExtractionOrchestrator {
    pub fn new(
        extractor: StructuredExtractor,
        vision: Option<Arc<VisionFallbackRenderer>>,
        config: ExtractionConfig,
    ) -> Self {
        Self {
            extractor,
            vision,
            config,
        }
    }

    /// Run text attempts over `document_text`, falling back to page images
    /// of `document` when no analytes were found.
    ///
    /// Without document bytes (text-only requests) the vision path is skipped.
    pub async fn run(
        &self,
        document_text: &str,
        document: Option<Arc<[u8]>>,
    ) -> Result<AdoptedExtraction, PipelineError> {
        let span = info_span!(
            "orchestrate_extraction",
            model = %self.extractor.model_name(),
            text_chars = document_text.chars().count(),
        );
        self.run_inner(document_text, document).instrument(span).await
    }

    async fn run_inner(
        &self,
        document_text: &str,
        document: Option<Arc<[u8]>>,
    ) -> Result<AdoptedExtraction, PipelineError> {
        let mut state = OrchestrationState::NotStarted;
        let mut best = BestCandidate::default();
        let mut failures = AttemptFailures::default();
        let mut attempts = 0;

        let content = ExtractionContent::Text(
            truncate_chars(document_text, self.config.max_text_chars).to_string(),
        );

        let mut comprehensive = false;
        for attempt in 1..=self.config.max_attempts {
            transition(&mut state, OrchestrationState::TextAttempting { attempt });
            attempts += 1;

            match self.extractor.extract(&content, self.config.seed).await {
                Ok(candidate) => {
                    let count = candidate.analyte_count();
                    let new_best = best.offer(candidate, ExtractionMethod::TextOnly);
                    if count == 0 {
                        failures.empty += 1;
                    }
                    info!(attempt, analytes = count, new_best, "Extraction attempt parsed");

                    if count >= self.config.comprehensive_threshold {
                        comprehensive = true;
                        break;
                    }
                }
                Err(e) => failures.record(attempt, e),
            }

            if attempt < self.config.max_attempts {
                tokio::time::sleep(self.config.retry_delay).await;
            }
        }

        let after_text = if comprehensive {
            OrchestrationState::TextSucceededComprehensive
        } else if best.count() > 0 {
            OrchestrationState::TextSucceededPartial
        } else {
            OrchestrationState::TextExhausted
        };
        transition(&mut state, after_text);

        if best.count() == 0 {
            match (&self.vision, document) {
                (Some(vision), Some(bytes)) => {
                    transition(&mut state, OrchestrationState::VisionAttempting);
                    attempts += self.attempt_vision(vision, bytes, &mut best, &mut failures).await;
                }
                _ => debug!("Vision fallback unavailable for this request"),
            }
        }

        match (best.result, best.method) {
            (Some(result), Some(method)) => {
                transition(&mut state, OrchestrationState::Done);
                info!(
                    analytes = result.analyte_count(),
                    method = %method,
                    attempts,
                    "Extraction adopted"
                );
                Ok(AdoptedExtraction {
                    result,
                    method,
                    attempts,
                })
            }
            _ => {
                transition(&mut state, OrchestrationState::Failed);
                if failures.parse == 0 && failures.empty == 0 && failures.backend > 0 {
                    Err(PipelineError::BackendUnavailable(
                        failures
                            .last_backend_error
                            .unwrap_or_else(|| "model endpoint unavailable".into()),
                    ))
                } else {
                    Err(PipelineError::ModelEmptyResponse {
                        details: failures.last_parse_preview,
                    })
                }
            }
        }
    }

    /// One vision attempt. Returns the number of model calls issued (0 or 1).
    async fn attempt_vision(
        &self,
        vision: &VisionFallbackRenderer,
        bytes: Arc<[u8]>,
        best: &mut BestCandidate,
        failures: &mut AttemptFailures,
    ) -> usize {
        let span = info_span!("vision_fallback");
        async {
            let pages = match vision.render_pages(bytes).await {
                Ok(pages) if !pages.is_empty() => pages,
                Ok(_) => {
                    warn!("No pages rendered, skipping vision extraction");
                    return 0;
                }
                Err(e) => {
                    warn!(error = %e, "Page rendering failed, skipping vision extraction");
                    return 0;
                }
            };

            let content = ExtractionContent::Images(pages);
            match self.extractor.extract(&content, self.config.seed).await {
                Ok(candidate) => {
                    let count = candidate.analyte_count();
                    let adopted = best.offer(candidate, ExtractionMethod::VisionFallback);
                    if count == 0 {
                        failures.empty += 1;
                    }
                    info!(analytes = count, adopted, "Vision extraction parsed");
                }
                Err(e) => failures.record(self.config.max_attempts + 1, e),
            }
            1
        }
        .instrument(span)
        .await
    }
}

fn transition(state: &mut OrchestrationState, next: OrchestrationState) {
    debug!(from = ?*state, to = ?next, "Orchestration state");
    *state = next;
}

/// Leading `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
