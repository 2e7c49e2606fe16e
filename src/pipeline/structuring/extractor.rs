use std::sync::Arc;

use tracing::debug;

use super::parser::{parse_extraction_response, preview, PREVIEW_CHARS};
use super::prompt::{EXTRACTION_SYSTEM_PROMPT, VISION_USER_PROMPT};
use super::types::{CompletionRequest, ExtractionContent, LlmClient, UserContent};
use super::StructuringError;
use crate::models::RawExtractionResult;

/// One structured extraction call: content in, raw candidate result out.
///
/// Parse failures are returned to the caller, never retried here.
pub struct StructuredExtractor {
    client: Arc<dyn LlmClient>,
    temperature: f32,
}

impl StructuredExtractor {
    pub fn new(client: Arc<dyn LlmClient>, temperature: f32) -> Self {
        Self {
            client,
            temperature,
        }
    }

    pub fn model_name(&self) -> &str {
        self.client.model_name()
    }

    pub async fn extract(
        &self,
        content: &ExtractionContent,
        seed: u64,
    ) -> Result<RawExtractionResult, StructuringError> {
        let request = build_extraction_request(content, self.temperature, seed);
        let response = self.client.complete(&request).await?;
        debug!(
            chars = response.len(),
            preview = %preview(&response, PREVIEW_CHARS),
            "Extraction response"
        );
        parse_extraction_response(&response)
    }
}

pub fn build_extraction_request(
    content: &ExtractionContent,
    temperature: f32,
    seed: u64,
) -> CompletionRequest {
    let user = match content {
        ExtractionContent::Text(text) => UserContent::Text(text.clone()),
        ExtractionContent::Images(pages) => UserContent::TextWithImages {
            text: VISION_USER_PROMPT.to_string(),
            image_urls: pages.iter().map(|p| p.data_url.clone()).collect(),
        },
    };
    CompletionRequest {
        system: EXTRACTION_SYSTEM_PROMPT.to_string(),
        user,
        temperature,
        seed: Some(seed),
        json_object: true,
    }
}
