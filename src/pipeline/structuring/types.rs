use async_trait::async_trait;

use super::StructuringError;
use crate::pipeline::extraction::PageImage;

/// What a structured extraction call looks at.
#[derive(Debug, Clone, PartialEq)]
pub enum ExtractionContent {
    Text(String),
    Images(Vec<PageImage>),
}

impl ExtractionContent {
    pub fn kind(&self) -> &'static str {
        match self {
            ExtractionContent::Text(_) => "text",
            ExtractionContent::Images(_) => "images",
        }
    }
}

/// User turn of a chat completion: plain text, or text followed by images.
#[derive(Debug, Clone, PartialEq)]
pub enum UserContent {
    Text(String),
    TextWithImages { text: String, image_urls: Vec<String> },
}

/// Provider-neutral chat completion request.
#[derive(Debug, Clone, PartialEq)]
pub struct CompletionRequest {
    pub system: String,
    pub user: UserContent,
    pub temperature: f32,
    pub seed: Option<u64>,
    /// Ask the endpoint to constrain output to a JSON object.
    pub json_object: bool,
}

/// LLM client abstraction (allows mocking for tests).
/// Returns the raw assistant message text.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, StructuringError>;

    /// Model identifier, for logs.
    fn model_name(&self) -> &str;
}
