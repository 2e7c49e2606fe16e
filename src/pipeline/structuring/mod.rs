pub mod extractor;
pub mod openai;
pub mod parser;
pub mod prompt;
pub mod types;

pub use extractor::*;
pub use openai::*;
pub use parser::*;
pub use prompt::*;
pub use types::*;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StructuringError {
    #[error("Model endpoint unreachable at {0}")]
    Connection(String),

    #[error("Model endpoint returned error (status {status}): {body}")]
    Api { status: u16, body: String },

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Model request timed out after {0}s")]
    Timeout(u64),

    #[error("OPENAI_API_KEY is not configured")]
    MissingApiKey,

    #[error("Model returned an empty response")]
    EmptyResponse,

    #[error("JSON parsing error: {reason}")]
    JsonParsing { reason: String, preview: String },

    #[error("Response parsing error: {0}")]
    ResponseParsing(String),
}

impl StructuringError {
    /// The endpoint answered but its content was unusable. Such failures
    /// count as a spent attempt rather than an unavailable backend.
    pub fn is_parse_error(&self) -> bool {
        matches!(
            self,
            StructuringError::EmptyResponse
                | StructuringError::JsonParsing { .. }
                | StructuringError::ResponseParsing(_)
        )
    }
}
