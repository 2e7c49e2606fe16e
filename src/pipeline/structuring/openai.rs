use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use super::types::{CompletionRequest, LlmClient, UserContent};
use super::StructuringError;
use crate::config::ModelConfig;

/// Chat-completions client for OpenAI-compatible endpoints.
pub struct OpenAiClient {
    base_url: String,
    api_key: Option<String>,
    model: String,
    client: reqwest::Client,
    timeout_secs: u64,
}

impl OpenAiClient {
    pub fn new(config: &ModelConfig, timeout: Duration) -> Result<Self, StructuringError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| StructuringError::HttpClient(e.to_string()))?;

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            client,
            timeout_secs: timeout.as_secs(),
        })
    }

    fn request_body(&self, request: &CompletionRequest) -> serde_json::Value {
        let user_content = match &request.user {
            UserContent::Text(text) => json!(text),
            UserContent::TextWithImages { text, image_urls } => {
                let mut parts = vec![json!({"type": "text", "text": text})];
                parts.extend(image_urls.iter().map(|url| {
                    json!({"type": "image_url", "image_url": {"url": url}})
                }));
                json!(parts)
            }
        };

        let mut body = json!({
            "model": self.model,
            "messages": [
                {"role": "system", "content": request.system},
                {"role": "user", "content": user_content},
            ],
            "temperature": request.temperature,
        });
        if let Some(seed) = request.seed {
            body["seed"] = json!(seed);
        }
        if request.json_object {
            body["response_format"] = json!({"type": "json_object"});
        }
        body
    }
}

/// Subset of the chat-completions response we read.
#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

#[async_trait]
impl LlmClient for OpenAiClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, StructuringError> {
        let api_key = self
            .api_key
            .as_deref()
            .ok_or(StructuringError::MissingApiKey)?;
        let url = format!("{}/chat/completions", self.base_url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&self.request_body(request))
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    StructuringError::Connection(self.base_url.clone())
                } else if e.is_timeout() {
                    StructuringError::Timeout(self.timeout_secs)
                } else {
                    StructuringError::HttpClient(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StructuringError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| StructuringError::ResponseParsing(e.to_string()))?;

        let content = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(StructuringError::EmptyResponse)?;

        debug!(model = %self.model, chars = content.len(), "Model response received");
        Ok(content)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

// ── Mock for testing ──────────────────────────────────────

/// One scripted outcome of [`MockLlmClient`].
#[derive(Debug, Clone)]
pub enum MockReply {
    Content(String),
    ConnectionError,
    ApiError(u16),
}

/// Mock LLM client replaying a script of replies, one per call. The last
/// reply repeats once the script is exhausted. Requests are recorded.
pub struct MockLlmClient {
    replies: Vec<MockReply>,
    call_count: AtomicUsize,
    requests: Mutex<Vec<CompletionRequest>>,
}

impl MockLlmClient {
    /// Always answers with `response`.
    pub fn new(response: &str) -> Self {
        Self::scripted(vec![MockReply::Content(response.to_string())])
    }

    pub fn scripted(replies: Vec<MockReply>) -> Self {
        Self {
            replies,
            call_count: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn call_count(&self) -> usize {
        self.call_count.load(Ordering::SeqCst)
    }

    /// Snapshot of every request received so far.
    pub fn requests(&self) -> Vec<CompletionRequest> {
        self.requests
            .lock()
            .map(|r| r.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl LlmClient for MockLlmClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, StructuringError> {
        let n = self.call_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut requests) = self.requests.lock() {
            requests.push(request.clone());
        }
        let reply = self
            .replies
            .get(n)
            .or_else(|| self.replies.last())
            .cloned()
            .unwrap_or(MockReply::ConnectionError);
        match reply {
            MockReply::Content(content) => Ok(content),
            MockReply::ConnectionError => Err(StructuringError::Connection("mock".into())),
            MockReply::ApiError(status) => Err(StructuringError::Api {
                status,
                body: "mock error".into(),
            }),
        }
    }

    fn model_name(&self) -> &str {
        "mock"
    }
}
