//! Generative model interface
//!
//! Provides a unified completion interface for:
//! - OpenAI-compatible chat completion endpoints (OpenAI, Ollama, llama.cpp server, ...)
//! - An offline model that answers from the supplied context without any network call,
//!   and summarizes with the leading lines of the text

use crate::config::ModelConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::synthesizer::{ANSWER_HEADER, CONTEXT_HEADER, QUESTION_HEADER, SUMMARY_HEADER, TEXT_HEADER};

/// Trait for text completion
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Complete a prompt, returning the generated text
    async fn complete(&self, prompt: &str) -> Result<String>;

    /// Get the model name
    fn name(&self) -> &str;
}

/// Client for any endpoint speaking the OpenAI chat completions protocol
pub struct OpenAiCompatibleModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: Option<String>,
    model: String,
    temperature: f32,
    max_tokens: usize,
    timeout_ms: u64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

impl OpenAiCompatibleModel {
    /// Create a new client from configuration
    pub fn new(config: &ModelConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: config.endpoint.clone(),
            api_key: config.api_key.clone().filter(|k| !k.is_empty()),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            timeout_ms: config.timeout_secs * 1000,
        })
    }

    fn transport_error(&self, err: reqwest::Error) -> AppError {
        if err.is_timeout() {
            return AppError::Timeout {
                timeout_ms: self.timeout_ms,
            };
        }
        if err.is_connect() || err.is_request() || err.is_body() {
            return AppError::Model {
                retryable: true,
                message: format!("Request failed: {}", err),
            };
        }
        AppError::HttpClient(err)
    }
}

/// 408, 429 and 5xx are worth another attempt; other failures are final
fn is_retryable_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

#[async_trait]
impl ModelClient for OpenAiCompatibleModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let mut builder = self.client.post(&self.endpoint).json(&request);
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| self.transport_error(e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AppError::Model {
                message: format!("Model API error {}: {}", status, body),
                retryable: is_retryable_status(status),
            });
        }

        let chat: ChatResponse = response.json().await?;

        chat.choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| AppError::Model {
                message: "Empty response from model".to_string(),
                retryable: false,
            })
    }

    fn name(&self) -> &str {
        &self.model
    }
}

/// Offline model: answers with the leading lines of the prompt's context and
/// summarizes with the leading lines of the text
pub struct OfflineModel {
    max_lines: usize,
}

impl OfflineModel {
    pub fn new(max_lines: usize) -> Self {
        Self { max_lines }
    }

    fn section<'a>(prompt: &'a str, header: &str, next: &str) -> Option<&'a str> {
        let start = prompt.find(header)? + header.len();
        let rest = &prompt[start..];
        let end = rest.find(next).unwrap_or(rest.len());
        Some(rest[..end].trim())
    }

    /// Text of a summary prompt; `None` for answer prompts
    fn summary_source(prompt: &str) -> Option<&str> {
        let body = prompt.trim_end().strip_suffix(SUMMARY_HEADER)?;
        let start = body.find(TEXT_HEADER)? + TEXT_HEADER.len();
        Some(body[start..].trim())
    }
}

impl Default for OfflineModel {
    fn default() -> Self {
        Self::new(5)
    }
}

#[async_trait]
impl ModelClient for OfflineModel {
    async fn complete(&self, prompt: &str) -> Result<String> {
        if let Some(text) = Self::summary_source(prompt) {
            let lines: Vec<&str> = text.lines().take(self.max_lines).collect();
            return Ok(lines.join("\n"));
        }

        let question = Self::section(prompt, QUESTION_HEADER, ANSWER_HEADER).unwrap_or("");
        let context = Self::section(prompt, CONTEXT_HEADER, QUESTION_HEADER).unwrap_or("");

        if context.is_empty() {
            return Ok(format!(
                "No passages from your library were available for \"{}\". \
                 Configure a model provider for free-form answers.",
                question
            ));
        }

        let excerpt: Vec<&str> = context
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .take(self.max_lines)
            .collect();

        Ok(format!(
            "Relevant passages for \"{}\":\n\n{}",
            question,
            excerpt.join("\n")
        ))
    }

    fn name(&self) -> &str {
        "offline"
    }
}

/// Create a model client based on configuration
pub fn create_model(config: &ModelConfig) -> Result<Arc<dyn ModelClient>> {
    match config.provider.as_str() {
        "openai" => Ok(Arc::new(OpenAiCompatibleModel::new(config)?)),
        "offline" => Ok(Arc::new(OfflineModel::default())),
        other => {
            tracing::warn!(provider = other, "Unknown model provider, using offline model");
            Ok(Arc::new(OfflineModel::default()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::synthesizer::{build_prompt, build_summary_prompt};

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(StatusCode::TOO_MANY_REQUESTS));
        assert!(is_retryable_status(StatusCode::BAD_GATEWAY));
        assert!(is_retryable_status(StatusCode::REQUEST_TIMEOUT));
        assert!(!is_retryable_status(StatusCode::UNAUTHORIZED));
        assert!(!is_retryable_status(StatusCode::BAD_REQUEST));
    }

    #[tokio::test]
    async fn test_offline_model_quotes_context() {
        let model = OfflineModel::new(2);
        let prompt = build_prompt("What is ownership?", "line one\nline two\nline three");

        let answer = model.complete(&prompt).await.unwrap();

        assert!(answer.contains("What is ownership?"));
        assert!(answer.contains("line one\nline two"));
        assert!(!answer.contains("line three"));
    }

    #[tokio::test]
    async fn test_offline_model_without_context() {
        let model = OfflineModel::default();
        let prompt = build_prompt("What is ownership?", "");

        let answer = model.complete(&prompt).await.unwrap();

        assert!(answer.starts_with("No passages"));
    }

    #[test]
    fn test_unclassified_transport_error_is_upstream() {
        let model = OpenAiCompatibleModel::new(&ModelConfig::default()).unwrap();
        let err = reqwest::Client::new().get("not a url").build().unwrap_err();

        let mapped = model.transport_error(err);

        assert!(matches!(mapped, AppError::HttpClient(_)));
        assert_eq!(mapped.code(), crate::errors::ErrorCode::UpstreamError);
        assert_eq!(mapped.status_code(), StatusCode::BAD_GATEWAY);
        assert!(!mapped.is_retryable());
    }

    #[tokio::test]
    async fn test_offline_summary_keeps_leading_lines() {
        let model = OfflineModel::default();
        let text: Vec<String> = (1..=8).map(|i| format!("line {}", i)).collect();
        let prompt = build_summary_prompt(&text.join("\n"));

        let summary = model.complete(&prompt).await.unwrap();

        assert_eq!(summary, "line 1\nline 2\nline 3\nline 4\nline 5");
    }

    #[test]
    fn test_create_model_by_provider() {
        let mut config = ModelConfig::default();
        assert_eq!(create_model(&config).unwrap().name(), "offline");

        config.provider = "openai".into();
        config.model = "llama3".into();
        assert_eq!(create_model(&config).unwrap().name(), "llama3");

        config.provider = "unknown".into();
        assert_eq!(create_model(&config).unwrap().name(), "offline");
    }
}
