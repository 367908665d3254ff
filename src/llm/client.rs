//! OpenAI-compatible LLM client.
//!
//! Works with any endpoint that serves `/v1/chat/completions`.

use crate::config::LlmConfig;
use crate::error::{RagEvalError, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Text completion capability consumed by retrieval and answering code.
///
/// Implemented by [`LlmClient`]; tests substitute scripted models.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete a single user prompt and return the raw model text.
    async fn complete(&self, prompt: &str) -> Result<String>;
}

/// Message role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// A message in the conversation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [Message],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
    #[serde(default)]
    usage: Option<TokenUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Error body returned by OpenAI-compatible endpoints.
#[derive(Debug, Deserialize)]
struct ApiError {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

/// The `error.message` of an API error body, or the body itself.
pub(crate) fn error_detail(body: String) -> String {
    serde_json::from_str::<ApiError>(&body)
        .map(|e| e.error.message)
        .unwrap_or(body)
}

/// Model output plus metadata.
#[derive(Debug)]
pub struct LlmResponse {
    pub content: String,
    /// `"length"` means the reply was cut off by `max_tokens`.
    pub finish_reason: Option<String>,
    pub usage: Option<TokenUsage>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct TokenUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// OpenAI-compatible chat completion client.
#[derive(Clone)]
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Self {
        Self {
            client: Client::new(),
            config,
        }
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.api_base.trim_end_matches('/')
        )
    }

    /// Send one chat completion request. No retries.
    pub async fn chat(&self, messages: &[Message]) -> Result<LlmResponse> {
        let response = self
            .client
            .post(self.endpoint())
            .bearer_auth(&self.config.api_key)
            .json(&ChatRequest {
                model: &self.config.model,
                messages,
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            })
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(RagEvalError::LlmApi(format!(
                "request failed ({}): {}",
                status,
                error_detail(body)
            )));
        }

        let response = parse_completion(&body)?;
        if response.finish_reason.as_deref() == Some("length") {
            warn!(model = %self.config.model, "completion truncated at max_tokens");
        }
        if let Some(usage) = response.usage {
            debug!(
                prompt_tokens = usage.prompt_tokens,
                completion_tokens = usage.completion_tokens,
                "chat completion"
            );
        }
        Ok(response)
    }

    /// Single user message with optional system prompt.
    pub async fn ask(&self, system: Option<&str>, user: &str) -> Result<String> {
        let messages: Vec<Message> = system
            .map(|s| Message::new(Role::System, s))
            .into_iter()
            .chain([Message::new(Role::User, user)])
            .collect();
        Ok(self.chat(&messages).await?.content)
    }

    /// Test connectivity to the API.
    pub async fn test_connection(&self) -> Result<()> {
        let reply = self.ask(None, "Say 'hello' and nothing else.").await?;
        if reply.to_lowercase().contains("hello") {
            Ok(())
        } else {
            Err(RagEvalError::LlmApi(format!("Unexpected response: {}", reply)))
        }
    }
}

#[async_trait]
impl LanguageModel for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.ask(None, prompt).await
    }
}

/// Decode a successful chat completion body. A `null` content is an
/// empty answer, not an error.
fn parse_completion(body: &str) -> Result<LlmResponse> {
    let ChatResponse { choices, usage } = serde_json::from_str(body)?;
    let choice = choices
        .into_iter()
        .next()
        .ok_or_else(|| RagEvalError::LlmApi("No choices in response".to_string()))?;

    Ok(LlmResponse {
        content: choice.message.content.unwrap_or_default(),
        finish_reason: choice.finish_reason,
        usage,
    })
}
