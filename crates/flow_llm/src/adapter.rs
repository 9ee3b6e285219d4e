//! HTTP adapters for hosted completion APIs.
//!
//! Gemini and Anthropic use their native APIs; OpenAI, OpenRouter and Groq
//! share the chat-completions protocol and differ only in base URL.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LlmError, LlmResult};
use crate::provider::CompletionProvider;
use crate::types::{Completion, CompletionRequest, ProviderKind};

/// Maximum attempts per request, including the first.
const MAX_RETRIES: u32 = 3;

/// Base of the retry backoff. Attempt `n` waits `base * 2^n`.
const RETRY_BACKOFF: Duration = Duration::from_secs(1);

/// Adapter for one provider and model.
pub struct LlmAdapter {
    kind: ProviderKind,
    api_key: String,
    model: String,
    base_url: String,
    retry_backoff: Duration,
    client: reqwest::Client,
}

impl LlmAdapter {
    /// Create an adapter with explicit configuration
    pub fn new(kind: ProviderKind, api_key: impl Into<String>, model: Option<String>) -> Self {
        Self {
            kind,
            api_key: api_key.into(),
            model: model.unwrap_or_else(|| kind.default_model().to_string()),
            base_url: kind.default_base_url().to_string(),
            retry_backoff: RETRY_BACKOFF,
            client: reqwest::Client::new(),
        }
    }

    /// Create an adapter for `kind` from its environment variables.
    ///
    /// The first non-empty key variable wins; the model variable overrides
    /// the default model.
    pub fn from_env(kind: ProviderKind) -> LlmResult<Self> {
        let api_key = kind
            .key_vars()
            .iter()
            .filter_map(|var| std::env::var(var).ok())
            .find(|key| !key.trim().is_empty())
            .ok_or(LlmError::NotConfigured)?;
        let model = std::env::var(kind.model_var()).ok().filter(|m| !m.trim().is_empty());
        Ok(Self::new(kind, api_key, model))
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Scale the retry backoff. The default base gives waits of 2s, then 4s.
    pub fn with_retry_backoff(mut self, base: Duration) -> Self {
        self.retry_backoff = base;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .unwrap_or_else(|_| reqwest::Client::new());
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Send with retries on network errors, 5xx and 429.
    /// Backoff doubles per attempt: 2s, then 4s.
    async fn send_with_retry<F>(&self, build: F) -> LlmResult<reqwest::Response>
    where
        F: Fn() -> reqwest::RequestBuilder,
    {
        let mut last_error = None;

        for attempt in 0..MAX_RETRIES {
            if attempt > 0 {
                tokio::time::sleep(self.backoff(attempt)).await;
            }

            let response = match build().send().await {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = Some(LlmError::Network(e.to_string()));
                    continue;
                }
            };

            let status = response.status();
            if status.is_success() {
                return Ok(response);
            }

            let body = response.text().await.unwrap_or_default();
            let error = LlmError::Api {
                provider: self.kind.to_string(),
                status: status.as_u16(),
                body,
            };
            if !error.is_transient() {
                return Err(error);
            }
            debug!(
                "{} request failed (attempt {}/{}): {}",
                self.kind,
                attempt + 1,
                MAX_RETRIES,
                error
            );
            last_error = Some(error);
        }

        Err(last_error.unwrap_or_else(|| LlmError::Network("Max retries exceeded".to_string())))
    }

    /// Wait before retry number `attempt` (1-based).
    fn backoff(&self, attempt: u32) -> Duration {
        self.retry_backoff * (1u32 << attempt)
    }

    fn invalid(&self, message: impl Into<String>) -> LlmError {
        LlmError::InvalidResponse {
            provider: self.kind.to_string(),
            message: message.into(),
        }
    }

    async fn complete_gemini(&self, request: &CompletionRequest) -> LlmResult<Completion> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);

        let mut parts = vec![GeminiPart::Text {
            text: request.prompt.clone(),
        }];
        if let Some(image) = &request.image {
            parts.push(GeminiPart::InlineData {
                inline_data: GeminiInlineData {
                    mime_type: image.mime_type.clone(),
                    data: image.data.clone(),
                },
            });
        }

        let body = GeminiRequest {
            contents: vec![GeminiContent { parts }],
            system_instruction: request.system.as_ref().map(|text| GeminiContent {
                parts: vec![GeminiPart::Text { text: text.clone() }],
            }),
            generation_config: GeminiGenerationConfig {
                temperature: request.temperature,
                max_output_tokens: request.max_tokens,
            },
        };

        let response = self
            .send_with_retry(|| {
                self.client
                    .post(&url)
                    .query(&[("key", self.api_key.as_str())])
                    .json(&body)
            })
            .await?;

        let result: GeminiResponse = response
            .json()
            .await
            .map_err(|e| self.invalid(format!("Failed to parse response: {}", e)))?;

        let content = result
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .map(|c| {
                c.parts
                    .iter()
                    .filter_map(|p| p.text.as_deref())
                    .collect::<Vec<_>>()
                    .join("")
            })
            .filter(|text| !text.is_empty())
            .ok_or_else(|| self.invalid("No candidates in response"))?;

        let (input_tokens, output_tokens) = result
            .usage_metadata
            .map(|u| (u.prompt_token_count, u.candidates_token_count))
            .unwrap_or((0, 0));

        Ok(Completion {
            content,
            input_tokens,
            output_tokens,
            model: self.model.clone(),
            provider: self.kind,
        })
    }

    async fn complete_openai_compatible(&self, request: &CompletionRequest) -> LlmResult<Completion> {
        let url = format!("{}/chat/completions", self.base_url);

        let mut messages = Vec::new();
        if let Some(system) = &request.system {
            messages.push(OpenAIMessage {
                role: "system".to_string(),
                content: OpenAIContent::Text(system.clone()),
            });
        }
        let user_content = match &request.image {
            Some(image) => OpenAIContent::Parts(vec![
                OpenAIPart::Text {
                    text: request.prompt.clone(),
                },
                OpenAIPart::ImageUrl {
                    image_url: OpenAIImageUrl { url: image.data_url() },
                },
            ]),
            None => OpenAIContent::Text(request.prompt.clone()),
        };
        messages.push(OpenAIMessage {
            role: "user".to_string(),
            content: user_content,
        });

        // OpenAI renamed the token limit; the compatible APIs still use max_tokens.
        let (max_tokens, max_completion_tokens) = if self.kind == ProviderKind::OpenAI {
            (None, Some(request.max_tokens))
        } else {
            (Some(request.max_tokens), None)
        };
        let body = OpenAIRequest {
            model: self.model.clone(),
            messages,
            temperature: request.temperature,
            max_tokens,
            max_completion_tokens,
        };

        let response = self
            .send_with_retry(|| {
                self.client
                    .post(&url)
                    .header("Authorization", format!("Bearer {}", self.api_key))
                    .header("Content-Type", "application/json")
                    .json(&body)
            })
            .await?;

        let result: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| self.invalid(format!("Failed to parse response: {}", e)))?;

        let content = result
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| self.invalid("No choices in response"))?;

        let (input_tokens, output_tokens) = result
            .usage
            .map(|u| (u.prompt_tokens, u.completion_tokens))
            .unwrap_or((0, 0));

        Ok(Completion {
            content,
            input_tokens,
            output_tokens,
            model: self.model.clone(),
            provider: self.kind,
        })
    }

    async fn complete_anthropic(&self, request: &CompletionRequest) -> LlmResult<Completion> {
        let url = format!("{}/messages", self.base_url);

        let mut blocks = Vec::new();
        if let Some(image) = &request.image {
            blocks.push(AnthropicBlock::Image {
                source: AnthropicImageSource {
                    source_type: "base64".to_string(),
                    media_type: image.mime_type.clone(),
                    data: image.data.clone(),
                },
            });
        }
        blocks.push(AnthropicBlock::Text {
            text: request.prompt.clone(),
        });

        let body = AnthropicRequest {
            model: self.model.clone(),
            max_tokens: request.max_tokens,
            system: request.system.clone(),
            temperature: request.temperature,
            messages: vec![AnthropicMessage {
                role: "user".to_string(),
                content: blocks,
            }],
        };

        let response = self
            .send_with_retry(|| {
                self.client
                    .post(&url)
                    .header("x-api-key", &self.api_key)
                    .header("anthropic-version", "2023-06-01")
                    .header("Content-Type", "application/json")
                    .json(&body)
            })
            .await?;

        let result: AnthropicResponse = response
            .json()
            .await
            .map_err(|e| self.invalid(format!("Failed to parse response: {}", e)))?;

        let content = result
            .content
            .iter()
            .filter_map(|c| c.text.as_deref())
            .collect::<Vec<_>>()
            .join("");
        if content.is_empty() {
            return Err(self.invalid("No text content in response"));
        }

        let (input_tokens, output_tokens) = result
            .usage
            .map(|u| (u.input_tokens, u.output_tokens))
            .unwrap_or((0, 0));

        Ok(Completion {
            content,
            input_tokens,
            output_tokens,
            model: self.model.clone(),
            provider: self.kind,
        })
    }
}

#[async_trait]
impl CompletionProvider for LlmAdapter {
    fn kind(&self) -> ProviderKind {
        self.kind
    }

    fn model(&self) -> String {
        self.model.clone()
    }

    async fn complete(&self, request: &CompletionRequest) -> LlmResult<Completion> {
        match self.kind {
            ProviderKind::Gemini => self.complete_gemini(request).await,
            ProviderKind::Anthropic => self.complete_anthropic(request).await,
            ProviderKind::OpenRouter | ProviderKind::Groq | ProviderKind::OpenAI => {
                self.complete_openai_compatible(request).await
            }
        }
    }
}

// Gemini API types
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize)]
struct GeminiContent {
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum GeminiPart {
    Text { text: String },
    InlineData { inline_data: GeminiInlineData },
}

#[derive(Debug, Serialize)]
struct GeminiInlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
    usage_metadata: Option<GeminiUsage>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiResponseContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponseContent {
    #[serde(default)]
    parts: Vec<GeminiResponsePart>,
}

#[derive(Debug, Deserialize)]
struct GeminiResponsePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GeminiUsage {
    #[serde(default)]
    prompt_token_count: u64,
    #[serde(default)]
    candidates_token_count: u64,
}

// OpenAI-compatible API types
#[derive(Debug, Serialize)]
struct OpenAIRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: OpenAIContent,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum OpenAIContent {
    Text(String),
    Parts(Vec<OpenAIPart>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum OpenAIPart {
    Text { text: String },
    ImageUrl { image_url: OpenAIImageUrl },
}

#[derive(Debug, Serialize)]
struct OpenAIImageUrl {
    url: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u64,
    completion_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    content: Option<String>,
}

// Anthropic API types
#[derive(Debug, Serialize)]
struct AnthropicRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    messages: Vec<AnthropicMessage>,
}

#[derive(Debug, Serialize)]
struct AnthropicMessage {
    role: String,
    content: Vec<AnthropicBlock>,
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum AnthropicBlock {
    Text { text: String },
    Image { source: AnthropicImageSource },
}

#[derive(Debug, Serialize)]
struct AnthropicImageSource {
    #[serde(rename = "type")]
    source_type: String,
    media_type: String,
    data: String,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    content: Vec<AnthropicContent>,
    usage: Option<AnthropicUsage>,
}

#[derive(Debug, Deserialize)]
struct AnthropicUsage {
    input_tokens: u64,
    output_tokens: u64,
}

#[derive(Debug, Deserialize)]
struct AnthropicContent {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ImageInput;

    #[test]
    fn test_default_models() {
        let gemini = LlmAdapter::new(ProviderKind::Gemini, "key", None);
        assert_eq!(gemini.model(), "gemini-2.0-flash-lite");

        let groq = LlmAdapter::new(ProviderKind::Groq, "key", None);
        assert_eq!(groq.model(), "llama-3.3-70b-versatile");
        assert_eq!(groq.base_url(), "https://api.groq.com/openai/v1");
    }

    #[test]
    fn test_custom_model_and_base_url() {
        let adapter = LlmAdapter::new(ProviderKind::OpenAI, "key", Some("gpt-4.1".to_string()))
            .with_base_url("http://localhost:9000/v1/");
        assert_eq!(adapter.model(), "gpt-4.1");
        assert_eq!(adapter.base_url(), "http://localhost:9000/v1");
    }

    #[test]
    fn test_default_backoff_is_two_then_four_seconds() {
        let adapter = LlmAdapter::new(ProviderKind::OpenAI, "key", None);
        assert_eq!(adapter.backoff(1), Duration::from_secs(2));
        assert_eq!(adapter.backoff(2), Duration::from_secs(4));

        let fast = adapter.with_retry_backoff(Duration::from_millis(5));
        assert_eq!(fast.backoff(2), Duration::from_millis(20));
    }

    #[test]
    fn test_gemini_request_shape() {
        let body = GeminiRequest {
            contents: vec![GeminiContent {
                parts: vec![
                    GeminiPart::Text {
                        text: "hi".to_string(),
                    },
                    GeminiPart::InlineData {
                        inline_data: GeminiInlineData {
                            mime_type: "image/png".to_string(),
                            data: "AAAA".to_string(),
                        },
                    },
                ],
            }],
            system_instruction: None,
            generation_config: GeminiGenerationConfig {
                temperature: Some(0.5),
                max_output_tokens: 100,
            },
        };
        let value = serde_json::to_value(&body).unwrap();
        assert_eq!(value["contents"][0]["parts"][0]["text"], "hi");
        assert_eq!(value["contents"][0]["parts"][1]["inline_data"]["mime_type"], "image/png");
        assert_eq!(value["generationConfig"]["maxOutputTokens"], 100);
        assert!(value.get("systemInstruction").is_none());
    }

    #[test]
    fn test_openai_image_part_shape() {
        let image = ImageInput::new("image/jpeg", "Zm9v");
        let content = OpenAIContent::Parts(vec![OpenAIPart::ImageUrl {
            image_url: OpenAIImageUrl { url: image.data_url() },
        }]);
        let value = serde_json::to_value(&content).unwrap();
        assert_eq!(value[0]["type"], "image_url");
        assert_eq!(value[0]["image_url"]["url"], "data:image/jpeg;base64,Zm9v");
    }
}
