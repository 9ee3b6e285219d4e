//! Provider trait and the fallback chain.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::adapter::LlmAdapter;
use crate::error::{LlmError, LlmResult};
use crate::types::{Completion, CompletionRequest, ProviderKind};

/// A hosted completion API.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CompletionProvider: Send + Sync {
    fn kind(&self) -> ProviderKind;

    fn model(&self) -> String;

    async fn complete(&self, request: &CompletionRequest) -> LlmResult<Completion>;
}

/// Provider selection settings, usually read from the `[llm]` config table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LlmSettings {
    /// Providers to try, in order. Providers without an API key are skipped.
    pub order: Vec<ProviderKind>,
    /// Model overrides keyed by provider name.
    pub models: BTreeMap<String, String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LlmSettings {
    fn default() -> Self {
        Self {
            order: ProviderKind::DEFAULT_ORDER.to_vec(),
            models: BTreeMap::new(),
            timeout_secs: 60,
        }
    }
}

/// Ordered providers tried until one succeeds.
#[derive(Clone, Default)]
pub struct ProviderChain {
    providers: Vec<Arc<dyn CompletionProvider>>,
}

impl ProviderChain {
    pub fn new(providers: Vec<Arc<dyn CompletionProvider>>) -> Self {
        Self { providers }
    }

    /// A chain with no providers. Every call fails with [`LlmError::NotConfigured`].
    pub fn empty() -> Self {
        Self::default()
    }

    /// Build the chain from settings and API keys in the environment.
    pub fn from_settings(settings: &LlmSettings) -> Self {
        let timeout = Duration::from_secs(settings.timeout_secs.max(1));
        let mut providers: Vec<Arc<dyn CompletionProvider>> = Vec::new();

        for kind in &settings.order {
            match LlmAdapter::from_env(*kind) {
                Ok(adapter) => {
                    let adapter = match settings.models.get(kind.as_str()) {
                        Some(model) => adapter.with_model(model.clone()),
                        None => adapter,
                    };
                    let adapter = adapter.with_timeout(timeout);
                    debug!("Configured {} provider with model {}", kind, adapter.model());
                    providers.push(Arc::new(adapter));
                }
                Err(_) => debug!("Skipping {} provider: no API key", kind),
            }
        }

        if providers.is_empty() {
            info!("No LLM provider configured; using fallback content");
        }
        Self { providers }
    }

    pub fn with_provider(mut self, provider: Arc<dyn CompletionProvider>) -> Self {
        self.providers.push(provider);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    /// `kind:model` for each provider, in order.
    pub fn describe(&self) -> Vec<String> {
        self.providers
            .iter()
            .map(|p| format!("{}:{}", p.kind(), p.model()))
            .collect()
    }

    /// Try each provider in turn and return the first completion.
    pub async fn complete(&self, request: &CompletionRequest) -> LlmResult<Completion> {
        if self.providers.is_empty() {
            return Err(LlmError::NotConfigured);
        }

        let mut failures = Vec::new();
        for provider in &self.providers {
            match provider.complete(request).await {
                Ok(completion) => {
                    debug!(
                        "{} returned {} output tokens",
                        provider.kind(),
                        completion.output_tokens
                    );
                    return Ok(completion);
                }
                Err(e) => {
                    warn!("{} provider failed: {}", provider.kind(), e);
                    failures.push(format!("{}: {}", provider.kind(), e));
                }
            }
        }

        Err(LlmError::AllProvidersFailed(failures.join("; ")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(kind: ProviderKind, content: &str) -> Completion {
        Completion {
            content: content.to_string(),
            input_tokens: 1,
            output_tokens: 1,
            model: "m".to_string(),
            provider: kind,
        }
    }

    fn failing(kind: ProviderKind) -> MockCompletionProvider {
        let mut mock = MockCompletionProvider::new();
        mock.expect_kind().return_const(kind);
        mock.expect_model().returning(|| "m".to_string());
        mock.expect_complete().times(1).returning(move |_| {
            Err(LlmError::Api {
                provider: kind.to_string(),
                status: 503,
                body: "unavailable".to_string(),
            })
        });
        mock
    }

    #[tokio::test]
    async fn test_empty_chain_is_not_configured() {
        let chain = ProviderChain::empty();
        let err = chain.complete(&CompletionRequest::new("hi")).await.unwrap_err();
        assert!(matches!(err, LlmError::NotConfigured));
    }

    #[tokio::test]
    async fn test_falls_through_to_next_provider() {
        let mut second = MockCompletionProvider::new();
        second.expect_kind().return_const(ProviderKind::OpenRouter);
        second
            .expect_complete()
            .times(1)
            .returning(|_| Ok(completion(ProviderKind::OpenRouter, "{\"ok\":true}")));

        let providers: Vec<Arc<dyn CompletionProvider>> =
            vec![Arc::new(failing(ProviderKind::Gemini)), Arc::new(second)];
        let chain = ProviderChain::new(providers);
        let result = chain.complete(&CompletionRequest::new("hi")).await.unwrap();
        assert_eq!(result.provider, ProviderKind::OpenRouter);
        assert_eq!(result.content, "{\"ok\":true}");
    }

    #[tokio::test]
    async fn test_all_failures_are_reported() {
        let providers: Vec<Arc<dyn CompletionProvider>> = vec![
            Arc::new(failing(ProviderKind::Gemini)),
            Arc::new(failing(ProviderKind::Groq)),
        ];
        let chain = ProviderChain::new(providers);
        let err = chain.complete(&CompletionRequest::new("hi")).await.unwrap_err();
        match err {
            LlmError::AllProvidersFailed(msg) => {
                assert!(msg.contains("gemini"));
                assert!(msg.contains("groq"));
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[test]
    fn test_provider_parse_and_settings_defaults() {
        assert_eq!("Google".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert!("mistral".parse::<ProviderKind>().is_err());

        let settings: LlmSettings = serde_json::from_str(r#"{"order": ["groq", "openai"]}"#).unwrap();
        assert_eq!(settings.order, vec![ProviderKind::Groq, ProviderKind::OpenAI]);
        assert_eq!(settings.timeout_secs, 60);
    }
}
