//! # flow_llm
//!
//! Hosted LLM access for FlowMaster.
//!
//! - **Adapters**: Gemini, OpenRouter, Groq, OpenAI and Anthropic over HTTP,
//!   each retrying transient failures with exponential backoff
//! - **Provider chain**: tries configured providers in order and reports
//!   every failure when none succeeds
//!
//! Providers are optional. With no API keys set the chain is empty and
//! callers fall back to deterministic content.

pub mod adapter;
pub mod error;
pub mod provider;
pub mod types;

pub use adapter::LlmAdapter;
pub use error::{LlmError, LlmResult};
pub use provider::{CompletionProvider, LlmSettings, ProviderChain};
pub use types::{Completion, CompletionRequest, ImageInput, ProviderKind};
