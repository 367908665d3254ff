//! LLM integration module.
//!
//! Provides an OpenAI-compatible client, the [`LanguageModel`] capability
//! the backends are written against, and the prompt templates they use.

mod client;
mod prompts;

pub use client::{LanguageModel, LlmClient, LlmResponse, Message, Role, TokenUsage};
pub use prompts::Prompts;

pub(crate) use client::error_detail;
