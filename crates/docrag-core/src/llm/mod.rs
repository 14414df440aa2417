//! LLM client contract and the three stages built on top of it:
//! [`optimizer::QueryOptimizer`] (0a), [`router::QueryRouter`] (0b), and
//! [`reranker::LlmReranker`] (1.5).
//!
//! The contract itself — `invoke(model, system, messages, max_tokens,
//! temperature) -> response` where `response.content` is a sequence of text
//! or thinking blocks — is consumed, not implemented: callers provide an
//! [`LlmClient`] impl (e.g. an Anthropic Messages API wrapper); this crate
//! only needs the trait boundary plus the triple-backtick JSON extraction
//! every stage relies on to parse responses.

pub mod client;
pub mod json_extract;
pub mod optimizer;
pub mod reranker;
pub mod router;

use crate::error::Result;
use async_trait::async_trait;

/// A single role-tagged message in an LLM conversation.
#[derive(Debug, Clone)]
pub struct LlmMessage {
    /// `"user"` or `"assistant"`.
    pub role: String,
    /// Message text.
    pub content: String,
}

impl LlmMessage {
    /// Build a `user`-role message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: "user".to_string(), content: content.into() }
    }
}

/// A single content block in an LLM response: either ordinary text or a
/// `thinking` block (extended reasoning, surfaced but not scored).
#[derive(Debug, Clone)]
pub enum ContentBlock {
    /// Visible response text.
    Text(String),
    /// Extended-thinking trace.
    Thinking(String),
}

/// The response to one [`LlmClient::invoke`] call.
#[derive(Debug, Clone, Default)]
pub struct LlmResponse {
    /// Ordered content blocks, as returned by the model.
    pub content: Vec<ContentBlock>,
}

impl LlmResponse {
    /// Concatenate every `Text` block's contents, in order, joined by newlines.
    #[must_use]
    pub fn text(&self) -> Option<String> {
        let parts: Vec<&str> = self
            .content
            .iter()
            .filter_map(|b| match b {
                ContentBlock::Text(t) => Some(t.as_str()),
                ContentBlock::Thinking(_) => None,
            })
            .collect();
        if parts.is_empty() {
            None
        } else {
            Some(parts.join("\n"))
        }
    }

    /// The first `Thinking` block's contents, if the model emitted one.
    #[must_use]
    pub fn thinking(&self) -> Option<String> {
        self.content.iter().find_map(|b| match b {
            ContentBlock::Thinking(t) => Some(t.clone()),
            ContentBlock::Text(_) => None,
        })
    }
}

/// The external LLM invocation contract every stage-0/1.5 component depends on.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Send a single-turn (or few-turn) request and return the model's response.
    ///
    /// # Errors
    ///
    /// Returns [`crate::error::Error::Llm`] on a network or API failure.
    async fn invoke(
        &self,
        model: &str,
        system: &str,
        messages: &[LlmMessage],
        max_tokens: u32,
        temperature: f32,
    ) -> Result<LlmResponse>;
}
