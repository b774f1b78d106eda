//! Judge invocation for the filter chain.
//!
//! A judge takes a fixed prompt pair and returns *raw text*. Parse validation
//! and the per-stage fail-open/fail-closed defaults belong to the caller —
//! format drift in the model output must never escape the stage that asked.

mod claude;

use async_trait::async_trait;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum JudgeError {
    /// Endpoint unreachable, auth rejected, or transport-level failure.
    /// Verdict-level garbage is NOT an error: it comes back as text.
    #[error("Judge unavailable: {0}")]
    Unavailable(String),
}

/// An LLM-backed decision function invoked with a fixed prompt template.
#[async_trait]
pub trait Judge: Send + Sync {
    async fn invoke(&self, system_prompt: &str, user_prompt: &str) -> Result<String, JudgeError>;

    /// Model identifier, for decision-trail reasons and logs.
    fn model(&self) -> &str;
}

/// Anthropic Messages API judge. One instance per model tier; the filter
/// chain holds a baseline judge and a rerank judge.
pub struct ClaudeJudge {
    api_key: String,
    model: String,
    base_url: Option<String>,
}

impl ClaudeJudge {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: None,
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    fn client(&self) -> claude::ClaudeClient {
        let client = claude::ClaudeClient::new(&self.api_key);
        if let Some(ref url) = self.base_url {
            client.with_base_url(url)
        } else {
            client
        }
    }
}

#[async_trait]
impl Judge for ClaudeJudge {
    async fn invoke(&self, system_prompt: &str, user_prompt: &str) -> Result<String, JudgeError> {
        let request = claude::ChatRequest::new(&self.model)
            .system(system_prompt)
            .message(claude::WireMessage::user(user_prompt))
            .temperature(0.0);

        let response = self.client().chat(&request).await?;

        response
            .text()
            .ok_or_else(|| JudgeError::Unavailable("No text content in response".to_string()))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
