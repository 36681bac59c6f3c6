//! The decision backend: one HTTP chat call per loop iteration.
//!
//! The agent only ever asks one question -- "here is the board, pick one
//! action" -- so the backend is a single client that speaks two wire
//! dialects: the `OpenAI` chat-completions shape (which covers the local
//! Ollama daemon the course machines run) and the Anthropic Messages shape.
//! The dialect decides the endpoint path, the auth headers, where the
//! system text goes, and where the reply text comes back.
//!
//! Every request carries the configured timeout so a stalled endpoint
//! resolves to an error instead of hanging the loop.

use serde_json::Value;

use crate::config::{BackendType, LlmBackendConfig};
use crate::error::AgentError;
use crate::prompt::RenderedPrompt;

/// The external decision source the loop consults each iteration.
///
/// Implemented by [`LlmBackend`] in production and by scripted fakes in
/// tests. The source is unreliable by contract: it may time out, return
/// free text, or return nothing usable.
pub trait DecisionSource {
    /// Ask for a decision; the reply is raw text to be parsed separately.
    async fn decide(&self, prompt: &RenderedPrompt) -> Result<String, AgentError>;
}

/// Which chat API shape the configured endpoint expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Dialect {
    /// `POST {url}/chat/completions`, system as the first message.
    OpenAi,
    /// `POST {url}/messages`, system as a top-level field.
    Anthropic,
}

/// The chat backend that picks each trade action.
pub struct LlmBackend {
    http: reqwest::Client,
    dialect: Dialect,
    api_url: String,
    api_key: String,
    model: String,
    max_reply_tokens: u32,
}

impl LlmBackend {
    /// Build the backend from configuration.
    ///
    /// The HTTP client carries the configured request timeout; a hung
    /// endpoint fails the call rather than blocking the loop.
    pub fn new(config: &LlmBackendConfig) -> Result<Self, AgentError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| {
                AgentError::LlmBackend(format!("failed to build decision HTTP client: {e}"))
            })?;

        let dialect = match config.backend_type {
            BackendType::OpenAi => Dialect::OpenAi,
            BackendType::Anthropic => Dialect::Anthropic,
        };

        Ok(Self {
            http,
            dialect,
            api_url: config.api_url.trim_end_matches('/').to_owned(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            max_reply_tokens: config.max_reply_tokens,
        })
    }

    /// Dialect name for logging.
    pub const fn name(&self) -> &'static str {
        match self.dialect {
            Dialect::OpenAi => "openai-compatible",
            Dialect::Anthropic => "anthropic",
        }
    }

    /// Full endpoint URL for the configured dialect.
    fn endpoint(&self) -> String {
        match self.dialect {
            Dialect::OpenAi => format!("{}/chat/completions", self.api_url),
            Dialect::Anthropic => format!("{}/messages", self.api_url),
        }
    }

    /// Build the request body for one decision.
    ///
    /// The reply is a single small JSON object, so the token cap is tight
    /// and the `OpenAI` shape pins `response_format` to a JSON object.
    fn request_body(&self, prompt: &RenderedPrompt) -> Value {
        match self.dialect {
            Dialect::OpenAi => serde_json::json!({
                "model": self.model,
                "messages": [
                    {"role": "system", "content": prompt.system},
                    {"role": "user", "content": prompt.user}
                ],
                "max_tokens": self.max_reply_tokens,
                "response_format": {"type": "json_object"}
            }),
            Dialect::Anthropic => serde_json::json!({
                "model": self.model,
                "max_tokens": self.max_reply_tokens,
                "system": prompt.system,
                "messages": [
                    {"role": "user", "content": prompt.user}
                ]
            }),
        }
    }

    /// Attach the dialect's auth headers.
    ///
    /// A local Ollama daemon needs no key; an empty key sends no auth
    /// header at all.
    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match self.dialect {
            Dialect::OpenAi if self.api_key.is_empty() => request,
            Dialect::OpenAi => {
                request.header("Authorization", format!("Bearer {}", self.api_key))
            }
            Dialect::Anthropic => request
                .header("x-api-key", &self.api_key)
                .header("anthropic-version", "2023-06-01"),
        }
    }

    /// Pull the reply text out of a response body.
    fn extract_reply(&self, body: &Value) -> Option<String> {
        let text = match self.dialect {
            Dialect::OpenAi => body
                .get("choices")?
                .get(0)?
                .get("message")?
                .get("content")?,
            Dialect::Anthropic => body.get("content")?.get(0)?.get("text")?,
        };
        text.as_str().map(ToOwned::to_owned)
    }

    /// Send one decision request and return the reply text.
    async fn complete(&self, prompt: &RenderedPrompt) -> Result<String, AgentError> {
        let url = self.endpoint();
        let response = self
            .authorize(self.http.post(&url))
            .json(&self.request_body(prompt))
            .send()
            .await
            .map_err(|e| AgentError::LlmBackend(format!("decision request to {url} failed: {e}")))?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        if !status.is_success() {
            return Err(AgentError::LlmBackend(format!(
                "decision endpoint returned {status}: {body}"
            )));
        }

        self.extract_reply(&body).ok_or_else(|| {
            AgentError::LlmBackend(format!("decision reply carries no text ({} shape)", self.name()))
        })
    }
}

impl DecisionSource for LlmBackend {
    async fn decide(&self, prompt: &RenderedPrompt) -> Result<String, AgentError> {
        self.complete(prompt).await
    }
}
