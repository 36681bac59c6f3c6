//! Error types for the trading agent.
//!
//! Uses `thiserror` for typed errors across the agent pipeline: Butler HTTP
//! calls, LLM calls, prompt rendering, configuration. None of these are
//! fatal to the loop -- every caller recovers by logging and moving on to
//! the next iteration.

/// Errors that can occur while the agent is running.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Configuration is invalid or missing.
    #[error("config error: {0}")]
    Config(String),

    /// A Butler server call failed (network error, timeout, bad payload).
    #[error("butler transport error: {0}")]
    Transport(String),

    /// The LLM backend returned an error or was unreachable.
    #[error("LLM backend error: {0}")]
    LlmBackend(String),

    /// Failed to render a prompt template.
    #[error("template render error: {0}")]
    Template(String),
}
