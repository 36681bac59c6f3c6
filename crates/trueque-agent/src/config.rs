//! Configuration types for the trading agent.
//!
//! All configuration is loaded from environment variables. The agent needs
//! to know how to reach the Butler server, which alias it plays under, which
//! LLM backend decides its actions, and the loop timing knobs.

use std::time::Duration;

use crate::error::AgentError;

/// How the Butler API is addressed.
///
/// The course server runs in two deployments: a shared one where every
/// request carries an `agente` query parameter, and per-player ones with
/// global endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeatMode {
    /// Shared server; `?agente=<name>` is appended to every request.
    Single,
    /// Per-player server; global endpoints, no extra parameter.
    Multi,
}

/// Supported LLM backend types.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendType {
    /// `OpenAI`-compatible API (works with `OpenAI`, `DeepSeek`, Ollama).
    OpenAi,
    /// Anthropic Messages API (different request format).
    Anthropic,
}

/// Configuration for a single LLM backend.
#[derive(Debug, Clone)]
pub struct LlmBackendConfig {
    /// The backend type (openai, anthropic, ollama).
    pub backend_type: BackendType,
    /// Base API URL (e.g. `http://localhost:11434/v1`).
    pub api_url: String,
    /// API key for authentication; may be empty for local Ollama.
    pub api_key: String,
    /// Model identifier (e.g. `qwen3:4b`).
    pub model: String,
    /// Timeout applied to every decision request.
    pub timeout: Duration,
    /// Token cap requested for the model's reply (one small JSON object).
    pub max_reply_tokens: u32,
}

/// Complete agent configuration loaded from the environment.
#[derive(Debug, Clone)]
pub struct AgentConfig {
    /// Base URL of the Butler game server.
    pub butler_url: String,
    /// Alias the agent plays under.
    pub player_name: String,
    /// How the Butler API is addressed.
    pub seat_mode: SeatMode,
    /// Whether to register the alias before entering the loop.
    pub register_alias: bool,
    /// LLM backend that decides the actions.
    pub backend: LlmBackendConfig,
    /// Timeout applied to every Butler HTTP request.
    pub request_timeout: Duration,
    /// Fixed delay between loop iterations.
    pub iteration_delay: Duration,
    /// Extra delay applied after a confirmed broadcast.
    pub broadcast_cooldown: Duration,
    /// Minimum time between two broadcasts; decisions inside the window
    /// are suppressed.
    pub broadcast_min_interval: Duration,
}

impl AgentConfig {
    /// Load configuration from environment variables.
    ///
    /// Required variables:
    /// - `TRUEQUE_PLAYER_NAME` -- alias the agent plays under
    /// - `TRUEQUE_LLM_MODEL` -- model identifier
    ///
    /// Optional variables:
    /// - `TRUEQUE_BUTLER_URL` -- Butler base URL (default `http://127.0.0.1:7719`)
    /// - `TRUEQUE_SEAT_MODE` -- `single` or `multi` (default `single`)
    /// - `TRUEQUE_REGISTER_ALIAS` -- register the alias at startup (default `false`)
    /// - `TRUEQUE_LLM_BACKEND` -- backend type (default `ollama`)
    /// - `TRUEQUE_LLM_API_URL` -- LLM API base URL (default `http://localhost:11434/v1`)
    /// - `TRUEQUE_LLM_API_KEY` -- LLM API key (default empty)
    /// - `TRUEQUE_LLM_TIMEOUT_MS` -- decision request timeout (default 30000)
    /// - `TRUEQUE_LLM_MAX_REPLY_TOKENS` -- reply token cap (default 512)
    /// - `TRUEQUE_REQUEST_TIMEOUT_MS` -- Butler request timeout (default 3000)
    /// - `TRUEQUE_ITERATION_DELAY_MS` -- inter-iteration delay (default 2000)
    /// - `TRUEQUE_BROADCAST_COOLDOWN_MS` -- post-broadcast extra delay (default 5000)
    /// - `TRUEQUE_BROADCAST_MIN_INTERVAL_MS` -- broadcast gate window (default 30000)
    pub fn from_env() -> Result<Self, AgentError> {
        let player_name = env_var("TRUEQUE_PLAYER_NAME")?;
        let butler_url = std::env::var("TRUEQUE_BUTLER_URL")
            .unwrap_or_else(|_| "http://127.0.0.1:7719".to_owned());

        let seat_mode = match std::env::var("TRUEQUE_SEAT_MODE")
            .unwrap_or_else(|_| "single".to_owned())
            .to_lowercase()
            .as_str()
        {
            "single" | "monopuesto" => SeatMode::Single,
            "multi" | "multipuesto" => SeatMode::Multi,
            other => {
                return Err(AgentError::Config(format!("unknown seat mode: {other}")));
            }
        };

        let register_alias: bool = std::env::var("TRUEQUE_REGISTER_ALIAS")
            .unwrap_or_else(|_| "false".to_owned())
            .parse()
            .map_err(|e| AgentError::Config(format!("invalid TRUEQUE_REGISTER_ALIAS: {e}")))?;

        Ok(Self {
            butler_url,
            player_name,
            seat_mode,
            register_alias,
            backend: load_backend_config()?,
            request_timeout: duration_var("TRUEQUE_REQUEST_TIMEOUT_MS", 3000)?,
            iteration_delay: duration_var("TRUEQUE_ITERATION_DELAY_MS", 2000)?,
            broadcast_cooldown: duration_var("TRUEQUE_BROADCAST_COOLDOWN_MS", 5000)?,
            broadcast_min_interval: duration_var("TRUEQUE_BROADCAST_MIN_INTERVAL_MS", 30_000)?,
        })
    }
}

/// Read a required environment variable.
fn env_var(name: &str) -> Result<String, AgentError> {
    std::env::var(name)
        .map_err(|e| AgentError::Config(format!("missing required env var {name}: {e}")))
}

/// Read an optional millisecond duration variable with a default.
fn duration_var(name: &str, default_ms: u64) -> Result<Duration, AgentError> {
    let ms: u64 = std::env::var(name)
        .unwrap_or_else(|_| default_ms.to_string())
        .parse()
        .map_err(|e| AgentError::Config(format!("invalid {name}: {e}")))?;
    Ok(Duration::from_millis(ms))
}

/// Load the LLM backend config from `TRUEQUE_LLM_*` variables.
fn load_backend_config() -> Result<LlmBackendConfig, AgentError> {
    let backend_str =
        std::env::var("TRUEQUE_LLM_BACKEND").unwrap_or_else(|_| "ollama".to_owned());
    let backend_type = match backend_str.to_lowercase().as_str() {
        "openai" | "deepseek" | "ollama" => BackendType::OpenAi,
        "anthropic" | "claude" => BackendType::Anthropic,
        other => {
            return Err(AgentError::Config(format!("unknown backend type: {other}")));
        }
    };

    let api_url = std::env::var("TRUEQUE_LLM_API_URL")
        .unwrap_or_else(|_| "http://localhost:11434/v1".to_owned());
    let api_key = std::env::var("TRUEQUE_LLM_API_KEY").unwrap_or_default();
    let model = env_var("TRUEQUE_LLM_MODEL")?;

    let max_reply_tokens: u32 = std::env::var("TRUEQUE_LLM_MAX_REPLY_TOKENS")
        .unwrap_or_else(|_| "512".to_owned())
        .parse()
        .map_err(|e| AgentError::Config(format!("invalid TRUEQUE_LLM_MAX_REPLY_TOKENS: {e}")))?;

    Ok(LlmBackendConfig {
        backend_type,
        api_url,
        api_key,
        model,
        timeout: duration_var("TRUEQUE_LLM_TIMEOUT_MS", 30_000)?,
        max_reply_tokens,
    })
}
