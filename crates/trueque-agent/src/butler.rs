//! Butler game server client.
//!
//! Thin HTTP wrapper over the Butler endpoints: `/info`, `/gente`, `/carta`,
//! `/paquete/{dest}`, `/mail/{id}`, `/alias/{name}`. The server lives on a
//! bare IP with a self-signed certificate, so certificate verification is
//! disabled and every request carries a short timeout. In single-seat mode
//! an `agente=<name>` query parameter is appended to every request.
//!
//! The [`GameServer`] trait is the seam the dispatcher and the loop talk
//! through; tests substitute a recording mock for the real client.

use serde_json::Value;
use tracing::warn;

use trueque_types::{GameState, Letter};

use crate::config::{AgentConfig, SeatMode};
use crate::error::AgentError;

/// Boundary the agent uses to read game state and execute trade actions.
pub trait GameServer {
    /// Fetch the raw game state from `GET /info`.
    async fn fetch_state(&self) -> Result<GameState, AgentError>;

    /// Fetch the raw player roster from `GET /gente`.
    async fn fetch_roster(&self) -> Result<Value, AgentError>;

    /// Send a letter via `POST /carta`.
    ///
    /// Returns `true` only when the server confirms delivery with
    /// `{"status": "ok"}`.
    async fn send_letter(&self, letter: &Letter) -> Result<bool, AgentError>;

    /// Send a resource package via `POST /paquete/{recipient}`.
    async fn send_package(
        &self,
        recipient: &str,
        resource: &str,
        quantity: u64,
    ) -> Result<bool, AgentError>;

    /// Delete a mailbox letter via `DELETE /mail/{id}`.
    ///
    /// Deleting an already-gone id is not an error.
    async fn delete_letter(&self, letter_id: &str) -> Result<(), AgentError>;
}

/// HTTP client for the Butler game server.
pub struct ButlerClient {
    http: reqwest::Client,
    base_url: String,
    /// `Some(alias)` in single-seat mode; appended as `agente=<alias>`.
    agent_param: Option<String>,
}

impl ButlerClient {
    /// Build a client from the agent configuration.
    pub fn new(config: &AgentConfig) -> Result<Self, AgentError> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| AgentError::Transport(format!("failed to build HTTP client: {e}")))?;

        let agent_param = match config.seat_mode {
            SeatMode::Single => Some(config.player_name.clone()),
            SeatMode::Multi => None,
        };

        Ok(Self {
            http,
            base_url: config.butler_url.trim_end_matches('/').to_owned(),
            agent_param,
        })
    }

    /// Register the agent's alias via `POST /alias/{name}`.
    ///
    /// Returns `true` when the server confirms with `{"status": "ok"}`.
    pub async fn register_alias(&self, name: &str) -> Result<bool, AgentError> {
        let response = self
            .request(reqwest::Method::POST, &format!("/alias/{name}"))
            .send()
            .await
            .map_err(|e| AgentError::Transport(format!("alias registration failed: {e}")))?;
        Ok(status_ok(&read_json(response).await))
    }

    /// Build a request with the base URL and the seat-mode query parameter.
    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{path}", self.base_url);
        let builder = self.http.request(method, url);
        match &self.agent_param {
            Some(name) => builder.query(&[("agente", name.as_str())]),
            None => builder,
        }
    }
}

/// Read a JSON body, tolerating empty or non-JSON responses.
async fn read_json(response: reqwest::Response) -> Value {
    let status = response.status();
    let body = response.json::<Value>().await.unwrap_or(Value::Null);
    if !status.is_success() {
        warn!(status = %status, "butler returned non-success status");
    }
    body
}

/// Whether a response body is the server's `{"status": "ok"}` confirmation.
fn status_ok(body: &Value) -> bool {
    body.get("status").and_then(Value::as_str) == Some("ok")
}

impl GameServer for ButlerClient {
    async fn fetch_state(&self) -> Result<GameState, AgentError> {
        let response = self
            .request(reqwest::Method::GET, "/info")
            .send()
            .await
            .map_err(|e| AgentError::Transport(format!("GET /info failed: {e}")))?;
        response
            .json::<GameState>()
            .await
            .map_err(|e| AgentError::Transport(format!("GET /info returned bad payload: {e}")))
    }

    async fn fetch_roster(&self) -> Result<Value, AgentError> {
        let response = self
            .request(reqwest::Method::GET, "/gente")
            .send()
            .await
            .map_err(|e| AgentError::Transport(format!("GET /gente failed: {e}")))?;
        Ok(read_json(response).await)
    }

    async fn send_letter(&self, letter: &Letter) -> Result<bool, AgentError> {
        let response = self
            .request(reqwest::Method::POST, "/carta")
            .json(letter)
            .send()
            .await
            .map_err(|e| AgentError::Transport(format!("POST /carta failed: {e}")))?;
        Ok(status_ok(&read_json(response).await))
    }

    async fn send_package(
        &self,
        recipient: &str,
        resource: &str,
        quantity: u64,
    ) -> Result<bool, AgentError> {
        let mut payload = serde_json::Map::new();
        payload.insert(resource.to_owned(), Value::from(quantity));
        let response = self
            .request(reqwest::Method::POST, &format!("/paquete/{recipient}"))
            .json(&payload)
            .send()
            .await
            .map_err(|e| AgentError::Transport(format!("POST /paquete failed: {e}")))?;
        Ok(response.status().is_success())
    }

    async fn delete_letter(&self, letter_id: &str) -> Result<(), AgentError> {
        self.request(reqwest::Method::DELETE, &format!("/mail/{letter_id}"))
            .send()
            .await
            .map_err(|e| AgentError::Transport(format!("DELETE /mail failed: {e}")))?;
        // Any response counts: deleting an already-gone letter is fine.
        Ok(())
    }
}
