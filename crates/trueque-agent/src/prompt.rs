//! Prompt template rendering via `minijinja`.
//!
//! Two templates build the decision prompt: `system.j2` fixes the rules of
//! the game and the JSON answer contract, `state.j2` renders the current
//! snapshot (holdings, deficits, surpluses, visible mailbox window, roster,
//! last broadcast). Both are embedded at compile time so the binary is
//! self-contained on the course machines.

use minijinja::Environment;

use trueque_core::{OfferMemory, Snapshot};

use crate::error::AgentError;

/// System template: game rules and the answer contract.
const SYSTEM_TEMPLATE: &str = include_str!("../templates/system.j2");
/// State template: the per-iteration snapshot.
const STATE_TEMPLATE: &str = include_str!("../templates/state.j2");

/// Manages prompt template rendering.
///
/// Wraps a `minijinja` [`Environment`] with both templates pre-loaded.
pub struct PromptEngine {
    env: Environment<'static>,
}

/// The complete rendered prompt ready to send to an LLM backend.
#[derive(Debug, Clone)]
pub struct RenderedPrompt {
    /// System message establishing the rules and the answer contract.
    pub system: String,
    /// User message containing the current snapshot.
    pub user: String,
}

impl PromptEngine {
    /// Create a new prompt engine with the embedded templates.
    pub fn new() -> Result<Self, AgentError> {
        let mut env = Environment::new();
        env.add_template("system", SYSTEM_TEMPLATE)
            .map_err(|e| AgentError::Template(format!("failed to add system template: {e}")))?;
        env.add_template("state", STATE_TEMPLATE)
            .map_err(|e| AgentError::Template(format!("failed to add state template: {e}")))?;
        Ok(Self { env })
    }

    /// Render the decision prompt for one loop iteration.
    pub fn render(
        &self,
        snapshot: &Snapshot,
        memory: &OfferMemory,
    ) -> Result<RenderedPrompt, AgentError> {
        let context = build_context(snapshot, memory);

        let system = self
            .env
            .get_template("system")
            .map_err(|e| AgentError::Template(format!("missing system template: {e}")))?
            .render(&context)
            .map_err(|e| AgentError::Template(format!("system render failed: {e}")))?;

        let user = self
            .env
            .get_template("state")
            .map_err(|e| AgentError::Template(format!("missing state template: {e}")))?
            .render(&context)
            .map_err(|e| AgentError::Template(format!("state render failed: {e}")))?;

        Ok(RenderedPrompt { system, user })
    }
}

/// Flatten the snapshot and offer memory into the template context.
fn build_context(snapshot: &Snapshot, memory: &OfferMemory) -> serde_json::Value {
    let letters: Vec<serde_json::Value> = snapshot
        .visible_letters()
        .iter()
        .map(|(id, letter)| {
            serde_json::json!({
                "id": id,
                "sender": letter.sender,
                "subject": letter.subject,
                "body": letter.body,
            })
        })
        .collect();

    serde_json::json!({
        "own_name": snapshot.own_name,
        "held": snapshot.held,
        "deficit": snapshot.deficit,
        "surplus": snapshot.surplus,
        "letters": letters,
        "players": snapshot.players,
        "last_wanted": memory.wanted,
        "last_offered": memory.offered,
    })
}
