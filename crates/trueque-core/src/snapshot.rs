//! State snapshot derivation.
//!
//! Turns the raw `/info` payload and `/gente` roster into the quantities the
//! decision logic needs: what is missing, what can be given away, which
//! letters are addressed to the agent, and who else is playing. Recomputed
//! from scratch every iteration; nothing here is persisted.

use serde::Serialize;
use serde_json::Value;
use tracing::warn;

use trueque_types::ledger::held_quantity;
use trueque_types::{GameState, Ledger, MailItem, is_gold};

use crate::roster::normalize_roster;

/// How many of the agent's letters are shown to the decision source.
///
/// The cap bounds prompt size only; correctness never depends on it.
pub const VISIBLE_LETTERS: usize = 1;

/// Derived game state for one loop iteration.
///
/// `deficit` and `surplus` are ordered lists, not maps: the offer rotation
/// algorithm picks "the first candidate" and that order must be stable. They
/// are built by iterating the ledger maps, so the order is deterministic
/// across runs for identical payloads.
#[derive(Debug, Clone, Serialize)]
pub struct Snapshot {
    /// The agent's own alias.
    pub own_name: String,
    /// Current holdings.
    pub held: Ledger,
    /// Resources below goal, with the missing amount.
    pub deficit: Vec<(String, u64)>,
    /// Resources above goal (gold excluded), with the spare amount.
    pub surplus: Vec<(String, u64)>,
    /// Letters addressed to the agent, in server order, as `(id, letter)`.
    pub mailbox: Vec<(String, MailItem)>,
    /// Other players' aliases, deduplicated, self excluded.
    pub players: Vec<String>,
}

impl Snapshot {
    /// Build a snapshot from raw server payloads.
    ///
    /// Returns `None` when the state payload is incomplete (no `Recursos`);
    /// the caller must skip the iteration rather than act on partial data.
    /// Malformed mailbox entries are dropped with a warning instead of
    /// failing the whole snapshot.
    pub fn build(state: &GameState, roster_raw: &Value, own_name: &str) -> Option<Self> {
        let held = state.resources.clone()?;

        let mut deficit = Vec::new();
        for (resource, goal_qty) in &state.goal {
            let have = held_quantity(&held, resource);
            if have < *goal_qty {
                deficit.push((resource.clone(), goal_qty.saturating_sub(have)));
            }
        }

        let mut surplus = Vec::new();
        for (resource, have) in &held {
            let goal_qty = held_quantity(&state.goal, resource);
            if *have > goal_qty && !is_gold(resource) {
                surplus.push((resource.clone(), have.saturating_sub(goal_qty)));
            }
        }

        let mut mailbox = Vec::new();
        for (id, raw_letter) in &state.mailbox {
            match serde_json::from_value::<MailItem>(raw_letter.clone()) {
                Ok(letter) if letter.recipient == own_name => {
                    mailbox.push((id.clone(), letter));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(letter_id = id, error = %e, "dropping malformed mailbox entry");
                }
            }
        }

        Some(Self {
            own_name: own_name.to_owned(),
            held,
            deficit,
            surplus,
            mailbox,
            players: normalize_roster(roster_raw, own_name),
        })
    }

    /// The mailbox window shown to the decision source (first
    /// [`VISIBLE_LETTERS`] letters in server order).
    pub fn visible_letters(&self) -> &[(String, MailItem)] {
        let end = VISIBLE_LETTERS.min(self.mailbox.len());
        self.mailbox.get(..end).unwrap_or(&[])
    }

    /// Quantity of `resource` currently held, zero when absent.
    pub fn held_quantity(&self, resource: &str) -> u64 {
        held_quantity(&self.held, resource)
    }

    /// Whether `resource` is currently below goal.
    pub fn is_deficit(&self, resource: &str) -> bool {
        self.deficit.iter().any(|(r, _)| r == resource)
    }
}
