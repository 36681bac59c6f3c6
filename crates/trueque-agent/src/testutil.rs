//! Test doubles for the dispatcher and the loop.
//!
//! The real loop talks to the Butler server, an LLM, and the OS entropy
//! source; these fakes replace all three so tests can script exact
//! iterations and assert on the calls that were (or were not) issued.

use std::cell::RefCell;
use std::collections::VecDeque;

use rand::RngCore;
use serde_json::Value;

use trueque_types::{GameState, Letter};

use crate::butler::GameServer;
use crate::error::AgentError;
use crate::llm::DecisionSource;
use crate::prompt::RenderedPrompt;

/// One recorded Butler call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MockCall {
    /// A `POST /carta` with the given letter.
    Letter {
        /// The letter that was sent.
        letter: Letter,
    },
    /// A `POST /paquete/{recipient}` shipment.
    Package {
        /// Package recipient.
        recipient: String,
        /// Shipped resource.
        resource: String,
        /// Shipped quantity.
        quantity: u64,
    },
    /// A `DELETE /mail/{id}`.
    Delete {
        /// Deleted letter id.
        letter_id: String,
    },
}

/// In-memory Butler that records calls and replays scripted results.
///
/// Letter sends pop results from a queue (defaulting to confirmed) so tests
/// can simulate per-recipient delivery failures. Loop tests run on a single
/// thread, so interior mutability via `RefCell` is enough.
#[derive(Default)]
pub struct MockServer {
    calls: RefCell<Vec<MockCall>>,
    letter_results: RefCell<VecDeque<bool>>,
    /// State returned by `fetch_state`.
    pub state: GameState,
    /// Roster returned by `fetch_roster`.
    pub roster: Value,
}

impl MockServer {
    /// Server whose letter sends resolve to the given confirmations in order.
    pub fn with_letter_results(results: Vec<bool>) -> Self {
        Self {
            letter_results: RefCell::new(results.into()),
            ..Self::default()
        }
    }

    /// All calls recorded so far, in order.
    pub fn calls(&self) -> Vec<MockCall> {
        self.calls.borrow().clone()
    }
}

impl GameServer for MockServer {
    async fn fetch_state(&self) -> Result<GameState, AgentError> {
        Ok(self.state.clone())
    }

    async fn fetch_roster(&self) -> Result<Value, AgentError> {
        Ok(self.roster.clone())
    }

    async fn send_letter(&self, letter: &Letter) -> Result<bool, AgentError> {
        self.calls.borrow_mut().push(MockCall::Letter {
            letter: letter.clone(),
        });
        Ok(self.letter_results.borrow_mut().pop_front().unwrap_or(true))
    }

    async fn send_package(
        &self,
        recipient: &str,
        resource: &str,
        quantity: u64,
    ) -> Result<bool, AgentError> {
        self.calls.borrow_mut().push(MockCall::Package {
            recipient: recipient.to_owned(),
            resource: resource.to_owned(),
            quantity,
        });
        Ok(true)
    }

    async fn delete_letter(&self, letter_id: &str) -> Result<(), AgentError> {
        self.calls.borrow_mut().push(MockCall::Delete {
            letter_id: letter_id.to_owned(),
        });
        Ok(())
    }
}

/// Decision source that replays a queue of scripted replies.
///
/// An empty queue (or a scripted `Err`) models an LLM outage.
pub struct ScriptedDecision {
    replies: RefCell<VecDeque<Result<String, String>>>,
}

impl ScriptedDecision {
    /// Source that returns the given replies in order, then errors.
    pub fn new(replies: Vec<Result<String, String>>) -> Self {
        Self {
            replies: RefCell::new(replies.into()),
        }
    }

    /// Source whose every reply succeeds with the given texts.
    pub fn replies(texts: Vec<&str>) -> Self {
        Self::new(texts.into_iter().map(|t| Ok(t.to_owned())).collect())
    }
}

impl DecisionSource for ScriptedDecision {
    async fn decide(&self, _prompt: &RenderedPrompt) -> Result<String, AgentError> {
        match self.replies.borrow_mut().pop_front() {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(AgentError::LlmBackend(message)),
            None => Err(AgentError::LlmBackend(String::from("script exhausted"))),
        }
    }
}

/// Decision source whose call never resolves, like a hung endpoint.
pub struct StalledDecision;

impl DecisionSource for StalledDecision {
    async fn decide(&self, _prompt: &RenderedPrompt) -> Result<String, AgentError> {
        std::future::pending().await
    }
}

/// RNG that returns the same 32-bit word forever.
///
/// `new(0)` makes every probability roll hit; `new(u32::MAX)` makes every
/// roll miss.
pub struct ConstRng {
    word: u32,
}

impl ConstRng {
    /// RNG stuck on the given word.
    pub const fn new(word: u32) -> Self {
        Self { word }
    }
}

impl RngCore for ConstRng {
    fn next_u32(&mut self) -> u32 {
        self.word
    }

    fn next_u64(&mut self) -> u64 {
        (u64::from(self.word) << 32) | u64::from(self.word)
    }

    fn fill_bytes(&mut self, dest: &mut [u8]) {
        for chunk in dest.chunks_mut(4) {
            let bytes = self.word.to_le_bytes();
            for (slot, byte) in chunk.iter_mut().zip(bytes.iter()) {
                *slot = *byte;
            }
        }
    }
}
