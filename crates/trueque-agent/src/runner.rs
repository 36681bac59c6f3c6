//! The sequential agent loop.
//!
//! One iteration: fetch state and roster, build a snapshot, render the
//! prompt, ask the decision source, parse, dispatch. Every failure mode is
//! survivable: an incomplete state skips the iteration, a useless decision
//! increments a bounded retry counter, and transport errors are logged and
//! retried next time round. The loop owns all mutable negotiation state
//! (offer memory, broadcast gate, failure counter); nothing is shared.

use std::time::Duration;

use rand::Rng;
use tracing::{info, warn};

use trueque_core::{OfferMemory, Snapshot};

use crate::actions::{BroadcastGate, DispatchOutcome, dispatch};
use crate::butler::GameServer;
use crate::error::AgentError;
use crate::llm::DecisionSource;
use crate::parse::parse_intent;
use crate::prompt::PromptEngine;

/// Consecutive decision failures tolerated before the mailbox cleanup
/// fallback deletes the oldest visible letter.
///
/// Breaks deadlocks where the same unresolvable letter heads the mailbox
/// every iteration and the model never produces a usable action for it.
pub const MAX_DECISION_FAILURES: u32 = 3;

/// What one loop iteration amounted to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationOutcome {
    /// The state payload was incomplete; nothing was decided or sent.
    IncompleteState,
    /// The decision source produced no usable action.
    NoDecision,
    /// Too many consecutive failures; the oldest visible letter was deleted.
    MailboxCleanup,
    /// An intent reached the dispatcher.
    Acted(DispatchOutcome),
}

/// The single-threaded negotiation loop.
pub struct AgentLoop<S, D, R> {
    server: S,
    decision: D,
    prompts: PromptEngine,
    memory: OfferMemory,
    gate: BroadcastGate,
    rng: R,
    decision_failures: u32,
    player_name: String,
    decision_timeout: Duration,
    iteration_delay: Duration,
    broadcast_cooldown: Duration,
}

impl<S: GameServer, D: DecisionSource, R: Rng> AgentLoop<S, D, R> {
    /// Assemble a loop; all negotiation state starts empty.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        server: S,
        decision: D,
        prompts: PromptEngine,
        rng: R,
        player_name: String,
        decision_timeout: Duration,
        iteration_delay: Duration,
        broadcast_cooldown: Duration,
        broadcast_min_interval: Duration,
    ) -> Self {
        Self {
            server,
            decision,
            prompts,
            memory: OfferMemory::new(),
            gate: BroadcastGate::new(broadcast_min_interval),
            rng,
            decision_failures: 0,
            player_name,
            decision_timeout,
            iteration_delay,
            broadcast_cooldown,
        }
    }

    /// Run iterations forever, sleeping between them.
    ///
    /// A confirmed broadcast extends the sleep by the cooldown so the other
    /// players are not flooded.
    pub async fn run(&mut self) {
        info!(player = self.player_name, "agent loop starting");
        loop {
            let mut delay = self.iteration_delay;
            match self.run_once().await {
                Ok(IterationOutcome::Acted(DispatchOutcome::BroadcastSent)) => {
                    delay = delay.saturating_add(self.broadcast_cooldown);
                }
                Ok(_) => {}
                Err(e) => warn!(error = %e, "iteration failed; retrying next cycle"),
            }
            tokio::time::sleep(delay).await;
        }
    }

    /// Execute exactly one iteration.
    pub async fn run_once(&mut self) -> Result<IterationOutcome, AgentError> {
        let state = self.server.fetch_state().await?;
        let roster = self.server.fetch_roster().await?;

        let Some(snapshot) = Snapshot::build(&state, &roster, &self.player_name) else {
            info!("state payload incomplete; skipping iteration");
            return Ok(IterationOutcome::IncompleteState);
        };

        let prompt = self.prompts.render(&snapshot, &self.memory)?;

        // The decision source is bounded here as well as at the transport
        // layer; a stalled call must not block the loop.
        let decided =
            tokio::time::timeout(self.decision_timeout, self.decision.decide(&prompt)).await;
        let reply = match decided {
            Ok(Ok(text)) => text,
            Ok(Err(e)) => {
                warn!(error = %e, "decision call failed");
                return self.register_decision_failure(&snapshot).await;
            }
            Err(_) => {
                warn!(timeout = ?self.decision_timeout, "decision call did not return in time");
                return self.register_decision_failure(&snapshot).await;
            }
        };

        let Some(intent) = parse_intent(&reply) else {
            return self.register_decision_failure(&snapshot).await;
        };

        self.decision_failures = 0;
        info!(action = intent.name(), "dispatching decision");
        let outcome = dispatch(
            &intent,
            &snapshot,
            &self.server,
            &mut self.memory,
            &mut self.gate,
            &mut self.rng,
        )
        .await?;
        Ok(IterationOutcome::Acted(outcome))
    }

    /// Count a failed decision; at the limit, delete the oldest visible
    /// letter and reset so the next iterations see fresh mail.
    async fn register_decision_failure(
        &mut self,
        snapshot: &Snapshot,
    ) -> Result<IterationOutcome, AgentError> {
        self.decision_failures = self.decision_failures.saturating_add(1);
        warn!(
            failures = self.decision_failures,
            "no usable decision this iteration"
        );

        if self.decision_failures < MAX_DECISION_FAILURES {
            return Ok(IterationOutcome::NoDecision);
        }

        self.decision_failures = 0;
        if let Some((letter_id, _)) = snapshot.visible_letters().first() {
            warn!(letter_id, "deleting oldest visible letter to break deadlock");
            self.server.delete_letter(letter_id).await?;
            return Ok(IterationOutcome::MailboxCleanup);
        }
        Ok(IterationOutcome::NoDecision)
    }
}
