//! Action dispatch: validation guards and the four trade handlers.
//!
//! The dispatcher owns every rule that protects the agent from a bad
//! decision: the gold rule, stock clamping, empty-recipient rejection, and
//! the broadcast gate. Handlers issue the actual Butler calls and report
//! what happened; a rejection never reaches the network.

use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{info, warn};

use trueque_core::{OfferMemory, Snapshot, clamp_outgoing, rotate_offer};
use trueque_types::{Letter, TradeIntent, is_gold};

use crate::butler::GameServer;
use crate::error::AgentError;

/// One-in-N odds of a forced broadcast right after a discard.
///
/// Discarding mail without ever speaking up starves the agent of deals;
/// an occasional unsolicited broadcast keeps it visible to the table.
pub const POST_DISCARD_BROADCAST_ODDS: u32 = 3;

// ---------------------------------------------------------------------------
// Broadcast gate
// ---------------------------------------------------------------------------

/// Rate limiter for mass broadcasts.
///
/// A broadcast decision inside the window is suppressed before any network
/// call or rotation work happens. The gate is marked only on confirmed
/// delivery, so a fully failed broadcast does not consume the window.
#[derive(Debug)]
pub struct BroadcastGate {
    min_interval: Duration,
    last_sent: Option<Instant>,
}

impl BroadcastGate {
    /// Gate that allows one broadcast per `min_interval`.
    pub const fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_sent: None,
        }
    }

    /// Whether a broadcast is currently allowed.
    pub fn ready(&self) -> bool {
        match self.last_sent {
            None => true,
            Some(at) => at.elapsed() >= self.min_interval,
        }
    }

    /// Record a confirmed broadcast, starting a new window.
    pub fn mark(&mut self) {
        self.last_sent = Some(Instant::now());
    }
}

// ---------------------------------------------------------------------------
// Dispatch
// ---------------------------------------------------------------------------

/// What the dispatcher did with an intent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// The action's side effects were issued.
    Executed,
    /// A broadcast went out with at least one confirmed delivery; the loop
    /// applies the extra cooldown.
    BroadcastSent,
    /// A guard rejected the action; nothing was sent.
    Rejected,
}

/// Validate an intent against the current snapshot and execute it.
///
/// Transport errors propagate; guard rejections resolve to
/// [`DispatchOutcome::Rejected`] with a log line and no side effect.
pub async fn dispatch<S: GameServer, R: Rng>(
    intent: &TradeIntent,
    snapshot: &Snapshot,
    server: &S,
    memory: &mut OfferMemory,
    gate: &mut BroadcastGate,
    rng: &mut R,
) -> Result<DispatchOutcome, AgentError> {
    match intent {
        TradeIntent::Accept {
            recipient,
            resource,
            quantity,
            expected_resource,
            expected_quantity,
            letter_id,
        } => {
            handle_accept(
                snapshot,
                server,
                recipient,
                resource,
                *quantity,
                expected_resource,
                *expected_quantity,
                letter_id.as_deref(),
            )
            .await
        }
        TradeIntent::Discard { letter_id } => {
            handle_discard(snapshot, server, memory, gate, rng, letter_id.as_deref()).await
        }
        TradeIntent::Fulfill {
            recipient,
            resource,
            quantity,
            letter_id,
        } => {
            handle_fulfill(
                snapshot,
                server,
                recipient,
                resource,
                *quantity,
                letter_id.as_deref(),
            )
            .await
        }
        TradeIntent::Broadcast { wanted, offered } => {
            handle_broadcast(snapshot, server, memory, gate, wanted, offered).await
        }
    }
}

/// Shared guard for any outgoing shipment: recipient present, resource not
/// gold, stock positive. Returns the clamped quantity.
fn guard_shipment(
    snapshot: &Snapshot,
    recipient: &str,
    resource: &str,
    requested: u64,
) -> Option<u64> {
    if recipient.is_empty() {
        warn!("rejecting action with empty recipient");
        return None;
    }
    if resource.is_empty() {
        warn!("rejecting action with empty resource");
        return None;
    }
    if is_gold(resource) {
        warn!(resource, "rejecting action that would give away gold");
        return None;
    }
    let clamped = clamp_outgoing(&snapshot.held, resource, requested);
    if clamped.is_none() {
        warn!(resource, "rejecting shipment with zero stock");
    }
    clamped
}

/// ACCEPT: confirm the trade by letter, ship the clamped quantity, and
/// delete the accepted letter when an id was given.
#[allow(clippy::too_many_arguments)]
async fn handle_accept<S: GameServer>(
    snapshot: &Snapshot,
    server: &S,
    recipient: &str,
    resource: &str,
    quantity: u64,
    expected_resource: &str,
    expected_quantity: u64,
    letter_id: Option<&str>,
) -> Result<DispatchOutcome, AgentError> {
    let Some(quantity) = guard_shipment(snapshot, recipient, resource, quantity) else {
        return Ok(DispatchOutcome::Rejected);
    };

    let confirmation = Letter {
        sender: snapshot.own_name.clone(),
        recipient: recipient.to_owned(),
        subject: String::from("Trato aceptado"),
        body: format!(
            "Acepto el trato. Aquí tienes {quantity} de {resource}. \
             Envíame {expected_quantity} de {expected_resource}."
        ),
    };
    let confirmed = server.send_letter(&confirmation).await?;
    if !confirmed {
        warn!(recipient, "accept confirmation letter was not acknowledged");
    }

    let shipped = server.send_package(recipient, resource, quantity).await?;
    info!(recipient, resource, quantity, shipped, "accepted trade");

    if let Some(id) = letter_id {
        server.delete_letter(id).await?;
    }
    Ok(DispatchOutcome::Executed)
}

/// DISCARD: delete the letter, then roll the forced-broadcast dice.
async fn handle_discard<S: GameServer, R: Rng>(
    snapshot: &Snapshot,
    server: &S,
    memory: &mut OfferMemory,
    gate: &mut BroadcastGate,
    rng: &mut R,
    letter_id: Option<&str>,
) -> Result<DispatchOutcome, AgentError> {
    let Some(id) = letter_id else {
        warn!("rejecting discard with no letter id");
        return Ok(DispatchOutcome::Rejected);
    };
    server.delete_letter(id).await?;
    info!(letter_id = id, "discarded letter");

    // Occasionally follow a discard with an unsolicited offer so the agent
    // keeps showing up in other players' mailboxes.
    if rng.random_bool(1.0 / f64::from(POST_DISCARD_BROADCAST_ODDS)) {
        info!("rolling a forced broadcast after discard");
        return handle_broadcast(snapshot, server, memory, gate, "", "").await;
    }
    Ok(DispatchOutcome::Executed)
}

/// FULFILL: ship a promised resource and delete the agreement letter.
async fn handle_fulfill<S: GameServer>(
    snapshot: &Snapshot,
    server: &S,
    recipient: &str,
    resource: &str,
    quantity: u64,
    letter_id: Option<&str>,
) -> Result<DispatchOutcome, AgentError> {
    let Some(quantity) = guard_shipment(snapshot, recipient, resource, quantity) else {
        return Ok(DispatchOutcome::Rejected);
    };

    let shipped = server.send_package(recipient, resource, quantity).await?;
    info!(recipient, resource, quantity, shipped, "fulfilled agreement");

    if let Some(id) = letter_id {
        server.delete_letter(id).await?;
    }
    Ok(DispatchOutcome::Executed)
}

/// BROADCAST: rotate the proposed pair and send it to every other player.
///
/// The gate is checked before the rotation or any network call. Offer
/// memory and the gate are committed only when at least one delivery is
/// confirmed, so the next rotation still sees the last pair that actually
/// reached someone.
async fn handle_broadcast<S: GameServer>(
    snapshot: &Snapshot,
    server: &S,
    memory: &mut OfferMemory,
    gate: &mut BroadcastGate,
    proposed_wanted: &str,
    proposed_offered: &str,
) -> Result<DispatchOutcome, AgentError> {
    if !gate.ready() {
        info!("broadcast suppressed: cooldown window has not elapsed");
        return Ok(DispatchOutcome::Rejected);
    }
    if snapshot.players.is_empty() {
        warn!("broadcast suppressed: no other players known");
        return Ok(DispatchOutcome::Rejected);
    }

    let Some(offer) = rotate_offer(proposed_wanted, proposed_offered, snapshot, memory) else {
        info!("broadcast suppressed: no feasible (want, give) pair");
        return Ok(DispatchOutcome::Rejected);
    };
    if is_gold(&offer.offered) {
        warn!("broadcast suppressed: rotation produced gold");
        return Ok(DispatchOutcome::Rejected);
    }

    let mut delivered: u64 = 0;
    for player in &snapshot.players {
        let letter = Letter {
            sender: snapshot.own_name.clone(),
            recipient: player.clone(),
            subject: format!("Busco {}", offer.wanted),
            body: format!(
                "Necesito {}. Te doy {}. ¿Hacemos trato?",
                offer.wanted, offer.offered
            ),
        };
        // One failed recipient must not abort the rest of the round.
        match server.send_letter(&letter).await {
            Ok(true) => delivered = delivered.saturating_add(1),
            Ok(false) => warn!(player, "broadcast letter not acknowledged"),
            Err(e) => warn!(player, error = %e, "broadcast letter failed"),
        }
    }

    if delivered == 0 {
        warn!("broadcast reached nobody; keeping previous offer memory");
        return Ok(DispatchOutcome::Rejected);
    }

    memory.record(&offer.wanted, &offer.offered);
    gate.mark();
    info!(
        wanted = offer.wanted,
        offered = offer.offered,
        rotated = offer.rotated,
        delivered,
        "broadcast offer sent"
    );
    Ok(DispatchOutcome::BroadcastSent)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{ConstRng, MockCall, MockServer};
    use trueque_types::GameState;

    fn snapshot(raw: serde_json::Value, players: &[&str]) -> Snapshot {
        let state: GameState = serde_json::from_value(raw).unwrap_or_default();
        let roster = serde_json::json!(players);
        Snapshot::build(&state, &roster, "YO").unwrap_or(Snapshot {
            own_name: String::from("YO"),
            held: trueque_types::Ledger::new(),
            deficit: Vec::new(),
            surplus: Vec::new(),
            mailbox: Vec::new(),
            players: Vec::new(),
        })
    }

    fn wide_gate() -> BroadcastGate {
        BroadcastGate::new(Duration::from_secs(30))
    }

    // Scenario: letter offers piedra (a deficit) for madera (a surplus),
    // quantity 1, held madera = 2. Accept ships exactly 1 madera and
    // deletes the letter.
    #[tokio::test]
    async fn accept_ships_clamped_quantity_and_deletes_letter() {
        let snap = snapshot(
            serde_json::json!({
                "Recursos": {"madera": 2},
                "Objetivo": {"madera": 1, "piedra": 3}
            }),
            &["ANA"],
        );
        let server = MockServer::default();
        let mut memory = OfferMemory::new();
        let mut gate = wide_gate();
        let mut rng = ConstRng::new(u32::MAX);

        let intent = TradeIntent::Accept {
            recipient: String::from("ANA"),
            resource: String::from("madera"),
            quantity: 1,
            expected_resource: String::from("piedra"),
            expected_quantity: 1,
            letter_id: Some(String::from("c7")),
        };
        let outcome = dispatch(&intent, &snap, &server, &mut memory, &mut gate, &mut rng).await;
        assert_eq!(outcome.ok(), Some(DispatchOutcome::Executed));

        let calls = server.calls();
        assert!(calls.iter().any(|c| matches!(
            c,
            MockCall::Package { recipient, resource, quantity }
                if recipient == "ANA" && resource == "madera" && *quantity == 1
        )));
        assert!(calls.iter().any(|c| matches!(
            c,
            MockCall::Delete { letter_id } if letter_id == "c7"
        )));
    }

    #[tokio::test]
    async fn accept_clamps_requested_quantity_to_stock() {
        let snap = snapshot(
            serde_json::json!({
                "Recursos": {"madera": 2},
                "Objetivo": {"piedra": 3}
            }),
            &["ANA"],
        );
        let server = MockServer::default();
        let mut memory = OfferMemory::new();
        let mut gate = wide_gate();
        let mut rng = ConstRng::new(u32::MAX);

        let intent = TradeIntent::Accept {
            recipient: String::from("ANA"),
            resource: String::from("madera"),
            quantity: 50,
            expected_resource: String::from("piedra"),
            expected_quantity: 1,
            letter_id: None,
        };
        let outcome = dispatch(&intent, &snap, &server, &mut memory, &mut gate, &mut rng).await;
        assert_eq!(outcome.ok(), Some(DispatchOutcome::Executed));
        assert!(server.calls().iter().any(|c| matches!(
            c,
            MockCall::Package { quantity, .. } if *quantity == 2
        )));
    }

    #[tokio::test]
    async fn gold_and_zero_stock_shipments_are_fully_suppressed() {
        let snap = snapshot(
            serde_json::json!({
                "Recursos": {"oro": 50},
                "Objetivo": {"piedra": 3}
            }),
            &["ANA"],
        );
        let server = MockServer::default();
        let mut memory = OfferMemory::new();
        let mut gate = wide_gate();
        let mut rng = ConstRng::new(u32::MAX);

        let gold = TradeIntent::Fulfill {
            recipient: String::from("ANA"),
            resource: String::from("oro"),
            quantity: 1,
            letter_id: None,
        };
        let outcome = dispatch(&gold, &snap, &server, &mut memory, &mut gate, &mut rng).await;
        assert_eq!(outcome.ok(), Some(DispatchOutcome::Rejected));

        let unheld = TradeIntent::Fulfill {
            recipient: String::from("ANA"),
            resource: String::from("madera"),
            quantity: 1,
            letter_id: None,
        };
        let outcome = dispatch(&unheld, &snap, &server, &mut memory, &mut gate, &mut rng).await;
        assert_eq!(outcome.ok(), Some(DispatchOutcome::Rejected));

        // No network call of any kind was issued.
        assert!(server.calls().is_empty());
    }

    #[tokio::test]
    async fn discard_without_id_is_rejected() {
        let snap = snapshot(serde_json::json!({"Recursos": {}}), &[]);
        let server = MockServer::default();
        let mut memory = OfferMemory::new();
        let mut gate = wide_gate();
        let mut rng = ConstRng::new(u32::MAX);

        let intent = TradeIntent::Discard { letter_id: None };
        let outcome = dispatch(&intent, &snap, &server, &mut memory, &mut gate, &mut rng).await;
        assert_eq!(outcome.ok(), Some(DispatchOutcome::Rejected));
        assert!(server.calls().is_empty());
    }

    #[tokio::test]
    async fn discard_dice_zero_forces_a_broadcast() {
        let snap = snapshot(
            serde_json::json!({
                "Recursos": {"madera": 4},
                "Objetivo": {"piedra": 3}
            }),
            &["ANA", "LUIS"],
        );
        let server = MockServer::default();
        let mut memory = OfferMemory::new();
        let mut gate = wide_gate();
        // All-zero random bits make the one-in-three roll always hit.
        let mut rng = ConstRng::new(0);

        let intent = TradeIntent::Discard {
            letter_id: Some(String::from("c1")),
        };
        let outcome = dispatch(&intent, &snap, &server, &mut memory, &mut gate, &mut rng).await;
        assert_eq!(outcome.ok(), Some(DispatchOutcome::BroadcastSent));

        let letters = server
            .calls()
            .iter()
            .filter(|c| matches!(c, MockCall::Letter { .. }))
            .count();
        assert_eq!(letters, 2);
        assert!(memory.matches("piedra", "madera"));
    }

    #[tokio::test]
    async fn discard_dice_nonzero_stops_at_the_delete() {
        let snap = snapshot(
            serde_json::json!({
                "Recursos": {"madera": 4},
                "Objetivo": {"piedra": 3}
            }),
            &["ANA"],
        );
        let server = MockServer::default();
        let mut memory = OfferMemory::new();
        let mut gate = wide_gate();
        let mut rng = ConstRng::new(u32::MAX);

        let intent = TradeIntent::Discard {
            letter_id: Some(String::from("c1")),
        };
        let outcome = dispatch(&intent, &snap, &server, &mut memory, &mut gate, &mut rng).await;
        assert_eq!(outcome.ok(), Some(DispatchOutcome::Executed));
        assert_eq!(server.calls().len(), 1);
    }

    #[tokio::test]
    async fn broadcast_commits_memory_only_on_confirmed_delivery() {
        let snap = snapshot(
            serde_json::json!({
                "Recursos": {"madera": 4},
                "Objetivo": {"piedra": 3}
            }),
            &["ANA", "LUIS"],
        );
        // Every letter send reports "not acknowledged".
        let server = MockServer::with_letter_results(vec![false, false]);
        let mut memory = OfferMemory::new();
        let mut gate = wide_gate();
        let mut rng = ConstRng::new(u32::MAX);

        let intent = TradeIntent::Broadcast {
            wanted: String::from("piedra"),
            offered: String::from("madera"),
        };
        let outcome = dispatch(&intent, &snap, &server, &mut memory, &mut gate, &mut rng).await;
        assert_eq!(outcome.ok(), Some(DispatchOutcome::Rejected));
        assert_eq!(memory, OfferMemory::new());
        assert!(gate.ready());
    }

    #[tokio::test]
    async fn partial_broadcast_failure_still_commits() {
        let snap = snapshot(
            serde_json::json!({
                "Recursos": {"madera": 4},
                "Objetivo": {"piedra": 3}
            }),
            &["ANA", "LUIS", "EVA"],
        );
        let server = MockServer::with_letter_results(vec![false, true, false]);
        let mut memory = OfferMemory::new();
        let mut gate = wide_gate();
        let mut rng = ConstRng::new(u32::MAX);

        let intent = TradeIntent::Broadcast {
            wanted: String::from("piedra"),
            offered: String::from("madera"),
        };
        let outcome = dispatch(&intent, &snap, &server, &mut memory, &mut gate, &mut rng).await;
        assert_eq!(outcome.ok(), Some(DispatchOutcome::BroadcastSent));
        assert!(memory.matches("piedra", "madera"));
        assert!(!gate.ready());
    }

    // Scenario: a second broadcast inside the gate window goes nowhere.
    #[tokio::test]
    async fn second_broadcast_inside_window_is_suppressed() {
        let snap = snapshot(
            serde_json::json!({
                "Recursos": {"madera": 4},
                "Objetivo": {"piedra": 3, "trigo": 2}
            }),
            &["ANA"],
        );
        let server = MockServer::default();
        let mut memory = OfferMemory::new();
        let mut gate = wide_gate();
        let mut rng = ConstRng::new(u32::MAX);

        let intent = TradeIntent::Broadcast {
            wanted: String::from("piedra"),
            offered: String::from("madera"),
        };
        let first = dispatch(&intent, &snap, &server, &mut memory, &mut gate, &mut rng).await;
        assert_eq!(first.ok(), Some(DispatchOutcome::BroadcastSent));
        let calls_after_first = server.calls().len();

        let second = dispatch(&intent, &snap, &server, &mut memory, &mut gate, &mut rng).await;
        assert_eq!(second.ok(), Some(DispatchOutcome::Rejected));
        // No additional network calls, memory unchanged.
        assert_eq!(server.calls().len(), calls_after_first);
        assert!(memory.matches("piedra", "madera"));
    }

    #[tokio::test]
    async fn broadcast_with_empty_roster_is_rejected() {
        let snap = snapshot(
            serde_json::json!({
                "Recursos": {"madera": 4},
                "Objetivo": {"piedra": 3}
            }),
            &[],
        );
        let server = MockServer::default();
        let mut memory = OfferMemory::new();
        let mut gate = wide_gate();
        let mut rng = ConstRng::new(u32::MAX);

        let intent = TradeIntent::Broadcast {
            wanted: String::from("piedra"),
            offered: String::from("madera"),
        };
        let outcome = dispatch(&intent, &snap, &server, &mut memory, &mut gate, &mut rng).await;
        assert_eq!(outcome.ok(), Some(DispatchOutcome::Rejected));
        assert!(server.calls().is_empty());
    }
}
