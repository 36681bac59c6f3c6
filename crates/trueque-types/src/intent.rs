//! The action intent produced by the decision source.
//!
//! Exactly one intent is produced per loop iteration and consumed
//! immediately; intents are never persisted. The decision source is
//! untrusted, so every field here is re-validated by the dispatcher against
//! the current ledgers before any side effect.

/// One of the four trade actions the agent can take in an iteration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TradeIntent {
    /// Accept a favorable trade letter: confirm to the sender and ship the
    /// requested resource.
    Accept {
        /// Alias of the player to confirm and ship to.
        recipient: String,
        /// Resource to send as payment.
        resource: String,
        /// Quantity to send (clamped to stock by the dispatcher).
        quantity: u64,
        /// Resource the agent expects to receive in return.
        expected_resource: String,
        /// Quantity the agent expects to receive.
        expected_quantity: u64,
        /// Id of the accepted letter, when the decision source named one.
        letter_id: Option<String>,
    },
    /// Delete a useless letter from the mailbox.
    Discard {
        /// Id of the letter to delete.
        letter_id: Option<String>,
    },
    /// Ship resources promised in an already-agreed trade.
    Fulfill {
        /// Alias of the player awaiting the shipment.
        recipient: String,
        /// Resource promised in the agreement.
        resource: String,
        /// Promised quantity (clamped to stock by the dispatcher).
        quantity: u64,
        /// Id of the agreement letter, when one was named.
        letter_id: Option<String>,
    },
    /// Send the same (want, give) offer to every other known player.
    Broadcast {
        /// Resource the agent wants to obtain.
        wanted: String,
        /// Resource the agent offers in exchange.
        offered: String,
    },
}

impl TradeIntent {
    /// Short action name for logging.
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Accept { .. } => "accept_offer",
            Self::Discard { .. } => "discard_letter",
            Self::Fulfill { .. } => "fulfill_deal",
            Self::Broadcast { .. } => "broadcast_offer",
        }
    }
}
