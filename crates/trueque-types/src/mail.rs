//! Mailbox items, outgoing letters, and the `/info` payload.
//!
//! Field names on the wire are the server's Spanish names (`remi`, `dest`,
//! `asunto`, `cuerpo`, `Recursos`, `Objetivo`, `Buzon`); the Rust structs use
//! English names with serde renames. The mailbox is kept as a raw
//! `serde_json::Map` so server insertion order survives deserialization
//! (`serde_json` is built with `preserve_order`).

use serde::{Deserialize, Serialize};

use crate::ledger::Ledger;

/// One letter in the in-game mailbox, as stored by the server.
///
/// The server owns these; the agent only reads them and deletes them by id.
/// Every field defaults to empty so a partially-filled letter still parses.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailItem {
    /// Sender alias (`remi`).
    #[serde(rename = "remi", default)]
    pub sender: String,
    /// Recipient alias (`dest`).
    #[serde(rename = "dest", default)]
    pub recipient: String,
    /// Subject line (`asunto`).
    #[serde(rename = "asunto", default)]
    pub subject: String,
    /// Message body (`cuerpo`).
    #[serde(rename = "cuerpo", default)]
    pub body: String,
}

/// An outgoing letter for `POST /carta`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Letter {
    /// Sender alias (`remi`).
    #[serde(rename = "remi")]
    pub sender: String,
    /// Recipient alias (`dest`).
    #[serde(rename = "dest")]
    pub recipient: String,
    /// Subject line (`asunto`).
    #[serde(rename = "asunto")]
    pub subject: String,
    /// Message body (`cuerpo`).
    #[serde(rename = "cuerpo")]
    pub body: String,
}

/// The raw game state returned by `GET /info`.
///
/// `resources` is optional on purpose: its absence marks the fetch as
/// incomplete and the agent must skip the iteration rather than act on
/// partial data.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GameState {
    /// Current holdings (`Recursos`). `None` means the payload was incomplete.
    #[serde(rename = "Recursos", default)]
    pub resources: Option<Ledger>,
    /// Goal holdings (`Objetivo`).
    #[serde(rename = "Objetivo", default)]
    pub goal: Ledger,
    /// Full mailbox (`Buzon`), keyed by letter id, in server order.
    #[serde(rename = "Buzon", default)]
    pub mailbox: serde_json::Map<String, serde_json::Value>,
}

impl GameState {
    /// Whether the payload carries enough data to act on.
    pub const fn is_complete(&self) -> bool {
        self.resources.is_some()
    }
}
