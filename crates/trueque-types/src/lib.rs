//! Shared type definitions for the trueque trading agent.
//!
//! This crate is the single source of truth for the data shapes exchanged
//! with the Butler game server and between the workspace crates. It contains
//! no logic beyond trivial accessors; derivations (deficits, surpluses,
//! rotation) live in `trueque-core`.
//!
//! # Modules
//!
//! - [`ledger`] -- Resource ledgers and the gold rule
//! - [`mail`] -- Mailbox items, outgoing letters, and the `/info` payload
//! - [`intent`] -- The four-variant action intent produced by the decision source

pub mod intent;
pub mod ledger;
pub mod mail;

// Re-export all public types at crate root for convenience.
pub use intent::TradeIntent;
pub use ledger::{GOLD, Ledger, is_gold};
pub use mail::{GameState, Letter, MailItem};
