//! Pure negotiation logic for the trueque trading agent.
//!
//! Everything in this crate operates on in-memory state with no I/O: the
//! agent binary feeds it raw server payloads and untrusted decision-source
//! output, and it answers with validated, derived data. This is the layer
//! where the recurring edge cases live (gold rule, stock clamping, offer
//! repetition), so it is also where most of the unit tests live.
//!
//! # Modules
//!
//! - [`snapshot`] -- Derives deficits, surpluses, and the visible mailbox
//!   window from a raw `/info` payload
//! - [`roster`] -- Normalizes the `/gente` player list
//! - [`offer`] -- Broadcast offer memory and the anti-repetition rotation
//! - [`guard`] -- Dispatcher guards: recipient extraction, quantity coercion,
//!   stock clamping

pub mod guard;
pub mod offer;
pub mod roster;
pub mod snapshot;

// Re-export primary types at crate root for convenience.
pub use guard::{clamp_outgoing, coerce_quantity, extract_recipient};
pub use offer::{OfferMemory, RotatedOffer, rotate_offer};
pub use roster::normalize_roster;
pub use snapshot::{Snapshot, VISIBLE_LETTERS};
