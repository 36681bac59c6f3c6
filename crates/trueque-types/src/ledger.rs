//! Resource ledgers and the gold rule.
//!
//! A ledger maps resource names (case-sensitive, as reported by the Butler
//! server) to non-negative quantities. Gold (`"oro"`) is special: it is never
//! a tradeable surplus and never an acceptable outgoing resource.

use std::collections::BTreeMap;

/// A mapping from resource name to held quantity.
///
/// Resource names are kept exactly as the server reports them; quantities
/// are never negative.
pub type Ledger = BTreeMap<String, u64>;

/// The server's name for gold, the non-tradeable resource.
pub const GOLD: &str = "oro";

/// Whether a resource name refers to gold.
///
/// Matches the server name after trimming, ignoring ASCII case, so sloppy
/// decision-source output (`" Oro "`) is still caught.
pub fn is_gold(resource: &str) -> bool {
    resource.trim().eq_ignore_ascii_case(GOLD)
}

/// Quantity of `resource` held in `ledger`, zero when absent.
pub fn held_quantity(ledger: &Ledger, resource: &str) -> u64 {
    ledger.get(resource).copied().unwrap_or(0)
}
