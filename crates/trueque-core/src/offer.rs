//! Broadcast offer memory and the anti-repetition rotation.
//!
//! Broadcasting the identical (want, give) pair to the whole roster every
//! cycle trains the other players to ignore the agent. The rotation keeps
//! the decision source's proposal when it is feasible, substitutes the first
//! feasible candidate when it is not, and forces a change when the pair
//! would repeat the previous broadcast. Gold is never offered.

use trueque_types::is_gold;

use crate::snapshot::Snapshot;

/// The last successfully broadcast (want, give) pair.
///
/// Owned by the loop instance and updated only after a broadcast records at
/// least one confirmed delivery; unset at agent start.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OfferMemory {
    /// Resource requested in the last broadcast.
    pub wanted: Option<String>,
    /// Resource offered in the last broadcast.
    pub offered: Option<String>,
}

impl OfferMemory {
    /// Fresh memory with no recorded broadcast.
    pub const fn new() -> Self {
        Self {
            wanted: None,
            offered: None,
        }
    }

    /// Record the pair from a confirmed broadcast.
    pub fn record(&mut self, wanted: &str, offered: &str) {
        self.wanted = Some(wanted.to_owned());
        self.offered = Some(offered.to_owned());
    }

    /// Whether the given pair repeats the last recorded broadcast.
    pub fn matches(&self, wanted: &str, offered: &str) -> bool {
        self.wanted.as_deref() == Some(wanted) && self.offered.as_deref() == Some(offered)
    }
}

/// A validated (want, give) pair ready to broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RotatedOffer {
    /// Resource the agent asks for.
    pub wanted: String,
    /// Resource the agent gives in exchange; never gold.
    pub offered: String,
    /// Whether the pair was forcibly changed to avoid repeating the
    /// previous broadcast.
    pub rotated: bool,
}

/// Candidate pools for the rotation, in construction order.
///
/// "Want" candidates are the positive deficits. "Give" candidates are the
/// positive non-gold surpluses; when no surplus exists, any held non-gold
/// resource that is not itself a deficit serves as fallback.
fn candidate_pools(snapshot: &Snapshot) -> (Vec<&str>, Vec<&str>) {
    let want: Vec<&str> = snapshot
        .deficit
        .iter()
        .filter(|(_, qty)| *qty > 0)
        .map(|(r, _)| r.as_str())
        .collect();

    let mut give: Vec<&str> = snapshot
        .surplus
        .iter()
        .filter(|(r, qty)| *qty > 0 && !is_gold(r))
        .map(|(r, _)| r.as_str())
        .collect();

    if give.is_empty() {
        give = snapshot
            .held
            .iter()
            .filter(|(r, qty)| **qty > 0 && !is_gold(r) && !snapshot.is_deficit(r))
            .map(|(r, _)| r.as_str())
            .collect();
    }

    (want, give)
}

/// Adjust a proposed (want, give) pair into a valid, non-repeating offer.
///
/// Returns `None` when no feasible pair exists (nothing missing or nothing
/// to give). Otherwise:
///
/// 1. Each side of the proposal is kept only if it is a member of its
///    candidate pool; otherwise the first candidate replaces it.
/// 2. `want == give` is fixed by taking the first different give-candidate,
///    when one exists.
/// 3. A pair equal to the last broadcast is rotated: the want side first if
///    it has an alternative, the give side otherwise. With no alternative on
///    either side the repeat is accepted -- better than no offer.
/// 4. `want == give` is re-checked after the forced rotation.
pub fn rotate_offer(
    proposed_wanted: &str,
    proposed_offered: &str,
    snapshot: &Snapshot,
    memory: &OfferMemory,
) -> Option<RotatedOffer> {
    let (want_pool, give_pool) = candidate_pools(snapshot);
    if want_pool.is_empty() || give_pool.is_empty() {
        return None;
    }

    let proposed_wanted = proposed_wanted.trim();
    let proposed_offered = proposed_offered.trim();

    let mut wanted = if want_pool.contains(&proposed_wanted) {
        proposed_wanted
    } else {
        want_pool.first().copied()?
    };
    let mut offered = if give_pool.contains(&proposed_offered) {
        proposed_offered
    } else {
        give_pool.first().copied()?
    };

    if wanted == offered
        && let Some(alt) = give_pool.iter().copied().find(|&r| r != wanted)
    {
        offered = alt;
    }

    let mut rotated = false;
    if memory.matches(wanted, offered) {
        if want_pool.len() > 1 {
            if let Some(alt) = want_pool.iter().copied().find(|&r| r != wanted) {
                wanted = alt;
                rotated = true;
            }
        } else if give_pool.len() > 1
            && let Some(alt) = give_pool.iter().copied().find(|&r| r != offered)
        {
            offered = alt;
            rotated = true;
        }
    }

    if wanted == offered
        && let Some(alt) = give_pool.iter().copied().find(|&r| r != wanted)
    {
        offered = alt;
    }

    Some(RotatedOffer {
        wanted: wanted.to_owned(),
        offered: offered.to_owned(),
        rotated,
    })
}
