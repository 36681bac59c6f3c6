//! Player roster normalization.
//!
//! `GET /gente` returns either a list of plain alias strings or a list of
//! records carrying an `alias` field, and has been observed mixing both.
//! Normalization accepts either shape, trims whitespace, drops empties and
//! the agent itself, and collapses duplicates while preserving first-seen
//! order.

use serde_json::Value;

/// Normalize a raw roster payload into the list of other players.
///
/// Anything that is not a list yields an empty roster (a failed fetch is
/// not an error, just nobody to talk to this iteration).
pub fn normalize_roster(raw: &Value, own_name: &str) -> Vec<String> {
    let Some(entries) = raw.as_array() else {
        return Vec::new();
    };

    let mut aliases: Vec<String> = Vec::new();
    for entry in entries {
        let alias = match entry {
            Value::String(s) => s.trim(),
            Value::Object(record) => record
                .get("alias")
                .and_then(Value::as_str)
                .unwrap_or("")
                .trim(),
            _ => "",
        };

        if !alias.is_empty() && alias != own_name && !aliases.iter().any(|a| a == alias) {
            aliases.push(alias.to_owned());
        }
    }
    aliases
}
