//! Dispatcher guards.
//!
//! The decision source is untrusted: recipients arrive as strings or as
//! whole roster records, quantities arrive as numbers, numeric strings, or
//! garbage, and claimed stock levels may be fiction. These helpers normalize
//! each argument and re-derive feasibility from the actual ledger.

use serde_json::Value;

use trueque_types::Ledger;
use trueque_types::ledger::held_quantity;

/// Extract a recipient alias from a raw argument.
///
/// Accepts a plain string or a record with an `alias` field; anything else
/// yields an empty string, which the dispatcher treats as a rejection.
pub fn extract_recipient(raw: &Value) -> String {
    match raw {
        Value::String(s) => s.trim().to_owned(),
        Value::Object(record) => record
            .get("alias")
            .and_then(Value::as_str)
            .unwrap_or("")
            .trim()
            .to_owned(),
        _ => String::new(),
    }
}

/// Coerce a raw argument into a positive quantity, defaulting to 1.
///
/// Negative numbers, zero, fractions, and unparsable strings all collapse
/// to 1 rather than failing the action.
pub fn coerce_quantity(raw: &Value) -> u64 {
    let parsed = match raw {
        Value::Number(n) => n.as_u64().or_else(|| {
            // Negative integers coerce to the minimum rather than erroring.
            n.as_i64().map(|_| 0)
        }),
        Value::String(s) => s.trim().parse::<u64>().ok(),
        _ => None,
    };
    parsed.unwrap_or(1).max(1)
}

/// Clamp an outgoing quantity to what is actually in stock.
///
/// Returns `None` when nothing is held, in which case the whole action must
/// be suppressed rather than sending an empty package.
pub fn clamp_outgoing(held: &Ledger, resource: &str, requested: u64) -> Option<u64> {
    let available = held_quantity(held, resource);
    if available == 0 {
        return None;
    }
    Some(requested.min(available))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipient_from_string_or_record() {
        assert_eq!(extract_recipient(&serde_json::json!(" ANA ")), "ANA");
        assert_eq!(extract_recipient(&serde_json::json!({"alias": "LUIS"})), "LUIS");
        assert_eq!(extract_recipient(&serde_json::json!({"name": "LUIS"})), "");
        assert_eq!(extract_recipient(&serde_json::json!(3)), "");
        assert_eq!(extract_recipient(&serde_json::json!(["ANA"])), "");
    }

    #[test]
    fn quantity_coercion_is_positive_with_default_one() {
        assert_eq!(coerce_quantity(&serde_json::json!(4)), 4);
        assert_eq!(coerce_quantity(&serde_json::json!(0)), 1);
        assert_eq!(coerce_quantity(&serde_json::json!(-7)), 1);
        assert_eq!(coerce_quantity(&serde_json::json!("12")), 12);
        assert_eq!(coerce_quantity(&serde_json::json!("doce")), 1);
        assert_eq!(coerce_quantity(&serde_json::json!(null)), 1);
        assert_eq!(coerce_quantity(&serde_json::json!(2.9)), 1);
    }

    #[test]
    fn clamp_caps_at_stock_and_rejects_empty_stock() {
        let mut held = Ledger::new();
        held.insert(String::from("madera"), 2);

        assert_eq!(clamp_outgoing(&held, "madera", 1), Some(1));
        assert_eq!(clamp_outgoing(&held, "madera", 5), Some(2));
        assert_eq!(clamp_outgoing(&held, "piedra", 1), None);
    }
}
