//! Parsing of untrusted decision-source output into a [`TradeIntent`].
//!
//! Local models rarely return clean JSON on the first try: the object comes
//! wrapped in markdown fences, prefixed with reasoning prose, or carries
//! trailing commas. The parser tries a sequence of recovery strategies and
//! gives up with `None` ("no decision") when none of them yields a
//! recognizable action. Argument values are normalized here (recipient
//! extraction, quantity coercion); feasibility against the ledger is the
//! dispatcher's job.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use trueque_core::{coerce_quantity, extract_recipient};
use trueque_types::TradeIntent;

/// The raw JSON shape the decision source is asked to produce.
#[derive(Debug, Deserialize)]
struct RawToolCall {
    /// Action name; aliases are accepted, see [`intent_from_call`].
    action: String,
    /// Free-form argument bag, validated field by field.
    #[serde(default)]
    arguments: Value,
}

/// Parse raw decision-source text into an intent.
///
/// Returns `None` when the text contains no recognizable action. Recovery
/// strategies, in order: the text as-is, the first fenced code block,
/// trailing-comma stripping, and both combined.
pub fn parse_intent(raw: &str) -> Option<TradeIntent> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }

    let candidates = [
        raw.to_owned(),
        extract_code_block(raw).unwrap_or_default(),
        strip_trailing_commas(raw),
        strip_trailing_commas(&extract_code_block(raw).unwrap_or_default()),
    ];

    for candidate in &candidates {
        if candidate.is_empty() {
            continue;
        }
        if let Ok(call) = serde_json::from_str::<RawToolCall>(candidate) {
            return intent_from_call(&call);
        }
    }

    debug!(
        reply_prefix = raw.get(..raw.len().min(120)).unwrap_or(raw),
        "decision reply is not a structured action"
    );
    None
}

/// Extract the contents of the first fenced code block, if any.
fn extract_code_block(text: &str) -> Option<String> {
    let start = text.find("```")?;
    let after_fence = text.get(start.checked_add(3)?..)?;
    // Skip an optional language tag on the fence line.
    let body_start = after_fence.find('\n')?;
    let body = after_fence.get(body_start.checked_add(1)?..)?;
    let end = body.find("```")?;
    Some(body.get(..end)?.trim().to_owned())
}

/// Remove commas that directly precede a closing brace or bracket.
///
/// Quote-aware: commas inside string values are left alone.
fn strip_trailing_commas(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut held = String::new();
    let mut in_string = false;
    let mut escaped = false;
    for ch in text.chars() {
        if in_string {
            out.push(ch);
            match ch {
                '\\' if !escaped => escaped = true,
                '"' if !escaped => in_string = false,
                _ => escaped = false,
            }
            continue;
        }
        match ch {
            '"' => {
                out.push_str(&held);
                held.clear();
                out.push(ch);
                in_string = true;
            }
            ',' => {
                out.push_str(&held);
                held.clear();
                held.push(ch);
            }
            '}' | ']' => {
                // Drop a held comma (and the whitespace after it).
                held.clear();
                out.push(ch);
            }
            c if c.is_whitespace() && !held.is_empty() => held.push(c),
            c => {
                out.push_str(&held);
                held.clear();
                out.push(c);
            }
        }
    }
    out.push_str(&held);
    out
}

/// Map a raw tool call to an intent, tolerating action-name aliases.
fn intent_from_call(call: &RawToolCall) -> Option<TradeIntent> {
    let args = &call.arguments;
    match call.action.trim().to_lowercase().as_str() {
        "accept_offer" | "accept" | "caso_1_aceptar" => Some(TradeIntent::Accept {
            recipient: extract_recipient_arg(args, &["recipient", "destinatario", "dest"]),
            resource: string_arg(args, &["resource", "recurso"]),
            quantity: coerce_quantity_arg(args, &["quantity", "cantidad"]),
            expected_resource: string_arg(
                args,
                &["expected_resource", "recurso_esperado"],
            ),
            expected_quantity: coerce_quantity_arg(
                args,
                &["expected_quantity", "cantidad_esperada"],
            ),
            letter_id: letter_id_arg(args),
        }),
        "discard_letter" | "discard" | "caso_2_borrar" => Some(TradeIntent::Discard {
            letter_id: letter_id_arg(args),
        }),
        "fulfill_deal" | "fulfill" | "caso_3_enviar" => Some(TradeIntent::Fulfill {
            recipient: extract_recipient_arg(args, &["recipient", "destinatario", "dest"]),
            resource: string_arg(args, &["resource", "recurso"]),
            quantity: coerce_quantity_arg(args, &["quantity", "cantidad"]),
            letter_id: letter_id_arg(args),
        }),
        "broadcast_offer" | "broadcast" | "caso_4_ofertar_todos" => {
            Some(TradeIntent::Broadcast {
                wanted: string_arg(args, &["wanted", "quiero"]),
                offered: string_arg(args, &["offered", "ofrezco"]),
            })
        }
        _ => None,
    }
}

/// A recipient argument under any of the given keys, normalized.
fn extract_recipient_arg(args: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| args.get(k))
        .map(extract_recipient)
        .unwrap_or_default()
}

/// A quantity argument under any of the given keys, coerced to >= 1.
fn coerce_quantity_arg(args: &Value, keys: &[&str]) -> u64 {
    keys.iter()
        .find_map(|k| args.get(k))
        .map(coerce_quantity)
        .unwrap_or(1)
}

/// First present argument under any of the given keys, trimmed.
fn string_arg(args: &Value, keys: &[&str]) -> String {
    keys.iter()
        .find_map(|k| args.get(k))
        .and_then(Value::as_str)
        .unwrap_or("")
        .trim()
        .to_owned()
}

/// A letter id argument; empty or missing ids collapse to `None`.
fn letter_id_arg(args: &Value) -> Option<String> {
    let id = string_arg(args, &["letter_id", "id_carta", "id"]);
    if id.is_empty() { None } else { Some(id) }
}
