//! Turning raw model replies into stage values.

use serde_json::Value;

use super::state::StageValue;

/// Pull a JSON document out of a model reply.
///
/// A ```json fenced block wins when present; otherwise the whole trimmed reply
/// must be JSON. Anything else yields None.
pub fn extract_json(reply: &str) -> Option<Value> {
    let candidate = match fenced_json(reply) {
        Some(block) => block,
        None => reply.trim(),
    };
    serde_json::from_str(candidate).ok()
}

fn fenced_json(reply: &str) -> Option<&str> {
    let start = reply.find("```json")? + "```json".len();
    let rest = &reply[start..];
    let end = rest.find("```").unwrap_or(rest.len());
    Some(rest[..end].trim())
}

/// Parse a reply for a stage expecting JSON, keeping the raw text when it is not
/// JSON or is only a JSON string.
pub fn parse_json_reply(stage: &str, reply: &str) -> StageValue {
    match extract_json(reply) {
        Some(Value::String(_)) => StageValue::Text(reply.to_string()),
        Some(value) => StageValue::Structured(value),
        None => {
            log::warn!(
                "Stage '{}' returned text that is not valid JSON ({} bytes); keeping raw reply",
                stage,
                reply.len()
            );
            StageValue::Text(reply.to_string())
        }
    }
}
