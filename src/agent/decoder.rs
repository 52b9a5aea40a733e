//! Argument decoding for tool calls.

use serde_json::{Map, Value};
use thiserror::Error;

/// The model's argument payload could not be read as a JSON object.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid arguments for `{tool}`: {diagnostic} (raw payload: {raw:?})")]
pub struct ArgumentDecodeError {
    pub tool: String,
    pub raw: String,
    pub diagnostic: String,
}

/// Parse a raw argument payload into an argument object.
///
/// Empty, blank or `null` payloads decode to an empty object since some tools
/// take no arguments. Anything else must be a JSON object. No schema checks
/// happen here; the tool validates its own fields.
pub fn decode(tool_name: &str, raw: Option<&str>) -> Result<Map<String, Value>, ArgumentDecodeError> {
    let raw = raw.unwrap_or_default();
    if raw.trim().is_empty() {
        return Ok(Map::new());
    }

    let error = |diagnostic: String| ArgumentDecodeError {
        tool: tool_name.to_string(),
        raw: raw.to_string(),
        diagnostic,
    };

    match serde_json::from_str::<Value>(raw) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(Value::Null) => Ok(Map::new()),
        Ok(other) => Err(error(format!(
            "expected a JSON object, found {}",
            json_kind(&other)
        ))),
        Err(e) => Err(error(e.to_string())),
    }
}

/// Render an argument object as a compact payload.
pub fn encode(args: &Map<String, Value>) -> String {
    Value::Object(args.clone()).to_string()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
