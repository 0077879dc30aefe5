//! Reassembly and parsing of streamed tool-call arguments.

use crate::error::OrchestratorError;
use serde_json::Value;
use tracing::warn;

/// Joins argument fragments in the order they arrived.
pub fn reassemble<S: AsRef<str>>(fragments: &[S]) -> String {
    fragments.iter().map(AsRef::as_ref).collect()
}

/// Parses a tool argument payload into JSON.
///
/// The model occasionally emits the same argument object twice back to back
/// (`{"a":1}{"a":1}`). When strict parsing fails and the payload contains more
/// than one `{`, the text from the first `{` through the first `}` is parsed
/// instead. This recovery is lossy: a nested object is cut at its first
/// closing brace and will then fail to parse.
///
/// An empty payload is treated as an empty argument object.
pub fn parse_tool_arguments(tool: &str, payload: &str) -> Result<Value, OrchestratorError> {
    if payload.trim().is_empty() {
        return Ok(Value::Object(Default::default()));
    }

    let strict_error = match serde_json::from_str(payload) {
        Ok(value) => return Ok(value),
        Err(e) => e,
    };

    let parse_error = |source| OrchestratorError::ArgumentParse {
        tool: tool.to_string(),
        payload: payload.to_string(),
        source,
    };

    if payload.matches('{').count() < 2 {
        return Err(parse_error(strict_error));
    }

    warn!(%tool, %payload, "Duplicated tool arguments returned by the model, recovering");
    let start = payload.find('{').unwrap_or(0);
    let recovered = match payload[start..].find('}') {
        Some(end) => &payload[start..=start + end],
        None => &payload[start..],
    };
    serde_json::from_str(recovered).map_err(parse_error)
}
