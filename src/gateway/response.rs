use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::error::GatewayFault;

/// Concatenate the text parts of the first candidate.
pub fn candidate_text(response: &Value) -> Result<String, GatewayFault> {
    let parts = response
        .pointer("/candidates/0/content/parts")
        .and_then(Value::as_array)
        .ok_or(GatewayFault::EmptyResponse)?;

    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(Value::as_str))
        .collect();

    if text.trim().is_empty() {
        return Err(GatewayFault::EmptyResponse);
    }
    Ok(text)
}

/// Parse a structured (JSON mode) response body into `T`.
pub fn parse_structured<T: DeserializeOwned>(response: &Value) -> Result<T, GatewayFault> {
    let text = candidate_text(response)?;
    Ok(serde_json::from_str(text.trim())?)
}
