//! Re-encoding of rewritten bodies for the outgoing request.

use bytes::Bytes;
use serde_json::Value;
use tracing::error;

use crate::error::{ProxyError, Result};

/// Serialize a rewritten body and return it with its content length.
///
/// Objects and arrays are encoded as JSON and strings are forwarded as raw
/// text. Any other value has no body representation.
pub fn encode_body(body: &Value) -> Result<(Bytes, usize)> {
    let bytes = match body {
        Value::Object(_) | Value::Array(_) => Bytes::from(serde_json::to_vec(body)?),
        Value::String(raw) => Bytes::from(raw.clone()),
        other => {
            error!(body = %other, "Unknown body type");
            return Err(ProxyError::unrecognized(format!(
                "cannot encode a {} body",
                kind_of(other)
            )));
        }
    };
    let length = bytes.len();
    Ok((bytes, length))
}

/// Parse a backend or client body. An empty body is `None`.
pub fn decode_body(bytes: &[u8]) -> Result<Option<Value>> {
    if bytes.iter().all(u8::is_ascii_whitespace) {
        return Ok(None);
    }
    Ok(Some(serde_json::from_slice(bytes)?))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
