//! The message codec: JSON wire frames in, typed `Message`s out, and back.

mod message;

pub use message::{ClientMessage, CodecError, ServerMessage};

use serde_json::Value;

/// Envelope fields every wire frame carries; decoded first so dispatch
/// doesn't need to know a variant's payload shape to find its `type`/`_id`.
struct Envelope {
    kind: String,
    id: Option<String>,
}

fn extract_envelope(value: &Value) -> Result<Envelope, CodecError> {
    let obj = value.as_object().ok_or(CodecError::Malformed("frame is not a JSON object".into()))?;
    let kind = obj
        .get("type")
        .and_then(Value::as_str)
        .ok_or(CodecError::Malformed("missing `type` field".into()))?
        .to_string();
    let id = obj
        .get("_id")
        .and_then(Value::as_str)
        .map(|s| s.chars().take(63).collect());
    Ok(Envelope { kind, id })
}

/// Decodes one UTF-8 JSON text frame into a client-originated message.
pub fn decode(frame: &str) -> Result<(ClientMessage, Option<String>), CodecError> {
    let value: Value = serde_json::from_str(frame).map_err(|e| CodecError::Malformed(e.to_string()))?;
    let envelope = extract_envelope(&value)?;
    let message = ClientMessage::from_envelope(&envelope.kind, value)?;
    Ok((message, envelope.id))
}

/// Encodes a server-originated message, stamping a correlation id if the
/// originating client request carried one. Broadcast events pass `id=None`.
pub fn encode(message: &ServerMessage, id: Option<&str>) -> Result<String, CodecError> {
    let mut value = serde_json::to_value(message).map_err(|e| CodecError::Unserializable(e.to_string()))?;
    if let Some(obj) = value.as_object_mut() {
        if let Some(id) = id {
            obj.insert("_id".to_string(), Value::String(id.to_string()));
        }
    }
    serde_json::to_string(&value).map_err(|e| CodecError::Unserializable(e.to_string()))
}
