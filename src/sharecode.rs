//! Share codes — a reversible, URL-safe encoding of an event id.
//!
//! Not a secret: anyone holding a code can subscribe to the event.

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use uuid::Uuid;

/// Encode an event id as a share code.
pub fn encode(event_id: Uuid) -> String {
    URL_SAFE_NO_PAD.encode(event_id.as_bytes())
}

/// Decode a share code back to an event id. `None` for anything that is
/// not a well-formed code.
pub fn decode(code: &str) -> Option<Uuid> {
    let bytes = URL_SAFE_NO_PAD.decode(code.as_bytes()).ok()?;
    Uuid::from_slice(&bytes).ok()
}
