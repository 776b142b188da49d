use serde::de::DeserializeOwned;
use tracing::debug;

/// Decodes a JSON request body into `T`.
///
/// An empty body, malformed JSON, or a value of the wrong shape all yield `None`;
/// nothing of a partially valid payload is kept.
pub fn parse_body<T: DeserializeOwned>(body: Option<&[u8]>) -> Option<T> {
    let raw = body.filter(|b| !b.is_empty())?;
    match serde_json::from_slice(raw) {
        Ok(value) => Some(value),
        Err(e) => {
            debug!(error = %e, "request body rejected");
            None
        }
    }
}
