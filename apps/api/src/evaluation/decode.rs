//! Schema-validated decoding of structured LLM output.

use serde::de::DeserializeOwned;

use crate::llm_client::strip_json_fences;

/// Outcome of decoding one structured completion.
#[derive(Debug)]
pub enum Decoded<T> {
    Parsed(T),
    Malformed { raw: String, reason: String },
}

/// Strips code fences and deserializes into `T`. Never panics on bad input;
/// a response that does not match the schema comes back as `Malformed` with
/// the raw text kept for logging.
pub fn decode_structured<T: DeserializeOwned>(raw: &str) -> Decoded<T> {
    match serde_json::from_str::<T>(strip_json_fences(raw)) {
        Ok(value) => Decoded::Parsed(value),
        Err(e) => Decoded::Malformed {
            raw: raw.to_string(),
            reason: e.to_string(),
        },
    }
}
