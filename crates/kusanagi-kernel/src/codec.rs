//! Wire codecs.
//!
//! MsgPack is the gateway wire format; JSON is used for stdin invocation and
//! for rendering userland log values. Struct fields keep their short wire
//! tags through serde renames, so both codecs produce the exact key set the
//! gateway expects. MsgPack raw bytes holding text decode as [`String`]
//! values and map keys always materialize as strings.

use serde::de::DeserializeOwned;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while encoding or decoding payloads.
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum CodecError {
    #[error("Pack error: {0}")]
    Pack(String),

    #[error("Unpack error: {0}")]
    Unpack(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type for codec operations.
pub type CodecResult<T> = Result<T, CodecError>;

/// Encode a value as MsgPack with map (named field) encoding.
pub fn pack<T: Serialize>(value: &T) -> CodecResult<Vec<u8>> {
    rmp_serde::to_vec_named(value).map_err(|e| CodecError::Pack(e.to_string()))
}

/// Decode a MsgPack buffer into a typed value.
pub fn unpack<T: DeserializeOwned>(bytes: &[u8]) -> CodecResult<T> {
    rmp_serde::from_slice(bytes).map_err(|e| CodecError::Unpack(e.to_string()))
}

/// Encode a value as pretty printed JSON.
///
/// Object keys serialize in a stable (sorted) order.
pub fn to_json_pretty<T: Serialize>(value: &T) -> CodecResult<String> {
    Ok(serde_json::to_string_pretty(value)?)
}

/// Encode a value as compact JSON.
pub fn to_json<T: Serialize>(value: &T) -> CodecResult<String> {
    Ok(serde_json::to_string(value)?)
}

/// Decode a JSON string into a typed value.
pub fn from_json<T: DeserializeOwned>(text: &str) -> CodecResult<T> {
    Ok(serde_json::from_str(text)?)
}
