//! Blob encoding for grant and client payloads.
//!
//! Payloads are stored as JSON. The stores only rely on the round trip:
//! decoding an encoded payload yields the original value.

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::StorageResult;

/// Encode a payload into its stored blob form.
///
/// # Errors
///
/// Returns `Serialization` if the value cannot be encoded.
pub fn encode<T: Serialize>(value: &T) -> StorageResult<Vec<u8>> {
    Ok(serde_json::to_vec(value)?)
}

/// Decode a stored blob back into its payload.
///
/// # Errors
///
/// Returns `Serialization` if the blob is not a valid encoding of `T`.
pub fn decode<T: DeserializeOwned>(blob: &[u8]) -> StorageResult<T> {
    Ok(serde_json::from_slice(blob)?)
}
