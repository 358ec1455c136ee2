//! Canonical wire encoding.
//!
//! Every message crosses the network as the JSON encoding of its
//! [`ConsensusMsg`](crate::ConsensusMsg) variant. Struct field order makes
//! the encoding deterministic, and decoding is strict: a malformed payload
//! is reported as [`CodecError`] and the message is dropped by the caller.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A payload that could not be encoded or decoded.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The payload is not a well-formed encoding of the expected message.
    #[error("malformed payload: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Encode a message to its canonical wire bytes.
pub fn encode<T: Serialize>(msg: &T) -> Result<Vec<u8>, CodecError> {
    Ok(serde_json::to_vec(msg)?)
}

/// Decode a message from wire bytes.
pub fn decode<T: DeserializeOwned>(bytes: &[u8]) -> Result<T, CodecError> {
    Ok(serde_json::from_slice(bytes)?)
}
