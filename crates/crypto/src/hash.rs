//! Keccak256 hashing for request digests.
//!
//! Every consensus instance pins its votes to the digest of the client
//! request; these helpers compute that digest and its wire rendering.

use sha3::{Digest, Keccak256};

use crate::Hash;

/// Compute the Keccak256 hash of the input data.
#[inline]
pub fn keccak256(data: &[u8]) -> Hash {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    hasher.finalize().into()
}

/// Compute the Keccak256 hash of multiple concatenated inputs.
///
/// Equivalent to hashing the concatenation of `parts` without allocating
/// an intermediate buffer. Used to prefix a domain tag onto an encoded
/// message before digesting it.
#[inline]
pub fn keccak256_concat(parts: &[&[u8]]) -> Hash {
    let mut hasher = Keccak256::new();
    for part in parts {
        hasher.update(part);
    }
    hasher.finalize().into()
}

/// Render a digest as the lowercase hex string carried on the wire.
#[inline]
pub fn hex_digest(hash: &Hash) -> String {
    hex::encode(hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keccak256_empty_input() {
        // Known Keccak256 of the empty string.
        assert_eq!(
            hex_digest(&keccak256(b"")),
            "c5d2460186f7233c927e7db2dcc703c0e500b653ca82273b7bfad8045d85a470"
        );
    }

    #[test]
    fn keccak256_is_deterministic() {
        assert_eq!(keccak256(b"client request"), keccak256(b"client request"));
        assert_ne!(keccak256(b"client request"), keccak256(b"client request2"));
    }

    #[test]
    fn concat_matches_single_shot() {
        let joined = keccak256(b"domain|payload");
        let parts = keccak256_concat(&[b"domain|", b"payload"]);
        assert_eq!(joined, parts);
    }

    #[test]
    fn hex_digest_is_lowercase_and_stable() {
        let rendered = hex_digest(&keccak256(b"abc"));
        assert_eq!(rendered.len(), 64);
        assert_eq!(rendered, rendered.to_lowercase());
    }
}
