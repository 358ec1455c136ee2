//! # Phalanx Crypto
//!
//! Digest primitives for the Phalanx consensus core.
//!
//! Message authentication and signing are handled outside the engine; the
//! only cryptographic operation the core performs itself is computing the
//! request digest that every vote in an instance must carry. This crate
//! provides that hashing surface:
//!
//! - [`keccak256`] / [`keccak256_concat`] - one-shot Keccak256 hashing
//! - [`hex_digest`] - the lowercase hex rendering used on the wire
//!
//! ## Example
//!
//! ```rust
//! use phalanx_crypto::{hex_digest, keccak256};
//!
//! let hash = keccak256(b"operation");
//! assert_eq!(hash.len(), 32);
//! assert_eq!(hex_digest(&hash).len(), 64);
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod hash;

pub use hash::{hex_digest, keccak256, keccak256_concat};

/// Common type alias for a 32-byte Keccak256 digest.
pub type Hash = [u8; 32];
