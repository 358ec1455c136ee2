//! # Phalanx Types
//!
//! Core type definitions for the Phalanx consensus engine.
//!
//! This crate provides the vocabulary shared by every other crate:
//!
//! - [`RequestMsg`], [`PrePrepareMsg`], [`VoteMsg`], [`StoredPrepareMsg`],
//!   [`ReplyMsg`] - the protocol messages of the four PBFT phases
//! - [`ConsensusMsg`] - the tagged sum the dispatcher switches on
//! - [`VoteKind`] - the Prepare/Commit discriminator carried by votes
//! - [`Replica`], [`Committee`], [`View`] - the fixed membership model
//! - [`codec`] - the canonical JSON wire encoding
//!
//! ## Example
//!
//! ```rust
//! use phalanx_types::{codec, ConsensusMsg, RequestMsg};
//!
//! let req = RequestMsg::new("client-1", 1_700_000_000, "transfer", 7, b"payload".to_vec());
//! let bytes = codec::encode(&ConsensusMsg::Request(req.clone())).unwrap();
//! let decoded: ConsensusMsg = codec::decode(&bytes).unwrap();
//! assert_eq!(decoded, ConsensusMsg::Request(req));
//! ```

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod codec;
pub mod committee;
pub mod message;

pub use codec::CodecError;
pub use committee::{Committee, Replica, View, INITIAL_VIEW_ID};
pub use message::{
    ConsensusMsg, NodeId, PrePrepareMsg, ReplyMsg, RequestMsg, StoredPrepareMsg, VoteKind,
    VoteMsg, EXECUTED,
};
