//! Protocol messages for the PBFT normal case.
//!
//! This module defines the messages exchanged during the four phases of a
//! consensus instance:
//! - [`RequestMsg`] - a client request handed to the primary
//! - [`PrePrepareMsg`] - the primary's sequence assignment, carrying the request
//! - [`VoteMsg`] - a Prepare or Commit vote from a replica
//! - [`StoredPrepareMsg`] - the stripped prepare vote relayed on the wire
//! - [`ReplyMsg`] - the decision handed to the application
//!
//! Incoming messages are discriminated at runtime through [`ConsensusMsg`],
//! a tagged sum with an explicit `msg_type` field; vote messages carry a
//! further [`VoteKind`] tag distinguishing Prepare from Commit.

use phalanx_crypto::{hex_digest, keccak256_concat};
use serde::{Deserialize, Serialize};

/// A replica identity: the hex-encoded uncompressed public key, as it
/// appears on the wire.
pub type NodeId = String;

/// Sentinel node id marking a reply whose verifier result code is 1.
pub const EXECUTED: &str = "Executed";

/// Domain tag prefixed to the request encoding before digesting, so a
/// request digest cannot collide with any other hashed context.
const REQUEST_DIGEST_DOMAIN: &[u8] = b"PHALANX_REQUEST_V1";

/// Vote discriminator carried by [`VoteMsg`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VoteKind {
    /// First voting phase: the replica accepted the pre-prepare.
    Prepare,
    /// Second voting phase: the replica saw a prepare quorum.
    Commit,
}

impl std::fmt::Display for VoteKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            VoteKind::Prepare => write!(f, "Prepare"),
            VoteKind::Commit => write!(f, "Commit"),
        }
    }
}

/// A client request driven through consensus.
///
/// The `sequence_id` is assigned by the primary when the instance starts;
/// a request arriving from a client carries `-1` until then.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestMsg {
    /// Identity of the submitting client.
    pub client_id: String,
    /// Client-side submission time, seconds since the epoch.
    pub timestamp: i64,
    /// The operation the client asks the committee to agree on.
    pub operation: String,
    /// Sequence number assigned by the primary, `-1` before assignment.
    pub sequence_id: i64,
    /// Application height the request executes at.
    pub height: u64,
    /// Opaque application payload.
    pub payload: Vec<u8>,
}

impl RequestMsg {
    /// Create a request as a client would submit it (no sequence assigned).
    pub fn new(
        client_id: impl Into<String>,
        timestamp: i64,
        operation: impl Into<String>,
        height: u64,
        payload: Vec<u8>,
    ) -> Self {
        Self {
            client_id: client_id.into(),
            timestamp,
            operation: operation.into(),
            sequence_id: -1,
            height,
            payload,
        }
    }

    /// Compute the digest every vote of the instance must match.
    ///
    /// The digest is Keccak256 over a stable, length-prefixed field encoding
    /// under a fixed domain tag; two requests differing in any field hash
    /// differently.
    pub fn digest(&self) -> String {
        let mut bytes = Vec::with_capacity(
            8 * 5 + self.client_id.len() + self.operation.len() + self.payload.len(),
        );
        bytes.extend_from_slice(&(self.client_id.len() as u64).to_le_bytes());
        bytes.extend_from_slice(self.client_id.as_bytes());
        bytes.extend_from_slice(&self.timestamp.to_le_bytes());
        bytes.extend_from_slice(&(self.operation.len() as u64).to_le_bytes());
        bytes.extend_from_slice(self.operation.as_bytes());
        bytes.extend_from_slice(&self.sequence_id.to_le_bytes());
        bytes.extend_from_slice(&self.height.to_le_bytes());
        bytes.extend_from_slice(&self.payload);
        hex_digest(&keccak256_concat(&[REQUEST_DIGEST_DOMAIN, &bytes]))
    }
}

/// The primary's phase-one message: sequence assignment plus the request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrePrepareMsg {
    /// View the instance runs in.
    pub view_id: u64,
    /// Sequence number the primary assigned to the request.
    pub sequence_id: i64,
    /// Digest of `request`; recomputed and checked by every participant.
    pub digest: String,
    /// The full client request.
    pub request: RequestMsg,
}

/// A Prepare or Commit vote for the live instance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteMsg {
    /// Whether this is a Prepare or a Commit vote.
    pub kind: VoteKind,
    /// View the vote belongs to.
    pub view_id: u64,
    /// Sequence number of the instance voted on.
    pub sequence_id: i64,
    /// Digest of the request voted on.
    pub digest: String,
    /// Identity of the voting replica.
    pub node_id: NodeId,
    /// Opaque signature blob from the verifier; carried on Commit votes only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pass: Option<Vec<u8>>,
}

/// A prepare vote stripped for relaying: the fields peers need to tally it,
/// without the heavy ones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredPrepareMsg {
    /// View the vote belongs to.
    pub view_id: u64,
    /// Sequence number of the instance voted on.
    pub sequence_id: i64,
    /// Digest of the request voted on.
    pub digest: String,
    /// Identity of the voting replica.
    pub node_id: NodeId,
    /// Always [`VoteKind::Prepare`]; kept explicit for wire discrimination.
    pub kind: VoteKind,
}

impl StoredPrepareMsg {
    /// Rebuild the full vote for tallying.
    pub fn into_vote(self) -> VoteMsg {
        VoteMsg {
            kind: self.kind,
            view_id: self.view_id,
            sequence_id: self.sequence_id,
            digest: self.digest,
            node_id: self.node_id,
            pass: None,
        }
    }
}

impl From<&VoteMsg> for StoredPrepareMsg {
    fn from(vote: &VoteMsg) -> Self {
        Self {
            view_id: vote.view_id,
            sequence_id: vote.sequence_id,
            digest: vote.digest.clone(),
            node_id: vote.node_id.clone(),
            kind: vote.kind,
        }
    }
}

/// The decision message produced when an instance commits.
///
/// Not transmitted by this core; it is handed to the verifier port.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyMsg {
    /// View the decision was reached in.
    pub view_id: u64,
    /// Timestamp of the decided request.
    pub timestamp: i64,
    /// Client that submitted the decided request.
    pub client_id: String,
    /// Identity of the replying replica; filled by the engine.
    pub node_id: NodeId,
    /// Execution result marker.
    pub result: String,
}

/// Tagged sum over every message variant; the dispatcher switches on the
/// `msg_type` tag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "msg_type", rename_all = "snake_case")]
pub enum ConsensusMsg {
    /// A client request (wire path `/req`).
    Request(RequestMsg),
    /// A pre-prepare from the primary (wire path `/preprepare`).
    PrePrepare(PrePrepareMsg),
    /// A relayed prepare vote (wire path `/prepare`).
    Prepare(StoredPrepareMsg),
    /// A commit vote (wire path `/commit`).
    Commit(VoteMsg),
    /// A reply, handed to the verifier rather than transmitted
    /// (wire path `/reply`).
    Reply(ReplyMsg),
}

/// Per-kind URL paths messages are POSTed to on each peer.
pub mod paths {
    /// Client requests.
    pub const REQUEST: &str = "/req";
    /// Pre-prepare messages.
    pub const PRE_PREPARE: &str = "/preprepare";
    /// Relayed prepare votes.
    pub const PREPARE: &str = "/prepare";
    /// Commit votes.
    pub const COMMIT: &str = "/commit";
    /// Replies.
    pub const REPLY: &str = "/reply";
}

impl ConsensusMsg {
    /// The wire path this variant is delivered on.
    pub fn path(&self) -> &'static str {
        match self {
            ConsensusMsg::Request(_) => paths::REQUEST,
            ConsensusMsg::PrePrepare(_) => paths::PRE_PREPARE,
            ConsensusMsg::Prepare(_) => paths::PREPARE,
            ConsensusMsg::Commit(_) => paths::COMMIT,
            ConsensusMsg::Reply(_) => paths::REPLY,
        }
    }
}
