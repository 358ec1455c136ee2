//! Engine-level errors.
//!
//! Nothing here is fatal: per-message failures are logged by the resolver
//! and the engine keeps running. Transport failures are not represented
//! here at all; the broadcast helper aggregates them per peer.

use phalanx_consensus::ConsensusError;
use phalanx_types::CodecError;
use thiserror::Error;

/// Errors surfaced by the engine's handlers and entry points.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A new instance was requested while one is live.
    #[error("another consensus instance is in progress")]
    InstanceInProgress,

    /// A vote arrived with no live instance to tally it against.
    #[error("no live consensus instance")]
    NoLiveInstance,

    /// The engine cannot be constructed over an empty committee.
    #[error("committee is empty")]
    EmptyCommittee,

    /// The state machine rejected the message.
    #[error(transparent)]
    Consensus(#[from] ConsensusError),

    /// A message could not be encoded for broadcast.
    #[error(transparent)]
    Codec(#[from] CodecError),

    /// An internal queue is gone; the runtime has shut down.
    #[error("{0} queue closed")]
    ChannelClosed(&'static str),
}
