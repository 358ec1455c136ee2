//! Fan-out of one encoded message to every committee peer.

use std::collections::HashMap;

use phalanx_core::{Transport, TransportError};
use phalanx_types::{codec, Committee, ConsensusMsg, NodeId};
use tracing::warn;

use crate::error::EngineError;

/// Serialize `msg` once and dispatch it to every committee member except
/// the local replica, on the message's per-kind path.
///
/// Returns a map from peer id to the error of each failed send; an empty
/// map means every peer was reached. Nothing is retried here: the protocol
/// tolerates up to f silent peers, so a partial broadcast is not fatal.
pub async fn broadcast(
    committee: &Committee,
    local_id: &str,
    transport: &dyn Transport,
    msg: &ConsensusMsg,
) -> Result<HashMap<NodeId, TransportError>, EngineError> {
    let payload = codec::encode(msg)?;
    let path = msg.path();

    let mut failures = HashMap::new();
    for replica in committee.iter() {
        if replica.public_key == local_id {
            continue;
        }
        if let Err(err) = transport.send(&replica.address(), path, &payload).await {
            warn!(peer = %replica.public_key, path, error = %err, "broadcast send failed");
            failures.insert(replica.public_key.clone(), err);
        }
    }

    Ok(failures)
}
