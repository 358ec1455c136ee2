//! The fixed replica committee and the view it operates in.
//!
//! Membership is immutable after construction. The primary for the current
//! view is, by convention, the first committee member; view changes and
//! leader rotation are outside this core.

use serde::{Deserialize, Serialize};

use crate::message::NodeId;

/// Initial view identifier, fixed at engine construction.
pub const INITIAL_VIEW_ID: u64 = 10_000_000_000;

/// A committee member: stable identity plus transport address.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Replica {
    /// Hex-encoded uncompressed public key; the replica's wire identity.
    pub public_key: NodeId,
    /// Reachable host name or IP.
    pub host: String,
    /// Transport port.
    pub port: u16,
}

impl Replica {
    /// Create a committee member.
    pub fn new(public_key: impl Into<NodeId>, host: impl Into<String>, port: u16) -> Self {
        Self {
            public_key: public_key.into(),
            host: host.into(),
            port,
        }
    }

    /// The `host:port` address messages are dispatched to.
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// The ordered replica set for one deployment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Committee {
    replicas: Vec<Replica>,
}

impl Committee {
    /// Build a committee from an ordered member list.
    pub fn new(replicas: Vec<Replica>) -> Self {
        Self { replicas }
    }

    /// The primary for the current view: the first member.
    ///
    /// Returns `None` only for an empty committee, which the engine rejects
    /// at construction.
    pub fn primary(&self) -> Option<&Replica> {
        self.replicas.first()
    }

    /// Number of replicas, N.
    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    /// Whether the committee has no members.
    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }

    /// Maximum tolerated Byzantine replicas, f = N / 3.
    pub fn max_faulty(&self) -> usize {
        self.replicas.len() / 3
    }

    /// Look up a member by identity.
    pub fn get(&self, node_id: &str) -> Option<&Replica> {
        self.replicas.iter().find(|r| r.public_key == node_id)
    }

    /// Whether the identity belongs to the committee.
    pub fn contains(&self, node_id: &str) -> bool {
        self.get(node_id).is_some()
    }

    /// Iterate the members in committee order.
    pub fn iter(&self) -> impl Iterator<Item = &Replica> {
        self.replicas.iter()
    }
}

/// The view the engine runs in; fixed at construction in this core.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct View {
    /// View identifier.
    pub id: u64,
    /// Identity of the view's primary.
    pub primary: NodeId,
}

impl View {
    /// Build the initial view over a committee.
    pub fn initial(primary: NodeId) -> Self {
        Self {
            id: INITIAL_VIEW_ID,
            primary,
        }
    }
}
