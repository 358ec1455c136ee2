//! Stage tracking and vote tallies for one consensus instance.

use std::collections::HashMap;

use phalanx_types::{NodeId, PrePrepareMsg, ReplyMsg, RequestMsg, VoteKind, VoteMsg, EXECUTED};
use thiserror::Error;
use tracing::{debug, info, trace};

/// Errors surfaced by state machine operations.
///
/// Mismatched views, sequences and digests on *votes*, as well as duplicate
/// senders, are not errors: they are dropped silently at this boundary and
/// the operation reports "no transition".
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConsensusError {
    /// The operation is not permitted in the current stage.
    #[error("operation not permitted in stage {stage}")]
    WrongStage {
        /// Stage the instance was in when the operation arrived.
        stage: Stage,
    },

    /// The digest recomputed over the carried request disagrees with the
    /// digest the message claims.
    #[error("digest mismatch: message carries {claimed}, recomputed {recomputed}")]
    DigestMismatch {
        /// Digest carried by the message.
        claimed: String,
        /// Digest recomputed over the carried request.
        recomputed: String,
    },

    /// A pre-prepare for a view this instance does not run in.
    #[error("view mismatch: message view {msg_view}, local view {local_view}")]
    ViewMismatch {
        /// View carried by the message.
        msg_view: u64,
        /// View the instance runs in.
        local_view: u64,
    },
}

/// Protocol stage of the live instance. Advances monotonically;
/// [`Stage::Committed`] is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    /// No request accepted yet.
    Idle,
    /// Request recorded; collecting prepare votes.
    PrePrepared,
    /// Prepare quorum reached; collecting commit votes.
    Prepared,
    /// Commit quorum reached; decision made.
    Committed,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Idle => write!(f, "Idle"),
            Stage::PrePrepared => write!(f, "PrePrepared"),
            Stage::Prepared => write!(f, "Prepared"),
            Stage::Committed => write!(f, "Committed"),
        }
    }
}

/// The message log of one instance: the accepted request plus the vote
/// tallies, each keyed by sender so no replica counts twice.
#[derive(Debug, Clone, Default)]
pub struct MsgLogs {
    /// The request this instance decides on.
    pub request: Option<RequestMsg>,
    /// Prepare votes by sender.
    pub prepares: HashMap<NodeId, VoteMsg>,
    /// Commit votes by sender.
    pub commits: HashMap<NodeId, VoteMsg>,
}

/// State machine for a single consensus instance.
///
/// All operations run on the engine's resolver task; nothing here blocks.
/// The caller supplies f (the committee's fault tolerance) on each vote so
/// the state itself stays independent of membership.
#[derive(Debug, Clone)]
pub struct ConsensusState {
    view_id: u64,
    last_sequence_id: i64,
    stage: Stage,
    digest: Option<String>,
    logs: MsgLogs,
}

impl ConsensusState {
    /// Create a fresh instance in the given view. `last_sequence_id` is the
    /// sequence of the most recently committed request, `-1` when none has
    /// committed yet.
    pub fn new(view_id: u64, last_sequence_id: i64) -> Self {
        Self {
            view_id,
            last_sequence_id,
            stage: Stage::Idle,
            digest: None,
            logs: MsgLogs::default(),
        }
    }

    /// Current stage.
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// View this instance runs in.
    pub fn view_id(&self) -> u64 {
        self.view_id
    }

    /// Sequence number of the live request, once one is accepted.
    pub fn sequence_id(&self) -> Option<i64> {
        self.logs.request.as_ref().map(|r| r.sequence_id)
    }

    /// Reference digest every tallied vote must carry.
    pub fn digest(&self) -> Option<&str> {
        self.digest.as_deref()
    }

    /// The accepted request, once one is recorded.
    pub fn request(&self) -> Option<&RequestMsg> {
        self.logs.request.as_ref()
    }

    /// The message log (request plus tallies).
    pub fn logs(&self) -> &MsgLogs {
        &self.logs
    }

    /// Number of distinct prepare voters tallied.
    pub fn prepare_count(&self) -> usize {
        self.logs.prepares.len()
    }

    /// Number of distinct commit voters tallied.
    pub fn commit_count(&self) -> usize {
        self.logs.commits.len()
    }

    /// Primary entry: accept a client request, assign the next sequence
    /// number and produce the pre-prepare to broadcast.
    ///
    /// Requires [`Stage::Idle`]; transitions to [`Stage::PrePrepared`].
    pub fn start_consensus(&mut self, mut req: RequestMsg) -> Result<PrePrepareMsg, ConsensusError> {
        if self.stage != Stage::Idle {
            return Err(ConsensusError::WrongStage { stage: self.stage });
        }

        req.sequence_id = self.last_sequence_id + 1;
        let digest = req.digest();

        self.logs.request = Some(req.clone());
        self.digest = Some(digest.clone());
        self.stage = Stage::PrePrepared;

        info!(
            view = self.view_id,
            sequence = req.sequence_id,
            client = %req.client_id,
            "consensus started"
        );

        Ok(PrePrepareMsg {
            view_id: self.view_id,
            sequence_id: req.sequence_id,
            digest,
            request: req,
        })
    }

    /// Participant entry: accept the primary's pre-prepare and produce the
    /// prepare vote to broadcast. The caller fills in its own `node_id`.
    ///
    /// Requires [`Stage::Idle`]; transitions to [`Stage::PrePrepared`].
    pub fn pre_prepare(&mut self, ppm: PrePrepareMsg) -> Result<VoteMsg, ConsensusError> {
        if self.stage != Stage::Idle {
            return Err(ConsensusError::WrongStage { stage: self.stage });
        }
        if ppm.view_id != self.view_id {
            return Err(ConsensusError::ViewMismatch {
                msg_view: ppm.view_id,
                local_view: self.view_id,
            });
        }

        let recomputed = ppm.request.digest();
        if recomputed != ppm.digest {
            return Err(ConsensusError::DigestMismatch {
                claimed: ppm.digest,
                recomputed,
            });
        }

        self.logs.request = Some(ppm.request);
        self.digest = Some(ppm.digest.clone());
        self.stage = Stage::PrePrepared;

        info!(
            view = self.view_id,
            sequence = ppm.sequence_id,
            "pre-prepare accepted"
        );

        Ok(VoteMsg {
            kind: VoteKind::Prepare,
            view_id: ppm.view_id,
            sequence_id: ppm.sequence_id,
            digest: ppm.digest,
            node_id: NodeId::new(),
            pass: None,
        })
    }

    /// Tally a prepare vote.
    ///
    /// Returns the commit vote template (no `node_id`, no `pass`) when this
    /// vote completes the 2f threshold while the instance is
    /// [`Stage::PrePrepared`]. A prepare arriving after the instance is
    /// already prepared is recorded but triggers nothing.
    pub fn prepare(&mut self, vote: VoteMsg, f: usize) -> Result<Option<VoteMsg>, ConsensusError> {
        if self.stage == Stage::Idle {
            return Err(ConsensusError::WrongStage { stage: self.stage });
        }
        if !self.vote_matches(&vote, VoteKind::Prepare) {
            return Ok(None);
        }
        if self.logs.prepares.contains_key(&vote.node_id) {
            debug!(node = %vote.node_id, "duplicate prepare ignored");
            return Ok(None);
        }

        trace!(
            node = %vote.node_id,
            tally = self.logs.prepares.len() + 1,
            "prepare tallied"
        );
        let (view_id, sequence_id, digest) =
            (vote.view_id, vote.sequence_id, vote.digest.clone());
        self.logs.prepares.insert(vote.node_id.clone(), vote);

        if self.logs.prepares.len() >= 2 * f && self.stage == Stage::PrePrepared {
            self.stage = Stage::Prepared;
            info!(
                view = view_id,
                sequence = sequence_id,
                prepares = self.logs.prepares.len(),
                "prepare quorum reached"
            );
            return Ok(Some(VoteMsg {
                kind: VoteKind::Commit,
                view_id,
                sequence_id,
                digest,
                node_id: NodeId::new(),
                pass: None,
            }));
        }

        Ok(None)
    }

    /// Tally a commit vote.
    ///
    /// Returns the reply and the decided request when this vote completes
    /// the 2f+1 threshold while the instance is [`Stage::Prepared`]. A
    /// commit arriving after the decision is ignored outright.
    pub fn commit(
        &mut self,
        vote: VoteMsg,
        f: usize,
    ) -> Result<Option<(ReplyMsg, RequestMsg)>, ConsensusError> {
        if self.stage == Stage::Committed {
            debug!(node = %vote.node_id, "commit after decision ignored");
            return Ok(None);
        }
        if self.stage == Stage::Idle {
            return Err(ConsensusError::WrongStage { stage: self.stage });
        }
        if !self.vote_matches(&vote, VoteKind::Commit) {
            return Ok(None);
        }
        if self.logs.commits.contains_key(&vote.node_id) {
            debug!(node = %vote.node_id, "duplicate commit ignored");
            return Ok(None);
        }

        trace!(
            node = %vote.node_id,
            tally = self.logs.commits.len() + 1,
            "commit tallied"
        );
        self.logs.commits.insert(vote.node_id.clone(), vote);

        if self.logs.commits.len() >= 2 * f + 1 && self.stage == Stage::Prepared {
            let request = match self.logs.request.clone() {
                Some(request) => request,
                None => return Err(ConsensusError::WrongStage { stage: self.stage }),
            };

            self.stage = Stage::Committed;
            info!(
                view = self.view_id,
                sequence = request.sequence_id,
                commits = self.logs.commits.len(),
                "commit quorum reached, request decided"
            );

            let reply = ReplyMsg {
                view_id: self.view_id,
                timestamp: request.timestamp,
                client_id: request.client_id.clone(),
                node_id: NodeId::new(),
                result: EXECUTED.to_string(),
            };
            return Ok(Some((reply, request)));
        }

        Ok(None)
    }

    /// Whether a vote belongs to this instance: kind, view, sequence and
    /// digest must all match the live request. Mismatches drop silently.
    fn vote_matches(&self, vote: &VoteMsg, expected: VoteKind) -> bool {
        if vote.kind != expected {
            debug!(kind = %vote.kind, expected = %expected, "vote kind mismatch dropped");
            return false;
        }
        if vote.view_id != self.view_id {
            trace!(
                msg_view = vote.view_id,
                local_view = self.view_id,
                "vote for other view dropped"
            );
            return false;
        }
        match self.sequence_id() {
            Some(sequence) if vote.sequence_id == sequence => {}
            Some(sequence) => {
                trace!(
                    msg_sequence = vote.sequence_id,
                    local_sequence = sequence,
                    "vote for other sequence dropped"
                );
                return false;
            }
            None => return false,
        }
        match self.digest.as_deref() {
            Some(digest) if vote.digest == digest => true,
            _ => {
                trace!(node = %vote.node_id, "vote with foreign digest dropped");
                false
            }
        }
    }
}
