//! The replica node: construction, entry points and resolver-side handlers.
//!
//! A [`Node`] owns the committee table, the view, the live-instance slot and
//! the committed log. The transport hands decoded messages to the five
//! `get_*` entry points, which enqueue them and return immediately; the
//! resolver task drives the `on_*` handlers, which are the only writers of
//! consensus state.

use std::sync::Arc;

use parking_lot::RwLock;
use phalanx_consensus::{ConsensusState, Stage};
use phalanx_core::{RequestVerifier, Transport};
use phalanx_types::{
    Committee, ConsensusMsg, NodeId, PrePrepareMsg, ReplyMsg, RequestMsg, StoredPrepareMsg, View,
    VoteMsg, EXECUTED,
};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::alarm;
use crate::broadcast::broadcast;
use crate::config::EngineConfig;
use crate::dispatcher::{DeliveryBatch, Dispatcher};
use crate::error::EngineError;
use crate::resolver::Resolver;

/// The live-instance slot. Written only on the resolver path; the
/// dispatcher takes read locks to observe the stage.
pub type SharedState = Arc<RwLock<Option<ConsensusState>>>;

/// One replica of the committee.
pub struct Node {
    node_id: NodeId,
    committee: Committee,
    view: View,
    state: SharedState,
    committed: RwLock<Vec<RequestMsg>>,
    entrance_tx: mpsc::UnboundedSender<ConsensusMsg>,
    verifier: Arc<dyn RequestVerifier>,
    transport: Arc<dyn Transport>,
}

/// The not-yet-started half of an engine: holds the entrance receiver until
/// [`EngineRuntime::spawn`] wires up the three long-lived tasks.
pub struct EngineRuntime {
    node: Arc<Node>,
    config: EngineConfig,
    entrance_rx: mpsc::UnboundedReceiver<ConsensusMsg>,
}

/// Join handles of the three engine tasks.
pub struct EngineHandles {
    /// The dispatcher task (owns the message buffer).
    pub dispatcher: JoinHandle<()>,
    /// The resolver task (advances the state machine).
    pub resolver: JoinHandle<()>,
    /// The alarm task (periodic flush tick).
    pub alarm: JoinHandle<()>,
}

impl Node {
    /// Construct a node over a fixed committee. The primary for the initial
    /// view is the first committee member.
    pub fn new(
        node_id: impl Into<NodeId>,
        committee: Committee,
        verifier: Arc<dyn RequestVerifier>,
        transport: Arc<dyn Transport>,
        config: EngineConfig,
    ) -> Result<(Arc<Node>, EngineRuntime), EngineError> {
        let node_id = node_id.into();
        let primary = committee.primary().ok_or(EngineError::EmptyCommittee)?;
        let view = View::initial(primary.public_key.clone());

        let (entrance_tx, entrance_rx) = mpsc::unbounded_channel();

        info!(
            node = %node_id,
            members = committee.len(),
            view = view.id,
            primary = %view.primary,
            "engine constructed"
        );

        let node = Arc::new(Self {
            node_id,
            committee,
            view,
            state: Arc::new(RwLock::new(None)),
            committed: RwLock::new(Vec::new()),
            entrance_tx,
            verifier,
            transport,
        });

        let runtime = EngineRuntime {
            node: Arc::clone(&node),
            config,
            entrance_rx,
        };

        Ok((node, runtime))
    }

    /// Local replica identity.
    pub fn node_id(&self) -> &str {
        &self.node_id
    }

    /// The committee this replica belongs to.
    pub fn committee(&self) -> &Committee {
        &self.committee
    }

    /// The fixed view the engine runs in.
    pub fn view(&self) -> &View {
        &self.view
    }

    /// Whether this replica is the view's primary.
    pub fn is_primary(&self) -> bool {
        self.view.primary == self.node_id
    }

    /// Stage of the live instance, if any.
    pub fn stage(&self) -> Option<Stage> {
        self.state.read().as_ref().map(|s| s.stage())
    }

    /// Snapshot of the committed log.
    pub fn committed(&self) -> Vec<RequestMsg> {
        self.committed.read().clone()
    }

    /// Clear the live instance so the next request can be processed.
    ///
    /// The committed stage is terminal; the application invokes this from
    /// its reply handling once it has taken the decision.
    pub fn reset(&self) {
        if self.state.write().take().is_some() {
            debug!(node = %self.node_id, "live instance cleared");
        }
    }

    pub(crate) fn shared_state(&self) -> SharedState {
        Arc::clone(&self.state)
    }

    // ------------------------------------------------------------------
    // Entry points: called by the transport with decoded messages. Each
    // pushes onto the entrance queue and returns immediately.
    // ------------------------------------------------------------------

    /// Ingest a client request.
    pub fn get_req(&self, req: RequestMsg) -> Result<(), EngineError> {
        self.enqueue(ConsensusMsg::Request(req))
    }

    /// Ingest a pre-prepare from the primary.
    pub fn get_pre_prepare(&self, msg: PrePrepareMsg) -> Result<(), EngineError> {
        self.enqueue(ConsensusMsg::PrePrepare(msg))
    }

    /// Ingest a relayed prepare vote.
    pub fn get_prepare(&self, msg: StoredPrepareMsg) -> Result<(), EngineError> {
        self.enqueue(ConsensusMsg::Prepare(msg))
    }

    /// Ingest a commit vote.
    pub fn get_commit(&self, msg: VoteMsg) -> Result<(), EngineError> {
        self.enqueue(ConsensusMsg::Commit(msg))
    }

    /// Ingest a reply. Replies are logged and go no further in this core.
    pub fn get_reply(&self, msg: ReplyMsg) -> Result<(), EngineError> {
        self.enqueue(ConsensusMsg::Reply(msg))
    }

    fn enqueue(&self, msg: ConsensusMsg) -> Result<(), EngineError> {
        self.entrance_tx
            .send(msg)
            .map_err(|_| EngineError::ChannelClosed("entrance"))
    }

    // ------------------------------------------------------------------
    // Resolver-side handlers: the only writers of consensus state.
    // ------------------------------------------------------------------

    /// Primary entry: start consensus on a client request and broadcast the
    /// pre-prepare. Non-primaries ignore requests.
    pub async fn on_request(&self, req: RequestMsg) -> Result<(), EngineError> {
        if !self.is_primary() {
            debug!(node = %self.node_id, client = %req.client_id, "request ignored by non-primary");
            return Ok(());
        }

        let ppm = {
            let mut slot = self.state.write();
            if slot.is_some() {
                return Err(EngineError::InstanceInProgress);
            }
            let mut state = ConsensusState::new(self.view.id, self.last_sequence_id());
            let ppm = state.start_consensus(req)?;
            *slot = Some(state);
            ppm
        };

        broadcast(
            &self.committee,
            &self.node_id,
            self.transport.as_ref(),
            &ConsensusMsg::PrePrepare(ppm),
        )
        .await?;
        Ok(())
    }

    /// Participant entry: accept a pre-prepare and broadcast the stripped
    /// prepare vote. On failure the slot stays clear, so the replica keeps
    /// no trace of the rejected instance.
    pub async fn on_pre_prepare(&self, ppm: PrePrepareMsg) -> Result<(), EngineError> {
        let vote = {
            let mut slot = self.state.write();
            if slot.is_some() {
                return Err(EngineError::InstanceInProgress);
            }
            let mut state = ConsensusState::new(self.view.id, self.last_sequence_id());
            let mut vote = state.pre_prepare(ppm)?;
            vote.node_id = self.node_id.clone();
            *slot = Some(state);
            vote
        };

        let stored = StoredPrepareMsg::from(&vote);
        broadcast(
            &self.committee,
            &self.node_id,
            self.transport.as_ref(),
            &ConsensusMsg::Prepare(stored),
        )
        .await?;
        Ok(())
    }

    /// Tally a prepare vote; when the quorum forms, consult the verifier
    /// and broadcast the signed commit vote.
    pub async fn on_prepare(&self, vote: VoteMsg) -> Result<(), EngineError> {
        let f = self.committee.max_faulty();
        let template = {
            let mut slot = self.state.write();
            let state = slot.as_mut().ok_or(EngineError::NoLiveInstance)?;
            state.prepare(vote, f)?
        };

        if let Some(mut commit) = template {
            commit.node_id = self.node_id.clone();

            let request = self.current_request().ok_or(EngineError::NoLiveInstance)?;
            let result = u32::from(!self.verifier.check_msg(&request).await);
            commit.pass = Some(self.verifier.sign_msg(request.height, result).await);

            broadcast(
                &self.committee,
                &self.node_id,
                self.transport.as_ref(),
                &ConsensusMsg::Commit(commit),
            )
            .await?;
        }
        Ok(())
    }

    /// Tally a commit vote; when the quorum forms, append the decision to
    /// the committed log and deliver the reply to the verifier.
    pub async fn on_commit(&self, vote: VoteMsg) -> Result<(), EngineError> {
        let f = self.committee.max_faulty();
        let decision = {
            let mut slot = self.state.write();
            let state = slot.as_mut().ok_or(EngineError::NoLiveInstance)?;
            state.commit(vote, f)?
        };

        if let Some((mut reply, request)) = decision {
            reply.node_id = self.node_id.clone();
            self.committed.write().push(request);
            self.reply(reply).await;
        }
        Ok(())
    }

    /// Hand the decision to the application, exactly once per instance.
    /// The result code is 1 only when the reply carries the executed
    /// sentinel as its node id.
    async fn reply(&self, reply: ReplyMsg) {
        let result = u32::from(reply.node_id == EXECUTED);

        let request = {
            let slot = self.state.read();
            match slot.as_ref() {
                Some(state) if state.view_id() == reply.view_id => state.request().cloned(),
                _ => None,
            }
        };

        match request {
            Some(req) => self.verifier.reply_result(&req, result).await,
            None => warn!(view = reply.view_id, "reply does not match the live instance"),
        }
    }

    fn last_sequence_id(&self) -> i64 {
        self.committed.read().last().map(|r| r.sequence_id).unwrap_or(-1)
    }

    fn current_request(&self) -> Option<RequestMsg> {
        self.state.read().as_ref().and_then(|s| s.request().cloned())
    }
}

impl EngineRuntime {
    /// Start the three long-lived tasks: dispatcher, resolver, alarm.
    pub fn spawn(self) -> EngineHandles {
        let (delivery_tx, delivery_rx) = mpsc::unbounded_channel::<DeliveryBatch>();
        let (alarm_tx, alarm_rx) = mpsc::unbounded_channel::<()>();

        let dispatcher = Dispatcher::new(
            self.node.shared_state(),
            delivery_tx,
            self.config.buffer_ttl,
        );
        let resolver = Resolver::new(Arc::clone(&self.node));

        EngineHandles {
            dispatcher: tokio::spawn(dispatcher.run(self.entrance_rx, alarm_rx)),
            resolver: tokio::spawn(resolver.run(delivery_rx)),
            alarm: tokio::spawn(alarm::run(alarm_tx, self.config.resolving_interval)),
        }
    }
}
