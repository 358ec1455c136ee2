//! Routing of inbound messages into homogeneous delivery batches.
//!
//! The dispatcher is the single owner of the [`MsgBuffer`]. It suspends on
//! a two-source receive over the entrance queue and the alarm queue, and
//! routes each event by message kind and live-instance stage: a message the
//! local replica is ready for is delivered (together with everything of its
//! kind buffered before it), anything else waits in the buffer for the
//! matching transition or the next tick.
//!
//! The dispatcher only ever *reads* the shared instance slot; the resolver
//! is its single writer.

use phalanx_consensus::Stage;
use phalanx_types::{ConsensusMsg, PrePrepareMsg, RequestMsg, VoteMsg};
use tokio::sync::mpsc;
use tracing::{debug, info, trace};

use crate::buffer::MsgBuffer;
use crate::error::EngineError;
use crate::node::SharedState;

/// A homogeneous batch of messages released to the resolver: the buffered
/// messages of one kind, in arrival order, followed by the message whose
/// arrival (or whose tick) released them.
#[derive(Debug)]
pub enum DeliveryBatch {
    /// Client requests, for the primary to start consensus on.
    Requests(Vec<RequestMsg>),
    /// Pre-prepares from the primary.
    PrePrepares(Vec<PrePrepareMsg>),
    /// Prepare votes.
    Prepares(Vec<VoteMsg>),
    /// Commit votes.
    Commits(Vec<VoteMsg>),
}

/// Owner of the message buffer; turns entrance and alarm events into
/// delivery batches.
pub struct Dispatcher {
    buffer: MsgBuffer,
    state: SharedState,
    delivery_tx: mpsc::UnboundedSender<DeliveryBatch>,
    buffer_ttl: Option<std::time::Duration>,
}

impl Dispatcher {
    /// Create a dispatcher over the shared instance slot.
    pub fn new(
        state: SharedState,
        delivery_tx: mpsc::UnboundedSender<DeliveryBatch>,
        buffer_ttl: Option<std::time::Duration>,
    ) -> Self {
        Self {
            buffer: MsgBuffer::new(),
            state,
            delivery_tx,
            buffer_ttl,
        }
    }

    /// The run loop: a multi-source receive over entrance and alarm.
    pub async fn run(
        mut self,
        mut entrance_rx: mpsc::UnboundedReceiver<ConsensusMsg>,
        mut alarm_rx: mpsc::UnboundedReceiver<()>,
    ) {
        loop {
            tokio::select! {
                msg = entrance_rx.recv() => match msg {
                    Some(msg) => {
                        if self.route(msg).is_err() {
                            break;
                        }
                    }
                    None => break,
                },
                tick = alarm_rx.recv() => match tick {
                    Some(()) => {
                        if self.on_alarm().is_err() {
                            break;
                        }
                    }
                    None => break,
                },
            }
        }
        debug!("dispatcher stopping");
    }

    /// Route one inbound message: deliver it (with everything of its kind
    /// buffered before it) if the local stage is ready, buffer it otherwise.
    pub fn route(&mut self, msg: ConsensusMsg) -> Result<(), EngineError> {
        let stage = self.live_stage();
        match msg {
            ConsensusMsg::Request(req) => {
                if stage.is_none() {
                    let mut batch = self.buffer.drain_requests();
                    batch.push(req);
                    self.deliver(DeliveryBatch::Requests(batch))
                } else {
                    trace!("request buffered while instance is live");
                    self.buffer.push_request(req);
                    Ok(())
                }
            }
            ConsensusMsg::PrePrepare(ppm) => {
                if stage.is_none() {
                    let mut batch = self.buffer.drain_pre_prepares();
                    batch.push(ppm);
                    self.deliver(DeliveryBatch::PrePrepares(batch))
                } else {
                    trace!("pre-prepare buffered while instance is live");
                    self.buffer.push_pre_prepare(ppm);
                    Ok(())
                }
            }
            ConsensusMsg::Prepare(stored) => {
                let vote = stored.into_vote();
                if stage == Some(Stage::PrePrepared) {
                    let mut batch = self.buffer.drain_prepares();
                    batch.push(vote);
                    self.deliver(DeliveryBatch::Prepares(batch))
                } else {
                    trace!(node = %vote.node_id, "prepare buffered out of phase");
                    self.buffer.push_prepare(vote);
                    Ok(())
                }
            }
            ConsensusMsg::Commit(vote) => {
                if stage == Some(Stage::Prepared) {
                    let mut batch = self.buffer.drain_commits();
                    batch.push(vote);
                    self.deliver(DeliveryBatch::Commits(batch))
                } else {
                    trace!(node = %vote.node_id, "commit buffered out of phase");
                    self.buffer.push_commit(vote);
                    Ok(())
                }
            }
            ConsensusMsg::Reply(reply) => {
                // Replies are not routed further by this core.
                info!(result = %reply.result, node = %reply.node_id, "reply received");
                Ok(())
            }
        }
    }

    /// Periodic flush: release whatever the current stage is ready for.
    pub fn on_alarm(&mut self) -> Result<(), EngineError> {
        if let Some(ttl) = self.buffer_ttl {
            self.buffer.evict_expired(ttl);
        }

        match self.live_stage() {
            None => {
                if self.buffer.request_count() > 0 {
                    let batch = self.buffer.drain_requests();
                    self.deliver(DeliveryBatch::Requests(batch))?;
                }
                if self.buffer.pre_prepare_count() > 0 {
                    let batch = self.buffer.drain_pre_prepares();
                    self.deliver(DeliveryBatch::PrePrepares(batch))?;
                }
            }
            Some(Stage::PrePrepared) => {
                if self.buffer.prepare_count() > 0 {
                    let batch = self.buffer.drain_prepares();
                    self.deliver(DeliveryBatch::Prepares(batch))?;
                }
            }
            Some(Stage::Prepared) => {
                if self.buffer.commit_count() > 0 {
                    let batch = self.buffer.drain_commits();
                    self.deliver(DeliveryBatch::Commits(batch))?;
                }
            }
            Some(_) => {}
        }
        Ok(())
    }

    /// Stage of the live instance, if one exists. An instance still in
    /// `Idle` does not count as live.
    fn live_stage(&self) -> Option<Stage> {
        self.state
            .read()
            .as_ref()
            .map(|s| s.stage())
            .filter(|s| *s != Stage::Idle)
    }

    fn deliver(&self, batch: DeliveryBatch) -> Result<(), EngineError> {
        self.delivery_tx
            .send(batch)
            .map_err(|_| EngineError::ChannelClosed("delivery"))
    }
}
