//! Consumer of delivery batches.
//!
//! The resolver is the only task that advances the state machine. It takes
//! each homogeneous batch, pushes every element through the matching node
//! handler, and reports per-element failures without aborting the rest of
//! the batch.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::dispatcher::DeliveryBatch;
use crate::node::Node;

/// Single consumer of the delivery queue.
pub struct Resolver {
    node: Arc<Node>,
}

impl Resolver {
    /// Create a resolver driving the given node.
    pub fn new(node: Arc<Node>) -> Self {
        Self { node }
    }

    /// The run loop: suspend on the delivery queue until the dispatcher
    /// goes away.
    pub async fn run(self, mut delivery_rx: mpsc::UnboundedReceiver<DeliveryBatch>) {
        while let Some(batch) = delivery_rx.recv().await {
            self.resolve(batch).await;
        }
        debug!("delivery queue closed, resolver stopping");
    }

    /// Process one batch. Failures are logged per element; the batch always
    /// runs to completion.
    pub async fn resolve(&self, batch: DeliveryBatch) {
        match batch {
            DeliveryBatch::Requests(msgs) => {
                for req in msgs {
                    if let Err(err) = self.node.on_request(req).await {
                        warn!(error = %err, "request not resolved");
                    }
                }
            }
            DeliveryBatch::PrePrepares(msgs) => {
                for ppm in msgs {
                    if let Err(err) = self.node.on_pre_prepare(ppm).await {
                        warn!(error = %err, "pre-prepare not resolved");
                    }
                }
            }
            DeliveryBatch::Prepares(msgs) => {
                for vote in msgs {
                    if let Err(err) = self.node.on_prepare(vote).await {
                        warn!(error = %err, "prepare not resolved");
                    }
                }
            }
            DeliveryBatch::Commits(msgs) => {
                for vote in msgs {
                    if let Err(err) = self.node.on_commit(vote).await {
                        warn!(error = %err, "commit not resolved");
                    }
                }
            }
        }
    }
}
