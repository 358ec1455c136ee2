//! Per-kind queues for messages that arrived out of phase.
//!
//! Each kind buffers independently and releases in FIFO order, either when
//! the dispatcher sees the local stage catch up or on the next alarm tick.
//! The buffer is owned by the dispatcher task; no other task touches it.

use std::collections::VecDeque;
use std::time::Duration;

use phalanx_types::{PrePrepareMsg, RequestMsg, VoteMsg};
use tokio::time::Instant;
use tracing::warn;

/// A buffered message stamped with its arrival time, so the alarm sweep can
/// evict entries that outlived their usefulness.
#[derive(Debug)]
struct Buffered<T> {
    msg: T,
    queued_at: Instant,
}

impl<T> Buffered<T> {
    fn new(msg: T) -> Self {
        Self {
            msg,
            queued_at: Instant::now(),
        }
    }
}

/// Four independently-ordered FIFOs, one per message kind.
#[derive(Debug, Default)]
pub struct MsgBuffer {
    requests: VecDeque<Buffered<RequestMsg>>,
    pre_prepares: VecDeque<Buffered<PrePrepareMsg>>,
    prepares: VecDeque<Buffered<VoteMsg>>,
    commits: VecDeque<Buffered<VoteMsg>>,
}

impl MsgBuffer {
    /// Create an empty buffer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer a request that cannot be processed yet.
    pub fn push_request(&mut self, msg: RequestMsg) {
        self.requests.push_back(Buffered::new(msg));
    }

    /// Buffer a pre-prepare that cannot be processed yet.
    pub fn push_pre_prepare(&mut self, msg: PrePrepareMsg) {
        self.pre_prepares.push_back(Buffered::new(msg));
    }

    /// Buffer an early prepare vote.
    pub fn push_prepare(&mut self, msg: VoteMsg) {
        self.prepares.push_back(Buffered::new(msg));
    }

    /// Buffer an early commit vote.
    pub fn push_commit(&mut self, msg: VoteMsg) {
        self.commits.push_back(Buffered::new(msg));
    }

    /// Move out all buffered requests, preserving arrival order.
    pub fn drain_requests(&mut self) -> Vec<RequestMsg> {
        self.requests.drain(..).map(|b| b.msg).collect()
    }

    /// Move out all buffered pre-prepares, preserving arrival order.
    pub fn drain_pre_prepares(&mut self) -> Vec<PrePrepareMsg> {
        self.pre_prepares.drain(..).map(|b| b.msg).collect()
    }

    /// Move out all buffered prepare votes, preserving arrival order.
    pub fn drain_prepares(&mut self) -> Vec<VoteMsg> {
        self.prepares.drain(..).map(|b| b.msg).collect()
    }

    /// Move out all buffered commit votes, preserving arrival order.
    pub fn drain_commits(&mut self) -> Vec<VoteMsg> {
        self.commits.drain(..).map(|b| b.msg).collect()
    }

    /// Number of buffered requests.
    pub fn request_count(&self) -> usize {
        self.requests.len()
    }

    /// Number of buffered pre-prepares.
    pub fn pre_prepare_count(&self) -> usize {
        self.pre_prepares.len()
    }

    /// Number of buffered prepare votes.
    pub fn prepare_count(&self) -> usize {
        self.prepares.len()
    }

    /// Number of buffered commit votes.
    pub fn commit_count(&self) -> usize {
        self.commits.len()
    }

    /// Whether all four queues are empty.
    pub fn is_empty(&self) -> bool {
        self.requests.is_empty()
            && self.pre_prepares.is_empty()
            && self.prepares.is_empty()
            && self.commits.is_empty()
    }

    /// Drop entries older than `ttl` from every queue. Entries are FIFO by
    /// arrival, so eviction only ever pops from the front.
    ///
    /// Returns the number of evicted messages.
    pub fn evict_expired(&mut self, ttl: Duration) -> usize {
        let now = Instant::now();
        let mut evicted = 0;

        evicted += evict_front(&mut self.requests, now, ttl, "request");
        evicted += evict_front(&mut self.pre_prepares, now, ttl, "pre-prepare");
        evicted += evict_front(&mut self.prepares, now, ttl, "prepare");
        evicted += evict_front(&mut self.commits, now, ttl, "commit");

        evicted
    }
}

fn evict_front<T>(
    queue: &mut VecDeque<Buffered<T>>,
    now: Instant,
    ttl: Duration,
    kind: &'static str,
) -> usize {
    let mut evicted = 0;
    while let Some(front) = queue.front() {
        if now.duration_since(front.queued_at) < ttl {
            break;
        }
        queue.pop_front();
        evicted += 1;
    }
    if evicted > 0 {
        warn!(kind, evicted, "stale buffered messages evicted");
    }
    evicted
}
