//! # Phalanx Consensus
//!
//! The per-instance state machine of the PBFT normal case.
//!
//! One [`ConsensusState`] drives a single client request through the
//! three-phase protocol, collecting votes until the committee's quorum
//! thresholds are met:
//!
//! ```text
//! Idle ──start_consensus / pre_prepare──▶ PrePrepared
//! PrePrepared ──2f matching Prepares──▶ Prepared
//! Prepared ──2f+1 matching Commits──▶ Committed   (terminal)
//! ```
//!
//! ## Safety
//!
//! - **Quorum intersection**: with N replicas and f = N/3 tolerated faults,
//!   any two quorums of 2f+1 overlap in an honest replica, so two
//!   conflicting requests cannot both commit in a view.
//! - **Digest pinning**: every tallied vote must carry the digest recorded
//!   when the instance started; votes for anything else are dropped.
//! - **One vote per replica**: tallies are keyed by sender identity, and a
//!   duplicate sender is ignored without changing the tally.
//! - **Monotonic stages**: transitions only ever advance; a threshold fires
//!   exactly once, at the boundary.
//!
//! The engine crate owns instance lifecycle (creation, reset) and all I/O;
//! this crate is purely the decision logic and is exercised from a single
//! task.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod state;

pub use state::{ConsensusError, ConsensusState, MsgLogs, Stage};
