//! # Phalanx Engine
//!
//! The single-replica runtime of the Phalanx consensus core: everything
//! around the state machine that ingests, buffers, releases and answers
//! protocol messages.
//!
//! ## Data flow
//!
//! ```text
//! network ──▶ entrance queue ──┐
//!                              ├──▶ dispatcher ──▶ delivery queue ──▶ resolver
//! alarm tick (1 s) ────────────┘        │                               │
//!                                  MsgBuffer                     state machine
//!                                (early/late                           │
//!                                 messages)                   broadcast to peers
//! ```
//!
//! Three long-lived tasks communicate only through queues:
//!
//! - the **dispatcher** owns the [`MsgBuffer`] and routes each inbound
//!   message - or each alarm tick - into homogeneous delivery batches,
//!   depending on the live instance's stage;
//! - the **resolver** consumes batches, drives the
//!   [`ConsensusState`](phalanx_consensus::ConsensusState) operations and
//!   broadcasts whatever they emit;
//! - the **alarm** publishes a tick every second so buffered out-of-order
//!   arrivals are recovered.
//!
//! The [`Node`] is the construction and entry surface: the transport calls
//! `get_req` / `get_pre_prepare` / `get_prepare` / `get_commit` /
//! `get_reply` with decoded messages and they return immediately.
//!
//! At most one consensus instance is live at a time. The committed stage is
//! terminal: the application must call [`Node::reset`] once it has taken
//! the decision, after which buffered requests resume on the next tick.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]
#![deny(unsafe_code)]

pub mod alarm;
pub mod broadcast;
pub mod buffer;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod node;
pub mod resolver;

pub use alarm::RESOLVING_INTERVAL;
pub use broadcast::broadcast;
pub use buffer::MsgBuffer;
pub use config::EngineConfig;
pub use dispatcher::{DeliveryBatch, Dispatcher};
pub use error::EngineError;
pub use node::{EngineHandles, EngineRuntime, Node, SharedState};
pub use resolver::Resolver;
