//! Peer transport trait for outbound message delivery.
//!
//! The engine broadcasts encoded messages to committee peers through this
//! boundary; the concrete transport (plain HTTP POST in the reference
//! deployment) lives outside the core. Sends are fire-and-forget: a failed
//! peer is reported back to the broadcast helper and never retried, since
//! the protocol tolerates up to f silent replicas.

use async_trait::async_trait;
use thiserror::Error;

/// Errors a transport implementation may report for a single peer send.
#[derive(Error, Debug)]
pub enum TransportError {
    /// The peer could not be reached.
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    /// The connection was established but the send did not complete.
    #[error("send failed: {0}")]
    SendFailed(String),

    /// The send did not complete within the transport's own deadline.
    #[error("timeout: {0}")]
    Timeout(String),

    /// The transport has been shut down.
    #[error("transport not running")]
    NotRunning,

    /// Any other transport-internal failure.
    #[error("transport error: {0}")]
    Internal(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Outbound delivery of encoded consensus messages.
///
/// # Thread Safety
///
/// Implementations must be `Send + Sync`; the engine invokes the transport
/// from its resolver task while the dispatcher and alarm tasks run
/// concurrently.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    /// Deliver `payload` to the peer at `addr` (a `host:port` pair) on the
    /// given per-kind URL path.
    ///
    /// The payload is the canonical encoding of one message variant; the
    /// path identifies the variant to the receiving peer.
    async fn send(&self, addr: &str, path: &str, payload: &[u8]) -> TransportResult<()>;
}
