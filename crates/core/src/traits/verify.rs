//! Application boundary: request validation, commit signing and replies.

use async_trait::async_trait;
use phalanx_types::RequestMsg;

/// The three hooks the engine delivers to the application at the correct
/// protocol stages.
///
/// `check_msg` and `sign_msg` run when a prepare quorum forms, before the
/// commit vote is broadcast; `reply_result` runs exactly once per instance,
/// when the instance reaches the committed stage.
#[async_trait]
pub trait RequestVerifier: Send + Sync + 'static {
    /// Decide whether the request is semantically valid.
    async fn check_msg(&self, req: &RequestMsg) -> bool;

    /// Produce the opaque signature blob attached to the commit vote's
    /// `pass` field. `result` is 0 for pass, 1 for reject.
    async fn sign_msg(&self, height: u64, result: u32) -> Vec<u8>;

    /// Receive the final decision for a committed request. `result` is 1
    /// when the reply carries the executed sentinel, 0 otherwise.
    async fn reply_result(&self, req: &RequestMsg, result: u32);
}
