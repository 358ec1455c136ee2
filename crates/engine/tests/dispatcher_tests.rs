//! Tests for dispatcher routing, buffering and alarm flushes.
//!
//! The dispatcher is exercised directly: a shared instance slot stands in
//! for the resolver's state, and batches are read back off the delivery
//! queue. Committee size is N = 4 (f = 1) wherever votes are involved.

use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use phalanx_consensus::{ConsensusState, Stage};
use phalanx_engine::{DeliveryBatch, Dispatcher, SharedState};
use phalanx_types::{
    ConsensusMsg, PrePrepareMsg, ReplyMsg, RequestMsg, StoredPrepareMsg, VoteKind, VoteMsg,
    INITIAL_VIEW_ID,
};
use tokio::sync::mpsc;

const F: usize = 1;

fn request(client: &str) -> RequestMsg {
    RequestMsg::new(client, 1_700_000_000, "put k=v", 3, vec![9])
}

fn shared(state: Option<ConsensusState>) -> SharedState {
    Arc::new(RwLock::new(state))
}

fn dispatcher(
    state: &SharedState,
    ttl: Option<Duration>,
) -> (Dispatcher, mpsc::UnboundedReceiver<DeliveryBatch>) {
    let (tx, rx) = mpsc::unbounded_channel();
    (Dispatcher::new(Arc::clone(state), tx, ttl), rx)
}

/// A pre-prepare as the primary would broadcast it.
fn primary_pre_prepare() -> PrePrepareMsg {
    let mut primary = ConsensusState::new(INITIAL_VIEW_ID, -1);
    primary.start_consensus(request("client-1")).unwrap()
}

/// A participant state at the given stage.
fn live_state(stage: Stage) -> ConsensusState {
    let ppm = primary_pre_prepare();
    let mut state = ConsensusState::new(INITIAL_VIEW_ID, -1);
    state.pre_prepare(ppm).unwrap();
    if stage == Stage::Prepared {
        for node in ["n1", "n2"] {
            let vote = VoteMsg {
                kind: VoteKind::Prepare,
                view_id: state.view_id(),
                sequence_id: state.sequence_id().unwrap(),
                digest: state.digest().unwrap().to_string(),
                node_id: node.to_string(),
                pass: None,
            };
            state.prepare(vote, F).unwrap();
        }
    }
    assert_eq!(state.stage(), stage);
    state
}

fn stored_prepare(node: &str) -> StoredPrepareMsg {
    StoredPrepareMsg {
        view_id: INITIAL_VIEW_ID,
        sequence_id: 0,
        digest: "ab".repeat(32),
        node_id: node.to_string(),
        kind: VoteKind::Prepare,
    }
}

fn commit_vote(node: &str) -> VoteMsg {
    VoteMsg {
        kind: VoteKind::Commit,
        view_id: INITIAL_VIEW_ID,
        sequence_id: 0,
        digest: "ab".repeat(32),
        node_id: node.to_string(),
        pass: Some(vec![0]),
    }
}

#[tokio::test]
async fn request_with_no_live_instance_is_delivered_immediately() {
    let state = shared(None);
    let (mut dispatcher, mut rx) = dispatcher(&state, None);

    dispatcher
        .route(ConsensusMsg::Request(request("client-1")))
        .unwrap();

    match rx.try_recv().unwrap() {
        DeliveryBatch::Requests(batch) => {
            assert_eq!(batch.len(), 1);
            assert_eq!(batch[0].client_id, "client-1");
        }
        other => panic!("unexpected batch: {other:?}"),
    }
}

#[tokio::test]
async fn request_while_instance_live_waits_for_the_instance_to_clear() {
    let state = shared(Some(live_state(Stage::PrePrepared)));
    let (mut dispatcher, mut rx) = dispatcher(&state, None);

    dispatcher
        .route(ConsensusMsg::Request(request("client-2")))
        .unwrap();
    assert!(rx.try_recv().is_err());

    // Ticks while the instance is live leave the request buffered.
    dispatcher.on_alarm().unwrap();
    assert!(rx.try_recv().is_err());

    // Once the resolver clears the slot, the next tick releases it.
    *state.write() = None;
    dispatcher.on_alarm().unwrap();
    match rx.try_recv().unwrap() {
        DeliveryBatch::Requests(batch) => assert_eq!(batch[0].client_id, "client-2"),
        other => panic!("unexpected batch: {other:?}"),
    }
}

#[tokio::test]
async fn batch_is_buffered_messages_then_new_arrival_in_order() {
    let state = shared(Some(live_state(Stage::PrePrepared)));
    let (mut dispatcher, mut rx) = dispatcher(&state, None);

    dispatcher
        .route(ConsensusMsg::Request(request("client-1")))
        .unwrap();
    dispatcher
        .route(ConsensusMsg::Request(request("client-2")))
        .unwrap();
    assert!(rx.try_recv().is_err());

    *state.write() = None;
    dispatcher
        .route(ConsensusMsg::Request(request("client-3")))
        .unwrap();

    match rx.try_recv().unwrap() {
        DeliveryBatch::Requests(batch) => {
            let clients: Vec<_> = batch.iter().map(|r| r.client_id.clone()).collect();
            assert_eq!(clients, ["client-1", "client-2", "client-3"]);
        }
        other => panic!("unexpected batch: {other:?}"),
    }
}

#[tokio::test]
async fn pre_prepare_is_buffered_while_an_instance_is_live() {
    let state = shared(Some(live_state(Stage::PrePrepared)));
    let (mut dispatcher, mut rx) = dispatcher(&state, None);

    dispatcher
        .route(ConsensusMsg::PrePrepare(primary_pre_prepare()))
        .unwrap();
    assert!(rx.try_recv().is_err());

    *state.write() = None;
    dispatcher.on_alarm().unwrap();
    match rx.try_recv().unwrap() {
        DeliveryBatch::PrePrepares(batch) => assert_eq!(batch.len(), 1),
        other => panic!("unexpected batch: {other:?}"),
    }
}

#[tokio::test]
async fn early_prepare_is_buffered_then_released_by_the_next_prepare() {
    let state = shared(None);
    let (mut dispatcher, mut rx) = dispatcher(&state, None);

    // Prepare before the pre-prepare: nothing to tally it against yet.
    dispatcher
        .route(ConsensusMsg::Prepare(stored_prepare("n2")))
        .unwrap();
    assert!(rx.try_recv().is_err());

    // The local replica reaches PrePrepared; the next prepare flushes both.
    *state.write() = Some(live_state(Stage::PrePrepared));
    dispatcher
        .route(ConsensusMsg::Prepare(stored_prepare("n3")))
        .unwrap();

    match rx.try_recv().unwrap() {
        DeliveryBatch::Prepares(batch) => {
            let nodes: Vec<_> = batch.iter().map(|v| v.node_id.clone()).collect();
            assert_eq!(nodes, ["n2", "n3"]);
        }
        other => panic!("unexpected batch: {other:?}"),
    }
}

#[tokio::test]
async fn early_prepare_is_released_by_the_alarm() {
    let state = shared(None);
    let (mut dispatcher, mut rx) = dispatcher(&state, None);

    dispatcher
        .route(ConsensusMsg::Prepare(stored_prepare("n2")))
        .unwrap();

    // No instance: the tick leaves vote buffers alone.
    dispatcher.on_alarm().unwrap();
    assert!(rx.try_recv().is_err());

    *state.write() = Some(live_state(Stage::PrePrepared));
    dispatcher.on_alarm().unwrap();
    match rx.try_recv().unwrap() {
        DeliveryBatch::Prepares(batch) => assert_eq!(batch[0].node_id, "n2"),
        other => panic!("unexpected batch: {other:?}"),
    }
}

#[tokio::test]
async fn commit_is_buffered_until_prepared() {
    let state = shared(Some(live_state(Stage::PrePrepared)));
    let (mut dispatcher, mut rx) = dispatcher(&state, None);

    dispatcher
        .route(ConsensusMsg::Commit(commit_vote("n1")))
        .unwrap();
    assert!(rx.try_recv().is_err());

    dispatcher.on_alarm().unwrap();
    assert!(rx.try_recv().is_err());

    *state.write() = Some(live_state(Stage::Prepared));
    dispatcher
        .route(ConsensusMsg::Commit(commit_vote("n2")))
        .unwrap();
    match rx.try_recv().unwrap() {
        DeliveryBatch::Commits(batch) => {
            let nodes: Vec<_> = batch.iter().map(|v| v.node_id.clone()).collect();
            assert_eq!(nodes, ["n1", "n2"]);
        }
        other => panic!("unexpected batch: {other:?}"),
    }
}

#[tokio::test]
async fn alarm_flushes_requests_then_pre_prepares() {
    let state = shared(Some(live_state(Stage::PrePrepared)));
    let (mut dispatcher, mut rx) = dispatcher(&state, None);

    dispatcher
        .route(ConsensusMsg::Request(request("client-1")))
        .unwrap();
    dispatcher
        .route(ConsensusMsg::PrePrepare(primary_pre_prepare()))
        .unwrap();

    *state.write() = None;
    dispatcher.on_alarm().unwrap();

    assert!(matches!(
        rx.try_recv().unwrap(),
        DeliveryBatch::Requests(_)
    ));
    assert!(matches!(
        rx.try_recv().unwrap(),
        DeliveryBatch::PrePrepares(_)
    ));
    assert!(rx.try_recv().is_err());
}

#[tokio::test]
async fn replies_are_dropped_at_the_dispatcher() {
    let state = shared(None);
    let (mut dispatcher, mut rx) = dispatcher(&state, None);

    dispatcher
        .route(ConsensusMsg::Reply(ReplyMsg {
            view_id: INITIAL_VIEW_ID,
            timestamp: 1_700_000_000,
            client_id: "client-1".into(),
            node_id: "n1".into(),
            result: "Executed".into(),
        }))
        .unwrap();
    assert!(rx.try_recv().is_err());
}

#[tokio::test(start_paused = true)]
async fn expired_buffered_entries_are_evicted_on_the_tick() {
    let state = shared(None);
    let ttl = Duration::from_secs(5);
    let (mut dispatcher, mut rx) = dispatcher(&state, Some(ttl));

    dispatcher
        .route(ConsensusMsg::Prepare(stored_prepare("n-old")))
        .unwrap();

    tokio::time::advance(Duration::from_secs(6)).await;
    dispatcher
        .route(ConsensusMsg::Prepare(stored_prepare("n-new")))
        .unwrap();

    // The sweep runs on the tick: the six-second-old entry goes, the fresh
    // one stays.
    dispatcher.on_alarm().unwrap();
    assert!(rx.try_recv().is_err());

    *state.write() = Some(live_state(Stage::PrePrepared));
    dispatcher.on_alarm().unwrap();
    match rx.try_recv().unwrap() {
        DeliveryBatch::Prepares(batch) => {
            let nodes: Vec<_> = batch.iter().map(|v| v.node_id.clone()).collect();
            assert_eq!(nodes, ["n-new"]);
        }
        other => panic!("unexpected batch: {other:?}"),
    }
}
