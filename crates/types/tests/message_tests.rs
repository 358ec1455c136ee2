//! Tests for message types, digests and the wire codec.
//!
//! These verify that every variant round-trips through the canonical
//! encoding, that the tagged sum discriminates correctly, and that the
//! request digest is deterministic and sensitive to every field.

use phalanx_types::{
    codec, ConsensusMsg, PrePrepareMsg, ReplyMsg, RequestMsg, StoredPrepareMsg, VoteKind, VoteMsg,
};

fn sample_request() -> RequestMsg {
    RequestMsg {
        client_id: "client-7".into(),
        timestamp: 1_700_000_123,
        operation: "transfer 10".into(),
        sequence_id: 4,
        height: 42,
        payload: vec![0xde, 0xad, 0xbe, 0xef],
    }
}

fn sample_vote(kind: VoteKind) -> VoteMsg {
    let req = sample_request();
    VoteMsg {
        kind,
        view_id: 10_000_000_000,
        sequence_id: req.sequence_id,
        digest: req.digest(),
        node_id: "0x04aabb".into(),
        pass: match kind {
            VoteKind::Prepare => None,
            VoteKind::Commit => Some(vec![1, 2, 3]),
        },
    }
}

fn round_trip(msg: ConsensusMsg) -> ConsensusMsg {
    let bytes = codec::encode(&msg).unwrap();
    codec::decode(&bytes).unwrap()
}

#[test]
fn request_round_trips() {
    let msg = ConsensusMsg::Request(sample_request());
    assert_eq!(round_trip(msg.clone()), msg);
}

#[test]
fn pre_prepare_round_trips() {
    let req = sample_request();
    let msg = ConsensusMsg::PrePrepare(PrePrepareMsg {
        view_id: 10_000_000_000,
        sequence_id: req.sequence_id,
        digest: req.digest(),
        request: req,
    });
    assert_eq!(round_trip(msg.clone()), msg);
}

#[test]
fn prepare_round_trips() {
    let stored = StoredPrepareMsg::from(&sample_vote(VoteKind::Prepare));
    let msg = ConsensusMsg::Prepare(stored);
    assert_eq!(round_trip(msg.clone()), msg);
}

#[test]
fn commit_round_trips_with_pass() {
    let msg = ConsensusMsg::Commit(sample_vote(VoteKind::Commit));
    assert_eq!(round_trip(msg.clone()), msg);
}

#[test]
fn reply_round_trips() {
    let msg = ConsensusMsg::Reply(ReplyMsg {
        view_id: 10_000_000_000,
        timestamp: 1_700_000_123,
        client_id: "client-7".into(),
        node_id: "0x04aabb".into(),
        result: "Executed".into(),
    });
    assert_eq!(round_trip(msg.clone()), msg);
}

#[test]
fn tagged_encoding_carries_msg_type() {
    let bytes = codec::encode(&ConsensusMsg::Request(sample_request())).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["msg_type"], "request");

    let bytes = codec::encode(&ConsensusMsg::Commit(sample_vote(VoteKind::Commit))).unwrap();
    let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(value["msg_type"], "commit");
    assert_eq!(value["kind"], "commit");
}

#[test]
fn malformed_payload_is_a_codec_error() {
    let result: Result<ConsensusMsg, _> = codec::decode(b"{\"msg_type\":\"nonsense\"}");
    assert!(result.is_err());

    let result: Result<ConsensusMsg, _> = codec::decode(b"not json at all");
    assert!(result.is_err());
}

#[test]
fn digest_is_deterministic() {
    assert_eq!(sample_request().digest(), sample_request().digest());
}

#[test]
fn digest_changes_with_every_field() {
    let base = sample_request();
    let base_digest = base.digest();

    let mut changed = base.clone();
    changed.client_id = "client-8".into();
    assert_ne!(changed.digest(), base_digest);

    let mut changed = base.clone();
    changed.timestamp += 1;
    assert_ne!(changed.digest(), base_digest);

    let mut changed = base.clone();
    changed.operation = "transfer 11".into();
    assert_ne!(changed.digest(), base_digest);

    let mut changed = base.clone();
    changed.sequence_id += 1;
    assert_ne!(changed.digest(), base_digest);

    let mut changed = base.clone();
    changed.height += 1;
    assert_ne!(changed.digest(), base_digest);

    let mut changed = base;
    changed.payload.push(0);
    assert_ne!(changed.digest(), base_digest);
}

#[test]
fn digest_fields_do_not_bleed_into_each_other() {
    // Length-prefixed encoding keeps adjacent string fields apart.
    let mut a = sample_request();
    a.client_id = "ab".into();
    a.operation = "c".into();

    let mut b = sample_request();
    b.client_id = "a".into();
    b.operation = "bc".into();

    assert_ne!(a.digest(), b.digest());
}

#[test]
fn stored_prepare_conversion_preserves_fields() {
    let vote = sample_vote(VoteKind::Prepare);
    let stored = StoredPrepareMsg::from(&vote);
    assert_eq!(stored.into_vote(), vote);
}

#[test]
fn wire_paths_match_variants() {
    assert_eq!(ConsensusMsg::Request(sample_request()).path(), "/req");
    assert_eq!(
        ConsensusMsg::Prepare(StoredPrepareMsg::from(&sample_vote(VoteKind::Prepare))).path(),
        "/prepare"
    );
    assert_eq!(
        ConsensusMsg::Commit(sample_vote(VoteKind::Commit)).path(),
        "/commit"
    );
}
