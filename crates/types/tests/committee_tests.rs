//! Tests for the committee model and view construction.

use phalanx_types::{Committee, Replica, View, INITIAL_VIEW_ID};

fn committee_of(n: usize) -> Committee {
    let replicas = (0..n)
        .map(|i| Replica::new(format!("0x04node{i}"), "127.0.0.1", 9000 + i as u16))
        .collect();
    Committee::new(replicas)
}

#[test]
fn primary_is_first_member() {
    let committee = committee_of(4);
    assert_eq!(committee.primary().unwrap().public_key, "0x04node0");
}

#[test]
fn empty_committee_has_no_primary() {
    assert!(committee_of(0).primary().is_none());
    assert!(committee_of(0).is_empty());
}

#[test]
fn max_faulty_is_floor_n_over_three() {
    assert_eq!(committee_of(1).max_faulty(), 0);
    assert_eq!(committee_of(3).max_faulty(), 1);
    assert_eq!(committee_of(4).max_faulty(), 1);
    assert_eq!(committee_of(6).max_faulty(), 2);
    assert_eq!(committee_of(7).max_faulty(), 2);
    assert_eq!(committee_of(10).max_faulty(), 3);
}

#[test]
fn lookup_by_identity() {
    let committee = committee_of(4);
    assert!(committee.contains("0x04node2"));
    assert!(!committee.contains("0x04node9"));
    assert_eq!(committee.get("0x04node3").unwrap().port, 9003);
}

#[test]
fn replica_address_formatting() {
    let replica = Replica::new("0x04ab", "10.0.0.5", 8421);
    assert_eq!(replica.address(), "10.0.0.5:8421");
}

#[test]
fn iteration_preserves_order() {
    let committee = committee_of(4);
    let ids: Vec<_> = committee.iter().map(|r| r.public_key.clone()).collect();
    assert_eq!(ids, ["0x04node0", "0x04node1", "0x04node2", "0x04node3"]);
}

#[test]
fn initial_view_uses_fixed_id() {
    let view = View::initial("0x04node0".into());
    assert_eq!(view.id, INITIAL_VIEW_ID);
    assert_eq!(view.primary, "0x04node0");
}
