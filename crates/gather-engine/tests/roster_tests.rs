//! Tests for the participant response roster and its partition invariant.

use gather_engine::{ParticipantRoster, ResponseState, RosterError, UserId};

fn uid(s: &str) -> UserId {
    UserId::from(s)
}

fn roster(ids: &[&str]) -> ParticipantRoster {
    ParticipantRoster::new(ids.iter().map(|s| uid(s)))
}

/// The three derived views must always partition the participant set.
fn assert_partitioned(r: &ParticipantRoster) {
    let mut combined = r.pending();
    combined.extend(r.accepted());
    combined.extend(r.denied());
    combined.sort();
    assert_eq!(combined, r.participants());
}

// ── Construction ────────────────────────────────────────────────────────────

#[test]
fn new_roster_is_all_pending() {
    let r = roster(&["p1", "p2", "p3"]);
    assert_eq!(r.pending(), vec![uid("p1"), uid("p2"), uid("p3")]);
    assert!(r.accepted().is_empty());
    assert!(r.denied().is_empty());
    assert!(!r.is_fully_resolved());
    assert_partitioned(&r);
}

#[test]
fn duplicate_invitees_collapse() {
    let r = roster(&["p1", "p1", "p2"]);
    assert_eq!(r.len(), 2);
}

#[test]
fn empty_roster_is_trivially_resolved() {
    let r = roster(&[]);
    assert!(r.is_empty());
    assert!(r.is_fully_resolved());
}

// ── Responses ───────────────────────────────────────────────────────────────

#[test]
fn accept_moves_pending_to_accepted() {
    let mut r = roster(&["p1", "p2"]);
    r.respond(&uid("p1"), true).unwrap();

    assert_eq!(r.pending(), vec![uid("p2")]);
    assert_eq!(r.accepted(), vec![uid("p1")]);
    assert!(r.denied().is_empty());
    assert_eq!(r.state_of(&uid("p1")), Some(ResponseState::Accepted));
    assert_partitioned(&r);
}

#[test]
fn deny_moves_pending_to_denied() {
    let mut r = roster(&["p1", "p2"]);
    r.respond(&uid("p2"), false).unwrap();

    assert_eq!(r.pending(), vec![uid("p1")]);
    assert_eq!(r.denied(), vec![uid("p2")]);
    assert_partitioned(&r);
}

#[test]
fn fully_resolved_once_everyone_responds() {
    let mut r = roster(&["p1", "p2"]);
    r.respond(&uid("p1"), true).unwrap();
    assert!(!r.is_fully_resolved());
    r.respond(&uid("p2"), false).unwrap();
    assert!(r.is_fully_resolved());
    assert_partitioned(&r);
}

// ── Rejections leave the roster unchanged ───────────────────────────────────

#[test]
fn non_participant_is_rejected_and_state_unchanged() {
    let mut r = roster(&["p1"]);
    let before = r.clone();

    let err = r.respond(&uid("stranger"), true).unwrap_err();
    assert_eq!(err, RosterError::NotAParticipant(uid("stranger")));
    assert_eq!(r, before);
}

#[test]
fn double_response_is_rejected_and_state_unchanged() {
    let mut r = roster(&["p1", "p2"]);
    r.respond(&uid("p1"), true).unwrap();
    let after_first = r.clone();

    // Same response again.
    let err = r.respond(&uid("p1"), true).unwrap_err();
    assert_eq!(err, RosterError::AlreadyResponded(uid("p1")));
    assert_eq!(r, after_first);

    // Flipping the answer is rejected too — responses are terminal.
    let err = r.respond(&uid("p1"), false).unwrap_err();
    assert_eq!(err, RosterError::AlreadyResponded(uid("p1")));
    assert_eq!(r, after_first);
}
