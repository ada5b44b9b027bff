//! Integration tests for friend-edge maintenance and availability publishing.

use async_trait::async_trait;
use chrono::{DateTime, Duration, TimeZone, Utc};
use gather_coordinator::store::{CalendarSource, StaticIdentity, StoreError};
use gather_coordinator::{
    EventCoordinator, FriendError, FriendRoster, MemoryStore, FIELD_STATUS,
};
use gather_engine::availability::{
    CalendarInterval, StatusKind, DEFAULT_ALMOST_BUSY_LEAD_SECONDS,
};
use gather_engine::{AvailabilityStatus, UserId};
use serde_json::Value;
use std::sync::Arc;

// ── Helpers ─────────────────────────────────────────────────────────────────

fn uid(s: &str) -> UserId {
    UserId::from(s)
}

fn ts(h: u32, m: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 16, h, m, 0).unwrap()
}

fn roster_as(store: &MemoryStore, user: &str) -> FriendRoster {
    FriendRoster::new(
        Arc::new(store.clone()),
        Arc::new(StaticIdentity::signed_in(user)),
    )
}

/// Calendar stub returning a fixed interval list for every user.
struct FixedCalendar(Vec<CalendarInterval>);

#[async_trait]
impl CalendarSource for FixedCalendar {
    async fn busy_intervals(
        &self,
        _user: &UserId,
        _from: DateTime<Utc>,
        _to: DateTime<Utc>,
    ) -> Result<Vec<CalendarInterval>, StoreError> {
        Ok(self.0.clone())
    }
}

// ── Friend edges ────────────────────────────────────────────────────────────

#[tokio::test]
async fn self_edge_is_rejected() {
    let store = MemoryStore::new();
    let roster = roster_as(&store, "alice");

    let err = roster.add_friend(&uid("alice")).await.unwrap_err();
    assert_eq!(err, FriendError::SelfEdgeRejected);
    assert!(roster.friends().await.unwrap().is_empty());
}

#[tokio::test]
async fn adding_a_friend_writes_only_the_callers_document() {
    let store = MemoryStore::new();
    let alice = roster_as(&store, "alice");

    alice.add_friend(&uid("bob")).await.unwrap();

    assert_eq!(alice.friends().await.unwrap(), vec![uid("bob")]);
    // One-directional: bob's side knows nothing.
    let bob = roster_as(&store, "bob");
    assert!(bob.friends().await.unwrap().is_empty());
}

#[tokio::test]
async fn adding_twice_keeps_a_single_edge() {
    let store = MemoryStore::new();
    let alice = roster_as(&store, "alice");

    alice.add_friend(&uid("bob")).await.unwrap();
    alice.add_friend(&uid("bob")).await.unwrap();

    assert_eq!(alice.friends().await.unwrap(), vec![uid("bob")]);
}

#[tokio::test]
async fn removing_a_friend_is_symmetric_safe() {
    let store = MemoryStore::new();
    let alice = roster_as(&store, "alice");
    let bob = roster_as(&store, "bob");

    alice.add_friend(&uid("bob")).await.unwrap();
    bob.add_friend(&uid("alice")).await.unwrap();

    alice.remove_friend(&uid("bob")).await.unwrap();

    assert!(alice.friends().await.unwrap().is_empty());
    // Bob's own edge survives; removal touches only the caller's list.
    assert_eq!(bob.friends().await.unwrap(), vec![uid("alice")]);

    // Removing an absent edge is a quiet no-op.
    alice.remove_friend(&uid("bob")).await.unwrap();
}

#[tokio::test]
async fn friend_operations_require_authentication() {
    let store = MemoryStore::new();
    let roster = FriendRoster::new(
        Arc::new(store.clone()),
        Arc::new(StaticIdentity::signed_out()),
    );

    assert_eq!(
        roster.add_friend(&uid("bob")).await.unwrap_err(),
        FriendError::NotAuthenticated
    );
    assert_eq!(
        roster.friends().await.unwrap_err(),
        FriendError::NotAuthenticated
    );
}

// ── Availability publishing and reads ───────────────────────────────────────

#[tokio::test]
async fn refresh_status_publishes_the_derived_label() {
    let store = MemoryStore::new();
    let coordinator = EventCoordinator::new(
        Arc::new(store.clone()),
        Arc::new(StaticIdentity::signed_in("bob")),
    );
    let calendar = FixedCalendar(vec![CalendarInterval {
        start: ts(10, 0),
        end: ts(11, 0),
    }]);

    let status = coordinator
        .refresh_status(
            &uid("bob"),
            &calendar,
            ts(10, 30),
            Duration::hours(24),
            DEFAULT_ALMOST_BUSY_LEAD_SECONDS,
        )
        .await
        .unwrap();

    assert_eq!(status, AvailabilityStatus::Busy { changes_at: ts(11, 0) });
    assert_eq!(
        store.document(&uid("bob")).get(FIELD_STATUS),
        Some(&Value::String("Busy".to_string()))
    );
}

#[tokio::test]
async fn refresh_status_saturates_an_unrepresentable_lookahead() {
    let store = MemoryStore::new();
    let coordinator = EventCoordinator::new(
        Arc::new(store.clone()),
        Arc::new(StaticIdentity::signed_in("bob")),
    );
    let calendar = FixedCalendar(Vec::new());

    let status = coordinator
        .refresh_status(
            &uid("bob"),
            &calendar,
            ts(10, 30),
            Duration::MAX,
            DEFAULT_ALMOST_BUSY_LEAD_SECONDS,
        )
        .await
        .unwrap();

    assert_eq!(status, AvailabilityStatus::Free);
}

#[tokio::test]
async fn friend_statuses_read_published_labels() {
    let store = MemoryStore::new();
    let alice = roster_as(&store, "alice");
    alice.add_friend(&uid("bob")).await.unwrap();
    alice.add_friend(&uid("carol")).await.unwrap();
    alice.add_friend(&uid("dave")).await.unwrap();

    // Bob is busy, carol almost; dave never published a status.
    let coordinator = EventCoordinator::new(
        Arc::new(store.clone()),
        Arc::new(StaticIdentity::signed_in("alice")),
    );
    let busy = FixedCalendar(vec![CalendarInterval { start: ts(10, 0), end: ts(11, 0) }]);
    let soon = FixedCalendar(vec![CalendarInterval { start: ts(10, 45), end: ts(11, 0) }]);
    coordinator
        .refresh_status(&uid("bob"), &busy, ts(10, 30), Duration::hours(24), 1800)
        .await
        .unwrap();
    coordinator
        .refresh_status(&uid("carol"), &soon, ts(10, 30), Duration::hours(24), 1800)
        .await
        .unwrap();

    let statuses = alice.friend_statuses().await.unwrap();
    assert_eq!(
        statuses,
        vec![
            (uid("bob"), StatusKind::Busy),
            (uid("carol"), StatusKind::AlmostBusy),
            (uid("dave"), StatusKind::Free),
        ]
    );
}
