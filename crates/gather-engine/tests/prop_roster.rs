//! Property-based tests: the roster partition invariant under arbitrary
//! response sequences, and the storage-fields round trip for arbitrary
//! valid records.

use chrono::{DateTime, TimeZone, Utc};
use gather_engine::{EventId, EventRecord, ParticipantRoster, UserId};
use proptest::prelude::*;
use std::collections::BTreeSet;

// ---------------------------------------------------------------------------
// Strategies
// ---------------------------------------------------------------------------

fn arb_user_id() -> impl Strategy<Value = UserId> {
    "[a-z0-9]{1,8}".prop_map(UserId::new)
}

fn arb_participants() -> impl Strategy<Value = Vec<UserId>> {
    prop::collection::vec(arb_user_id(), 0..8)
}

/// A response attempt: index into a candidate-id pool (so some attempts hit
/// participants, some hit strangers, some repeat) plus accept/deny.
fn arb_attempts() -> impl Strategy<Value = Vec<(usize, bool)>> {
    prop::collection::vec((0usize..12, any::<bool>()), 0..24)
}

/// Timestamps down to single-nanosecond precision — the codec must round-trip
/// whatever the clock produces.
fn arb_timestamp() -> impl Strategy<Value = DateTime<Utc>> {
    (0i64..4_000_000_000, 0u32..1_000_000_000)
        .prop_map(|(secs, nanos)| Utc.timestamp_opt(secs, nanos).unwrap())
}

fn arb_text() -> impl Strategy<Value = String> {
    // Printable-ish strings including empties and unicode.
    prop::string::string_regex(".{0,20}").unwrap()
}

// ---------------------------------------------------------------------------
// Roster partition invariant
// ---------------------------------------------------------------------------

proptest! {
    /// After any sequence of response attempts (valid or rejected), the
    /// pending/accepted/denied views partition the participant set.
    #[test]
    fn partition_holds_under_any_response_sequence(
        participants in arb_participants(),
        strangers in arb_participants(),
        attempts in arb_attempts(),
    ) {
        let mut roster = ParticipantRoster::new(participants.clone());
        let expected: BTreeSet<UserId> = participants.iter().cloned().collect();

        // Pool mixes real participants with strangers.
        let pool: Vec<UserId> = participants.iter().chain(&strangers).cloned().collect();

        for (idx, accept) in attempts {
            if pool.is_empty() {
                break;
            }
            let user = &pool[idx % pool.len()];
            let before = roster.clone();
            if roster.respond(user, accept).is_err() {
                // Rejected attempts must not change anything.
                prop_assert_eq!(&roster, &before);
            }

            let mut union: Vec<UserId> = roster.pending();
            union.extend(roster.accepted());
            union.extend(roster.denied());
            let union: BTreeSet<UserId> = union.into_iter().collect();
            prop_assert_eq!(&union, &expected);

            let counted =
                roster.pending().len() + roster.accepted().len() + roster.denied().len();
            prop_assert_eq!(counted, expected.len());
        }
    }

    /// Everyone responding exactly once fully resolves the roster.
    #[test]
    fn responding_once_each_resolves(
        participants in arb_participants(),
        accepts in prop::collection::vec(any::<bool>(), 1..8),
    ) {
        let mut roster = ParticipantRoster::new(participants);
        for (user, accept) in roster.participants().into_iter().zip(accepts.iter().cycle()) {
            roster.respond(&user, *accept).unwrap();
        }
        prop_assert!(roster.is_fully_resolved());
    }
}

// ---------------------------------------------------------------------------
// Codec round trip
// ---------------------------------------------------------------------------

proptest! {
    /// `from_storage_fields(to_storage_fields(r)) == r` for arbitrary valid
    /// records, including ones with recorded responses.
    #[test]
    fn storage_fields_round_trip(
        id in "[a-z0-9-]{1,12}",
        title in arb_text(),
        location in arb_text(),
        description in arb_text(),
        duration in any::<u32>(),
        creation_time in arb_timestamp(),
        invitees in arb_participants(),
        accepts in prop::collection::vec(any::<bool>(), 0..8),
        respond_count in 0usize..8,
    ) {
        let mut record = EventRecord::new(
            EventId::new(id),
            title,
            location,
            description,
            u64::from(duration),
            UserId::from("creator"),
            creation_time,
            invitees,
        );

        // Record some responses so non-trivial rosters round-trip too.
        let responders: Vec<UserId> = record
            .roster
            .participants()
            .into_iter()
            .take(respond_count)
            .collect();
        for (user, accept) in responders.iter().zip(accepts.iter().cycle()) {
            record.roster.respond(user, *accept).unwrap();
        }

        let decoded = EventRecord::from_storage_fields(&record.to_storage_fields()).unwrap();
        prop_assert_eq!(decoded, record);
    }
}
