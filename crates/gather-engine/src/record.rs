//! The event entity and its storage-fields codec.
//!
//! A record is replicated into every involved user's document as a flat
//! `serde_json::Map` — the store enforces no schema, so the decoder fails
//! closed: any missing or mistyped field, and any violation of the roster
//! partition, rejects the whole record. Callers on the read path drop
//! rejected records and keep going; a malformed record must never crash a
//! snapshot parse.
//!
//! Wire keys match the deployed documents (`creatorUID`, `participantsUIDs`,
//! camel-cased response arrays). `creationTime` travels as an RFC 3339
//! string.

use crate::error::ParseError;
use crate::ids::{EventId, UserId};
use crate::roster::ParticipantRoster;
use chrono::{DateTime, Utc};
use serde_json::{Map, Value};
use std::cmp::Ordering;
use std::collections::BTreeSet;

/// A single scheduled gathering, as held in one user's replica.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EventRecord {
    pub id: EventId,
    pub title: String,
    pub location: String,
    pub description: String,
    pub duration_seconds: u64,
    pub creator_id: UserId,
    pub creation_time: DateTime<Utc>,
    pub roster: ParticipantRoster,
}

impl EventRecord {
    /// Build a fresh record with every invitee pending.
    ///
    /// The creator is implicitly a full participant and is filtered out of
    /// the invitee list here, so `creator_id` can never appear in the roster.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: EventId,
        title: impl Into<String>,
        location: impl Into<String>,
        description: impl Into<String>,
        duration_seconds: u64,
        creator_id: UserId,
        creation_time: DateTime<Utc>,
        invitees: impl IntoIterator<Item = UserId>,
    ) -> Self {
        let roster =
            ParticipantRoster::new(invitees.into_iter().filter(|id| *id != creator_id));
        Self {
            id,
            title: title.into(),
            location: location.into(),
            description: description.into(),
            duration_seconds,
            creator_id,
            creation_time,
            roster,
        }
    }

    /// A record is complete once it carries a non-empty title. Display-only
    /// fields carry no other constraints.
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty()
    }

    /// Sort order for published event lists: newest creation time first,
    /// ties broken by id ascending for deterministic output.
    pub fn list_order(a: &EventRecord, b: &EventRecord) -> Ordering {
        b.creation_time
            .cmp(&a.creation_time)
            .then_with(|| a.id.cmp(&b.id))
    }

    /// Flatten into the stored field map. The inverse of
    /// [`EventRecord::from_storage_fields`] for all valid records.
    pub fn to_storage_fields(&self) -> Map<String, Value> {
        let ids = |users: Vec<UserId>| {
            Value::Array(users.into_iter().map(|u| Value::String(u.0)).collect())
        };

        let mut map = Map::new();
        map.insert("id".into(), Value::String(self.id.0.clone()));
        map.insert("title".into(), Value::String(self.title.clone()));
        map.insert("location".into(), Value::String(self.location.clone()));
        map.insert("description".into(), Value::String(self.description.clone()));
        map.insert("duration".into(), Value::from(self.duration_seconds));
        map.insert("creatorUID".into(), Value::String(self.creator_id.0.clone()));
        map.insert("participantsUIDs".into(), ids(self.roster.participants()));
        // AutoSi keeps exactly as many subsecond digits as the value carries,
        // so decoding gives back the identical instant at any precision.
        map.insert(
            "creationTime".into(),
            Value::String(
                self.creation_time
                    .to_rfc3339_opts(chrono::SecondsFormat::AutoSi, true),
            ),
        );
        map.insert("pendingParticipants".into(), ids(self.roster.pending()));
        map.insert("acceptedParticipants".into(), ids(self.roster.accepted()));
        map.insert("deniedParticipants".into(), ids(self.roster.denied()));
        map
    }

    /// Decode a stored field map.
    ///
    /// # Errors
    /// Fails closed on any missing or mistyped required field, on a creator
    /// listed among the participants, and on response arrays that do not
    /// partition `participantsUIDs`.
    pub fn from_storage_fields(fields: &Map<String, Value>) -> Result<EventRecord, ParseError> {
        let id = EventId::new(get_str(fields, "id")?);
        let title = get_str(fields, "title")?;
        let location = get_str(fields, "location")?;
        let description = get_str(fields, "description")?;
        let duration_seconds = get_u64(fields, "duration")?;
        let creator_id = UserId::new(get_str(fields, "creatorUID")?);
        let creation_time = get_timestamp(fields, "creationTime")?;
        let participants = get_id_array(fields, "participantsUIDs")?;
        let pending = get_id_array(fields, "pendingParticipants")?;
        let accepted = get_id_array(fields, "acceptedParticipants")?;
        let denied = get_id_array(fields, "deniedParticipants")?;

        if participants.contains(&creator_id) {
            return Err(ParseError::MalformedField {
                field: "creatorUID",
                reason: "creator listed among participants".to_string(),
            });
        }

        check_partition(&participants, &pending, &accepted, &denied)?;

        Ok(EventRecord {
            id,
            title,
            location,
            description,
            duration_seconds,
            creator_id,
            creation_time,
            roster: ParticipantRoster::from_parts(pending, accepted, denied),
        })
    }
}

/// Verify the three response arrays partition the participant set: together
/// they cover every participant, pairwise disjoint, nothing extra.
fn check_partition(
    participants: &BTreeSet<UserId>,
    pending: &BTreeSet<UserId>,
    accepted: &BTreeSet<UserId>,
    denied: &BTreeSet<UserId>,
) -> Result<(), ParseError> {
    if pending.len() + accepted.len() + denied.len() != participants.len() {
        return Err(ParseError::InconsistentRoster(format!(
            "{} participants vs {} pending + {} accepted + {} denied",
            participants.len(),
            pending.len(),
            accepted.len(),
            denied.len()
        )));
    }
    for id in pending.iter().chain(accepted).chain(denied) {
        if !participants.contains(id) {
            return Err(ParseError::InconsistentRoster(format!(
                "{id} responded but is not a participant"
            )));
        }
    }
    // Sizes match and every responder is a participant, so the union covers
    // the set exactly iff the three arrays are pairwise disjoint.
    let union: BTreeSet<&UserId> = pending.iter().chain(accepted).chain(denied).collect();
    if union.len() != participants.len() {
        return Err(ParseError::InconsistentRoster(
            "a participant appears in more than one response array".to_string(),
        ));
    }
    Ok(())
}

fn get_str(fields: &Map<String, Value>, key: &'static str) -> Result<String, ParseError> {
    match fields.get(key) {
        None => Err(ParseError::MissingField(key)),
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Err(ParseError::MalformedField {
            field: key,
            reason: format!("expected string, got {}", type_name(other)),
        }),
    }
}

fn get_u64(fields: &Map<String, Value>, key: &'static str) -> Result<u64, ParseError> {
    match fields.get(key) {
        None => Err(ParseError::MissingField(key)),
        Some(value) => value.as_u64().ok_or_else(|| ParseError::MalformedField {
            field: key,
            reason: format!("expected non-negative integer, got {}", type_name(value)),
        }),
    }
}

fn get_timestamp(
    fields: &Map<String, Value>,
    key: &'static str,
) -> Result<DateTime<Utc>, ParseError> {
    let raw = get_str(fields, key)?;
    DateTime::parse_from_rfc3339(&raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| ParseError::MalformedField {
            field: key,
            reason: format!("invalid RFC 3339 timestamp: {e}"),
        })
}

fn get_id_array(
    fields: &Map<String, Value>,
    key: &'static str,
) -> Result<BTreeSet<UserId>, ParseError> {
    match fields.get(key) {
        None => Err(ParseError::MissingField(key)),
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| match item {
                Value::String(s) => Ok(UserId::new(s.clone())),
                other => Err(ParseError::MalformedField {
                    field: key,
                    reason: format!("expected string element, got {}", type_name(other)),
                }),
            })
            .collect(),
        Some(other) => Err(ParseError::MalformedField {
            field: key,
            reason: format!("expected array, got {}", type_name(other)),
        }),
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
