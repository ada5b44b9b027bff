//! Error types for the pure core.

use crate::ids::UserId;
use thiserror::Error;

/// A roster transition was rejected. The roster is unchanged on every error.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RosterError {
    /// The user was never invited to this event.
    #[error("user {0} is not a participant of this event")]
    NotAParticipant(UserId),

    /// The user already accepted or denied. A repeated response is an error,
    /// not a silent merge — callers wanting idempotent retries must check
    /// the roster state first.
    #[error("user {0} has already responded to this event")]
    AlreadyResponded(UserId),
}

/// A stored record could not be decoded. The read path drops the record and
/// keeps going; this error never crashes a snapshot parse.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    /// A required field is absent from the stored map.
    #[error("missing field `{0}`")]
    MissingField(&'static str),

    /// A field is present but holds the wrong JSON type or an unparseable value.
    #[error("field `{field}` is malformed: {reason}")]
    MalformedField {
        field: &'static str,
        reason: String,
    },

    /// The three response arrays do not partition the participant set.
    #[error("response arrays do not partition participantsUIDs: {0}")]
    InconsistentRoster(String),
}
