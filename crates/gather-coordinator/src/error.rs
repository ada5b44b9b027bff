//! Error types for coordinator operations.
//!
//! `ParseError` from the engine never appears here: malformed stored records
//! are recovered on the read path (dropped and logged), not surfaced. No
//! error is fatal — the coordinator stays usable after any failed operation.

use crate::store::StoreError;
use gather_engine::{EventId, RosterError};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CoordinatorError {
    /// The operation needs a signed-in user and there is none.
    #[error("no authenticated user")]
    NotAuthenticated,

    /// The event is not among the user's pending invitations.
    #[error("event {0} not found among pending invitations")]
    UnknownEvent(EventId),

    /// A roster transition was rejected before any write was issued.
    #[error(transparent)]
    Roster(#[from] RosterError),

    /// A store call failed outside a fan-out (e.g. the initial load in a
    /// respond workflow). Fan-out leg failures are reported through
    /// [`crate::FanOut`] instead.
    #[error(transparent)]
    Store(#[from] StoreError),
}
