//! # gather-engine
//!
//! Pure core of the event collaboration engine: the deterministic logic that a
//! social scheduling client runs on every device, independent of any storage
//! or transport.
//!
//! Everything in this crate is synchronous and side-effect free. The async
//! orchestration over a remote document store lives in `gather-coordinator`;
//! this crate only answers questions ("is this user busy right now?", "may
//! this participant still respond?") and converts records to and from the
//! flat field maps the store holds.
//!
//! ## Modules
//!
//! - [`availability`] — busy intervals + clock → free / almost-busy / busy
//! - [`roster`] — the pending/accepted/denied partition of an event's invitees
//! - [`record`] — the event entity and its storage-fields codec
//! - [`ids`] — opaque user and event identifier newtypes
//! - [`error`] — error types

pub mod availability;
pub mod error;
pub mod ids;
pub mod record;
pub mod roster;

pub use availability::{derive_status, AvailabilityStatus, CalendarInterval};
pub use error::{ParseError, RosterError};
pub use ids::{EventId, UserId};
pub use record::EventRecord;
pub use roster::{ParticipantRoster, ResponseState};
