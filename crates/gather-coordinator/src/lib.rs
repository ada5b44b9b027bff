//! # gather-coordinator
//!
//! Orchestration layer of the event collaboration engine. Every involved user
//! holds an independent replica of each event inside their own document
//! (`userEvents` / `pendingEvents` arrays); this crate fans event state out to
//! those replicas, runs the response workflow, and reconciles locally observed
//! snapshots into published, sorted event lists.
//!
//! There is no cross-document transaction anywhere in the store contract, so
//! every multi-replica operation is a best-effort fan-out: each leg is an
//! independent write that may fail on its own. The coordinator never hides
//! that — [`FanOut`] reports the outcome of every leg and leaves retries to
//! the caller.
//!
//! ## Modules
//!
//! - [`store`] — collaborator boundary: document store, identity, calendar
//! - [`coordinator`] — create/respond workflows and snapshot reconciliation
//! - [`friends`] — friend-edge maintenance and friend status reads
//! - [`memory`] — in-memory [`store::DocumentStore`] for tests and demos
//! - [`error`] — error types

pub mod coordinator;
pub mod error;
pub mod friends;
pub mod memory;
pub mod store;

pub use coordinator::{
    reconcile_snapshot, Clock, EventCoordinator, EventDraft, EventFeed, EventLists, FailedWrite,
    FanOut,
};
pub use error::CoordinatorError;
pub use friends::{FriendError, FriendRoster};
pub use memory::MemoryStore;
pub use store::{
    CalendarSource, Document, DocumentStore, FieldOp, IdentityProvider, SnapshotStream,
    StoreError, FIELD_FRIENDS, FIELD_MY_EVENTS, FIELD_PENDING_EVENTS, FIELD_STATUS,
};
